//! Standalone connection diagnostic for a Home Assistant instance
//!
//! Reads `HA_URL` and `HA_TOKEN` (or a config file passed as the first
//! argument), then checks `/api/`, `/api/config` and `/api/states`. Logging
//! follows `RUST_LOG` and the `HASS_MCP_LOG_*` variables.

use hass_mcp_rust::{
    client::{HassClient, HassHttpClient},
    logging::{init_logging, LogConfig},
    Result, ServerConfig,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

#[tokio::main]
async fn main() -> Result<()> {
    let (_log_level, _guard) = init_logging(LogConfig::from_env())?;

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = ServerConfig::load(config_path.as_deref())?;
    config.validate()?;

    println!("🔍 Testing connection to {}", config.hass.url);
    let client = HassHttpClient::new(&config.hass)?;

    let started = Instant::now();
    match client.api_status().await {
        Ok(status) => println!("✅ /api/ answered in {:?}: {}", started.elapsed(), status.message),
        Err(e) => {
            println!("❌ /api/ failed: {e}");
            if matches!(e, hass_mcp_rust::HassError::Authentication(_)) {
                println!("   Create a long-lived access token under your Home Assistant profile");
            }
            return Err(e);
        }
    }

    let info = client.get_config().await?;
    println!(
        "✅ /api/config: {} running Home Assistant {} ({} components, time zone {})",
        info.location_name,
        info.version,
        info.components.len(),
        info.time_zone
    );

    let states = client.get_states().await?;
    let mut domains: BTreeMap<&str, usize> = BTreeMap::new();
    for state in &states {
        *domains.entry(state.domain()).or_default() += 1;
    }
    let unavailable = states.iter().filter(|s| s.is_unavailable()).count();
    println!(
        "✅ /api/states: {} entities in {} domains ({} unavailable)",
        states.len(),
        domains.len(),
        unavailable
    );
    for (domain, count) in domains {
        println!("   {domain:<20} {count}");
    }

    Ok(())
}
