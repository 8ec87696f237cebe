//! Home Assistant MCP Server - Main Entry Point
//!
//! Serves the Home Assistant REST API as MCP tools, resources and prompts over
//! stdio, or checks connectivity with the `check` subcommand.

use hass_mcp_rust::{
    client::{HassClient, HassHttpClient},
    config::parse_hass_url,
    logging::{init_logging, LogConfig},
    HassBackend, HassError, Result, ServerConfig,
};

use clap::{Parser, Subcommand};
use pulseengine_mcp_auth::AuthenticationManager;
use pulseengine_mcp_server::backend::McpBackend;
use pulseengine_mcp_server::{middleware::MiddlewareStack, GenericServerHandler};
use pulseengine_mcp_transport::create_transport;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Home Assistant MCP Server Configuration
#[derive(Parser, Debug)]
#[command(name = "hass-mcp-server")]
#[command(about = "MCP server for Home Assistant")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Home Assistant base URL
    #[arg(long, global = true, env = "HA_URL")]
    ha_url: Option<String>,

    /// Long-lived access token
    #[arg(long, global = true, env = "HA_TOKEN", hide_env_values = true)]
    ha_token: Option<String>,

    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Serve MCP over stdin/stdout (default)
    Stdio,
    /// Verify the Home Assistant connection and exit
    Check,
}

impl Cli {
    /// Load configuration, letting CLI flags override file and environment
    fn server_config(&self) -> Result<ServerConfig> {
        let mut config = ServerConfig::load(self.config.as_deref())?;
        if let Some(url) = &self.ha_url {
            config.hass.url = parse_hass_url(url)?;
        }
        if let Some(token) = &self.ha_token {
            config.hass.token = token.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

async fn run_check(config: &ServerConfig) -> Result<()> {
    let client = HassHttpClient::new(&config.hass)?;
    let status = client.api_status().await?;
    let info = client.get_config().await?;
    info!("✅ {}", status.message);
    println!(
        "Connected to {} (Home Assistant {}) at {}",
        info.location_name, info.version, config.hass.url
    );
    Ok(())
}

async fn run_stdio(backend: HassBackend) -> Result<()> {
    if let Err(e) = backend.health_check().await {
        warn!("⚠️ Home Assistant not reachable yet: {}", e);
    }

    // stdio is a local pipe from the client process
    let auth_manager = AuthenticationManager::new(pulseengine_mcp_auth::AuthConfig {
        enabled: false,
        ..Default::default()
    })
    .await
    .map_err(|e| HassError::config(e.to_string()))?;

    let handler = GenericServerHandler::new(
        Arc::new(backend),
        Arc::new(auth_manager),
        MiddlewareStack::new(),
    );

    let mut transport = create_transport(pulseengine_mcp_transport::TransportConfig::Stdio)
        .map_err(|e| HassError::connection(e.to_string()))?;

    info!("✅ MCP server ready on stdio");
    transport
        .start(Box::new(move |req| {
            let handler = handler.clone();
            Box::pin(async move {
                handler.handle_request(req).await.unwrap_or_else(|e| {
                    tracing::error!("Request handling error: {}", e);
                    pulseengine_mcp_protocol::Response {
                        jsonrpc: "2.0".to_string(),
                        id: serde_json::Value::Null,
                        result: None,
                        error: Some(pulseengine_mcp_protocol::Error::internal_error(
                            e.to_string(),
                        )),
                    }
                })
            })
        }))
        .await
        .map_err(|e| HassError::connection(e.to_string()))?;

    info!("Server stopped: stdin closed");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.server_config()?;

    let (log_level, _guard) = init_logging(
        LogConfig::from_settings(&config.logging)
            .with_env_overrides()
            .with_debug(cli.debug),
    )?;

    info!(
        "🚀 Starting Home Assistant MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    match cli.command.unwrap_or(Command::Stdio) {
        Command::Check => run_check(&config).await,
        Command::Stdio => run_stdio(HassBackend::initialize(config, log_level)?).await,
    }
}
