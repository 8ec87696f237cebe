//! Configuration management for the Home Assistant MCP server

use crate::error::{HassError, Result};
use serde::{Deserialize, Serialize};
use std::{env, fmt, path::Path, time::Duration};
use url::Url;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Home Assistant connection configuration
    pub hass: HassConfig,

    /// MCP server configuration
    pub mcp: McpConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Thresholds for the analysis tools
    pub intelligence: IntelligenceConfig,
}

/// Home Assistant connection configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HassConfig {
    /// Base URL of the Home Assistant instance (e.g. "http://homeassistant.local:8123")
    pub url: Url,

    /// Long-lived access token
    pub token: String,

    /// Request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Enable SSL/TLS verification
    pub verify_ssl: bool,
}

impl fmt::Debug for HassConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HassConfig")
            .field("url", &self.url.as_str())
            .field("token", &if self.token.is_empty() { "" } else { "***" })
            .field("timeout", &self.timeout)
            .field("verify_ssl", &self.verify_ssl)
            .finish()
    }
}

/// MCP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct McpConfig {
    /// Server name for MCP identification
    pub name: String,

    /// Server version
    pub version: String,

    /// Instructions returned to the client on initialize
    pub instructions: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable structured JSON logging
    pub json_format: bool,

    /// Log to file (path)
    pub file: Option<String>,
}

/// Thresholds used by anomaly detection and search
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntelligenceConfig {
    /// Sensors not updated within this window are reported as stale
    #[serde(with = "humantime_serde")]
    pub stale_after: Duration,

    /// Battery percentage below which a low battery is reported
    pub low_battery_threshold: f64,

    /// Lights and switches on for longer than this are reported
    #[serde(with = "humantime_serde")]
    pub long_running_after: Duration,

    /// Doors and windows open for longer than this are reported
    #[serde(with = "humantime_serde")]
    pub open_too_long_after: Duration,

    /// Result count when a search does not specify a limit
    pub default_search_limit: usize,

    /// Upper bound for any caller-supplied limit
    pub max_search_limit: usize,
}

impl Default for HassConfig {
    fn default() -> Self {
        Self {
            url: default_hass_url(),
            token: String::new(),
            timeout: Duration::from_secs(30),
            verify_ssl: true,
        }
    }
}

fn default_hass_url() -> Url {
    Url::parse("http://localhost:8123").expect("static URL is valid")
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            name: "hass-mcp-server".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            instructions: Some(
                "Home Assistant control via MCP. Search for entities before acting on them, \
                 prefer entity_action for simple on/off changes and use the analysis tools \
                 to find problems."
                    .to_string(),
            ),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            file: None,
        }
    }
}

impl Default for IntelligenceConfig {
    fn default() -> Self {
        Self {
            stale_after: Duration::from_secs(24 * 3600),
            low_battery_threshold: 20.0,
            long_running_after: Duration::from_secs(12 * 3600),
            open_too_long_after: Duration::from_secs(3600),
            default_search_limit: 20,
            max_search_limit: 500,
        }
    }
}

/// Read the first of several environment variables that is set
fn first_env(names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| env::var(name).ok().filter(|v| !v.trim().is_empty()))
}

/// Parse a Home Assistant URL, adding a scheme when only a host was given
pub fn parse_hass_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim().trim_end_matches('/');
    let url_str = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };
    url_str
        .parse()
        .map_err(|e| HassError::config(format!("Invalid Home Assistant URL '{raw}': {e}")))
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load configuration from an optional TOML file layered with `HASS_MCP__*` variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("HASS_MCP")
                .prefix_separator("__")
                .separator("__"),
        );

        let mut config: ServerConfig = builder.build()?.try_deserialize()?;
        config.apply_env()?;
        Ok(config)
    }

    /// Apply the well-known short environment variables
    fn apply_env(&mut self) -> Result<()> {
        if let Some(url) = first_env(&["HA_URL", "HASS_URL"]) {
            self.hass.url = parse_hass_url(&url)?;
        }

        if let Some(token) = first_env(&["HA_TOKEN", "HASS_TOKEN"]) {
            self.hass.token = token;
        }

        if let Some(timeout) = first_env(&["HASS_TIMEOUT"]) {
            self.hass.timeout = Duration::from_secs(
                timeout
                    .parse()
                    .map_err(|e| HassError::config(format!("Invalid HASS_TIMEOUT: {e}")))?,
            );
        }

        if let Some(verify) = first_env(&["HASS_VERIFY_SSL"]) {
            self.hass.verify_ssl = !matches!(verify.to_lowercase().as_str(), "false" | "0" | "no");
        }

        if let Ok(level) = env::var("RUST_LOG") {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Validate configuration before connecting
    pub fn validate(&self) -> Result<()> {
        if self.hass.url.host().is_none() {
            return Err(HassError::config("Invalid Home Assistant URL - missing host"));
        }

        if self.hass.token.trim().is_empty() {
            return Err(HassError::config(
                "Home Assistant token is required. Set HA_TOKEN or pass --ha-token",
            ));
        }

        if self.hass.timeout.is_zero() {
            return Err(HassError::config("Request timeout must be greater than zero"));
        }

        if self.intelligence.default_search_limit > self.intelligence.max_search_limit {
            return Err(HassError::config(
                "default_search_limit cannot exceed max_search_limit",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_parse_hass_url_adds_scheme() {
        let url = parse_hass_url("homeassistant.local:8123/").unwrap();
        assert_eq!(url.as_str(), "http://homeassistant.local:8123/");

        let url = parse_hass_url("https://ha.example.com").unwrap();
        assert_eq!(url.scheme(), "https");
    }

    #[test]
    fn test_validate_requires_token() {
        let config = ServerConfig::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("token is required"));

        let mut config = ServerConfig::default();
        config.hass.token = "abc".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_token() {
        let mut config = HassConfig::default();
        config.token = "super-secret".to_string();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("***"));
    }

    #[test]
    #[serial]
    fn test_from_env_reads_short_variables() {
        temp_env::with_vars(
            [
                ("HA_URL", Some("http://10.0.0.5:8123")),
                ("HA_TOKEN", Some("token-123")),
                ("HASS_TIMEOUT", Some("5")),
                ("HASS_URL", None),
                ("HASS_TOKEN", None),
            ],
            || {
                let config = ServerConfig::from_env().unwrap();
                assert_eq!(config.hass.url.host_str(), Some("10.0.0.5"));
                assert_eq!(config.hass.token, "token-123");
                assert_eq!(config.hass.timeout, Duration::from_secs(5));
            },
        );
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_bad_timeout() {
        temp_env::with_vars([("HASS_TIMEOUT", Some("soon"))], || {
            assert!(ServerConfig::from_env().is_err());
        });
    }

    #[test]
    #[serial]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hass-mcp.toml");
        std::fs::write(
            &path,
            r#"
[hass]
url = "http://ha.lan:8123"
token = "file-token"
timeout = "10s"

[intelligence]
low_battery_threshold = 15.0
"#,
        )
        .unwrap();

        temp_env::with_vars(
            [
                ("HA_URL", None::<&str>),
                ("HASS_URL", None),
                ("HA_TOKEN", None),
                ("HASS_TOKEN", None),
                ("HASS_TIMEOUT", None),
            ],
            || {
                let config = ServerConfig::load(Some(&path)).unwrap();
                assert_eq!(config.hass.token, "file-token");
                assert_eq!(config.hass.timeout, Duration::from_secs(10));
                assert_eq!(config.intelligence.low_battery_threshold, 15.0);
                assert_eq!(config.intelligence.default_search_limit, 20);
            },
        );
    }
}
