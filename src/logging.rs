//! Logging configuration with a runtime-adjustable level
//!
//! Log output goes to stderr (stdout carries the MCP protocol) and optionally
//! to a daily-rotated file. The active filter sits behind a reload layer so the
//! MCP `logging/setLevel` request can change it while the server runs.

use crate::config::LoggingConfig;
use crate::error::{HassError, Result};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter,
    Registry,
};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level
    pub level: Level,

    /// Log to file
    pub file_path: Option<PathBuf>,

    /// Emit JSON instead of the compact text format
    pub json: bool,

    /// Include thread IDs
    pub thread_ids: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            file_path: None,
            json: false,
            thread_ids: false,
        }
    }
}

impl LogConfig {
    /// Create config from environment
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `RUST_LOG`, `HASS_MCP_LOG_FILE`, `HASS_MCP_LOG_JSON` and
    /// `HASS_MCP_LOG_THREAD_IDS` on top of this config
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(rust_log) = std::env::var("RUST_LOG") {
            if let Some(level) = parse_level(&rust_log) {
                self.level = level;
            }
        }

        if let Ok(log_file) = std::env::var("HASS_MCP_LOG_FILE") {
            if !log_file.trim().is_empty() {
                self.file_path = Some(PathBuf::from(log_file));
            }
        }

        if let Ok(json) = std::env::var("HASS_MCP_LOG_JSON") {
            self.json = parse_flag(&json);
        }

        if let Ok(thread_ids) = std::env::var("HASS_MCP_LOG_THREAD_IDS") {
            self.thread_ids = parse_flag(&thread_ids);
        }

        self
    }

    /// Build from the `[logging]` section of the server configuration
    pub fn from_settings(settings: &LoggingConfig) -> Self {
        Self {
            level: parse_level(&settings.level).unwrap_or(Level::INFO),
            file_path: settings.file.as_ref().map(PathBuf::from),
            json: settings.json_format,
            thread_ids: false,
        }
    }

    /// Set the level from a debug flag, keeping the configured level otherwise
    pub fn with_debug(mut self, debug: bool) -> Self {
        if debug {
            self.level = Level::DEBUG;
        }
        self
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}

/// Extract a level from a filter string such as "info" or "hass_mcp_rust=debug"
fn parse_level(filter: &str) -> Option<Level> {
    let lower = filter.to_lowercase();
    [
        ("trace", Level::TRACE),
        ("debug", Level::DEBUG),
        ("info", Level::INFO),
        ("warn", Level::WARN),
        ("error", Level::ERROR),
    ]
    .into_iter()
    .find(|(name, _)| lower.contains(name))
    .map(|(_, level)| level)
}

/// Map an MCP logging level onto a tracing filter directive
pub fn mcp_level_to_filter(level: &str) -> Option<&'static str> {
    match level.to_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" | "notice" => Some("info"),
        "warning" | "warn" => Some("warn"),
        "error" | "critical" | "alert" | "emergency" => Some("error"),
        _ => None,
    }
}

/// Handle to the process-wide log level
///
/// Cloning is cheap. A detached handle (used in tests) records the level without
/// touching any subscriber.
#[derive(Clone)]
pub struct LogLevelHandle {
    reload: Option<reload::Handle<EnvFilter, Registry>>,
    current: Arc<Mutex<String>>,
}

impl LogLevelHandle {
    /// Handle that is not attached to a subscriber
    pub fn detached(level: &str) -> Self {
        Self {
            reload: None,
            current: Arc::new(Mutex::new(level.to_string())),
        }
    }

    /// Currently active filter directive
    pub fn current(&self) -> String {
        self.current
            .lock()
            .map(|level| level.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Change the level using an MCP level name
    ///
    /// The reload and the recorded level change under one lock, so concurrent
    /// calls cannot leave `current()` out of step with the active filter.
    pub fn set_mcp_level(&self, level: &str) -> Result<()> {
        let directive = mcp_level_to_filter(level)
            .ok_or_else(|| HassError::invalid_input(format!("Unknown log level: {level}")))?;

        let mut current = self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(reload) = &self.reload {
            reload
                .reload(EnvFilter::new(directive))
                .map_err(|e| HassError::mcp(format!("Failed to change log level: {e}")))?;
        }

        *current = directive.to_string();
        Ok(())
    }
}

/// Keeps the file writer alive; dropping it flushes buffered log lines
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize logging with the given configuration
pub fn init_logging(config: LogConfig) -> Result<(LogLevelHandle, LoggingGuard)> {
    let directive = config.level.to_string().to_lowercase();
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(config.level).into())
        .from_env_lossy();

    let (filter_layer, reload_handle) = reload::Layer::new(env_filter);

    let text_layer = (!config.json).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(config.thread_ids)
            .compact()
    });

    let json_layer = config
        .json
        .then(|| fmt::layer().json().with_writer(std::io::stderr));

    let (file_layer, file_guard) = match &config.file_path {
        Some(file_path) => {
            if let Some(parent) = file_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file_appender = tracing_appender::rolling::daily(
                file_path
                    .parent()
                    .unwrap_or_else(|| std::path::Path::new(".")),
                file_path
                    .file_name()
                    .unwrap_or_else(|| std::ffi::OsStr::new("hass-mcp.log")),
            );
            let (writer, guard) = tracing_appender::non_blocking(file_appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(text_layer)
        .with(json_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| HassError::config(format!("Failed to initialize logging: {e}")))?;

    let handle = LogLevelHandle {
        reload: Some(reload_handle),
        current: Arc::new(Mutex::new(directive)),
    };

    Ok((
        handle,
        LoggingGuard {
            _file_guard: file_guard,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_mcp_level_mapping() {
        assert_eq!(mcp_level_to_filter("notice"), Some("info"));
        assert_eq!(mcp_level_to_filter("warning"), Some("warn"));
        assert_eq!(mcp_level_to_filter("CRITICAL"), Some("error"));
        assert_eq!(mcp_level_to_filter("emergency"), Some("error"));
        assert_eq!(mcp_level_to_filter("verbose"), None);
    }

    #[test]
    fn test_detached_handle_tracks_level() {
        let handle = LogLevelHandle::detached("info");
        assert_eq!(handle.current(), "info");

        handle.set_mcp_level("debug").unwrap();
        assert_eq!(handle.current(), "debug");

        let clone = handle.clone();
        clone.set_mcp_level("alert").unwrap();
        assert_eq!(handle.current(), "error");

        assert!(handle.set_mcp_level("loud").is_err());
        assert_eq!(handle.current(), "error");
    }

    #[test]
    fn test_from_settings() {
        let settings = LoggingConfig {
            level: "warn".to_string(),
            json_format: true,
            file: Some("/tmp/hass-mcp/server.log".to_string()),
        };
        let config = LogConfig::from_settings(&settings).with_debug(false);
        assert_eq!(config.level, Level::WARN);
        assert!(config.json);
        assert_eq!(config.file_path, Some(PathBuf::from("/tmp/hass-mcp/server.log")));
        assert_eq!(LogConfig::from_settings(&settings).with_debug(true).level, Level::DEBUG);
    }

    #[test]
    fn test_parse_level_from_filter() {
        assert_eq!(parse_level("hass_mcp_rust=debug"), Some(Level::DEBUG));
        assert_eq!(parse_level("WARN"), Some(Level::WARN));
        assert_eq!(parse_level("off"), None);
    }

    #[test]
    #[serial]
    fn test_env_overrides_apply_over_settings() {
        let settings = LoggingConfig {
            level: "info".to_string(),
            json_format: false,
            file: None,
        };
        temp_env::with_vars(
            [
                ("RUST_LOG", Some("hass_mcp_rust=debug")),
                ("HASS_MCP_LOG_FILE", Some("/var/log/hass-mcp/server.log")),
                ("HASS_MCP_LOG_JSON", Some("TRUE")),
                ("HASS_MCP_LOG_THREAD_IDS", Some("1")),
            ],
            || {
                let config = LogConfig::from_settings(&settings).with_env_overrides();
                assert_eq!(config.level, Level::DEBUG);
                assert!(config.json);
                assert!(config.thread_ids);
                assert_eq!(
                    config.file_path,
                    Some(PathBuf::from("/var/log/hass-mcp/server.log"))
                );
            },
        );
    }

    #[test]
    #[serial]
    fn test_unset_env_keeps_settings() {
        let settings = LoggingConfig {
            level: "warn".to_string(),
            json_format: true,
            file: Some("/tmp/hass-mcp/server.log".to_string()),
        };
        temp_env::with_vars(
            [
                ("RUST_LOG", None::<&str>),
                ("HASS_MCP_LOG_FILE", None),
                ("HASS_MCP_LOG_JSON", None),
                ("HASS_MCP_LOG_THREAD_IDS", None),
            ],
            || {
                let config = LogConfig::from_settings(&settings).with_env_overrides();
                assert_eq!(config.level, Level::WARN);
                assert!(config.json);
                assert!(!config.thread_ids);
                assert_eq!(config.file_path, Some(PathBuf::from("/tmp/hass-mcp/server.log")));
            },
        );
    }

    #[test]
    fn test_concurrent_set_level_settles_on_a_valid_level() {
        let handle = LogLevelHandle::detached("info");
        let threads: Vec<_> = ["debug", "error", "warning", "notice"]
            .into_iter()
            .map(|level| {
                let handle = handle.clone();
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        handle.set_mcp_level(level).unwrap();
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }
        assert!(["debug", "error", "warn", "info"].contains(&handle.current().as_str()));
    }
}
