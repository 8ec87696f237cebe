//! Error types for the Home Assistant MCP server
//!
//! This module provides the crate-wide error enum, structured error codes and
//! lower-case constructor helpers used throughout the client and tool layers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for Home Assistant operations
pub type Result<T> = std::result::Result<T, HassError>;

/// Error types for Home Assistant MCP operations
#[derive(Error, Debug)]
pub enum HassError {
    /// Connection errors
    #[error("Connection error: {0}")]
    Connection(String),

    /// Authentication errors (missing or rejected token)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The token is valid but lacks access to the endpoint
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing errors
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration source errors (file or environment layering)
    #[error("Configuration load error: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors
    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),

    /// Timeout errors
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Invalid input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Not found errors (entities, services, automations)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Home Assistant reported a server-side failure
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// MCP protocol errors
    #[error("MCP protocol error: {0}")]
    Mcp(String),

    /// Parsing errors
    #[error("Parsing error: {0}")]
    Parsing(String),
}

/// Structured error code for machine-readable error handling
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Connection errors (1000-1099)
    ConnectionTimeout,
    ConnectionRefused,

    // Authentication errors (1100-1199)
    InvalidCredentials,
    PermissionDenied,

    // Configuration errors (1200-1299)
    ConfigurationMissing,
    ConfigurationInvalid,

    // Entity errors (1300-1399)
    EntityNotFound,

    // Data errors (1400-1499)
    ParsingFailed,
    InvalidInput,

    // Service errors (1600-1699)
    ServiceUnavailable,

    // Protocol errors (1700-1799)
    ProtocolViolation,

    // Internal errors (1900-1999)
    InternalError,
}

impl ErrorCode {
    /// Get numeric error code
    pub fn as_number(&self) -> u32 {
        match self {
            ErrorCode::ConnectionTimeout => 1001,
            ErrorCode::ConnectionRefused => 1002,
            ErrorCode::InvalidCredentials => 1101,
            ErrorCode::PermissionDenied => 1103,
            ErrorCode::ConfigurationMissing => 1201,
            ErrorCode::ConfigurationInvalid => 1202,
            ErrorCode::EntityNotFound => 1301,
            ErrorCode::ParsingFailed => 1401,
            ErrorCode::InvalidInput => 1402,
            ErrorCode::ServiceUnavailable => 1601,
            ErrorCode::ProtocolViolation => 1701,
            ErrorCode::InternalError => 1901,
        }
    }

    /// Get error category
    pub fn category(&self) -> &'static str {
        match self.as_number() {
            1000..=1099 => "connection",
            1100..=1199 => "authentication",
            1200..=1299 => "configuration",
            1300..=1399 => "entity",
            1400..=1499 => "data",
            1600..=1699 => "service",
            1700..=1799 => "protocol",
            1900..=1999 => "internal",
            _ => "unknown",
        }
    }
}

impl HassError {
    /// Create a connection error
    pub fn connection<S: Into<String>>(msg: S) -> Self {
        Self::Connection(msg.into())
    }

    /// Create an authentication error
    pub fn authentication<S: Into<String>>(msg: S) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a permission denied error
    pub fn permission_denied<S: Into<String>>(msg: S) -> Self {
        Self::PermissionDenied(msg.into())
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a timeout error
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a service unavailable error
    pub fn service_unavailable<S: Into<String>>(msg: S) -> Self {
        Self::ServiceUnavailable(msg.into())
    }

    /// Create an MCP protocol error
    pub fn mcp<S: Into<String>>(msg: S) -> Self {
        Self::Mcp(msg.into())
    }

    /// Create a parsing error
    pub fn parsing<S: Into<String>>(msg: S) -> Self {
        Self::Parsing(msg.into())
    }

    /// Machine-readable code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            HassError::Connection(_) => ErrorCode::ConnectionRefused,
            HassError::Http(e) if e.is_timeout() => ErrorCode::ConnectionTimeout,
            HassError::Http(_) => ErrorCode::ConnectionRefused,
            HassError::Timeout(_) => ErrorCode::ConnectionTimeout,
            HassError::Authentication(_) => ErrorCode::InvalidCredentials,
            HassError::PermissionDenied(_) => ErrorCode::PermissionDenied,
            HassError::Config(msg) if msg.contains("required") => {
                ErrorCode::ConfigurationMissing
            }
            HassError::Config(_) | HassError::ConfigLoad(_) => ErrorCode::ConfigurationInvalid,
            HassError::NotFound(_) => ErrorCode::EntityNotFound,
            HassError::Json(_) | HassError::Parsing(_) => ErrorCode::ParsingFailed,
            HassError::InvalidInput(_) => ErrorCode::InvalidInput,
            HassError::ServiceUnavailable(_) => ErrorCode::ServiceUnavailable,
            HassError::Mcp(_) => ErrorCode::ProtocolViolation,
            HassError::Io(_) | HassError::Generic(_) => ErrorCode::InternalError,
        }
    }

    /// Whether a caller could reasonably try the same request again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.code(),
            ErrorCode::ConnectionTimeout
                | ErrorCode::ConnectionRefused
                | ErrorCode::ServiceUnavailable
        )
    }
}

// Classification used by pulseengine-mcp-logging when errors are recorded
impl pulseengine_mcp_logging::ErrorClassification for HassError {
    fn error_type(&self) -> &str {
        match self {
            HassError::Connection(_) => "connection_error",
            HassError::Authentication(_) => "authentication_error",
            HassError::PermissionDenied(_) => "permission_denied_error",
            HassError::Http(_) => "http_error",
            HassError::Json(_) => "json_error",
            HassError::Config(_) | HassError::ConfigLoad(_) => "config_error",
            HassError::Io(_) => "io_error",
            HassError::Generic(_) => "generic_error",
            HassError::Timeout(_) => "timeout_error",
            HassError::InvalidInput(_) => "invalid_input_error",
            HassError::NotFound(_) => "not_found_error",
            HassError::ServiceUnavailable(_) => "service_unavailable_error",
            HassError::Mcp(_) => "mcp_protocol_error",
            HassError::Parsing(_) => "parsing_error",
        }
    }

    fn is_retryable(&self) -> bool {
        HassError::is_retryable(self)
    }

    fn is_timeout(&self) -> bool {
        self.code() == ErrorCode::ConnectionTimeout
    }

    fn is_auth_error(&self) -> bool {
        matches!(
            self,
            HassError::Authentication(_) | HassError::PermissionDenied(_)
        )
    }

    fn is_connection_error(&self) -> bool {
        matches!(self, HassError::Connection(_) | HassError::Http(_))
    }
}
