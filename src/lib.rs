//! Home Assistant MCP Server implementation in Rust
//!
//! This crate provides a Model Context Protocol (MCP) server that translates
//! the Home Assistant REST API into tools, resources and prompts for AI agents.
//!
//! # Features
//!
//! - 21 MCP tools for entity inspection, control, history and diagnostics
//! - JSON resources for entities, configuration, services and analysis results
//! - Guided prompts for automation design and troubleshooting
//! - Anomaly detection, semantic entity search, relationship inference and
//!   deprecated-configuration checks
//! - Runtime-adjustable log level via `logging/setLevel`

// Core modules
pub mod client;
pub mod config;
pub mod error;
pub mod framework_integration;
pub mod intelligence;
pub mod logging;
pub mod server;
pub mod tools;
pub mod validation;

// Test support modules - available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

// Re-export main types for convenience
pub use config::ServerConfig;
pub use error::{HassError, Result};
pub use framework_integration::{HassBackend, HassBackendConfig};
