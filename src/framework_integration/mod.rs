//! Integration of the Home Assistant tools with the MCP server layer

pub mod backend;

pub use backend::{HassBackend, HassBackendConfig};
