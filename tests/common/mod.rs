//! Common test utilities

#![allow(dead_code)]

pub mod hass_mock;

pub use hass_mock::{entity, MockHassServer, TEST_TOKEN};

use hass_mcp_rust::config::{HassConfig, ServerConfig};
use hass_mcp_rust::logging::LogLevelHandle;
use hass_mcp_rust::HassBackend;
use pulseengine_mcp_auth::{AuthConfig, AuthenticationManager};
use pulseengine_mcp_protocol::{Content, PaginatedRequestParam};
use pulseengine_mcp_server::{middleware::MiddlewareStack, GenericServerHandler};
use std::sync::Arc;

/// Server configuration pointing at a mock instance
pub fn test_config(base_url: &str) -> ServerConfig {
    ServerConfig {
        hass: HassConfig {
            url: base_url.parse().expect("mock server URL"),
            token: TEST_TOKEN.to_string(),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Backend with a real HTTP client talking to the mock instance
pub fn backend_for(mock: &MockHassServer) -> HassBackend {
    HassBackend::initialize(test_config(&mock.base_url), LogLevelHandle::detached("info"))
        .expect("backend initializes against mock server")
}

/// Framework request handler around [`backend_for`], with auth disabled as on stdio
pub async fn handler_for(mock: &MockHassServer) -> GenericServerHandler<HassBackend> {
    let auth_manager = AuthenticationManager::new(AuthConfig {
        enabled: false,
        ..Default::default()
    })
    .await
    .expect("auth manager");
    GenericServerHandler::new(
        Arc::new(backend_for(mock)),
        Arc::new(auth_manager),
        MiddlewareStack::new(),
    )
}

/// Text of a content block
pub fn content_text(content: &Content) -> String {
    let value = serde_json::to_value(content).expect("content serializes");
    value["text"].as_str().unwrap_or_default().to_string()
}

/// First page of a list request
pub fn first_page() -> PaginatedRequestParam {
    serde_json::from_value(serde_json::json!({})).expect("empty pagination params")
}
