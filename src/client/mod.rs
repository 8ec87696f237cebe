//! Home Assistant REST client abstraction
//!
//! The [`HassClient`] trait is the seam between the MCP layer and Home
//! Assistant. The production implementation is [`http_client::HassHttpClient`].
//! Tests use the mock in `crate::mock`.

pub mod http_client;
pub mod models;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

pub use http_client::HassHttpClient;
pub use models::{
    ApiMessage, ConfigCheckResult, EntityState, HassInfo, HistoryQuery, LogbookEntry,
    ServiceDescription, ServiceDomain,
};

/// Trait for Home Assistant client implementations
#[async_trait]
pub trait HassClient: Send + Sync {
    /// `GET /api/`; confirms the API is running and the token is accepted
    async fn api_status(&self) -> Result<ApiMessage>;

    /// `GET /api/config`
    async fn get_config(&self) -> Result<HassInfo>;

    /// `GET /api/states`
    async fn get_states(&self) -> Result<Vec<EntityState>>;

    /// `GET /api/states/{entity_id}`
    async fn get_state(&self, entity_id: &str) -> Result<EntityState>;

    /// `GET /api/services`
    async fn get_services(&self) -> Result<Vec<ServiceDomain>>;

    /// `POST /api/services/{domain}/{service}`; returns the states that changed
    async fn call_service(&self, domain: &str, service: &str, data: Value)
        -> Result<Vec<EntityState>>;

    /// `GET /api/history/period/{start}`
    async fn get_history(&self, query: &HistoryQuery) -> Result<Vec<EntityState>>;

    /// `GET /api/logbook/{start}`
    async fn get_logbook(
        &self,
        start: DateTime<Utc>,
        entity_id: Option<&str>,
    ) -> Result<Vec<LogbookEntry>>;

    /// `GET /api/error_log`
    async fn get_error_log(&self) -> Result<String>;

    /// `POST /api/template`
    async fn render_template(&self, template: &str) -> Result<String>;

    /// `POST /api/events/{event_type}`
    async fn fire_event(&self, event_type: &str, data: Value) -> Result<ApiMessage>;

    /// `POST /api/config/core/check_config`
    async fn check_config(&self) -> Result<ConfigCheckResult>;

    /// `GET /api/config/automation/config/{id}`
    async fn get_automation_config(&self, automation_id: &str) -> Result<Value>;
}
