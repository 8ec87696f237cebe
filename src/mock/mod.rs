//! Mock implementations for testing
//!
//! This module provides an in-memory Home Assistant client that serves a fixed
//! set of states and records every service call.

use crate::client::{
    ApiMessage, ConfigCheckResult, EntityState, HassClient, HassInfo, HistoryQuery, LogbookEntry,
    ServiceDescription, ServiceDomain,
};
use crate::error::{HassError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

/// Service call captured by [`MockHassClient`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub domain: String,
    pub service: String,
    pub data: Value,
}

/// Mock Home Assistant client for testing
pub struct MockHassClient {
    states: Vec<EntityState>,
    services: Vec<ServiceDomain>,
    history: HashMap<String, Vec<EntityState>>,
    automation_configs: HashMap<String, Value>,
    error_log: String,
    calls: Mutex<Vec<RecordedCall>>,
    offline: bool,
}

impl MockHassClient {
    /// Create new mock client with no entities
    pub fn new() -> Self {
        Self {
            states: Vec::new(),
            services: Vec::new(),
            history: HashMap::new(),
            automation_configs: HashMap::new(),
            error_log: String::new(),
            calls: Mutex::new(Vec::new()),
            offline: false,
        }
    }

    /// Set mock entity states
    pub fn with_states(mut self, states: Vec<EntityState>) -> Self {
        self.states = states;
        self
    }

    /// Register a service so it shows up in `get_services`
    pub fn with_service(mut self, domain: &str, service: &str) -> Self {
        let description = ServiceDescription {
            name: Some(service.replace('_', " ")),
            ..Default::default()
        };
        match self.services.iter_mut().find(|d| d.domain == domain) {
            Some(existing) => {
                existing.services.insert(service.to_string(), description);
            }
            None => self.services.push(ServiceDomain {
                domain: domain.to_string(),
                services: HashMap::from([(service.to_string(), description)]),
            }),
        }
        self
    }

    /// Set history for an entity
    pub fn with_history(mut self, entity_id: &str, history: Vec<EntityState>) -> Self {
        self.history.insert(entity_id.to_string(), history);
        self
    }

    /// Set the stored configuration of an automation
    pub fn with_automation_config(mut self, automation_id: &str, config: Value) -> Self {
        self.automation_configs
            .insert(automation_id.to_string(), config);
        self
    }

    /// Set the error log text
    pub fn with_error_log(mut self, log: &str) -> Self {
        self.error_log = log.to_string();
        self
    }

    /// Make every call fail with a connection error
    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }

    /// Service calls received so far
    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn check_online(&self) -> Result<()> {
        if self.offline {
            return Err(HassError::connection("Mock Home Assistant is offline"));
        }
        Ok(())
    }
}

impl Default for MockHassClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HassClient for MockHassClient {
    async fn api_status(&self) -> Result<ApiMessage> {
        self.check_online()?;
        Ok(ApiMessage {
            message: "API running.".to_string(),
        })
    }

    async fn get_config(&self) -> Result<HassInfo> {
        self.check_online()?;
        Ok(HassInfo {
            version: "2024.10.1".to_string(),
            location_name: "Mock Home".to_string(),
            time_zone: "Europe/Berlin".to_string(),
            unit_system: HashMap::from([("temperature".to_string(), "°C".to_string())]),
            components: vec!["light".to_string(), "sensor".to_string()],
            state: Some("RUNNING".to_string()),
            ..Default::default()
        })
    }

    async fn get_states(&self) -> Result<Vec<EntityState>> {
        self.check_online()?;
        Ok(self.states.clone())
    }

    async fn get_state(&self, entity_id: &str) -> Result<EntityState> {
        self.check_online()?;
        self.states
            .iter()
            .find(|s| s.entity_id == entity_id)
            .cloned()
            .ok_or_else(|| HassError::not_found(format!("Entity not found: {entity_id}")))
    }

    async fn get_services(&self) -> Result<Vec<ServiceDomain>> {
        self.check_online()?;
        Ok(self.services.clone())
    }

    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        data: Value,
    ) -> Result<Vec<EntityState>> {
        self.check_online()?;
        let target = data
            .get("entity_id")
            .and_then(Value::as_str)
            .map(str::to_string);
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                domain: domain.to_string(),
                service: service.to_string(),
                data,
            });
        }

        Ok(target
            .and_then(|id| self.states.iter().find(|s| s.entity_id == id).cloned())
            .into_iter()
            .collect())
    }

    async fn get_history(&self, query: &HistoryQuery) -> Result<Vec<EntityState>> {
        self.check_online()?;
        Ok(self.history.get(&query.entity_id).cloned().unwrap_or_default())
    }

    async fn get_logbook(
        &self,
        start: DateTime<Utc>,
        entity_id: Option<&str>,
    ) -> Result<Vec<LogbookEntry>> {
        self.check_online()?;
        Ok(self
            .history
            .iter()
            .filter(|(id, _)| entity_id.map_or(true, |wanted| wanted == id.as_str()))
            .flat_map(|(id, states)| {
                states.iter().filter_map(move |state| {
                    let when = state.last_changed?;
                    (when >= start).then(|| LogbookEntry {
                        when,
                        name: Some(state.friendly_name().to_string()),
                        message: Some(format!("changed to {}", state.state)),
                        entity_id: Some(id.clone()),
                        state: Some(state.state.clone()),
                        domain: Some(state.domain().to_string()),
                    })
                })
            })
            .collect())
    }

    async fn get_error_log(&self) -> Result<String> {
        self.check_online()?;
        Ok(self.error_log.clone())
    }

    async fn render_template(&self, template: &str) -> Result<String> {
        self.check_online()?;
        Ok(format!("rendered: {template}"))
    }

    async fn fire_event(&self, event_type: &str, _data: Value) -> Result<ApiMessage> {
        self.check_online()?;
        Ok(ApiMessage {
            message: format!("Event {event_type} fired."),
        })
    }

    async fn check_config(&self) -> Result<ConfigCheckResult> {
        self.check_online()?;
        Ok(ConfigCheckResult {
            result: "valid".to_string(),
            errors: None,
            warnings: None,
        })
    }

    async fn get_automation_config(&self, automation_id: &str) -> Result<Value> {
        self.check_online()?;
        self.automation_configs
            .get(automation_id)
            .cloned()
            .ok_or_else(|| {
                HassError::not_found(format!("Automation config not found: {automation_id}"))
            })
    }
}
