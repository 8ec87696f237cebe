//! Data models for Home Assistant REST API payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// State object for a single entity (`GET /api/states/{entity_id}`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityState {
    /// Entity id in `domain.object_id` form
    pub entity_id: String,
    /// Current state value (always a string in Home Assistant)
    pub state: String,
    /// Free-form attributes
    #[serde(default)]
    pub attributes: Map<String, Value>,
    /// When the state value last changed
    #[serde(default)]
    pub last_changed: Option<DateTime<Utc>>,
    /// When the state or attributes last changed
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    /// Context of the change that produced this state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl EntityState {
    /// Create a state with no attributes or timestamps
    pub fn new(entity_id: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            state: state.into(),
            attributes: Map::new(),
            last_changed: None,
            last_updated: None,
            context: None,
        }
    }

    /// Add an attribute (builder style)
    pub fn with_attribute(mut self, key: &str, value: Value) -> Self {
        self.attributes.insert(key.to_string(), value);
        self
    }

    /// Set both timestamps (builder style)
    pub fn with_timestamps(mut self, last_changed: DateTime<Utc>, last_updated: DateTime<Utc>) -> Self {
        self.last_changed = Some(last_changed);
        self.last_updated = Some(last_updated);
        self
    }

    /// Domain part of the entity id
    pub fn domain(&self) -> &str {
        self.entity_id
            .split_once('.')
            .map(|(domain, _)| domain)
            .unwrap_or(&self.entity_id)
    }

    /// Object id part of the entity id
    pub fn object_id(&self) -> &str {
        self.entity_id
            .split_once('.')
            .map(|(_, object_id)| object_id)
            .unwrap_or(&self.entity_id)
    }

    /// Attribute as a string, if present
    pub fn attribute_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Value::as_str)
    }

    /// Attribute as a number, accepting numeric strings
    pub fn attribute_f64(&self, name: &str) -> Option<f64> {
        match self.attributes.get(name)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Friendly name, falling back to the object id
    pub fn friendly_name(&self) -> &str {
        self.attribute_str("friendly_name")
            .unwrap_or_else(|| self.object_id())
    }

    /// Device class attribute
    pub fn device_class(&self) -> Option<&str> {
        self.attribute_str("device_class")
    }

    /// Unit of measurement attribute
    pub fn unit(&self) -> Option<&str> {
        self.attribute_str("unit_of_measurement")
    }

    /// State parsed as a number
    pub fn numeric_state(&self) -> Option<f64> {
        self.state.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }

    /// Whether the entity currently reports no usable value
    pub fn is_unavailable(&self) -> bool {
        matches!(self.state.as_str(), "unavailable" | "unknown")
    }

    /// Compact representation used by list-style tools
    pub fn lean(&self) -> Value {
        let mut lean = serde_json::json!({
            "entity_id": self.entity_id,
            "state": self.state,
            "friendly_name": self.friendly_name(),
        });
        if let Some(unit) = self.unit() {
            lean["unit"] = Value::String(unit.to_string());
        }
        if let Some(device_class) = self.device_class() {
            lean["device_class"] = Value::String(device_class.to_string());
        }
        lean
    }
}

/// Instance configuration (`GET /api/config`)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HassInfo {
    /// Home Assistant version
    #[serde(default)]
    pub version: String,
    /// Instance name
    #[serde(default)]
    pub location_name: String,
    /// Time zone identifier
    #[serde(default)]
    pub time_zone: String,
    /// Unit system (length, mass, temperature, volume, ...)
    #[serde(default)]
    pub unit_system: HashMap<String, String>,
    /// Loaded components
    #[serde(default)]
    pub components: Vec<String>,
    /// Latitude
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Longitude
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Elevation
    #[serde(default)]
    pub elevation: Option<f64>,
    /// Configuration directory
    #[serde(default)]
    pub config_dir: Option<String>,
    /// Run state ("RUNNING", "STARTING", ...)
    #[serde(default)]
    pub state: Option<String>,
}

/// Service description inside a domain listing
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServiceDescription {
    /// Human-readable name
    #[serde(default)]
    pub name: Option<String>,
    /// Description
    #[serde(default)]
    pub description: Option<String>,
    /// Field definitions
    #[serde(default)]
    pub fields: Map<String, Value>,
    /// Target selector, if the service accepts entity targets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Value>,
}

/// Services offered by one domain (`GET /api/services`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDomain {
    /// Domain name
    pub domain: String,
    /// Services keyed by service name
    #[serde(default)]
    pub services: HashMap<String, ServiceDescription>,
}

/// Parameters for a history request
#[derive(Debug, Clone)]
pub struct HistoryQuery {
    /// Entity to fetch history for
    pub entity_id: String,
    /// Start of the window
    pub start: DateTime<Utc>,
    /// End of the window (defaults to now on the server)
    pub end: Option<DateTime<Utc>>,
    /// Ask the server to drop attributes from all but the first and last entries
    pub minimal_response: bool,
    /// Ask the server to drop attributes entirely
    pub no_attributes: bool,
}

impl HistoryQuery {
    /// History for the last `hours` hours
    pub fn last_hours(entity_id: impl Into<String>, hours: u32, now: DateTime<Utc>) -> Self {
        Self {
            entity_id: entity_id.into(),
            start: now - chrono::Duration::hours(i64::from(hours)),
            end: Some(now),
            minimal_response: true,
            no_attributes: true,
        }
    }
}

/// Entry from the logbook (`GET /api/logbook/{timestamp}`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogbookEntry {
    /// When the entry was recorded
    pub when: DateTime<Utc>,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Message text
    #[serde(default)]
    pub message: Option<String>,
    /// Entity that produced the entry
    #[serde(default)]
    pub entity_id: Option<String>,
    /// New state, if the entry records a state change
    #[serde(default)]
    pub state: Option<String>,
    /// Domain of the entry
    #[serde(default)]
    pub domain: Option<String>,
}

/// Result of `POST /api/config/core/check_config`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigCheckResult {
    /// "valid" or "invalid"
    pub result: String,
    /// Error text when invalid
    #[serde(default)]
    pub errors: Option<String>,
    /// Warning text
    #[serde(default)]
    pub warnings: Option<String>,
}

impl ConfigCheckResult {
    /// Whether Home Assistant accepted the configuration
    pub fn is_valid(&self) -> bool {
        self.result == "valid"
    }
}

/// Generic message payload (`GET /api/`, `POST /api/events/...`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiMessage {
    /// Message text
    pub message: String,
}
