//! WireMock-based Home Assistant API mocking infrastructure
//!
//! Provides a mock HTTP server that answers the REST endpoints the server
//! uses, so tests can run without a Home Assistant instance.

use serde_json::{json, Value};
use wiremock::{
    matchers::{header, method, path, path_regex},
    Mock, MockServer, ResponseTemplate,
};

pub const TEST_TOKEN: &str = "test-token";

/// Mock Home Assistant instance for testing
pub struct MockHassServer {
    pub server: MockServer,
    pub base_url: String,
}

impl MockHassServer {
    /// Start a mock instance with the default endpoints mounted
    pub async fn start() -> Self {
        let mock_server = Self::start_empty().await;
        mock_server.setup_default_mocks().await;
        mock_server
    }

    /// Start a mock instance with no endpoints
    pub async fn start_empty() -> Self {
        let server = MockServer::start().await;
        let base_url = server.uri();
        Self { server, base_url }
    }

    async fn setup_default_mocks(&self) {
        self.mock_api_status().await;
        self.mock_config().await;
        self.mock_states(default_states()).await;
        self.mock_services().await;
    }

    /// `GET /api/` guarded by the bearer token
    pub async fn mock_api_status(&self) {
        Mock::given(method("GET"))
            .and(path("/api/"))
            .and(header("authorization", format!("Bearer {TEST_TOKEN}").as_str()))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"message": "API running."})),
            )
            .mount(&self.server)
            .await;
    }

    pub async fn mock_config(&self) {
        Mock::given(method("GET"))
            .and(path("/api/config"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "location_name": "Test Home",
                "version": "2024.10.1",
                "time_zone": "Europe/Berlin",
                "unit_system": {"length": "km", "temperature": "°C"},
                "components": ["light", "sensor", "automation", "homeassistant"],
                "latitude": 52.52,
                "longitude": 13.40,
                "elevation": 34.0,
                "config_dir": "/config",
                "state": "RUNNING"
            })))
            .mount(&self.server)
            .await;
    }

    /// `GET /api/states` plus one `GET /api/states/{id}` route per entity
    pub async fn mock_states(&self, states: Vec<Value>) {
        for state in &states {
            let entity_id = state["entity_id"].as_str().unwrap_or_default();
            Mock::given(method("GET"))
                .and(path(format!("/api/states/{entity_id}")))
                .respond_with(ResponseTemplate::new(200).set_body_json(state.clone()))
                .mount(&self.server)
                .await;
        }

        Mock::given(method("GET"))
            .and(path("/api/states"))
            .respond_with(ResponseTemplate::new(200).set_body_json(Value::Array(states)))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_services(&self) {
        Mock::given(method("GET"))
            .and(path("/api/services"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "domain": "light",
                    "services": {
                        "turn_on": {"name": "Turn on", "description": "Turn on lights", "fields": {"brightness_pct": {}}},
                        "turn_off": {"name": "Turn off", "description": "Turn off lights", "fields": {}}
                    }
                },
                {
                    "domain": "homeassistant",
                    "services": {
                        "restart": {"name": "Restart", "description": "Restart Home Assistant", "fields": {}}
                    }
                }
            ])))
            .mount(&self.server)
            .await;
    }

    /// `POST /api/services/{domain}/{service}` answering with the changed states
    pub async fn mock_service_call(&self, domain: &str, service: &str, changed: Vec<Value>) {
        Mock::given(method("POST"))
            .and(path(format!("/api/services/{domain}/{service}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(Value::Array(changed)))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    pub async fn mock_history(&self, series: Vec<Value>) {
        Mock::given(method("GET"))
            .and(path_regex(r"^/api/history/period/.+"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([series])))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_template(&self, rendered: &str) {
        Mock::given(method("POST"))
            .and(path("/api/template"))
            .respond_with(ResponseTemplate::new(200).set_body_string(rendered))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_error_log(&self, log: &str) {
        Mock::given(method("GET"))
            .and(path("/api/error_log"))
            .respond_with(ResponseTemplate::new(200).set_body_string(log))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_automation_config(&self, id: &str, config: Value) {
        Mock::given(method("GET"))
            .and(path(format!("/api/config/automation/config/{id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(config))
            .mount(&self.server)
            .await;
    }

    /// Answer every request under `/api/` with the given status
    pub async fn mock_failure(&self, status: u16, message: &str) {
        Mock::given(path_regex(r"^/api/.*"))
            .respond_with(
                ResponseTemplate::new(status).set_body_json(json!({"message": message})),
            )
            .mount(&self.server)
            .await;
    }
}

pub fn entity(entity_id: &str, state: &str, attributes: Value) -> Value {
    json!({
        "entity_id": entity_id,
        "state": state,
        "attributes": attributes,
        "last_changed": "2024-05-01T10:00:00+00:00",
        "last_updated": "2024-05-01T10:00:00+00:00",
        "context": {"id": "01HX0000000000000000000000", "parent_id": null, "user_id": null}
    })
}

/// A small house: kitchen and living room with lights, sensors and an automation
pub fn default_states() -> Vec<Value> {
    vec![
        entity(
            "light.kitchen_ceiling",
            "on",
            json!({"friendly_name": "Kitchen Ceiling", "brightness": 200}),
        ),
        entity(
            "light.living_room_lamp",
            "off",
            json!({"friendly_name": "Living Room Lamp"}),
        ),
        entity(
            "sensor.kitchen_temperature",
            "21.5",
            json!({"friendly_name": "Kitchen Temperature", "device_class": "temperature", "unit_of_measurement": "°C"}),
        ),
        entity(
            "sensor.kitchen_temperature_battery",
            "4",
            json!({"friendly_name": "Kitchen Sensor Battery", "device_class": "battery", "unit_of_measurement": "%"}),
        ),
        entity(
            "binary_sensor.kitchen_motion",
            "off",
            json!({"friendly_name": "Kitchen Motion", "device_class": "motion"}),
        ),
        entity(
            "switch.living_room_fan",
            "unavailable",
            json!({"friendly_name": "Living Room Fan"}),
        ),
        entity(
            "automation.kitchen_lights",
            "on",
            json!({"friendly_name": "Kitchen Lights", "id": "1700000000001", "last_triggered": "2024-05-01T09:00:00+00:00"}),
        ),
    ]
}
