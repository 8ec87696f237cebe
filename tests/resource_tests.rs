//! Tests for MCP resources served from a mocked Home Assistant

use hass_mcp_rust::HassBackend;
use pretty_assertions::assert_eq;
use pulseengine_mcp_protocol::ReadResourceRequestParam;
use pulseengine_mcp_server::backend::{BackendError, McpBackend};
use rstest::*;
use serde_json::{json, Value};

mod common;
use common::{backend_for, entity, first_page, MockHassServer};

async fn read(backend: &HassBackend, uri: &str) -> Value {
    let result = backend
        .read_resource(ReadResourceRequestParam {
            uri: uri.to_string(),
        })
        .await
        .unwrap_or_else(|e| panic!("reading {uri} failed: {e}"));
    assert_eq!(result.contents.len(), 1);
    assert_eq!(result.contents[0].uri, uri);
    assert_eq!(
        result.contents[0].mime_type.as_deref(),
        Some("application/json")
    );
    serde_json::from_str(result.contents[0].text.as_deref().unwrap()).unwrap()
}

#[tokio::test]
async fn test_lists_static_resources_and_templates() {
    let mock = MockHassServer::start().await;
    let backend = backend_for(&mock);

    let resources = backend
        .list_resources(first_page())
        .await
        .unwrap()
        .resources;
    let uris: Vec<&str> = resources.iter().map(|r| r.uri.as_str()).collect();
    assert_eq!(
        uris,
        vec![
            "hass://entities",
            "hass://config",
            "hass://services",
            "hass://anomalies",
            "hass://suggestions",
            "hass://relationships",
        ]
    );

    let templates = backend
        .list_resource_templates(first_page())
        .await
        .unwrap()
        .resource_templates;
    assert_eq!(templates.len(), 5);
    assert!(templates
        .iter()
        .any(|t| t.uri_template == "hass://search/{query}/{limit}"));
}

#[rstest]
#[case("hass://entities")]
#[case("hass://config")]
#[case("hass://services")]
#[case("hass://anomalies")]
#[case("hass://suggestions")]
#[case("hass://relationships")]
#[tokio::test]
async fn test_every_static_resource_reads(#[case] uri: &str) {
    let mock = MockHassServer::start().await;
    let value = read(&backend_for(&mock), uri).await;
    assert!(value.is_object());
}

#[tokio::test]
async fn test_entities_grouped_by_domain() {
    let mock = MockHassServer::start().await;
    let value = read(&backend_for(&mock), "hass://entities").await;

    assert_eq!(value["count"], json!(7));
    let lights = value["domains"]["light"].as_array().unwrap();
    assert_eq!(lights.len(), 2);
    assert!(lights[0].get("attributes").is_none());
}

#[tokio::test]
async fn test_services_catalog_lists_names() {
    let mock = MockHassServer::start().await;
    let value = read(&backend_for(&mock), "hass://services").await;
    assert_eq!(value["light"], json!(["turn_off", "turn_on"]));
}

#[tokio::test]
async fn test_anomalies_resource() {
    let mock = MockHassServer::start().await;
    let value = read(&backend_for(&mock), "hass://anomalies").await;

    let kinds: Vec<&str> = value["anomalies"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|a| a["kind"].as_str())
        .collect();
    assert!(kinds.contains(&"low_battery"));
    assert!(kinds.contains(&"unavailable"));
    assert_eq!(
        value["summary"]["total"].as_u64().unwrap() as usize,
        kinds.len()
    );
}

#[tokio::test]
async fn test_suggestions_resource() {
    let mock = MockHassServer::start().await;
    let value = read(&backend_for(&mock), "hass://suggestions").await;
    let ids: Vec<&str> = value["suggestions"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|s| s["id"].as_str())
        .collect();
    assert!(ids.contains(&"motion_lighting_kitchen"));
    assert!(ids.contains(&"low_battery_alerts"));
}

#[tokio::test]
async fn test_entity_template() {
    let mock = MockHassServer::start().await;
    let value = read(&backend_for(&mock), "hass://entities/sensor.kitchen_temperature").await;
    assert_eq!(value["state"], json!("21.5"));
    assert_eq!(value["attributes"]["unit_of_measurement"], json!("°C"));
}

#[tokio::test]
async fn test_domain_template() {
    let mock = MockHassServer::start().await;
    let value = read(&backend_for(&mock), "hass://entities/domain/sensor").await;
    assert_eq!(value["domain"], json!("sensor"));
    assert_eq!(value["count"], json!(2));
}

#[tokio::test]
async fn test_search_template_decodes_query() {
    let mock = MockHassServer::start().await;
    let value = read(&backend_for(&mock), "hass://search/kitchen%20temperature/3").await;

    assert_eq!(value["query"], json!("kitchen temperature"));
    let results = value["results"].as_array().unwrap();
    assert!(results.len() <= 3);
    assert_eq!(results[0]["entity_id"], json!("sensor.kitchen_temperature"));
}

#[tokio::test]
async fn test_relationships_template() {
    let mock = MockHassServer::start().await;
    let value = read(&backend_for(&mock), "hass://relationships/light.kitchen_ceiling").await;

    let relationships = value["relationships"].as_array().unwrap();
    assert!(relationships.iter().any(|r| {
        r["source"] == json!("binary_sensor.kitchen_motion")
            || r["target"] == json!("binary_sensor.kitchen_motion")
    }));
}

#[tokio::test]
async fn test_history_template() {
    let mock = MockHassServer::start().await;
    mock.mock_history(vec![
        entity("sensor.kitchen_temperature", "20.0", json!({})),
        json!({"state": "23.0", "last_changed": "2024-05-01T12:00:00+00:00"}),
    ])
    .await;

    let value = read(&backend_for(&mock), "hass://history/sensor.kitchen_temperature").await;
    assert_eq!(value["hours"], json!(24));
    assert_eq!(value["stats"]["changes"], json!(1));
    assert_eq!(value["stats"]["numeric"]["max"], json!(23.0));
}

#[rstest]
#[case("hass://nothing-here")]
#[case("hass://entities/light.kitchen_ceiling/extra")]
#[case("ftp://example.com/file")]
#[case("hass://entities/light.attic")]
#[case("hass://relationships/light.attic")]
#[tokio::test]
async fn test_unknown_resources_are_not_found(#[case] uri: &str) {
    let mock = MockHassServer::start().await;
    let err = backend_for(&mock)
        .read_resource(ReadResourceRequestParam {
            uri: uri.to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::NotSupported(_)), "{uri}: {err}");
}

#[rstest]
#[case("hass://entities/NotAnEntity")]
#[case("hass://search/lights/many")]
#[tokio::test]
async fn test_malformed_parameters_are_rejected(#[case] uri: &str) {
    let mock = MockHassServer::start().await;
    let err = backend_for(&mock)
        .read_resource(ReadResourceRequestParam {
            uri: uri.to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Configuration(_)), "{uri}: {err}");
}
