//! MCP Resources implementation for read-only data access
//!
//! Resources expose Home Assistant data as JSON documents addressed by URI.
//! Every read fetches fresh data; nothing is cached.
//!
//! ## Resource URI Scheme
//!
//! Static resources:
//! - `hass://entities` - All entities grouped by domain
//! - `hass://config` - Instance configuration
//! - `hass://services` - Service catalog
//! - `hass://anomalies` - Current anomaly scan
//! - `hass://suggestions` - Automation suggestions
//! - `hass://relationships` - Inferred relationship graph
//!
//! Templates:
//! - `hass://entities/{entity_id}` - One entity with all attributes
//! - `hass://entities/domain/{domain}` - Entities of one domain
//! - `hass://search/{query}/{limit}` - Semantic search (query percent-encoded)
//! - `hass://relationships/{entity_id}` - Relationships of one entity
//! - `hass://history/{entity_id}` - Last 24 hours of state history

use crate::client::{EntityState, HistoryQuery};
use crate::error::{HassError, Result};
use crate::intelligence;
use crate::tools::system::history_stats;
use crate::tools::ToolContext;
use crate::validation::{clamp_limit, validate_domain, validate_entity_id};
use pulseengine_mcp_protocol::{Resource, ResourceTemplate};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

pub const MIME_JSON: &str = "application/json";

const HISTORY_HOURS: u32 = 24;

fn resource(uri: &str, name: &str, description: &str) -> Resource {
    Resource {
        uri: uri.to_string(),
        name: name.to_string(),
        description: Some(description.to_string()),
        mime_type: Some(MIME_JSON.to_string()),
        annotations: None,
        raw: None,
    }
}

fn template(uri_template: &str, name: &str, description: &str) -> ResourceTemplate {
    ResourceTemplate {
        uri_template: uri_template.to_string(),
        name: name.to_string(),
        description: Some(description.to_string()),
        mime_type: Some(MIME_JSON.to_string()),
    }
}

/// Static resources
pub fn static_resources() -> Vec<Resource> {
    vec![
        resource(
            "hass://entities",
            "All Entities",
            "Every entity with its current state, grouped by domain",
        ),
        resource(
            "hass://config",
            "Instance Configuration",
            "Location, version, units, time zone and loaded components",
        ),
        resource(
            "hass://services",
            "Service Catalog",
            "Available services per domain",
        ),
        resource(
            "hass://anomalies",
            "Anomalies",
            "Unavailable devices, low batteries, stale sensors and implausible readings",
        ),
        resource(
            "hass://suggestions",
            "Automation Suggestions",
            "Automation ideas based on which entities exist together",
        ),
        resource(
            "hass://relationships",
            "Entity Relationships",
            "Inferred groups, trackers, devices and rooms",
        ),
    ]
}

/// Parameterized resources
pub fn resource_templates() -> Vec<ResourceTemplate> {
    vec![
        template(
            "hass://entities/{entity_id}",
            "Entity",
            "One entity with all attributes",
        ),
        template(
            "hass://entities/domain/{domain}",
            "Domain Entities",
            "All entities of one domain",
        ),
        template(
            "hass://search/{query}/{limit}",
            "Entity Search",
            "Semantic entity search; query is percent-encoded",
        ),
        template(
            "hass://relationships/{entity_id}",
            "Entity Relationships",
            "Relationships touching one entity",
        ),
        template(
            "hass://history/{entity_id}",
            "Entity History",
            "State history of the last 24 hours with statistics",
        ),
    ]
}

/// Parse a URI against a template and extract parameters
///
/// Segments are compared exactly; `{name}` segments capture one segment each.
pub fn parse_uri_template(uri: &str, template: &str) -> Option<HashMap<String, String>> {
    let uri_parts: Vec<&str> = uri.split('/').collect();
    let template_parts: Vec<&str> = template.split('/').collect();

    if uri_parts.len() != template_parts.len() {
        return None;
    }

    let mut params = HashMap::new();

    for (uri_part, template_part) in uri_parts.iter().zip(template_parts.iter()) {
        if let Some(name) = template_part
            .strip_prefix('{')
            .and_then(|p| p.strip_suffix('}'))
        {
            if uri_part.is_empty() {
                return None;
            }
            params.insert(name.to_string(), uri_part.to_string());
        } else if uri_part != template_part {
            return None;
        }
    }

    Some(params)
}

fn param<'a>(params: &'a HashMap<String, String>, name: &str) -> Result<&'a str> {
    params
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| HassError::invalid_input(format!("Missing URI parameter: {name}")))
}

fn decode(raw: &str) -> Result<String> {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .map_err(|e| HassError::invalid_input(format!("Invalid percent-encoding in URI: {e}")))
}

fn group_by_domain(states: &[EntityState]) -> Value {
    let mut grouped: BTreeMap<&str, Vec<Value>> = BTreeMap::new();
    for state in states {
        grouped.entry(state.domain()).or_default().push(state.lean());
    }
    json!({
        "count": states.len(),
        "domains": grouped,
    })
}

async fn read_static(context: &ToolContext, uri: &str) -> Result<Option<Value>> {
    let value = match uri {
        "hass://entities" => group_by_domain(&context.client.get_states().await?),
        "hass://config" => serde_json::to_value(context.client.get_config().await?)?,
        "hass://services" => {
            let catalog: BTreeMap<String, Vec<String>> = context
                .client
                .get_services()
                .await?
                .into_iter()
                .map(|d| {
                    let mut names: Vec<String> = d.services.into_keys().collect();
                    names.sort();
                    (d.domain, names)
                })
                .collect();
            json!(catalog)
        }
        "hass://anomalies" => {
            let states = context.client.get_states().await?;
            let anomalies = intelligence::detect_anomalies(
                &states,
                context.now(),
                &context.config.intelligence,
            );
            json!({
                "summary": intelligence::summarize(&anomalies),
                "anomalies": anomalies,
            })
        }
        "hass://suggestions" => {
            let states = context.client.get_states().await?;
            json!({"suggestions": intelligence::suggest_automations(&states)})
        }
        "hass://relationships" => {
            let states = context.client.get_states().await?;
            json!({"relationships": intelligence::infer_relationships(&states)})
        }
        _ => return Ok(None),
    };
    Ok(Some(value))
}

async fn read_templated(context: &ToolContext, uri: &str) -> Result<Option<Value>> {
    if let Some(params) = parse_uri_template(uri, "hass://entities/domain/{domain}") {
        let domain = param(&params, "domain")?;
        validate_domain(domain)?;
        let states: Vec<EntityState> = context
            .client
            .get_states()
            .await?
            .into_iter()
            .filter(|s| s.domain() == domain)
            .collect();
        return Ok(Some(json!({
            "domain": domain,
            "count": states.len(),
            "entities": states.iter().map(EntityState::lean).collect::<Vec<_>>(),
        })));
    }

    if let Some(params) = parse_uri_template(uri, "hass://entities/{entity_id}") {
        let entity_id = param(&params, "entity_id")?;
        validate_entity_id(entity_id)?;
        return Ok(Some(serde_json::to_value(
            context.client.get_state(entity_id).await?,
        )?));
    }

    if let Some(params) = parse_uri_template(uri, "hass://search/{query}/{limit}") {
        let query = decode(param(&params, "query")?)?;
        let limit: usize = param(&params, "limit")?
            .parse()
            .map_err(|_| HassError::invalid_input("Search limit must be a positive integer"))?;
        let cfg = &context.config.intelligence;
        let limit = clamp_limit(Some(limit), cfg.default_search_limit, cfg.max_search_limit);
        let states = context.client.get_states().await?;
        let hits = intelligence::search_entities(&states, &query, limit);
        return Ok(Some(json!({
            "query": query,
            "results": hits,
            "count": hits.len(),
        })));
    }

    if let Some(params) = parse_uri_template(uri, "hass://relationships/{entity_id}") {
        let entity_id = param(&params, "entity_id")?;
        validate_entity_id(entity_id)?;
        let states = context.client.get_states().await?;
        if !states.iter().any(|s| s.entity_id == entity_id) {
            return Err(HassError::not_found(format!("Entity not found: {entity_id}")));
        }
        return Ok(Some(json!({
            "entity_id": entity_id,
            "relationships": intelligence::related_to(&states, entity_id),
        })));
    }

    if let Some(params) = parse_uri_template(uri, "hass://history/{entity_id}") {
        let entity_id = param(&params, "entity_id")?;
        validate_entity_id(entity_id)?;
        let query = HistoryQuery::last_hours(entity_id, HISTORY_HOURS, context.now());
        let history = context.client.get_history(&query).await?;
        return Ok(Some(json!({
            "entity_id": entity_id,
            "hours": HISTORY_HOURS,
            "stats": history_stats(&history),
            "history": history
                .iter()
                .map(|s| json!({"state": s.state, "last_changed": s.last_changed}))
                .collect::<Vec<_>>(),
        })));
    }

    Ok(None)
}

/// Read a resource as a JSON document
///
/// Unknown URIs yield [`HassError::NotFound`].
pub async fn read_resource(context: &ToolContext, uri: &str) -> Result<Value> {
    debug!("Reading resource {}", uri);
    if let Some(value) = read_static(context, uri).await? {
        return Ok(value);
    }
    if let Some(value) = read_templated(context, uri).await? {
        return Ok(value);
    }
    Err(HassError::not_found(format!("Unknown resource: {uri}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::mock::MockHassClient;
    use std::sync::Arc;

    fn context() -> ToolContext {
        let mock = MockHassClient::new().with_states(vec![
            EntityState::new("light.kitchen_ceiling", "on"),
            EntityState::new("light.kitchen_spots", "off"),
            EntityState::new("sensor.kitchen_temperature", "21"),
        ]);
        ToolContext::new(Arc::new(mock), Arc::new(ServerConfig::default()))
    }

    #[test]
    fn test_parse_uri_template() {
        let params = parse_uri_template("hass://entities/light.kitchen", "hass://entities/{entity_id}")
            .unwrap();
        assert_eq!(params.get("entity_id").map(String::as_str), Some("light.kitchen"));

        assert!(parse_uri_template("hass://entities/domain/light", "hass://entities/{entity_id}").is_none());
        assert!(parse_uri_template("hass://entities/", "hass://entities/{entity_id}").is_none());
        assert!(parse_uri_template("hass://other/x", "hass://entities/{entity_id}").is_none());
    }

    #[test]
    fn test_listed_uris() {
        assert_eq!(static_resources().len(), 6);
        assert_eq!(resource_templates().len(), 5);
        assert!(static_resources().iter().all(|r| r.uri.starts_with("hass://")));
    }

    #[tokio::test]
    async fn test_read_entities_grouped() {
        let value = read_resource(&context(), "hass://entities").await.unwrap();
        assert_eq!(value["count"], json!(3));
        assert_eq!(value["domains"]["light"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_read_domain_template() {
        let value = read_resource(&context(), "hass://entities/domain/sensor")
            .await
            .unwrap();
        assert_eq!(value["count"], json!(1));
    }

    #[tokio::test]
    async fn test_read_search_decodes_query() {
        let value = read_resource(&context(), "hass://search/kitchen%20light/1")
            .await
            .unwrap();
        assert_eq!(value["query"], json!("kitchen light"));
        assert_eq!(value["count"], json!(1));
    }

    #[tokio::test]
    async fn test_unknown_resource_is_not_found() {
        let err = read_resource(&context(), "hass://nope").await.unwrap_err();
        assert!(matches!(err, HassError::NotFound(_)));

        let err = read_resource(&context(), "hass://search/x/abc").await.unwrap_err();
        assert!(matches!(err, HassError::InvalidInput(_)));
    }
}
