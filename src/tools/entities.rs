//! Entity inspection and control tools

use crate::client::EntityState;
use crate::intelligence;
use crate::tools::{ToolContext, ToolResponse};
use crate::validation::{clamp_limit, validate_domain, validate_entity_id};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

const DEFAULT_LIST_LIMIT: usize = 100;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetEntityArgs {
    /// Entity id, e.g. `light.kitchen`
    pub entity_id: String,
    /// Attribute names to include in the lean response
    #[serde(default)]
    pub fields: Option<Vec<String>>,
    /// Return the full state object with all attributes
    #[serde(default)]
    pub detailed: bool,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ListEntitiesArgs {
    /// Only list entities of this domain
    #[serde(default)]
    pub domain: Option<String>,
    /// Case-insensitive substring matched against entity id and friendly name
    #[serde(default)]
    pub search: Option<String>,
    /// Maximum number of entities (default 100)
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchEntitiesArgs {
    /// Free-text query such as "kitchen lights" or "bedroom temperature"
    pub query: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DomainSummaryArgs {
    /// Domain to summarize, e.g. `sensor`
    pub domain: String,
    /// Number of example entities (default 5)
    #[serde(default)]
    pub example_limit: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EntityActionArgs {
    pub entity_id: String,
    /// One of `on`, `off` or `toggle`
    pub action: String,
    /// Extra service data, e.g. `{"brightness_pct": 50}`
    #[serde(default)]
    pub params: Option<Map<String, Value>>,
}

/// Service to call for an on/off/toggle action in a domain
pub fn action_service(domain: &str, action: &str) -> Option<&'static str> {
    match (domain, action) {
        ("cover", "on") => Some("open_cover"),
        ("cover", "off") => Some("close_cover"),
        ("cover", "toggle") => Some("toggle"),
        ("lock", "on") => Some("lock"),
        ("lock", "off") => Some("unlock"),
        ("lock", _) => None,
        ("button" | "input_button", _) => Some("press"),
        ("scene", "on") => Some("turn_on"),
        ("scene", _) => None,
        ("script", "on") => Some("turn_on"),
        ("script", "off") => Some("turn_off"),
        ("script", "toggle") => Some("toggle"),
        (_, "on") => Some("turn_on"),
        (_, "off") => Some("turn_off"),
        (_, "toggle") => Some("toggle"),
        _ => None,
    }
}

fn project(state: &EntityState, fields: &[String]) -> Value {
    let mut lean = state.lean();
    let attributes: Map<String, Value> = fields
        .iter()
        .filter_map(|f| state.attributes.get(f).map(|v| (f.clone(), v.clone())))
        .collect();
    if !attributes.is_empty() {
        lean["attributes"] = Value::Object(attributes);
    }
    lean
}

/// Get one entity
pub async fn get_entity(context: ToolContext, args: GetEntityArgs) -> ToolResponse {
    if let Err(e) = validate_entity_id(&args.entity_id) {
        return ToolResponse::error(e.to_string());
    }

    let state = match context.client.get_state(&args.entity_id).await {
        Ok(state) => state,
        Err(e) => return ToolResponse::error(e.to_string()),
    };

    if args.detailed {
        return ToolResponse::from_result(Ok(state));
    }
    ToolResponse::success(project(&state, args.fields.as_deref().unwrap_or_default()))
}

/// List entities with optional filters
pub async fn list_entities(context: ToolContext, args: ListEntitiesArgs) -> ToolResponse {
    if let Some(domain) = &args.domain {
        if let Err(e) = validate_domain(domain) {
            return ToolResponse::error(e.to_string());
        }
    }

    let states = match context.client.get_states().await {
        Ok(states) => states,
        Err(e) => return ToolResponse::error(e.to_string()),
    };

    let limit = clamp_limit(
        args.limit,
        DEFAULT_LIST_LIMIT,
        context.config.intelligence.max_search_limit,
    );
    let needle = args.search.as_deref().map(|s| s.trim().to_lowercase());

    let mut matching: Vec<&EntityState> = states
        .iter()
        .filter(|s| args.domain.as_deref().map_or(true, |d| s.domain() == d))
        .filter(|s| match &needle {
            Some(needle) if !needle.is_empty() => {
                s.entity_id.to_lowercase().contains(needle.as_str())
                    || s.friendly_name().to_lowercase().contains(needle.as_str())
            }
            _ => true,
        })
        .collect();
    matching.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));

    let total = matching.len();
    let entities: Vec<Value> = matching.iter().take(limit).map(|s| s.lean()).collect();
    debug!("list_entities matched {} of {} entities", total, states.len());

    ToolResponse::success_with_message(
        json!({
            "entities": entities,
            "count": entities.len(),
            "total_matching": total,
        }),
        format!("Found {total} entities"),
    )
}

/// Semantic search over all entities
pub async fn search_entities(context: ToolContext, args: SearchEntitiesArgs) -> ToolResponse {
    if args.query.trim().is_empty() {
        return ToolResponse::success_with_message(
            json!({
                "query": args.query,
                "results": [],
                "count": 0,
            }),
            "Empty query matches nothing".to_string(),
        );
    }

    let states = match context.client.get_states().await {
        Ok(states) => states,
        Err(e) => return ToolResponse::error(e.to_string()),
    };

    let cfg = &context.config.intelligence;
    let limit = clamp_limit(args.limit, cfg.default_search_limit, cfg.max_search_limit);
    let hits = intelligence::search_entities(&states, &args.query, limit);

    ToolResponse::success_with_message(
        json!({
            "query": args.query,
            "results": hits,
            "count": hits.len(),
        }),
        format!("Found {} matching entities", hits.len()),
    )
}

/// Summarize one domain
pub async fn domain_summary(context: ToolContext, args: DomainSummaryArgs) -> ToolResponse {
    if let Err(e) = validate_domain(&args.domain) {
        return ToolResponse::error(e.to_string());
    }

    let states = match context.client.get_states().await {
        Ok(states) => states,
        Err(e) => return ToolResponse::error(e.to_string()),
    };

    let in_domain: Vec<&EntityState> = states
        .iter()
        .filter(|s| s.domain() == args.domain)
        .collect();
    if in_domain.is_empty() {
        return ToolResponse::not_found(
            &args.domain,
            Some("Use list_entities to see which domains exist"),
        );
    }

    let mut state_counts: BTreeMap<&str, usize> = BTreeMap::new();
    let mut attribute_counts: HashMap<&str, usize> = HashMap::new();
    for state in &in_domain {
        *state_counts.entry(state.state.as_str()).or_default() += 1;
        for key in state.attributes.keys() {
            *attribute_counts.entry(key.as_str()).or_default() += 1;
        }
    }

    let mut common: Vec<(&str, usize)> = attribute_counts.into_iter().collect();
    common.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    common.truncate(10);

    let example_limit = clamp_limit(args.example_limit, 5, 20);
    let examples: Vec<Value> = in_domain.iter().take(example_limit).map(|s| s.lean()).collect();

    ToolResponse::success(json!({
        "domain": args.domain,
        "count": in_domain.len(),
        "states": state_counts,
        "common_attributes": common
            .into_iter()
            .map(|(name, count)| json!({"name": name, "count": count}))
            .collect::<Vec<_>>(),
        "examples": examples,
    }))
}

/// Turn an entity on or off, or toggle it
pub async fn entity_action(context: ToolContext, args: EntityActionArgs) -> ToolResponse {
    if let Err(e) = validate_entity_id(&args.entity_id) {
        return ToolResponse::error(e.to_string());
    }

    let action = args.action.trim().to_lowercase();
    let domain = args
        .entity_id
        .split_once('.')
        .map(|(d, _)| d)
        .unwrap_or_default();
    let Some(service) = action_service(domain, &action) else {
        return ToolResponse::error(format!(
            "Action '{}' is not supported for {} entities (use on, off or toggle)",
            args.action, domain
        ));
    };

    let mut data = args.params.unwrap_or_default();
    data.insert("entity_id".to_string(), Value::String(args.entity_id.clone()));

    info!("entity_action: {}.{} on {}", domain, service, args.entity_id);
    match context
        .client
        .call_service(domain, service, Value::Object(data))
        .await
    {
        Ok(changed) => ToolResponse::success_with_message(
            json!({
                "entity_id": args.entity_id,
                "service": format!("{domain}.{service}"),
                "changed_states": changed.iter().map(EntityState::lean).collect::<Vec<_>>(),
            }),
            format!("Called {domain}.{service} on {}", args.entity_id),
        ),
        Err(e) => ToolResponse::error(e.to_string()),
    }
}

/// List automation entities
pub async fn list_automations(context: ToolContext) -> ToolResponse {
    let states = match context.client.get_states().await {
        Ok(states) => states,
        Err(e) => return ToolResponse::error(e.to_string()),
    };

    let automations: Vec<Value> = states
        .iter()
        .filter(|s| s.domain() == "automation")
        .map(|s| {
            json!({
                "entity_id": s.entity_id,
                "id": s.attributes.get("id"),
                "alias": s.friendly_name(),
                "state": s.state,
                "last_triggered": s.attributes.get("last_triggered"),
                "mode": s.attributes.get("mode"),
            })
        })
        .collect();

    if automations.is_empty() {
        return ToolResponse::success_with_message(
            json!({"automations": [], "count": 0}),
            "No automations found".to_string(),
        );
    }

    let count = automations.len();
    ToolResponse::success_with_message(
        json!({"automations": automations, "count": count}),
        format!("Found {count} automations"),
    )
}
