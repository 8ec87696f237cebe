//! Analysis tools backed by the intelligence layer

use crate::intelligence::{self, Severity};
use crate::tools::{ToolContext, ToolResponse};
use crate::validation::{clamp_limit, validate_domain, validate_entity_id};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct DetectAnomaliesArgs {
    /// Only inspect entities of this domain
    #[serde(default)]
    pub domain: Option<String>,
    /// Minimum severity to report: `info`, `warning` or `critical`
    #[serde(default)]
    pub min_severity: Option<String>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct FindRelatedArgs {
    /// Entity to find relationships for; omit for the whole graph
    #[serde(default)]
    pub entity_id: Option<String>,
    /// Maximum number of relationships (default 50)
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct CheckDeprecationsArgs {
    /// YAML or JSON configuration text to scan
    #[serde(default)]
    pub content: Option<String>,
    /// Id of a stored automation to fetch and scan instead
    #[serde(default)]
    pub automation_id: Option<String>,
}

pub async fn detect_anomalies(context: ToolContext, args: DetectAnomaliesArgs) -> ToolResponse {
    if let Some(domain) = &args.domain {
        if let Err(e) = validate_domain(domain) {
            return ToolResponse::error(e.to_string());
        }
    }
    let min_severity = match args.min_severity.as_deref().map(str::parse::<Severity>) {
        None => Severity::Info,
        Some(Ok(severity)) => severity,
        Some(Err(e)) => return ToolResponse::error(e),
    };

    let mut states = match context.client.get_states().await {
        Ok(states) => states,
        Err(e) => return ToolResponse::error(e.to_string()),
    };
    if let Some(domain) = &args.domain {
        states.retain(|s| s.domain() == domain);
    }

    let anomalies: Vec<_> =
        intelligence::detect_anomalies(&states, context.now(), &context.config.intelligence)
            .into_iter()
            .filter(|a| a.severity >= min_severity)
            .collect();
    let summary = intelligence::summarize(&anomalies);
    debug!("Scanned {} entities, {} anomalies", states.len(), anomalies.len());

    ToolResponse::success_with_message(
        json!({
            "scanned": states.len(),
            "summary": summary,
            "anomalies": anomalies,
        }),
        format!("Found {} anomalies in {} entities", anomalies.len(), states.len()),
    )
}

pub async fn suggest_automations(context: ToolContext) -> ToolResponse {
    let states = match context.client.get_states().await {
        Ok(states) => states,
        Err(e) => return ToolResponse::error(e.to_string()),
    };

    let suggestions = intelligence::suggest_automations(&states);
    ToolResponse::success_with_message(
        json!({"suggestions": suggestions, "count": suggestions.len()}),
        format!("{} automation ideas", suggestions.len()),
    )
}

pub async fn find_related_entities(context: ToolContext, args: FindRelatedArgs) -> ToolResponse {
    if let Some(entity_id) = &args.entity_id {
        if let Err(e) = validate_entity_id(entity_id) {
            return ToolResponse::error(e.to_string());
        }
    }

    let states = match context.client.get_states().await {
        Ok(states) => states,
        Err(e) => return ToolResponse::error(e.to_string()),
    };
    let limit = clamp_limit(args.limit, 50, context.config.intelligence.max_search_limit);

    let (mut relationships, scope) = match &args.entity_id {
        Some(entity_id) => {
            if !states.iter().any(|s| &s.entity_id == entity_id) {
                return ToolResponse::not_found(entity_id, None);
            }
            (intelligence::related_to(&states, entity_id), entity_id.clone())
        }
        None => (intelligence::infer_relationships(&states), "all".to_string()),
    };

    let total = relationships.len();
    relationships.truncate(limit);
    ToolResponse::success_with_message(
        json!({
            "entity_id": scope,
            "relationships": relationships,
            "count": relationships.len(),
            "total": total,
        }),
        format!("Found {total} relationships"),
    )
}

pub async fn check_deprecations(context: ToolContext, args: CheckDeprecationsArgs) -> ToolResponse {
    let (source, content) = match (args.content, args.automation_id) {
        (Some(content), _) if !content.trim().is_empty() => ("content".to_string(), content),
        (_, Some(automation_id)) => {
            let config = match context.client.get_automation_config(&automation_id).await {
                Ok(config) => config,
                Err(e) => return ToolResponse::error(e.to_string()),
            };
            match serde_json::to_string_pretty(&config) {
                Ok(text) => (format!("automation:{automation_id}"), text),
                Err(e) => return ToolResponse::error(e.to_string()),
            }
        }
        _ => {
            return ToolResponse::error(
                "Provide either content or automation_id to check".to_string(),
            )
        }
    };

    let findings = intelligence::check_deprecations(&content);
    let message = if findings.is_empty() {
        "No deprecated patterns found".to_string()
    } else {
        format!("Found {} deprecated patterns", findings.len())
    };
    ToolResponse::success_with_message(
        json!({
            "source": source,
            "findings": findings,
            "count": findings.len(),
        }),
        message,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::EntityState;
    use crate::config::ServerConfig;
    use crate::mock::MockHassClient;
    use std::sync::Arc;

    fn context(mock: MockHassClient) -> ToolContext {
        ToolContext::new(Arc::new(mock), Arc::new(ServerConfig::default()))
    }

    fn states() -> Vec<EntityState> {
        vec![
            EntityState::new("sensor.porch_battery", "3")
                .with_attribute("device_class", json!("battery")),
            EntityState::new("light.porch", "unknown"),
            EntityState::new("light.porch_spot", "off"),
        ]
    }

    #[tokio::test]
    async fn test_detect_anomalies_min_severity() {
        let ctx = context(MockHassClient::new().with_states(states()));
        let response = detect_anomalies(
            ctx,
            DetectAnomaliesArgs {
                domain: None,
                min_severity: Some("warning".to_string()),
            },
        )
        .await;
        assert_eq!(response.data["summary"]["total"], json!(1));
        assert_eq!(response.data["anomalies"][0]["kind"], json!("low_battery"));
        assert_eq!(response.data["anomalies"][0]["severity"], json!("critical"));
    }

    #[tokio::test]
    async fn test_detect_anomalies_bad_severity() {
        let ctx = context(MockHassClient::new());
        let response = detect_anomalies(
            ctx,
            DetectAnomaliesArgs {
                domain: None,
                min_severity: Some("extreme".to_string()),
            },
        )
        .await;
        assert!(response.is_error());
    }

    #[tokio::test]
    async fn test_find_related_unknown_entity() {
        let ctx = context(MockHassClient::new().with_states(states()));
        let response = find_related_entities(
            ctx,
            FindRelatedArgs {
                entity_id: Some("light.attic".to_string()),
                limit: None,
            },
        )
        .await;
        assert_eq!(response.data["found"], json!(false));
    }

    #[tokio::test]
    async fn test_find_related_for_entity() {
        let ctx = context(MockHassClient::new().with_states(states()));
        let response = find_related_entities(
            ctx,
            FindRelatedArgs {
                entity_id: Some("light.porch_spot".to_string()),
                limit: None,
            },
        )
        .await;
        assert_eq!(response.data["count"], json!(1));
        assert_eq!(
            response.data["relationships"][0]["kind"],
            json!("same_area")
        );
    }

    #[tokio::test]
    async fn test_check_deprecations_from_stored_automation() {
        let ctx = context(MockHassClient::new().with_automation_config(
            "1700000000",
            json!({"alias": "Old", "trigger": [{"platform": "sun"}], "action": [{"service": "light.turn_on"}]}),
        ));
        let response = check_deprecations(
            ctx,
            CheckDeprecationsArgs {
                content: None,
                automation_id: Some("1700000000".to_string()),
            },
        )
        .await;
        assert_eq!(response.data["source"], json!("automation:1700000000"));
        let rules: Vec<&str> = response.data["findings"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|f| f["rule_id"].as_str())
            .collect();
        assert!(rules.contains(&"trigger_platform"));
        assert!(rules.contains(&"service_to_action"));
        assert!(rules.contains(&"singular_top_level_key"));
    }

    #[tokio::test]
    async fn test_check_deprecations_requires_input() {
        let ctx = context(MockHassClient::new());
        let response = check_deprecations(ctx, CheckDeprecationsArgs::default()).await;
        assert!(response.is_error());
    }
}
