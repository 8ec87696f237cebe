//! Instance-level tools: version, configuration, history, logs and restart

use crate::client::{EntityState, HistoryQuery};
use crate::tools::{ToolContext, ToolResponse};
use crate::validation::{clamp_limit, validate_entity_id, validate_hours};
use chrono::Duration as ChronoDuration;
use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::warn;

const DEFAULT_HOURS: u32 = 24;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct HistoryArgs {
    pub entity_id: String,
    /// Look-back window in hours (default 24, max 720)
    #[serde(default)]
    pub hours: Option<u32>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct LogbookArgs {
    /// Only entries for this entity
    #[serde(default)]
    pub entity_id: Option<String>,
    /// Look-back window in hours (default 24, max 720)
    #[serde(default)]
    pub hours: Option<u32>,
    /// Maximum number of entries, newest first (default 100)
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ErrorLogArgs {
    /// Number of trailing log lines to include (default 20)
    #[serde(default)]
    pub tail_lines: Option<usize>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct RestartArgs {
    /// Must be true; restarting interrupts every automation
    #[serde(default)]
    pub confirm: bool,
}

/// Home Assistant log line: `2024-05-01 10:00:00.123 ERROR (MainThread) [homeassistant.components.hue] ...`
static LOG_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\S+ \S+ (?P<level>DEBUG|INFO|WARNING|ERROR|CRITICAL) \([^)]*\) \[(?P<logger>[^\]]+)\]")
        .expect("valid log line regex")
});

/// Integration a logger name belongs to
fn integration_of(logger: &str) -> &str {
    for prefix in ["homeassistant.components.", "custom_components."] {
        if let Some(rest) = logger.strip_prefix(prefix) {
            return rest.split('.').next().unwrap_or(rest);
        }
    }
    logger
}

/// Digest of an error log: level counts, noisiest integrations and the tail
pub fn error_log_digest(log: &str, tail_lines: usize) -> Value {
    let mut levels: HashMap<&str, usize> = HashMap::new();
    let mut integrations: HashMap<&str, usize> = HashMap::new();

    for line in log.lines() {
        let Some(captures) = LOG_LINE.captures(line) else {
            continue;
        };
        let level = captures.name("level").map_or("", |m| m.as_str());
        *levels.entry(level).or_default() += 1;
        if matches!(level, "ERROR" | "CRITICAL" | "WARNING") {
            if let Some(logger) = captures.name("logger") {
                *integrations.entry(integration_of(logger.as_str())).or_default() += 1;
            }
        }
    }

    let mut top: Vec<(&str, usize)> = integrations.into_iter().collect();
    top.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    top.truncate(10);

    let lines: Vec<&str> = log.lines().collect();
    let tail = &lines[lines.len().saturating_sub(tail_lines)..];

    json!({
        "errors": levels.get("ERROR").copied().unwrap_or(0) + levels.get("CRITICAL").copied().unwrap_or(0),
        "warnings": levels.get("WARNING").copied().unwrap_or(0),
        "total_lines": lines.len(),
        "top_integrations": top
            .into_iter()
            .map(|(name, count)| json!({"integration": name, "count": count}))
            .collect::<Vec<_>>(),
        "tail": tail,
    })
}

/// Change count and numeric statistics for a state history
pub fn history_stats(history: &[EntityState]) -> Value {
    let changes = history
        .windows(2)
        .filter(|pair| pair[0].state != pair[1].state)
        .count();

    let numeric: Vec<f64> = history.iter().filter_map(EntityState::numeric_state).collect();
    let numeric_stats = if numeric.is_empty() {
        Value::Null
    } else {
        let min = numeric.iter().copied().fold(f64::INFINITY, f64::min);
        let max = numeric.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = numeric.iter().sum::<f64>() / numeric.len() as f64;
        json!({
            "min": min,
            "max": max,
            "mean": (mean * 100.0).round() / 100.0,
            "samples": numeric.len(),
        })
    };

    json!({
        "entries": history.len(),
        "changes": changes,
        "numeric": numeric_stats,
    })
}

pub async fn get_version(context: ToolContext) -> ToolResponse {
    match context.client.get_config().await {
        Ok(info) => ToolResponse::success_with_message(
            json!({"version": info.version}),
            format!("Home Assistant {}", info.version),
        ),
        Err(e) => ToolResponse::error(e.to_string()),
    }
}

pub async fn get_config(context: ToolContext) -> ToolResponse {
    match context.client.get_config().await {
        Ok(info) => ToolResponse::success(json!({
            "location_name": info.location_name,
            "version": info.version,
            "time_zone": info.time_zone,
            "unit_system": info.unit_system,
            "component_count": info.components.len(),
            "state": info.state,
        })),
        Err(e) => ToolResponse::error(e.to_string()),
    }
}

/// State history with summary statistics
pub async fn get_history(context: ToolContext, args: HistoryArgs) -> ToolResponse {
    let hours = args.hours.unwrap_or(DEFAULT_HOURS);
    if let Err(e) = validate_entity_id(&args.entity_id).and_then(|_| validate_hours(hours)) {
        return ToolResponse::error(e.to_string());
    }

    let query = HistoryQuery::last_hours(&args.entity_id, hours, context.now());
    let history = match context.client.get_history(&query).await {
        Ok(history) => history,
        Err(e) => return ToolResponse::error(e.to_string()),
    };

    let entries: Vec<Value> = history
        .iter()
        .map(|s| json!({"state": s.state, "last_changed": s.last_changed}))
        .collect();

    ToolResponse::success(json!({
        "entity_id": args.entity_id,
        "hours": hours,
        "stats": history_stats(&history),
        "history": entries,
    }))
}

/// Logbook entries, newest first
pub async fn get_logbook(context: ToolContext, args: LogbookArgs) -> ToolResponse {
    let hours = args.hours.unwrap_or(DEFAULT_HOURS);
    if let Err(e) = validate_hours(hours) {
        return ToolResponse::error(e.to_string());
    }
    if let Some(entity_id) = &args.entity_id {
        if let Err(e) = validate_entity_id(entity_id) {
            return ToolResponse::error(e.to_string());
        }
    }

    let start = context.now() - ChronoDuration::hours(i64::from(hours));
    let mut entries = match context
        .client
        .get_logbook(start, args.entity_id.as_deref())
        .await
    {
        Ok(entries) => entries,
        Err(e) => return ToolResponse::error(e.to_string()),
    };

    entries.sort_by(|a, b| b.when.cmp(&a.when));
    let total = entries.len();
    entries.truncate(clamp_limit(args.limit, 100, context.config.intelligence.max_search_limit));

    ToolResponse::success_with_message(
        json!({"entries": entries, "count": entries.len(), "total": total}),
        format!("{total} logbook entries in the last {hours} hours"),
    )
}

pub async fn get_error_log(context: ToolContext, args: ErrorLogArgs) -> ToolResponse {
    match context.client.get_error_log().await {
        Ok(log) => ToolResponse::success(error_log_digest(&log, clamp_limit(args.tail_lines, 20, 200))),
        Err(e) => ToolResponse::error(e.to_string()),
    }
}

pub async fn check_config(context: ToolContext) -> ToolResponse {
    match context.client.check_config().await {
        Ok(result) => {
            let message = if result.is_valid() {
                "Configuration is valid".to_string()
            } else {
                format!("Configuration is {}", result.result)
            };
            ToolResponse::success_with_message(
                json!({
                    "valid": result.is_valid(),
                    "result": result.result,
                    "errors": result.errors,
                    "warnings": result.warnings,
                }),
                message,
            )
        }
        Err(e) => ToolResponse::error(e.to_string()),
    }
}

/// Restart Home Assistant after explicit confirmation
pub async fn restart_ha(context: ToolContext, args: RestartArgs) -> ToolResponse {
    if !args.confirm {
        return ToolResponse::error(
            "Restart not confirmed: call restart_ha with confirm set to true".to_string(),
        );
    }

    warn!("Restarting Home Assistant on client request");
    match context
        .client
        .call_service("homeassistant", "restart", json!({}))
        .await
    {
        Ok(_) => ToolResponse::success_with_message(
            json!({"restarting": true}),
            "Home Assistant is restarting".to_string(),
        ),
        Err(e) => ToolResponse::error(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::mock::MockHassClient;
    use std::sync::Arc;

    const LOG: &str = "\
2024-05-01 10:00:00.123 ERROR (MainThread) [homeassistant.components.hue.light] Bridge unreachable
2024-05-01 10:01:00.123 WARNING (MainThread) [custom_components.hacs] Rate limited
2024-05-01 10:02:00.123 ERROR (MainThread) [homeassistant.components.hue] Retrying
Traceback (most recent call last):
2024-05-01 10:03:00.123 INFO (MainThread) [homeassistant.core] Started";

    fn context(mock: MockHassClient) -> (ToolContext, Arc<MockHassClient>) {
        let mock = Arc::new(mock);
        (
            ToolContext::new(mock.clone(), Arc::new(ServerConfig::default())),
            mock,
        )
    }

    #[test]
    fn test_error_log_digest() {
        let digest = error_log_digest(LOG, 2);
        assert_eq!(digest["errors"], json!(2));
        assert_eq!(digest["warnings"], json!(1));
        assert_eq!(digest["total_lines"], json!(5));
        assert_eq!(digest["top_integrations"][0], json!({"integration": "hue", "count": 2}));
        assert_eq!(digest["tail"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_history_stats() {
        let history = vec![
            EntityState::new("sensor.t", "20"),
            EntityState::new("sensor.t", "22"),
            EntityState::new("sensor.t", "22"),
            EntityState::new("sensor.t", "unavailable"),
            EntityState::new("sensor.t", "24"),
        ];
        let stats = history_stats(&history);
        assert_eq!(stats["entries"], json!(5));
        assert_eq!(stats["changes"], json!(3));
        assert_eq!(stats["numeric"]["min"], json!(20.0));
        assert_eq!(stats["numeric"]["max"], json!(24.0));
        assert_eq!(stats["numeric"]["mean"], json!(22.0));
    }

    #[tokio::test]
    async fn test_restart_requires_confirmation() {
        let (ctx, mock) = context(MockHassClient::new());
        let response = restart_ha(ctx.clone(), RestartArgs { confirm: false }).await;
        assert!(response.is_error());
        assert!(mock.recorded_calls().is_empty());

        let response = restart_ha(ctx, RestartArgs { confirm: true }).await;
        assert_eq!(response.status, "success");
        let calls = mock.recorded_calls();
        assert_eq!(calls[0].domain, "homeassistant");
        assert_eq!(calls[0].service, "restart");
    }

    #[tokio::test]
    async fn test_get_version_reports_failure() {
        let (ctx, _) = context(MockHassClient::new().offline());
        assert!(get_version(ctx).await.is_error());

        let (ctx, _) = context(MockHassClient::new());
        let response = get_version(ctx).await;
        assert_eq!(response.data["version"], json!("2024.10.1"));
    }

    #[tokio::test]
    async fn test_history_rejects_zero_hours() {
        let (ctx, _) = context(MockHassClient::new());
        let response = get_history(
            ctx,
            HistoryArgs {
                entity_id: "sensor.t".to_string(),
                hours: Some(0),
            },
        )
        .await;
        assert!(response.is_error());
    }
}
