//! MCP tool implementations for Home Assistant
//!
//! Tools are grouped by concern: entity inspection and control, service and
//! event plumbing, instance-level system information, and the analysis tools
//! backed by [`crate::intelligence`]. Every tool takes a [`ToolContext`] plus
//! its typed arguments and returns a [`ToolResponse`].

pub mod analysis;
pub mod entities;
pub mod services;
pub mod system;

use crate::client::HassClient;
use crate::config::ServerConfig;
use crate::error::Result;
use chrono::{DateTime, Utc};
use pulseengine_mcp_protocol::{CallToolRequestParam, Content, Tool};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Standard MCP tool response format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResponse {
    /// Status of the operation
    pub status: String,

    /// Response data
    pub data: Value,

    /// Optional message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl ToolResponse {
    /// Create successful response
    pub fn success(data: Value) -> Self {
        Self {
            status: "success".to_string(),
            data,
            message: None,
            timestamp: Utc::now(),
        }
    }

    /// Create successful response with message
    pub fn success_with_message(data: Value, message: String) -> Self {
        Self {
            status: "success".to_string(),
            data,
            message: Some(message),
            timestamp: Utc::now(),
        }
    }

    /// Create error response
    pub fn error(message: String) -> Self {
        Self {
            status: "error".to_string(),
            data: Value::Null,
            message: Some(message),
            timestamp: Utc::now(),
        }
    }

    /// Create response from Result
    pub fn from_result<T: Serialize>(result: Result<T>) -> Self {
        match result {
            Ok(data) => match serde_json::to_value(data) {
                Ok(value) => Self::success(value),
                Err(e) => Self::error(format!("Failed to serialize result: {e}")),
            },
            Err(e) => Self::error(e.to_string()),
        }
    }

    /// Lookup that found nothing; not an error for the caller
    pub fn not_found(identifier: &str, suggestion: Option<&str>) -> Self {
        Self {
            status: "success".to_string(),
            data: serde_json::json!({
                "requested": identifier,
                "found": false,
                "suggestion": suggestion.unwrap_or("Use search_entities to find valid entity ids")
            }),
            message: None,
            timestamp: Utc::now(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == "error"
    }
}

/// Shared tool context for all MCP tools
#[derive(Clone)]
pub struct ToolContext {
    /// Home Assistant client for API calls
    pub client: Arc<dyn HassClient>,

    /// Server configuration (thresholds and limits)
    pub config: Arc<ServerConfig>,
}

impl ToolContext {
    pub fn new(client: Arc<dyn HassClient>, config: Arc<ServerConfig>) -> Self {
        Self { client, config }
    }

    /// Reference time for time-dependent analysis
    pub fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Arguments for tools that take none
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct NoArgs {}

/// JSON schema of an argument struct, as used for `inputSchema`
pub fn input_schema<T: JsonSchema>() -> Value {
    let schema = schemars::schema_for!(T);
    let mut value = serde_json::to_value(schema).unwrap_or_else(|_| serde_json::json!({}));
    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
        obj.entry("type")
            .or_insert_with(|| Value::String("object".to_string()));
        obj.entry("properties")
            .or_insert_with(|| Value::Object(Default::default()));
    }
    value
}

/// Decode tool arguments, treating missing arguments as an empty object
pub fn parse_args<T: DeserializeOwned>(arguments: Option<Value>) -> std::result::Result<T, String> {
    let value = match arguments {
        None | Some(Value::Null) => Value::Object(Default::default()),
        Some(value) => value,
    };
    serde_json::from_value(value).map_err(|e| format!("Invalid arguments: {e}"))
}

fn tool<T: JsonSchema>(name: &str, description: &str) -> Tool {
    Tool {
        name: name.to_string(),
        description: description.to_string(),
        input_schema: input_schema::<T>(),
    }
}

/// Generate Tool definitions for all available tools
pub fn all_tools() -> Vec<Tool> {
    vec![
        // System tools
        tool::<NoArgs>("get_version", "Get the Home Assistant version"),
        tool::<NoArgs>(
            "get_config",
            "Get instance configuration: location, units, time zone and loaded components",
        ),
        // Entity tools
        tool::<entities::GetEntityArgs>(
            "get_entity",
            "Get the state of one entity, optionally projecting specific attributes",
        ),
        tool::<entities::ListEntitiesArgs>(
            "list_entities",
            "List entities with optional domain filter and substring search (lean fields)",
        ),
        tool::<entities::SearchEntitiesArgs>(
            "search_entities",
            "Semantic entity search over names, domains, device classes and states",
        ),
        tool::<entities::DomainSummaryArgs>(
            "domain_summary",
            "Summarize a domain: entity count, state distribution, common attributes and examples",
        ),
        tool::<entities::EntityActionArgs>(
            "entity_action",
            "Turn an entity on, off or toggle it using the right service for its domain",
        ),
        // Service tools
        tool::<services::CallServiceArgs>(
            "call_service",
            "Call any Home Assistant service with optional target entity and data",
        ),
        tool::<services::ListServicesArgs>(
            "list_services",
            "List available services, optionally for one domain",
        ),
        tool::<NoArgs>(
            "list_automations",
            "List automations with their state and last trigger time",
        ),
        // History tools
        tool::<system::HistoryArgs>(
            "get_history",
            "Get state history of an entity with change count and numeric statistics",
        ),
        tool::<system::LogbookArgs>("get_logbook", "Get logbook entries for a time window"),
        tool::<system::ErrorLogArgs>(
            "get_error_log",
            "Get a digest of the Home Assistant error log",
        ),
        tool::<services::RenderTemplateArgs>(
            "render_template",
            "Render a Jinja2 template through Home Assistant",
        ),
        tool::<services::FireEventArgs>("fire_event", "Fire a custom event on the event bus"),
        tool::<NoArgs>("check_config", "Validate the Home Assistant configuration"),
        tool::<system::RestartArgs>(
            "restart_ha",
            "Restart Home Assistant (requires confirm: true)",
        ),
        // Analysis tools
        tool::<analysis::DetectAnomaliesArgs>(
            "detect_anomalies",
            "Find unavailable devices, low batteries, stale sensors, implausible readings and things left on or open",
        ),
        tool::<NoArgs>(
            "suggest_automations",
            "Suggest automations based on which entities exist together",
        ),
        tool::<analysis::FindRelatedArgs>(
            "find_related_entities",
            "Infer related entities (groups, trackers, same device, same room)",
        ),
        tool::<analysis::CheckDeprecationsArgs>(
            "check_deprecations",
            "Check automation YAML/JSON or a stored automation for deprecated syntax",
        ),
    ]
}

macro_rules! with_args {
    ($params:expr, $func:path, $context:expr) => {
        match parse_args($params.arguments.clone()) {
            Ok(args) => $func($context, args).await,
            Err(message) => ToolResponse::error(message),
        }
    };
}

/// Route tool calls to the appropriate implementation
///
/// Returns `None` for unknown tool names.
pub async fn handle_tool_call(
    context: ToolContext,
    params: &CallToolRequestParam,
) -> Option<ToolResponse> {
    let response = match params.name.as_str() {
        "get_version" => system::get_version(context).await,
        "get_config" => system::get_config(context).await,
        "get_entity" => with_args!(params, entities::get_entity, context),
        "list_entities" => with_args!(params, entities::list_entities, context),
        "search_entities" => with_args!(params, entities::search_entities, context),
        "domain_summary" => with_args!(params, entities::domain_summary, context),
        "entity_action" => with_args!(params, entities::entity_action, context),
        "call_service" => with_args!(params, services::call_service, context),
        "list_services" => with_args!(params, services::list_services, context),
        "list_automations" => entities::list_automations(context).await,
        "get_history" => with_args!(params, system::get_history, context),
        "get_logbook" => with_args!(params, system::get_logbook, context),
        "get_error_log" => with_args!(params, system::get_error_log, context),
        "render_template" => with_args!(params, services::render_template, context),
        "fire_event" => with_args!(params, services::fire_event, context),
        "check_config" => system::check_config(context).await,
        "restart_ha" => with_args!(params, system::restart_ha, context),
        "detect_anomalies" => with_args!(params, analysis::detect_anomalies, context),
        "suggest_automations" => analysis::suggest_automations(context).await,
        "find_related_entities" => with_args!(params, analysis::find_related_entities, context),
        "check_deprecations" => with_args!(params, analysis::check_deprecations, context),
        _ => return None,
    };
    Some(response)
}

/// Convert ToolResponse to Content for the MCP layer
pub fn tool_response_to_content(response: ToolResponse) -> Content {
    if response.is_error() {
        return Content::text(format!(
            "Error: {}",
            response
                .message
                .unwrap_or_else(|| "Unknown error".to_string())
        ));
    }

    let mut result = serde_json::json!({
        "status": response.status,
        "data": response.data,
        "timestamp": response.timestamp
    });

    if let Some(message) = response.message {
        result["message"] = Value::String(message);
    }

    Content::text(
        serde_json::to_string_pretty(&result)
            .unwrap_or_else(|_| "Failed to serialize response".to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_every_tool_has_object_schema() {
        let tools = all_tools();
        assert_eq!(tools.len(), 21);
        for tool in &tools {
            assert_eq!(tool.input_schema["type"], json!("object"), "{}", tool.name);
            assert!(tool.input_schema.get("$schema").is_none());
        }
    }

    #[test]
    fn test_tool_names_are_unique() {
        let mut names: Vec<_> = all_tools().into_iter().map(|t| t.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 21);
    }

    #[test]
    fn test_parse_args_missing_arguments() {
        let args: NoArgs = parse_args(None).unwrap();
        let _ = args;
        let err = parse_args::<entities::GetEntityArgs>(Some(json!({}))).unwrap_err();
        assert!(err.contains("entity_id"));
    }

    #[test]
    fn test_error_response_content() {
        let content = tool_response_to_content(ToolResponse::error("boom".to_string()));
        let value = serde_json::to_value(&content).unwrap();
        assert_eq!(value["text"], json!("Error: boom"));

        let content = tool_response_to_content(ToolResponse::success_with_message(
            json!({"a": 1}),
            "done".to_string(),
        ));
        let value = serde_json::to_value(&content).unwrap();
        let parsed: Value = serde_json::from_str(value["text"].as_str().unwrap()).unwrap();
        assert_eq!(parsed["data"]["a"], json!(1));
        assert_eq!(parsed["message"], json!("done"));
    }
}
