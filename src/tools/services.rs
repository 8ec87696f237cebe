//! Service, template and event tools

use crate::client::EntityState;
use crate::tools::{ToolContext, ToolResponse};
use crate::validation::{validate_domain, validate_entity_id, validate_event_type, validate_service};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::info;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CallServiceArgs {
    /// Service domain, e.g. `light`
    pub domain: String,
    /// Service name, e.g. `turn_on`
    pub service: String,
    /// Target entity id, merged into the service data
    #[serde(default)]
    pub entity_id: Option<String>,
    /// Service data
    #[serde(default)]
    pub data: Option<Map<String, Value>>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ListServicesArgs {
    /// Only list services of this domain
    #[serde(default)]
    pub domain: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RenderTemplateArgs {
    /// Jinja2 template, e.g. `{{ states('sun.sun') }}`
    pub template: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FireEventArgs {
    pub event_type: String,
    /// Event data
    #[serde(default)]
    pub data: Option<Map<String, Value>>,
}

/// Call an arbitrary service
pub async fn call_service(context: ToolContext, args: CallServiceArgs) -> ToolResponse {
    if let Err(e) = validate_domain(&args.domain).and_then(|_| validate_service(&args.service)) {
        return ToolResponse::error(e.to_string());
    }

    let mut data = args.data.unwrap_or_default();
    if let Some(entity_id) = &args.entity_id {
        if let Err(e) = validate_entity_id(entity_id) {
            return ToolResponse::error(e.to_string());
        }
        data.insert("entity_id".to_string(), Value::String(entity_id.clone()));
    }

    info!("call_service: {}.{}", args.domain, args.service);
    match context
        .client
        .call_service(&args.domain, &args.service, Value::Object(data))
        .await
    {
        Ok(changed) => ToolResponse::success_with_message(
            json!({
                "service": format!("{}.{}", args.domain, args.service),
                "changed_states": changed.iter().map(EntityState::lean).collect::<Vec<_>>(),
            }),
            format!(
                "Called {}.{} ({} states changed)",
                args.domain,
                args.service,
                changed.len()
            ),
        ),
        Err(e) => ToolResponse::error(e.to_string()),
    }
}

/// List the service catalog
pub async fn list_services(context: ToolContext, args: ListServicesArgs) -> ToolResponse {
    let domains = match context.client.get_services().await {
        Ok(domains) => domains,
        Err(e) => return ToolResponse::error(e.to_string()),
    };

    let mut catalog: BTreeMap<String, BTreeMap<String, Value>> = BTreeMap::new();
    for domain in domains
        .into_iter()
        .filter(|d| args.domain.as_deref().map_or(true, |wanted| d.domain == wanted))
    {
        let services = domain
            .services
            .into_iter()
            .map(|(name, description)| {
                let fields: Vec<&String> = description.fields.keys().collect();
                (
                    name,
                    json!({
                        "name": description.name,
                        "description": description.description,
                        "fields": fields,
                    }),
                )
            })
            .collect();
        catalog.insert(domain.domain, services);
    }

    if let (Some(domain), true) = (&args.domain, catalog.is_empty()) {
        return ToolResponse::not_found(domain, Some("Call list_services without a domain"));
    }

    let service_count: usize = catalog.values().map(BTreeMap::len).sum();
    ToolResponse::success_with_message(
        json!(catalog),
        format!("{} services in {} domains", service_count, catalog.len()),
    )
}

/// Render a template
pub async fn render_template(context: ToolContext, args: RenderTemplateArgs) -> ToolResponse {
    if args.template.trim().is_empty() {
        return ToolResponse::error("Template cannot be empty".to_string());
    }

    match context.client.render_template(&args.template).await {
        Ok(rendered) => ToolResponse::success(json!({
            "template": args.template,
            "result": rendered,
        })),
        Err(e) => ToolResponse::error(e.to_string()),
    }
}

/// Fire an event on the bus
pub async fn fire_event(context: ToolContext, args: FireEventArgs) -> ToolResponse {
    if let Err(e) = validate_event_type(&args.event_type) {
        return ToolResponse::error(e.to_string());
    }

    let data = Value::Object(args.data.unwrap_or_default());
    info!("fire_event: {}", args.event_type);
    match context.client.fire_event(&args.event_type, data).await {
        Ok(reply) => ToolResponse::success_with_message(
            json!({"event_type": args.event_type}),
            reply.message,
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

    fn context(mock: MockHassClient) -> (ToolContext, Arc<MockHassClient>) {
        let mock = Arc::new(mock);
        (
            ToolContext::new(mock.clone(), Arc::new(ServerConfig::default())),
            mock,
        )
    }

    #[tokio::test]
    async fn test_call_service_merges_entity_id() {
        let (ctx, mock) = context(MockHassClient::new());
        let mut data = Map::new();
        data.insert("brightness_pct".to_string(), json!(40));
        let response = call_service(
            ctx,
            CallServiceArgs {
                domain: "light".to_string(),
                service: "turn_on".to_string(),
                entity_id: Some("light.desk".to_string()),
                data: Some(data),
            },
        )
        .await;
        assert_eq!(response.status, "success");
        let calls = mock.recorded_calls();
        assert_eq!(calls[0].data, json!({"brightness_pct": 40, "entity_id": "light.desk"}));
    }

    #[tokio::test]
    async fn test_call_service_rejects_bad_domain() {
        let (ctx, mock) = context(MockHassClient::new());
        let response = call_service(
            ctx,
            CallServiceArgs {
                domain: "Light/../x".to_string(),
                service: "turn_on".to_string(),
                entity_id: None,
                data: None,
            },
        )
        .await;
        assert!(response.is_error());
        assert!(mock.recorded_calls().is_empty());
    }

    #[tokio::test]
    async fn test_list_services_filters_domain() {
        let (ctx, _) = context(
            MockHassClient::new()
                .with_service("light", "turn_on")
                .with_service("light", "turn_off")
                .with_service("switch", "toggle"),
        );
        let response = list_services(
            ctx,
            ListServicesArgs {
                domain: Some("light".to_string()),
            },
        )
        .await;
        let catalog = response.data.as_object().unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog["light"].as_object().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_render_template_and_fire_event() {
        let (ctx, _) = context(MockHassClient::new());
        let response = render_template(
            ctx.clone(),
            RenderTemplateArgs {
                template: "{{ 1 + 1 }}".to_string(),
            },
        )
        .await;
        assert_eq!(response.data["result"], json!("rendered: {{ 1 + 1 }}"));

        let response = fire_event(
            ctx,
            FireEventArgs {
                event_type: "custom_event".to_string(),
                data: None,
            },
        )
        .await;
        assert_eq!(response.message.as_deref(), Some("Event custom_event fired."));
    }
}
