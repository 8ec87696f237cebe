//! Home Assistant backend implementation for the MCP framework
//!
//! This module implements the McpBackend trait by wiring the Home Assistant
//! client, the server configuration and the log level handle into the tool,
//! resource and prompt modules.

use async_trait::async_trait;
use pulseengine_mcp_protocol::*;
use pulseengine_mcp_server::backend::{BackendError, McpBackend};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::client::{HassClient, HassHttpClient};
use crate::config::ServerConfig;
use crate::error::{HassError, Result};
use crate::logging::LogLevelHandle;
use crate::server::{prompts, resources};
use crate::tools::{self, ToolContext};

/// HassError -> BackendError; the framework turns these into protocol errors
impl From<HassError> for BackendError {
    fn from(err: HassError) -> Self {
        use HassError::*;
        match err {
            Connection(msg) | Timeout(msg) | ServiceUnavailable(msg) => {
                BackendError::connection(msg)
            }
            Http(e) => BackendError::connection(e.to_string()),

            Authentication(msg) | PermissionDenied(msg) | Config(msg) | InvalidInput(msg) => {
                BackendError::configuration(msg)
            }

            NotFound(msg) => BackendError::not_supported(msg),

            _ => BackendError::internal(err.to_string()),
        }
    }
}

/// What the framework hands to [`McpBackend::initialize`]
#[derive(Clone)]
pub struct HassBackendConfig {
    pub server: ServerConfig,
    pub log_level: LogLevelHandle,
}

/// Home Assistant backend
#[derive(Clone)]
pub struct HassBackend {
    config: Arc<ServerConfig>,
    client: Arc<dyn HassClient>,
    log_level: LogLevelHandle,
}

impl HassBackend {
    pub fn new(config: ServerConfig, client: Arc<dyn HassClient>, log_level: LogLevelHandle) -> Self {
        Self {
            config: Arc::new(config),
            client,
            log_level,
        }
    }

    /// Build the backend with an HTTP client for the configured instance
    pub fn initialize(config: ServerConfig, log_level: LogLevelHandle) -> Result<Self> {
        config.validate()?;
        info!("🚀 Initializing Home Assistant backend for {}", config.hass.url);
        let client = HassHttpClient::new(&config.hass)?;
        Ok(Self::new(config, Arc::new(client), log_level))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    fn context(&self) -> ToolContext {
        ToolContext::new(self.client.clone(), self.config.clone())
    }

    /// Candidate values for a completion reference; unknown references get none
    pub async fn completions_for(&self, reference: &str) -> Result<Vec<String>> {
        let values = match reference {
            "entity_id" => self.complete_entity_ids().await?,
            "domain" => self.complete_domains().await?,
            "min_severity" => vec![
                "info".to_string(),
                "warning".to_string(),
                "critical".to_string(),
            ],
            "resource_uris" => resources::static_resources()
                .into_iter()
                .map(|r| r.uri)
                .collect(),
            _ => {
                debug!("Unknown completion reference: {}", reference);
                vec![]
            }
        };
        Ok(values)
    }

    async fn complete_domains(&self) -> Result<Vec<String>> {
        let states = self.client.get_states().await?;
        let domains: BTreeSet<String> = states.iter().map(|s| s.domain().to_string()).collect();
        Ok(domains.into_iter().collect())
    }

    async fn complete_entity_ids(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self
            .client
            .get_states()
            .await?
            .into_iter()
            .map(|s| s.entity_id)
            .collect();
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl McpBackend for HassBackend {
    type Error = BackendError;
    type Config = HassBackendConfig;

    async fn initialize(config: Self::Config) -> std::result::Result<Self, Self::Error> {
        Self::initialize(config.server, config.log_level).map_err(BackendError::from)
    }

    fn get_server_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .enable_prompts()
                .enable_logging()
                .build(),
            server_info: Implementation {
                name: self.config.mcp.name.clone(),
                version: self.config.mcp.version.clone(),
            },
            instructions: self.config.mcp.instructions.clone(),
        }
    }

    async fn health_check(&self) -> std::result::Result<(), Self::Error> {
        debug!("🔍 Performing Home Assistant health check");
        match self.client.api_status().await {
            Ok(status) => {
                debug!("✅ Home Assistant reachable: {}", status.message);
                Ok(())
            }
            Err(e) => {
                warn!("⚠️ Home Assistant health check failed: {}", e);
                Err(e.into())
            }
        }
    }

    async fn list_tools(
        &self,
        _params: PaginatedRequestParam,
    ) -> std::result::Result<ListToolsResult, Self::Error> {
        Ok(ListToolsResult {
            tools: tools::all_tools(),
            next_cursor: None,
        })
    }

    async fn call_tool(
        &self,
        params: CallToolRequestParam,
    ) -> std::result::Result<CallToolResult, Self::Error> {
        debug!("⚡ Calling tool: {}", params.name);

        let Some(response) = tools::handle_tool_call(self.context(), &params).await else {
            return Err(BackendError::not_supported(format!(
                "Unknown tool: {}",
                params.name
            )));
        };

        if response.is_error() {
            error!(
                "❌ Tool {} failed: {}",
                params.name,
                response.message.as_deref().unwrap_or("unknown error")
            );
            return Ok(CallToolResult {
                content: vec![tools::tool_response_to_content(response)],
                is_error: Some(true),
            });
        }

        debug!("✅ Tool {} executed successfully", params.name);
        Ok(CallToolResult::success(vec![
            tools::tool_response_to_content(response),
        ]))
    }

    async fn list_resources(
        &self,
        _params: PaginatedRequestParam,
    ) -> std::result::Result<ListResourcesResult, Self::Error> {
        Ok(ListResourcesResult {
            resources: resources::static_resources(),
            next_cursor: None,
        })
    }

    async fn list_resource_templates(
        &self,
        _params: PaginatedRequestParam,
    ) -> std::result::Result<ListResourceTemplatesResult, Self::Error> {
        Ok(ListResourceTemplatesResult {
            resource_templates: resources::resource_templates(),
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        params: ReadResourceRequestParam,
    ) -> std::result::Result<ReadResourceResult, Self::Error> {
        debug!("📖 Reading resource: {}", params.uri);
        let value = resources::read_resource(&self.context(), &params.uri).await?;
        let text = serde_json::to_string_pretty(&value)
            .map_err(|e| BackendError::internal(format!("Failed to serialize resource: {e}")))?;

        Ok(ReadResourceResult {
            contents: vec![ResourceContents {
                uri: params.uri,
                mime_type: Some(resources::MIME_JSON.to_string()),
                text: Some(text),
                blob: None,
            }],
        })
    }

    async fn list_prompts(
        &self,
        _params: PaginatedRequestParam,
    ) -> std::result::Result<ListPromptsResult, Self::Error> {
        Ok(ListPromptsResult {
            prompts: prompts::all_prompts(),
            next_cursor: None,
        })
    }

    async fn get_prompt(
        &self,
        params: GetPromptRequestParam,
    ) -> std::result::Result<GetPromptResult, Self::Error> {
        Ok(prompts::get_prompt(params)?)
    }

    async fn subscribe(
        &self,
        params: SubscribeRequestParam,
    ) -> std::result::Result<(), Self::Error> {
        // Every read is live; there is nothing to push.
        warn!("❌ Subscription requested for {}", params.uri);
        Err(BackendError::not_supported(format!(
            "Subscriptions are not supported: {}",
            params.uri
        )))
    }

    async fn unsubscribe(
        &self,
        params: UnsubscribeRequestParam,
    ) -> std::result::Result<(), Self::Error> {
        Err(BackendError::not_supported(format!(
            "Subscriptions are not supported: {}",
            params.uri
        )))
    }

    async fn complete(
        &self,
        params: CompleteRequestParam,
    ) -> std::result::Result<CompleteResult, Self::Error> {
        debug!("🔍 Providing completion for: {}", params.ref_);

        let completions = self.completions_for(&params.ref_).await?;

        Ok(CompleteResult {
            completion: completions
                .into_iter()
                .map(|c| CompletionInfo {
                    completion: c,
                    has_more: Some(false),
                })
                .collect(),
        })
    }

    async fn set_level(
        &self,
        params: SetLevelRequestParam,
    ) -> std::result::Result<(), Self::Error> {
        self.log_level.set_mcp_level(&params.level)?;
        info!("📝 Log level set to {}", self.log_level.current());
        Ok(())
    }

    async fn handle_custom_method(
        &self,
        method: &str,
        _params: serde_json::Value,
    ) -> std::result::Result<serde_json::Value, Self::Error> {
        warn!("❓ Unknown custom method: {}", method);
        Err(BackendError::configuration(format!(
            "Unknown method: {method}"
        )))
    }
}
