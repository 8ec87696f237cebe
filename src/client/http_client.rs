//! HTTP client implementation for the Home Assistant REST API
//!
//! Every request carries the long-lived access token as a bearer header and is
//! sent exactly once. Non-success status codes are mapped onto [`HassError`]
//! variants so tools can report them precisely.

use crate::client::{
    ApiMessage, ConfigCheckResult, EntityState, HassClient, HassInfo, HistoryQuery, LogbookEntry,
    ServiceDomain,
};
use crate::config::HassConfig;
use crate::error::{HassError, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, ClientBuilder, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

/// HTTP client for a Home Assistant instance
pub struct HassHttpClient {
    /// HTTP client instance
    client: Client,

    /// Base URL of the instance
    base_url: Url,
}

impl HassHttpClient {
    /// Create a new HTTP client
    pub fn new(config: &HassConfig) -> Result<Self> {
        if config.token.trim().is_empty() {
            return Err(HassError::config("Home Assistant token is required"));
        }

        let mut client_builder = ClientBuilder::new()
            .timeout(config.timeout)
            .user_agent(format!("hass-mcp-rust/{}", env!("CARGO_PKG_VERSION")));

        if !config.verify_ssl {
            warn!("SSL verification disabled - this is insecure for production use");
            client_builder = client_builder.danger_accept_invalid_certs(true);
        }

        let mut default_headers = reqwest::header::HeaderMap::new();
        let mut header_value =
            reqwest::header::HeaderValue::from_str(&format!("Bearer {}", config.token.trim()))
                .map_err(|e| {
                    HassError::invalid_input(format!("Invalid authorization header: {e}"))
                })?;
        header_value.set_sensitive(true);
        default_headers.insert(reqwest::header::AUTHORIZATION, header_value);
        client_builder = client_builder.default_headers(default_headers);

        let client = client_builder
            .build()
            .map_err(|e| HassError::connection(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.url.clone(),
        })
    }

    /// Base URL this client talks to
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build URL for an API path made of already-encoded segments
    fn build_url(&self, path: &str) -> Result<Url> {
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        base.join(path.trim_start_matches('/'))
            .map_err(|e| HassError::connection(format!("Invalid URL path {path}: {e}")))
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.build_url(path)?;
        debug!("{} {}", method, url);
        Ok(self.client.request(method, url))
    }

    /// Send a request and map non-success statuses to errors
    async fn execute(&self, request: RequestBuilder) -> Result<reqwest::Response> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                HassError::timeout(format!("Request to Home Assistant timed out: {e}"))
            } else if e.is_connect() {
                HassError::connection(format!("Could not connect to Home Assistant: {e}"))
            } else {
                HassError::Http(e)
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = extract_error_message(&body).unwrap_or_else(|| body.trim().to_string());
        let error_msg = if detail.is_empty() {
            format!("HTTP error {status}")
        } else {
            format!("HTTP error {status}: {detail}")
        };

        Err(match status.as_u16() {
            400 => HassError::invalid_input(error_msg),
            401 => HassError::authentication(format!(
                "{error_msg} (check the long-lived access token)"
            )),
            403 => HassError::permission_denied(error_msg),
            404 => HassError::not_found(error_msg),
            500..=599 => HassError::service_unavailable(error_msg),
            _ => HassError::connection(error_msg),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.execute(self.request(Method::GET, path)?).await?;
        Ok(response.json::<T>().await?)
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T> {
        let response = self
            .execute(self.request(Method::POST, path)?.json(body))
            .await?;
        Ok(response.json::<T>().await?)
    }
}

/// Home Assistant returns `{"message": "..."}` bodies for most errors
fn extract_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

/// Encode a single path segment
fn segment(raw: &str) -> String {
    urlencoding::encode(raw).into_owned()
}

fn timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Flatten a history response (`[[state, ...], ...]`) for one entity
///
/// With `minimal_response` only the first entry carries the entity id and
/// attributes, so missing fields are filled in from the query.
fn flatten_history(raw: Vec<Vec<Value>>, entity_id: &str) -> Result<Vec<EntityState>> {
    let mut states = Vec::new();
    for series in raw {
        for mut entry in series {
            if let Some(obj) = entry.as_object_mut() {
                obj.entry("entity_id")
                    .or_insert_with(|| Value::String(entity_id.to_string()));
                if !obj.contains_key("last_updated") {
                    if let Some(changed) = obj.get("last_changed").cloned() {
                        obj.insert("last_updated".to_string(), changed);
                    }
                }
            }
            states.push(serde_json::from_value(entry)?);
        }
    }
    Ok(states)
}

#[async_trait]
impl HassClient for HassHttpClient {
    async fn api_status(&self) -> Result<ApiMessage> {
        self.get_json("api/").await
    }

    async fn get_config(&self) -> Result<HassInfo> {
        self.get_json("api/config").await
    }

    async fn get_states(&self) -> Result<Vec<EntityState>> {
        self.get_json("api/states").await
    }

    async fn get_state(&self, entity_id: &str) -> Result<EntityState> {
        self.get_json(&format!("api/states/{}", segment(entity_id)))
            .await
            .map_err(|e| match e {
                HassError::NotFound(_) => {
                    HassError::not_found(format!("Entity not found: {entity_id}"))
                }
                other => other,
            })
    }

    async fn get_services(&self) -> Result<Vec<ServiceDomain>> {
        self.get_json("api/services").await
    }

    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        data: Value,
    ) -> Result<Vec<EntityState>> {
        let path = format!("api/services/{}/{}", segment(domain), segment(service));
        let response = self
            .execute(self.request(Method::POST, &path)?.json(&data))
            .await?;

        // Services called with return_response answer with an object instead of a list
        let body: Value = response.json().await?;
        match body {
            Value::Array(_) => Ok(serde_json::from_value(body)?),
            Value::Object(ref obj) => match obj.get("changed_states") {
                Some(changed) => Ok(serde_json::from_value(changed.clone())?),
                None => Ok(Vec::new()),
            },
            _ => Ok(Vec::new()),
        }
    }

    async fn get_history(&self, query: &HistoryQuery) -> Result<Vec<EntityState>> {
        let path = format!("api/history/period/{}", segment(&timestamp(&query.start)));
        let mut request = self
            .request(Method::GET, &path)?
            .query(&[("filter_entity_id", query.entity_id.as_str())]);
        if let Some(end) = &query.end {
            request = request.query(&[("end_time", timestamp(end))]);
        }
        if query.minimal_response {
            request = request.query(&[("minimal_response", "")]);
        }
        if query.no_attributes {
            request = request.query(&[("no_attributes", "")]);
        }

        let response = self.execute(request).await?;
        let raw: Vec<Vec<Value>> = response.json().await?;
        flatten_history(raw, &query.entity_id)
    }

    async fn get_logbook(
        &self,
        start: DateTime<Utc>,
        entity_id: Option<&str>,
    ) -> Result<Vec<LogbookEntry>> {
        let path = format!("api/logbook/{}", segment(&timestamp(&start)));
        let mut request = self.request(Method::GET, &path)?;
        if let Some(entity_id) = entity_id {
            request = request.query(&[("entity", entity_id)]);
        }
        let response = self.execute(request).await?;
        Ok(response.json().await?)
    }

    async fn get_error_log(&self) -> Result<String> {
        let response = self.execute(self.request(Method::GET, "api/error_log")?).await?;
        Ok(response.text().await?)
    }

    async fn render_template(&self, template: &str) -> Result<String> {
        let body = serde_json::json!({ "template": template });
        let response = self
            .execute(self.request(Method::POST, "api/template")?.json(&body))
            .await?;
        Ok(response.text().await?)
    }

    async fn fire_event(&self, event_type: &str, data: Value) -> Result<ApiMessage> {
        self.post_json(&format!("api/events/{}", segment(event_type)), &data)
            .await
    }

    async fn check_config(&self) -> Result<ConfigCheckResult> {
        self.post_json("api/config/core/check_config", &Value::Null)
            .await
    }

    async fn get_automation_config(&self, automation_id: &str) -> Result<Value> {
        self.get_json(&format!(
            "api/config/automation/config/{}",
            segment(automation_id)
        ))
        .await
        .map_err(|e| match e {
            HassError::NotFound(_) => {
                HassError::not_found(format!("Automation config not found: {automation_id}"))
            }
            other => other,
        })
    }
}
