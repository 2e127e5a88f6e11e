use crate::config::PlatformConfig;
use crate::error::PlatformError;
use crate::types::{CallLogFilter, DispatchRequest, ListParams, VoicePlatform};
use async_trait::async_trait;
use reqwest::{header, Method, RequestBuilder, Response, Url};
use serde_json::{json, Map, Value};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// HTTP client for the OmniDimension REST API.
///
/// Holds only the credential and a pooled `reqwest::Client`, so a single
/// instance is shared by every request handler.
#[derive(Clone)]
pub struct OmniClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl fmt::Debug for OmniClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OmniClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl OmniClient {
    /// Builds a client from configuration.
    ///
    /// Fails if the API key is empty, the base URL is not an absolute
    /// hierarchical URL, or the underlying HTTP client cannot be constructed.
    pub fn new(config: &PlatformConfig) -> Result<Self, PlatformError> {
        if config.api_key.trim().is_empty() {
            return Err(PlatformError::Config("api key must not be empty".to_string()));
        }
        if config.base_url.trim().is_empty() {
            return Err(PlatformError::Config("base url must not be empty".to_string()));
        }

        let base_url = Url::parse(config.base_url.trim().trim_end_matches('/'))
            .map_err(|e| PlatformError::Config(format!("invalid base url: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(PlatformError::Config(format!(
                "base url cannot carry a path: {base_url}"
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("omnirelay/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Appends `segments` to the base URL, percent-encoding each one so that
    /// `/`, `?` and `#` inside a caller-supplied id stay part of that segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, PlatformError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                PlatformError::Config(format!("base url cannot carry a path: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, PlatformError> {
        let url = self.endpoint(segments)?;
        debug!(%method, %url, "platform request");
        Ok(self
            .http
            .request(method, url)
            .bearer_auth(&self.api_key)
            .header(header::ACCEPT, "application/json"))
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<Value, PlatformError> {
        let response = builder.send().await?;
        decode_response(response).await
    }
}

/// Turns a platform response into its JSON payload or a typed error.
async fn decode_response(response: Response) -> Result<Value, PlatformError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(PlatformError::Api {
            status: status.as_u16(),
            message: error_message(&body, status.canonical_reason()),
        });
    }

    if body.trim().is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(&body).map_err(|e| PlatformError::Decode(e.to_string()))
}

/// Checks that an agent id names exactly one path segment.
fn validate_agent_id(agent_id: &str) -> Result<&str, PlatformError> {
    match agent_id {
        "" | "." | ".." => Err(PlatformError::InvalidArgument(format!(
            "invalid agent id: {agent_id:?}"
        ))),
        id => Ok(id),
    }
}

/// Picks the most descriptive message from an error body.
fn error_message(body: &str, reason: Option<&str>) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for key in ["error", "message", "detail"] {
            if let Some(Value::String(msg)) = map.get(key) {
                if !msg.is_empty() {
                    return msg.clone();
                }
            }
        }
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }

    reason.unwrap_or("platform request failed").to_string()
}

#[async_trait]
impl VoicePlatform for OmniClient {
    async fn create_agent(&self, fields: Map<String, Value>) -> Result<Value, PlatformError> {
        let builder = self
            .request(Method::POST, &["agents", "create"])?
            .json(&Value::Object(fields));
        self.execute(builder).await
    }

    async fn list_agents(&self, params: ListParams) -> Result<Value, PlatformError> {
        let builder = self
            .request(Method::GET, &["agents"])?
            .query(&[("pageno", params.page), ("pagesize", params.page_size)]);
        self.execute(builder).await
    }

    async fn get_agent(&self, agent_id: &str) -> Result<Value, PlatformError> {
        let agent_id = validate_agent_id(agent_id)?;
        let builder = self.request(Method::GET, &["agents", agent_id])?;
        self.execute(builder).await
    }

    async fn dispatch_call(&self, request: DispatchRequest) -> Result<Value, PlatformError> {
        let body = json!({
            "agent_id": request.agent_id,
            "to_number": request.to_number,
            "call_context": request.call_context,
        });
        let builder = self
            .request(Method::POST, &["calls", "dispatch"])?
            .json(&body);
        self.execute(builder).await
    }

    async fn get_call_logs(
        &self,
        params: ListParams,
        filter: CallLogFilter,
    ) -> Result<Value, PlatformError> {
        let mut query = vec![
            ("pageno", params.page.to_string()),
            ("pagesize", params.page_size.to_string()),
        ];
        if let Some(agent_id) = filter.agent_id {
            query.push(("agentid", agent_id));
        }

        let builder = self.request(Method::GET, &["calls", "logs"])?.query(&query);
        self.execute(builder).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_structured_fields() {
        assert_eq!(
            error_message(r#"{"error":"Agent not found"}"#, Some("Not Found")),
            "Agent not found"
        );
        assert_eq!(
            error_message(r#"{"detail":"Invalid API key"}"#, Some("Unauthorized")),
            "Invalid API key"
        );
    }

    #[test]
    fn error_message_falls_back_to_body_then_reason() {
        assert_eq!(error_message("upstream exploded", None), "upstream exploded");
        assert_eq!(error_message("   ", Some("Bad Gateway")), "Bad Gateway");
        assert_eq!(error_message("", None), "platform request failed");
    }

    #[test]
    fn new_rejects_empty_api_key() {
        let err = OmniClient::new(&PlatformConfig::new("http://localhost", "  ")).unwrap_err();
        assert!(matches!(err, PlatformError::Config(_)));
    }

    #[test]
    fn new_rejects_relative_base_url() {
        let err = OmniClient::new(&PlatformConfig::new("backend/api", "key")).unwrap_err();
        assert!(matches!(err, PlatformError::Config(_)));
    }

    #[test]
    fn endpoint_encodes_each_segment() {
        let client =
            OmniClient::new(&PlatformConfig::new("http://localhost:9000/api/v1", "key")).unwrap();

        let url = client.endpoint(&["agents", "../calls/logs"]).unwrap();
        assert_eq!(url.path(), "/api/v1/agents/..%2Fcalls%2Flogs");

        let url = client.endpoint(&["agents", "7?debug=1#top"]).unwrap();
        assert_eq!(url.path(), "/api/v1/agents/7%3Fdebug=1%23top");
        assert_eq!(url.query(), None);
    }

    #[test]
    fn dot_segments_are_not_agent_ids() {
        for id in ["", ".", ".."] {
            assert!(matches!(
                validate_agent_id(id),
                Err(PlatformError::InvalidArgument(_))
            ));
        }
        assert_eq!(validate_agent_id("1234").unwrap(), "1234");
    }

    #[test]
    fn new_trims_trailing_slash_from_base_url() {
        let client = OmniClient::new(&PlatformConfig::new("http://localhost:9000/api/", "key"))
            .unwrap();
        assert_eq!(client.base_url(), "http://localhost:9000/api");
    }
}
