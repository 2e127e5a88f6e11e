//! Agent API handlers.

use crate::{
    api::{json_object, optional_json, ApiError, Envelope},
    concierge::concierge_payload,
    AppState,
};
use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Extension, Path, Query},
    Json,
};
use omnirelay_platform::{ListParams, DEFAULT_PAGE, DEFAULT_PAGE_SIZE};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Request body for `POST /agents/create-concierge`.
#[derive(Debug, Default, Deserialize)]
pub struct CreateConciergeRequest {
    pub webhook_url: Option<String>,
}

/// Reads `page` and `page_size` from a query string.
///
/// Missing or non-integer values fall back to the defaults.
pub fn list_params(query: &HashMap<String, String>) -> ListParams {
    let int = |key: &str, default: u32| {
        query
            .get(key)
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(default)
    };

    ListParams {
        page: int("page", DEFAULT_PAGE),
        page_size: int("page_size", DEFAULT_PAGE_SIZE),
    }
}

/// Handler for `POST /agents`.
pub async fn create_agent_handler(
    Extension(state): Extension<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Envelope, ApiError> {
    let fields = json_object(body)?;
    tracing::info!(field_count = fields.len(), "creating agent");

    let agent = state
        .platform
        .create_agent(fields)
        .await
        .map_err(ApiError::external("create_agent"))?;

    Ok(Envelope::created("agent", agent))
}

/// Handler for `POST /agents/create-concierge`.
pub async fn create_concierge_handler(
    Extension(state): Extension<Arc<AppState>>,
    body: Bytes,
) -> Result<Envelope, ApiError> {
    let request: CreateConciergeRequest = optional_json(&body)?;
    let webhook_url = request
        .webhook_url
        .unwrap_or_else(|| state.concierge_webhook_url.clone());

    tracing::info!(%webhook_url, "creating concierge agent");

    let agent = state
        .platform
        .create_agent(concierge_payload(&webhook_url))
        .await
        .map_err(ApiError::external("create_concierge"))?;

    Ok(Envelope::created("agent", agent).with("message", "Concierge agent created successfully"))
}

/// Handler for `GET /agents`.
pub async fn list_agents_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Envelope, ApiError> {
    let params = list_params(&query);

    let agents = state
        .platform
        .list_agents(params)
        .await
        .map_err(ApiError::external("list_agents"))?;

    Ok(Envelope::ok("agents", agents))
}

/// Rejects ids that would not address a single agent resource.
///
/// `Path` has already percent-decoded the segment, so an encoded `/` shows up
/// here as a literal separator.
pub fn checked_agent_id(agent_id: &str) -> Result<&str, ApiError> {
    if agent_id.trim().is_empty() {
        return Err(ApiError::Validation("agent_id is required".to_string()));
    }
    if agent_id.contains('/') || matches!(agent_id, "." | "..") {
        return Err(ApiError::Validation(format!(
            "agent_id must be a single path segment, got {agent_id:?}"
        )));
    }
    Ok(agent_id)
}

/// Handler for `GET /agents/{agent_id}`.
pub async fn get_agent_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(agent_id): Path<String>,
) -> Result<Envelope, ApiError> {
    let agent_id = checked_agent_id(&agent_id).inspect_err(|e| {
        tracing::warn!(error = %e, "rejected agent id");
    })?;

    let agent = state
        .platform
        .get_agent(agent_id)
        .await
        .map_err(ApiError::external("get_agent"))?;

    Ok(Envelope::ok("agent", agent))
}
