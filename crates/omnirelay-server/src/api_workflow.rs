//! Concierge workflow orchestration and the post-call webhook receiver.
//!
//! `/workflow` turns a free-text instruction into a dispatched call: it reuses
//! an existing concierge agent when the platform already has one, creates it
//! from the preset otherwise, and passes the instruction as call context.
//! `/omnidim-webhook` is where the concierge agent reports back after a call.

use crate::{
    api::ApiError,
    api_calls::coerce_agent_id,
    concierge::concierge_payload,
    AppState,
};
use axum::{
    extract::{rejection::JsonRejection, Extension},
    Json,
};
use omnirelay_platform::{DispatchRequest, ListParams, VoicePlatform};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Page size used when scanning for an existing concierge agent.
const CONCIERGE_SCAN_PAGE_SIZE: u32 = 50;

/// Request body for `POST /workflow`.
#[derive(Debug, Deserialize)]
pub struct WorkflowRequest {
    #[serde(default)]
    pub instruction: Option<String>,
    #[serde(default)]
    pub to_number: Option<String>,
}

/// Response body for a dispatched workflow.
#[derive(Debug, Serialize, Deserialize)]
pub struct WorkflowResponse {
    pub success: bool,
    pub message: String,
    pub agent_id: i64,
    pub call_id: Value,
    pub status: Value,
    pub instruction: String,
}

/// Post-call payload sent by the platform.
///
/// Every field is kept as raw JSON: the platform's shapes vary (a transcript
/// may be text or a list of turns) and only a few values are read from it.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub call_id: Value,
    #[serde(default)]
    pub agent_id: Value,
    #[serde(default)]
    pub extracted_variables: Value,
    #[serde(default)]
    pub summary: Value,
    #[serde(default)]
    pub transcript: Value,
}

impl WebhookPayload {
    /// Returns an extracted variable as text, or `""` when it is missing or
    /// not a string.
    pub fn variable(&self, key: &str) -> &str {
        self.extracted_variables
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    /// A booked appointment needs at least a date and a business name.
    pub fn appointment_detected(&self) -> bool {
        !self.variable("appointment_date").trim().is_empty()
            && !self.variable("business_name").trim().is_empty()
    }
}

/// Response body for `POST /omnidim-webhook`.
#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub success: bool,
    pub message: String,
    pub appointment_detected: bool,
}

/// Returns the agent entries from a list response.
///
/// Platform responses differ in shape: the list may be the value itself, or
/// nested under one of a few well-known keys, possibly inside a `json` wrapper.
pub fn agent_entries(value: &Value) -> &[Value] {
    match value {
        Value::Array(items) => items,
        Value::Object(map) => {
            if let Some(inner @ Value::Object(_)) = map.get("json") {
                return agent_entries(inner);
            }
            ["data", "results", "items", "bots", "agents"]
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_array))
                .map(Vec::as_slice)
                .unwrap_or_default()
        }
        _ => &[],
    }
}

/// Reads an agent id from a descriptor, trying the shapes the platform uses.
pub fn agent_id_of(agent: &Value) -> Option<&Value> {
    [
        &agent["id"],
        &agent["_id"],
        &agent["data"]["id"],
        &agent["data"]["_id"],
        &agent["json"]["id"],
    ]
    .into_iter()
    .find(|v| !v.is_null())
}

fn is_concierge(agent: &Value) -> bool {
    agent["name"]
        .as_str()
        .is_some_and(|name| name.to_lowercase().contains("concierge"))
}

/// Finds the concierge agent on the platform, creating it if absent.
pub async fn get_or_create_concierge(
    platform: &dyn VoicePlatform,
    webhook_url: &str,
) -> Result<i64, ApiError> {
    let listing = platform
        .list_agents(ListParams {
            page: 1,
            page_size: CONCIERGE_SCAN_PAGE_SIZE,
        })
        .await
        .map_err(internal("list_agents"))?;

    if let Some(id) = agent_entries(&listing)
        .iter()
        .filter(|agent| is_concierge(agent))
        .find_map(agent_id_of)
    {
        tracing::info!(agent_id = %id, "reusing existing concierge agent");
        return coerce_agent_id(Some(id)).map_err(|e| ApiError::Internal(e.to_string()));
    }

    tracing::info!("no concierge agent found, creating one");
    let created = platform
        .create_agent(concierge_payload(webhook_url))
        .await
        .map_err(internal("create_concierge"))?;

    let id = agent_id_of(&created).ok_or_else(|| {
        ApiError::Internal(format!("agent id not found in response: {}", created))
    })?;
    coerce_agent_id(Some(id)).map_err(|e| ApiError::Internal(e.to_string()))
}

fn internal(
    operation: &'static str,
) -> impl FnOnce(omnirelay_platform::PlatformError) -> ApiError {
    move |e| {
        tracing::error!(operation, "workflow platform call failed: {}", e);
        ApiError::Internal(e.to_string())
    }
}

/// Handler for `POST /workflow`.
pub async fn workflow_handler(
    Extension(state): Extension<Arc<AppState>>,
    body: Result<Json<WorkflowRequest>, JsonRejection>,
) -> Result<Json<WorkflowResponse>, ApiError> {
    let Json(request) = body?;

    let instruction = request
        .instruction
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Validation("instruction is required".to_string()))?;

    let to_number = request
        .to_number
        .or_else(|| state.default_to_number.clone())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("to_number is required".to_string()))?;

    tracing::info!(%instruction, "processing workflow instruction");

    let agent_id =
        get_or_create_concierge(state.platform.as_ref(), &state.concierge_webhook_url).await?;

    let mut call_context = Map::new();
    call_context.insert(
        "user_instruction".to_string(),
        Value::String(instruction.clone()),
    );

    let call = state
        .platform
        .dispatch_call(DispatchRequest {
            agent_id,
            to_number,
            call_context,
        })
        .await
        .map_err(internal("dispatch_call"))?;

    let call_id = call["id"].clone();
    tracing::info!(agent_id, %call_id, "workflow call dispatched");

    Ok(Json(WorkflowResponse {
        success: true,
        message: "Workflow dispatched to AI agent".to_string(),
        agent_id,
        call_id,
        status: call["status"].clone(),
        instruction,
    }))
}

/// Handler for `POST /omnidim-webhook`.
pub async fn webhook_handler(
    body: Result<Json<WebhookPayload>, JsonRejection>,
) -> Result<Json<WebhookResponse>, ApiError> {
    let Json(payload) = body?;
    let field = |key: &str| payload.variable(key);

    tracing::info!(
        call_id = %payload.call_id,
        agent_id = %payload.agent_id,
        appointment_date = field("appointment_date"),
        business_name = field("business_name"),
        business_phone = field("business_phone"),
        business_address = field("business_address"),
        appointment_type = field("appointment_type"),
        special_instructions = field("special_instructions"),
        has_summary = !payload.summary.is_null(),
        has_transcript = !payload.transcript.is_null(),
        "received post-call webhook"
    );

    Ok(Json(WebhookResponse {
        success: true,
        message: "Webhook processed successfully".to_string(),
        appointment_detected: payload.appointment_detected(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn agent_entries_handles_known_shapes() {
        assert_eq!(agent_entries(&json!([{ "id": 1 }])).len(), 1);
        assert_eq!(agent_entries(&json!({ "data": [{}, {}] })).len(), 2);
        assert_eq!(agent_entries(&json!({ "results": [{}] })).len(), 1);
        assert_eq!(agent_entries(&json!({ "bots": [{}, {}, {}] })).len(), 3);
        assert_eq!(
            agent_entries(&json!({ "json": { "bots": [{}] }, "status": 200 })).len(),
            1
        );
        assert!(agent_entries(&json!({ "total": 0 })).is_empty());
        assert!(agent_entries(&Value::Null).is_empty());
    }

    #[test]
    fn webhook_payload_reads_variables_leniently() {
        let payload: WebhookPayload = serde_json::from_value(json!({
            "extracted_variables": "not a mapping",
            "summary": { "text": "booked" },
            "transcript": [{ "role": "agent", "text": "hi" }]
        }))
        .unwrap();

        assert_eq!(payload.variable("appointment_date"), "");
        assert!(!payload.appointment_detected());

        let payload: WebhookPayload = serde_json::from_value(json!({
            "extracted_variables": { "appointment_date": "2024-01-15", "business_name": 12 }
        }))
        .unwrap();
        assert_eq!(payload.variable("appointment_date"), "2024-01-15");
        assert!(!payload.appointment_detected());
    }

    #[test]
    fn agent_id_of_tries_each_shape() {
        assert_eq!(agent_id_of(&json!({ "id": 5 })), Some(&json!(5)));
        assert_eq!(agent_id_of(&json!({ "_id": "6" })), Some(&json!("6")));
        assert_eq!(agent_id_of(&json!({ "data": { "id": 7 } })), Some(&json!(7)));
        assert_eq!(
            agent_id_of(&json!({ "json": { "id": 8 }, "status": 200 })),
            Some(&json!(8))
        );
        assert_eq!(agent_id_of(&json!({ "name": "x" })), None);
    }

    #[test]
    fn concierge_detection_is_case_insensitive() {
        assert!(is_concierge(&json!({ "name": "My CONCIERGE bot" })));
        assert!(!is_concierge(&json!({ "name": "Sales" })));
        assert!(!is_concierge(&json!({ "id": 1 })));
    }
}
