#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, Response, StatusCode},
    Router,
};
use omnirelay_platform::{
    CallLogFilter, DispatchRequest, ListParams, PlatformError, VoicePlatform,
};
use omnirelay_server::{app, AppState};
use serde_json::{json, Map, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// A platform operation observed by [`FakePlatform`].
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    CreateAgent(Map<String, Value>),
    ListAgents(ListParams),
    GetAgent(String),
    DispatchCall(DispatchRequest),
    GetCallLogs(ListParams, CallLogFilter),
}

/// In-memory platform that records every call and answers from fixtures.
#[derive(Default)]
pub struct FakePlatform {
    pub calls: Mutex<Vec<Recorded>>,
    /// When set, every operation fails with this message.
    pub failure: Option<String>,
    /// Response returned by `list_agents`.
    pub agents: Value,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self {
            agents: json!([]),
            ..Default::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new()
        }
    }

    pub fn with_agents(agents: Value) -> Self {
        Self {
            agents,
            ..Self::new()
        }
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Recorded) -> Result<(), PlatformError> {
        self.calls.lock().unwrap().push(call);
        match &self.failure {
            Some(message) => Err(PlatformError::Api {
                status: 422,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl VoicePlatform for FakePlatform {
    async fn create_agent(&self, fields: Map<String, Value>) -> Result<Value, PlatformError> {
        let name = fields.get("name").cloned().unwrap_or(Value::Null);
        self.record(Recorded::CreateAgent(fields))?;
        Ok(json!({ "id": 101, "name": name }))
    }

    async fn list_agents(&self, params: ListParams) -> Result<Value, PlatformError> {
        self.record(Recorded::ListAgents(params))?;
        Ok(self.agents.clone())
    }

    async fn get_agent(&self, agent_id: &str) -> Result<Value, PlatformError> {
        self.record(Recorded::GetAgent(agent_id.to_string()))?;
        Ok(json!({ "id": agent_id, "name": "Fetched" }))
    }

    async fn dispatch_call(&self, request: DispatchRequest) -> Result<Value, PlatformError> {
        let agent_id = request.agent_id;
        self.record(Recorded::DispatchCall(request))?;
        Ok(json!({ "id": "call-1", "agent_id": agent_id, "status": "queued" }))
    }

    async fn get_call_logs(
        &self,
        params: ListParams,
        filter: CallLogFilter,
    ) -> Result<Value, PlatformError> {
        self.record(Recorded::GetCallLogs(params, filter))?;
        Ok(json!([{ "id": "log-1" }]))
    }
}

pub fn router(platform: Arc<FakePlatform>) -> Router {
    app(AppState::new(platform))
}

pub fn router_with(state: AppState) -> Router {
    app(state)
}

pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response: Response<Body> = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn post_raw(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}
