//! Omnirelay server library logic.

pub mod api;
pub mod api_agents;
pub mod api_calls;
pub mod api_workflow;
pub mod concierge;
pub mod config;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Json, Router,
};
use omnirelay_platform::VoicePlatform;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Client for the voice-agent platform, constructed once at startup.
    pub platform: Arc<dyn VoicePlatform>,
    /// Name reported by the health endpoint.
    pub service_name: String,
    /// Webhook used for concierge agents when a request does not name one.
    pub concierge_webhook_url: String,
    /// Number dialed by `/workflow` when the request omits one.
    pub default_to_number: Option<String>,
}

impl AppState {
    /// Creates state with default service settings around `platform`.
    pub fn new(platform: Arc<dyn VoicePlatform>) -> Self {
        Self {
            platform,
            service_name: "omnirelay".to_string(),
            concierge_webhook_url: concierge::DEFAULT_WEBHOOK_URL.to_string(),
            default_to_number: None,
        }
    }

    /// Creates state from loaded configuration.
    pub fn from_config(platform: Arc<dyn VoicePlatform>, config: &config::Config) -> Self {
        Self {
            platform,
            service_name: config.server.service_name.clone(),
            concierge_webhook_url: config.concierge.default_webhook_url.clone(),
            default_to_number: config.workflow.default_to_number.clone(),
        }
    }
}

/// Maximum request body size (1 MiB).
const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;

/// Health check handler. Never touches the platform.
async fn health(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": state.service_name
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/agents",
            post(api_agents::create_agent_handler).get(api_agents::list_agents_handler),
        )
        .route(
            "/agents/create-concierge",
            post(api_agents::create_concierge_handler),
        )
        .route("/agents/{agent_id}", get(api_agents::get_agent_handler))
        .route(
            "/calls",
            post(api_calls::dispatch_call_handler).get(api_calls::list_call_logs_handler),
        )
        .route("/workflow", post(api_workflow::workflow_handler))
        .route("/omnidim-webhook", post(api_workflow::webhook_handler))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .layer(Extension(Arc::new(state)))
}
