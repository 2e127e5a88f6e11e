//! Shared envelope and error types for the relay API.
//!
//! Every non-health response uses the same JSON shape:
//! `{"success": true, "<key>": <data>}` on success and
//! `{"success": false, "error": "<message>"}` on failure.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use omnirelay_platform::PlatformError;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed input, detected before any platform call.
    #[error("{0}")]
    Validation(String),
    /// The platform rejected the call or could not be reached.
    #[error("{message}")]
    ExternalCall { message: String },
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::ExternalCall { .. } => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a mapper that logs a platform failure for `operation` and
    /// converts it into [`ApiError::ExternalCall`].
    pub fn external(operation: &'static str) -> impl FnOnce(PlatformError) -> ApiError {
        move |e| {
            tracing::warn!(
                operation,
                status = e.status(),
                "platform call failed: {}",
                e
            );
            ApiError::from(e)
        }
    }
}

impl From<PlatformError> for ApiError {
    fn from(e: PlatformError) -> Self {
        ApiError::ExternalCall {
            message: e.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(serde_json::json!({
            "success": false,
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

/// A successful envelope carrying `data` under `key`.
#[derive(Debug)]
pub struct Envelope {
    status: StatusCode,
    body: Map<String, Value>,
}

impl Envelope {
    pub fn new(status: StatusCode, key: &str, data: Value) -> Self {
        let mut body = Map::new();
        body.insert("success".to_string(), Value::Bool(true));
        body.insert(key.to_string(), data);
        Self { status, body }
    }

    pub fn ok(key: &str, data: Value) -> Self {
        Self::new(StatusCode::OK, key, data)
    }

    pub fn created(key: &str, data: Value) -> Self {
        Self::new(StatusCode::CREATED, key, data)
    }

    /// Adds an extra top-level field next to the data.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.body.insert(key.to_string(), value.into());
        self
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        (self.status, Json(Value::Object(self.body))).into_response()
    }
}

/// Unwraps a JSON body that must be an object.
pub fn json_object(
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Map<String, Value>, ApiError> {
    let Json(value) = body?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ApiError::Validation(
            "request body must be a JSON object".to_string(),
        )),
    }
}

/// Parses an optional JSON body; an empty body yields `T::default()`.
pub fn optional_json<T>(bytes: &[u8]) -> Result<T, ApiError>
where
    T: DeserializeOwned + Default,
{
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(bytes)
        .map_err(|e| ApiError::Validation(format!("invalid JSON body: {}", e)))
}
