//! Call dispatch and call-log handlers.

use crate::{
    api::{json_object, ApiError, Envelope},
    api_agents::list_params,
    AppState,
};
use axum::{
    extract::{rejection::JsonRejection, Extension, Query},
    Json,
};
use omnirelay_platform::{CallLogFilter, DispatchRequest};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Key used when a non-object call context has to be wrapped.
pub const WRAPPED_CONTEXT_KEY: &str = "context";

/// Coerces a JSON value into an agent id.
///
/// Integers pass through, finite floats are truncated toward zero, and
/// strings are parsed after trimming. Anything else is rejected.
pub fn coerce_agent_id(value: Option<&Value>) -> Result<i64, ApiError> {
    let invalid =
        |v: &Value| ApiError::Validation(format!("agent_id must be an integer, got {}", v));

    match value {
        None | Some(Value::Null) => Err(ApiError::Validation("agent_id is required".to_string())),
        Some(v @ Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            match n.as_f64() {
                Some(f) if (i64::MIN as f64..i64::MAX as f64).contains(&f.trunc()) => {
                    Ok(f.trunc() as i64)
                }
                _ => Err(invalid(v)),
            }
        }
        Some(v @ Value::String(s)) => s.trim().parse::<i64>().map_err(|_| invalid(v)),
        Some(v) => Err(invalid(v)),
    }
}

/// Extracts the destination phone number.
pub fn required_to_number(value: Option<&Value>) -> Result<String, ApiError> {
    match value {
        None | Some(Value::Null) => Err(ApiError::Validation("to_number is required".to_string())),
        Some(Value::String(s)) if s.trim().is_empty() => {
            Err(ApiError::Validation("to_number is required".to_string()))
        }
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(ApiError::Validation("to_number must be a string".to_string())),
    }
}

/// Normalizes the call context into a mapping.
///
/// Objects are forwarded as is and a missing value becomes an empty mapping.
/// Any other value is wrapped under [`WRAPPED_CONTEXT_KEY`] in its string form.
pub fn coerce_call_context(value: Option<&Value>) -> Map<String, Value> {
    match value {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(other) => {
            let text = match other {
                Value::String(s) => s.clone(),
                v => v.to_string(),
            };
            let mut map = Map::new();
            map.insert(WRAPPED_CONTEXT_KEY.to_string(), Value::String(text));
            map
        }
    }
}

/// Validates a dispatch body. `call_context` wins over `call_params`.
pub fn parse_dispatch(body: &Map<String, Value>) -> Result<DispatchRequest, ApiError> {
    let agent_id = coerce_agent_id(body.get("agent_id"))?;
    let to_number = required_to_number(body.get("to_number"))?;
    let context = body
        .get("call_context")
        .filter(|v| !v.is_null())
        .or_else(|| body.get("call_params"));

    Ok(DispatchRequest {
        agent_id,
        to_number,
        call_context: coerce_call_context(context),
    })
}

/// Handler for `POST /calls`.
pub async fn dispatch_call_handler(
    Extension(state): Extension<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Envelope, ApiError> {
    let body = json_object(body)?;
    let request = parse_dispatch(&body).inspect_err(|e| {
        tracing::info!("rejected dispatch request: {}", e);
    })?;

    tracing::info!(
        agent_id = request.agent_id,
        context_keys = request.call_context.len(),
        "dispatching call"
    );

    let call = state
        .platform
        .dispatch_call(request)
        .await
        .map_err(ApiError::external("dispatch_call"))?;

    Ok(Envelope::created("call", call))
}

/// Handler for `GET /calls`.
pub async fn list_call_logs_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Envelope, ApiError> {
    let params = list_params(&query);
    let filter = CallLogFilter {
        agent_id: query.get("agent_id").filter(|id| !id.is_empty()).cloned(),
    };

    let logs = state
        .platform
        .get_call_logs(params, filter)
        .await
        .map_err(ApiError::external("get_call_logs"))?;

    Ok(Envelope::ok("call_logs", logs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(err: ApiError) -> String {
        match err {
            ApiError::Validation(msg) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn agent_id_accepts_integers_and_numeric_strings() {
        assert_eq!(coerce_agent_id(Some(&json!(42))).unwrap(), 42);
        assert_eq!(coerce_agent_id(Some(&json!("17"))).unwrap(), 17);
        assert_eq!(coerce_agent_id(Some(&json!(" 8 "))).unwrap(), 8);
        assert_eq!(coerce_agent_id(Some(&json!(-3))).unwrap(), -3);
    }

    #[test]
    fn agent_id_truncates_floats() {
        assert_eq!(coerce_agent_id(Some(&json!(12.0))).unwrap(), 12);
        assert_eq!(coerce_agent_id(Some(&json!(12.9))).unwrap(), 12);
    }

    #[test]
    fn agent_id_missing_or_null_is_required() {
        assert_eq!(message(coerce_agent_id(None).unwrap_err()), "agent_id is required");
        assert_eq!(
            message(coerce_agent_id(Some(&Value::Null)).unwrap_err()),
            "agent_id is required"
        );
    }

    #[test]
    fn agent_id_rejects_non_numeric_values() {
        assert_eq!(
            message(coerce_agent_id(Some(&json!("abc"))).unwrap_err()),
            "agent_id must be an integer, got \"abc\""
        );
        assert!(coerce_agent_id(Some(&json!("1.5"))).is_err());
        assert!(coerce_agent_id(Some(&json!(true))).is_err());
        assert!(coerce_agent_id(Some(&json!([1]))).is_err());
        assert!(coerce_agent_id(Some(&json!(u64::MAX))).is_err());
    }

    #[test]
    fn to_number_must_be_non_empty_string() {
        assert_eq!(
            required_to_number(Some(&json!("+15551234567"))).unwrap(),
            "+15551234567"
        );
        assert_eq!(
            required_to_number(Some(&json!(" +15551234567 "))).unwrap(),
            " +15551234567 "
        );
        assert_eq!(
            message(required_to_number(None).unwrap_err()),
            "to_number is required"
        );
        assert_eq!(
            message(required_to_number(Some(&json!("  "))).unwrap_err()),
            "to_number is required"
        );
        assert_eq!(
            message(required_to_number(Some(&json!(15551234567u64))).unwrap_err()),
            "to_number must be a string"
        );
    }

    #[test]
    fn call_context_objects_pass_through() {
        let ctx = json!({ "customer_name": "Test User", "test_mode": true });
        let map = coerce_call_context(Some(&ctx));
        assert_eq!(Value::Object(map), ctx);
    }

    #[test]
    fn call_context_scalars_are_wrapped() {
        let map = coerce_call_context(Some(&json!("call me maybe")));
        assert_eq!(Value::Object(map), json!({ "context": "call me maybe" }));

        let map = coerce_call_context(Some(&json!([1, 2])));
        assert_eq!(Value::Object(map), json!({ "context": "[1,2]" }));

        assert!(coerce_call_context(None).is_empty());
    }

    #[test]
    fn call_context_wins_over_call_params() {
        let body = json!({
            "agent_id": 1,
            "to_number": "+1555",
            "call_context": { "a": 1 },
            "call_params": { "b": 2 }
        });
        let request = parse_dispatch(body.as_object().unwrap()).unwrap();
        assert_eq!(Value::Object(request.call_context), json!({ "a": 1 }));

        let body = json!({
            "agent_id": 1,
            "to_number": "+1555",
            "call_params": { "b": 2 }
        });
        let request = parse_dispatch(body.as_object().unwrap()).unwrap();
        assert_eq!(Value::Object(request.call_context), json!({ "b": 2 }));
    }

    #[test]
    fn agent_id_is_checked_before_to_number() {
        let body = json!({});
        let err = parse_dispatch(body.as_object().unwrap()).unwrap_err();
        assert_eq!(message(err), "agent_id is required");
    }
}
