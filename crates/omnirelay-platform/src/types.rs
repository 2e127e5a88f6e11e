//! Request types and the platform trait the relay is written against.

use crate::error::PlatformError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default page number for list operations.
pub const DEFAULT_PAGE: u32 = 1;

/// Default page size for list operations.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Pagination for list operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    pub page: u32,
    pub page_size: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Optional narrowing of a call-log query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallLogFilter {
    pub agent_id: Option<String>,
}

/// A fully validated outbound call request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub agent_id: i64,
    pub to_number: String,
    /// Free-form variables made available to the agent during the call.
    pub call_context: Map<String, Value>,
}

/// Remote operations exposed by the voice-agent platform.
///
/// Every method performs at most one remote request and returns the
/// platform's JSON payload untouched.
#[async_trait]
pub trait VoicePlatform: Send + Sync {
    async fn create_agent(&self, fields: Map<String, Value>) -> Result<Value, PlatformError>;

    async fn list_agents(&self, params: ListParams) -> Result<Value, PlatformError>;

    async fn get_agent(&self, agent_id: &str) -> Result<Value, PlatformError>;

    async fn dispatch_call(&self, request: DispatchRequest) -> Result<Value, PlatformError>;

    async fn get_call_logs(
        &self,
        params: ListParams,
        filter: CallLogFilter,
    ) -> Result<Value, PlatformError>;
}
