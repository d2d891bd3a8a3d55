//! The backend collaborator contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::flow::{CapturedData, ExternalError, Outcome, StepId};

/// What a backend receives for one side effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendRequest {
    /// Name of the bound side effect.
    pub effect: String,
    /// Step being submitted.
    pub step_id: StepId,
    /// Captured data including the submitted step's fields.
    pub captured_data: CapturedData,
}

/// What a backend answers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub payload: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl BackendResponse {
    pub fn ok(payload: Map<String, Value>) -> Self {
        Self {
            success: true,
            payload,
            error_code: None,
        }
    }

    pub fn rejected(code: impl Into<String>, message: impl Into<String>) -> Self {
        let mut payload = Map::new();
        payload.insert("message".to_string(), Value::String(message.into()));
        Self {
            success: false,
            payload,
            error_code: Some(code.into()),
        }
    }

    /// Interpret the answer as an outcome or a rejection.
    pub fn into_outcome(self) -> Result<Outcome, ExternalError> {
        if self.success {
            return Ok(Outcome {
                payload: self.payload,
            });
        }
        let message = self
            .payload
            .get("message")
            .and_then(Value::as_str)
            .map(String::from);
        Err(ExternalError::Rejected {
            code: self.error_code.unwrap_or_else(|| "rejected".to_string()),
            message,
        })
    }
}

/// An external service that performs side effects.
///
/// Implementations must not retry; retry policy belongs to the service.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Perform one side effect.
    async fn call(&self, request: &BackendRequest) -> Result<BackendResponse, ExternalError>;

    /// Short name used in logs.
    fn name(&self) -> &str;
}
