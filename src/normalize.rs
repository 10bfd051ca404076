//! The uniform result envelope returned to callers.
//!
//! Every dispatch produces exactly one [`NormalizedResult`]: a success branch
//! carrying the operation's flattened payload, or an error branch carrying a
//! wire-stable kind and message. Provider field names never appear here.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GatewayError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorEnvelope>,
}

impl NormalizedResult {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(kind: &str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorEnvelope {
                kind: kind.to_string(),
                message: message.into(),
            }),
        }
    }

    /// Whether a caller-side retry (with backoff) is worthwhile.
    pub fn is_retryable(&self) -> bool {
        self.error
            .as_ref()
            .map(|e| e.kind == "ThrottlingError" || e.kind == "TransientNetworkError")
            .unwrap_or(false)
    }
}

impl From<GatewayError> for NormalizedResult {
    fn from(err: GatewayError) -> Self {
        Self::err(err.kind(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteErrorKind;
    use serde_json::json;

    #[test]
    fn success_envelope_has_no_error_branch() {
        let result = NormalizedResult::ok(json!({"count": 0}));
        let wire = serde_json::to_value(&result).unwrap();
        assert_eq!(wire, json!({"success": true, "data": {"count": 0}}));
    }

    #[test]
    fn error_envelope_carries_kind_and_message() {
        let err = GatewayError::remote(RemoteErrorKind::ResourceNotFound, "Instance not found");
        let result = NormalizedResult::from(err);
        let wire = serde_json::to_value(&result).unwrap();
        assert_eq!(
            wire,
            json!({
                "success": false,
                "error": {"kind": "ResourceNotFoundError", "message": "Instance not found"}
            })
        );
        assert!(!result.is_retryable());
    }

    #[test]
    fn throttling_is_retryable() {
        let result = NormalizedResult::from(GatewayError::remote(
            RemoteErrorKind::Throttling,
            "Rate exceeded",
        ));
        assert!(result.is_retryable());
        let result = NormalizedResult::from(GatewayError::UnknownOperation("x".to_string()));
        assert!(!result.is_retryable());
    }
}
