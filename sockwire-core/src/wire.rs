//! Client-visible wire contract.
//!
//! The `error` and `redirect` events and their payload shapes are the only
//! externally observable output of the pipeline itself. Keep them stable.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event name used for every error emitted to a client.
pub const ERROR_EVENT: &str = "error";

/// Event name used for redirections.
pub const REDIRECT_EVENT: &str = "redirect";

/// Message of the generic, non-leaking internal error payload.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal error";

/// Payload of the `error` event: `{code, message, descriptor?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// 4xx for client errors, 500 for internal errors.
    pub code: u16,
    /// Human-readable message.
    pub message: String,
    /// Optional structured detail (validation errors, debug info).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<Value>,
}

impl ErrorPayload {
    /// The fixed payload sent for unclassified errors outside development runs.
    pub fn internal() -> Self {
        Self {
            code: 500,
            message: INTERNAL_ERROR_MESSAGE.to_owned(),
            descriptor: None,
        }
    }

    /// Convert into the JSON value handed to [`Connection::emit`].
    ///
    /// [`Connection::emit`]: crate::Connection::emit
    pub fn into_value(self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Payload of the `redirect` event: `{target}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectPayload {
    /// Where the client should go.
    pub target: String,
}

impl RedirectPayload {
    /// Convert into the JSON value handed to [`Connection::emit`].
    ///
    /// [`Connection::emit`]: crate::Connection::emit
    pub fn into_value(self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_internal_payload_shape() {
        assert_eq!(
            ErrorPayload::internal().into_value(),
            json!({"code": 500, "message": "Internal error"})
        );
    }

    #[test]
    fn test_descriptor_omitted_when_absent() {
        let payload = ErrorPayload {
            code: 403,
            message: "nope".into(),
            descriptor: None,
        };
        let value = payload.into_value();
        assert!(value.get("descriptor").is_none());
        let decoded: ErrorPayload = serde_json::from_value(value).unwrap();
        assert_eq!(decoded.code, 403);
    }

    #[test]
    fn test_value_matches_serialized_form() {
        let payload = ErrorPayload {
            code: 400,
            message: "Bad payload: \"a\" is required".into(),
            descriptor: Some(json!([{"path": ["a"], "type": "any.required"}])),
        };
        assert_eq!(
            payload.clone().into_value(),
            serde_json::to_value(&payload).unwrap()
        );
        assert_eq!(
            payload.into_value(),
            json!({
                "code": 400,
                "message": "Bad payload: \"a\" is required",
                "descriptor": [{"path": ["a"], "type": "any.required"}],
            })
        );
    }

    #[test]
    fn test_redirect_payload_shape() {
        let payload = RedirectPayload {
            target: "/login".into(),
        };
        assert_eq!(payload.into_value(), json!({"target": "/login"}));
    }
}
