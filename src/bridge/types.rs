use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// Field the correlated request path adds to outbound args; the host echoes it back.
pub const REQUEST_ID_FIELD: &str = "requestId";

/// One outbound invocation. Lives only for the duration of the send attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeMethodCall {
    pub method: String,
    pub args: Map<String, Value>,
}

impl BridgeMethodCall {
    pub fn new(method: impl Into<String>, args: Map<String, Value>) -> Self {
        Self {
            method: method.into(),
            args,
        }
    }

    /// JSON text handed to the host (`{}` for empty args).
    pub fn payload(&self) -> Result<String, BridgeError> {
        serde_json::to_string(&self.args).map_err(BridgeError::Serialize)
    }
}

/// What the host sends back through a callback slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "requestId", default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Feature-specific fields, consumed ad hoc by whoever handles the response
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BridgeResponse {
    /// Lenient conversion, field by field. A mistyped `success` counts as
    /// false, a mistyped `message` as empty; every other key lands in `extra`.
    /// Anything that is not an object becomes an empty failure.
    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut fields) = value else {
            return Self::default();
        };
        let success = fields.remove("success").and_then(|v| v.as_bool()).unwrap_or(false);
        let message = match fields.remove("message") {
            Some(Value::String(m)) => m,
            _ => String::new(),
        };
        let request_id = match fields.remove(REQUEST_ID_FIELD) {
            Some(Value::String(id)) => Some(id),
            _ => None,
        };
        Self {
            success,
            message,
            request_id,
            extra: fields,
        }
    }
}

/// Errors returned by bridge host objects.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("host connection closed")]
    Closed,
    #[error("host rejected call: {0}")]
    Rejected(String),
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("SketchUp host is not available")]
    Unavailable,
    #[error("failed to serialize arguments: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error(transparent)]
    Host(#[from] HostError),
    #[error("no response to '{method}' after {after:?}")]
    Timeout { method: String, after: Duration },
    #[error("host detached before responding")]
    Detached,
}
