//! RPC lane: request/response keyed by `(namespace, method)`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ErrorBody;
use crate::error::ErrorCode;

/// Inbound RPC call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub namespace: String,
    pub method: String,
    /// Payload handed to payload bindings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Caller-supplied credentials for validation predicates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Value>,
}

/// Outbound RPC result. Exactly one per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcResponse {
    pub namespace: String,
    pub method: String,
    pub is_success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl RpcResponse {
    pub fn success(req: &RpcRequest, data: Value) -> Self {
        Self {
            namespace: req.namespace.clone(),
            method: req.method.clone(),
            is_success: true,
            data: (!data.is_null()).then_some(data),
            error: None,
        }
    }

    pub fn failure(req: &RpcRequest, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            namespace: req.namespace.clone(),
            method: req.method.clone(),
            is_success: false,
            data: None,
            error: Some(ErrorBody::new(code, message)),
        }
    }

    /// Error code of a failed response.
    pub fn code(&self) -> Option<ErrorCode> {
        self.error.as_ref().map(|e| e.code)
    }
}
