//! Hub lane: subscriptions keyed by `(namespace, name)` and publish pushes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ErrorBody;
use crate::error::ErrorCode;

/// Recognized subscription methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubAction {
    Subscribe,
    Unsubscribe,
}

/// Inbound subscribe/unsubscribe request.
///
/// `method` stays a free string so an unknown value can still be answered
/// with a response keyed by the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    pub namespace: String,
    pub name: String,
    pub method: String,
    /// Captured on subscribe and replayed to the selection predicate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Value>,
}

impl SubscriptionRequest {
    pub fn action(&self) -> Option<HubAction> {
        match self.method.as_str() {
            "subscribe" => Some(HubAction::Subscribe),
            "unsubscribe" => Some(HubAction::Unsubscribe),
            _ => None,
        }
    }
}

/// Outbound subscription result, same shape as an RPC response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    pub namespace: String,
    pub name: String,
    pub method: String,
    pub is_success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl SubscriptionResponse {
    pub fn success(req: &SubscriptionRequest) -> Self {
        Self {
            namespace: req.namespace.clone(),
            name: req.name.clone(),
            method: req.method.clone(),
            is_success: true,
            data: None,
            error: None,
        }
    }

    pub fn failure(req: &SubscriptionRequest, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            namespace: req.namespace.clone(),
            name: req.name.clone(),
            method: req.method.clone(),
            is_success: false,
            data: None,
            error: Some(ErrorBody::new(code, message)),
        }
    }

    pub fn code(&self) -> Option<ErrorCode> {
        self.error.as_ref().map(|e| e.code)
    }
}

/// Server push delivered to the fan-out set of one publish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishMessage {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub data: Value,
}
