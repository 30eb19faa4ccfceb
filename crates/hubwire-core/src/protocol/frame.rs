//! Channel-tagged frame envelopes and the decode/encode entry points.

use serde::{Deserialize, Serialize};

use super::hub::{PublishMessage, SubscriptionRequest, SubscriptionResponse};
use super::rpc::{RpcRequest, RpcResponse};
use super::ErrorBody;
use crate::error::{ErrorCode, HubError, Result};

/// Client -> server frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "channel", rename_all = "lowercase")]
pub enum InboundFrame {
    Rpc(RpcRequest),
    Hub(SubscriptionRequest),
}

/// Connection-level notice for frames that never reached a dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorNotice {
    pub error: ErrorBody,
}

impl ErrorNotice {
    pub fn protocol(message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody::new(ErrorCode::ProtocolError, message),
        }
    }
}

/// Server -> client frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "channel", rename_all = "lowercase")]
pub enum OutboundFrame {
    Rpc(RpcResponse),
    Hub(SubscriptionResponse),
    Publish(PublishMessage),
    Error(ErrorNotice),
}

/// Decode one text frame. Any shape error is a protocol error.
pub fn decode_inbound(text: &str) -> Result<InboundFrame> {
    serde_json::from_str(text).map_err(|e| HubError::Protocol(format!("invalid frame: {e}")))
}

/// Encode one outbound frame to JSON text.
pub fn encode_outbound(frame: &OutboundFrame) -> Result<String> {
    serde_json::to_string(frame).map_err(|e| HubError::Internal(format!("frame encode failed: {e}")))
}
