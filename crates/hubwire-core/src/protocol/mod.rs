//! Protocol modules.
//!
//! Every frame is a JSON text message tagged by `channel`:
//! - `rpc`: request/response calls keyed by `(namespace, method)`.
//! - `hub`: subscribe/unsubscribe requests keyed by `(namespace, name)`.
//! - `publish`: unsolicited server push to the fan-out set of an event.
//! - `error`: connection-level notice for frames that could not be decoded.

pub mod frame;
pub mod hub;
pub mod rpc;

use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;

/// Error block embedded in failed responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorBody {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

pub use frame::{decode_inbound, encode_outbound, ErrorNotice, InboundFrame, OutboundFrame};
pub use hub::{HubAction, PublishMessage, SubscriptionRequest, SubscriptionResponse};
pub use rpc::{RpcRequest, RpcResponse};
