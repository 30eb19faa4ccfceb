//! Dispatch paths.
//!
//! - `rpc`: request/response calls routed to registered handlers.
//! - `hub`: subscribe/unsubscribe/publish with selection-based fan-out.
//! - `source`: the publish trigger handed to services.

pub mod hub;
pub mod rpc;
pub mod source;

pub use hub::PubSubEngine;
pub use rpc::{RpcDispatcher, RpcHandler};
pub use source::EventSource;
