//! Transport layer (WebSocket).
//!
//! Exposes the WS upgrade handler and the codec mapping socket messages onto
//! hub frames.

pub mod codec;
pub mod ws;
