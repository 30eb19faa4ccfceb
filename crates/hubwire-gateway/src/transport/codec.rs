//! Socket message <-> hub frame mapping.
//!
//! - Text frames => decoded `InboundFrame`
//! - Binary frames => protocol error (the hub speaks JSON text only)
//! - Ping/Pong/Close are surfaced for lifecycle management

use axum::extract::ws::Message;
use hubwire_core::{
    error::{HubError, Result},
    protocol::{decode_inbound, encode_outbound, InboundFrame, OutboundFrame},
};

#[derive(Debug)]
pub enum Inbound {
    Frame(InboundFrame),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close,
}

pub fn decode(msg: Message) -> Result<Inbound> {
    match msg {
        Message::Text(s) => Ok(Inbound::Frame(decode_inbound(&s)?)),
        Message::Binary(b) => Err(HubError::Protocol(format!(
            "binary frames are not supported ({} bytes)",
            b.len()
        ))),
        Message::Ping(v) => Ok(Inbound::Ping(v)),
        Message::Pong(v) => Ok(Inbound::Pong(v)),
        Message::Close(_) => Ok(Inbound::Close),
    }
}

pub fn encode(frame: &OutboundFrame) -> Result<Message> {
    encode_outbound(frame).map(Message::Text)
}
