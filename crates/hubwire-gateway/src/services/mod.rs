//! Built-in services registered by the gateway binary.

pub mod chat;
pub mod sys;

pub use chat::ChatService;
pub use sys::SysService;

use std::sync::Arc;

use hubwire_core::error::Result;

use crate::server::HubServer;

/// Register every built-in service on `server`.
pub fn register_builtin(server: &HubServer) -> Result<()> {
    SysService::register(Arc::new(SysService::new()), server)?;
    ChatService::register(Arc::new(ChatService::new()), server)?;
    Ok(())
}
