//! Parameter binding.
//!
//! Each RPC handler declares, per positional parameter, where its value comes
//! from: connection-derived context (identity, token, transport metadata,
//! request credentials) or the inbound payload. Binding resolves those
//! declarations into an ordered [`Args`] list before the handler runs.

mod args;

pub use args::{Arg, Args};

use serde_json::Value;

use hubwire_core::error::{HubError, Result};
use hubwire_core::protocol::RpcRequest;

use crate::context::ConnectionHandle;

/// Where one parameter's value comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingSource {
    /// `None` binds the connection handle itself.
    Context(Option<String>),
    /// `None` binds the whole payload.
    Payload(Option<String>),
}

impl BindingSource {
    pub fn connection() -> Self {
        BindingSource::Context(None)
    }

    pub fn context(field: impl Into<String>) -> Self {
        BindingSource::Context(Some(field.into()))
    }

    pub fn payload() -> Self {
        BindingSource::Payload(None)
    }

    pub fn payload_field(field: impl Into<String>) -> Self {
        BindingSource::Payload(Some(field.into()))
    }
}

/// One declared parameter. A binding without a source yields [`Arg::Unset`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamBinding {
    pub position: usize,
    pub source: Option<BindingSource>,
}

impl ParamBinding {
    pub fn new(position: usize, source: BindingSource) -> Self {
        Self {
            position,
            source: Some(source),
        }
    }

    pub fn unbound(position: usize) -> Self {
        Self {
            position,
            source: None,
        }
    }
}

/// Resolve `bindings` against the connection and request.
///
/// Positions without a binding are filled with [`Arg::Unset`] so positional
/// order is preserved.
pub fn bind(bindings: &[ParamBinding], conn: &ConnectionHandle, req: &RpcRequest) -> Result<Args> {
    let len = bindings
        .iter()
        .map(|b| b.position.saturating_add(1))
        .max()
        .unwrap_or(0);
    if len > bindings.len() {
        return Err(HubError::Internal(format!(
            "parameter positions exceed {} bindings",
            bindings.len()
        )));
    }
    let mut out = vec![Arg::Unset; len];

    for binding in bindings {
        let arg = match &binding.source {
            None => Arg::Unset,
            Some(BindingSource::Context(None)) => Arg::Connection(ConnectionHandle::clone(conn)),
            Some(BindingSource::Context(Some(field))) => context_field(field, conn, req)?,
            Some(BindingSource::Payload(None)) => Arg::from_option(req.data.clone()),
            Some(BindingSource::Payload(Some(field))) => {
                Arg::from_option(req.data.as_ref().and_then(|d| d.get(field.as_str())).cloned())
            }
        };
        if let Some(slot) = out.get_mut(binding.position) {
            *slot = arg;
        }
    }

    Ok(Args::new(out))
}

fn context_field(field: &str, conn: &ConnectionHandle, req: &RpcRequest) -> Result<Arg> {
    let hs = conn.handshake();
    let arg = match field {
        "user" => Arg::from_option(conn.identity().map(|id| id.to_value())),
        "token" => Arg::from_option(hs.token.clone().map(Value::String)),
        "address" => Arg::from_option(hs.address.map(|a| Value::String(a.to_string()))),
        "url" => Arg::Value(Value::String(hs.url.clone())),
        "origin" => Arg::from_option(hs.origin.clone().map(Value::String)),
        "credentials" => Arg::from_option(req.credentials.clone()),
        other => {
            return Err(HubError::Protocol(format!(
                "context field '{other}' not implemented"
            )))
        }
    };
    Ok(arg)
}
