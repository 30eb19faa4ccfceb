use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Value};

use hubwire_core::error::Result;

use crate::bind::{Args, BindingSource};
use crate::registry::Service;
use crate::server::HubServer;

/// Connection diagnostics.
#[derive(Debug)]
pub struct SysService {
    started: Instant,
}

impl Default for SysService {
    fn default() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl SysService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(this: Arc<Self>, server: &HubServer) -> Result<()> {
        let svc = Service::new("sys", this);

        server.register_method(svc.sync_method("ping", |_: &SysService, _: Args| Ok(json!("pong"))))?;

        server.register_method(
            svc.sync_method("uptime", |sys: &SysService, _: Args| {
                Ok(json!({ "uptime_ms": sys.started.elapsed().as_millis() as u64 }))
            }),
        )?;

        server.register_method(
            svc.sync_method("whoami", |_: &SysService, args: Args| {
                Ok(json!({
                    "user": args.value(0).cloned().unwrap_or(Value::Null),
                    "address": args.value(1).cloned().unwrap_or(Value::Null),
                    "origin": args.value(2).cloned().unwrap_or(Value::Null),
                }))
            })
            .require_auth()
            .arg(BindingSource::context("user"))
            .arg(BindingSource::context("address"))
            .arg(BindingSource::context("origin")),
        )?;
        Ok(())
    }
}
