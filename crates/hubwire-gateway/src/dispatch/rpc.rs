use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures_util::FutureExt;
use serde_json::Value;

use hubwire_core::error::Result;
use hubwire_core::protocol::{RpcRequest, RpcResponse};
use hubwire_core::ErrorCode;

use crate::bind::{self, Args};
use crate::context::ConnectionHandle;
use crate::obs::HubMetrics;
use crate::policy::AuthValidator;
use crate::registry::ServiceRegistry;

/// RPC method body. Receives the bound positional arguments.
#[async_trait]
pub trait RpcHandler: Send + Sync {
    async fn call(&self, args: Args) -> Result<Value>;
}

/// Request/response call path.
///
/// Lookup, authorization and binding failures answer without touching the
/// handler. Exactly one response per request.
pub struct RpcDispatcher {
    registry: Arc<ServiceRegistry>,
    auth: Arc<AuthValidator>,
    metrics: Arc<HubMetrics>,
}

impl RpcDispatcher {
    pub fn new(
        registry: Arc<ServiceRegistry>,
        auth: Arc<AuthValidator>,
        metrics: Arc<HubMetrics>,
    ) -> Self {
        Self {
            registry,
            auth,
            metrics,
        }
    }

    pub async fn dispatch(&self, conn: &ConnectionHandle, req: RpcRequest) -> RpcResponse {
        let started = Instant::now();
        let resp = self.call(conn, &req).await;

        let code = resp.code();
        // unknown keys are bucketed to keep label cardinality bounded
        let (ns, method) = match code {
            Some(ErrorCode::NotFound) => ("_unknown", "_unknown"),
            _ => (req.namespace.as_str(), req.method.as_str()),
        };
        let code_label = code.map_or("OK", ErrorCode::as_str);
        self.metrics
            .rpc_calls
            .inc(&[("namespace", ns), ("method", method), ("code", code_label)]);
        self.metrics
            .rpc_duration
            .observe(&[("namespace", ns)], started.elapsed());

        match &resp.error {
            None => tracing::debug!(conn = %conn.id(), namespace = %req.namespace, method = %req.method, "rpc ok"),
            Some(e) => tracing::debug!(
                conn = %conn.id(),
                namespace = %req.namespace,
                method = %req.method,
                code = e.code.as_str(),
                message = %e.message,
                "rpc failed"
            ),
        }
        resp
    }

    async fn call(&self, conn: &ConnectionHandle, req: &RpcRequest) -> RpcResponse {
        let descriptor = match self.registry.methods().lookup(&req.namespace, &req.method) {
            Ok(d) => d,
            Err(e) => return RpcResponse::failure(req, e.client_code(), e.to_string()),
        };

        if let Err(code) = self
            .auth
            .authorize(&descriptor.policy, conn, req.credentials.as_ref())
            .await
        {
            return RpcResponse::failure(req, code, "unauthorized");
        }

        let args = match bind::bind(&descriptor.bindings, conn, req) {
            Ok(args) => args,
            Err(e) => return RpcResponse::failure(req, e.client_code(), e.to_string()),
        };

        match AssertUnwindSafe(descriptor.handler.call(args)).catch_unwind().await {
            Ok(Ok(data)) => RpcResponse::success(req, data),
            Ok(Err(e)) => {
                tracing::warn!(conn = %conn.id(), key = %descriptor.key, error = %e, "handler faulted");
                RpcResponse::failure(req, ErrorCode::ServerError, e.to_string())
            }
            Err(_) => {
                tracing::warn!(conn = %conn.id(), key = %descriptor.key, "handler panicked");
                RpcResponse::failure(req, ErrorCode::ServerError, "handler panicked")
            }
        }
    }
}
