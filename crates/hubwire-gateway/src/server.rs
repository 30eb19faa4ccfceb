//! Server instance: one registry, one decoder, both dispatch paths.
//!
//! Several servers may live in one process; nothing here is global.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use hubwire_core::error::{HubError, Result};
use hubwire_core::protocol::OutboundFrame;

use crate::config::GatewaySection;
use crate::context::{ConnectionHandle, Handshake};
use crate::dispatch::{PubSubEngine, RpcDispatcher};
use crate::obs::HubMetrics;
use crate::policy::{AuthValidator, TokenDecoder};
use crate::realtime::ConnectionLifecycle;
use crate::registry::{EventBuilder, MethodBuilder, ServiceRegistry};

/// Runtime knobs that do not come from registration.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub outbound_queue: usize,
    pub publish_timeout: Duration,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            outbound_queue: 1024,
            publish_timeout: Duration::from_millis(1500),
        }
    }
}

impl ServerOptions {
    pub fn from_config(gw: &GatewaySection) -> Self {
        Self {
            outbound_queue: gw.outbound_queue,
            publish_timeout: gw.publish_timeout(),
        }
    }
}

#[derive(Clone)]
pub struct HubServer {
    inner: Arc<ServerInner>,
}

struct ServerInner {
    registry: Arc<ServiceRegistry>,
    rpc: Arc<RpcDispatcher>,
    hub: Arc<PubSubEngine>,
    lifecycle: ConnectionLifecycle,
    metrics: Arc<HubMetrics>,
    accepting: AtomicBool,
}

impl HubServer {
    pub fn new(decoder: Arc<dyn TokenDecoder>, options: ServerOptions) -> Self {
        let registry = Arc::new(ServiceRegistry::new());
        let auth = Arc::new(AuthValidator::new(decoder));
        let metrics = Arc::new(HubMetrics::default());

        let rpc = Arc::new(RpcDispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&auth),
            Arc::clone(&metrics),
        ));
        let hub = Arc::new(PubSubEngine::new(
            Arc::clone(&registry),
            auth,
            Arc::clone(&metrics),
            options.publish_timeout,
        ));
        let lifecycle = ConnectionLifecycle::new(
            Arc::clone(&rpc),
            Arc::clone(&hub),
            Arc::clone(&metrics),
            options.outbound_queue,
        );

        Self {
            inner: Arc::new(ServerInner {
                registry,
                rpc,
                hub,
                lifecycle,
                metrics,
                accepting: AtomicBool::new(false),
            }),
        }
    }

    fn ensure_registration_open(&self) -> Result<()> {
        if self.inner.accepting.load(Ordering::Acquire) {
            return Err(HubError::Config(
                "registration is closed once connections are accepted".into(),
            ));
        }
        Ok(())
    }

    /// Register one RPC method. Duplicate keys fail with `Conflict` and leave
    /// the existing descriptor untouched.
    pub fn register_method<T: Send + Sync + 'static>(&self, method: MethodBuilder<T>) -> Result<()> {
        self.ensure_registration_open()?;
        let descriptor = method.into_descriptor()?;
        let key = descriptor.key.clone();
        self.inner.registry.methods().register(key.clone(), descriptor)?;
        tracing::info!(namespace = %key.namespace, name = %key.name, "method registered");
        Ok(())
    }

    /// Register one event and bind its source to this server.
    pub fn register_event<T: Send + Sync + 'static>(&self, event: EventBuilder<T>) -> Result<()> {
        self.ensure_registration_open()?;
        let (descriptor, source) = event.into_parts();
        let key = descriptor.key.clone();

        if let Some(bound) = source.key() {
            return Err(HubError::Conflict(format!(
                "event source for '{key}' is already bound to '{bound}'"
            )));
        }
        self.inner.registry.events().register(key.clone(), descriptor)?;
        source.bind(Arc::downgrade(&self.inner.hub), key.clone())?;

        tracing::info!(namespace = %key.namespace, name = %key.name, "event registered");
        Ok(())
    }

    /// Accept a connection. Closes registration.
    pub fn connect(&self, handshake: Handshake) -> (ConnectionHandle, mpsc::Receiver<OutboundFrame>) {
        self.inner.accepting.store(true, Ordering::Release);
        self.inner.lifecycle.open(handshake)
    }

    pub fn handle_text(&self, conn: &ConnectionHandle, text: &str) -> Option<JoinHandle<()>> {
        self.inner.lifecycle.on_text(conn, text)
    }

    pub fn reject(&self, conn: &ConnectionHandle, err: &HubError) {
        self.inner.lifecycle.reject(conn, err)
    }

    /// Returns the number of subscriptions dropped.
    pub fn disconnect(&self, conn: &ConnectionHandle) -> usize {
        self.inner.lifecycle.close(conn)
    }

    /// Publish directly by key, bypassing an `EventSource`.
    pub async fn publish(
        &self,
        namespace: &str,
        name: &str,
        data: Option<Value>,
        credentials: Option<Value>,
    ) -> Result<usize> {
        self.inner.hub.publish(namespace, name, data, credentials).await
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.inner.registry
    }

    pub fn rpc(&self) -> &RpcDispatcher {
        &self.inner.rpc
    }

    pub fn hub(&self) -> &PubSubEngine {
        &self.inner.hub
    }

    pub fn lifecycle(&self) -> &ConnectionLifecycle {
        &self.inner.lifecycle
    }

    pub fn metrics(&self) -> &HubMetrics {
        &self.inner.metrics
    }

    /// Close every connection and drop all registrations.
    pub fn shutdown(&self) {
        let dropped = self.inner.lifecycle.close_all();
        self.inner.registry.clear();
        tracing::info!(subscriptions = dropped, "server shut down");
    }
}
