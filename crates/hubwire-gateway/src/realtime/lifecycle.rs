use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use hubwire_core::error::HubError;
use hubwire_core::protocol::{decode_inbound, ErrorNotice, InboundFrame, OutboundFrame};

use super::connections::ConnectionRegistry;
use crate::context::{Connection, ConnectionHandle, ConnectionId, Handshake};
use crate::dispatch::{PubSubEngine, RpcDispatcher};
use crate::obs::HubMetrics;

/// Attaches connections to both dispatch paths and tears them down.
///
/// Every decoded request runs on its own task. RPC requests are pipelined, so
/// a slow handler never holds up later frames. Hub requests from one
/// connection run strictly in arrival order.
pub struct ConnectionLifecycle {
    connections: ConnectionRegistry,
    /// Completion signal of each connection's most recent hub request.
    hub_tails: DashMap<ConnectionId, oneshot::Receiver<()>>,
    rpc: Arc<RpcDispatcher>,
    hub: Arc<PubSubEngine>,
    metrics: Arc<HubMetrics>,
    next_id: AtomicU64,
    outbound_queue: usize,
}

impl ConnectionLifecycle {
    pub fn new(
        rpc: Arc<RpcDispatcher>,
        hub: Arc<PubSubEngine>,
        metrics: Arc<HubMetrics>,
        outbound_queue: usize,
    ) -> Self {
        Self {
            connections: ConnectionRegistry::new(),
            hub_tails: DashMap::new(),
            rpc,
            hub,
            metrics,
            next_id: AtomicU64::new(1),
            outbound_queue: outbound_queue.max(1),
        }
    }

    /// Register a freshly accepted connection. The receiver is the
    /// connection's outbound queue; the transport drains it.
    pub fn open(&self, handshake: Handshake) -> (ConnectionHandle, mpsc::Receiver<OutboundFrame>) {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.outbound_queue);
        let conn = Arc::new(Connection::new(id, handshake, tx));

        self.connections.insert(Arc::clone(&conn));
        self.metrics.connections_opened.inc(&[]);
        self.metrics.connections_active.inc(&[]);
        tracing::debug!(conn = %id, "connection opened");
        (conn, rx)
    }

    /// Decode one text frame and route it.
    ///
    /// Undecodable input is answered with an error notice; the connection
    /// stays open. Returns the request task when one was spawned.
    pub fn on_text(&self, conn: &ConnectionHandle, text: &str) -> Option<JoinHandle<()>> {
        match decode_inbound(text) {
            Ok(frame) => Some(self.on_frame(conn, frame)),
            Err(e) => {
                self.reject(conn, &e);
                None
            }
        }
    }

    /// Route one decoded frame by channel on its own task.
    pub fn on_frame(&self, conn: &ConnectionHandle, frame: InboundFrame) -> JoinHandle<()> {
        let conn = Arc::clone(conn);
        match frame {
            InboundFrame::Rpc(req) => {
                let rpc = Arc::clone(&self.rpc);
                tokio::spawn(async move {
                    let resp = rpc.dispatch(&conn, req).await;
                    if !conn.send(OutboundFrame::Rpc(resp)).await {
                        tracing::debug!(conn = %conn.id(), "rpc response dropped; connection closed");
                    }
                })
            }
            InboundFrame::Hub(req) => {
                let hub = Arc::clone(&self.hub);
                // queue behind the previous hub request; order is fixed here,
                // synchronously, in frame arrival order
                let (done_tx, done_rx) = oneshot::channel();
                let prev = self.hub_tails.insert(conn.id(), done_rx);
                if !conn.is_open() {
                    self.hub_tails.remove(&conn.id());
                }
                tokio::spawn(async move {
                    if let Some(prev) = prev {
                        // an error only means the previous task is gone
                        let _ = prev.await;
                    }
                    let resp = hub.handle(&conn, req).await;
                    if !conn.send(OutboundFrame::Hub(resp)).await {
                        tracing::debug!(conn = %conn.id(), "hub response dropped; connection closed");
                    }
                    let _ = done_tx.send(());
                })
            }
        }
    }

    /// Answer a frame that never reached a dispatcher.
    pub fn reject(&self, conn: &ConnectionHandle, err: &HubError) {
        self.metrics.decode_errors.inc(&[("code", err.client_code().as_str())]);
        tracing::debug!(conn = %conn.id(), error = %err, "frame rejected");
        if !conn.try_send(OutboundFrame::Error(ErrorNotice::protocol(err.to_string()))) {
            tracing::warn!(conn = %conn.id(), "error notice dropped; outbound queue full");
        }
    }

    /// Tear down a connection. Marks it closed first so in-flight publishes
    /// skip it, then drops every subscription it holds.
    pub fn close(&self, conn: &ConnectionHandle) -> usize {
        if !conn.mark_closed() {
            return 0;
        }
        let dropped = self.hub.disconnect(conn.id());
        self.hub_tails.remove(&conn.id());
        self.connections.remove(conn.id());
        self.metrics.connections_active.dec(&[]);
        tracing::debug!(conn = %conn.id(), subscriptions = dropped, "connection closed");
        dropped
    }

    /// Close every live connection.
    pub fn close_all(&self) -> usize {
        self.connections
            .all()
            .iter()
            .map(|conn| self.close(conn))
            .sum()
    }

    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::panic)]

    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::policy::{AuthValidator, StaticTokenDecoder};
    use crate::registry::ServiceRegistry;

    fn lifecycle() -> ConnectionLifecycle {
        let registry = Arc::new(ServiceRegistry::new());
        let auth = Arc::new(AuthValidator::new(Arc::new(StaticTokenDecoder::new(
            Vec::<(String, serde_json::Value)>::new(),
        ))));
        let metrics = Arc::new(HubMetrics::default());
        let rpc = Arc::new(RpcDispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&auth),
            Arc::clone(&metrics),
        ));
        let hub = Arc::new(PubSubEngine::new(
            registry,
            auth,
            Arc::clone(&metrics),
            Duration::from_millis(100),
        ));
        ConnectionLifecycle::new(rpc, hub, metrics, 8)
    }

    #[tokio::test]
    async fn ids_are_unique_and_close_is_once() {
        let lc = lifecycle();
        let (a, _ra) = lc.open(Handshake::default());
        let (b, _rb) = lc.open(Handshake::default());
        assert_ne!(a.id(), b.id());
        assert_eq!(lc.connections().len(), 2);

        lc.close(&a);
        assert!(!a.is_open());
        assert_eq!(lc.connections().len(), 1);
        assert_eq!(lc.close(&a), 0);
        assert_eq!(lc.metrics.connections_active.get(&[]), 1);
    }

    #[tokio::test]
    async fn bad_text_gets_error_notice() {
        let lc = lifecycle();
        let (conn, mut rx) = lc.open(Handshake::default());

        assert!(lc.on_text(&conn, "{nope").is_none());
        match rx.recv().await.unwrap() {
            OutboundFrame::Error(n) => {
                assert_eq!(n.error.code, hubwire_core::ErrorCode::ProtocolError)
            }
            other => panic!("unexpected frame: {other:?}"),
        }
        assert!(conn.is_open());
    }

    #[tokio::test]
    async fn rpc_frame_is_answered() {
        let lc = lifecycle();
        let (conn, mut rx) = lc.open(Handshake::default());

        let text = json!({"channel": "rpc", "namespace": "nope", "method": "x"}).to_string();
        lc.on_text(&conn, &text).unwrap().await.unwrap();
        match rx.recv().await.unwrap() {
            OutboundFrame::Rpc(resp) => {
                assert!(!resp.is_success);
                assert_eq!(resp.code(), Some(hubwire_core::ErrorCode::NotFound));
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}
