use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;
use serde_json::Value;

use hubwire_core::error::Result;
use hubwire_core::protocol::{
    HubAction, OutboundFrame, PublishMessage, SubscriptionRequest, SubscriptionResponse,
};
use hubwire_core::ErrorCode;

use crate::context::{ConnectionHandle, ConnectionId};
use crate::obs::HubMetrics;
use crate::policy::access::run_predicate;
use crate::policy::AuthValidator;
use crate::registry::{EventDescriptor, ServiceRegistry, SubscriberEntry};

/// Subscribe/unsubscribe/publish engine.
///
/// Per (connection, event): `unsubscribed -> subscribed -> unsubscribed`,
/// with disconnect jumping straight back to unsubscribed.
pub struct PubSubEngine {
    registry: Arc<ServiceRegistry>,
    auth: Arc<AuthValidator>,
    metrics: Arc<HubMetrics>,
    publish_timeout: Duration,
}

impl PubSubEngine {
    pub fn new(
        registry: Arc<ServiceRegistry>,
        auth: Arc<AuthValidator>,
        metrics: Arc<HubMetrics>,
        publish_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            auth,
            metrics,
            publish_timeout,
        }
    }

    /// Route one hub-channel request by its method.
    pub async fn handle(&self, conn: &ConnectionHandle, req: SubscriptionRequest) -> SubscriptionResponse {
        let resp = match req.action() {
            Some(HubAction::Subscribe) => self.subscribe(conn, &req).await,
            Some(HubAction::Unsubscribe) => self.unsubscribe(conn, &req),
            None => SubscriptionResponse::failure(
                &req,
                ErrorCode::ProtocolError,
                format!("method '{}' not implemented", req.method),
            ),
        };

        let outcome = resp.code().map_or("OK", ErrorCode::as_str);
        let (ns, name) = match resp.code() {
            Some(ErrorCode::NotFound | ErrorCode::ProtocolError) => ("_unknown", "_unknown"),
            _ => (req.namespace.as_str(), req.name.as_str()),
        };
        self.metrics.subscriptions.inc(&[
            ("namespace", ns),
            ("name", name),
            ("method", if req.action().is_some() { req.method.as_str() } else { "_unknown" }),
            ("code", outcome),
        ]);
        tracing::debug!(conn = %conn.id(), namespace = %req.namespace, name = %req.name, method = %req.method, code = outcome, "hub request");
        resp
    }

    pub async fn subscribe(&self, conn: &ConnectionHandle, req: &SubscriptionRequest) -> SubscriptionResponse {
        let descriptor = match self.registry.events().lookup(&req.namespace, &req.name) {
            Ok(d) => d,
            Err(e) => return SubscriptionResponse::failure(req, e.client_code(), e.to_string()),
        };

        if let Err(code) = self
            .auth
            .authorize(&descriptor.policy, conn, req.credentials.as_ref())
            .await
        {
            return SubscriptionResponse::failure(req, code, "unauthorized");
        }

        descriptor.subscribe(conn, req.credentials.clone());
        // lost the race against disconnect cleanup: undo so nothing dangles
        if !conn.is_open() {
            descriptor.unsubscribe(conn.id());
        }
        SubscriptionResponse::success(req)
    }

    /// Absence of a subscription is not an error.
    pub fn unsubscribe(&self, conn: &ConnectionHandle, req: &SubscriptionRequest) -> SubscriptionResponse {
        match self.registry.events().lookup(&req.namespace, &req.name) {
            Ok(descriptor) => {
                descriptor.unsubscribe(conn.id());
                SubscriptionResponse::success(req)
            }
            Err(e) => SubscriptionResponse::failure(req, e.client_code(), e.to_string()),
        }
    }

    /// Fan `data` out to the subscribers selected for this publish.
    ///
    /// The subscriber set is snapshotted first; selection predicates then run
    /// concurrently and a subscriber removed in the meantime is skipped.
    /// Returns the number of deliveries.
    pub async fn publish(
        &self,
        namespace: &str,
        name: &str,
        data: Option<Value>,
        publisher_credentials: Option<Value>,
    ) -> Result<usize> {
        let descriptor = self.registry.events().lookup(namespace, name)?;
        let snapshot = descriptor.snapshot();
        let selected = self
            .select(&descriptor, snapshot, publisher_credentials)
            .await;

        let msg = PublishMessage {
            namespace: namespace.to_string(),
            name: name.to_string(),
            data: data.unwrap_or(Value::Null),
        };
        let wait = self.publish_timeout;
        let mut sends = FuturesUnordered::new();
        for conn in selected {
            if !descriptor.is_subscribed(conn.id()) || !conn.is_open() {
                continue;
            }
            let frame = OutboundFrame::Publish(msg.clone());
            sends.push(async move { conn.send_timeout(frame, wait).await });
        }

        let mut delivered = 0usize;
        while let Some(ok) = sends.next().await {
            if ok {
                delivered += 1;
            }
        }

        let labels = [("namespace", namespace), ("name", name)];
        self.metrics.publishes.inc(&labels);
        self.metrics.deliveries.add(&labels, delivered as u64);
        tracing::debug!(namespace, name, delivered, "published");
        Ok(delivered)
    }

    async fn select(
        &self,
        descriptor: &EventDescriptor,
        snapshot: Vec<SubscriberEntry>,
        publisher_credentials: Option<Value>,
    ) -> Vec<ConnectionHandle> {
        let Some(selection) = descriptor.selection.as_ref() else {
            return snapshot.into_iter().map(|e| e.connection).collect();
        };

        let evals = snapshot.into_iter().map(|entry| {
            let fut = selection(
                entry.connection.identity().cloned(),
                entry.credentials.clone(),
                publisher_credentials.clone(),
            );
            async move {
                match run_predicate(fut).await {
                    Ok(true) => Some(entry.connection),
                    Ok(false) => None,
                    Err(e) => {
                        tracing::warn!(conn = %entry.connection.id(), key = %descriptor.key, error = %e, "selection faulted");
                        self.metrics.selection_faults.inc(&[
                            ("namespace", descriptor.key.namespace.as_str()),
                            ("name", descriptor.key.name.as_str()),
                        ]);
                        None
                    }
                }
            }
        });

        join_all(evals).await.into_iter().flatten().collect()
    }

    /// Drop every subscription held by `id`, across all events.
    pub fn disconnect(&self, id: ConnectionId) -> usize {
        self.registry
            .events()
            .all()
            .iter()
            .filter(|event| event.unsubscribe(id))
            .count()
    }
}
