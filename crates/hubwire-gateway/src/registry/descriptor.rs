use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;

use super::ServiceKey;
use crate::bind::ParamBinding;
use crate::context::{ConnectionHandle, ConnectionId};
use crate::dispatch::RpcHandler;
use crate::policy::{AccessPolicy, Select};

/// Registered RPC method. Immutable after registration.
pub struct ServiceDescriptor {
    pub key: ServiceKey,
    pub policy: AccessPolicy,
    pub bindings: Vec<ParamBinding>,
    pub handler: Arc<dyn RpcHandler>,
}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("key", &self.key)
            .field("policy", &self.policy)
            .field("bindings", &self.bindings)
            .finish()
    }
}

/// A live subscription. Credentials are fixed at subscribe time.
#[derive(Debug, Clone)]
pub struct SubscriberEntry {
    pub connection: ConnectionHandle,
    pub credentials: Option<Value>,
}

/// Registered event plus its current subscribers.
///
/// The subscriber map is the only mutable state; each event's map is an
/// independent unit of mutual exclusion.
pub struct EventDescriptor {
    pub key: ServiceKey,
    pub policy: AccessPolicy,
    pub selection: Option<Select>,
    subscribers: DashMap<ConnectionId, SubscriberEntry>,
}

impl fmt::Debug for EventDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDescriptor")
            .field("key", &self.key)
            .field("policy", &self.policy)
            .field("selection", &self.selection.is_some())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl EventDescriptor {
    pub fn new(key: ServiceKey, policy: AccessPolicy, selection: Option<Select>) -> Self {
        Self {
            key,
            policy,
            selection,
            subscribers: DashMap::new(),
        }
    }

    /// Idempotent: an existing entry keeps its original credentials.
    /// Returns true if a new entry was created.
    pub fn subscribe(&self, connection: &ConnectionHandle, credentials: Option<Value>) -> bool {
        let mut inserted = false;
        self.subscribers.entry(connection.id()).or_insert_with(|| {
            inserted = true;
            SubscriberEntry {
                connection: ConnectionHandle::clone(connection),
                credentials,
            }
        });
        inserted
    }

    pub fn unsubscribe(&self, id: ConnectionId) -> bool {
        self.subscribers.remove(&id).is_some()
    }

    pub fn is_subscribed(&self, id: ConnectionId) -> bool {
        self.subscribers.contains_key(&id)
    }

    /// Point-in-time copy of the subscriber set.
    pub fn snapshot(&self) -> Vec<SubscriberEntry> {
        self.subscribers.iter().map(|e| e.value().clone()).collect()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub(crate) fn clear_subscribers(&self) {
        self.subscribers.clear();
    }
}
