//! Service registry: `(namespace, name)` -> descriptor.
//!
//! Two independent tables share one key-uniqueness rule: RPC methods and
//! events. Registration happens at startup; lookups are read-only afterwards.

mod builder;
mod descriptor;

pub use builder::{EventBuilder, MethodBuilder, Service};
pub use descriptor::{EventDescriptor, ServiceDescriptor, SubscriberEntry};

use std::fmt;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use hubwire_core::error::{HubError, Result};

/// Registry key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceKey {
    pub namespace: String,
    pub name: String,
}

impl ServiceKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

/// One keyed table. `kind` only shapes error messages.
pub struct Table<D> {
    kind: &'static str,
    entries: DashMap<ServiceKey, Arc<D>>,
}

impl<D> Table<D> {
    fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: DashMap::new(),
        }
    }

    /// Insert unless the key exists; an existing entry is left untouched.
    pub fn register(&self, key: ServiceKey, descriptor: D) -> Result<Arc<D>> {
        match self.entries.entry(key) {
            Entry::Occupied(e) => Err(HubError::Conflict(format!(
                "namespace '{}' already contains {} '{}'",
                e.key().namespace,
                self.kind,
                e.key().name
            ))),
            Entry::Vacant(v) => {
                let descriptor = Arc::new(descriptor);
                v.insert(Arc::clone(&descriptor));
                Ok(descriptor)
            }
        }
    }

    pub fn lookup(&self, namespace: &str, name: &str) -> Result<Arc<D>> {
        self.entries
            .get(&ServiceKey::new(namespace, name))
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| {
                HubError::NotFound(format!(
                    "namespace '{namespace}' or {} '{name}' not found",
                    self.kind
                ))
            })
    }

    pub fn contains(&self, namespace: &str, name: &str) -> bool {
        self.entries.contains_key(&ServiceKey::new(namespace, name))
    }

    /// Snapshot of every descriptor.
    pub fn all(&self) -> Vec<Arc<D>> {
        self.entries.iter().map(|e| Arc::clone(e.value())).collect()
    }

    pub fn keys(&self) -> Vec<ServiceKey> {
        let mut keys: Vec<ServiceKey> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn clear(&self) {
        self.entries.clear();
    }
}

/// Registry owned by one server instance.
pub struct ServiceRegistry {
    methods: Table<ServiceDescriptor>,
    events: Table<EventDescriptor>,
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self {
            methods: Table::new("method"),
            events: Table::new("event"),
        }
    }

    pub fn methods(&self) -> &Table<ServiceDescriptor> {
        &self.methods
    }

    pub fn events(&self) -> &Table<EventDescriptor> {
        &self.events
    }

    /// Teardown: drop every descriptor and every subscription.
    pub fn clear(&self) {
        for event in self.events.all() {
            event.clear_subscribers();
        }
        self.events.clear();
        self.methods.clear();
    }
}
