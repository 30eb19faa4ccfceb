//! Publish trigger handed to services.
//!
//! One normalized callback `(credentials?, data?)`; the four shapes a service
//! may fire with (nothing, credentials only, data only, both) are thin
//! wrappers over it.

use std::sync::{Arc, OnceLock, Weak};

use serde_json::Value;

use hubwire_core::error::{HubError, Result};

use super::hub::PubSubEngine;
use crate::registry::ServiceKey;

struct SourceBinding {
    engine: Weak<PubSubEngine>,
    key: ServiceKey,
}

/// Cloneable handle; all clones share one binding.
#[derive(Clone, Default)]
pub struct EventSource {
    binding: Arc<OnceLock<SourceBinding>>,
}

impl std::fmt::Debug for EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSource")
            .field("key", &self.key())
            .finish()
    }
}

impl EventSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_bound(&self) -> bool {
        self.binding.get().is_some()
    }

    /// Event this source publishes to, once registered.
    pub fn key(&self) -> Option<&ServiceKey> {
        self.binding.get().map(|b| &b.key)
    }

    pub(crate) fn bind(&self, engine: Weak<PubSubEngine>, key: ServiceKey) -> Result<()> {
        self.binding
            .set(SourceBinding { engine, key })
            .map_err(|rejected| {
                HubError::Conflict(format!(
                    "event source for '{}' is already bound to '{}'",
                    rejected.key,
                    self.key().map(ToString::to_string).unwrap_or_default()
                ))
            })
    }

    /// Publish to the bound event. Returns the number of deliveries.
    ///
    /// Unbound sources and dropped servers are a logged no-op.
    pub async fn emit(&self, credentials: Option<Value>, data: Option<Value>) -> usize {
        let Some(binding) = self.binding.get() else {
            tracing::debug!("emit on unbound event source ignored");
            return 0;
        };
        let Some(engine) = binding.engine.upgrade() else {
            tracing::debug!(key = %binding.key, "emit after server shutdown ignored");
            return 0;
        };
        tracing::debug!(key = %binding.key, "event dispatched");
        match engine
            .publish(&binding.key.namespace, &binding.key.name, data, credentials)
            .await
        {
            Ok(delivered) => delivered,
            Err(e) => {
                tracing::warn!(key = %binding.key, error = %e, "publish failed");
                0
            }
        }
    }

    pub async fn fire(&self) -> usize {
        self.emit(None, None).await
    }

    pub async fn fire_credentials(&self, credentials: Value) -> usize {
        self.emit(Some(credentials), None).await
    }

    pub async fn fire_data(&self, data: Value) -> usize {
        self.emit(None, Some(data)).await
    }

    pub async fn fire_with(&self, credentials: Value, data: Value) -> usize {
        self.emit(Some(credentials), Some(data)).await
    }
}
