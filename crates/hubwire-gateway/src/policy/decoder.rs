//! Token decoding (external collaborator seam).

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use hubwire_core::error::{HubError, Result};

use crate::context::Identity;

/// Turns a presented token into an identity, or fails.
#[async_trait]
pub trait TokenDecoder: Send + Sync {
    async fn decode(&self, token: &str) -> Result<Identity>;
}

/// Fixed token table, loaded from config. Meant for development and tests.
#[derive(Debug, Default)]
pub struct StaticTokenDecoder {
    tokens: HashMap<String, Identity>,
}

impl StaticTokenDecoder {
    pub fn new<I>(tokens: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        Self {
            tokens: tokens
                .into_iter()
                .map(|(token, claims)| (token, Identity::new(claims)))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl TokenDecoder for StaticTokenDecoder {
    async fn decode(&self, token: &str) -> Result<Identity> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| HubError::fault("unknown token"))
    }
}
