use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use hubwire_core::error::{HubError, Result};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    #[serde(default)]
    pub auth: AuthSection,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(HubError::UnsupportedVersion);
        }
        self.gateway.validate()?;
        self.auth.validate()?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// WebSocket upgrade route.
    #[serde(default = "default_path")]
    pub path: String,

    /// Query parameter carrying the presented token.
    #[serde(default = "default_token_param")]
    pub token_param: String,

    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    /// Per-connection outbound frame queue.
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,

    /// How long a publish waits on one subscriber's full queue.
    #[serde(default = "default_publish_timeout_ms")]
    pub publish_timeout_ms: u64,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            path: default_path(),
            token_param: default_token_param(),
            ping_interval_ms: default_ping_interval_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            outbound_queue: default_outbound_queue(),
            publish_timeout_ms: default_publish_timeout_ms(),
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        if !self.path.starts_with('/') {
            return Err(HubError::Config("gateway.path must start with '/'".into()));
        }
        if self.token_param.is_empty() {
            return Err(HubError::Config("gateway.token_param must not be empty".into()));
        }
        if !(5000..=120000).contains(&self.ping_interval_ms) {
            return Err(HubError::Config(
                "gateway.ping_interval_ms must be between 5000 and 120000".into(),
            ));
        }
        if !(10000..=600000).contains(&self.idle_timeout_ms) {
            return Err(HubError::Config(
                "gateway.idle_timeout_ms must be between 10000 and 600000".into(),
            ));
        }
        if self.idle_timeout_ms <= self.ping_interval_ms {
            return Err(HubError::Config(
                "gateway.idle_timeout_ms must be greater than ping_interval_ms".into(),
            ));
        }
        if !(1..=65536).contains(&self.outbound_queue) {
            return Err(HubError::Config(
                "gateway.outbound_queue must be between 1 and 65536".into(),
            ));
        }
        if !(1..=60000).contains(&self.publish_timeout_ms) {
            return Err(HubError::Config(
                "gateway.publish_timeout_ms must be between 1 and 60000".into(),
            ));
        }
        Ok(())
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_path() -> String {
    "/v1/ws".into()
}
fn default_token_param() -> String {
    "auth_token".into()
}
fn default_ping_interval_ms() -> u64 {
    20000
}
fn default_idle_timeout_ms() -> u64 {
    60000
}
fn default_outbound_queue() -> usize {
    1024
}
fn default_publish_timeout_ms() -> u64 {
    1500
}

/// Token table for the bundled static decoder: token -> identity claims.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthSection {
    #[serde(default)]
    pub tokens: BTreeMap<String, Value>,
}

impl AuthSection {
    pub fn validate(&self) -> Result<()> {
        for (token, claims) in &self.tokens {
            if token.is_empty() {
                return Err(HubError::Config("auth.tokens keys must not be empty".into()));
            }
            if !claims.is_object() {
                return Err(HubError::Config(format!(
                    "auth.tokens.{token} must be a mapping of claims"
                )));
            }
        }
        Ok(())
    }
}
