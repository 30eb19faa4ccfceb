//! Shared application state handed to axum handlers.

use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::server::HubServer;

#[derive(Clone)]
pub struct AppState {
    cfg: Arc<GatewayConfig>,
    server: HubServer,
}

impl AppState {
    /// Services must already be registered on `server`.
    pub fn new(cfg: GatewayConfig, server: HubServer) -> Self {
        Self {
            cfg: Arc::new(cfg),
            server,
        }
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.cfg
    }

    pub fn server(&self) -> &HubServer {
        &self.server
    }
}
