//! hubwire gateway binary.
//!
//! - WebSocket endpoint: <gateway.path>?<token_param>=...
//! - RPC + hub channels over one connection
//! - Heartbeat ping + idle timeout
//! - /healthz, /metrics

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use hubwire_core::error::{HubError, Result};
use hubwire_gateway::policy::StaticTokenDecoder;
use hubwire_gateway::{app_state, config, router, services, HubServer, ServerOptions};

const DEFAULT_CONFIG: &str = "hubwire.yaml";

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "hubwire-gateway failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let path = std::env::var("HUBWIRE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG.to_string());
    let cfg = config::load_from_file(&path)?;
    let listen: SocketAddr = cfg
        .gateway
        .listen
        .parse()
        .map_err(|e| HubError::Config(format!("gateway.listen must be a valid SocketAddr: {e}")))?;

    let decoder = StaticTokenDecoder::new(cfg.auth.tokens.clone());
    let server = HubServer::new(Arc::new(decoder), ServerOptions::from_config(&cfg.gateway));
    services::register_builtin(&server)?;

    let state = app_state::AppState::new(cfg, server.clone());
    let app = router::build_router(state);

    tracing::info!(%listen, config = %path, "hubwire-gateway starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| HubError::Internal(format!("failed to bind {listen}: {e}")))?;

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .map_err(|e| HubError::Internal(format!("server failed: {e}")))?;

    server.shutdown();
    Ok(())
}
