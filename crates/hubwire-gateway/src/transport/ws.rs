//! WebSocket handler.
//!
//! Responsibilities:
//! - Upgrade HTTP -> WS
//! - Capture handshake metadata (token, peer address, url, origin)
//! - Lifecycle: ping/pong + idle timeout
//! - Decode each text frame once and hand it to the connection lifecycle

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, OriginalUri, Query, State,
    },
    http::{header, HeaderMap, Uri},
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::time::{Duration, Instant};
use tracing::Instrument;

use crate::app_state::AppState;
use crate::context::Handshake;
use crate::transport::codec::{self, Inbound};

pub async fn ws_upgrade(
    State(app): State<AppState>,
    ws: WebSocketUpgrade,
    Query(query): Query<HashMap<String, String>>,
    OriginalUri(uri): OriginalUri,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Response {
    let handshake = Handshake {
        token: query.get(&app.cfg().gateway.token_param).cloned(),
        address: peer.map(|ConnectInfo(addr)| addr),
        url: request_path(&uri),
        origin: headers
            .get(header::ORIGIN)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
    };

    ws.on_upgrade(move |socket| run_session(app, handshake, socket))
}

/// Path only; the query string carries the token.
fn request_path(uri: &Uri) -> String {
    uri.path().to_owned()
}

async fn run_session(app: AppState, handshake: Handshake, socket: WebSocket) {
    let server = app.server().clone();
    let (conn, mut out_rx) = server.connect(handshake);
    let span = tracing::info_span!("ws_session", conn = %conn.id());

    async move {
        tracing::info!(addr = ?conn.handshake().address, "session started");

        let (mut ws_tx, mut ws_rx) = socket.split();

        let gw = &app.cfg().gateway;
        let idle_timeout = gw.idle_timeout();
        let mut ping_tick = tokio::time::interval(gw.ping_interval());
        ping_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let mut last_activity = Instant::now();

        loop {
            tokio::select! {
                // outbound writer
                maybe_out = out_rx.recv() => {
                    let Some(frame) = maybe_out else { break; };
                    match codec::encode(&frame) {
                        Ok(msg) => {
                            if ws_tx.send(msg).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => tracing::warn!(error = %e, "outbound frame dropped"),
                    }
                }

                // inbound reader
                incoming = ws_rx.next() => {
                    let Some(incoming) = incoming else { break; };
                    let Ok(msg) = incoming else { break; };

                    last_activity = Instant::now();

                    match codec::decode(msg) {
                        Ok(Inbound::Frame(frame)) => {
                            server.lifecycle().on_frame(&conn, frame);
                        }
                        Ok(Inbound::Ping(payload)) => {
                            if ws_tx.send(Message::Pong(payload)).await.is_err() {
                                break;
                            }
                        }
                        Ok(Inbound::Pong(_)) => {}
                        Ok(Inbound::Close) => break,
                        Err(e) => server.reject(&conn, &e),
                    }
                }

                // ping
                _ = ping_tick.tick() => {
                    if ws_tx.send(Message::Ping(Vec::new())).await.is_err() {
                        break;
                    }
                }

                // idle timeout
                _ = tokio::time::sleep(Duration::from_millis(250)) => {
                    if last_activity.elapsed() >= idle_timeout {
                        tracing::info!("idle timeout");
                        break;
                    }
                }
            }
        }

        let dropped = server.disconnect(&conn);
        let _ = ws_tx.close().await;
        tracing::info!(subscriptions = dropped, "session ended");
    }
    .instrument(span)
    .await
}
