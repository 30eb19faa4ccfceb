use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, OnceCell};

use hubwire_core::protocol::OutboundFrame;
use hubwire_core::ErrorCode;

use super::identity::Identity;

/// Process-unique connection id (allocated by the lifecycle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Transport metadata captured once at upgrade time.
#[derive(Debug, Clone, Default)]
pub struct Handshake {
    /// Presented auth token (query parameter).
    pub token: Option<String>,
    /// Transport peer address.
    pub address: Option<SocketAddr>,
    /// Request path of the upgrade request. The query string (which carries
    /// the token) is not kept.
    pub url: String,
    /// `Origin` header.
    pub origin: Option<String>,
}

/// Outcome of the single authentication attempt.
#[derive(Debug, Clone)]
enum AuthState {
    Authenticated(Identity),
    Failed(ErrorCode),
}

/// One live client connection.
pub struct Connection {
    id: ConnectionId,
    handshake: Handshake,
    auth: OnceCell<AuthState>,
    tx: mpsc::Sender<OutboundFrame>,
    open: AtomicBool,
}

pub type ConnectionHandle = Arc<Connection>;

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("open", &self.is_open())
            .field("authenticated", &self.identity().is_some())
            .finish()
    }
}

impl Connection {
    pub fn new(id: ConnectionId, handshake: Handshake, tx: mpsc::Sender<OutboundFrame>) -> Self {
        Self {
            id,
            handshake,
            auth: OnceCell::new(),
            tx,
            open: AtomicBool::new(true),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn handshake(&self) -> &Handshake {
        &self.handshake
    }

    pub fn token(&self) -> Option<&str> {
        self.handshake.token.as_deref()
    }

    /// Identity attached by a successful authentication, if any.
    pub fn identity(&self) -> Option<&Identity> {
        match self.auth.get() {
            Some(AuthState::Authenticated(identity)) => Some(identity),
            _ => None,
        }
    }

    /// Whether authentication has been attempted (successfully or not).
    pub fn auth_attempted(&self) -> bool {
        self.auth.initialized()
    }

    /// Run `attempt` at most once per connection and replay its outcome.
    ///
    /// Concurrent callers share one in-flight attempt. `attempt` yields the
    /// identity or the failure code to cache.
    pub async fn authenticate<F, Fut>(&self, attempt: F) -> Result<&Identity, ErrorCode>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Identity, ErrorCode>>,
    {
        let state = self
            .auth
            .get_or_init(|| async move {
                match attempt().await {
                    Ok(identity) => AuthState::Authenticated(identity),
                    Err(code) => AuthState::Failed(code),
                }
            })
            .await;
        match state {
            AuthState::Authenticated(identity) => Ok(identity),
            AuthState::Failed(code) => Err(*code),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Returns true only for the call that actually closed it.
    pub(crate) fn mark_closed(&self) -> bool {
        self.open.swap(false, Ordering::SeqCst)
    }

    /// Queue a frame, waiting for capacity. False if the connection is gone.
    pub async fn send(&self, frame: OutboundFrame) -> bool {
        if !self.is_open() {
            return false;
        }
        self.tx.send(frame).await.is_ok()
    }

    /// Like `send`, but gives up after `wait`.
    pub async fn send_timeout(&self, frame: OutboundFrame, wait: Duration) -> bool {
        if !self.is_open() {
            return false;
        }
        self.tx.send_timeout(frame, wait).await.is_ok()
    }

    /// Non-blocking enqueue; drops the frame if the queue is full.
    pub fn try_send(&self, frame: OutboundFrame) -> bool {
        self.is_open() && self.tx.try_send(frame).is_ok()
    }
}
