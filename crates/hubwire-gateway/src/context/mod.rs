//! Per-connection context shared across layers.
//!
//! A `Connection` is created once per accepted transport session and carries
//! the handshake metadata, the outbound queue, and the identity attached after
//! the first successful authentication.

pub mod connection;
pub mod identity;

pub use connection::{Connection, ConnectionHandle, ConnectionId, Handshake};
pub use identity::Identity;
