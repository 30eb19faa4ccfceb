//! hubwire core: transport-agnostic wire frames and the shared error surface.
//!
//! This crate defines the channel-tagged JSON frames exchanged between the
//! gateway and its clients (RPC request/response, subscription
//! request/response, publish push) and the error codes carried inside them.
//! It carries no transport or runtime dependencies.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths surface as `HubError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{ErrorCode, HubError, Result};
