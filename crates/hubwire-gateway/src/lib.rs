//! hubwire gateway library entry.
//!
//! Wires the service registry, access policies, parameter binding, the RPC
//! and pub/sub dispatch paths, and the WebSocket transport into one server.
//! Consumed by the binary (`main.rs`) and by integration tests.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

pub mod app_state;
pub mod bind;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod obs;
pub mod ops;
pub mod policy;
pub mod realtime;
pub mod registry;
pub mod router;
pub mod server;
pub mod services;
pub mod transport;

pub use server::{HubServer, ServerOptions};
