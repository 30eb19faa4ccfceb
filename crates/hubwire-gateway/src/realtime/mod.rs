//! Connection runtime.
//!
//! Live connection table plus the lifecycle that binds each connection to the
//! RPC and hub dispatch paths.

mod connections;
mod lifecycle;

pub use connections::ConnectionRegistry;
pub use lifecycle::ConnectionLifecycle;
