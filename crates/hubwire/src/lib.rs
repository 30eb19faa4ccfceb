//! Top-level facade crate for hubwire.
//!
//! Re-exports the wire/error core and the gateway library so applications can
//! depend on a single crate.

pub mod core {
    pub use hubwire_core::*;
}

pub mod gateway {
    pub use hubwire_gateway::*;
}
