//! Policy layer (authentication and authorization).
//!
//! Access policies are attached to every RPC method and event at registration
//! time. The validator evaluates them against a connection and the credentials
//! supplied by the request before anything reaches a handler or subscriber set.

pub mod access;
pub mod decoder;
pub mod validator;

pub use access::{select_fn, validate_fn, AccessPolicy, Select, Validate};
pub use decoder::{StaticTokenDecoder, TokenDecoder};
pub use validator::AuthValidator;
