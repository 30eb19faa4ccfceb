//! Shared error type across hubwire crates.

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Unknown namespace/method or namespace/event.
    NotFound,
    /// Endpoint requires auth and the connection presented no token.
    AuthRequired,
    /// Token decoder rejected the presented token.
    AuthTokenInvalid,
    /// Identity carries none of the allowed roles.
    AuthInvalidRole,
    /// Validation predicate rejected or faulted.
    AuthCredentialsError,
    /// Handler body faulted.
    ServerError,
    /// Malformed frame, unknown method, unsupported binding.
    ProtocolError,
}

impl ErrorCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::AuthRequired => "AUTH_REQUIRED",
            ErrorCode::AuthTokenInvalid => "AUTH_TOKEN_INVALID",
            ErrorCode::AuthInvalidRole => "AUTH_INVALID_ROLE",
            ErrorCode::AuthCredentialsError => "AUTH_CREDENTIALS_ERROR",
            ErrorCode::ServerError => "SERVER_ERROR",
            ErrorCode::ProtocolError => "PROTOCOL_ERROR",
        }
    }

    /// Inverse of [`ErrorCode::as_str`].
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "NOT_FOUND" => ErrorCode::NotFound,
            "AUTH_REQUIRED" => ErrorCode::AuthRequired,
            "AUTH_TOKEN_INVALID" => ErrorCode::AuthTokenInvalid,
            "AUTH_INVALID_ROLE" => ErrorCode::AuthInvalidRole,
            "AUTH_CREDENTIALS_ERROR" => ErrorCode::AuthCredentialsError,
            "SERVER_ERROR" => ErrorCode::ServerError,
            "PROTOCOL_ERROR" => ErrorCode::ProtocolError,
            _ => return None,
        })
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for ErrorCode {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        ErrorCode::parse(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown error code: {s}")))
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, HubError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum HubError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("auth required")]
    AuthRequired,
    #[error("auth token invalid")]
    AuthTokenInvalid,
    #[error("invalid role")]
    AuthInvalidRole,
    #[error("credentials rejected")]
    AuthCredentialsError,
    #[error("protocol: {0}")]
    Protocol(String),
    /// Duplicate registration or double-bound event source. Startup only.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Handler or predicate failure; displays as the bare message.
    #[error("{0}")]
    Fault(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("config: {0}")]
    Config(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl HubError {
    /// Shorthand for handler/predicate failures.
    pub fn fault(msg: impl Into<String>) -> Self {
        HubError::Fault(msg.into())
    }

    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ErrorCode {
        match self {
            HubError::NotFound(_) => ErrorCode::NotFound,
            HubError::AuthRequired => ErrorCode::AuthRequired,
            HubError::AuthTokenInvalid => ErrorCode::AuthTokenInvalid,
            HubError::AuthInvalidRole => ErrorCode::AuthInvalidRole,
            HubError::AuthCredentialsError => ErrorCode::AuthCredentialsError,
            HubError::Protocol(_) | HubError::UnsupportedVersion | HubError::Config(_) => {
                ErrorCode::ProtocolError
            }
            HubError::Conflict(_) | HubError::Fault(_) | HubError::Internal(_) => {
                ErrorCode::ServerError
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn codes_round_trip_through_strings() {
        for code in [
            ErrorCode::NotFound,
            ErrorCode::AuthRequired,
            ErrorCode::AuthTokenInvalid,
            ErrorCode::AuthInvalidRole,
            ErrorCode::AuthCredentialsError,
            ErrorCode::ServerError,
            ErrorCode::ProtocolError,
        ] {
            assert_eq!(ErrorCode::parse(code.as_str()), Some(code));
        }
        assert_eq!(ErrorCode::parse("NOPE"), None);
    }

    #[test]
    fn fault_displays_bare_message() {
        let e = HubError::fault("boom");
        assert_eq!(e.to_string(), "boom");
        assert_eq!(e.client_code(), ErrorCode::ServerError);
    }
}
