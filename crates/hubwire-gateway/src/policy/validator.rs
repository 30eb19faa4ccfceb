use std::sync::Arc;

use serde_json::Value;

use hubwire_core::ErrorCode;

use super::access::{run_predicate, AccessPolicy};
use super::decoder::TokenDecoder;
use crate::context::{Connection, Identity};

/// Evaluates access policies against a connection.
///
/// Order is fixed and short-circuits: authentication, then roles, then the
/// custom validation predicate.
pub struct AuthValidator {
    decoder: Arc<dyn TokenDecoder>,
}

impl AuthValidator {
    pub fn new(decoder: Arc<dyn TokenDecoder>) -> Self {
        Self { decoder }
    }

    pub async fn authorize(
        &self,
        policy: &AccessPolicy,
        conn: &Connection,
        credentials: Option<&Value>,
    ) -> Result<(), ErrorCode> {
        if policy.requires_auth() {
            self.authenticate(conn).await?;
        }

        if let Some(allowed) = policy.allowed_roles() {
            let ok = conn
                .identity()
                .and_then(|id| id.has_any_role(allowed))
                .unwrap_or(false);
            if !ok {
                tracing::warn!(conn = %conn.id(), namespace = policy.namespace(), "invalid user roles");
                return Err(ErrorCode::AuthInvalidRole);
            }
        }

        if let Some(validate) = policy.validator() {
            let fut = validate(conn.identity().cloned(), credentials.cloned());
            match run_predicate(fut).await {
                Ok(true) => {}
                Ok(false) => return Err(ErrorCode::AuthCredentialsError),
                Err(e) => {
                    tracing::warn!(conn = %conn.id(), namespace = policy.namespace(), error = %e, "validation faulted");
                    return Err(ErrorCode::AuthCredentialsError);
                }
            }
        }

        Ok(())
    }

    async fn authenticate<'c>(&self, conn: &'c Connection) -> Result<&'c Identity, ErrorCode> {
        conn.authenticate(|| async {
            let Some(token) = conn.token() else {
                return Err(ErrorCode::AuthRequired);
            };
            match self.decoder.decode(token).await {
                Ok(identity) => {
                    tracing::debug!(conn = %conn.id(), "connection authenticated");
                    Ok(identity)
                }
                Err(e) => {
                    tracing::warn!(conn = %conn.id(), error = %e, "token decode failed");
                    Err(ErrorCode::AuthTokenInvalid)
                }
            }
        })
        .await
    }
}
