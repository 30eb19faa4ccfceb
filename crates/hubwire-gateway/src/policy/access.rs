use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::Value;

use hubwire_core::error::{HubError, Result};

use crate::context::Identity;

/// Custom validation: `(identity, request credentials) -> allowed`.
///
/// The handler target is captured by the closure at registration.
pub type Validate =
    Arc<dyn Fn(Option<Identity>, Option<Value>) -> BoxFuture<'static, Result<bool>> + Send + Sync>;

/// Fan-out selection:
/// `(subscriber identity, subscriber credentials, publisher credentials) -> include`.
pub type Select = Arc<
    dyn Fn(Option<Identity>, Option<Value>, Option<Value>) -> BoxFuture<'static, Result<bool>>
        + Send
        + Sync,
>;

/// Wrap an async closure as a [`Validate`] predicate.
pub fn validate_fn<F, Fut>(f: F) -> Validate
where
    F: Fn(Option<Identity>, Option<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<bool>> + Send + 'static,
{
    Arc::new(move |identity, credentials| f(identity, credentials).boxed())
}

/// Wrap an async closure as a [`Select`] predicate.
pub fn select_fn<F, Fut>(f: F) -> Select
where
    F: Fn(Option<Identity>, Option<Value>, Option<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<bool>> + Send + 'static,
{
    Arc::new(move |identity, subscriber, publisher| f(identity, subscriber, publisher).boxed())
}

/// Authentication/authorization configuration for one method or event.
/// Immutable once registered.
#[derive(Clone)]
pub struct AccessPolicy {
    namespace: Arc<str>,
    require_auth: bool,
    allowed_roles: Option<HashSet<String>>,
    validate: Option<Validate>,
}

impl fmt::Debug for AccessPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessPolicy")
            .field("namespace", &self.namespace)
            .field("require_auth", &self.require_auth)
            .field("allowed_roles", &self.allowed_roles)
            .field("validate", &self.validate.is_some())
            .finish()
    }
}

impl AccessPolicy {
    /// No authentication, no roles, no validation.
    pub fn open(namespace: impl Into<Arc<str>>) -> Self {
        Self {
            namespace: namespace.into(),
            require_auth: false,
            allowed_roles: None,
            validate: None,
        }
    }

    pub fn require_auth(mut self) -> Self {
        self.require_auth = true;
        self
    }

    /// Restrict to identities holding at least one of `roles`. Implies auth.
    pub fn roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.require_auth = true;
        self.allowed_roles = Some(roles.into_iter().map(Into::into).collect());
        self
    }

    pub fn validate(mut self, validate: Validate) -> Self {
        self.validate = Some(validate);
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn requires_auth(&self) -> bool {
        self.require_auth
    }

    pub fn allowed_roles(&self) -> Option<&HashSet<String>> {
        self.allowed_roles.as_ref()
    }

    pub fn validator(&self) -> Option<&Validate> {
        self.validate.as_ref()
    }
}

/// Await a predicate future, turning a panic into a fault.
pub(crate) async fn run_predicate(fut: BoxFuture<'static, Result<bool>>) -> Result<bool> {
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(r) => r,
        Err(_) => Err(HubError::fault("predicate panicked")),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::panic)]

    use super::*;

    #[test]
    fn roles_imply_auth() {
        let p = AccessPolicy::open("admin").roles(["admin"]);
        assert!(p.requires_auth());
        assert!(p.allowed_roles().unwrap().contains("admin"));
        assert!(p.validator().is_none());
    }

    #[tokio::test]
    async fn panicking_predicate_becomes_fault() {
        let explode = true;
        let fut: BoxFuture<'static, Result<bool>> = async move {
            if explode {
                panic!("bad predicate");
            }
            Ok(true)
        }
        .boxed();
        let err = run_predicate(fut).await.unwrap_err();
        assert_eq!(err.to_string(), "predicate panicked");
    }
}
