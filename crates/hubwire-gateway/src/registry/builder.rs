//! Typed registration API.
//!
//! A [`Service`] pairs a namespace with a shared handler target. Methods and
//! events are declared from it; handlers and predicates receive the target
//! back as `Arc<T>`, so the registry itself never needs to know `T`.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use hubwire_core::error::{HubError, Result};

use super::{EventDescriptor, ServiceDescriptor, ServiceKey};
use crate::bind::{Args, BindingSource, ParamBinding};
use crate::context::Identity;
use crate::dispatch::{EventSource, RpcHandler};
use crate::policy::{select_fn, validate_fn, AccessPolicy, Select};

/// Namespace + handler target.
pub struct Service<T> {
    namespace: String,
    target: Arc<T>,
}

impl<T> Clone for Service<T> {
    fn clone(&self) -> Self {
        Self {
            namespace: self.namespace.clone(),
            target: Arc::clone(&self.target),
        }
    }
}

impl<T: Send + Sync + 'static> Service<T> {
    pub fn new(namespace: impl Into<String>, target: Arc<T>) -> Self {
        Self {
            namespace: namespace.into(),
            target,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn target(&self) -> &Arc<T> {
        &self.target
    }

    /// Declare an async RPC method.
    pub fn method<F, Fut>(&self, name: impl Into<String>, handler: F) -> MethodBuilder<T>
    where
        F: Fn(Arc<T>, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        let handler = FnHandler {
            target: Arc::clone(&self.target),
            f: handler,
        };
        MethodBuilder {
            key: ServiceKey::new(self.namespace.clone(), name),
            target: Arc::clone(&self.target),
            policy: AccessPolicy::open(self.namespace.as_str()),
            bindings: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    /// Declare an RPC method whose body does not suspend.
    pub fn sync_method<F>(&self, name: impl Into<String>, handler: F) -> MethodBuilder<T>
    where
        F: Fn(&T, Args) -> Result<Value> + Send + Sync + 'static,
    {
        self.method(name, move |target: Arc<T>, args: Args| {
            std::future::ready(handler(&target, args))
        })
    }

    /// Declare an event published through `source`.
    pub fn event(&self, name: impl Into<String>, source: &EventSource) -> EventBuilder<T> {
        EventBuilder {
            key: ServiceKey::new(self.namespace.clone(), name),
            target: Arc::clone(&self.target),
            policy: AccessPolicy::open(self.namespace.as_str()),
            selection: None,
            source: source.clone(),
        }
    }
}

struct FnHandler<T, F> {
    target: Arc<T>,
    f: F,
}

#[async_trait]
impl<T, F, Fut> RpcHandler for FnHandler<T, F>
where
    T: Send + Sync + 'static,
    F: Fn(Arc<T>, Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    async fn call(&self, args: Args) -> Result<Value> {
        (self.f)(Arc::clone(&self.target), args).await
    }
}

/// Pending RPC method registration.
pub struct MethodBuilder<T> {
    key: ServiceKey,
    target: Arc<T>,
    policy: AccessPolicy,
    bindings: Vec<ParamBinding>,
    handler: Arc<dyn RpcHandler>,
}

impl<T: Send + Sync + 'static> MethodBuilder<T> {
    pub fn key(&self) -> &ServiceKey {
        &self.key
    }

    pub fn require_auth(mut self) -> Self {
        self.policy = self.policy.require_auth();
        self
    }

    pub fn roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.policy = self.policy.roles(roles);
        self
    }

    /// Custom validation: `(target, identity, request credentials) -> allowed`.
    pub fn validate<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Arc<T>, Option<Identity>, Option<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool>> + Send + 'static,
    {
        let target = Arc::clone(&self.target);
        self.policy = self
            .policy
            .validate(validate_fn(move |id, creds| f(Arc::clone(&target), id, creds)));
        self
    }

    /// Bind the next positional parameter.
    pub fn arg(mut self, source: BindingSource) -> Self {
        let position = self.next_position();
        self.bindings.push(ParamBinding::new(position, source));
        self
    }

    /// Leave the next positional parameter unbound.
    pub fn skip(mut self) -> Self {
        let position = self.next_position();
        self.bindings.push(ParamBinding::unbound(position));
        self
    }

    /// Add an explicit binding.
    pub fn bind(mut self, binding: ParamBinding) -> Self {
        self.bindings.push(binding);
        self
    }

    fn next_position(&self) -> usize {
        self.bindings
            .iter()
            .map(|b| b.position.saturating_add(1))
            .max()
            .unwrap_or(0)
    }

    /// Positions must be unique and dense (`0..n` for `n` bindings).
    pub(crate) fn into_descriptor(self) -> Result<ServiceDescriptor> {
        let mut seen = HashSet::new();
        for b in &self.bindings {
            if b.position >= self.bindings.len() {
                return Err(HubError::Conflict(format!(
                    "{}: parameter {} out of range for {} bindings",
                    self.key,
                    b.position,
                    self.bindings.len()
                )));
            }
            if !seen.insert(b.position) {
                return Err(HubError::Conflict(format!(
                    "{}: parameter {} bound twice",
                    self.key, b.position
                )));
            }
        }
        let mut bindings = self.bindings;
        bindings.sort_by_key(|b| b.position);
        Ok(ServiceDescriptor {
            key: self.key,
            policy: self.policy,
            bindings,
            handler: self.handler,
        })
    }
}

/// Pending event registration.
pub struct EventBuilder<T> {
    key: ServiceKey,
    target: Arc<T>,
    policy: AccessPolicy,
    selection: Option<Select>,
    source: EventSource,
}

impl<T: Send + Sync + 'static> EventBuilder<T> {
    pub fn key(&self) -> &ServiceKey {
        &self.key
    }

    pub fn require_auth(mut self) -> Self {
        self.policy = self.policy.require_auth();
        self
    }

    pub fn roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.policy = self.policy.roles(roles);
        self
    }

    /// Validation run on subscribe: `(target, identity, credentials) -> allowed`.
    pub fn validate<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Arc<T>, Option<Identity>, Option<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool>> + Send + 'static,
    {
        let target = Arc::clone(&self.target);
        self.policy = self
            .policy
            .validate(validate_fn(move |id, creds| f(Arc::clone(&target), id, creds)));
        self
    }

    /// Per-publish selection:
    /// `(target, subscriber identity, subscriber credentials, publisher credentials) -> include`.
    pub fn select<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Arc<T>, Option<Identity>, Option<Value>, Option<Value>) -> Fut
            + Send
            + Sync
            + 'static,
        Fut: Future<Output = Result<bool>> + Send + 'static,
    {
        let target = Arc::clone(&self.target);
        self.selection = Some(select_fn(move |id, sub, publ| {
            f(Arc::clone(&target), id, sub, publ)
        }));
        self
    }

    pub(crate) fn into_parts(self) -> (EventDescriptor, EventSource) {
        (
            EventDescriptor::new(self.key, self.policy, self.selection),
            self.source,
        )
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use serde_json::json;

    struct Calc {
        offset: i64,
    }

    #[tokio::test]
    async fn method_handler_receives_target() {
        let svc = Service::new("calc", Arc::new(Calc { offset: 10 }));
        let desc = svc
            .method("add", |calc: Arc<Calc>, args: Args| async move {
                let n: i64 = args.required(0)?;
                Ok(json!(n + calc.offset))
            })
            .arg(BindingSource::payload_field("n"))
            .into_descriptor()
            .unwrap();
        assert_eq!(desc.key, ServiceKey::new("calc", "add"));
        let out = desc
            .handler
            .call(Args::new(vec![crate::bind::Arg::Value(json!(5))]))
            .await
            .unwrap();
        assert_eq!(out, json!(15));
    }

    #[test]
    fn positions_follow_declaration_order() {
        let svc = Service::new("calc", Arc::new(Calc { offset: 0 }));
        let desc = svc
            .sync_method("noop", |_calc, _args| Ok(Value::Null))
            .arg(BindingSource::connection())
            .skip()
            .arg(BindingSource::payload())
            .into_descriptor()
            .unwrap();
        let positions: Vec<usize> = desc.bindings.iter().map(|b| b.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
        assert_eq!(desc.bindings[1].source, None);
    }

    #[test]
    fn duplicate_position_is_rejected() {
        let svc = Service::new("calc", Arc::new(Calc { offset: 0 }));
        let err = svc
            .sync_method("noop", |_calc, _args| Ok(Value::Null))
            .bind(ParamBinding::new(0, BindingSource::payload()))
            .bind(ParamBinding::new(0, BindingSource::connection()))
            .into_descriptor()
            .unwrap_err();
        assert!(matches!(err, HubError::Conflict(_)));
    }

    #[test]
    fn sparse_or_huge_positions_are_rejected() {
        let svc = Service::new("calc", Arc::new(Calc { offset: 0 }));
        for position in [usize::MAX, 1 << 40, 1] {
            let err = svc
                .sync_method("noop", |_calc, _args| Ok(Value::Null))
                .bind(ParamBinding::new(position, BindingSource::payload()))
                .into_descriptor()
                .unwrap_err();
            assert!(matches!(err, HubError::Conflict(_)), "position {position}");
        }

        // a builder that chains after a huge explicit position must not overflow
        let err = svc
            .sync_method("noop", |_calc, _args| Ok(Value::Null))
            .bind(ParamBinding::new(usize::MAX, BindingSource::payload()))
            .arg(BindingSource::connection())
            .into_descriptor()
            .unwrap_err();
        assert!(matches!(err, HubError::Conflict(_)));
    }

    #[test]
    fn event_policy_flags() {
        let svc = Service::new("calc", Arc::new(Calc { offset: 0 }));
        let source = EventSource::new();
        let (desc, _) = svc
            .event("changed", &source)
            .roles(["admin"])
            .select(|_calc, _id, _sub, _pub| async { Ok(true) })
            .into_parts();
        assert!(desc.policy.requires_auth());
        assert!(desc.selection.is_some());
        assert_eq!(desc.subscriber_count(), 0);
    }
}
