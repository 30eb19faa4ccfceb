use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

use hubwire_core::error::{HubError, Result};

use crate::context::ConnectionHandle;

/// One bound argument.
#[derive(Clone)]
pub enum Arg {
    /// The calling connection.
    Connection(ConnectionHandle),
    Value(Value),
    /// Nothing bound, or the bound source had no value.
    Unset,
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Connection(c) => write!(f, "Connection({})", c.id()),
            Arg::Value(v) => write!(f, "Value({v})"),
            Arg::Unset => f.write_str("Unset"),
        }
    }
}

impl Arg {
    pub(crate) fn from_option(v: Option<Value>) -> Self {
        v.map_or(Arg::Unset, Arg::Value)
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Arg::Unset)
    }
}

/// Positional arguments handed to an RPC handler.
#[derive(Debug, Clone, Default)]
pub struct Args(Vec<Arg>);

impl Args {
    pub fn new(args: Vec<Arg>) -> Self {
        Self(args)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&Arg> {
        self.0.get(i)
    }

    pub fn value(&self, i: usize) -> Option<&Value> {
        match self.0.get(i) {
            Some(Arg::Value(v)) => Some(v),
            _ => None,
        }
    }

    pub fn connection(&self, i: usize) -> Option<&ConnectionHandle> {
        match self.0.get(i) {
            Some(Arg::Connection(c)) => Some(c),
            _ => None,
        }
    }

    /// Deserialize argument `i`; `Ok(None)` when unset.
    pub fn parse<T: DeserializeOwned>(&self, i: usize) -> Result<Option<T>> {
        self.value(i)
            .map(|v| {
                T::deserialize(v)
                    .map_err(|e| HubError::fault(format!("argument {i}: {e}")))
            })
            .transpose()
    }

    /// Like [`Args::parse`] but a missing value is a fault.
    pub fn required<T: DeserializeOwned>(&self, i: usize) -> Result<T> {
        self.parse(i)?
            .ok_or_else(|| HubError::fault(format!("argument {i} is required")))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arg> {
        self.0.iter()
    }
}
