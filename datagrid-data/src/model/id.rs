//! Row identity

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use super::FieldAccess;
use super::Value;

/// Stable identifier of a row.
///
/// Backends use string or numeric ids; both are normalized to their string
/// form, so `RowId::from(9)` equals `RowId::from("9")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(String);

impl RowId {
    /// Creates a row id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derives an id from a cell value. Null, empty and structured values
    /// have no identity.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.is_empty() => Some(Self(s.clone())),
            Value::Int(i) => Some(Self(i.to_string())),
            Value::Float(f) if f.fract() == 0.0 && f.is_finite() => {
                Some(Self(format!("{}", *f as i64)))
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for RowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RowId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for RowId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<i64> for RowId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<Uuid> for RowId {
    fn from(id: Uuid) -> Self {
        Self(id.to_string())
    }
}

impl From<RowId> for Value {
    fn from(id: RowId) -> Self {
        Value::String(id.0)
    }
}

/// Injected identity function for rows of type `R`.
///
/// Identity resolution is a single pure function supplied by the caller.
/// Rows exposing [`FieldAccess`] can opt into [`Identity::field`] or the
/// conventional [`Identity::uuid`] fallback, but nothing is guessed.
pub struct Identity<R> {
    resolve: Arc<dyn Fn(&R) -> Option<RowId> + Send + Sync>,
}

impl<R> Identity<R> {
    /// Creates an identity from a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&R) -> Option<RowId> + Send + Sync + 'static,
    {
        Self { resolve: Arc::new(f) }
    }

    /// Resolves the identity of a row.
    pub fn of(&self, row: &R) -> Option<RowId> {
        (self.resolve)(row)
    }
}

impl<R: FieldAccess + 'static> Identity<R> {
    /// Identity read from a named field.
    pub fn field(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(move |row: &R| RowId::from_value(&row.field(&name)))
    }

    /// Identity read from the `uuid` field.
    pub fn uuid() -> Self {
        Self::field("uuid")
    }

    /// Identity read from `primary`, falling back to the `uuid` field.
    pub fn field_or_uuid(primary: impl Into<String>) -> Self {
        let primary = primary.into();
        Self::new(move |row: &R| {
            RowId::from_value(&row.field(&primary))
                .or_else(|| RowId::from_value(&row.field("uuid")))
        })
    }
}

impl<R> Clone for Identity<R> {
    fn clone(&self) -> Self {
        Self {
            resolve: Arc::clone(&self.resolve),
        }
    }
}

impl<R> std::fmt::Debug for Identity<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity").finish_non_exhaustive()
    }
}
