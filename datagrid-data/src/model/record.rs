//! Dynamic record

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use super::Value;

/// Form value shape: field key → value.
///
/// Create and update calls receive this map as the partial record.
pub type FieldValues = BTreeMap<String, Value>;

/// Read access to named fields.
///
/// Paths may be dotted (`address.city`) to reach into nested JSON objects.
pub trait FieldAccess {
    /// Returns the value at `path`, or [`Value::Null`] if absent.
    fn field(&self, path: &str) -> Value;
}

/// A dynamic record whose fields are held in a sorted map.
///
/// # Example
///
/// ```
/// use datagrid_data::model::{FieldAccess, Record, Value};
///
/// let record = Record::new()
///     .set("id", "1")
///     .set("name", "Alice")
///     .set("active", true);
///
/// assert_eq!(record.field("name"), Value::from("Alice"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// Creates a new empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a record from an existing field map.
    pub fn from_fields(fields: FieldValues) -> Self {
        Self { fields }
    }

    // =========================================================================
    // Raw field access
    // =========================================================================

    /// Returns a reference to the top-level field value, if it exists.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Returns `true` if the record contains the given field.
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Returns a reference to all fields.
    pub fn fields(&self) -> &FieldValues {
        &self.fields
    }

    /// Consumes the record and returns its fields.
    pub fn into_fields(self) -> FieldValues {
        self.fields
    }

    // =========================================================================
    // Setters
    // =========================================================================

    /// Sets a field value (builder pattern).
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Inserts a field value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Removes a field and returns its value.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    /// Overwrites fields with the entries of `values`.
    pub fn merge(&mut self, values: FieldValues) {
        self.fields.extend(values);
    }
}

impl FieldAccess for Record {
    fn field(&self, path: &str) -> Value {
        if let Some(value) = self.fields.get(path) {
            return value.clone();
        }
        let mut parts = path.split('.');
        let Some(head) = parts.next() else {
            return Value::Null;
        };
        let Some(Value::Json(json)) = self.fields.get(head) else {
            return Value::Null;
        };
        let mut current = json;
        for part in parts {
            match current.get(part) {
                Some(next) => current = next,
                None => return Value::Null,
            }
        }
        Value::from(current.clone())
    }
}

impl FieldAccess for FieldValues {
    fn field(&self, path: &str) -> Value {
        self.get(path).cloned().unwrap_or_default()
    }
}

impl From<FieldValues> for Record {
    fn from(fields: FieldValues) -> Self {
        Self::from_fields(fields)
    }
}
