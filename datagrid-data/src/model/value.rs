//! Value enum for dynamic cell values

use std::cmp::Ordering;

use chrono::DateTime;
use chrono::NaiveDate;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Default maximum length for display text.
pub const DISPLAY_MAX: usize = 500;

/// Placeholder shown for null values.
pub const EMPTY_DISPLAY: &str = "—";

/// A dynamic value read from a row through a column accessor, or held in a
/// form field.
///
/// Deserialization is untagged, so ISO date strings (`2024-01-15`) come back
/// as [`Value::Date`] and RFC 3339 timestamps as [`Value::DateTime`].
///
/// # Example
///
/// ```
/// use datagrid_data::model::Value;
///
/// let name = Value::from("Alice");
/// let age = Value::from(42i64);
/// let active = Value::from(true);
/// let empty = Value::Null;
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Null/empty value.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// 64-bit integer.
    Int(i64),
    /// 64-bit floating point.
    Float(f64),
    /// Calendar date.
    Date(NaiveDate),
    /// Date and time in UTC.
    DateTime(DateTime<Utc>),
    /// String value.
    String(String),
    /// List of values.
    List(Vec<Value>),
    /// Fallback for structured JSON (objects).
    Json(serde_json::Value),
}

impl Value {
    /// Returns `true` if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns `true` for null, blank strings and empty lists.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Json(json) => json.is_null(),
            _ => false,
        }
    }

    /// Returns the string slice if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the boolean if this is a bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the numeric value of ints and floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the calendar date of dates, timestamps and ISO date strings.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            Value::DateTime(dt) => Some(dt.date_naive()),
            Value::String(s) => parse_date(s),
            _ => None,
        }
    }

    /// Total ordering used for sorting.
    ///
    /// Values of different kinds order by kind (null first). Numbers compare
    /// numerically across int/float; strings compare case-insensitively and
    /// fall back to byte order to stay total.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (a, b) if a.is_number() && b.is_number() => {
                let (a, b) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
                a.total_cmp(&b)
            }
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
            (Value::Date(a), Value::DateTime(b)) => a.cmp(&b.date_naive()),
            (Value::DateTime(a), Value::Date(b)) => a.date_naive().cmp(b),
            (Value::String(a), Value::String(b)) => a
                .to_lowercase()
                .cmp(&b.to_lowercase())
                .then_with(|| a.cmp(b)),
            (Value::List(a), Value::List(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    let ord = x.compare(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (a, b) if a.kind_rank() == b.kind_rank() => a
                .display_text(DISPLAY_MAX)
                .cmp(&b.display_text(DISPLAY_MAX)),
            (a, b) => a.kind_rank().cmp(&b.kind_rank()),
        }
    }

    fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    fn kind_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Float(_) => 2,
            Value::Date(_) | Value::DateTime(_) => 3,
            Value::String(_) => 4,
            Value::List(_) => 5,
            Value::Json(_) => 6,
        }
    }

    /// Renders the value as display text truncated to `max` characters.
    ///
    /// Null renders as `—`, booleans as `Yes`/`No`, lists are joined with
    /// `, ` and JSON objects prefer their `label`, `name` or `title` key.
    pub fn display_text(&self, max: usize) -> String {
        let text = match self {
            Value::Null => return EMPTY_DISPLAY.to_string(),
            Value::Bool(true) => "Yes".to_string(),
            Value::Bool(false) => "No".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::DateTime(dt) => dt.to_rfc3339(),
            Value::String(s) => s.clone(),
            Value::List(items) => items
                .iter()
                .map(|v| v.display_text(max))
                .collect::<Vec<_>>()
                .join(", "),
            Value::Json(json) => json_display(json),
        };
        truncate(&text, max)
    }

    /// Case-insensitive substring match against the display text.
    pub fn contains_text(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        if self.is_null() {
            return false;
        }
        self.display_text(usize::MAX)
            .to_lowercase()
            .contains(&needle.to_lowercase())
    }

    /// Loose equality against a string form, used by select filters and
    /// option lookups.
    pub fn matches_str(&self, other: &str) -> bool {
        match self {
            Value::Null => other.is_empty(),
            Value::String(s) => s == other,
            Value::List(items) => items.iter().any(|v| v.matches_str(other)),
            v => v.display_text(usize::MAX) == other,
        }
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().or_else(|| {
        DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc).date_naive())
    })
}

fn json_display(json: &serde_json::Value) -> String {
    match json {
        serde_json::Value::Null => EMPTY_DISPLAY.to_string(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Object(map) => ["label", "name", "title"]
            .iter()
            .find_map(|key| map.get(*key).and_then(|v| v.as_str()))
            .map(str::to_string)
            .unwrap_or_else(|| json.to_string()),
        other => other.to_string(),
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        text.chars().take(max).collect()
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_text(DISPLAY_MAX))
    }
}

// =============================================================================
// From implementations
// =============================================================================

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::DateTime(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Value::Int)
                .or_else(|| n.as_f64().map(Value::Float))
                .unwrap_or(Value::Null),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            object @ serde_json::Value::Object(_) => Value::Json(object),
        }
    }
}
