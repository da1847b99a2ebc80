use datagrid_data::FieldValues;
use serde::de::DeserializeOwned;
use thiserror::Error;

use super::result::ValidationResult;

/// Validates form values.
pub trait Schema: Send + Sync {
    fn validate(&self, values: &FieldValues) -> ValidationResult;

    /// Message for a single field, if it fails.
    fn validate_field(&self, field: &str, values: &FieldValues) -> Option<String> {
        self.validate(values).error_for(field).map(str::to_string)
    }
}

impl<F> Schema for F
where
    F: Fn(&FieldValues) -> ValidationResult + Send + Sync,
{
    fn validate(&self, values: &FieldValues) -> ValidationResult {
        self(values)
    }
}

/// Schema with no rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl Schema for AcceptAll {
    fn validate(&self, _values: &FieldValues) -> ValidationResult {
        ValidationResult::Valid
    }
}

/// Failure to turn form values into a typed value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("{} field(s) failed validation", .0.errors().len())]
    Invalid(ValidationResult),

    #[error("Values do not fit the target type: {0}")]
    Shape(String),
}

/// Validate `values` and deserialize them into a typed value.
pub fn parse_values<T: DeserializeOwned>(
    schema: &dyn Schema,
    values: &FieldValues,
) -> Result<T, ParseError> {
    let result = schema.validate(values);
    if result.is_invalid() {
        return Err(ParseError::Invalid(result));
    }
    let json = serde_json::to_value(values).map_err(|e| ParseError::Shape(e.to_string()))?;
    serde_json::from_value(json).map_err(|e| ParseError::Shape(e.to_string()))
}
