//! Rule-based schema builder.

use datagrid_data::{FieldValues, Value};
use regex::Regex;

use super::result::{FieldError, ValidationResult};
use super::schema::Schema;

/// A rule over a field value and the whole form.
type Rule = Box<dyn Fn(&Value, &FieldValues) -> bool + Send + Sync>;

struct FieldRules {
    name: String,
    optional: bool,
    rules: Vec<(Rule, String)>,
}

/// Schema assembled from per-field rules.
///
/// Rules run in declaration order and each field reports its first failure.
pub struct RuleSchema {
    fields: Vec<FieldRules>,
}

impl RuleSchema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder { fields: Vec::new() }
    }

    /// Names of the fields this schema checks.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

impl Schema for RuleSchema {
    fn validate(&self, values: &FieldValues) -> ValidationResult {
        let mut errors = Vec::new();
        for field in &self.fields {
            let value = values.get(&field.name).cloned().unwrap_or_default();
            if field.optional && value.is_empty() {
                continue;
            }
            if let Some((_, msg)) = field.rules.iter().find(|(rule, _)| !rule(&value, values)) {
                errors.push(FieldError::new(&field.name, msg));
            }
        }
        ValidationResult::from_errors(errors)
    }
}

impl std::fmt::Debug for RuleSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.field_names()).finish()
    }
}

/// Builder collecting fields.
pub struct SchemaBuilder {
    fields: Vec<FieldRules>,
}

impl SchemaBuilder {
    /// Start rules for a field.
    pub fn field(self, name: impl Into<String>) -> FieldBuilder {
        FieldBuilder {
            builder: self,
            field: FieldRules {
                name: name.into(),
                optional: false,
                rules: Vec::new(),
            },
        }
    }

    pub fn build(self) -> RuleSchema {
        RuleSchema {
            fields: self.fields,
        }
    }
}

/// Builder for the rules of a single field.
pub struct FieldBuilder {
    builder: SchemaBuilder,
    field: FieldRules,
}

impl FieldBuilder {
    /// Add a custom rule over the field value.
    pub fn rule<F>(self, f: F, msg: impl Into<String>) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.rule_with(move |v, _| f(v), msg)
    }

    /// Add a custom rule that can see every form value.
    pub fn rule_with<F>(mut self, f: F, msg: impl Into<String>) -> Self
    where
        F: Fn(&Value, &FieldValues) -> bool + Send + Sync + 'static,
    {
        self.field.rules.push((Box::new(f), msg.into()));
        self
    }

    /// Skip all rules while the field is empty.
    pub fn optional(mut self) -> Self {
        self.field.optional = true;
        self
    }

    /// Continue to the next field.
    pub fn field(self, name: impl Into<String>) -> FieldBuilder {
        self.finalize().field(name)
    }

    pub fn build(self) -> RuleSchema {
        self.finalize().build()
    }

    fn finalize(self) -> SchemaBuilder {
        let mut builder = self.builder;
        builder.fields.push(self.field);
        builder
    }

    // -------------------------------------------------------------------------
    // Text rules
    // -------------------------------------------------------------------------

    /// Require a non-empty value. Whitespace-only strings count as empty.
    pub fn required(self, msg: impl Into<String>) -> Self {
        self.rule(|v| !v.is_empty(), msg)
    }

    /// Require at least `min` characters.
    pub fn min_length(self, min: usize, msg: impl Into<String>) -> Self {
        self.rule(move |v| text_len(v) >= min, msg)
    }

    /// Require at most `max` characters.
    pub fn max_length(self, max: usize, msg: impl Into<String>) -> Self {
        self.rule(move |v| text_len(v) <= max, msg)
    }

    /// Require the text to match `re`.
    pub fn pattern(self, re: Regex, msg: impl Into<String>) -> Self {
        self.rule(move |v| re.is_match(&text_of(v)), msg)
    }

    /// Require a valid email address. Empty passes; combine with
    /// [`required`](Self::required) to reject it.
    pub fn email(self, msg: impl Into<String>) -> Self {
        self.rule(
            |v| {
                let text = text_of(v);
                text.is_empty() || email_address::EmailAddress::is_valid(&text)
            },
            msg,
        )
    }

    /// Require the value to be one of `allowed`.
    pub fn one_of(self, allowed: Vec<String>, msg: impl Into<String>) -> Self {
        self.rule(move |v| allowed.iter().any(|a| v.matches_str(a)), msg)
    }

    /// Require the value to equal another field's value.
    pub fn equals_field(self, other: impl Into<String>, msg: impl Into<String>) -> Self {
        let other = other.into();
        self.rule_with(
            move |v, values| values.get(&other).unwrap_or(&Value::Null) == v,
            msg,
        )
    }

    // -------------------------------------------------------------------------
    // Number rules
    // -------------------------------------------------------------------------

    /// Require a number (or nothing).
    pub fn number(self, msg: impl Into<String>) -> Self {
        self.rule(|v| v.is_null() || v.as_f64().is_some(), msg)
    }

    pub fn integer(self, msg: impl Into<String>) -> Self {
        self.rule(
            |v| v.is_null() || v.as_f64().is_some_and(|n| n.fract() == 0.0),
            msg,
        )
    }

    pub fn min(self, min: f64, msg: impl Into<String>) -> Self {
        self.rule(move |v| v.as_f64().is_some_and(|n| n >= min), msg)
    }

    pub fn max(self, max: f64, msg: impl Into<String>) -> Self {
        self.rule(move |v| v.as_f64().is_some_and(|n| n <= max), msg)
    }

    // -------------------------------------------------------------------------
    // Boolean and date rules
    // -------------------------------------------------------------------------

    /// Require a switch to be on.
    pub fn checked(self, msg: impl Into<String>) -> Self {
        self.rule(|v| v.as_bool() == Some(true), msg)
    }

    /// Require a valid calendar date (or nothing).
    pub fn date(self, msg: impl Into<String>) -> Self {
        self.rule(|v| v.is_empty() || v.as_date().is_some(), msg)
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn text_len(value: &Value) -> usize {
    text_of(value).chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, Value)]) -> FieldValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn first_failing_rule_wins() {
        let schema = RuleSchema::builder()
            .field("name")
            .required("required")
            .min_length(2, "too short")
            .build();

        let result = schema.validate(&values(&[]));
        assert_eq!(result.error_for("name"), Some("required"));

        let result = schema.validate(&values(&[("name", Value::from("A"))]));
        assert_eq!(result.error_for("name"), Some("too short"));

        assert!(schema.validate(&values(&[("name", Value::from("Al"))])).is_valid());
    }

    #[test]
    fn optional_skips_empty() {
        let schema = RuleSchema::builder()
            .field("email")
            .optional()
            .email("bad email")
            .field("age")
            .optional()
            .min(18.0, "too young")
            .build();

        assert!(schema.validate(&values(&[])).is_valid());

        let result = schema.validate(&values(&[
            ("email", Value::from("nope")),
            ("age", Value::from(12)),
        ]));
        assert_eq!(result.errors().len(), 2);
    }
}
