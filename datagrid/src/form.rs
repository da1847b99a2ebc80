//! Schema-driven edit form.
//!
//! Columns with an editor become form fields. [`Form`] holds the values,
//! touched set and errors of one edit session and runs the submit protocol;
//! [`FormSections`] and [`ControlProps`] describe what to draw.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::NaiveDate;
use datagrid_data::model::DISPLAY_MAX;
use datagrid_data::{FieldValues, SourceError, Value};
use serde::{Deserialize, Serialize};

use crate::column::{ACTIONS_COLUMN_ID, ColSpan, Column, EditorKind, FieldLayout, ParseFn, SelectOption};
use crate::edit::EditMode;
use crate::validation::{Schema, ValidationResult};

/// Order of fields without an explicit order hint.
pub const DEFAULT_ORDER: i32 = 999;

/// Message shown when a save fails without a server message.
pub const SAVE_FAILED: &str = "Save failed. Please check the fields and try again.";

// =============================================================================
// Fields and layout
// =============================================================================

/// Form grid settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormLayout {
    /// Grid columns, 1 to 4.
    pub columns: u8,
    pub gap: String,
    pub class: Option<String>,
}

impl Default for FormLayout {
    fn default() -> Self {
        Self {
            columns: 2,
            gap: "gap-4".to_string(),
            class: None,
        }
    }
}

impl FormLayout {
    pub fn columns(columns: u8) -> Self {
        Self {
            columns: columns.clamp(1, 4),
            ..Default::default()
        }
    }
}

/// A field of the edit form, derived from a column's editor.
#[derive(Clone)]
pub struct FormField {
    pub key: String,
    pub label: String,
    pub description: Option<String>,
    pub required: bool,
    pub kind: EditorKind,
    pub options: Vec<SelectOption>,
    pub props: BTreeMap<String, String>,
    pub layout: FieldLayout,
    parse: Option<ParseFn>,
}

impl FormField {
    pub fn order(&self) -> i32 {
        self.layout.order.unwrap_or(DEFAULT_ORDER)
    }

    pub fn is_full_width(&self) -> bool {
        self.layout.col_span == Some(ColSpan::Full)
    }
}

impl std::fmt::Debug for FormField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormField")
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("order", &self.order())
            .finish_non_exhaustive()
    }
}

/// Editable fields of `columns`, stably sorted by their order hint.
pub fn form_fields<R>(columns: &[Column<R>]) -> Vec<FormField> {
    let mut fields: Vec<FormField> = columns
        .iter()
        .filter(|c| c.id != ACTIONS_COLUMN_ID && c.in_form())
        .filter_map(|c| {
            let editor = c.editor.as_ref()?;
            Some(FormField {
                key: c.id.clone(),
                label: c.display_label().to_string(),
                description: c.description.clone(),
                required: editor.required,
                kind: editor.kind,
                options: editor.options.clone(),
                props: editor.props.clone(),
                layout: editor.layout.clone(),
                parse: editor.parse.clone(),
            })
        })
        .collect();
    fields.sort_by_key(FormField::order);
    fields
}

/// Position of a field in the rendered form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSlot {
    pub key: String,
    /// Grid tracks spanned; 0 outside the grid.
    pub span: u8,
    pub class: Option<String>,
}

/// Fields grouped the way the form draws them: the grid, then full-width
/// fields stacked, then switches in one row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormSections {
    pub columns: u8,
    pub grid: Vec<FieldSlot>,
    pub full_width: Vec<FieldSlot>,
    pub switches: Vec<FieldSlot>,
}

pub fn partition(fields: &[FormField], layout: &FormLayout) -> FormSections {
    let columns = layout.columns.clamp(1, 4);
    let mut sections = FormSections {
        columns,
        ..Default::default()
    };
    for field in fields {
        let slot = |span: u8| FieldSlot {
            key: field.key.clone(),
            span,
            class: field.layout.class.clone(),
        };
        if field.kind == EditorKind::Switch {
            sections.switches.push(slot(0));
        } else if field.is_full_width() {
            sections.full_width.push(slot(0));
        } else {
            let span = field.layout.col_span.map_or(1, |s| s.tracks(columns));
            sections.grid.push(slot(span));
        }
    }
    sections
}

/// Initial form values: empty for create, read through each column's
/// accessor and `format` transform for edit.
pub fn initial_values<R>(mode: EditMode, row: Option<&R>, columns: &[Column<R>]) -> FieldValues {
    let mut values = FieldValues::new();
    let (EditMode::Edit, Some(row)) = (mode, row) else {
        return values;
    };
    for column in columns.iter().filter(|c| c.id != ACTIONS_COLUMN_ID) {
        let raw = column.value(row);
        let value = match column.editor.as_ref().and_then(|e| e.format.as_ref()) {
            Some(format) => format(&raw, row),
            None => raw,
        };
        values.insert(column.id.clone(), value);
    }
    values
}

/// A labelled read-only value, for detail panels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailField {
    pub key: String,
    pub label: String,
    pub text: String,
}

/// Read-only rendering of a row's form fields, or of every column with
/// `all`.
pub fn detail_fields<R>(columns: &[Column<R>], row: &R, all: bool) -> Vec<DetailField> {
    columns
        .iter()
        .filter(|c| c.id != ACTIONS_COLUMN_ID && (all || c.in_form()))
        .map(|c| {
            let raw = c.value(row);
            let text = match c.editor.as_ref() {
                Some(editor) => match &editor.format {
                    Some(format) => format(&raw, row).display_text(DISPLAY_MAX),
                    None => editor
                        .option_label(&raw)
                        .map(str::to_string)
                        .unwrap_or_else(|| raw.display_text(DISPLAY_MAX)),
                },
                None => raw.display_text(DISPLAY_MAX),
            };
            DetailField {
                key: c.id.clone(),
                label: c.display_label().to_string(),
                text,
            }
        })
        .collect()
}

// =============================================================================
// Controls
// =============================================================================

/// Concrete control for a field, chosen by editor kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    Text { value: String },
    TextArea { value: String },
    Number { value: Option<f64> },
    Select { value: String, options: Vec<SelectOption> },
    Switch { checked: bool },
    /// ISO date, empty when unset.
    Date { value: String },
}

/// Raw input coming back from a control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlInput {
    Text(String),
    Checked(bool),
}

impl EditorKind {
    /// Bind a value to this kind's control.
    pub fn control(&self, value: &Value, options: &[SelectOption]) -> Control {
        let text = || match value {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        match self {
            Self::Text => Control::Text { value: text() },
            Self::TextArea => Control::TextArea { value: text() },
            Self::Number => Control::Number {
                value: value
                    .as_f64()
                    .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok())),
            },
            Self::Select => Control::Select {
                value: text(),
                options: options.to_vec(),
            },
            Self::Switch => Control::Switch {
                checked: value.as_bool().unwrap_or(false),
            },
            Self::Date => Control::Date {
                value: value
                    .as_date()
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
            },
        }
    }

    /// Turn control input into a form value.
    pub fn coerce(&self, input: ControlInput) -> Value {
        match (self, input) {
            (_, ControlInput::Checked(checked)) => Value::Bool(checked),
            (Self::Switch, ControlInput::Text(s)) => Value::Bool(s == "true"),
            (Self::Number, ControlInput::Text(s)) => parse_number(&s),
            (Self::Date, ControlInput::Text(s)) => {
                let s = s.trim();
                if s.is_empty() {
                    Value::Null
                } else {
                    NaiveDate::parse_from_str(s, "%Y-%m-%d")
                        .map(Value::Date)
                        .unwrap_or_else(|_| Value::String(s.to_string()))
                }
            }
            (_, ControlInput::Text(s)) => Value::String(s),
        }
    }
}

fn parse_number(raw: &str) -> Value {
    let raw = raw.trim();
    if raw.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Int(i);
    }
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() => Value::Float(f),
        _ => Value::Null,
    }
}

/// Everything a renderer needs to draw one field.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlProps {
    pub id: String,
    pub key: String,
    pub label: String,
    pub required: bool,
    pub description: Option<String>,
    pub error: Option<String>,
    pub disabled: bool,
    pub props: BTreeMap<String, String>,
    pub control: Control,
}

// =============================================================================
// Form state
// =============================================================================

/// Result of a submit attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome<T> {
    /// Persisted; the session can close.
    Saved(T),
    /// The schema rejected the values; nothing was sent.
    Invalid(ValidationResult),
    /// Persistence failed with this message; the session stays open.
    Failed(String),
    /// A submit is already running.
    Busy,
}

impl<T> SubmitOutcome<T> {
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved(_))
    }
}

struct FormInner {
    mode: EditMode,
    fields: Vec<FormField>,
    values: FieldValues,
    touched: BTreeSet<String>,
    errors: BTreeMap<String, String>,
    server_error: Option<String>,
    submitting: bool,
    submitted: bool,
}

/// State of the edit form for one session.
///
/// Cheap to clone; clones share state, so a submit can be awaited while the
/// renderer keeps reading the submitting flag.
#[derive(Clone)]
pub struct Form {
    inner: Arc<RwLock<FormInner>>,
    schema: Arc<dyn Schema>,
    dirty: Arc<AtomicBool>,
}

impl Form {
    pub fn new(mode: EditMode, fields: Vec<FormField>, values: FieldValues, schema: Arc<dyn Schema>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(FormInner {
                mode,
                fields,
                values,
                touched: BTreeSet::new(),
                errors: BTreeMap::new(),
                server_error: None,
                submitting: false,
                submitted: false,
            })),
            schema,
            dirty: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Build the form for a session over `columns`.
    pub fn for_session<R>(mode: EditMode, row: Option<&R>, columns: &[Column<R>], schema: Arc<dyn Schema>) -> Self {
        Self::new(mode, form_fields(columns), initial_values(mode, row, columns), schema)
    }

    fn read(&self) -> RwLockReadGuard<'_, FormInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, FormInner> {
        self.dirty.store(true, Ordering::SeqCst);
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    // -------------------------------------------------------------------------
    // Read
    // -------------------------------------------------------------------------

    pub fn mode(&self) -> EditMode {
        self.read().mode
    }

    pub fn title(&self) -> &'static str {
        self.mode().title()
    }

    pub fn fields(&self) -> Vec<FormField> {
        self.read().fields.clone()
    }

    pub fn values(&self) -> FieldValues {
        self.read().values.clone()
    }

    pub fn value(&self, key: &str) -> Value {
        self.read().values.get(key).cloned().unwrap_or_default()
    }

    pub fn error(&self, key: &str) -> Option<String> {
        self.read().errors.get(key).cloned()
    }

    pub fn errors(&self) -> BTreeMap<String, String> {
        self.read().errors.clone()
    }

    pub fn server_error(&self) -> Option<String> {
        self.read().server_error.clone()
    }

    pub fn is_touched(&self, key: &str) -> bool {
        self.read().touched.contains(key)
    }

    pub fn is_submitting(&self) -> bool {
        self.read().submitting
    }

    /// Cancel is blocked while a submit is in flight.
    pub fn can_cancel(&self) -> bool {
        !self.is_submitting()
    }

    pub fn sections(&self, layout: &FormLayout) -> FormSections {
        partition(&self.read().fields, layout)
    }

    /// Control descriptors for every field, in form order.
    pub fn controls(&self) -> Vec<ControlProps> {
        let inner = self.read();
        inner
            .fields
            .iter()
            .map(|field| {
                let value = inner.values.get(&field.key).cloned().unwrap_or_default();
                ControlProps {
                    id: format!("field-{}", field.key),
                    key: field.key.clone(),
                    label: field.label.clone(),
                    required: field.required,
                    description: field.description.clone(),
                    error: inner.errors.get(&field.key).cloned(),
                    disabled: inner.submitting,
                    props: field.props.clone(),
                    control: field.kind.control(&value, &field.options),
                }
            })
            .collect()
    }

    /// Whether both handles belong to the same form.
    pub fn same_form(&self, other: &Form) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    pub fn clear_dirty(&self) {
        self.dirty.store(false, Ordering::SeqCst);
    }

    // -------------------------------------------------------------------------
    // Write
    // -------------------------------------------------------------------------

    /// Set a value. Once the field was blurred or a submit was attempted,
    /// the field is revalidated on every change.
    pub fn set_value(&self, key: &str, value: Value) {
        let mut inner = self.write();
        inner.values.insert(key.to_string(), value);
        if inner.submitted || inner.touched.contains(key) {
            self.revalidate_field(&mut inner, key);
        }
    }

    /// Apply raw control input to a field.
    pub fn input(&self, key: &str, input: ControlInput) {
        let kind = self
            .read()
            .fields
            .iter()
            .find(|f| f.key == key)
            .map(|f| f.kind)
            .unwrap_or(EditorKind::Text);
        self.set_value(key, kind.coerce(input));
    }

    /// Mark a field touched and validate it.
    pub fn blur(&self, key: &str) {
        let mut inner = self.write();
        inner.touched.insert(key.to_string());
        self.revalidate_field(&mut inner, key);
    }

    /// Validate every field and record the errors.
    pub fn validate(&self) -> ValidationResult {
        let mut inner = self.write();
        let result = self.schema.validate(&inner.values);
        inner.errors = result.by_field();
        result
    }

    fn revalidate_field(&self, inner: &mut FormInner, key: &str) {
        match self.schema.validate_field(key, &inner.values) {
            Some(msg) => {
                inner.errors.insert(key.to_string(), msg);
            }
            None => {
                inner.errors.remove(key);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Submit
    // -------------------------------------------------------------------------

    /// Validate, apply `parse` transforms and await `persist`.
    ///
    /// A second call while one is in flight returns [`SubmitOutcome::Busy`]
    /// without doing anything.
    pub async fn submit<T, F, Fut>(&self, persist: F) -> SubmitOutcome<T>
    where
        F: FnOnce(FieldValues) -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let values = match self.begin_submit() {
            Ok(values) => values,
            Err(outcome) => return outcome,
        };
        let result = persist(values).await;
        self.finish_submit(result)
    }

    fn begin_submit<T>(&self) -> Result<FieldValues, SubmitOutcome<T>> {
        let mut inner = self.write();
        if inner.submitting {
            log::debug!("Submit ignored: already submitting");
            return Err(SubmitOutcome::Busy);
        }
        inner.submitted = true;

        let result = self.schema.validate(&inner.values);
        inner.errors = result.by_field();
        if result.is_invalid() {
            log::debug!("Submit blocked by {} validation error(s)", result.errors().len());
            return Err(SubmitOutcome::Invalid(result));
        }

        let mut out = inner.values.clone();
        for field in &inner.fields {
            if let Some(parse) = &field.parse {
                let raw = inner.values.get(&field.key).cloned().unwrap_or_default();
                out.insert(field.key.clone(), parse(&raw, &inner.values));
            }
        }
        inner.submitting = true;
        Ok(out)
    }

    fn finish_submit<T>(&self, result: Result<T, SourceError>) -> SubmitOutcome<T> {
        let mut inner = self.write();
        inner.submitting = false;
        match result {
            Ok(saved) => {
                inner.server_error = None;
                SubmitOutcome::Saved(saved)
            }
            Err(e) => {
                let message = e.message_or(SAVE_FAILED);
                log::warn!("Save failed: {}", e);
                inner.server_error = Some(message.clone());
                SubmitOutcome::Failed(message)
            }
        }
    }
}

impl std::fmt::Debug for Form {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.read();
        f.debug_struct("Form")
            .field("mode", &inner.mode)
            .field("values", &inner.values)
            .field("errors", &inner.errors)
            .field("submitting", &inner.submitting)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_input_coercion() {
        assert_eq!(EditorKind::Number.coerce(ControlInput::Text("".into())), Value::Null);
        assert_eq!(EditorKind::Number.coerce(ControlInput::Text("42".into())), Value::Int(42));
        assert_eq!(EditorKind::Number.coerce(ControlInput::Text("1.5".into())), Value::Float(1.5));
        assert_eq!(EditorKind::Number.coerce(ControlInput::Text("abc".into())), Value::Null);
    }

    #[test]
    fn date_input_coercion() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            EditorKind::Date.coerce(ControlInput::Text("2024-03-09".into())),
            Value::Date(date)
        );
        assert_eq!(
            EditorKind::Date.control(&Value::Date(date), &[]),
            Control::Date { value: "2024-03-09".into() }
        );
    }
}
