//! Column descriptors.
//!
//! A [`Column`] tells the grid how to read a cell from a row, how wide the
//! column may be, whether it can be filtered or sorted, and whether (and how)
//! it appears in the edit form.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use datagrid_data::model::DISPLAY_MAX;
use datagrid_data::{FieldAccess, FieldValues, Value};
use serde::{Deserialize, Serialize};

/// Id of the synthetic trailing actions column.
pub const ACTIONS_COLUMN_ID: &str = "__actions__";

/// Reads a cell value from a row.
pub type Accessor<R> = Arc<dyn Fn(&R) -> Value + Send + Sync>;

/// Re-derives a submitted value from the raw form value and all form values.
pub type ParseFn = Arc<dyn Fn(&Value, &FieldValues) -> Value + Send + Sync>;

/// Turns a row value into the form's initial value.
pub type FormatFn<R> = Arc<dyn Fn(&Value, &R) -> Value + Send + Sync>;

// =============================================================================
// Sizing
// =============================================================================

/// Width bounds of a column in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSizing {
    pub min: u32,
    pub size: u32,
    pub max: u32,
}

impl Default for ColumnSizing {
    fn default() -> Self {
        Self {
            min: 40,
            size: 150,
            max: 1000,
        }
    }
}

impl ColumnSizing {
    /// Clamp a width into `[min, max]`.
    pub fn clamp(&self, width: u32) -> u32 {
        width.clamp(self.min, self.max.max(self.min))
    }
}

// =============================================================================
// Filters
// =============================================================================

/// Default debounce for text filters.
pub const TEXT_FILTER_DEBOUNCE: Duration = Duration::from_millis(250);

/// An option in a select filter or select editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Labels of the tri-state boolean filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BooleanLabels {
    pub any: String,
    pub yes: String,
    pub no: String,
}

impl Default for BooleanLabels {
    fn default() -> Self {
        Self {
            any: "Any".to_string(),
            yes: "Yes".to_string(),
            no: "No".to_string(),
        }
    }
}

/// How a column can be filtered from its header.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterSpec {
    Text {
        placeholder: Option<String>,
        debounce: Duration,
    },
    Select {
        placeholder: Option<String>,
        options: Vec<SelectOption>,
        multi: bool,
    },
    Boolean {
        labels: BooleanLabels,
    },
    DateRange {
        from_placeholder: Option<String>,
        to_placeholder: Option<String>,
    },
}

impl FilterSpec {
    pub fn text() -> Self {
        Self::Text {
            placeholder: None,
            debounce: TEXT_FILTER_DEBOUNCE,
        }
    }

    pub fn select(options: Vec<SelectOption>) -> Self {
        Self::Select {
            placeholder: None,
            options,
            multi: false,
        }
    }

    pub fn multi_select(options: Vec<SelectOption>) -> Self {
        Self::Select {
            placeholder: None,
            options,
            multi: true,
        }
    }

    pub fn boolean() -> Self {
        Self::Boolean {
            labels: BooleanLabels::default(),
        }
    }

    pub fn date_range() -> Self {
        Self::DateRange {
            from_placeholder: None,
            to_placeholder: None,
        }
    }

    /// Override the debounce of a text filter. No effect on other kinds.
    pub fn debounce(mut self, delay: Duration) -> Self {
        if let Self::Text { debounce, .. } = &mut self {
            *debounce = delay;
        }
        self
    }

    pub fn placeholder(mut self, text: impl Into<String>) -> Self {
        match &mut self {
            Self::Text { placeholder, .. } | Self::Select { placeholder, .. } => {
                *placeholder = Some(text.into());
            }
            Self::DateRange {
                from_placeholder, ..
            } => *from_placeholder = Some(text.into()),
            Self::Boolean { .. } => {}
        }
        self
    }

    /// Debounce applied to typed input, `None` for filters applied at once.
    pub fn input_debounce(&self) -> Option<Duration> {
        match self {
            Self::Text { debounce, .. } => Some(*debounce),
            _ => None,
        }
    }
}

// =============================================================================
// Editors
// =============================================================================

/// Kind of form control used to edit a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorKind {
    Text,
    Number,
    Select,
    Switch,
    Date,
    TextArea,
}

/// Column span of a field inside the form grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColSpan {
    One,
    Two,
    Three,
    Four,
    /// Stacked outside the grid at full width.
    Full,
}

impl ColSpan {
    /// Span in grid tracks, capped at the grid's column count.
    pub fn tracks(&self, columns: u8) -> u8 {
        let span = match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
            Self::Four | Self::Full => 4,
        };
        span.min(columns.max(1))
    }
}

/// Placement hints for a field in the form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldLayout {
    pub col_span: Option<ColSpan>,
    pub order: Option<i32>,
    pub class: Option<String>,
}

/// Describes how a column is edited in the form.
pub struct EditorSpec<R> {
    pub kind: EditorKind,
    pub required: bool,
    pub visible_in_form: bool,
    pub options: Vec<SelectOption>,
    pub props: BTreeMap<String, String>,
    pub layout: FieldLayout,
    pub parse: Option<ParseFn>,
    pub format: Option<FormatFn<R>>,
}

impl<R> EditorSpec<R> {
    pub fn new(kind: EditorKind) -> Self {
        Self {
            kind,
            required: false,
            visible_in_form: true,
            options: Vec::new(),
            props: BTreeMap::new(),
            layout: FieldLayout::default(),
            parse: None,
            format: None,
        }
    }

    pub fn text() -> Self {
        Self::new(EditorKind::Text)
    }

    pub fn number() -> Self {
        Self::new(EditorKind::Number)
    }

    pub fn select(options: Vec<SelectOption>) -> Self {
        Self::new(EditorKind::Select).options(options)
    }

    pub fn switch() -> Self {
        Self::new(EditorKind::Switch)
    }

    pub fn date() -> Self {
        Self::new(EditorKind::Date)
    }

    pub fn textarea() -> Self {
        Self::new(EditorKind::TextArea)
    }

    /// Mark the field as required (shown next to the label).
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Keep the editor metadata but leave the field out of the form.
    pub fn hidden_in_form(mut self) -> Self {
        self.visible_in_form = false;
        self
    }

    pub fn options(mut self, options: Vec<SelectOption>) -> Self {
        self.options = options;
        self
    }

    /// Extra props passed through to the control.
    pub fn prop(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    pub fn span(mut self, span: ColSpan) -> Self {
        self.layout.col_span = Some(span);
        self
    }

    pub fn order(mut self, order: i32) -> Self {
        self.layout.order = Some(order);
        self
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.layout.class = Some(class.into());
        self
    }

    pub fn parse<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &FieldValues) -> Value + Send + Sync + 'static,
    {
        self.parse = Some(Arc::new(f));
        self
    }

    pub fn format<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &R) -> Value + Send + Sync + 'static,
    {
        self.format = Some(Arc::new(f));
        self
    }

    /// Label of the option whose value matches, for select editors.
    pub fn option_label(&self, value: &Value) -> Option<&str> {
        if self.kind != EditorKind::Select {
            return None;
        }
        self.options
            .iter()
            .find(|o| value.matches_str(&o.value))
            .map(|o| o.label.as_str())
    }
}

impl<R> Clone for EditorSpec<R> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            required: self.required,
            visible_in_form: self.visible_in_form,
            options: self.options.clone(),
            props: self.props.clone(),
            layout: self.layout.clone(),
            parse: self.parse.clone(),
            format: self.format.clone(),
        }
    }
}

impl<R> std::fmt::Debug for EditorSpec<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSpec")
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("visible_in_form", &self.visible_in_form)
            .field("options", &self.options)
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Column
// =============================================================================

/// A column of the grid.
///
/// # Example
///
/// ```ignore
/// let name = Column::<Record>::field("name", "Name")
///     .filter(FilterSpec::text())
///     .editor(EditorSpec::text().required());
///
/// let initials = Column::new("initials", "Initials", |user: &User| {
///     Value::from(user.initials())
/// });
/// ```
pub struct Column<R> {
    pub id: String,
    pub header: String,
    pub label: Option<String>,
    pub description: Option<String>,
    accessor: Accessor<R>,
    pub sizing: ColumnSizing,
    pub sortable: bool,
    pub resizable: bool,
    pub hide_on_mobile: bool,
    pub tooltip: bool,
    pub header_class: Option<String>,
    pub cell_class: Option<String>,
    pub filter: Option<FilterSpec>,
    pub editor: Option<EditorSpec<R>>,
}

impl<R> Column<R> {
    /// Column reading its value through a closure.
    pub fn new<F>(id: impl Into<String>, header: impl Into<String>, accessor: F) -> Self
    where
        F: Fn(&R) -> Value + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            header: header.into(),
            label: None,
            description: None,
            accessor: Arc::new(accessor),
            sizing: ColumnSizing::default(),
            sortable: true,
            resizable: true,
            hide_on_mobile: false,
            tooltip: false,
            header_class: None,
            cell_class: None,
            filter: None,
            editor: None,
        }
    }

    pub fn size(mut self, px: u32) -> Self {
        self.sizing.size = px;
        self
    }

    pub fn min_size(mut self, px: u32) -> Self {
        self.sizing.min = px;
        self
    }

    pub fn max_size(mut self, px: u32) -> Self {
        self.sizing.max = px;
        self
    }

    pub fn sortable(mut self, sortable: bool) -> Self {
        self.sortable = sortable;
        self
    }

    pub fn resizable(mut self, resizable: bool) -> Self {
        self.resizable = resizable;
        self
    }

    pub fn hide_on_mobile(mut self) -> Self {
        self.hide_on_mobile = true;
        self
    }

    /// Show the full cell text in a tooltip on hover.
    pub fn tooltip(mut self) -> Self {
        self.tooltip = true;
        self
    }

    /// Form label, when it differs from the header.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn header_class(mut self, class: impl Into<String>) -> Self {
        self.header_class = Some(class.into());
        self
    }

    pub fn cell_class(mut self, class: impl Into<String>) -> Self {
        self.cell_class = Some(class.into());
        self
    }

    pub fn filter(mut self, filter: FilterSpec) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn editor(mut self, editor: EditorSpec<R>) -> Self {
        self.editor = Some(editor);
        self
    }

    /// Read this column's value from a row.
    pub fn value(&self, row: &R) -> Value {
        (self.accessor)(row)
    }

    /// Label used by the form: explicit label, then header, then id.
    pub fn display_label(&self) -> &str {
        match &self.label {
            Some(label) => label,
            None if !self.header.is_empty() => &self.header,
            None => &self.id,
        }
    }

    /// Whether the column contributes a field to the edit form.
    pub fn in_form(&self) -> bool {
        self.editor.as_ref().is_some_and(|e| e.visible_in_form)
    }

    /// Text rendered in the cell. Select editors show the option label.
    pub fn cell_text(&self, row: &R) -> String {
        let value = self.value(row);
        if let Some(label) = self.editor.as_ref().and_then(|e| e.option_label(&value)) {
            return label.to_string();
        }
        value.display_text(DISPLAY_MAX)
    }
}

impl<R: FieldAccess + 'static> Column<R> {
    /// Column reading the field with the same name as its id.
    /// Dotted ids read nested fields.
    pub fn field(id: impl Into<String>, header: impl Into<String>) -> Self {
        let id = id.into();
        let path = id.clone();
        Self::new(id, header, move |row: &R| row.field(&path))
    }
}

impl<R> Clone for Column<R> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            header: self.header.clone(),
            label: self.label.clone(),
            description: self.description.clone(),
            accessor: Arc::clone(&self.accessor),
            sizing: self.sizing,
            sortable: self.sortable,
            resizable: self.resizable,
            hide_on_mobile: self.hide_on_mobile,
            tooltip: self.tooltip,
            header_class: self.header_class.clone(),
            cell_class: self.cell_class.clone(),
            filter: self.filter.clone(),
            editor: self.editor.clone(),
        }
    }
}

impl<R> std::fmt::Debug for Column<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Column")
            .field("id", &self.id)
            .field("header", &self.header)
            .field("sizing", &self.sizing)
            .field("filter", &self.filter)
            .field("editor", &self.editor)
            .finish_non_exhaustive()
    }
}
