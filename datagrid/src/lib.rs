//! Headless, editable data grid engine.
//!
//! The grid keeps rows, sorting, filtering, pagination, column layout,
//! row windowing and a single edit session, and talks to a backend through
//! [`DataSource`](datagrid_data::DataSource) or plain persistence callbacks.
//! Renderers read descriptors from [`DataGrid`](grid::DataGrid) and forward
//! user input back to it.

pub mod actions;
pub mod adapter;
pub mod column;
pub mod config;
pub mod confirm;
pub mod edit;
pub mod error;
pub mod form;
pub mod grid;
pub mod layout;
pub mod prefs;
pub mod resource;
pub mod table;
pub mod timing;
pub mod validation;
pub mod window;

pub use datagrid_data as data;
pub use error::GridError;
pub use grid::{DataGrid, DataGridBuilder};

pub mod prelude {
    pub use crate::actions::{ActionButton, ActionColumn, ActionPresentation, RowAction};
    pub use crate::adapter::{CrudAdapter, FnPersistence, InvalidateOnSuccess, Persistence};
    pub use crate::column::{
        ColSpan, Column, ColumnSizing, EditorKind, EditorSpec, FilterSpec, SelectOption,
    };
    pub use crate::config::{GridConfig, PaginationConfig};
    pub use crate::confirm::{ConfirmDialog, ConfirmOptions};
    pub use crate::edit::{EditContainerKind, EditMode, EditState, EditSurface};
    pub use crate::error::GridError;
    pub use crate::form::{Control, ControlInput, Form, FormLayout, SubmitOutcome};
    pub use crate::grid::{DataGrid, DataGridBuilder, DeleteOutcome, GridStatus, GridWindow};
    pub use crate::layout::ColumnLayout;
    pub use crate::prefs::{MemoryPrefsStore, PrefsStore};
    pub use crate::resource::{Resource, ResourceState};
    pub use crate::table::{FilterValue, PageSummary, SortDirection, SortEntry};
    pub use crate::validation::{RuleSchema, Schema, ValidationResult};

    pub use datagrid_data::{
        DataSource, FieldAccess, FieldValues, Identity, MemorySource, Record, RowId,
        SourceError, SourceOp, Value,
    };
}
