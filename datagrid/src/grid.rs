//! The grid facade.
//!
//! [`DataGrid`] owns the row mirror and every piece of view state, and wires
//! the table, layout, window, editing and confirmation components together.
//! It is headless: renderers read descriptors from it and forward user input
//! back to it.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use datagrid_data::{Identity, RowId, SourceError, SourceOp};
use tokio::time::Instant;
use uuid::Uuid;

use crate::actions::{ActionButton, ActionColumn};
use crate::adapter::{CrudAdapter, Persistence};
use crate::column::{ACTIONS_COLUMN_ID, Column, FilterSpec};
use crate::config::GridConfig;
use crate::confirm::{ConfirmDialog, ConfirmOptions};
use crate::edit::{CancelReason, EditContainerKind, EditEvent, EditMachine, EditMode, EditState, EditSurface};
use crate::error::GridError;
use crate::form::{Form, SubmitOutcome};
use crate::layout::{ColumnLayout, LayoutColumn, ResizeDrag};
use crate::prefs::{NoopPrefsStore, PrefsState, PrefsStore};
use crate::table::{FilterValue, PageSummary, RowModel, SortDirection, SortEntry, TableState};
use crate::timing::{Debouncer, FrameThrottle};
use crate::validation::{AcceptAll, Schema};
use crate::window::{RowWindow, VirtualItem, WindowRange};

/// Message passed on when a delete fails without a server message.
pub const DELETE_FAILED: &str = "Delete failed";

/// Message shown in the banner when a load fails without a server message.
pub const LOAD_FAILED: &str = "Failed to load data";

/// Skeleton rows shown while the first load is in flight.
pub const SKELETON_ROWS: usize = 3;

// =============================================================================
// Identity and callbacks
// =============================================================================

/// Unique id of a grid instance, used to scope DOM ids such as the shared
/// tooltip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridId(Uuid);

impl GridId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for GridId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "dg-{}", self.0.simple())
    }
}

pub type RowCallback<R> = Arc<dyn Fn(&R, Option<&RowId>) + Send + Sync>;
pub type IdCallback = Arc<dyn Fn(&RowId) + Send + Sync>;
pub type Notify = Arc<dyn Fn() + Send + Sync>;
pub type ErrorSink = Arc<dyn Fn(&SourceError) + Send + Sync>;

struct Callbacks<R> {
    on_row_click: Option<RowCallback<R>>,
    on_toggle_expanded: Option<IdCallback>,
    on_edit_start: Option<IdCallback>,
    on_cancel_edit: Option<Notify>,
    on_error: Option<ErrorSink>,
}

impl<R> Default for Callbacks<R> {
    fn default() -> Self {
        Self {
            on_row_click: None,
            on_toggle_expanded: None,
            on_edit_start: None,
            on_cancel_edit: None,
            on_error: None,
        }
    }
}

// =============================================================================
// View descriptors
// =============================================================================

/// A header cell in display order.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderCell {
    pub id: String,
    pub label: String,
    pub width: u32,
    pub sortable: bool,
    pub sort: Option<SortDirection>,
    pub resizable: bool,
    /// Cells of this column show their full text in the shared tooltip.
    pub tooltip: bool,
    /// Narrow layouts may drop this column.
    pub hide_on_mobile: bool,
    pub filter: Option<FilterSpec>,
    pub filter_value: Option<FilterValue>,
    /// Text typed into a debounced filter that has not been applied yet.
    pub pending_filter: Option<String>,
}

/// A mounted body row.
#[derive(Debug, Clone)]
pub struct VisibleRow<R> {
    /// Position within the current page.
    pub index: usize,
    pub item: VirtualItem,
    pub id: Option<RowId>,
    pub row: R,
    /// Cell text per visible data column, in display order.
    pub cells: Vec<String>,
    /// Tooltip text per cell, set for columns with a tooltip.
    pub tooltips: Vec<Option<String>>,
    pub selected: bool,
    pub expanded: bool,
    pub editing: bool,
}

/// Mounted rows plus the spacer geometry around them.
#[derive(Debug, Clone)]
pub struct GridWindow<R> {
    pub range: WindowRange,
    pub rows: Vec<VisibleRow<R>>,
    /// An inline create row sits above the first body row.
    pub inline_create: bool,
}

/// Load-state banner.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorBanner {
    pub message: String,
    pub error: SourceError,
    pub can_retry: bool,
}

/// Overall display status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridStatus {
    /// Show the loading overlay.
    pub loading: bool,
    /// Skeleton rows to draw in place of data.
    pub skeleton_rows: usize,
    /// Show the "No data" state.
    pub empty: bool,
    pub show_add: bool,
    pub can_add: bool,
    pub total_rows: usize,
}

/// Result of a delete request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Declined,
    /// Reported to the error sink; carries the message for logs or toasts.
    Failed(String),
}

// =============================================================================
// Grid
// =============================================================================

struct GridInner<R> {
    columns: Vec<Column<R>>,
    rows: Vec<R>,
    table: TableState,
    prefs: PrefsState,
    window: RowWindow,
    container_width: u32,
    throttle: FrameThrottle<u32>,
    resize: Option<ResizeDrag>,
    filter_input: Debouncer<String, String>,
    edit: EditMachine<R>,
    form: Option<Form>,
    selected: Option<RowId>,
    expanded: BTreeSet<RowId>,
    detail_heights: BTreeMap<RowId, u32>,
    loading: bool,
    load_error: Option<SourceError>,
}

/// Builder for [`DataGrid`].
pub struct DataGridBuilder<R: Clone + Send + Sync + 'static> {
    columns: Vec<Column<R>>,
    identity: Identity<R>,
    config: GridConfig,
    schema: Arc<dyn Schema>,
    persistence: Option<Arc<dyn Persistence<R>>>,
    adapter: Option<CrudAdapter<R>>,
    prefs_store: Arc<dyn PrefsStore>,
    rows: Option<Vec<R>>,
    callbacks: Callbacks<R>,
}

impl<R: Clone + Send + Sync + 'static> DataGridBuilder<R> {
    pub fn config(mut self, config: GridConfig) -> Self {
        self.config = config;
        self
    }

    pub fn schema(mut self, schema: impl Schema + 'static) -> Self {
        self.schema = Arc::new(schema);
        self
    }

    /// Bind to a CRUD adapter: rows, load state and persistence all come
    /// from it.
    pub fn adapter(mut self, adapter: CrudAdapter<R>) -> Self {
        self.persistence = Some(Arc::new(adapter.clone()));
        self.adapter = Some(adapter);
        self
    }

    /// Persist through custom callbacks instead of an adapter.
    pub fn persistence(mut self, persistence: impl Persistence<R> + 'static) -> Self {
        self.persistence = Some(Arc::new(persistence));
        self
    }

    pub fn prefs_store(mut self, store: Arc<dyn PrefsStore>) -> Self {
        self.prefs_store = store;
        self
    }

    /// Initial rows.
    pub fn rows(mut self, rows: Vec<R>) -> Self {
        self.rows = Some(rows);
        self
    }

    pub fn on_row_click<F>(mut self, f: F) -> Self
    where
        F: Fn(&R, Option<&RowId>) + Send + Sync + 'static,
    {
        self.callbacks.on_row_click = Some(Arc::new(f));
        self
    }

    pub fn on_toggle_expanded<F>(mut self, f: F) -> Self
    where
        F: Fn(&RowId) + Send + Sync + 'static,
    {
        self.callbacks.on_toggle_expanded = Some(Arc::new(f));
        self
    }

    pub fn on_edit_start<F>(mut self, f: F) -> Self
    where
        F: Fn(&RowId) + Send + Sync + 'static,
    {
        self.callbacks.on_edit_start = Some(Arc::new(f));
        self
    }

    pub fn on_cancel_edit<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.callbacks.on_cancel_edit = Some(Arc::new(f));
        self
    }

    /// Sink for delete failures.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&SourceError) + Send + Sync + 'static,
    {
        self.callbacks.on_error = Some(Arc::new(f));
        self
    }

    pub fn build(self) -> Result<DataGrid<R>, GridError> {
        self.config.validate()?;
        let config = self.config;

        let declared: Vec<String> = self.columns.iter().map(|c| c.id.clone()).collect();
        let prefs = PrefsState::load(config.resolved_storage_key(), self.prefs_store, declared);

        let rows = match (self.rows, &self.adapter) {
            (Some(rows), _) => rows,
            (None, Some(adapter)) => adapter.rows(),
            (None, None) => Vec::new(),
        };

        let inner = GridInner {
            columns: self.columns,
            rows,
            table: TableState::new(
                config.initial_sorting.clone(),
                config.pagination.initial,
                config.pagination.enabled,
            ),
            prefs,
            window: RowWindow::new(config.row_height, config.overscan),
            container_width: 0,
            throttle: FrameThrottle::new(Duration::from_millis(config.frame_ms)),
            resize: None,
            filter_input: Debouncer::new(),
            edit: EditMachine::new(),
            form: None,
            selected: None,
            expanded: BTreeSet::new(),
            detail_heights: BTreeMap::new(),
            loading: false,
            load_error: None,
        };

        let grid = DataGrid {
            id: GridId::new(),
            actions: ActionColumn::new(config.actions),
            config: Arc::new(config),
            identity: self.identity,
            schema: self.schema,
            persistence: self.persistence,
            adapter: self.adapter,
            callbacks: Arc::new(self.callbacks),
            confirm: ConfirmDialog::new(),
            inner: Arc::new(RwLock::new(inner)),
            dirty: Arc::new(AtomicBool::new(true)),
        };
        log::debug!("Created grid {} ({})", grid.id, grid.config.title);
        Ok(grid)
    }
}

/// A headless, editable data grid over rows of type `R`.
///
/// Cheap to clone; clones share state, so async tasks (submits, deletes,
/// loads) can hold a handle without holding any lock.
///
/// # Example
///
/// ```ignore
/// let grid = DataGrid::builder(columns, Identity::field("id"))
///     .config(GridConfig::new("Users"))
///     .schema(schema)
///     .adapter(CrudAdapter::new(Arc::new(source)))
///     .build()?;
///
/// grid.load().await;
/// grid.start_create()?;
/// grid.form().unwrap().set_value("name", "Ada".into());
/// grid.submit().await?;
/// ```
pub struct DataGrid<R: Clone + Send + Sync + 'static> {
    id: GridId,
    config: Arc<GridConfig>,
    identity: Identity<R>,
    schema: Arc<dyn Schema>,
    persistence: Option<Arc<dyn Persistence<R>>>,
    adapter: Option<CrudAdapter<R>>,
    callbacks: Arc<Callbacks<R>>,
    actions: ActionColumn,
    confirm: ConfirmDialog,
    inner: Arc<RwLock<GridInner<R>>>,
    dirty: Arc<AtomicBool>,
}

impl<R: Clone + Send + Sync + 'static> Clone for DataGrid<R> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            config: Arc::clone(&self.config),
            identity: self.identity.clone(),
            schema: Arc::clone(&self.schema),
            persistence: self.persistence.clone(),
            adapter: self.adapter.clone(),
            callbacks: Arc::clone(&self.callbacks),
            actions: self.actions.clone(),
            confirm: self.confirm.clone(),
            inner: Arc::clone(&self.inner),
            dirty: Arc::clone(&self.dirty),
        }
    }
}

impl<R: Clone + Send + Sync + 'static> DataGrid<R> {
    pub fn builder(columns: Vec<Column<R>>, identity: Identity<R>) -> DataGridBuilder<R> {
        DataGridBuilder {
            columns,
            identity,
            config: GridConfig::default(),
            schema: Arc::new(AcceptAll),
            persistence: None,
            adapter: None,
            prefs_store: Arc::new(NoopPrefsStore),
            rows: None,
            callbacks: Callbacks::default(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, GridInner<R>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, GridInner<R>> {
        self.dirty.store(true, Ordering::SeqCst);
        self.write_quiet()
    }

    /// Write access for derived caches that does not mark the grid dirty.
    fn write_quiet(&self) -> RwLockWriteGuard<'_, GridInner<R>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check if the grid changed since the last render.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    pub fn clear_dirty(&self) {
        self.dirty.store(false, Ordering::SeqCst);
    }

    // -------------------------------------------------------------------------
    // Identity and config
    // -------------------------------------------------------------------------

    pub fn id(&self) -> GridId {
        self.id
    }

    /// DOM id of the grid's shared tooltip.
    pub fn tooltip_id(&self) -> String {
        format!("{}-tooltip", self.id)
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn title(&self) -> &str {
        &self.config.title
    }

    pub fn storage_key(&self) -> String {
        self.read().prefs.key().to_string()
    }

    pub fn row_id(&self, row: &R) -> Option<RowId> {
        self.identity.of(row)
    }

    pub fn adapter(&self) -> Option<&CrudAdapter<R>> {
        self.adapter.as_ref()
    }

    // -------------------------------------------------------------------------
    // Rows and load state
    // -------------------------------------------------------------------------

    /// Replace the row mirror.
    pub fn set_rows(&self, rows: Vec<R>) {
        let mut inner = self.write();
        log::debug!("Grid {} received {} rows", self.id, rows.len());
        inner.rows = rows;
    }

    pub fn rows(&self) -> Vec<R> {
        self.read().rows.clone()
    }

    pub fn row(&self, id: &RowId) -> Option<R> {
        let inner = self.read();
        self.find_row(&inner.rows, id).map(|i| inner.rows[i].clone())
    }

    fn find_row(&self, rows: &[R], id: &RowId) -> Option<usize> {
        rows.iter().position(|r| self.identity.of(r).as_ref() == Some(id))
    }

    pub fn set_loading(&self, loading: bool) {
        self.write().loading = loading;
    }

    pub fn is_loading(&self) -> bool {
        self.read().loading
    }

    /// Show or clear the load-error banner. Rows already loaded stay.
    pub fn set_load_error(&self, error: Option<SourceError>) {
        self.write().load_error = error;
    }

    pub fn dismiss_error(&self) {
        self.set_load_error(None);
    }

    pub fn error_banner(&self) -> Option<ErrorBanner> {
        self.read().load_error.as_ref().map(|error| ErrorBanner {
            message: error.message_or(LOAD_FAILED),
            error: error.clone(),
            can_retry: self.adapter.is_some(),
        })
    }

    /// Load rows through the adapter unless some are cached.
    pub async fn load(&self) {
        if let Some(adapter) = &self.adapter {
            self.set_loading(true);
            let _ = adapter.load_rows().await;
            self.sync_from_adapter();
        }
    }

    /// Refetch rows through the adapter, clearing the banner first.
    pub async fn retry(&self) {
        if let Some(adapter) = &self.adapter {
            {
                let mut inner = self.write();
                inner.load_error = None;
                inner.loading = true;
            }
            let _ = adapter.retry().await;
            self.sync_from_adapter();
        }
    }

    fn sync_from_adapter(&self) {
        let Some(adapter) = &self.adapter else {
            return;
        };
        let mut inner = self.write();
        Self::pull_adapter_state(&mut inner, adapter);
    }

    fn pull_adapter_state(inner: &mut GridInner<R>, adapter: &CrudAdapter<R>) {
        inner.rows = adapter.rows();
        inner.loading = adapter.is_loading();
        inner.load_error = adapter.error().filter(|e| !e.is_cancelled());
    }

    // -------------------------------------------------------------------------
    // Columns
    // -------------------------------------------------------------------------

    pub fn columns(&self) -> Vec<Column<R>> {
        self.read().columns.clone()
    }

    /// Replace the column descriptors; preferences are renormalized.
    pub fn set_columns(&self, columns: Vec<Column<R>>) {
        let mut inner = self.write();
        let declared = columns.iter().map(|c| c.id.clone()).collect();
        inner.columns = columns;
        inner.prefs.set_declared(declared);
    }

    /// Normalized column order, actions column last.
    pub fn column_order(&self) -> Vec<String> {
        self.read().prefs.order()
    }

    pub fn set_column_order(&self, order: Vec<String>) {
        self.write().prefs.set_order(order);
    }

    pub fn move_column(&self, id: &str, target: usize) {
        self.write().prefs.move_column(id, target);
    }

    pub fn set_column_visible(&self, id: &str, visible: bool) -> Result<(), GridError> {
        let mut inner = self.write();
        if !inner.columns.iter().any(|c| c.id == id) {
            return Err(GridError::UnknownColumn(id.to_string()));
        }
        inner.prefs.set_visibility(id, visible);
        Ok(())
    }

    pub fn is_column_visible(&self, id: &str) -> bool {
        self.read().prefs.is_visible(id)
    }

    /// Visible data columns in display order.
    pub fn visible_columns(&self) -> Vec<Column<R>> {
        let inner = self.read();
        Self::visible_in(&inner).into_iter().cloned().collect()
    }

    fn visible_in<'a>(inner: &'a GridInner<R>) -> Vec<&'a Column<R>> {
        inner
            .prefs
            .order()
            .iter()
            .filter(|id| inner.prefs.is_visible(id))
            .filter_map(|id| inner.columns.iter().find(|c| &c.id == id))
            .collect()
    }

    fn width_in(inner: &GridInner<R>, column: &Column<R>) -> u32 {
        column.sizing.clamp(inner.prefs.size(&column.id).unwrap_or(column.sizing.size))
    }

    /// Current width of a column before last-column reconciliation.
    pub fn column_width(&self, id: &str) -> Option<u32> {
        let inner = self.read();
        inner
            .columns
            .iter()
            .find(|c| c.id == id)
            .map(|c| Self::width_in(&inner, c))
    }

    pub fn layout(&self) -> ColumnLayout {
        let inner = self.read();
        Self::layout_in(&inner)
    }

    fn layout_in(inner: &GridInner<R>) -> ColumnLayout {
        let columns: Vec<LayoutColumn> = Self::visible_in(inner)
            .into_iter()
            .map(|c| LayoutColumn::new(&c.id, Self::width_in(inner, c)))
            .collect();
        ColumnLayout::compute(&columns, inner.container_width)
    }

    pub fn container_width(&self) -> u32 {
        self.read().container_width
    }

    /// Report a container width. Applied at once unless a recompute already
    /// happened this frame; returns whether it was applied.
    pub fn observe_container_width(&self, width: u32) -> bool {
        let mut inner = self.write();
        match inner.throttle.observe(width, Instant::now()) {
            Some(width) => {
                inner.container_width = width;
                true
            }
            None => false,
        }
    }

    /// Apply a held container width once its frame has passed.
    pub fn poll_frame(&self) -> bool {
        let mut inner = self.write();
        match inner.throttle.poll(Instant::now()) {
            Some(width) => {
                inner.container_width = width;
                true
            }
            None => false,
        }
    }

    /// Wait for the held container width, if any, and apply it.
    pub async fn settle_layout(&self) {
        let deadline = self.read().throttle.next_deadline();
        if let Some(deadline) = deadline {
            tokio::time::sleep_until(deadline).await;
            self.poll_frame();
        }
    }

    /// Start a resize drag on a column's header edge.
    pub fn begin_resize(&self, id: &str, x: i32) -> Result<bool, GridError> {
        let mut inner = self.write();
        let column = inner
            .columns
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| GridError::UnknownColumn(id.to_string()))?;
        if !column.resizable {
            return Ok(false);
        }
        let drag = ResizeDrag::begin(id, Self::width_in(&inner, column), column.sizing, x);
        inner.resize = Some(drag);
        Ok(true)
    }

    /// Move the active resize drag; the width applies immediately.
    pub fn drag_resize(&self, x: i32) -> Option<u32> {
        let mut inner = self.write();
        let (id, width) = {
            let drag = inner.resize.as_ref()?;
            (drag.column_id.clone(), drag.width_at(x))
        };
        inner.prefs.set_size(&id, width);
        Some(width)
    }

    pub fn end_resize(&self) {
        self.write().resize = None;
    }

    pub fn is_resizing(&self) -> bool {
        self.read().resize.is_some()
    }

    /// Restore a column's declared width (double-click on the edge).
    pub fn reset_column_size(&self, id: &str) {
        self.write().prefs.reset_size(id);
    }

    /// Forget every stored column preference.
    pub fn reset_prefs(&self) {
        self.write().prefs.reset();
    }

    /// Header cells for the visible columns, then the actions column.
    pub fn header(&self) -> Vec<HeaderCell> {
        let inner = self.read();
        let layout = Self::layout_in(&inner);
        let mut cells: Vec<HeaderCell> = Self::visible_in(&inner)
            .into_iter()
            .map(|c| HeaderCell {
                id: c.id.clone(),
                label: c.header.clone(),
                width: layout.width_of(&c.id).unwrap_or(0),
                sortable: c.sortable,
                sort: inner.table.sort_direction(&c.id),
                resizable: c.resizable,
                tooltip: c.tooltip,
                hide_on_mobile: c.hide_on_mobile,
                filter: c.filter.clone(),
                filter_value: inner.table.filter(&c.id).cloned(),
                pending_filter: inner.filter_input.pending(&c.id).cloned(),
            })
            .collect();
        cells.push(HeaderCell {
            id: ACTIONS_COLUMN_ID.to_string(),
            label: self.actions.header().to_string(),
            width: self.actions.layout_width(),
            sortable: false,
            sort: None,
            resizable: false,
            tooltip: false,
            hide_on_mobile: false,
            filter: None,
            filter_value: None,
            pending_filter: None,
        });
        cells
    }

    // -------------------------------------------------------------------------
    // Sorting
    // -------------------------------------------------------------------------

    /// Cycle a column's sort. Columns that cannot sort are left alone.
    pub fn toggle_sort(&self, column_id: &str, multi: bool) -> Result<(), GridError> {
        let mut inner = self.write();
        let column = inner
            .columns
            .iter()
            .find(|c| c.id == column_id)
            .ok_or_else(|| GridError::UnknownColumn(column_id.to_string()))?;
        if column.sortable {
            inner.table.toggle_sort(column_id, multi);
        }
        Ok(())
    }

    pub fn set_sorting(&self, sorting: Vec<SortEntry>) {
        self.write().table.set_sorting(sorting);
    }

    pub fn sorting(&self) -> Vec<SortEntry> {
        self.read().table.sorting().to_vec()
    }

    // -------------------------------------------------------------------------
    // Filtering
    // -------------------------------------------------------------------------

    /// Apply a filter value at once. `None` or an empty value clears it.
    pub fn set_filter(&self, column_id: &str, value: Option<FilterValue>) -> Result<(), GridError> {
        let mut inner = self.write();
        if !inner.columns.iter().any(|c| c.id == column_id) {
            return Err(GridError::UnknownColumn(column_id.to_string()));
        }
        inner.filter_input.cancel(&column_id.to_string());
        inner.table.set_filter(column_id, value);
        Ok(())
    }

    /// Record text typed into a column's filter. Text filters apply after
    /// their debounce; see [`flush_filters`](Self::flush_filters).
    pub fn type_filter(&self, column_id: &str, text: impl Into<String>) -> Result<(), GridError> {
        let text = text.into();
        let mut inner = self.write();
        let debounce = inner
            .columns
            .iter()
            .find(|c| c.id == column_id)
            .ok_or_else(|| GridError::UnknownColumn(column_id.to_string()))?
            .filter
            .as_ref()
            .and_then(FilterSpec::input_debounce);
        match debounce {
            Some(delay) if !delay.is_zero() => {
                inner
                    .filter_input
                    .push(column_id.to_string(), text, delay, Instant::now());
            }
            _ => inner.table.set_filter(column_id, Some(FilterValue::Text(text))),
        }
        Ok(())
    }

    /// Apply debounced filter text whose delay has passed.
    pub fn flush_filters(&self) -> bool {
        let mut inner = self.write();
        let due = inner.filter_input.due(Instant::now());
        let applied = !due.is_empty();
        for (column_id, text) in due {
            log::debug!("Applying filter on {}", column_id);
            inner.table.set_filter(&column_id, Some(FilterValue::Text(text)));
        }
        applied
    }

    /// Wait until every pending filter text has been applied.
    pub async fn settle_filters(&self) {
        loop {
            let deadline = self.read().filter_input.next_deadline();
            let Some(deadline) = deadline else {
                break;
            };
            tokio::time::sleep_until(deadline).await;
            self.flush_filters();
        }
    }

    pub fn pending_filter(&self, column_id: &str) -> Option<String> {
        self.read().filter_input.pending(&column_id.to_string()).cloned()
    }

    pub fn clear_filters(&self) {
        let mut inner = self.write();
        inner.filter_input = Debouncer::new();
        inner.table.clear_filters();
    }

    pub fn filters(&self) -> BTreeMap<String, FilterValue> {
        self.read().table.filters().clone()
    }

    // -------------------------------------------------------------------------
    // Pagination
    // -------------------------------------------------------------------------

    fn filtered_total(inner: &GridInner<R>) -> usize {
        inner.table.row_model(&inner.rows, &inner.columns).filtered_count()
    }

    pub fn set_page_index(&self, index: usize) {
        let mut inner = self.write();
        let total = Self::filtered_total(&inner);
        inner.table.set_page_index(index, total);
    }

    pub fn next_page(&self) {
        let mut inner = self.write();
        let total = Self::filtered_total(&inner);
        inner.table.next_page(total);
    }

    pub fn previous_page(&self) {
        let mut inner = self.write();
        let total = Self::filtered_total(&inner);
        inner.table.previous_page(total);
    }

    pub fn first_page(&self) {
        self.write().table.first_page();
    }

    pub fn last_page(&self) {
        let mut inner = self.write();
        let total = Self::filtered_total(&inner);
        inner.table.last_page(total);
    }

    pub fn set_page_size(&self, size: usize) {
        let mut inner = self.write();
        let total = Self::filtered_total(&inner);
        inner.table.set_page_size(size, total);
    }

    pub fn page_size_options(&self) -> &[usize] {
        &self.config.pagination.page_size_options
    }

    pub fn page_summary(&self) -> PageSummary {
        self.row_model().summary
    }

    // -------------------------------------------------------------------------
    // Row model and window
    // -------------------------------------------------------------------------

    /// Filtered, sorted and paginated view of the rows.
    pub fn row_model(&self) -> RowModel {
        let inner = self.read();
        inner.table.row_model(&inner.rows, &inner.columns)
    }

    /// Rows on the current page, in display order.
    pub fn page_rows(&self) -> Vec<R> {
        let inner = self.read();
        let model = inner.table.row_model(&inner.rows, &inner.columns);
        model
            .page_indices()
            .iter()
            .map(|&i| inner.rows[i].clone())
            .collect()
    }

    pub fn set_viewport_height(&self, px: u32) {
        self.write().window.set_viewport_height(px);
    }

    pub fn scroll_to(&self, offset: u64) {
        let mut inner = self.write();
        Self::sync_window(&mut inner, &self.identity, &self.config);
        inner.window.scroll_to(offset);
    }

    pub fn scroll_by(&self, delta: i64) {
        let mut inner = self.write();
        Self::sync_window(&mut inner, &self.identity, &self.config);
        inner.window.scroll_by(delta);
    }

    /// Scroll so a row on the current page is in view.
    pub fn scroll_to_row(&self, id: &RowId) -> bool {
        let mut inner = self.write_quiet();
        let model = Self::sync_window(&mut inner, &self.identity, &self.config);
        let position = model
            .page_indices()
            .iter()
            .position(|&i| self.identity.of(&inner.rows[i]).as_ref() == Some(id));
        match position {
            Some(index) => {
                inner.window.scroll_to_index(index);
                self.dirty.store(true, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    pub fn scroll_offset(&self) -> u64 {
        self.read().window.scroll_offset()
    }

    /// Report the measured height of a row's expanded panel or inline editor.
    pub fn report_detail_height(&self, id: &RowId, px: u32) {
        self.write().detail_heights.insert(id.clone(), px);
    }

    /// Bring the window in line with the current page and return the model.
    fn sync_window(inner: &mut GridInner<R>, identity: &Identity<R>, config: &GridConfig) -> RowModel {
        let model = inner.table.row_model(&inner.rows, &inner.columns);
        let page = model.page_indices();

        let inline_editing = match inner.edit.state() {
            EditState::Editing(id) if config.edit_container.is_inline() => Some(id.clone()),
            _ => None,
        };
        let mut extra = BTreeMap::new();
        if !inner.expanded.is_empty() || inline_editing.is_some() {
            for (position, &i) in page.iter().enumerate() {
                let Some(id) = identity.of(&inner.rows[i]) else {
                    continue;
                };
                let detail = |id: &RowId| {
                    inner
                        .detail_heights
                        .get(id)
                        .copied()
                        .unwrap_or(config.detail_height)
                };
                let mut height = 0;
                if inner.expanded.contains(&id) {
                    height += detail(&id);
                }
                if inline_editing.as_ref() == Some(&id) {
                    height += detail(&id);
                }
                if height > 0 {
                    extra.insert(position, height);
                }
            }
        }

        inner.window.set_count(page.len());
        inner.window.set_extra_heights(extra);
        model
    }

    /// Mounted rows for the current scroll position.
    pub fn window(&self) -> GridWindow<R> {
        let mut inner = self.write_quiet();
        let model = Self::sync_window(&mut inner, &self.identity, &self.config);
        let range = inner.window.compute();
        let page = model.page_indices();
        let columns = Self::visible_in(&inner);
        let editing = inner.edit.state().row_id().cloned();

        let rows = range
            .items
            .iter()
            .map(|item| {
                let row = &inner.rows[page[item.index]];
                let id = self.identity.of(row);
                let cells: Vec<String> = columns.iter().map(|c| c.cell_text(row)).collect();
                let tooltips = columns
                    .iter()
                    .zip(&cells)
                    .map(|(c, text)| c.tooltip.then(|| text.clone()))
                    .collect();
                VisibleRow {
                    index: item.index,
                    item: *item,
                    cells,
                    tooltips,
                    selected: id.is_some() && inner.selected == id,
                    expanded: id.as_ref().is_some_and(|id| inner.expanded.contains(id)),
                    editing: id.is_some() && editing == id,
                    id,
                    row: row.clone(),
                }
            })
            .collect();

        let inline_create =
            self.config.edit_container.is_inline() && matches!(inner.edit.state(), EditState::Creating);

        GridWindow {
            range,
            rows,
            inline_create,
        }
    }

    // -------------------------------------------------------------------------
    // Selection and expansion
    // -------------------------------------------------------------------------

    /// Toggle selection of a row and notify the row-click hook.
    pub fn click_row(&self, id: &RowId) -> Result<(), GridError> {
        let row = {
            let mut inner = self.write();
            let index = self
                .find_row(&inner.rows, id)
                .ok_or_else(|| GridError::UnknownRow(id.clone()))?;
            inner.selected = if inner.selected.as_ref() == Some(id) {
                None
            } else {
                Some(id.clone())
            };
            inner.rows[index].clone()
        };
        if let Some(cb) = &self.callbacks.on_row_click {
            cb(&row, Some(id));
        }
        Ok(())
    }

    pub fn selected(&self) -> Option<RowId> {
        self.read().selected.clone()
    }

    pub fn clear_selection(&self) {
        self.write().selected = None;
    }

    /// Toggle a row's expanded panel; returns the new state.
    pub fn toggle_expanded(&self, id: &RowId) -> bool {
        let expanded = {
            let mut inner = self.write();
            if inner.expanded.remove(id) {
                false
            } else {
                inner.expanded.insert(id.clone());
                true
            }
        };
        if let Some(cb) = &self.callbacks.on_toggle_expanded {
            cb(id);
        }
        expanded
    }

    /// Replace the expanded set with externally controlled ids.
    pub fn set_expanded(&self, ids: impl IntoIterator<Item = RowId>) {
        self.write().expanded = ids.into_iter().collect();
    }

    pub fn is_expanded(&self, id: &RowId) -> bool {
        self.read().expanded.contains(id)
    }

    // -------------------------------------------------------------------------
    // Editing
    // -------------------------------------------------------------------------

    fn dispatch(&self, events: impl IntoIterator<Item = EditEvent>) {
        for event in events {
            match event {
                EditEvent::EditStarted(id) => {
                    if let Some(cb) = &self.callbacks.on_edit_start {
                        cb(&id);
                    }
                }
                EditEvent::Cancelled(_) => {
                    if let Some(cb) = &self.callbacks.on_cancel_edit {
                        cb();
                    }
                }
                EditEvent::CreateStarted => {}
            }
        }
    }

    fn submit_in_flight(inner: &GridInner<R>) -> bool {
        inner.form.as_ref().is_some_and(Form::is_submitting)
    }

    /// Whether rows can be saved at all.
    pub fn can_persist(&self) -> bool {
        self.persistence.as_ref().is_some_and(|p| p.can_persist())
    }

    pub fn can_delete(&self) -> bool {
        self.persistence.as_ref().is_some_and(|p| p.can_delete())
    }

    /// Open a create session. Refused while the load error is shown.
    pub fn start_create(&self) -> Result<(), GridError> {
        let events = {
            let mut inner = self.write();
            if inner.load_error.is_some() {
                log::warn!("Grid {}: add refused while load error is shown", self.id);
                return Err(GridError::AddBlocked);
            }
            if Self::submit_in_flight(&inner) {
                return Err(GridError::SubmitInFlight);
            }
            let events = inner.edit.start_create();
            inner.form = Some(Form::for_session(
                EditMode::Create,
                None,
                &inner.columns,
                Arc::clone(&self.schema),
            ));
            events
        };
        self.dispatch(events);
        Ok(())
    }

    /// Open an edit session on a row.
    pub fn start_edit(&self, id: &RowId) -> Result<(), GridError> {
        let events = {
            let mut inner = self.write();
            if Self::submit_in_flight(&inner) {
                return Err(GridError::SubmitInFlight);
            }
            let index = self
                .find_row(&inner.rows, id)
                .ok_or_else(|| GridError::UnknownRow(id.clone()))?;
            let row = inner.rows[index].clone();
            let events = inner.edit.start_edit(id.clone(), row.clone());
            inner.form = Some(Form::for_session(
                EditMode::Edit,
                Some(&row),
                &inner.columns,
                Arc::clone(&self.schema),
            ));
            events
        };
        self.dispatch(events);
        Ok(())
    }

    /// Open an edit session on a row handed back by the renderer.
    pub fn start_edit_row(&self, row: &R) -> Result<(), GridError> {
        let id = self.identity.of(row).ok_or(GridError::MissingIdentity)?;
        self.start_edit(&id)
    }

    /// Close the active session. Returns `false` when idle or submitting.
    pub fn cancel_edit(&self) -> bool {
        self.close_session(|edit| edit.cancel(CancelReason::User))
    }

    /// Apply the host's cancel trigger counter.
    pub fn apply_cancel_trigger(&self, counter: u64) -> bool {
        self.close_session(|edit| edit.apply_cancel_trigger(counter))
    }

    fn close_session(&self, close: impl FnOnce(&mut EditMachine<R>) -> Option<EditEvent>) -> bool {
        let event = {
            let mut inner = self.write();
            if Self::submit_in_flight(&inner) {
                log::debug!("Cancel ignored while submitting");
                return false;
            }
            let event = close(&mut inner.edit);
            if event.is_some() {
                inner.form = None;
            }
            event
        };
        let closed = event.is_some();
        self.dispatch(event);
        closed
    }

    /// Handle the escape key: declines an open confirmation first, then
    /// closes a shelled editor.
    pub fn escape(&self) -> bool {
        if self.confirm.decline() {
            return true;
        }
        let closes = self
            .config
            .edit_container
            .chrome()
            .is_some_and(|c| c.closes_on_escape);
        closes && self.cancel_edit()
    }

    pub fn edit_state(&self) -> EditState {
        self.read().edit.state().clone()
    }

    pub fn edit_container(&self) -> EditContainerKind {
        self.config.edit_container
    }

    pub fn edit_surface(&self) -> EditSurface {
        self.config.edit_container.surface(self.read().edit.state())
    }

    /// Form of the active session.
    pub fn form(&self) -> Option<Form> {
        self.read().form.clone()
    }

    /// Submit the active form.
    ///
    /// On success the saved row lands in the mirror and the session closes;
    /// on failure the form keeps the server message and stays open.
    pub async fn submit(&self) -> Result<SubmitOutcome<R>, GridError> {
        let persistence = self.persistence.clone().ok_or(GridError::NoPersistence)?;
        let (form, mode, previous) = {
            let inner = self.read();
            let session = inner.edit.session().ok_or(GridError::NoSession)?;
            let form = inner.form.clone().ok_or(GridError::NoSession)?;
            (form, session.mode, session.row.clone())
        };

        let outcome = form
            .submit(|values| {
                let previous = previous.clone();
                async move { persistence.persist(mode, values, previous.as_ref()).await }
            })
            .await;

        if let SubmitOutcome::Saved(saved) = &outcome {
            let event = {
                let mut inner = self.write();
                self.apply_saved(&mut inner, mode, previous.as_ref(), saved.clone());
                let current = inner.form.as_ref().is_some_and(|f| f.same_form(&form));
                if current {
                    inner.form = None;
                    inner.edit.cancel(CancelReason::Submitted)
                } else {
                    None
                }
            };
            self.dispatch(event);
        }
        Ok(outcome)
    }

    fn apply_saved(&self, inner: &mut GridInner<R>, mode: EditMode, previous: Option<&R>, saved: R) {
        let op = match mode {
            EditMode::Create => SourceOp::Create,
            EditMode::Edit => SourceOp::Update,
        };
        if let Some(adapter) = self.adapter.as_ref().filter(|a| a.invalidates(op)) {
            Self::pull_adapter_state(inner, adapter);
            return;
        }

        let target = previous
            .and_then(|row| self.identity.of(row))
            .or_else(|| self.identity.of(&saved));
        match target.and_then(|id| self.find_row(&inner.rows, &id)) {
            Some(index) => inner.rows[index] = saved,
            None => inner.rows.push(saved),
        }
    }

    // -------------------------------------------------------------------------
    // Deleting
    // -------------------------------------------------------------------------

    /// The grid's confirmation dialog, for rendering and answering.
    pub fn confirm_dialog(&self) -> &ConfirmDialog {
        &self.confirm
    }

    /// Action buttons for body rows.
    pub fn row_actions(&self) -> Vec<ActionButton> {
        self.actions.buttons(self.can_persist(), self.can_delete())
    }

    pub fn action_column(&self) -> &ActionColumn {
        &self.actions
    }

    /// Ask for confirmation, then delete a row.
    ///
    /// Backend failures go to the error sink and come back as
    /// [`DeleteOutcome::Failed`]; they are never an `Err`.
    pub async fn request_delete(&self, id: &RowId) -> Result<DeleteOutcome, GridError> {
        let persistence = self.persistence.clone().ok_or(GridError::NoPersistence)?;
        let row = self.row(id).ok_or_else(|| GridError::UnknownRow(id.clone()))?;

        if !self.confirm.confirm(ConfirmOptions::delete()).await {
            log::debug!("Delete of {} declined", id);
            return Ok(DeleteOutcome::Declined);
        }

        match persistence.delete(&row).await {
            Ok(()) => {
                let closed = {
                    let mut inner = self.write();
                    match self.adapter.as_ref().filter(|a| a.invalidates(SourceOp::Remove)) {
                        Some(adapter) => Self::pull_adapter_state(&mut inner, adapter),
                        None => inner
                            .rows
                            .retain(|r| self.identity.of(r).as_ref() != Some(id)),
                    }
                    if inner.selected.as_ref() == Some(id) {
                        inner.selected = None;
                    }
                    inner.expanded.remove(id);
                    inner.detail_heights.remove(id);

                    // The edited row is gone, so its session goes with it.
                    let editing_deleted = inner.edit.state().row_id() == Some(id);
                    let event = editing_deleted
                        .then(|| inner.edit.cancel(CancelReason::Removed))
                        .flatten();
                    if event.is_some() {
                        inner.form = None;
                    }
                    event
                };
                self.dispatch(closed);
                log::info!("Deleted row {}", id);
                Ok(DeleteOutcome::Deleted)
            }
            Err(e) => {
                let message = e.message_or(DELETE_FAILED);
                log::warn!("Deleting row {} failed: {}", id, e);
                if let Some(sink) = &self.callbacks.on_error {
                    sink(&e);
                }
                Ok(DeleteOutcome::Failed(message))
            }
        }
    }

    // -------------------------------------------------------------------------
    // Status
    // -------------------------------------------------------------------------

    pub fn status(&self) -> GridStatus {
        let inner = self.read();
        let no_rows = inner.rows.is_empty();
        let show_add = self.config.edit_container.shows_add() && self.can_persist();
        GridStatus {
            loading: inner.loading,
            skeleton_rows: if inner.loading && no_rows { SKELETON_ROWS } else { 0 },
            empty: !inner.loading && no_rows && inner.load_error.is_none(),
            show_add,
            can_add: show_add && inner.load_error.is_none(),
            total_rows: inner.rows.len(),
        }
    }
}

impl<R: Clone + Send + Sync + 'static> std::fmt::Debug for DataGrid<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.read();
        f.debug_struct("DataGrid")
            .field("id", &self.id)
            .field("title", &self.config.title)
            .field("rows", &inner.rows.len())
            .field("edit", inner.edit.state())
            .finish_non_exhaustive()
    }
}
