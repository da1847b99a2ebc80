//! Sorting, filtering and pagination, composed into a row model.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use datagrid_data::Value;
use serde::{Deserialize, Serialize};

use crate::column::Column;

// =============================================================================
// Sorting
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortEntry {
    pub column_id: String,
    pub direction: SortDirection,
}

impl SortEntry {
    pub fn asc(column_id: impl Into<String>) -> Self {
        Self {
            column_id: column_id.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(column_id: impl Into<String>) -> Self {
        Self {
            column_id: column_id.into(),
            direction: SortDirection::Desc,
        }
    }
}

// =============================================================================
// Filters
// =============================================================================

/// Value of a column filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum FilterValue {
    /// Case-insensitive substring match.
    Text(String),
    /// Exact match against the option value.
    Select(String),
    /// Membership in any of the option values.
    MultiSelect(Vec<String>),
    Boolean(bool),
    /// Inclusive date range; either bound may be open.
    DateRange {
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    },
}

impl FilterValue {
    /// An empty filter value clears the filter.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) | Self::Select(s) => s.trim().is_empty(),
            Self::MultiSelect(values) => values.is_empty(),
            Self::Boolean(_) => false,
            Self::DateRange { from, to } => from.is_none() && to.is_none(),
        }
    }

    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Text(needle) => value.contains_text(needle.trim()),
            Self::Select(option) => value.matches_str(option),
            Self::MultiSelect(options) => options.iter().any(|o| value.matches_str(o)),
            Self::Boolean(expected) => value.as_bool() == Some(*expected),
            Self::DateRange { from, to } => match value.as_date() {
                Some(date) => {
                    from.is_none_or(|from| date >= from) && to.is_none_or(|to| date <= to)
                }
                None => false,
            },
        }
    }
}

// =============================================================================
// Pagination
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PaginationState {
    pub page_index: usize,
    pub page_size: usize,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self {
            page_index: 0,
            page_size: 10,
        }
    }
}

/// Footer summary of the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSummary {
    pub page_index: usize,
    pub page_size: usize,
    pub page_count: usize,
    /// One-based index of the first row on the page, 0 when empty.
    pub from: usize,
    /// One-based index of the last row on the page.
    pub to: usize,
    pub total: usize,
    pub can_prev: bool,
    pub can_next: bool,
}

impl PageSummary {
    fn new(pagination: PaginationState, total: usize) -> Self {
        let size = pagination.page_size.max(1);
        let page_count = total.div_ceil(size);
        let page_index = pagination.page_index.min(page_count.saturating_sub(1));
        let (from, to) = if total == 0 {
            (0, 0)
        } else {
            (page_index * size + 1, ((page_index + 1) * size).min(total))
        };
        Self {
            page_index,
            page_size: size,
            page_count,
            from,
            to,
            total,
            can_prev: page_index > 0,
            can_next: page_index + 1 < page_count,
        }
    }

    /// "1 to 10 of 42", or "No results".
    pub fn label(&self) -> String {
        if self.total == 0 {
            "No results".to_string()
        } else {
            format!("{} to {} of {}", self.from, self.to, self.total)
        }
    }
}

// =============================================================================
// Table state
// =============================================================================

/// View state of a table: sorting, filters and pagination.
///
/// Any change to sorting or a filter sends the table back to the first page.
#[derive(Debug, Clone, PartialEq)]
pub struct TableState {
    sorting: Vec<SortEntry>,
    filters: BTreeMap<String, FilterValue>,
    pagination: PaginationState,
    paginate: bool,
}

impl Default for TableState {
    fn default() -> Self {
        Self::new(Vec::new(), PaginationState::default(), true)
    }
}

impl TableState {
    pub fn new(sorting: Vec<SortEntry>, pagination: PaginationState, paginate: bool) -> Self {
        Self {
            sorting,
            filters: BTreeMap::new(),
            pagination,
            paginate,
        }
    }

    pub fn sorting(&self) -> &[SortEntry] {
        &self.sorting
    }

    pub fn filters(&self) -> &BTreeMap<String, FilterValue> {
        &self.filters
    }

    pub fn filter(&self, column_id: &str) -> Option<&FilterValue> {
        self.filters.get(column_id)
    }

    pub fn pagination(&self) -> PaginationState {
        self.pagination
    }

    pub fn is_paginated(&self) -> bool {
        self.paginate
    }

    pub fn sort_direction(&self, column_id: &str) -> Option<SortDirection> {
        self.sorting
            .iter()
            .find(|s| s.column_id == column_id)
            .map(|s| s.direction)
    }

    // -------------------------------------------------------------------------
    // Sorting
    // -------------------------------------------------------------------------

    /// Cycle a column through ascending, descending and unsorted.
    ///
    /// Without `multi` the column replaces any other sort.
    pub fn toggle_sort(&mut self, column_id: &str, multi: bool) {
        let next = match self.sort_direction(column_id) {
            None => Some(SortDirection::Asc),
            Some(SortDirection::Asc) => Some(SortDirection::Desc),
            Some(SortDirection::Desc) => None,
        };

        if multi {
            let position = self.sorting.iter().position(|s| s.column_id == column_id);
            match (position, next) {
                (Some(i), Some(direction)) => self.sorting[i].direction = direction,
                (Some(i), None) => {
                    self.sorting.remove(i);
                }
                (None, Some(direction)) => self.sorting.push(SortEntry {
                    column_id: column_id.to_string(),
                    direction,
                }),
                (None, None) => {}
            }
        } else {
            self.sorting = next
                .map(|direction| {
                    vec![SortEntry {
                        column_id: column_id.to_string(),
                        direction,
                    }]
                })
                .unwrap_or_default();
        }
        self.pagination.page_index = 0;
    }

    pub fn set_sorting(&mut self, sorting: Vec<SortEntry>) {
        if self.sorting != sorting {
            self.sorting = sorting;
            self.pagination.page_index = 0;
        }
    }

    // -------------------------------------------------------------------------
    // Filtering
    // -------------------------------------------------------------------------

    /// Set or clear a column filter. Empty values clear it.
    pub fn set_filter(&mut self, column_id: &str, value: Option<FilterValue>) {
        let value = value.filter(|v| !v.is_empty());
        let changed = match &value {
            Some(v) => self.filters.get(column_id) != Some(v),
            None => self.filters.contains_key(column_id),
        };
        if !changed {
            return;
        }
        match value {
            Some(v) => {
                self.filters.insert(column_id.to_string(), v);
            }
            None => {
                self.filters.remove(column_id);
            }
        }
        self.pagination.page_index = 0;
    }

    pub fn clear_filters(&mut self) {
        if !self.filters.is_empty() {
            self.filters.clear();
            self.pagination.page_index = 0;
        }
    }

    // -------------------------------------------------------------------------
    // Pagination
    // -------------------------------------------------------------------------

    /// Jump to a page, clamped to the pages available for `total` rows.
    pub fn set_page_index(&mut self, index: usize, total: usize) {
        let page_count = total.div_ceil(self.pagination.page_size.max(1));
        self.pagination.page_index = index.min(page_count.saturating_sub(1));
    }

    pub fn next_page(&mut self, total: usize) {
        self.set_page_index(self.pagination.page_index + 1, total);
    }

    pub fn previous_page(&mut self, total: usize) {
        self.set_page_index(self.pagination.page_index.saturating_sub(1), total);
    }

    pub fn first_page(&mut self) {
        self.pagination.page_index = 0;
    }

    pub fn last_page(&mut self, total: usize) {
        self.set_page_index(usize::MAX, total);
    }

    /// Change the page size, keeping the first visible row on screen.
    pub fn set_page_size(&mut self, size: usize, total: usize) {
        let size = size.max(1);
        let first_row = self.pagination.page_index * self.pagination.page_size;
        self.pagination.page_size = size;
        self.set_page_index(first_row / size, total);
    }

    pub fn summary(&self, total: usize) -> PageSummary {
        if self.paginate {
            PageSummary::new(self.pagination, total)
        } else {
            PageSummary::new(
                PaginationState {
                    page_index: 0,
                    page_size: total.max(1),
                },
                total,
            )
        }
    }

    // -------------------------------------------------------------------------
    // Row model
    // -------------------------------------------------------------------------

    /// Filter, sort and paginate `rows`.
    ///
    /// Filters on unknown columns are ignored. Null values sort last in
    /// either direction; ties keep their input order.
    pub fn row_model<R>(&self, rows: &[R], columns: &[Column<R>]) -> RowModel {
        let active_filters: Vec<(&Column<R>, &FilterValue)> = self
            .filters
            .iter()
            .filter_map(|(id, value)| columns.iter().find(|c| &c.id == id).map(|c| (c, value)))
            .collect();

        let mut indices: Vec<usize> = (0..rows.len())
            .filter(|&i| {
                active_filters
                    .iter()
                    .all(|(column, filter)| filter.matches(&column.value(&rows[i])))
            })
            .collect();

        let sorters: Vec<(&Column<R>, SortDirection)> = self
            .sorting
            .iter()
            .filter_map(|s| {
                columns
                    .iter()
                    .find(|c| c.id == s.column_id && c.sortable)
                    .map(|c| (c, s.direction))
            })
            .collect();

        if !sorters.is_empty() {
            indices.sort_by(|&a, &b| {
                for (column, direction) in &sorters {
                    let ord = compare_cells(&column.value(&rows[a]), &column.value(&rows[b]), *direction);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }

        let summary = self.summary(indices.len());
        let page = if indices.is_empty() {
            0..0
        } else {
            (summary.from - 1)..summary.to
        };

        RowModel {
            indices,
            page,
            summary,
        }
    }
}

fn compare_cells(a: &Value, b: &Value, direction: SortDirection) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => match direction {
            SortDirection::Asc => a.compare(b),
            SortDirection::Desc => b.compare(a),
        },
    }
}

/// Filtered and sorted row indices plus the slice on the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowModel {
    /// Indices into the source rows, filtered and sorted.
    pub indices: Vec<usize>,
    /// Range of `indices` on the current page.
    pub page: std::ops::Range<usize>,
    pub summary: PageSummary,
}

impl RowModel {
    /// Source row indices on the current page.
    pub fn page_indices(&self) -> &[usize] {
        &self.indices[self.page.clone()]
    }

    pub fn filtered_count(&self) -> usize {
        self.indices.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_cycles_asc_desc_none() {
        let mut state = TableState::default();
        state.toggle_sort("name", false);
        assert_eq!(state.sort_direction("name"), Some(SortDirection::Asc));
        state.toggle_sort("name", false);
        assert_eq!(state.sort_direction("name"), Some(SortDirection::Desc));
        state.toggle_sort("name", false);
        assert!(state.sorting().is_empty());
    }

    #[test]
    fn multi_sort_appends() {
        let mut state = TableState::default();
        state.toggle_sort("a", false);
        state.toggle_sort("b", true);
        assert_eq!(state.sorting(), &[SortEntry::asc("a"), SortEntry::asc("b")]);
        state.toggle_sort("c", false);
        assert_eq!(state.sorting(), &[SortEntry::asc("c")]);
    }

    #[test]
    fn empty_summary() {
        let state = TableState::default();
        let summary = state.summary(0);
        assert_eq!(summary.page_count, 0);
        assert_eq!((summary.from, summary.to), (0, 0));
        assert!(!summary.can_prev && !summary.can_next);
        assert_eq!(summary.label(), "No results");
    }
}
