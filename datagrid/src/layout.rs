//! Column width reconciliation and resize handling.

use crate::column::{ACTIONS_COLUMN_ID, ColumnSizing};

/// A visible leaf column as seen by the layout pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutColumn {
    pub id: String,
    /// Current width: resized width or the declared default.
    pub size: u32,
}

impl LayoutColumn {
    pub fn new(id: impl Into<String>, size: u32) -> Self {
        Self {
            id: id.into(),
            size,
        }
    }
}

/// Resolved pixel widths for one container width.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnLayout {
    /// Data columns in display order with their rendered widths.
    pub widths: Vec<(String, u32)>,
    /// Sum of every data column width except the last.
    pub base_total: u32,
    pub last_column: Option<String>,
    pub last_width: u32,
    pub table_width: u32,
}

impl ColumnLayout {
    /// Reconcile explicit widths against the container width.
    ///
    /// Every column but the last keeps its size; the last absorbs whatever
    /// space is left, never shrinking below its own size. The actions column
    /// takes no space and is skipped.
    pub fn compute(columns: &[LayoutColumn], container_width: u32) -> Self {
        let data: Vec<&LayoutColumn> = columns
            .iter()
            .filter(|c| c.id != ACTIONS_COLUMN_ID)
            .collect();

        let Some((last, rest)) = data.split_last() else {
            return Self::default();
        };

        let base_total: u32 = rest.iter().map(|c| c.size).sum();
        let last_width = last.size.max(container_width.saturating_sub(base_total));

        let mut widths: Vec<(String, u32)> =
            rest.iter().map(|c| (c.id.clone(), c.size)).collect();
        widths.push((last.id.clone(), last_width));

        Self {
            widths,
            base_total,
            last_column: Some(last.id.clone()),
            last_width,
            table_width: base_total + last_width,
        }
    }

    pub fn width_of(&self, id: &str) -> Option<u32> {
        self.widths.iter().find(|(c, _)| c == id).map(|(_, w)| *w)
    }

    pub fn is_empty(&self) -> bool {
        self.widths.is_empty()
    }
}

/// An in-progress header resize drag.
///
/// Widths update continuously while dragging, clamped to the column bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeDrag {
    pub column_id: String,
    start_x: i32,
    start_size: u32,
    sizing: ColumnSizing,
}

impl ResizeDrag {
    pub fn begin(column_id: impl Into<String>, start_size: u32, sizing: ColumnSizing, x: i32) -> Self {
        Self {
            column_id: column_id.into(),
            start_x: x,
            start_size,
            sizing,
        }
    }

    /// Width for the pointer at `x`.
    pub fn width_at(&self, x: i32) -> u32 {
        let delta = i64::from(x) - i64::from(self.start_x);
        let raw = (i64::from(self.start_size) + delta).clamp(0, i64::from(u32::MAX));
        self.sizing.clamp(raw as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drag_clamps_to_bounds() {
        let sizing = ColumnSizing::default();
        let drag = ResizeDrag::begin("name", 150, sizing, 500);

        assert_eq!(drag.width_at(530), 180);
        assert_eq!(drag.width_at(0), 40);
        assert_eq!(drag.width_at(5000), 1000);
    }
}
