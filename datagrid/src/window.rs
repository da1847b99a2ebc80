//! Virtualized row window.
//!
//! Only rows intersecting the viewport (plus an overscan margin) are mounted.
//! Everything above and below is represented by two spacer heights so the
//! scroll extent matches the full row count.

use std::collections::BTreeMap;

/// Estimated row height in pixels.
pub const DEFAULT_ROW_HEIGHT: u32 = 44;

/// Rows mounted beyond each edge of the viewport.
pub const DEFAULT_OVERSCAN: usize = 10;

/// A mounted row and its vertical extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualItem {
    pub index: usize,
    pub start: u64,
    /// Row height plus any extra height attached below it.
    pub size: u32,
}

impl VirtualItem {
    pub fn end(&self) -> u64 {
        self.start + u64::from(self.size)
    }
}

/// Result of a window pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowRange {
    pub items: Vec<VirtualItem>,
    /// First and last index intersecting the viewport, before overscan.
    pub visible: Option<(usize, usize)>,
    pub padding_top: u64,
    pub padding_bottom: u64,
    pub total_height: u64,
}

impl WindowRange {
    /// Mounted index range, end exclusive.
    pub fn indices(&self) -> std::ops::Range<usize> {
        match (self.items.first(), self.items.last()) {
            (Some(first), Some(last)) => first.index..last.index + 1,
            _ => 0..0,
        }
    }

    pub fn is_mounted(&self, index: usize) -> bool {
        self.indices().contains(&index)
    }
}

/// Scroll state of the row body.
#[derive(Debug, Clone)]
pub struct RowWindow {
    row_height: u32,
    overscan: usize,
    count: usize,
    viewport_height: u32,
    scroll_offset: u64,
    /// Extra height attached below a row (expanded panel, inline editor).
    extra: BTreeMap<usize, u32>,
}

impl Default for RowWindow {
    fn default() -> Self {
        Self::new(DEFAULT_ROW_HEIGHT, DEFAULT_OVERSCAN)
    }
}

impl RowWindow {
    pub fn new(row_height: u32, overscan: usize) -> Self {
        Self {
            row_height: row_height.max(1),
            overscan,
            count: 0,
            viewport_height: 0,
            scroll_offset: 0,
            extra: BTreeMap::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Inputs
    // -------------------------------------------------------------------------

    pub fn set_count(&mut self, count: usize) {
        self.count = count;
        self.extra.retain(|index, _| *index < count);
        self.clamp_offset();
    }

    pub fn set_viewport_height(&mut self, height: u32) {
        self.viewport_height = height;
        self.clamp_offset();
    }

    /// Scroll to an absolute offset, clamped to the scrollable range.
    pub fn scroll_to(&mut self, offset: u64) {
        self.scroll_offset = offset;
        self.clamp_offset();
    }

    pub fn scroll_by(&mut self, delta: i64) {
        let target = if delta < 0 {
            self.scroll_offset.saturating_sub(delta.unsigned_abs())
        } else {
            self.scroll_offset.saturating_add(delta as u64)
        };
        self.scroll_to(target);
    }

    /// Scroll the minimum distance that brings `index` fully into view.
    pub fn scroll_to_index(&mut self, index: usize) {
        if index >= self.count {
            return;
        }
        let start = self.row_start(index);
        let end = start + u64::from(self.row_size(index));
        let viewport = u64::from(self.viewport_height);

        if start < self.scroll_offset {
            self.scroll_to(start);
        } else if end > self.scroll_offset + viewport {
            self.scroll_to(end.saturating_sub(viewport));
        }
    }

    /// Attach extra height below a row. Zero removes it.
    pub fn set_extra_height(&mut self, index: usize, height: u32) {
        if height == 0 {
            self.extra.remove(&index);
        } else if index < self.count {
            self.extra.insert(index, height);
        }
        self.clamp_offset();
    }

    /// Replace every extra height at once.
    pub fn set_extra_heights(&mut self, extra: BTreeMap<usize, u32>) {
        self.extra = extra;
        let count = self.count;
        self.extra.retain(|index, height| *index < count && *height > 0);
        self.clamp_offset();
    }

    // -------------------------------------------------------------------------
    // Geometry
    // -------------------------------------------------------------------------

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn scroll_offset(&self) -> u64 {
        self.scroll_offset
    }

    pub fn viewport_height(&self) -> u32 {
        self.viewport_height
    }

    pub fn row_size(&self, index: usize) -> u32 {
        self.row_height + self.extra.get(&index).copied().unwrap_or(0)
    }

    /// Offset of the top of row `index`; `row_start(count)` is the total.
    pub fn row_start(&self, index: usize) -> u64 {
        let index = index.min(self.count);
        let extra: u64 = self.extra.range(..index).map(|(_, h)| u64::from(*h)).sum();
        index as u64 * u64::from(self.row_height) + extra
    }

    pub fn total_height(&self) -> u64 {
        self.row_start(self.count)
    }

    pub fn max_scroll_offset(&self) -> u64 {
        self.total_height()
            .saturating_sub(u64::from(self.viewport_height))
    }

    /// Index of the row covering `offset`, or the last row past the end.
    pub fn index_at(&self, offset: u64) -> Option<usize> {
        if self.count == 0 {
            return None;
        }
        // Last row whose start is <= offset.
        let (mut lo, mut hi) = (0usize, self.count);
        while hi - lo > 1 {
            let mid = lo + (hi - lo) / 2;
            if self.row_start(mid) <= offset {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        Some(lo)
    }

    /// Compute the mounted rows and spacers for the current scroll position.
    pub fn compute(&self) -> WindowRange {
        let total_height = self.total_height();
        let Some(first) = self.index_at(self.scroll_offset) else {
            return WindowRange::default();
        };
        let bottom = self.scroll_offset + u64::from(self.viewport_height);
        let last = self
            .index_at(bottom.saturating_sub(1).max(self.scroll_offset))
            .unwrap_or(first);

        let start = first.saturating_sub(self.overscan);
        let end = (last + 1 + self.overscan).min(self.count);

        let mut items = Vec::with_capacity(end - start);
        let mut offset = self.row_start(start);
        for index in start..end {
            let size = self.row_size(index);
            items.push(VirtualItem {
                index,
                start: offset,
                size,
            });
            offset += u64::from(size);
        }

        WindowRange {
            items,
            visible: Some((first, last)),
            padding_top: self.row_start(start),
            padding_bottom: total_height - offset,
            total_height,
        }
    }

    fn clamp_offset(&mut self) {
        self.scroll_offset = self.scroll_offset.min(self.max_scroll_offset());
    }
}
