//! Virtual-scroll viewport controller.
//!
//! Raw scroll position updates synchronously for smooth visual feedback;
//! visible-range recomputation is deferred behind a short debounce. Each new
//! scroll event cancels the still-pending recomputation, so a burst of
//! events yields exactly one recomputation after the burst settles. The
//! cooperative host drives time by passing `now_ms` (see
//! [`crate::parser::now_ms`]).

use serde::{Deserialize, Serialize};

use crate::events::{EventBus, ViewerEvent};

/// Delay (ms) after the last scroll event before the visible range is
/// recomputed; on the order of one animation frame.
pub const SCROLL_DEBOUNCE_MS: f64 = 16.0;

/// Scroll position and grid geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollState {
    pub scroll_top: f64,
    pub scroll_left: f64,
    pub container_height: f64,
    pub container_width: f64,
    pub row_height: f64,
    pub column_width: f64,
    /// Extra rows materialized above and below the visible window.
    pub overscan: u32,
}

impl Default for ScrollState {
    fn default() -> Self {
        Self {
            scroll_top: 0.0,
            scroll_left: 0.0,
            container_height: 600.0,
            container_width: 800.0,
            row_height: 28.0,
            column_width: 120.0,
            overscan: 5,
        }
    }
}

/// The row/column window currently eligible for materialized rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibleRange {
    pub start_row: u32,
    pub end_row: u32,
    pub start_col: u32,
    pub end_col: u32,
}

/// Converts raw scroll input into the debounced visible range.
#[derive(Debug)]
pub struct ViewportController {
    state: ScrollState,
    total_rows: u32,
    total_cols: u32,
    /// Timestamp of the last scroll event while a recomputation is pending.
    /// At most one recomputation is ever pending.
    pending_since: Option<f64>,
}

impl ViewportController {
    #[must_use]
    pub fn new(state: ScrollState, total_rows: u32, total_cols: u32) -> Self {
        Self {
            state,
            total_rows,
            total_cols,
            pending_since: None,
        }
    }

    /// Current scroll/geometry state.
    #[must_use]
    pub fn state(&self) -> &ScrollState {
        &self.state
    }

    /// Update geometry fields (container size, row height, overscan).
    pub fn set_geometry(&mut self, state: ScrollState) {
        self.state = state;
    }

    /// Replace the grid bounds used by subsequent computations.
    pub fn update_dimensions(&mut self, total_rows: u32, total_cols: u32) {
        self.total_rows = total_rows;
        self.total_cols = total_cols;
    }

    /// Record a scroll event: the raw position updates synchronously, and
    /// the debounce deadline re-arms, canceling any pending recomputation.
    pub fn on_scroll(&mut self, scroll_top: f64, scroll_left: f64, now_ms: f64) {
        self.state.scroll_top = scroll_top;
        self.state.scroll_left = scroll_left;
        self.pending_since = Some(now_ms);
    }

    /// Whether a recomputation is armed but not yet fired.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending_since.is_some()
    }

    /// Fire the pending recomputation once the debounce interval has
    /// elapsed since the last scroll event. Emits `scroll { visible_range }`
    /// and returns the range when it fires.
    pub fn poll(&mut self, now_ms: f64, bus: &mut EventBus) -> Option<VisibleRange> {
        let since = self.pending_since?;
        if now_ms - since < SCROLL_DEBOUNCE_MS {
            return None;
        }
        self.pending_since = None;
        let visible_range = self.visible_range();
        bus.emit(&ViewerEvent::Scroll { visible_range });
        Some(visible_range)
    }

    /// Drop any pending recomputation without firing it.
    pub fn cancel_pending(&mut self) {
        self.pending_since = None;
    }

    /// Compute the visible range from the current state.
    ///
    /// Columns are not virtualized: the full column span is always visible.
    #[must_use]
    pub fn visible_range(&self) -> VisibleRange {
        let max_row = i64::from(self.total_rows.saturating_sub(1));
        let max_col = self.total_cols.saturating_sub(1);

        let row_height = if self.state.row_height > 0.0 {
            self.state.row_height
        } else {
            1.0
        };

        let first = (self.state.scroll_top / row_height).floor();
        let start_row = clamp_row(f64_to_i64_clamped(first) - i64::from(self.state.overscan), max_row);

        let visible_count =
            f64_to_i64_clamped((self.state.container_height / row_height).ceil()).max(0);
        let end_row = clamp_row(
            i64::from(start_row) + visible_count + 2 * i64::from(self.state.overscan),
            max_row,
        );

        VisibleRange {
            start_row,
            end_row,
            start_col: 0,
            end_col: max_col,
        }
    }

    /// Zoom input is a pass-through notification; no geometry changes here.
    pub fn on_zoom(&mut self, delta: f64, bus: &mut EventBus) {
        bus.emit(&ViewerEvent::Zoom { delta });
    }
}

#[allow(clippy::cast_possible_truncation)]
fn f64_to_i64_clamped(value: f64) -> i64 {
    if value.is_finite() {
        value.clamp(-9.0e18, 9.0e18) as i64
    } else {
        0
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_row(value: i64, max_row: i64) -> u32 {
    value.clamp(0, max_row.max(0)) as u32
}
