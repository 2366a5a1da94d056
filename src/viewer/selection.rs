//! Pointer-driven range selection over model coordinates.
//!
//! Two states: Idle and Selecting. Pointer-down anchors a range and enters
//! Selecting; pointer-move updates only the focus; pointer-up returns to
//! Idle without touching the recorded range. Coordinates are 0-indexed grid
//! positions; hit-testing pointer positions onto cells is the host's job.

use crate::events::{EventBus, ViewerEvent};
use crate::format::format_cell_value;
use crate::types::{CellRecord, SheetRecord};

/// Selection state machine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionPhase {
    #[default]
    Idle,
    Selecting,
}

/// Per-cell serializer used when extracting a selection.
pub type CellFormatter<'a> = &'a dyn Fn(&CellRecord) -> String;

/// Tracks the anchor/focus range and the selected cell.
#[derive(Debug, Default)]
pub struct SelectionController {
    phase: SelectionPhase,
    anchor: Option<(u32, u32)>,
    focus: Option<(u32, u32)>,
    selected: Option<(u32, u32)>,
}

impl SelectionController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn phase(&self) -> SelectionPhase {
        self.phase
    }

    /// Whether a drag selection is in progress.
    #[must_use]
    pub fn is_selecting(&self) -> bool {
        self.phase == SelectionPhase::Selecting
    }

    /// The cell recorded by the last pointer-down or `select_cell`.
    #[must_use]
    pub fn selected_cell(&self) -> Option<(u32, u32)> {
        self.selected
    }

    /// The raw anchor/focus pair, un-normalized.
    #[must_use]
    pub fn range(&self) -> Option<((u32, u32), (u32, u32))> {
        Some((self.anchor?, self.focus?))
    }

    /// Pointer-down over a valid grid cell: enter Selecting with the cell as
    /// anchor, focus, and selected cell.
    pub fn pointer_down(&mut self, row: u32, col: u32, bus: &mut EventBus) {
        self.phase = SelectionPhase::Selecting;
        self.anchor = Some((row, col));
        self.focus = Some((row, col));
        self.selected = Some((row, col));
        bus.emit(&ViewerEvent::CellSelect { row, col });
    }

    /// Pointer-move over a valid cell while Selecting: update the focus
    /// only. Ignored in Idle.
    pub fn pointer_move(&mut self, row: u32, col: u32) {
        if self.phase != SelectionPhase::Selecting || self.anchor.is_none() {
            return;
        }
        self.focus = Some((row, col));
    }

    /// Pointer-up: return to Idle; the recorded range stays.
    pub fn pointer_up(&mut self) {
        self.phase = SelectionPhase::Idle;
    }

    /// Directly select one cell, bypassing the drag machinery.
    pub fn select_cell(&mut self, row: u32, col: u32, bus: &mut EventBus) {
        self.anchor = Some((row, col));
        self.focus = Some((row, col));
        self.selected = Some((row, col));
        bus.emit(&ViewerEvent::CellSelect { row, col });
    }

    /// Whether the given cell is the selected cell.
    #[must_use]
    pub fn is_cell_selected(&self, row: u32, col: u32) -> bool {
        self.selected == Some((row, col))
    }

    /// Normalized bounds of the range: (min_row, min_col, max_row, max_col).
    #[must_use]
    pub fn bounds(&self) -> Option<(u32, u32, u32, u32)> {
        let (anchor, focus) = (self.anchor?, self.focus?);
        Some((
            anchor.0.min(focus.0),
            anchor.1.min(focus.1),
            anchor.0.max(focus.0),
            anchor.1.max(focus.1),
        ))
    }

    /// Whether a coordinate falls inside the normalized range.
    #[must_use]
    pub fn contains(&self, row: u32, col: u32) -> bool {
        let Some((min_row, min_col, max_row, max_col)) = self.bounds() else {
            return false;
        };
        row >= min_row && row <= max_row && col >= min_col && col <= max_col
    }

    /// Serialize the selected rectangle from the sheet: columns joined by
    /// tabs, rows by newlines. Cells outside the grid contribute empty
    /// fields. The default formatter is the raw stringified value.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn selection_text(&self, sheet: &SheetRecord, formatter: Option<CellFormatter>) -> String {
        let Some((min_row, min_col, max_row, max_col)) = self.bounds() else {
            return String::new();
        };

        let mut lines = Vec::with_capacity((max_row - min_row + 1) as usize);
        for row in min_row..=max_row {
            let mut fields = Vec::with_capacity((max_col - min_col + 1) as usize);
            for col in min_col..=max_col {
                let field = match sheet.cell_at(row, col) {
                    Some(cell) => match formatter {
                        Some(format) => format(cell),
                        None => cell.value().to_raw_string(),
                    },
                    None => String::new(),
                };
                fields.push(field);
            }
            lines.push(fields.join("\t"));
        }
        lines.join("\n")
    }

    /// Serialize using the format engine's display rendering.
    #[must_use]
    pub fn selection_display_text(&self, sheet: &SheetRecord) -> String {
        self.selection_text(sheet, Some(&format_cell_value))
    }

    /// Reset anchor, focus, selected cell, and phase.
    pub fn clear_selection(&mut self) {
        self.anchor = None;
        self.focus = None;
        self.selected = None;
        self.phase = SelectionPhase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drag_state_machine() {
        let mut bus = EventBus::new();
        let mut sel = SelectionController::new();
        assert!(!sel.is_selecting());

        sel.pointer_down(5, 5, &mut bus);
        assert!(sel.is_selecting());
        assert_eq!(sel.selected_cell(), Some((5, 5)));

        sel.pointer_move(2, 8);
        assert_eq!(sel.range(), Some(((5, 5), (2, 8))));
        // Anchor and selected cell stay put during the drag
        assert_eq!(sel.selected_cell(), Some((5, 5)));

        sel.pointer_up();
        assert!(!sel.is_selecting());
        assert_eq!(sel.range(), Some(((5, 5), (2, 8))));
    }

    #[test]
    fn test_move_ignored_when_idle() {
        let mut sel = SelectionController::new();
        sel.pointer_move(3, 3);
        assert_eq!(sel.range(), None);
    }

    #[test]
    fn test_normalized_bounds() {
        let mut bus = EventBus::new();
        let mut sel = SelectionController::new();
        sel.pointer_down(5, 5, &mut bus);
        sel.pointer_move(2, 8);
        assert_eq!(sel.bounds(), Some((2, 5, 5, 8)));
        assert!(sel.contains(2, 5));
        assert!(sel.contains(5, 8));
        assert!(sel.contains(3, 6));
        assert!(!sel.contains(1, 6));
        assert!(!sel.contains(3, 9));
    }

    #[test]
    fn test_clear_selection() {
        let mut bus = EventBus::new();
        let mut sel = SelectionController::new();
        sel.pointer_down(1, 1, &mut bus);
        sel.clear_selection();
        assert_eq!(sel.range(), None);
        assert_eq!(sel.selected_cell(), None);
        assert!(!sel.is_selecting());
        assert!(!sel.contains(1, 1));
    }
}
