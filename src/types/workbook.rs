use serde::{Deserialize, Serialize};

use super::CellRecord;

/// 1-based, inclusive bounds of a sheet's populated rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dimensions {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

impl Dimensions {
    /// Number of rows covered by the rectangle.
    #[must_use]
    pub fn row_count(&self) -> u32 {
        self.bottom.saturating_sub(self.top) + 1
    }

    /// Number of columns covered by the rectangle.
    #[must_use]
    pub fn col_count(&self) -> u32 {
        self.right.saturating_sub(self.left) + 1
    }
}

/// A single worksheet: a row-major grid of cells.
///
/// Insertion order is row/column order; `rows[0][0]` is the top-left cell of
/// the dimension rectangle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetRecord {
    pub name: String,
    pub rows: Vec<Vec<CellRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
}

impl SheetRecord {
    /// Create an empty sheet with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
            dimensions: None,
        }
    }

    /// Cell at 0-indexed grid coordinates, if populated.
    #[must_use]
    pub fn cell_at(&self, row: u32, col: u32) -> Option<&CellRecord> {
        self.rows.get(row as usize)?.get(col as usize)
    }

    /// Mutable cell access for in-crate grid fixups.
    pub(crate) fn cell_at_mut(&mut self, row: u32, col: u32) -> Option<&mut CellRecord> {
        self.rows.get_mut(row as usize)?.get_mut(col as usize)
    }

    /// Number of grid rows.
    #[must_use]
    pub fn row_count(&self) -> u32 {
        u32::try_from(self.rows.len()).unwrap_or(u32::MAX)
    }

    /// Widest grid row (rows may be ragged for delimited input).
    #[must_use]
    pub fn col_count(&self) -> u32 {
        let widest = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        u32::try_from(widest).unwrap_or(u32::MAX)
    }
}

/// The canonical workbook: an ordered sheet list plus the active index.
///
/// Created atomically by the parsing strategy layer and treated as immutable
/// by the format engine and the controllers. The host replaces it wholesale
/// on a new load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkbookRecord {
    pub sheets: Vec<SheetRecord>,
    /// 0-based; always a valid index unless the sheet list is empty.
    pub active_sheet_index: usize,
}

impl WorkbookRecord {
    /// The currently active sheet, if any sheets exist.
    #[must_use]
    pub fn active_sheet(&self) -> Option<&SheetRecord> {
        self.sheets.get(self.active_sheet_index)
    }
}

/// Read-only facts derived from a completed parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseMetadata {
    pub file_name: String,
    /// Input size in bytes.
    pub file_size: usize,
    pub sheet_count: usize,
    /// Wall-clock decode time in milliseconds.
    pub parse_time_ms: f64,
}

/// A successful parse: the workbook plus its metadata. Never partial.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResult {
    pub workbook: WorkbookRecord,
    pub metadata: ParseMetadata,
}
