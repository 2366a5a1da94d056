use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::{FontStyle, StyleDescriptor};

/// A date captured from the source, in whichever form it arrived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DateValue {
    /// Spreadsheet serial day-count (days since the 1899-12-30 epoch).
    Serial(f64),
    /// A resolved calendar timestamp.
    Timestamp(NaiveDateTime),
    /// A date-shaped string not yet parsed.
    Text(String),
}

/// A formula's cached result, typed for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FormulaResult {
    Number(f64),
    Date(DateValue),
    Text(String),
    Bool(bool),
    /// Error literal such as `#DIV/0!` or `#REF!`.
    Error(String),
}

/// One run of rich text with optional run-level font overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RichTextRun {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<FontStyle>,
}

/// The closed set of values a cell can hold.
///
/// Every formatting and classification branch switches exhaustively over
/// this variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CellValue {
    /// An unpopulated cell inside the sheet's dimension rectangle.
    Empty,
    Number(f64),
    Bool(bool),
    Text(String),
    Date(DateValue),
    Formula {
        formula: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<FormulaResult>,
    },
    RichText {
        runs: Vec<RichTextRun>,
    },
}

impl CellValue {
    /// The type tag matching this variant.
    #[must_use]
    pub fn cell_type(&self) -> CellType {
        match self {
            CellValue::Empty => CellType::Default,
            CellValue::Number(_) => CellType::Number,
            CellValue::Bool(_) => CellType::Boolean,
            CellValue::Text(_) => CellType::String,
            CellValue::Date(_) => CellType::Date,
            CellValue::Formula { .. } => CellType::Formula,
            CellValue::RichText { .. } => CellType::RichText,
        }
    }

    /// Raw stringification without pattern-driven formatting.
    ///
    /// This is the default serializer for selection extraction; display
    /// formatting lives in the format engine.
    #[must_use]
    pub fn to_raw_string(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Number(n) => crate::format::plain_number_string(*n),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Text(s) => s.clone(),
            CellValue::Date(DateValue::Serial(n)) => crate::format::plain_number_string(*n),
            CellValue::Date(DateValue::Timestamp(ts)) => ts.to_string(),
            CellValue::Date(DateValue::Text(s)) => s.clone(),
            CellValue::Formula { formula, result } => match result {
                Some(FormulaResult::Number(n)) => crate::format::plain_number_string(*n),
                Some(FormulaResult::Text(s)) => s.clone(),
                Some(FormulaResult::Bool(b)) => b.to_string(),
                Some(FormulaResult::Error(e)) => e.clone(),
                Some(FormulaResult::Date(DateValue::Serial(n))) => {
                    crate::format::plain_number_string(*n)
                }
                Some(FormulaResult::Date(DateValue::Timestamp(ts))) => ts.to_string(),
                Some(FormulaResult::Date(DateValue::Text(s))) => s.clone(),
                None => format!("={formula}"),
            },
            CellValue::RichText { runs } => runs.iter().map(|r| r.text.as_str()).collect(),
        }
    }
}

/// Cell type tag. Always matches the active `CellValue` variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    Number,
    Boolean,
    Date,
    String,
    Formula,
    #[serde(rename = "richtext")]
    RichText,
    Default,
}

/// Merge participation of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MergeState {
    /// Top-left cell of a merge region; carries the spans.
    Master { rowspan: u32, colspan: u32 },
    /// Covered cell; hidden, with a back-reference to its master (absolute
    /// 0-indexed sheet coordinates).
    Hidden { master_row: u32, master_col: u32 },
}

/// A pure style transform: receives the current snapshot, returns a new one.
///
/// Transforms are stateless and shareable; cloning a cell shares the
/// transform list by reference.
pub type StyleTransform = Arc<dyn Fn(StyleDescriptor) -> StyleDescriptor + Send + Sync>;

/// A single cell of the canonical grid.
///
/// `value`, `cell_type`, and `address` are set at construction and the type
/// tag is derived from the value, so the tag/variant invariant holds
/// structurally.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellRecord {
    value: CellValue,
    #[serde(rename = "type")]
    cell_type: CellType,
    #[serde(skip_serializing_if = "Option::is_none")]
    style: Option<StyleDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    formula: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    merge: Option<MergeState>,
    address: String,
    #[serde(skip, default)]
    transforms: Vec<StyleTransform>,
}

impl CellRecord {
    /// Create a cell; the type tag is derived from the value.
    #[must_use]
    pub fn new(value: CellValue, address: impl Into<String>) -> Self {
        let cell_type = value.cell_type();
        Self {
            value,
            cell_type,
            style: None,
            formula: None,
            merge: None,
            address: address.into(),
            transforms: Vec::new(),
        }
    }

    /// Create an empty (type `default`) cell at the given address.
    #[must_use]
    pub fn empty(address: impl Into<String>) -> Self {
        Self::new(CellValue::Empty, address)
    }

    /// Attach the base style snapshot.
    #[must_use]
    pub fn with_style(mut self, style: Option<StyleDescriptor>) -> Self {
        self.style = style;
        self
    }

    /// Attach the formula source text.
    #[must_use]
    pub fn with_formula(mut self, formula: Option<String>) -> Self {
        self.formula = formula;
        self
    }

    pub fn value(&self) -> &CellValue {
        &self.value
    }

    pub fn cell_type(&self) -> CellType {
        self.cell_type
    }

    /// The base style snapshot, without transforms applied.
    pub fn style(&self) -> Option<&StyleDescriptor> {
        self.style.as_ref()
    }

    pub fn formula(&self) -> Option<&str> {
        self.formula.as_deref()
    }

    /// A1-style address, unique within the sheet.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn merge(&self) -> Option<&MergeState> {
        self.merge.as_ref()
    }

    pub(crate) fn set_merge(&mut self, merge: Option<MergeState>) {
        self.merge = merge;
    }

    /// Whether this cell is the master of a merge region.
    #[must_use]
    pub fn is_merged(&self) -> bool {
        matches!(self.merge, Some(MergeState::Master { .. }))
    }

    /// Whether this cell is covered by a merge region (and thus hidden).
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        matches!(self.merge, Some(MergeState::Hidden { .. }))
    }

    /// Row/column spans; (1, 1) for non-master cells.
    #[must_use]
    pub fn spans(&self) -> (u32, u32) {
        match self.merge {
            Some(MergeState::Master { rowspan, colspan }) => (rowspan, colspan),
            _ => (1, 1),
        }
    }

    /// Master coordinates (absolute 0-indexed sheet coordinates) if this
    /// cell is merge-covered.
    #[must_use]
    pub fn master_cell(&self) -> Option<(u32, u32)> {
        match self.merge {
            Some(MergeState::Hidden {
                master_row,
                master_col,
            }) => Some((master_row, master_col)),
            _ => None,
        }
    }

    /// Register a style transform; transforms apply in registration order.
    pub fn add_transform(&mut self, transform: StyleTransform) -> &mut Self {
        self.transforms.push(transform);
        self
    }

    /// Drop all registered transforms.
    pub fn clear_transforms(&mut self) -> &mut Self {
        self.transforms.clear();
        self
    }

    pub(crate) fn transform_count(&self) -> usize {
        self.transforms.len()
    }

    /// Apply the transform chain, in registration order, to a copy of the
    /// base style. Later transforms override fields set by earlier ones; the
    /// base snapshot is never mutated.
    #[must_use]
    pub fn resolved_style(&self) -> StyleDescriptor {
        let mut style = self.style.clone().unwrap_or_default();
        for transform in &self.transforms {
            style = transform(style);
        }
        style
    }
}

impl fmt::Debug for CellRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellRecord")
            .field("value", &self.value)
            .field("cell_type", &self.cell_type)
            .field("style", &self.style)
            .field("formula", &self.formula)
            .field("merge", &self.merge)
            .field("address", &self.address)
            .field("transforms", &self.transforms.len())
            .finish()
    }
}
