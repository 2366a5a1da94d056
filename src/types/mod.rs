//! Canonical model types shared by every component.
//!
//! The parsing strategy layer builds these; the format engine and the
//! viewport/selection controllers only ever read them.

mod cell;
mod style;
mod workbook;

pub use cell::{
    CellRecord, CellType, CellValue, DateValue, FormulaResult, MergeState, RichTextRun,
    StyleTransform,
};
pub use style::{
    Alignment, BorderEdge, BorderSet, BorderStyle, ColorRef, Fill, FontStyle, GradientStop,
    HAlign, PatternKind, StyleDescriptor, VAlign,
};
pub use workbook::{Dimensions, ParseMetadata, ParseResult, SheetRecord, WorkbookRecord};
