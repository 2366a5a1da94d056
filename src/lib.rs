//! sheetview - spreadsheet ingestion and grid-presentation core
//!
//! Parses spreadsheet files (XLSX container, delimited CSV) into one
//! canonical grid model and supports interactive presentation of very large
//! grids:
//! - Format strategy dispatch with a fixed parse template and lifecycle
//!   notifications
//! - Merged-cell reconciliation and CSV type inference
//! - A value/style formatting engine (display strings, semantic tags,
//!   CSS-free visual attributes)
//! - Debounced virtual-scroll viewport and pointer-driven range selection
//!
//! # Usage
//!
//! ```no_run
//! use sheetview::SheetViewer;
//!
//! let mut viewer = SheetViewer::new();
//! let bytes = std::fs::read("report.xlsx")?;
//! let result = viewer.load_file(&bytes, "report.xlsx")?;
//! println!("{} sheets", result.metadata.sheet_count);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cell_ref;
pub mod error;
pub mod events;
pub mod format;
pub mod parser;
pub mod types;
pub mod viewer;

pub use error::{Result, SheetviewError};
pub use events::{EventBus, EventCollector, EventKind, SubscriptionId, ViewerEvent};
pub use format::{classify, format_cell_value, visual_style, CellTag, VisualStyle};
pub use parser::{now_ms, CsvStrategy, FormatStrategy, ParserRegistry, XlsxStrategy};
pub use types::*;
pub use viewer::{
    LoaderConfig, ScrollState, SelectionController, SheetViewer, ViewportController,
    VisibleRange,
};

/// Get the library version
#[must_use]
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
