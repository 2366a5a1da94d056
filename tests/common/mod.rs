//! Common test utilities and assertion helpers.
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp
)]

use sheetview::events::EventBus;
use sheetview::types::{CellRecord, ParseResult, WorkbookRecord};
use sheetview::{EventCollector, ParserRegistry};

/// Parse bytes through the default registry, collecting every event.
pub fn parse_with_events(
    data: &[u8],
    file_name: &str,
) -> (sheetview::Result<ParseResult>, EventCollector) {
    let registry = ParserRegistry::with_default_strategies();
    let mut bus = EventBus::new();
    let collector = EventCollector::new();
    bus.on_any(collector.handle());
    let result = registry.parse(data, file_name, &mut bus);
    (result, collector)
}

/// Parse bytes through the default registry, panicking on failure.
pub fn parse_ok(data: &[u8], file_name: &str) -> WorkbookRecord {
    let (result, _) = parse_with_events(data, file_name);
    result.expect("parse should succeed").workbook
}

/// Cell at 0-indexed grid coordinates, panicking when absent.
pub fn cell<'a>(workbook: &'a WorkbookRecord, sheet: usize, row: u32, col: u32) -> &'a CellRecord {
    workbook.sheets[sheet]
        .cell_at(row, col)
        .unwrap_or_else(|| panic!("no cell at ({row}, {col}) in sheet {sheet}"))
}
