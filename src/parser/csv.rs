//! Delimited-text (CSV) decoder.
//!
//! Quoting follows RFC 4180: a quoted field may contain embedded newlines
//! and commas, and a doubled quote inside a quoted field is a literal quote
//! character. Produces a single sheet named `Sheet1` with the same address
//! numbering as the container format.

use super::FormatStrategy;
use crate::cell_ref::cell_address;
use crate::error::Result;
use crate::types::{CellRecord, CellValue, Dimensions, SheetRecord, WorkbookRecord};

/// Strategy for `.csv` files.
pub struct CsvStrategy;

impl FormatStrategy for CsvStrategy {
    fn can_parse(&self, file_name: &str) -> bool {
        file_name.to_ascii_lowercase().ends_with(".csv")
    }

    fn decode(&self, data: &[u8]) -> Result<WorkbookRecord> {
        decode_csv(data)
    }
}

fn decode_csv(data: &[u8]) -> Result<WorkbookRecord> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);

    let mut rows: Vec<Vec<CellRecord>> = Vec::new();
    let mut widest = 0usize;

    for record in reader.records() {
        let record = record?;
        let row_index = rows.len();
        let mut row = Vec::with_capacity(record.len());
        for (col_index, field) in record.iter().enumerate() {
            let address = cell_address(
                u32::try_from(row_index + 1).unwrap_or(u32::MAX),
                u32::try_from(col_index + 1).unwrap_or(u32::MAX),
            );
            row.push(CellRecord::new(infer_value(field), address));
        }
        widest = widest.max(row.len());
        rows.push(row);
    }

    let dimensions = if rows.is_empty() {
        None
    } else {
        Some(Dimensions {
            top: 1,
            bottom: u32::try_from(rows.len()).unwrap_or(u32::MAX),
            left: 1,
            right: u32::try_from(widest.max(1)).unwrap_or(u32::MAX),
        })
    };

    let sheet = SheetRecord {
        name: "Sheet1".to_string(),
        rows,
        dimensions,
    };

    Ok(WorkbookRecord {
        sheets: vec![sheet],
        active_sheet_index: 0,
    })
}

/// Infer a field's value and type.
///
/// Empty fields stay empty strings of type `string`. Non-empty fields first
/// try a leading-numeric parse: the longest numeric prefix wins, so
/// `"3.14abc"` becomes the number 3.14. That permissive policy is
/// intentional and preserved as-is. Failing that, case-insensitive
/// `true`/`false` become booleans, and everything else is the trimmed text.
fn infer_value(field: &str) -> CellValue {
    if field.is_empty() {
        return CellValue::Text(String::new());
    }

    if let Some(number) = parse_leading_number(field) {
        return CellValue::Number(number);
    }

    let trimmed = field.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        return CellValue::Bool(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return CellValue::Bool(false);
    }

    CellValue::Text(trimmed.to_string())
}

/// Parse the longest valid numeric prefix of the input: optional sign,
/// decimal digits with at most one point, optional exponent. Whitespace-only
/// input never parses.
fn parse_leading_number(field: &str) -> Option<f64> {
    let text = field.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0usize;
    let mut seen_digit = false;
    let mut seen_dot = false;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    while let Some(&b) = bytes.get(end) {
        if b.is_ascii_digit() {
            seen_digit = true;
            end += 1;
        } else if b == b'.' && !seen_dot {
            seen_dot = true;
            end += 1;
        } else {
            break;
        }
    }
    if !seen_digit {
        return None;
    }

    // Optional exponent; only consumed when complete
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let digits_start = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > digits_start {
            end = exp_end;
        }
    }

    text.get(..end).and_then(|prefix| prefix.parse().ok())
}
