//! XLSX container decoder.
//!
//! Walks the ZIP archive: workbook part for sheet order and names, shared
//! strings (plain and rich-text runs), the stylesheet, then each worksheet
//! part. Every cell inside a sheet's dimension rectangle becomes a
//! `CellRecord`; declared merge ranges are reconciled onto the grid in
//! declaration order.

use log::warn;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{BufReader, Cursor, Read, Seek};
use zip::ZipArchive;

use super::styles::{parse_styles_part, StyleTable};
use super::FormatStrategy;
use crate::cell_ref::{cell_address, parse_cell_range, parse_cell_ref};
use crate::error::{Result, SheetviewError};
use crate::types::{
    CellRecord, CellValue, DateValue, Dimensions, FontStyle, FormulaResult, MergeState,
    RichTextRun, SheetRecord, WorkbookRecord,
};

/// Strategy for the XLSX ZIP/XML container. Claims both `.xlsx` and `.xls`;
/// a legacy non-ZIP `.xls` payload fails with a parse error.
pub struct XlsxStrategy;

impl FormatStrategy for XlsxStrategy {
    fn can_parse(&self, file_name: &str) -> bool {
        let lower = file_name.to_ascii_lowercase();
        lower.ends_with(".xlsx") || lower.ends_with(".xls")
    }

    fn decode(&self, data: &[u8]) -> Result<WorkbookRecord> {
        decode_workbook(data)
    }
}

/// A shared-string table entry.
enum SharedEntry {
    Plain(String),
    Rich(Vec<RichTextRun>),
}

/// Sheet metadata from xl/workbook.xml.
struct SheetEntry {
    name: String,
    path: String,
}

/// Cell type tag from the `t` attribute of a `<c>` element.
#[derive(Debug, Clone, Copy)]
enum TypeTag {
    Shared,
    Inline,
    Str,
    Bool,
    Error,
    /// No tag: number, or date when the style's format says so.
    Number,
}

fn parse_type_tag(value: &[u8]) -> TypeTag {
    match value {
        b"s" => TypeTag::Shared,
        b"inlineStr" => TypeTag::Inline,
        b"str" => TypeTag::Str,
        b"b" => TypeTag::Bool,
        b"e" => TypeTag::Error,
        _ => TypeTag::Number,
    }
}

/// One `<c>` element before model conversion.
struct RawCell {
    tag: TypeTag,
    style_idx: Option<u32>,
    value: Option<String>,
    formula: Option<String>,
}

fn decode_workbook(data: &[u8]) -> Result<WorkbookRecord> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;

    let entries = parse_sheet_entries(&mut archive)?;
    if entries.is_empty() {
        return Err(SheetviewError::Parse("workbook has no sheets".to_string()));
    }

    let shared_strings = parse_shared_strings(&mut archive)?;
    let style_table = parse_styles_part(&mut archive)?;

    let mut sheets = Vec::with_capacity(entries.len());
    for entry in &entries {
        sheets.push(parse_sheet(
            &mut archive,
            entry,
            &shared_strings,
            &style_table,
        )?);
    }

    Ok(WorkbookRecord {
        sheets,
        active_sheet_index: 0,
    })
}

/// Relationship id -> part path, from xl/_rels/workbook.xml.rels.
fn parse_workbook_rels<R: Read + Seek>(archive: &mut ZipArchive<R>) -> HashMap<String, String> {
    let mut rels = HashMap::new();
    let Ok(file) = archive.by_name("xl/_rels/workbook.xml.rels") else {
        return rels;
    };

    let mut xml = Reader::from_reader(BufReader::new(file));
    xml.trim_text(true);
    let mut buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e) | Event::Empty(ref e)) => {
                if e.local_name().as_ref() == b"Relationship" {
                    let mut id = None;
                    let mut target = None;
                    for attr in e.attributes().flatten() {
                        match attr.key.local_name().as_ref() {
                            b"Id" => id = utf8_attr(&attr.value),
                            b"Target" => target = utf8_attr(&attr.value),
                            _ => {}
                        }
                    }
                    if let (Some(id), Some(target)) = (id, target) {
                        rels.insert(id, normalize_part_path(&target));
                    }
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    rels
}

/// Targets are relative to xl/ unless rooted with a leading slash.
fn normalize_part_path(target: &str) -> String {
    if let Some(rooted) = target.strip_prefix('/') {
        rooted.to_string()
    } else {
        format!("xl/{target}")
    }
}

fn parse_sheet_entries<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Vec<SheetEntry>> {
    let rels = parse_workbook_rels(archive);

    let file = archive
        .by_name("xl/workbook.xml")
        .map_err(|_| SheetviewError::Parse("missing xl/workbook.xml".to_string()))?;
    let mut xml = Reader::from_reader(BufReader::new(file));
    xml.trim_text(true);

    let mut entries = Vec::new();
    let mut buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e) | Event::Empty(ref e)) => {
                if e.local_name().as_ref() == b"sheet" {
                    let mut name = None;
                    let mut rel_id = None;
                    for attr in e.attributes().flatten() {
                        match attr.key.local_name().as_ref() {
                            b"name" => name = utf8_attr(&attr.value),
                            b"id" => rel_id = utf8_attr(&attr.value),
                            _ => {}
                        }
                    }
                    let Some(name) = name else { continue };
                    let path = rel_id
                        .and_then(|id| rels.get(&id).cloned())
                        .unwrap_or_else(|| {
                            format!("xl/worksheets/sheet{}.xml", entries.len() + 1)
                        });
                    entries.push(SheetEntry { name, path });
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }
    Ok(entries)
}

/// Parse xl/sharedStrings.xml; a missing part yields an empty table.
fn parse_shared_strings<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Vec<SharedEntry>> {
    let Ok(file) = archive.by_name("xl/sharedStrings.xml") else {
        return Ok(Vec::new());
    };
    let mut xml = Reader::from_reader(BufReader::new(file));
    xml.trim_text(false);

    let mut entries = Vec::new();
    let mut plain = String::new();
    let mut runs: Vec<RichTextRun> = Vec::new();
    let mut run_text = String::new();
    let mut run_font: Option<FontStyle> = None;
    let mut in_si = false;
    let mut in_run = false;
    let mut in_text = false;

    let mut buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf) {
            Ok(ref event @ (Event::Start(ref e) | Event::Empty(ref e))) => {
                let is_empty = matches!(event, Event::Empty(_));
                match e.local_name().as_ref() {
                    b"si" => {
                        in_si = true;
                        plain.clear();
                        runs.clear();
                    }
                    b"r" if in_si => {
                        in_run = true;
                        run_text.clear();
                        run_font = None;
                        if is_empty {
                            in_run = false;
                        }
                    }
                    b"t" if in_si && !is_empty => in_text = true,
                    b"b" if in_run => {
                        run_font.get_or_insert_with(FontStyle::default).bold = true;
                    }
                    b"i" if in_run => {
                        run_font.get_or_insert_with(FontStyle::default).italic = true;
                    }
                    b"u" if in_run => {
                        run_font.get_or_insert_with(FontStyle::default).underline = true;
                    }
                    b"strike" if in_run => {
                        run_font.get_or_insert_with(FontStyle::default).strike = true;
                    }
                    b"sz" if in_run => {
                        run_font.get_or_insert_with(FontStyle::default).size =
                            named_attr(e, b"val").and_then(|v| v.parse().ok());
                    }
                    b"rFont" if in_run => {
                        run_font.get_or_insert_with(FontStyle::default).name =
                            named_attr(e, b"val");
                    }
                    b"color" if in_run => {
                        if let Some(rgb) = named_attr(e, b"rgb") {
                            let color = if rgb.len() == 8 {
                                crate::types::ColorRef::from_argb(rgb)
                            } else {
                                crate::types::ColorRef::from_rgb(rgb)
                            };
                            run_font.get_or_insert_with(FontStyle::default).color = Some(color);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(ref t)) if in_text => {
                let text = t.unescape().map(|s| s.into_owned()).unwrap_or_default();
                if in_run {
                    run_text.push_str(&text);
                } else {
                    plain.push_str(&text);
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"r" => {
                    if in_run {
                        runs.push(RichTextRun {
                            text: std::mem::take(&mut run_text),
                            font: run_font.take(),
                        });
                        in_run = false;
                    }
                }
                b"si" => {
                    if in_si {
                        if runs.is_empty() {
                            entries.push(SharedEntry::Plain(std::mem::take(&mut plain)));
                        } else {
                            entries.push(SharedEntry::Rich(std::mem::take(&mut runs)));
                        }
                        in_si = false;
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }
    Ok(entries)
}

/// Which `<c>` child element text is currently being read.
#[derive(Clone, Copy, PartialEq)]
enum CellChild {
    Value,
    Formula,
    InlineText,
}

fn parse_sheet<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    entry: &SheetEntry,
    shared: &[SharedEntry],
    styles: &StyleTable,
) -> Result<SheetRecord> {
    let file = archive.by_name(&entry.path).map_err(|_| {
        SheetviewError::Parse(format!("missing worksheet part {}", entry.path))
    })?;
    let mut xml = Reader::from_reader(BufReader::new(file));
    xml.trim_text(false);

    // (start_row, start_col, end_row, end_col), all 0-indexed
    let mut declared: Option<(u32, u32, u32, u32)> = None;
    let mut cells: HashMap<(u32, u32), RawCell> = HashMap::new();
    let mut merges: Vec<(u32, u32, u32, u32)> = Vec::new();

    // Position fallback for cells without an explicit reference
    let mut current_row: u32 = 0;
    let mut next_col: u32 = 0;

    let mut buf = Vec::new();
    let mut cell_buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf) {
            Ok(ref event @ (Event::Start(ref e) | Event::Empty(ref e))) => {
                let is_start = matches!(event, Event::Start(_));
                match e.local_name().as_ref() {
                    b"dimension" => {
                        declared = named_attr(e, b"ref")
                            .as_deref()
                            .and_then(parse_cell_range)
                            .map(|(sr, sc, er, ec)| (sr, sc, er.max(sr), ec.max(sc)));
                    }
                    b"row" => {
                        // 1-based row number; unnumbered rows follow the previous one
                        current_row = named_attr(e, b"r")
                            .and_then(|v| v.parse::<u32>().ok())
                            .unwrap_or(current_row + 1)
                            .max(1);
                        next_col = 0;
                    }
                    b"c" => {
                        let mut coords = None;
                        let mut tag = TypeTag::Number;
                        let mut style_idx = None;
                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"r" => {
                                    coords = std::str::from_utf8(&attr.value)
                                        .ok()
                                        .and_then(parse_cell_ref);
                                }
                                b"t" => tag = parse_type_tag(&attr.value),
                                b"s" => {
                                    style_idx = std::str::from_utf8(&attr.value)
                                        .ok()
                                        .and_then(|s| s.parse().ok());
                                }
                                _ => {}
                            }
                        }
                        // Fall back to the running position when the
                        // reference attribute is absent
                        let (col, row) =
                            coords.unwrap_or((next_col, current_row.saturating_sub(1)));
                        next_col = col + 1;

                        let mut value: Option<String> = None;
                        let mut formula: Option<String> = None;
                        if is_start {
                            read_cell_children(&mut xml, &mut cell_buf, &mut value, &mut formula)?;
                        }

                        cells.insert(
                            (row, col),
                            RawCell {
                                tag,
                                style_idx,
                                value,
                                formula,
                            },
                        );
                    }
                    b"mergeCell" => {
                        match named_attr(e, b"ref").as_deref().and_then(parse_cell_range) {
                            Some(range) => merges.push(range),
                            None => warn!("ignoring malformed merge ref in {}", entry.name),
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }

    build_sheet(&entry.name, declared, cells, &merges, shared, styles)
}

/// Read `<v>`, `<f>`, and inline-string children until `</c>`.
fn read_cell_children<R: std::io::BufRead>(
    xml: &mut Reader<R>,
    buf: &mut Vec<u8>,
    value: &mut Option<String>,
    formula: &mut Option<String>,
) -> Result<()> {
    let mut child: Option<CellChild> = None;
    let mut in_is = false;
    loop {
        buf.clear();
        match xml.read_event_into(buf) {
            Ok(Event::Start(ref inner)) => match inner.local_name().as_ref() {
                b"v" => child = Some(CellChild::Value),
                b"f" => child = Some(CellChild::Formula),
                b"is" => in_is = true,
                b"t" if in_is => child = Some(CellChild::InlineText),
                _ => {}
            },
            Ok(Event::Text(ref t)) => {
                if let Some(child) = child {
                    let text = t.unescape().map(|s| s.into_owned()).unwrap_or_default();
                    let target = match child {
                        CellChild::Value | CellChild::InlineText => &mut *value,
                        CellChild::Formula => &mut *formula,
                    };
                    target.get_or_insert_with(String::new).push_str(&text);
                }
            }
            Ok(Event::End(ref inner)) => match inner.local_name().as_ref() {
                b"c" => break,
                b"is" => in_is = false,
                b"v" | b"f" | b"t" => child = None,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
    }
    Ok(())
}

#[allow(clippy::cast_possible_truncation)]
fn build_sheet(
    name: &str,
    declared: Option<(u32, u32, u32, u32)>,
    mut cells: HashMap<(u32, u32), RawCell>,
    merges: &[(u32, u32, u32, u32)],
    shared: &[SharedEntry],
    styles: &StyleTable,
) -> Result<SheetRecord> {
    let computed = computed_bounds(&cells);
    let Some((top, left, bottom, right)) = declared.or(computed) else {
        return Ok(SheetRecord {
            name: name.to_string(),
            rows: Vec::new(),
            dimensions: None,
        });
    };

    let mut rows = Vec::with_capacity((bottom - top + 1) as usize);
    for r in top..=bottom {
        let mut row_cells = Vec::with_capacity((right - left + 1) as usize);
        for c in left..=right {
            let address = cell_address(r + 1, c + 1);
            let record = match cells.remove(&(r, c)) {
                Some(raw) => build_cell(raw, address, shared, styles),
                None => CellRecord::empty(address),
            };
            row_cells.push(record);
        }
        rows.push(row_cells);
    }

    let mut sheet = SheetRecord {
        name: name.to_string(),
        rows,
        dimensions: Some(Dimensions {
            top: top + 1,
            bottom: bottom + 1,
            left: left + 1,
            right: right + 1,
        }),
    };
    apply_merges(&mut sheet, merges, top, left);
    Ok(sheet)
}

fn computed_bounds(cells: &HashMap<(u32, u32), RawCell>) -> Option<(u32, u32, u32, u32)> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for &(row, col) in cells.keys() {
        bounds = Some(match bounds {
            None => (row, col, row, col),
            Some((top, left, bottom, right)) => (
                top.min(row),
                left.min(col),
                bottom.max(row),
                right.max(col),
            ),
        });
    }
    bounds
}

fn build_cell(
    raw: RawCell,
    address: String,
    shared: &[SharedEntry],
    styles: &StyleTable,
) -> CellRecord {
    let style = styles.style_for(raw.style_idx);
    let is_date = styles.is_date_style(raw.style_idx);

    let value = if let Some(formula) = raw.formula.clone() {
        let result = raw
            .value
            .as_deref()
            .map(|v| typed_result(v, raw.tag, is_date, shared));
        CellValue::Formula { formula, result }
    } else {
        plain_value(raw.value, raw.tag, is_date, shared)
    };

    CellRecord::new(value, address)
        .with_style(style)
        .with_formula(raw.formula)
}

fn shared_lookup(index_text: &str, shared: &[SharedEntry]) -> CellValue {
    let entry = index_text
        .parse::<usize>()
        .ok()
        .and_then(|idx| shared.get(idx));
    match entry {
        Some(SharedEntry::Plain(text)) => CellValue::Text(text.clone()),
        Some(SharedEntry::Rich(runs)) => CellValue::RichText { runs: runs.clone() },
        None => {
            warn!("shared string index {index_text} out of range");
            CellValue::Text(String::new())
        }
    }
}

fn plain_value(
    value: Option<String>,
    tag: TypeTag,
    is_date: bool,
    shared: &[SharedEntry],
) -> CellValue {
    let Some(v) = value else {
        return CellValue::Empty;
    };
    match tag {
        TypeTag::Shared => shared_lookup(&v, shared),
        TypeTag::Inline | TypeTag::Str => CellValue::Text(v),
        TypeTag::Bool => CellValue::Bool(v == "1" || v == "true"),
        // An error literal without a formula displays as text
        TypeTag::Error => CellValue::Text(v),
        TypeTag::Number => match v.parse::<f64>() {
            Ok(n) if is_date => CellValue::Date(DateValue::Serial(n)),
            Ok(n) => CellValue::Number(n),
            Err(_) => CellValue::Text(v),
        },
    }
}

fn typed_result(v: &str, tag: TypeTag, is_date: bool, shared: &[SharedEntry]) -> FormulaResult {
    match tag {
        TypeTag::Bool => FormulaResult::Bool(v == "1" || v == "true"),
        TypeTag::Error => FormulaResult::Error(v.to_string()),
        TypeTag::Inline | TypeTag::Str => FormulaResult::Text(v.to_string()),
        TypeTag::Shared => match shared_lookup(v, shared) {
            CellValue::Text(text) => FormulaResult::Text(text),
            CellValue::RichText { runs } => {
                FormulaResult::Text(runs.iter().map(|r| r.text.as_str()).collect())
            }
            _ => FormulaResult::Text(String::new()),
        },
        TypeTag::Number => match v.parse::<f64>() {
            Ok(n) if is_date => FormulaResult::Date(DateValue::Serial(n)),
            Ok(n) => FormulaResult::Number(n),
            Err(_) => FormulaResult::Text(v.to_string()),
        },
    }
}

/// Reconcile declared merge ranges onto the grid.
///
/// Ranges apply in declaration order; when ranges overlap, the
/// later-processed range overwrites the earlier assignment on contested
/// cells, which makes overlap resolution deterministic. Master
/// back-references use absolute 0-indexed sheet coordinates.
fn apply_merges(sheet: &mut SheetRecord, merges: &[(u32, u32, u32, u32)], top: u32, left: u32) {
    for &(start_row, start_col, end_row, end_col) in merges {
        if end_row < start_row || end_col < start_col {
            warn!("ignoring inverted merge range in {}", sheet.name);
            continue;
        }
        let rowspan = end_row - start_row + 1;
        let colspan = end_col - start_col + 1;

        for r in start_row..=end_row {
            for c in start_col..=end_col {
                let (Some(grid_row), Some(grid_col)) = (r.checked_sub(top), c.checked_sub(left))
                else {
                    continue;
                };
                let Some(cell) = sheet.cell_at_mut(grid_row, grid_col) else {
                    continue;
                };

                let state = if r == start_row && c == start_col {
                    MergeState::Master { rowspan, colspan }
                } else {
                    MergeState::Hidden {
                        master_row: start_row,
                        master_col: start_col,
                    }
                };
                cell.set_merge(Some(state));
            }
        }
    }
}

fn utf8_attr(value: &[u8]) -> Option<String> {
    std::str::from_utf8(value).ok().map(str::to_string)
}

fn named_attr(e: &quick_xml::events::BytesStart<'_>, key: &[u8]) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == key {
            return utf8_attr(&attr.value);
        }
    }
    None
}
