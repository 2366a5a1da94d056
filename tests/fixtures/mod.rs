//! Test fixtures for generating valid XLSX files in memory.
//!
//! Builders for creating XLSX archives programmatically, so parser tests
//! run against known inputs without binary fixtures on disk.
//!
//! # Example
//!
//! ```ignore
//! let xlsx = XlsxBuilder::new()
//!     .sheet(
//!         SheetBuilder::new("Sheet1")
//!             .cell("A1", "Hello", None)
//!             .cell("B1", 42.0, Some(StyleBuilder::new().bold().build()))
//!             .merge("A1:B1"),
//!     )
//!     .build();
//! ```
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::cast_possible_truncation,
    clippy::float_cmp
)]

use std::collections::HashMap;
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

// ============================================================================
// Style Builder
// ============================================================================

/// A cell style as written into styles.xml.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixtureStyle {
    pub font_name: Option<String>,
    pub font_size: Option<f64>,
    pub font_color: Option<String>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,

    pub bg_color: Option<String>,
    pub gradient_stops: Vec<(f64, String)>,

    pub align_horizontal: Option<String>,
    pub align_vertical: Option<String>,
    pub wrap_text: bool,
    pub indent: Option<u32>,

    pub number_format: Option<String>,
}

/// Builder for creating cell styles.
#[derive(Debug, Clone, Default)]
pub struct StyleBuilder {
    style: FixtureStyle,
}

impl StyleBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn font_name(mut self, name: &str) -> Self {
        self.style.font_name = Some(name.to_string());
        self
    }

    #[must_use]
    pub fn font_size(mut self, size: f64) -> Self {
        self.style.font_size = Some(size);
        self
    }

    /// Font color as RRGGBB or AARRGGBB hex (no leading #).
    #[must_use]
    pub fn font_color(mut self, color: &str) -> Self {
        self.style.font_color = Some(normalize_color(color));
        self
    }

    #[must_use]
    pub fn bold(mut self) -> Self {
        self.style.bold = true;
        self
    }

    #[must_use]
    pub fn italic(mut self) -> Self {
        self.style.italic = true;
        self
    }

    #[must_use]
    pub fn underline(mut self) -> Self {
        self.style.underline = true;
        self
    }

    #[must_use]
    pub fn strikethrough(mut self) -> Self {
        self.style.strikethrough = true;
        self
    }

    /// Solid pattern fill color as RRGGBB or AARRGGBB hex.
    #[must_use]
    pub fn bg_color(mut self, color: &str) -> Self {
        self.style.bg_color = Some(normalize_color(color));
        self
    }

    /// Gradient fill stops: (position, AARRGGBB).
    #[must_use]
    pub fn gradient(mut self, stops: &[(f64, &str)]) -> Self {
        self.style.gradient_stops = stops
            .iter()
            .map(|(pos, color)| (*pos, normalize_color(color)))
            .collect();
        self
    }

    #[must_use]
    pub fn align_horizontal(mut self, align: &str) -> Self {
        self.style.align_horizontal = Some(align.to_string());
        self
    }

    #[must_use]
    pub fn align_vertical(mut self, align: &str) -> Self {
        self.style.align_vertical = Some(align.to_string());
        self
    }

    #[must_use]
    pub fn wrap_text(mut self) -> Self {
        self.style.wrap_text = true;
        self
    }

    #[must_use]
    pub fn indent(mut self, indent: u32) -> Self {
        self.style.indent = Some(indent);
        self
    }

    #[must_use]
    pub fn number_format(mut self, code: &str) -> Self {
        self.style.number_format = Some(code.to_string());
        self
    }

    #[must_use]
    pub fn build(self) -> FixtureStyle {
        self.style
    }
}

/// Strip a leading '#' and uppercase; keeps 6- or 8-digit codes as given.
fn normalize_color(color: &str) -> String {
    color.trim_start_matches('#').to_ascii_uppercase()
}

// ============================================================================
// Cell and Sheet Builders
// ============================================================================

/// A cell value as written into sheet XML.
#[derive(Debug, Clone)]
pub enum CellSpec {
    Text(String),
    Number(f64),
    Bool(bool),
    /// Formula text plus an optional cached result.
    Formula(String, Option<FormulaSpec>),
    /// Style-only cell, no content.
    Blank,
}

/// Typed formula result for fixtures.
#[derive(Debug, Clone)]
pub enum FormulaSpec {
    Number(f64),
    Text(String),
    Bool(bool),
    Error(String),
}

impl From<&str> for CellSpec {
    fn from(value: &str) -> Self {
        CellSpec::Text(value.to_string())
    }
}

impl From<String> for CellSpec {
    fn from(value: String) -> Self {
        CellSpec::Text(value)
    }
}

impl From<f64> for CellSpec {
    fn from(value: f64) -> Self {
        CellSpec::Number(value)
    }
}

impl From<bool> for CellSpec {
    fn from(value: bool) -> Self {
        CellSpec::Bool(value)
    }
}

#[derive(Debug, Clone)]
struct FixtureCell {
    cell_ref: String,
    spec: CellSpec,
    style: Option<FixtureStyle>,
}

/// Builder for one worksheet.
#[derive(Debug, Clone)]
pub struct SheetBuilder {
    name: String,
    cells: Vec<FixtureCell>,
    merges: Vec<String>,
}

impl SheetBuilder {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            cells: Vec::new(),
            merges: Vec::new(),
        }
    }

    /// Add a cell by A1 reference.
    #[must_use]
    pub fn cell(mut self, cell_ref: &str, value: impl Into<CellSpec>, style: Option<FixtureStyle>) -> Self {
        self.cells.push(FixtureCell {
            cell_ref: cell_ref.to_string(),
            spec: value.into(),
            style,
        });
        self
    }

    /// Add a style-only cell with no content.
    #[must_use]
    pub fn styled_cell(mut self, cell_ref: &str, style: FixtureStyle) -> Self {
        self.cells.push(FixtureCell {
            cell_ref: cell_ref.to_string(),
            spec: CellSpec::Blank,
            style: Some(style),
        });
        self
    }

    /// Add a formula cell with an optional cached result.
    #[must_use]
    pub fn formula(mut self, cell_ref: &str, formula: &str, result: Option<FormulaSpec>) -> Self {
        self.cells.push(FixtureCell {
            cell_ref: cell_ref.to_string(),
            spec: CellSpec::Formula(formula.to_string(), result),
            style: None,
        });
        self
    }

    /// Declare a merge range like "A1:B2".
    #[must_use]
    pub fn merge(mut self, range: &str) -> Self {
        self.merges.push(range.to_string());
        self
    }
}

// ============================================================================
// Workbook Builder
// ============================================================================

/// Builds a complete XLSX archive in memory.
#[derive(Debug, Default)]
pub struct XlsxBuilder {
    sheets: Vec<SheetBuilder>,
}

impl XlsxBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn sheet(mut self, sheet: SheetBuilder) -> Self {
        self.sheets.push(sheet);
        self
    }

    /// Serialize all parts into ZIP bytes.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        let mut shared_strings: Vec<String> = Vec::new();
        let mut shared_index: HashMap<String, usize> = HashMap::new();
        let mut styles: Vec<FixtureStyle> = Vec::new();

        // Assign shared-string and style indices up front
        let mut sheet_xmls = Vec::new();
        for sheet in &self.sheets {
            sheet_xmls.push(sheet_xml(
                sheet,
                &mut shared_strings,
                &mut shared_index,
                &mut styles,
            ));
        }

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options: FileOptions = FileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);

        write_entry(&mut zip, "[Content_Types].xml", &content_types_xml(self.sheets.len()), options);
        write_entry(&mut zip, "_rels/.rels", ROOT_RELS, options);
        write_entry(&mut zip, "xl/workbook.xml", &workbook_xml(&self.sheets), options);
        write_entry(
            &mut zip,
            "xl/_rels/workbook.xml.rels",
            &workbook_rels_xml(self.sheets.len()),
            options,
        );
        write_entry(&mut zip, "xl/styles.xml", &styles_xml(&styles), options);
        write_entry(
            &mut zip,
            "xl/sharedStrings.xml",
            &shared_strings_xml(&shared_strings),
            options,
        );
        for (i, xml) in sheet_xmls.iter().enumerate() {
            write_entry(
                &mut zip,
                &format!("xl/worksheets/sheet{}.xml", i + 1),
                xml,
                options,
            );
        }

        zip.finish().unwrap().into_inner()
    }
}

fn write_entry(zip: &mut ZipWriter<Cursor<Vec<u8>>>, name: &str, content: &str, options: FileOptions) {
    zip.start_file(name, options).unwrap();
    zip.write_all(content.as_bytes()).unwrap();
}

// ============================================================================
// Part serialization
// ============================================================================

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

fn content_types_xml(sheet_count: usize) -> String {
    let mut overrides = String::new();
    for i in 1..=sheet_count {
        overrides.push_str(&format!(
            "<Override PartName=\"/xl/worksheets/sheet{i}.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>"
        ));
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="xml" ContentType="application/xml"/>
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>
<Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>
{overrides}
</Types>"#
    )
}

fn workbook_xml(sheets: &[SheetBuilder]) -> String {
    let mut entries = String::new();
    for (i, sheet) in sheets.iter().enumerate() {
        entries.push_str(&format!(
            "<sheet name=\"{}\" sheetId=\"{}\" r:id=\"rId{}\"/>",
            escape_xml(&sheet.name),
            i + 1,
            i + 1
        ));
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets>{entries}</sheets>
</workbook>"#
    )
}

fn workbook_rels_xml(sheet_count: usize) -> String {
    let mut entries = String::new();
    for i in 1..=sheet_count {
        entries.push_str(&format!(
            "<Relationship Id=\"rId{i}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" Target=\"worksheets/sheet{i}.xml\"/>"
        ));
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{entries}</Relationships>"#
    )
}

fn shared_strings_xml(strings: &[String]) -> String {
    let mut entries = String::new();
    for s in strings {
        entries.push_str(&format!(
            "<si><t xml:space=\"preserve\">{}</t></si>",
            escape_xml(s)
        ));
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{n}" uniqueCount="{n}">{entries}</sst>"#,
        n = strings.len()
    )
}

fn styles_xml(styles: &[FixtureStyle]) -> String {
    // Custom number formats start at id 164
    let mut num_fmts = String::new();
    let mut num_fmt_ids: Vec<u32> = Vec::new();
    let mut next_fmt_id = 164u32;
    for style in styles {
        if let Some(code) = &style.number_format {
            num_fmts.push_str(&format!(
                "<numFmt numFmtId=\"{next_fmt_id}\" formatCode=\"{}\"/>",
                escape_xml(code)
            ));
            num_fmt_ids.push(next_fmt_id);
            next_fmt_id += 1;
        } else {
            num_fmt_ids.push(0);
        }
    }

    // Font 0 is the default; each style gets its own font entry
    let mut fonts = String::from("<font><sz val=\"11\"/><name val=\"Calibri\"/></font>");
    for style in styles {
        let mut font = String::from("<font>");
        if style.bold {
            font.push_str("<b/>");
        }
        if style.italic {
            font.push_str("<i/>");
        }
        if style.underline {
            font.push_str("<u/>");
        }
        if style.strikethrough {
            font.push_str("<strike/>");
        }
        if let Some(size) = style.font_size {
            font.push_str(&format!("<sz val=\"{size}\"/>"));
        }
        if let Some(name) = &style.font_name {
            font.push_str(&format!("<name val=\"{}\"/>", escape_xml(name)));
        }
        if let Some(color) = &style.font_color {
            font.push_str(&format!("<color rgb=\"{}\"/>", full_argb(color)));
        }
        font.push_str("</font>");
        fonts.push_str(&font);
    }

    // Fills 0 and 1 are the mandatory none/gray125 entries
    let mut fills = String::from(
        "<fill><patternFill patternType=\"none\"/></fill><fill><patternFill patternType=\"gray125\"/></fill>",
    );
    for style in styles {
        if !style.gradient_stops.is_empty() {
            let mut grad = String::from("<fill><gradientFill degree=\"90\">");
            for (position, color) in &style.gradient_stops {
                grad.push_str(&format!(
                    "<stop position=\"{position}\"><color rgb=\"{}\"/></stop>",
                    full_argb(color)
                ));
            }
            grad.push_str("</gradientFill></fill>");
            fills.push_str(&grad);
        } else if let Some(color) = &style.bg_color {
            fills.push_str(&format!(
                "<fill><patternFill patternType=\"solid\"><fgColor rgb=\"{}\"/></patternFill></fill>",
                full_argb(color)
            ));
        } else {
            fills.push_str("<fill><patternFill patternType=\"none\"/></fill>");
        }
    }

    // xf 0 is the default style; cells reference index + 1
    let mut cell_xfs = String::from("<xf numFmtId=\"0\" fontId=\"0\" fillId=\"0\" borderId=\"0\"/>");
    for (i, style) in styles.iter().enumerate() {
        let num_fmt_id = num_fmt_ids.get(i).copied().unwrap_or(0);
        let font_id = i + 1;
        let fill_id = i + 2;
        let has_alignment = style.align_horizontal.is_some()
            || style.align_vertical.is_some()
            || style.wrap_text
            || style.indent.is_some();
        if has_alignment {
            let mut alignment = String::from("<alignment");
            if let Some(h) = &style.align_horizontal {
                alignment.push_str(&format!(" horizontal=\"{h}\""));
            }
            if let Some(v) = &style.align_vertical {
                alignment.push_str(&format!(" vertical=\"{v}\""));
            }
            if style.wrap_text {
                alignment.push_str(" wrapText=\"1\"");
            }
            if let Some(indent) = style.indent {
                alignment.push_str(&format!(" indent=\"{indent}\""));
            }
            alignment.push_str("/>");
            cell_xfs.push_str(&format!(
                "<xf numFmtId=\"{num_fmt_id}\" fontId=\"{font_id}\" fillId=\"{fill_id}\" borderId=\"0\" applyAlignment=\"1\">{alignment}</xf>"
            ));
        } else {
            cell_xfs.push_str(&format!(
                "<xf numFmtId=\"{num_fmt_id}\" fontId=\"{font_id}\" fillId=\"{fill_id}\" borderId=\"0\"/>"
            ));
        }
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<numFmts count="{}">{num_fmts}</numFmts>
<fonts count="{}">{fonts}</fonts>
<fills count="{}">{fills}</fills>
<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>
<cellXfs count="{}">{cell_xfs}</cellXfs>
</styleSheet>"#,
        num_fmt_ids.iter().filter(|id| **id != 0).count(),
        styles.len() + 1,
        styles.len() + 2,
        styles.len() + 1,
    )
}

fn sheet_xml(
    sheet: &SheetBuilder,
    shared_strings: &mut Vec<String>,
    shared_index: &mut HashMap<String, usize>,
    styles: &mut Vec<FixtureStyle>,
) -> String {
    // Group cells by row, preserving column order
    let mut by_row: Vec<(u32, Vec<(u32, String)>)> = Vec::new();

    let mut min_row = u32::MAX;
    let mut max_row = 0u32;
    let mut min_col = u32::MAX;
    let mut max_col = 0u32;

    for cell in &sheet.cells {
        let (col, row) = parse_ref(&cell.cell_ref);
        min_row = min_row.min(row);
        max_row = max_row.max(row);
        min_col = min_col.min(col);
        max_col = max_col.max(col);

        let style_attr = cell.style.as_ref().map(|style| {
            let idx = styles
                .iter()
                .position(|s| s == style)
                .unwrap_or_else(|| {
                    styles.push(style.clone());
                    styles.len() - 1
                });
            idx + 1
        });
        let s_attr = style_attr
            .map(|idx| format!(" s=\"{idx}\""))
            .unwrap_or_default();

        let body = match &cell.spec {
            CellSpec::Text(text) => {
                let idx = *shared_index.entry(text.clone()).or_insert_with(|| {
                    shared_strings.push(text.clone());
                    shared_strings.len() - 1
                });
                format!(
                    "<c r=\"{}\" t=\"s\"{s_attr}><v>{idx}</v></c>",
                    cell.cell_ref
                )
            }
            CellSpec::Number(n) => {
                format!("<c r=\"{}\"{s_attr}><v>{n}</v></c>", cell.cell_ref)
            }
            CellSpec::Bool(b) => format!(
                "<c r=\"{}\" t=\"b\"{s_attr}><v>{}</v></c>",
                cell.cell_ref,
                i32::from(*b)
            ),
            CellSpec::Formula(formula, result) => {
                let formula = escape_xml(formula);
                match result {
                    Some(FormulaSpec::Number(n)) => format!(
                        "<c r=\"{}\"{s_attr}><f>{formula}</f><v>{n}</v></c>",
                        cell.cell_ref
                    ),
                    Some(FormulaSpec::Text(text)) => format!(
                        "<c r=\"{}\" t=\"str\"{s_attr}><f>{formula}</f><v>{}</v></c>",
                        cell.cell_ref,
                        escape_xml(text)
                    ),
                    Some(FormulaSpec::Bool(b)) => format!(
                        "<c r=\"{}\" t=\"b\"{s_attr}><f>{formula}</f><v>{}</v></c>",
                        cell.cell_ref,
                        i32::from(*b)
                    ),
                    Some(FormulaSpec::Error(error)) => format!(
                        "<c r=\"{}\" t=\"e\"{s_attr}><f>{formula}</f><v>{}</v></c>",
                        cell.cell_ref,
                        escape_xml(error)
                    ),
                    None => format!(
                        "<c r=\"{}\"{s_attr}><f>{formula}</f></c>",
                        cell.cell_ref
                    ),
                }
            }
            CellSpec::Blank => format!("<c r=\"{}\"{s_attr}/>", cell.cell_ref),
        };

        match by_row.iter_mut().find(|(r, _)| *r == row) {
            Some((_, cells)) => cells.push((col, body)),
            None => by_row.push((row, vec![(col, body)])),
        }
    }

    // Merges can extend the dimension rectangle past the populated cells
    for merge in &sheet.merges {
        if let Some((start, end)) = merge.split_once(':') {
            for part in [start, end] {
                let (col, row) = parse_ref(part);
                min_row = min_row.min(row);
                max_row = max_row.max(row);
                min_col = min_col.min(col);
                max_col = max_col.max(col);
            }
        }
    }

    by_row.sort_by_key(|(row, _)| *row);
    let mut sheet_data = String::new();
    for (row, mut cells) in by_row {
        cells.sort_by_key(|(col, _)| *col);
        sheet_data.push_str(&format!("<row r=\"{row}\">"));
        for (_, body) in cells {
            sheet_data.push_str(&body);
        }
        sheet_data.push_str("</row>");
    }

    let dimension = if min_row == u32::MAX {
        String::new()
    } else {
        format!(
            "<dimension ref=\"{}:{}\"/>",
            make_ref(min_col, min_row),
            make_ref(max_col, max_row)
        )
    };

    let merge_cells = if sheet.merges.is_empty() {
        String::new()
    } else {
        let mut entries = String::new();
        for merge in &sheet.merges {
            entries.push_str(&format!("<mergeCell ref=\"{merge}\"/>"));
        }
        format!(
            "<mergeCells count=\"{}\">{entries}</mergeCells>",
            sheet.merges.len()
        )
    };

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
{dimension}<sheetData>{sheet_data}</sheetData>{merge_cells}
</worksheet>"#
    )
}

/// Parse "B3" into (col, row), both 1-based.
fn parse_ref(cell_ref: &str) -> (u32, u32) {
    let mut col = 0u32;
    let mut row = 0u32;
    for ch in cell_ref.chars() {
        if ch.is_ascii_alphabetic() {
            col = col * 26 + (ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
        } else if ch.is_ascii_digit() {
            row = row * 10 + (ch as u32 - '0' as u32);
        }
    }
    (col, row)
}

/// Format (col, row), both 1-based, as an A1 reference.
fn make_ref(col: u32, row: u32) -> String {
    let mut letters = String::new();
    let mut n = col;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.insert(0, (b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    format!("{letters}{row}")
}

/// Expand a 6-digit code to 8-digit ARGB with opaque alpha.
fn full_argb(color: &str) -> String {
    if color.len() == 6 {
        format!("FF{color}")
    } else {
        color.to_string()
    }
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
