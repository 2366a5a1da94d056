//! Display formatting for cells: value rendering, semantic classification,
//! and CSS-free visual attributes.
//!
//! Number format codes are a mini-language; this engine supports the common
//! branches (percent, currency, fixed decimals, thousands grouping, the
//! date patterns) and falls back to plain rendering for everything else.
//! The engine only reads the canonical model, never mutates it.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::types::{
    Alignment, CellRecord, CellValue, ColorRef, DateValue, Fill, FormulaResult, HAlign,
    PatternKind, StyleDescriptor, VAlign,
};

/// Days between the spreadsheet serial epoch (1899-12-30) and the Unix
/// epoch (1970-01-01). The constant bakes in the historical 1900 leap-year
/// quirk; it is reproduced exactly for compatibility.
const EXCEL_UNIX_EPOCH_DELTA_DAYS: f64 = 25569.0;

const SECONDS_PER_DAY: f64 = 86400.0;

/// Indent levels scale to display units by this fixed multiplier.
pub const INDENT_UNIT: u32 = 8;

/// Formatted display length beyond which a cell classifies as long text.
const LONG_TEXT_THRESHOLD: usize = 20;

/// Currency glyphs recognized in number format codes.
const CURRENCY_GLYPHS: [char; 5] = ['$', '¥', '￥', '€', '£'];

// ---------------------------------------------------------------------------
// Value formatting
// ---------------------------------------------------------------------------

/// Derive the display string for a cell, branching on its type tag.
#[must_use]
pub fn format_cell_value(cell: &CellRecord) -> String {
    let num_fmt = cell.style().and_then(|s| s.num_fmt.as_deref());

    match cell.value() {
        CellValue::Empty => String::new(),
        CellValue::Number(n) => format_number(*n, num_fmt),
        CellValue::Bool(b) => bool_display(*b).to_string(),
        CellValue::Date(date) => format_date(date, num_fmt),
        CellValue::Text(s) => s.trim().to_string(),
        CellValue::Formula { formula, result } => {
            let source = if formula.is_empty() {
                cell.formula().unwrap_or_default()
            } else {
                formula.as_str()
            };
            format_formula(source, result.as_ref(), num_fmt)
        }
        CellValue::RichText { runs } => runs
            .iter()
            .map(|run| escape_html(&run.text))
            .collect::<String>(),
    }
}

fn bool_display(value: bool) -> &'static str {
    if value {
        "TRUE"
    } else {
        "FALSE"
    }
}

/// Plain decimal rendering: integers without a fraction part, everything
/// else in shortest round-trip form.
#[allow(clippy::float_cmp, clippy::cast_possible_truncation)]
#[must_use]
pub(crate) fn plain_number_string(value: f64) -> String {
    if value.is_finite() && value == value.floor() && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

fn currency_glyph(code: &str) -> Option<char> {
    code.chars().find(|c| CURRENCY_GLYPHS.contains(c))
}

fn format_number(value: f64, num_fmt: Option<&str>) -> String {
    let Some(code) = num_fmt else {
        return plain_number_string(value);
    };
    let code = code.trim();
    if code.is_empty() || code.eq_ignore_ascii_case("General") {
        return plain_number_string(value);
    }

    // Percentage
    if code.contains('%') {
        return format!("{:.2}%", value * 100.0);
    }

    // Currency: glyph prefix, two fraction digits. The full-width yen
    // glyph renders with its half-width form.
    if let Some(glyph) = currency_glyph(code) {
        let glyph = if glyph == '￥' { '¥' } else { glyph };
        return format!("{glyph}{value:.2}");
    }

    // Fixed decimal places
    if code.contains(".00") {
        return format!("{value:.2}");
    }
    if code.contains(".0") {
        return format!("{value:.1}");
    }

    // Thousands grouping
    if code.contains(',') {
        return group_thousands(value);
    }

    plain_number_string(value)
}

/// Locale-style grouping: comma every three integer digits, up to three
/// fraction digits with trailing zeros trimmed.
fn group_thousands(value: f64) -> String {
    let is_negative = value < 0.0;
    let rounded = format!("{:.3}", value.abs());
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    let (int_part, dec_part) = match trimmed.split_once('.') {
        Some((int_part, dec_part)) => (int_part, Some(dec_part)),
        None => (trimmed, None),
    };

    let mut grouped = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let int_grouped: String = grouped.chars().rev().collect();

    let mut result = String::new();
    if is_negative {
        result.push('-');
    }
    result.push_str(&int_grouped);
    if let Some(dec) = dec_part {
        result.push('.');
        result.push_str(dec);
    }
    result
}

// ---------------------------------------------------------------------------
// Date formatting
// ---------------------------------------------------------------------------

/// Convert a spreadsheet serial day-count to a calendar timestamp via the
/// fixed epoch offset.
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    let seconds = (serial - EXCEL_UNIX_EPOCH_DELTA_DAYS) * SECONDS_PER_DAY;
    if !seconds.is_finite() || seconds.abs() >= 9.0e18 {
        return None;
    }
    chrono::DateTime::from_timestamp(seconds.round() as i64, 0).map(|dt| dt.naive_utc())
}

fn parse_date_text(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt);
        }
    }
    for fmt in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(text, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

fn resolve_date(value: &DateValue) -> Option<NaiveDateTime> {
    match value {
        DateValue::Serial(serial) => serial_to_datetime(*serial),
        DateValue::Timestamp(ts) => Some(*ts),
        DateValue::Text(text) => parse_date_text(text),
    }
}

fn date_fallback_string(value: &DateValue) -> String {
    match value {
        DateValue::Serial(serial) => plain_number_string(*serial),
        DateValue::Timestamp(ts) => ts.to_string(),
        DateValue::Text(text) => text.clone(),
    }
}

fn format_date(value: &DateValue, num_fmt: Option<&str>) -> String {
    let Some(dt) = resolve_date(value) else {
        // Unparsable input: the original value, stringified
        return date_fallback_string(value);
    };

    if let Some(code) = num_fmt {
        let code = code.to_lowercase();
        if code.contains("yyyy") {
            return dt.format("%Y-%m-%d").to_string();
        }
        if code.contains("mm:ss") {
            return dt.format("%H:%M:%S").to_string();
        }
        if code.contains("h:mm") {
            // No leading zero on the hour, zero-padded minute
            return format!("{}:{:02}", dt.hour(), dt.minute());
        }
    }

    format!("{}/{}/{}", dt.month(), dt.day(), dt.year())
}

/// Whether a number format code denotes a date/time format.
///
/// Quoted literals and bracketed sections are skipped before scanning for
/// date tokens.
#[must_use]
pub fn is_date_pattern(code: &str) -> bool {
    let lower = code.to_lowercase();

    let mut in_quotes = false;
    let mut in_brackets = false;
    let mut cleaned = String::new();
    for c in lower.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            '[' => in_brackets = true,
            ']' => in_brackets = false,
            _ if !in_quotes && !in_brackets => cleaned.push(c),
            _ => {}
        }
    }

    cleaned.contains('y')
        || (cleaned.contains('m') && !cleaned.contains('#') && !cleaned.contains('0'))
        || cleaned.contains('d')
        || cleaned.contains('h')
        || (cleaned.contains('s') && cleaned.contains(':'))
}

// ---------------------------------------------------------------------------
// Formula formatting
// ---------------------------------------------------------------------------

fn format_formula(formula: &str, result: Option<&FormulaResult>, num_fmt: Option<&str>) -> String {
    match result {
        Some(FormulaResult::Number(n)) => format!("{n:.2}"),
        Some(FormulaResult::Date(date)) => format_date(date, num_fmt),
        Some(FormulaResult::Error(error)) => error.clone(),
        Some(FormulaResult::Text(text)) => text.clone(),
        Some(FormulaResult::Bool(b)) => b.to_string(),
        None if formula.is_empty() => String::new(),
        None => format!("={formula}"),
    }
}

// ---------------------------------------------------------------------------
// Rich text
// ---------------------------------------------------------------------------

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Semantic tags a presentation layer keys off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellTag {
    Numeric,
    Date,
    Formula,
    WrapText,
    LongText,
    Merged,
}

impl CellTag {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CellTag::Numeric => "numeric",
            CellTag::Date => "date",
            CellTag::Formula => "formula",
            CellTag::WrapText => "wrap-text",
            CellTag::LongText => "long-text",
            CellTag::Merged => "merged",
        }
    }
}

/// Classify a cell into its semantic tags.
///
/// Long-text is computed from the formatted value, not the raw one.
#[must_use]
pub fn classify(cell: &CellRecord) -> Vec<CellTag> {
    let mut tags = Vec::new();

    match cell.value() {
        CellValue::Number(_) => tags.push(CellTag::Numeric),
        CellValue::Date(_) => tags.push(CellTag::Date),
        _ => {}
    }

    if cell.formula().is_some() || matches!(cell.value(), CellValue::Formula { .. }) {
        tags.push(CellTag::Formula);
    }

    let wraps = cell
        .style()
        .and_then(|s| s.alignment.as_ref())
        .is_some_and(|a| a.wrap_text);
    if wraps {
        tags.push(CellTag::WrapText);
    }

    if format_cell_value(cell).chars().count() > LONG_TEXT_THRESHOLD {
        tags.push(CellTag::LongText);
    }

    if cell.is_merged() {
        tags.push(CellTag::Merged);
    }

    tags
}

/// The tags joined into a space-separated class list.
#[must_use]
pub fn class_names(cell: &CellRecord) -> String {
    classify(cell)
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Visual style
// ---------------------------------------------------------------------------

/// CSS-free visual attributes derived from a cell's resolved style.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisualStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
    pub font_size: Option<f64>,
    pub font_family: Option<String>,
    /// `#RRGGBB`
    pub font_color: Option<String>,
    /// `#RRGGBB`
    pub fill_color: Option<String>,
    pub align_horizontal: Option<HAlign>,
    pub align_vertical: Option<VAlign>,
    pub wrap: bool,
    /// Indent level scaled by the fixed unit multiplier.
    pub indent: Option<u32>,
}

/// Resolve a color reference to `#RRGGBB`, dropping the two leading alpha
/// digits of an 8-digit code.
fn color_to_hex(color: &ColorRef) -> Option<String> {
    if let Some(argb) = color.argb.as_deref() {
        if argb.len() == 8 {
            return argb.get(2..).map(|rgb| format!("#{rgb}"));
        }
        return Some(format!("#{argb}"));
    }
    color.rgb.as_deref().map(|rgb| format!("#{rgb}"))
}

fn fill_color(fill: &Fill) -> Option<String> {
    match fill {
        Fill::Pattern {
            pattern: PatternKind::Solid,
            fg_color,
            ..
        } => fg_color.as_ref().and_then(color_to_hex),
        Fill::Pattern { .. } => None,
        // Gradients approximate to their first stop's color (lossy; the
        // full stop list stays on the descriptor).
        Fill::Gradient { stops } => stops.first().and_then(|stop| color_to_hex(&stop.color)),
    }
}

fn alignment_of(style: &StyleDescriptor) -> Option<&Alignment> {
    style.alignment.as_ref()
}

/// Derive visual attributes from the cell's resolved style (transform chain
/// applied).
#[must_use]
pub fn visual_style(cell: &CellRecord) -> VisualStyle {
    let style = cell.resolved_style();
    let mut visual = VisualStyle::default();

    if let Some(font) = &style.font {
        visual.bold = font.bold;
        visual.italic = font.italic;
        visual.underline = font.underline;
        visual.strike = font.strike;
        visual.font_size = font.size;
        visual.font_family = font.name.clone();
        visual.font_color = font.color.as_ref().and_then(color_to_hex);
    }

    if let Some(fill) = &style.fill {
        visual.fill_color = fill_color(fill);
    }

    if let Some(alignment) = alignment_of(&style) {
        visual.align_horizontal = alignment.horizontal;
        visual.align_vertical = alignment.vertical;
        visual.wrap = alignment.wrap_text;
        visual.indent = alignment.indent.map(|level| level * INDENT_UNIT);
    }

    // Currency and percentage patterns read right-aligned unless the style
    // says otherwise.
    if visual.align_horizontal.is_none() {
        if let Some(code) = style.num_fmt.as_deref() {
            if code.contains('%') || currency_glyph(code).is_some() {
                visual.align_horizontal = Some(HAlign::Right);
            }
        }
    }

    visual
}
