//! Parsing of xl/styles.xml into resolved style descriptors.
//!
//! fonts, fills, borders, and cell formats (xf) are collected first, then
//! each cellXf entry is resolved into one immutable `StyleDescriptor`
//! indexed by the cell's `s` attribute.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Seek};
use zip::ZipArchive;

use crate::error::Result;
use crate::format::is_date_pattern;
use crate::types::{
    Alignment, BorderEdge, BorderSet, BorderStyle, ColorRef, Fill, FontStyle, GradientStop,
    HAlign, PatternKind, StyleDescriptor, VAlign,
};

/// Built-in number format IDs (0-49 are predefined).
/// See: ECMA-376 Part 1, Section 18.8.30
const fn builtin_format(id: u32) -> Option<&'static str> {
    match id {
        0 => Some("General"),
        1 => Some("0"),
        2 => Some("0.00"),
        3 => Some("#,##0"),
        4 => Some("#,##0.00"),
        5 => Some("$#,##0_);($#,##0)"),
        6 => Some("$#,##0_);[Red]($#,##0)"),
        7 => Some("$#,##0.00_);($#,##0.00)"),
        8 => Some("$#,##0.00_);[Red]($#,##0.00)"),
        9 => Some("0%"),
        10 => Some("0.00%"),
        11 => Some("0.00E+00"),
        12 => Some("# ?/?"),
        13 => Some("# ??/??"),
        14 => Some("mm-dd-yy"),
        15 => Some("d-mmm-yy"),
        16 => Some("d-mmm"),
        17 => Some("mmm-yy"),
        18 => Some("h:mm AM/PM"),
        19 => Some("h:mm:ss AM/PM"),
        20 => Some("h:mm"),
        21 => Some("h:mm:ss"),
        22 => Some("m/d/yy h:mm"),
        37 => Some("#,##0 ;(#,##0)"),
        38 => Some("#,##0 ;[Red](#,##0)"),
        39 => Some("#,##0.00;(#,##0.00)"),
        40 => Some("#,##0.00;[Red](#,##0.00)"),
        45 => Some("mm:ss"),
        46 => Some("[h]:mm:ss"),
        47 => Some("mmss.0"),
        48 => Some("##0.0E+0"),
        49 => Some("@"),
        _ => None,
    }
}

/// Resolved styles indexed by cellXf position.
#[derive(Debug, Default)]
pub(crate) struct StyleTable {
    styles: Vec<StyleDescriptor>,
}

impl StyleTable {
    /// The resolved style for a cell's `s` attribute, if any.
    pub(crate) fn style_for(&self, idx: Option<u32>) -> Option<StyleDescriptor> {
        let style = self.styles.get(idx? as usize)?;
        if *style == StyleDescriptor::default() {
            None
        } else {
            Some(style.clone())
        }
    }

    /// Whether the style's number format denotes a date/time format.
    pub(crate) fn is_date_style(&self, idx: Option<u32>) -> bool {
        idx.and_then(|i| self.styles.get(i as usize))
            .and_then(|s| s.num_fmt.as_deref())
            .is_some_and(is_date_pattern)
    }
}

/// Parse xl/styles.xml from the archive; a missing part yields an empty
/// table (every cell falls back to no style).
pub(crate) fn parse_styles_part<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<StyleTable> {
    let Ok(file) = archive.by_name("xl/styles.xml") else {
        return Ok(StyleTable::default());
    };
    parse_styles(BufReader::new(file))
}

/// One `<xf>` entry before resolution.
#[derive(Debug, Default, Clone)]
struct CellXf {
    num_fmt_id: u32,
    font_id: usize,
    fill_id: usize,
    border_id: usize,
    alignment: Option<Alignment>,
}

fn parse_styles<R: BufRead>(reader: R) -> Result<StyleTable> {
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(true);

    let mut num_fmts: HashMap<u32, String> = HashMap::new();
    let mut fonts: Vec<FontStyle> = Vec::new();
    let mut fills: Vec<Option<Fill>> = Vec::new();
    let mut borders: Vec<BorderSet> = Vec::new();
    let mut cell_xfs: Vec<CellXf> = Vec::new();

    let mut in_cell_xfs = false;
    let mut current_font: Option<FontStyle> = None;
    let mut current_pattern: Option<(PatternKind, Option<ColorRef>, Option<ColorRef>)> = None;
    let mut current_gradient: Option<Vec<GradientStop>> = None;
    let mut gradient_stop_position: f64 = 0.0;
    let mut in_gradient_stop = false;
    let mut current_border: Option<BorderSet> = None;
    let mut current_border_side: Option<&'static str> = None;
    let mut current_border_style: BorderStyle = BorderStyle::None;
    let mut current_xf: Option<CellXf> = None;

    let mut buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf) {
            Ok(ref event @ (Event::Start(ref e) | Event::Empty(ref e))) => {
                let is_empty = matches!(event, Event::Empty(_));
                let name = e.local_name();

                match name.as_ref() {
                    b"numFmt" => {
                        let mut id: Option<u32> = None;
                        let mut code: Option<String> = None;
                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"numFmtId" => id = attr_u32(&attr.value),
                                b"formatCode" => code = attr_string(&attr.value),
                                _ => {}
                            }
                        }
                        if let (Some(id), Some(code)) = (id, code) {
                            num_fmts.insert(id, code);
                        }
                    }

                    b"font" => {
                        if is_empty {
                            fonts.push(FontStyle::default());
                        } else {
                            current_font = Some(FontStyle::default());
                        }
                    }
                    b"b" if current_font.is_some() => {
                        if let Some(font) = current_font.as_mut() {
                            font.bold = bool_attr_default_true(e);
                        }
                    }
                    b"i" if current_font.is_some() => {
                        if let Some(font) = current_font.as_mut() {
                            font.italic = bool_attr_default_true(e);
                        }
                    }
                    b"u" if current_font.is_some() => {
                        if let Some(font) = current_font.as_mut() {
                            font.underline = true;
                        }
                    }
                    b"strike" if current_font.is_some() => {
                        if let Some(font) = current_font.as_mut() {
                            font.strike = bool_attr_default_true(e);
                        }
                    }
                    b"sz" if current_font.is_some() => {
                        if let Some(font) = current_font.as_mut() {
                            font.size = attr_val(e).and_then(|v| v.parse().ok());
                        }
                    }
                    b"name" if current_font.is_some() => {
                        if let Some(font) = current_font.as_mut() {
                            font.name = attr_val(e);
                        }
                    }
                    b"color" if current_font.is_some() => {
                        if let Some(font) = current_font.as_mut() {
                            font.color = parse_color(e);
                        }
                    }

                    b"fill" => {
                        if is_empty {
                            fills.push(None);
                        } else {
                            current_pattern = None;
                            current_gradient = None;
                        }
                    }
                    b"patternFill" => {
                        let kind = attr_named(e, b"patternType")
                            .map_or(PatternKind::None, |v| match v.as_str() {
                                "solid" => PatternKind::Solid,
                                "none" => PatternKind::None,
                                _ => PatternKind::Other,
                            });
                        current_pattern = Some((kind, None, None));
                    }
                    b"fgColor" if current_pattern.is_some() => {
                        if let Some((_, fg, _)) = current_pattern.as_mut() {
                            *fg = parse_color(e);
                        }
                    }
                    b"bgColor" if current_pattern.is_some() => {
                        if let Some((_, _, bg)) = current_pattern.as_mut() {
                            *bg = parse_color(e);
                        }
                    }
                    b"gradientFill" => {
                        current_gradient = Some(Vec::new());
                    }
                    b"stop" if current_gradient.is_some() => {
                        in_gradient_stop = true;
                        gradient_stop_position = attr_named(e, b"position")
                            .and_then(|v| v.parse().ok())
                            .unwrap_or(0.0);
                    }
                    b"color" if in_gradient_stop => {
                        if let (Some(stops), Some(color)) =
                            (current_gradient.as_mut(), parse_color(e))
                        {
                            stops.push(GradientStop {
                                position: gradient_stop_position,
                                color,
                            });
                        }
                    }

                    b"border" => {
                        if is_empty {
                            borders.push(BorderSet::default());
                        } else {
                            current_border = Some(BorderSet::default());
                        }
                    }
                    b"left" | b"right" | b"top" | b"bottom" if current_border.is_some() => {
                        let side = match name.as_ref() {
                            b"left" => "left",
                            b"right" => "right",
                            b"top" => "top",
                            _ => "bottom",
                        };
                        let style = attr_named(e, b"style")
                            .map_or(BorderStyle::None, |v| parse_border_style(&v));
                        if is_empty {
                            apply_border_edge(current_border.as_mut(), side, style, None);
                        } else {
                            current_border_side = Some(side);
                            current_border_style = style;
                        }
                    }
                    b"color" if current_border_side.is_some() => {
                        if let Some(side) = current_border_side.take() {
                            apply_border_edge(
                                current_border.as_mut(),
                                side,
                                current_border_style,
                                parse_color(e),
                            );
                        }
                    }

                    b"cellXfs" => in_cell_xfs = true,
                    b"xf" if in_cell_xfs => {
                        let mut xf = CellXf::default();
                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"numFmtId" => {
                                    xf.num_fmt_id = attr_u32(&attr.value).unwrap_or(0);
                                }
                                b"fontId" => {
                                    xf.font_id = attr_u32(&attr.value).unwrap_or(0) as usize;
                                }
                                b"fillId" => {
                                    xf.fill_id = attr_u32(&attr.value).unwrap_or(0) as usize;
                                }
                                b"borderId" => {
                                    xf.border_id = attr_u32(&attr.value).unwrap_or(0) as usize;
                                }
                                _ => {}
                            }
                        }
                        if is_empty {
                            cell_xfs.push(xf);
                        } else {
                            current_xf = Some(xf);
                        }
                    }
                    b"alignment" if current_xf.is_some() => {
                        if let Some(xf) = current_xf.as_mut() {
                            xf.alignment = Some(parse_alignment(e));
                        }
                    }

                    _ => {}
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"font" => {
                    if let Some(font) = current_font.take() {
                        fonts.push(font);
                    }
                }
                b"fill" => {
                    fills.push(resolve_fill(
                        current_pattern.take(),
                        current_gradient.take(),
                    ));
                }
                b"stop" => in_gradient_stop = false,
                b"border" => {
                    if let Some(border) = current_border.take() {
                        borders.push(border);
                    }
                }
                b"left" | b"right" | b"top" | b"bottom" => {
                    // Edge closed without a color child
                    if let Some(side) = current_border_side.take() {
                        apply_border_edge(
                            current_border.as_mut(),
                            side,
                            current_border_style,
                            None,
                        );
                    }
                }
                b"cellXfs" => in_cell_xfs = false,
                b"xf" => {
                    if let Some(xf) = current_xf.take() {
                        if in_cell_xfs {
                            cell_xfs.push(xf);
                        }
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

    let styles = cell_xfs
        .iter()
        .map(|xf| resolve_xf(xf, &num_fmts, &fonts, &fills, &borders))
        .collect();
    Ok(StyleTable { styles })
}

fn resolve_xf(
    xf: &CellXf,
    num_fmts: &HashMap<u32, String>,
    fonts: &[FontStyle],
    fills: &[Option<Fill>],
    borders: &[BorderSet],
) -> StyleDescriptor {
    let num_fmt = num_fmts
        .get(&xf.num_fmt_id)
        .cloned()
        .or_else(|| builtin_format(xf.num_fmt_id).map(str::to_string))
        .filter(|code| !code.eq_ignore_ascii_case("General"));

    let font = fonts
        .get(xf.font_id)
        .filter(|f| **f != FontStyle::default())
        .cloned();

    let fill = fills.get(xf.fill_id).cloned().flatten();

    let border = borders
        .get(xf.border_id)
        .filter(|b| **b != BorderSet::default())
        .cloned();

    StyleDescriptor {
        font,
        fill,
        alignment: xf.alignment.clone(),
        border,
        num_fmt,
    }
}

fn resolve_fill(
    pattern: Option<(PatternKind, Option<ColorRef>, Option<ColorRef>)>,
    gradient: Option<Vec<GradientStop>>,
) -> Option<Fill> {
    if let Some(stops) = gradient {
        return Some(Fill::Gradient { stops });
    }
    match pattern {
        Some((PatternKind::None, _, _)) | None => None,
        Some((kind, fg_color, bg_color)) => Some(Fill::Pattern {
            pattern: kind,
            fg_color,
            bg_color,
        }),
    }
}

fn apply_border_edge(
    border: Option<&mut BorderSet>,
    side: &'static str,
    style: BorderStyle,
    color: Option<ColorRef>,
) {
    let Some(border) = border else {
        return;
    };
    if style == BorderStyle::None {
        return;
    }
    let edge = Some(BorderEdge { style, color });
    match side {
        "left" => border.left = edge,
        "right" => border.right = edge,
        "top" => border.top = edge,
        _ => border.bottom = edge,
    }
}

fn parse_border_style(value: &str) -> BorderStyle {
    match value {
        "thin" => BorderStyle::Thin,
        "medium" => BorderStyle::Medium,
        "thick" => BorderStyle::Thick,
        "dashed" => BorderStyle::Dashed,
        "dotted" => BorderStyle::Dotted,
        "double" => BorderStyle::Double,
        "hair" => BorderStyle::Hair,
        "mediumDashed" => BorderStyle::MediumDashed,
        "dashDot" => BorderStyle::DashDot,
        "mediumDashDot" => BorderStyle::MediumDashDot,
        "dashDotDot" => BorderStyle::DashDotDot,
        "mediumDashDotDot" => BorderStyle::MediumDashDotDot,
        "slantDashDot" => BorderStyle::SlantDashDot,
        _ => BorderStyle::None,
    }
}

fn parse_alignment(e: &BytesStart<'_>) -> Alignment {
    let mut alignment = Alignment::default();
    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"horizontal" => {
                alignment.horizontal = match attr.value.as_ref() {
                    b"left" => Some(HAlign::Left),
                    b"center" => Some(HAlign::Center),
                    b"right" => Some(HAlign::Right),
                    _ => None,
                };
            }
            b"vertical" => {
                alignment.vertical = match attr.value.as_ref() {
                    b"top" => Some(VAlign::Top),
                    b"center" => Some(VAlign::Middle),
                    b"bottom" => Some(VAlign::Bottom),
                    _ => None,
                };
            }
            b"wrapText" => {
                alignment.wrap_text = matches!(attr.value.as_ref(), b"1" | b"true");
            }
            b"indent" => {
                alignment.indent = attr_u32(&attr.value).filter(|i| *i > 0);
            }
            _ => {}
        }
    }
    alignment
}

/// Parse a `<color>`-shaped element into a color reference. 8-digit codes
/// are kept as alpha+RGB, 6-digit codes as plain RGB.
fn parse_color(e: &BytesStart<'_>) -> Option<ColorRef> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == b"rgb" {
            let code = String::from_utf8_lossy(&attr.value).to_string();
            return Some(if code.len() == 8 {
                ColorRef::from_argb(code)
            } else {
                ColorRef::from_rgb(code)
            });
        }
    }
    None
}

fn attr_string(value: &[u8]) -> Option<String> {
    std::str::from_utf8(value).ok().map(str::to_string)
}

fn attr_u32(value: &[u8]) -> Option<u32> {
    std::str::from_utf8(value).ok().and_then(|s| s.parse().ok())
}

fn attr_val(e: &BytesStart<'_>) -> Option<String> {
    attr_named(e, b"val")
}

fn attr_named(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == key {
            return attr_string(&attr.value);
        }
    }
    None
}

/// `<b/>` style boolean child elements default to true; `val="0"` disables.
fn bool_attr_default_true(e: &BytesStart<'_>) -> bool {
    attr_val(e).map_or(true, |v| v != "0" && v != "false")
}
