use serde::{Deserialize, Serialize};

/// A color as captured from the source format.
///
/// XLSX carries 8-hex-digit alpha+RGB codes (`FF4472C4`); plain 6-digit RGB
/// also appears. Both are preserved as written; display-time resolution
/// happens in the format engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub argb: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rgb: Option<String>,
}

impl ColorRef {
    /// Color from an 8-digit alpha+RGB code.
    #[must_use]
    pub fn from_argb(argb: impl Into<String>) -> Self {
        Self {
            argb: Some(argb.into()),
            rgb: None,
        }
    }

    /// Color from a 6-digit RGB code.
    #[must_use]
    pub fn from_rgb(rgb: impl Into<String>) -> Self {
        Self {
            argb: None,
            rgb: Some(rgb.into()),
        }
    }
}

/// Font attributes of a cell style.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FontStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<ColorRef>,
}

/// Fill pattern kind for pattern fills.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PatternKind {
    #[default]
    Solid,
    None,
    Other,
}

/// One stop of a gradient fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradientStop {
    pub position: f64,
    pub color: ColorRef,
}

/// Cell background fill.
///
/// The full gradient stop list is preserved even though display only uses
/// the first stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Fill {
    Pattern {
        pattern: PatternKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        fg_color: Option<ColorRef>,
        #[serde(skip_serializing_if = "Option::is_none")]
        bg_color: Option<ColorRef>,
    },
    Gradient {
        stops: Vec<GradientStop>,
    },
}

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HAlign {
    Left,
    Center,
    Right,
}

/// Vertical text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VAlign {
    Top,
    Middle,
    Bottom,
}

/// Alignment attributes of a cell style.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Alignment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub horizontal: Option<HAlign>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertical: Option<VAlign>,
    pub wrap_text: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indent: Option<u32>,
}

/// Border line style.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BorderStyle {
    #[default]
    None,
    Thin,
    Medium,
    Thick,
    Dashed,
    Dotted,
    Double,
    Hair,
    MediumDashed,
    DashDot,
    MediumDashDot,
    DashDotDot,
    MediumDashDotDot,
    SlantDashDot,
}

/// One edge of a cell border.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorderEdge {
    pub style: BorderStyle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<ColorRef>,
}

/// Per-edge borders of a cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BorderSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<BorderEdge>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bottom: Option<BorderEdge>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<BorderEdge>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right: Option<BorderEdge>,
}

/// Immutable style snapshot attached to a cell.
///
/// Once attached to a `CellRecord` the descriptor is never mutated; the
/// style resolver only ever produces new snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StyleDescriptor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<FontStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<Fill>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Alignment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border: Option<BorderSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_fmt: Option<String>,
}
