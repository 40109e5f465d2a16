// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Two-segment environment/version badge rendering.
//!
//! The badge is a fixed SVG template made of two rounded segments. The left
//! segment carries the environment name, the right one the version. Segment
//! widths follow the measured text width plus fixed padding, so the output is
//! deterministic for a given pair of labels.

use std::{
    borrow::Cow,
    fmt::Write as _,
    fs::{self, File},
    io::{BufWriter, Write},
    path::Path
};

use crate::error::{self, Error};

/// Horizontal padding added to the label segment (14 units on each side).
pub const LABEL_PADDING: f64 = 28.0;
/// Horizontal padding added to the value segment (6 units on each side).
pub const VALUE_PADDING: f64 = 12.0;
/// Height of the rendered badge.
pub const BADGE_HEIGHT: u32 = 20;
/// Font family used for both segments.
pub const FONT_FAMILY: &str = "'DejaVu Sans',Verdana,Geneva,sans-serif";
/// Font size, in pixels, used for both segments.
pub const FONT_SIZE: f64 = 11.0;

/// Measures the rendered width of a text run.
pub trait TextMeasure {
    /// Returns the advance width of `text` in user units.
    fn text_width(&self, text: &str) -> f64;
}

/// Text measurement backed by DejaVu Sans advance widths.
///
/// Widths are stored in font units (2048 per em) and scaled to the configured
/// font size. Characters outside printable ASCII use the digit advance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DejaVuSans {
    font_size: f64
}

impl DejaVuSans {
    const UNITS_PER_EM: f64 = 2048.0;
    const FALLBACK_ADVANCE: u16 = 1303;

    /// Creates a measurer for the given font size in pixels.
    pub const fn new(font_size: f64) -> Self {
        Self {
            font_size
        }
    }

    fn advance(character: char) -> u16 {
        match character {
            ' '..='~' => ASCII_ADVANCES[(character as usize) - 0x20],
            _ => Self::FALLBACK_ADVANCE
        }
    }
}

impl Default for DejaVuSans {
    fn default() -> Self {
        Self::new(FONT_SIZE)
    }
}

impl TextMeasure for DejaVuSans {
    fn text_width(&self, text: &str) -> f64 {
        let units: u32 = text.chars().map(|ch| u32::from(Self::advance(ch))).sum();
        f64::from(units) * self.font_size / Self::UNITS_PER_EM
    }
}

// Advance widths for U+0020..=U+007E.
#[rustfmt::skip]
const ASCII_ADVANCES: [u16; 95] = [
    651, 823, 942, 1716, 1303, 1946, 1597, 563, 799, 799, 1024, 1716, 651, 739, 651, 690,
    1303, 1303, 1303, 1303, 1303, 1303, 1303, 1303, 1303, 1303, 690, 690, 1716, 1716, 1716, 1087,
    2048, 1401, 1405, 1430, 1577, 1294, 1178, 1587, 1540, 604, 604, 1343, 1141, 1767, 1532, 1612,
    1235, 1612, 1423, 1300, 1251, 1499, 1401, 2025, 1403, 1251, 1403, 799, 690, 799, 1716, 1024,
    1024, 1255, 1300, 1126, 1300, 1260, 721, 1300, 1298, 569, 569, 1186, 569, 1995, 1298, 1253,
    1300, 1300, 842, 1067, 803, 1298, 1212, 1675, 1212, 1212, 1075, 1303, 690, 1303, 1716,
];

/// Colors applied to the badge segments and text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    /// Top stop of the label segment gradient.
    pub label_start: &'static str,
    /// Bottom stop of the label segment gradient.
    pub label_end:   &'static str,
    /// Top stop of the value segment gradient.
    pub value_start: &'static str,
    /// Bottom stop of the value segment gradient.
    pub value_end:   &'static str,
    /// Color of the drop shadow under the text.
    pub shadow:      &'static str,
    /// Text color.
    pub text:        &'static str
}

/// The palette used for every published badge.
pub const PALETTE: Palette = Palette {
    label_start: "#444D56",
    label_end:   "#24292E",
    value_start: "#959DA5",
    value_end:   "#6A737D",
    shadow:      "#010101",
    text:        "#FFFFFF"
};

/// Segment geometry derived from the measured labels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BadgeLayout {
    /// Width of the left (environment) segment.
    pub label_width: f64,
    /// Width of the right (version) segment.
    pub value_width: f64
}

impl BadgeLayout {
    /// Computes segment widths for the given labels.
    pub fn measure<M>(measure: &M, label: &str, value: &str) -> Self
    where
        M: TextMeasure + ?Sized
    {
        Self {
            label_width: round_coordinate(measure.text_width(label) + LABEL_PADDING),
            value_width: round_coordinate(measure.text_width(value) + VALUE_PADDING)
        }
    }

    /// Total width of the SVG canvas.
    pub fn total_width(&self) -> f64 {
        self.label_width + self.value_width + 4.0
    }
}

/// Rendered badge markup together with its geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedBadge {
    /// Geometry used to lay out the segments.
    pub layout: BadgeLayout,
    /// SVG document.
    pub svg:    String
}

/// Renders a badge using [`DejaVuSans`] metrics at [`FONT_SIZE`].
///
/// # Example
///
/// ```
/// use envbadge::render_badge;
///
/// let badge = render_badge("production", "1.4.2");
/// assert!(badge.svg.contains("<title>production - 1.4.2</title>"));
/// ```
pub fn render_badge(label: &str, value: &str) -> RenderedBadge {
    render_badge_with(&DejaVuSans::default(), label, value)
}

/// Renders a badge with a caller-supplied text measurement.
pub fn render_badge_with<M>(measure: &M, label: &str, value: &str) -> RenderedBadge
where
    M: TextMeasure + ?Sized
{
    let layout = BadgeLayout::measure(measure, label, value);
    let svg = build_svg_content(&layout, label, value, &PALETTE);

    RenderedBadge {
        layout,
        svg
    }
}

/// Writes badge markup to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`Error::BadgeIo`](Error::BadgeIo) when directories or the file
/// cannot be created.
pub fn write_badge(path: &Path, svg: &str) -> Result<(), Error> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| error::badge_io_error(parent, source))?;
    }

    let file = File::create(path).map_err(|source| error::badge_io_error(path, source))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(svg.as_bytes())
        .map_err(|source| error::badge_io_error(path, source))?;
    writer
        .flush()
        .map_err(|source| error::badge_io_error(path, source))
}

fn build_svg_content(layout: &BadgeLayout, label: &str, value: &str, palette: &Palette) -> String {
    let mut buffer = String::with_capacity(2048);
    let label = escape_xml(label);
    let value = escape_xml(value);
    let lw = layout.label_width;
    let vw = layout.value_width;
    let total = format_number(layout.total_width());
    let label_width = format_number(lw);
    let value_width = format_number(vw);
    let curve_start = format_number(vw + 1.103);
    let curve_end = format_number(vw + 3.0);

    let _ = writeln!(
        buffer,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{total}\" height=\"{BADGE_HEIGHT}\">"
    );
    let _ = writeln!(buffer, "  <title>{label} - {value}</title>");
    let _ = writeln!(
        buffer,
        "  <defs>\n    <linearGradient id=\"workflow-fill\" x1=\"50%\" y1=\"0%\" x2=\"50%\" y2=\"100%\">\n      <stop stop-color=\"{}\" offset=\"0%\"/>\n      <stop stop-color=\"{}\" offset=\"100%\"/>\n    </linearGradient>\n    <linearGradient id=\"state-fill\" x1=\"50%\" y1=\"0%\" x2=\"50%\" y2=\"100%\">\n      <stop stop-color=\"{}\" offset=\"0%\"/>\n      <stop stop-color=\"{}\" offset=\"100%\"/>\n    </linearGradient>\n  </defs>",
        palette.label_start, palette.label_end, palette.value_start, palette.value_end,
    );
    buffer.push_str("  <g fill=\"none\" fill-rule=\"evenodd\">\n");
    let _ = writeln!(
        buffer,
        "    <g font-family=\"{FONT_FAMILY}\" font-size=\"{}\">",
        format_number(FONT_SIZE)
    );
    let _ = writeln!(
        buffer,
        "      <path id=\"workflow-bg\" d=\"M0,3 C0,1.3431 1.3552,0 3,0 L{label_width},0 L{label_width},20 L3,20 C1.3552,20 0,18.6569 0,17 L0,3 Z\" fill=\"url(#workflow-fill)\" fill-rule=\"nonzero\" rx=\"5\" ry=\"5\"/>"
    );
    let _ = writeln!(
        buffer,
        "      <text fill=\"{}\" fill-opacity=\".3\">\n        <tspan x=\"14\" y=\"15\" aria-hidden=\"true\">{label}</tspan>\n      </text>",
        palette.shadow
    );
    let _ = writeln!(
        buffer,
        "      <text fill=\"{}\">\n        <tspan x=\"14\" y=\"14\">{label}</tspan>\n      </text>",
        palette.text
    );
    buffer.push_str("    </g>\n");
    let _ = writeln!(
        buffer,
        "    <g transform=\"translate({label_width})\" font-family=\"{FONT_FAMILY}\" font-size=\"{}\">",
        format_number(FONT_SIZE)
    );
    let _ = writeln!(
        buffer,
        "      <path d=\"M0 0h{value_width}C{curve_start} 0 {curve_end} 1.343 {curve_end} 3v14c0 1.657-1.39 3-3.103 3H0V0z\" id=\"state-bg\" fill=\"url(#state-fill)\" fill-rule=\"nonzero\" rx=\"5\" ry=\"5\"/>"
    );
    let _ = writeln!(
        buffer,
        "      <text fill=\"{}\" fill-opacity=\".3\" aria-hidden=\"true\">\n        <tspan x=\"6\" y=\"15\">{value}</tspan>\n      </text>",
        palette.shadow
    );
    let _ = writeln!(
        buffer,
        "      <text fill=\"{}\">\n        <tspan x=\"6\" y=\"14\">{value}</tspan>\n      </text>",
        palette.text
    );
    buffer.push_str("    </g>\n  </g>\n</svg>\n");

    buffer
}

fn round_coordinate(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Formats a coordinate with at most three decimals and no trailing zeros.
fn format_number(value: f64) -> String {
    let formatted = format!("{:.3}", round_coordinate(value));
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" { "0".to_owned() } else { trimmed.to_owned() }
}

fn escape_xml(value: &str) -> Cow<'_, str> {
    if value
        .chars()
        .any(|character| matches!(character, '&' | '<' | '>' | '\"' | '\''))
    {
        let mut escaped = String::with_capacity(value.len());
        for character in value.chars() {
            match character {
                '&' => escaped.push_str("&amp;"),
                '<' => escaped.push_str("&lt;"),
                '>' => escaped.push_str("&gt;"),
                '\"' => escaped.push_str("&quot;"),
                '\'' => escaped.push_str("&apos;"),
                other => escaped.push(other)
            }
        }
        Cow::Owned(escaped)
    } else {
        Cow::Borrowed(value)
    }
}
