use std::fmt::Write as _;
use std::sync::Arc;

use crate::foundation::error::{RelayError, RelayResult};

/// One run of text, positioned by its baseline origin.
#[derive(Clone, Debug, PartialEq)]
pub struct Label {
    pub x: f32,
    pub y: f32,
    pub text: String,
}

impl Label {
    pub fn new(x: f32, y: f32, text: impl Into<String>) -> Self {
        Self {
            x,
            y,
            text: text.into(),
        }
    }
}

/// Styling shared by every label in a layer.
#[derive(Clone, Debug)]
pub struct LabelStyle {
    pub font_size: f32,
    pub bold: bool,
    /// Straight RGBA.
    pub color: [u8; 4],
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            font_size: 10.0,
            bold: true,
            color: [0, 0, 0, 200],
        }
    }
}

pub(crate) fn labels_svg(width: u32, height: u32, labels: &[Label], style: &LabelStyle) -> String {
    let [r, g, b, a] = style.color;
    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    );
    let _ = write!(
        svg,
        r#"<g font-family="Go, sans-serif" font-size="{}" font-weight="{}" fill="rgb({r},{g},{b})" fill-opacity="{:.4}">"#,
        style.font_size,
        if style.bold { "bold" } else { "normal" },
        f32::from(a) / 255.0,
    );
    for label in labels {
        let _ = write!(
            svg,
            r#"<text x="{}" y="{}" xml:space="preserve">{}</text>"#,
            label.x,
            label.y,
            escape_xml(&label.text)
        );
    }
    svg.push_str("</g></svg>");
    svg
}

/// Rasterizes `labels` into a transparent `width` x `height` premultiplied RGBA8 layer.
pub fn rasterize_labels(
    width: u32,
    height: u32,
    labels: &[Label],
    style: &LabelStyle,
    fontdb: Arc<usvg::fontdb::Database>,
) -> RelayResult<Vec<u8>> {
    let svg = labels_svg(width, height, labels, style);
    let opts = usvg::Options {
        fontdb,
        ..Default::default()
    };
    let tree = usvg::Tree::from_str(&svg, &opts)
        .map_err(|e| RelayError::validation(format!("label layer: {e}")))?;

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| RelayError::validation("failed to allocate label pixmap"))?;
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::default(),
        &mut pixmap.as_mut(),
    );
    Ok(pixmap.take())
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/postcard/label.rs"]
mod tests;
