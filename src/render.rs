use crate::config::RenderConfig;
use crate::fonts::FontChoice;
use crate::layout::Layout;
use crate::theme::Theme;
use resvg::tiny_skia::{Color, Pixmap, Transform};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("failed to read image {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image {path}: {reason}")]
    Decode { path: PathBuf, reason: String },
    #[error("unsupported base image format `{0}` (expected png, svg or pdf)")]
    Unsupported(String),
    #[error("invalid SVG: {0}")]
    Svg(#[from] usvg::Error),
    #[error("cannot allocate a {width}x{height} image")]
    Allocation { width: u32, height: u32 },
    #[error("failed to encode PNG {path}: {reason}")]
    Encode { path: PathBuf, reason: String },
}

/// usvg options backed by an already loaded font database.
pub fn svg_options(fontdb: Arc<fontdb::Database>, font: &FontChoice) -> usvg::Options<'static> {
    let mut opt = usvg::Options::default();
    opt.fontdb = fontdb;
    opt.font_family = font.family.clone();
    opt
}

pub fn render_svg(layout: &Layout, theme: &Theme, config: &RenderConfig, font: &FontChoice) -> String {
    let mut svg = String::new();
    let width = layout.width;
    let height = layout.height;
    let family = escape_xml(&font.css_family());

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        config.background
    ));

    for edge in &layout.edges {
        let d = points_to_path(&edge.points);
        if d.is_empty() {
            continue;
        }
        svg.push_str(&format!(
            "<path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\" stroke-opacity=\"{}\"/>",
            d, theme.line_color, config.edge_width, config.edge_opacity
        ));
    }

    for node in &layout.nodes {
        svg.push_str(&format!(
            "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{:.2}\" fill=\"{}\" fill-opacity=\"{}\" stroke=\"{}\" stroke-width=\"0.8\"/>",
            node.x,
            node.y,
            node.radius,
            theme.category_color(&node.category),
            config.node_opacity,
            theme.node_border
        ));
    }

    for node in &layout.nodes {
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" dominant-baseline=\"central\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
            node.x,
            node.y,
            family,
            theme.font_size,
            theme.text_color,
            escape_xml(&node.label)
        ));
    }

    svg.push_str("</svg>");
    svg
}

fn points_to_path(points: &[(f32, f32)]) -> String {
    if points.len() < 2 || points.iter().all(|p| *p == points[0]) {
        return String::new();
    }
    let mut d = String::new();
    d.push_str(&format!("M {:.2} {:.2}", points[0].0, points[0].1));
    for point in points.iter().skip(1) {
        d.push_str(&format!(" L {:.2} {:.2}", point.0, point.1));
    }
    d
}

/// Renders SVG data at `scale` into a fresh pixmap, optionally over a solid background.
pub fn rasterize_svg(
    data: &[u8],
    opt: &usvg::Options<'_>,
    scale: f32,
    background: Option<Color>,
) -> Result<Pixmap, ImageError> {
    let tree = usvg::Tree::from_data(data, opt)?;
    let size = tree.size();
    let width = (size.width() * scale).ceil().max(1.0) as u32;
    let height = (size.height() * scale).ceil().max(1.0) as u32;
    let mut pixmap = Pixmap::new(width, height).ok_or(ImageError::Allocation { width, height })?;
    if let Some(color) = background {
        pixmap.fill(color);
    }
    resvg::render(&tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());
    Ok(pixmap)
}

/// Draws SVG data on top of an existing pixmap at 1:1 scale.
pub fn composite_svg(pixmap: &mut Pixmap, data: &[u8], opt: &usvg::Options<'_>) -> Result<(), ImageError> {
    let tree = usvg::Tree::from_data(data, opt)?;
    resvg::render(&tree, Transform::default(), &mut pixmap.as_mut());
    Ok(())
}

pub fn save_png(pixmap: &Pixmap, output: &Path) -> Result<(), ImageError> {
    pixmap.save_png(output).map_err(|err| ImageError::Encode {
        path: output.to_path_buf(),
        reason: err.to_string(),
    })
}

pub fn write_output_png(svg: &str, output: &Path, opt: &usvg::Options<'_>) -> anyhow::Result<()> {
    let pixmap = rasterize_svg(svg.as_bytes(), opt, 1.0, None)?;
    save_png(&pixmap, output)?;
    Ok(())
}

pub fn write_output_svg(svg: &str, output: &Path) -> anyhow::Result<()> {
    std::fs::write(output, svg)?;
    Ok(())
}

/// Escapes markup characters and drops code points XML 1.0 does not allow,
/// so untrusted labels can never make the document unparsable.
pub(crate) fn escape_xml(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            ch if is_xml_char(ch) => out.push(ch),
            _ => {}
        }
    }
    out
}

fn is_xml_char(ch: char) -> bool {
    matches!(ch,
        '\t' | '\n' | '\r'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}
