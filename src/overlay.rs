//! Draws a placement marker and its label onto the blueprint image.

use crate::config::OverlayConfig;
use crate::fonts::{self, FontChoice};
use crate::render::{ImageError, composite_svg, escape_xml, rasterize_svg, svg_options};
use crate::theme::Theme;
use hayro::{InterpreterSettings, Pdf, RenderSettings};
use resvg::tiny_skia::{Color, Pixmap, PixmapPaint, Transform};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// SVG user units per inch.
const SVG_UNITS_PER_INCH: f32 = 96.0;
/// PDF points per inch.
const PDF_POINTS_PER_INCH: f32 = 72.0;

/// Loads the base image: PNG as is, SVG and the first PDF page rasterized at
/// `dpi` on white.
pub fn load_base_image(path: &Path, dpi: f32, opt: &usvg::Options<'_>) -> Result<Pixmap, ImageError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let read = || {
        std::fs::read(path).map_err(|source| ImageError::Io {
            path: path.to_path_buf(),
            source,
        })
    };
    let pixmap = match extension.as_str() {
        "png" => Pixmap::decode_png(&read()?).map_err(|err| ImageError::Decode {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?,
        "svg" | "svgz" => {
            let scale = dpi.max(1.0) / SVG_UNITS_PER_INCH;
            rasterize_svg(&read()?, opt, scale, Some(Color::WHITE))?
        }
        "pdf" => rasterize_pdf_page(read()?, path, dpi.max(1.0) / PDF_POINTS_PER_INCH)?,
        other => return Err(ImageError::Unsupported(other.to_string())),
    };
    info!(
        path = %path.display(),
        width = pixmap.width(),
        height = pixmap.height(),
        "loaded base image"
    );
    Ok(pixmap)
}

fn rasterize_pdf_page(data: Vec<u8>, path: &Path, scale: f32) -> Result<Pixmap, ImageError> {
    let decode_error = |reason: &str| ImageError::Decode {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };
    let pdf = Pdf::new(Arc::new(data)).map_err(|_| decode_error("not a readable PDF document"))?;
    let pages = pdf.pages();
    let page = pages.iter().next().ok_or_else(|| decode_error("PDF has no pages"))?;
    let settings = RenderSettings {
        x_scale: scale,
        y_scale: scale,
        ..Default::default()
    };
    let rendered = hayro::render(page, &InterpreterSettings::default(), &settings);
    let page_image = Pixmap::decode_png(&rendered.take_png()).map_err(|err| decode_error(&err.to_string()))?;

    let (width, height) = (page_image.width(), page_image.height());
    let mut pixmap = Pixmap::new(width, height).ok_or(ImageError::Allocation { width, height })?;
    pixmap.fill(Color::WHITE);
    pixmap.draw_pixmap(
        0,
        0,
        page_image.as_ref(),
        &PixmapPaint::default(),
        Transform::identity(),
        None,
    );
    debug!(path = %path.display(), scale, "rasterized first PDF page");
    Ok(pixmap)
}

/// Marker and label as an SVG layer the size of the base image.
#[allow(clippy::too_many_arguments)]
pub fn overlay_svg(
    width: u32,
    height: u32,
    x: i64,
    y: i64,
    label: &str,
    config: &OverlayConfig,
    theme: &Theme,
    font: &FontChoice,
) -> String {
    let radius = config.marker_radius;
    let text_x = x as f32 + radius + config.label_gap;
    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">\
<circle cx=\"{x}\" cy=\"{y}\" r=\"{radius}\" fill=\"{fill}\" stroke=\"{stroke}\" stroke-width=\"{stroke_width}\"/>\
<text x=\"{text_x}\" y=\"{y}\" dominant-baseline=\"central\" font-family=\"{family}\" font-size=\"{size}\" fill=\"{color}\">{label}</text>\
</svg>",
        fill = theme.marker_fill,
        stroke = theme.marker_border,
        stroke_width = config.marker_stroke_width,
        family = escape_xml(&font.css_family()),
        size = config.font_size,
        color = theme.marker_label,
        label = escape_xml(label),
    )
}

/// Holds the font database and resolved label font for one run.
pub struct OverlayRenderer {
    options: usvg::Options<'static>,
    font: FontChoice,
    config: OverlayConfig,
    theme: Theme,
}

impl OverlayRenderer {
    pub fn new(config: &OverlayConfig, theme: &Theme) -> Self {
        let db = fonts::load_font_database(&config.font_files);
        let font = fonts::resolve_family(&db, &config.font_families);
        Self {
            options: svg_options(Arc::new(db), &font),
            font,
            config: config.clone(),
            theme: theme.clone(),
        }
    }

    pub fn load_base_image(&self, path: &Path) -> Result<Pixmap, ImageError> {
        load_base_image(path, self.config.dpi, &self.options)
    }

    /// Draws one marker at `(x, y)` with `label` to its right.
    pub fn overlay(&self, image: &mut Pixmap, x: i64, y: i64, label: &str) -> Result<(), ImageError> {
        let svg = overlay_svg(
            image.width(),
            image.height(),
            x,
            y,
            label,
            &self.config,
            &self.theme,
            &self.font,
        );
        debug!(x, y, label, family = %self.font.family, "drawing overlay");
        composite_svg(image, svg.as_bytes(), &self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::parse_answer;
    use crate::render::save_png;

    fn renderer() -> OverlayRenderer {
        OverlayRenderer::new(&OverlayConfig::default(), &Theme::default())
    }

    #[test]
    fn overlay_svg_places_label_right_of_marker() {
        let font = FontChoice {
            family: "Noto Sans CJK TC".to_string(),
            degraded: false,
        };
        let svg = overlay_svg(1200, 900, 350, 450, "悠閒 & co", &OverlayConfig::default(), &Theme::default(), &font);
        assert!(svg.contains("<circle cx=\"350\" cy=\"450\" r=\"8\""));
        assert!(svg.contains("<text x=\"362\" y=\"450\" dominant-baseline=\"central\""));
        assert!(svg.contains("悠閒 &amp; co"));
        assert!(svg.contains("font-family=\"&apos;Noto Sans CJK TC&apos;, sans-serif\""));
    }

    #[test]
    fn marker_is_filled_at_target() {
        let renderer = renderer();
        let mut image = Pixmap::new(200, 100).unwrap();
        image.fill(Color::WHITE);
        renderer.overlay(&mut image, 50, 50, "Label").unwrap();
        let center = image.pixel(50, 50).unwrap();
        assert_eq!((center.red(), center.green(), center.blue()), (0x46, 0x82, 0xDC));
        let far = image.pixel(5, 5).unwrap();
        assert_eq!((far.red(), far.green(), far.blue()), (255, 255, 255));
    }

    #[test]
    fn control_characters_in_answer_label_do_not_abort_overlay() {
        let decision =
            parse_answer(r#"{"label": "NM\u0001", "grid_col": 3, "grid_row": 5}"#, "New Movement").unwrap();
        assert_eq!(decision.label, "NM\u{1}");
        let renderer = renderer();
        let mut image = Pixmap::new(1200, 1200).unwrap();
        image.fill(Color::WHITE);
        renderer.overlay(&mut image, 350, 550, &decision.label).unwrap();
        let center = image.pixel(350, 550).unwrap();
        assert_eq!((center.red(), center.green(), center.blue()), (0x46, 0x82, 0xDC));
    }

    #[test]
    fn offscreen_marker_is_not_an_error() {
        let renderer = renderer();
        let mut image = Pixmap::new(20, 20).unwrap();
        renderer.overlay(&mut image, -100, 500, "gone").unwrap();
    }

    #[test]
    fn loads_png_and_svg_bases() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("base.png");
        save_png(&Pixmap::new(30, 20).unwrap(), &png).unwrap();
        let svg = dir.path().join("base.svg");
        std::fs::write(
            &svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="96" height="192"><rect width="10" height="10"/></svg>"#,
        )
        .unwrap();

        let opt = usvg::Options::default();
        let image = load_base_image(&png, 150.0, &opt).unwrap();
        assert_eq!((image.width(), image.height()), (30, 20));
        let image = load_base_image(&svg, 192.0, &opt).unwrap();
        assert_eq!((image.width(), image.height()), (192, 384));
        let corner = image.pixel(191, 383).unwrap();
        assert_eq!(corner.alpha(), 255);
    }

    #[test]
    fn rasterizes_first_pdf_page_at_dpi() {
        let pdf = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/half_blue.pdf");
        let opt = usvg::Options::default();
        // 72 x 36 pt page at 144 dpi.
        let image = load_base_image(&pdf, 144.0, &opt).unwrap();
        assert_eq!((image.width(), image.height()), (144, 72));
        let square = image.pixel(20, 36).unwrap();
        assert!(square.red() < 8 && square.green() < 8 && square.blue() > 247, "{square:?}");
        let blank = image.pixel(120, 36).unwrap();
        assert_eq!((blank.red(), blank.green(), blank.blue(), blank.alpha()), (255, 255, 255, 255));
    }

    #[test]
    fn rejects_unknown_formats_and_unreadable_files() {
        let opt = usvg::Options::default();
        let err = load_base_image(Path::new("blueprint art05.tiff"), 150.0, &opt).unwrap_err();
        assert!(matches!(err, ImageError::Unsupported(ext) if ext == "tiff"));
        let err = load_base_image(Path::new("/no/such/base.png"), 150.0, &opt).unwrap_err();
        assert!(matches!(err, ImageError::Io { .. }));

        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("fake.pdf");
        std::fs::write(&fake, "not a pdf").unwrap();
        let err = load_base_image(&fake, 150.0, &opt).unwrap_err();
        assert!(matches!(err, ImageError::Decode { .. }));
    }
}
