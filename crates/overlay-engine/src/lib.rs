//! Projects a parsed [`Document`] page onto a raster: category-colored
//! outlines, optional label plates, and a [`HitIndex`] for hover lookups.

mod draw;
mod hit;
mod style;
mod tooltip;

pub use hit::{HitEntry, HitIndex};
pub use style::{legend, style, CategoryStyle, LegendEntry};
pub use tooltip::{label, tooltip, TOOLTIP_CONTENT_CHARS};

use doc_model::{Category, CategorySet, Diagnostics, Document, Page};
use geometry::{bounding_rect, rotate_quarter_turn, to_pixel_polygon};
use image::{ImageBuffer, Rgba};
use imageproc::drawing::Blend;
use std::sync::Arc;

pub type RgbaImage = ImageBuffer<Rgba<u8>, Vec<u8>>;

pub const MIN_STROKE_SCALE: f64 = 0.5;
pub const MAX_STROKE_SCALE: f64 = 8.0;

/// Boxes this many pixels wide or tall, or less, cannot be hovered.
const MIN_BOX_PX: f64 = 2.0;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("page {page} out of range (page_count={page_count})")]
    PageIndexOutOfRange { page: usize, page_count: usize },
    #[error("page image has unusable dimensions {width}x{height}")]
    ImageDimensionMismatch { width: u32, height: u32 },
}

/// Per-request view parameters. The target pixel size is the page image's.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSpec {
    pub filters: CategorySet,
    /// Stroke and label multiplier for pages without a declared size;
    /// geometry ignores it.
    pub zoom: f64,
    pub show_labels: bool,
}

impl Default for RenderSpec {
    fn default() -> Self {
        Self { filters: CategorySet::all(), zoom: 1.0, show_labels: true }
    }
}

#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub image: RgbaImage,
    pub hits: HitIndex,
    pub diagnostics: Diagnostics,
    /// Geometry was turned a quarter to match the raster's orientation.
    pub rotated: bool,
}

/// Draws the filtered items of one page over a copy of `page_image`.
///
/// Only the page index and the image size can fail the call; items that
/// cannot be placed are skipped and reported in the output diagnostics.
pub fn render(
    document: &Document,
    page_index: usize,
    spec: &RenderSpec,
    page_image: &RgbaImage,
) -> Result<RenderOutput, RenderError> {
    let page = document.page(page_index).ok_or(RenderError::PageIndexOutOfRange {
        page: page_index,
        page_count: document.page_count(),
    })?;

    let (width, height) = page_image.dimensions();
    if width == 0 || height == 0 {
        return Err(RenderError::ImageDimensionMismatch { width, height });
    }

    let rotated = needs_rotation(page, width, height);
    let scale = stroke_scale(page, spec.zoom, width, height, rotated);
    let mut surface = Blend(page_image.clone());
    let mut hits = HitIndex::default();
    let mut diagnostics = Diagnostics::new();
    let font = if spec.show_labels { draw::label_font() } else { None };
    if spec.show_labels && font.is_none() {
        tracing::warn!("label font could not be loaded; drawing without labels");
    }

    for category in spec.filters.iter() {
        let style = style(category);
        let thickness = (f64::from(style.stroke_width) * scale).round().max(1.0) as u32;

        for item in page.items(category) {
            if item.geometry.len() < 3 {
                diagnostics.warn(
                    Some(page.index),
                    Some(category),
                    format!("item {} has degenerate geometry", item.id),
                );
                continue;
            }

            let geometry =
                if rotated { rotate_quarter_turn(&item.geometry) } else { item.geometry.clone() };
            let polygon = to_pixel_polygon(&geometry, width, height);
            let Some(rect) = bounding_rect(&polygon) else {
                continue;
            };
            if rect.width() <= MIN_BOX_PX || rect.height() <= MIN_BOX_PX {
                diagnostics.warn(
                    Some(page.index),
                    Some(category),
                    format!("item {} is too small to display", item.id),
                );
                continue;
            }

            if let Some(fill) = style.fill() {
                draw::fill_polygon(&mut surface, &polygon, fill);
            }
            if polygon.is_axis_aligned() {
                draw::stroke_rect(&mut surface, &rect, thickness, style.stroke());
            } else {
                draw::stroke_polygon(&mut surface, &polygon, thickness, style.stroke());
            }

            let plate_text = label(item);
            if let Some(font) = &font {
                let confidence = draw::confidence_tag(item.confidence).unwrap_or_default();
                draw::label_plate(
                    &mut surface,
                    font,
                    polygon.points[0],
                    &[plate_text.as_str(), confidence.as_str()],
                    scale,
                    style.stroke(),
                );
            }

            hits.push(HitEntry {
                rect,
                item: Arc::clone(item),
                tooltip: tooltip(item, page),
                label: plate_text,
            });
        }
    }

    tracing::debug!(
        page = page_index,
        width,
        height,
        hits = hits.len(),
        warnings = diagnostics.len(),
        rotated,
        "rendered page overlay"
    );

    Ok(RenderOutput { image: surface.0, hits, diagnostics, rotated })
}

/// True when the declared page and the raster disagree on portrait versus
/// landscape. Square shapes never trigger a turn.
fn needs_rotation(page: &Page, width: u32, height: u32) -> bool {
    let Some(dimension) = page.dimension.as_ref().filter(|dimension| dimension.is_usable()) else {
        return false;
    };
    if dimension.width == dimension.height || width == height {
        return false;
    }

    dimension.is_portrait() != (width < height)
}

/// Stroke and label multiplier. A page with a declared size uses the
/// raster-to-page ratio, which already carries the zoom of the raster; other
/// pages fall back to the requested zoom.
fn stroke_scale(page: &Page, zoom: f64, width: u32, height: u32, rotated: bool) -> f64 {
    let zoom = if zoom.is_finite() && zoom > 0.0 { zoom } else { 1.0 };

    let declared = page.dimension.as_ref().filter(|dimension| dimension.is_usable());
    let scale = declared.map_or(zoom, |dimension| {
        let (page_w, page_h) = if rotated {
            (dimension.height, dimension.width)
        } else {
            (dimension.width, dimension.height)
        };
        (f64::from(width) / page_w).min(f64::from(height) / page_h)
    });

    scale.clamp(MIN_STROKE_SCALE, MAX_STROKE_SCALE)
}

/// Render spec for the categories present in `filters` only.
pub fn filtered(filters: impl IntoIterator<Item = Category>) -> RenderSpec {
    RenderSpec { filters: filters.into_iter().collect(), ..RenderSpec::default() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_model::{parse, PageDimension};
    use geometry::PixelPoint;
    use serde_json::json;

    fn white(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]))
    }

    fn page_with_dimension(width: f64, height: f64) -> Page {
        Page {
            dimension: Some(PageDimension { width, height, unit: None }),
            ..Page::default()
        }
    }

    fn single_line(x0: f64, y0: f64, x1: f64, y1: f64) -> Document {
        parse(json!({ "pages": [{ "lines": [{ "layout": { "boundingPoly": { "normalizedVertices": [
            { "x": x0, "y": y0 }, { "x": x1, "y": y0 }, { "x": x1, "y": y1 }, { "x": x0, "y": y1 }
        ]}}}]}]}))
        .expect("line document should parse")
    }

    fn invoice_line() -> Document {
        parse(json!({ "text": "INVOICE\n", "pages": [{ "lines": [{ "layout": {
            "textAnchor": { "textSegments": [{ "endIndex": "7" }] },
            "confidence": 0.97,
            "boundingPoly": { "normalizedVertices": [
                { "x": 0.1, "y": 0.1 }, { "x": 0.3, "y": 0.1 },
                { "x": 0.3, "y": 0.15 }, { "x": 0.1, "y": 0.15 }
            ]}
        }}]}]}))
        .expect("invoice line should parse")
    }

    #[test]
    fn rejects_out_of_range_page() {
        let document = single_line(0.1, 0.1, 0.3, 0.15);
        let err = render(&document, 1, &RenderSpec::default(), &white(10, 10))
            .expect_err("page 1 does not exist");

        assert_eq!(err, RenderError::PageIndexOutOfRange { page: 1, page_count: 1 });
        assert_eq!(err.to_string(), "page 1 out of range (page_count=1)");
    }

    #[test]
    fn rejects_zero_sized_image() {
        let document = single_line(0.1, 0.1, 0.3, 0.15);
        let err = render(&document, 0, &RenderSpec::default(), &white(0, 10))
            .expect_err("zero width is unusable");

        assert_eq!(err, RenderError::ImageDimensionMismatch { width: 0, height: 10 });
    }

    #[test]
    fn tiny_boxes_are_skipped_with_warning() {
        let document = single_line(0.1, 0.1, 0.3, 0.101);
        let output = render(&document, 0, &RenderSpec::default(), &white(800, 600))
            .expect("render should succeed");

        assert!(output.hits.is_empty());
        assert_eq!(output.diagnostics.len(), 1);
    }

    #[test]
    fn does_not_modify_the_source_image() {
        let document = single_line(0.1, 0.1, 0.3, 0.15);
        let source = white(800, 600);
        let output =
            render(&document, 0, &RenderSpec::default(), &source).expect("render should succeed");

        assert!(source.pixels().all(|pixel| *pixel == Rgba([255, 255, 255, 255])));
        assert_ne!(output.image, source);
    }

    #[test]
    fn rotation_applies_only_on_orientation_mismatch() {
        let portrait = page_with_dimension(612.0, 792.0);

        assert!(needs_rotation(&portrait, 1000, 800));
        assert!(!needs_rotation(&portrait, 800, 1000));
        assert!(!needs_rotation(&portrait, 800, 800));
        assert!(!needs_rotation(&Page::default(), 1000, 800));
    }

    #[test]
    fn stroke_scale_follows_raster_to_page_ratio() {
        let page = page_with_dimension(612.0, 792.0);

        assert_eq!(stroke_scale(&page, 1.0, 1224, 1584, false), 2.0);
        assert_eq!(stroke_scale(&page, 2.0, 1224, 1584, false), 2.0);
        assert_eq!(stroke_scale(&page, 1.0, 1584, 1224, true), 2.0);
        assert_eq!(stroke_scale(&Page::default(), 3.0, 100, 100, false), 3.0);
        assert_eq!(stroke_scale(&page, 1.0, 61, 79, false), MIN_STROKE_SCALE);
        assert_eq!(stroke_scale(&Page::default(), 20.0, 100, 100, false), MAX_STROKE_SCALE);
        assert_eq!(stroke_scale(&Page::default(), f64::NAN, 100, 100, false), 1.0);
    }

    #[test]
    fn rotated_render_reports_flag_and_moves_geometry() {
        let document = parse(json!({ "pages": [{
            "dimension": { "width": 600, "height": 800 },
            "lines": [{ "layout": { "boundingPoly": { "normalizedVertices": [
                { "x": 0.1, "y": 0.2 }, { "x": 0.3, "y": 0.2 },
                { "x": 0.3, "y": 0.4 }, { "x": 0.1, "y": 0.4 }
            ]}}}]
        }]}))
        .expect("document should parse");

        let output = render(&document, 0, &RenderSpec::default(), &white(1000, 500))
            .expect("render should succeed");

        assert!(output.rotated);
        let rect = output.hits.entries()[0].rect;
        assert!((rect.min_x - 600.0).abs() < 1e-6, "{rect:?}");
        assert!((rect.min_y - 50.0).abs() < 1e-6, "{rect:?}");
        assert!(output.hits.hit_test(PixelPoint::new(700.0, 100.0)).is_some());
    }

    #[test]
    fn labels_carry_rendered_text() {
        let document = invoice_line();
        let stroke = style(Category::TextLine).stroke();
        let white_pixel = Rgba([255, 255, 255, 255]);
        // Inside the plate above the first vertex (80, 60), clear of its border.
        let plate = |image: &RgbaImage| -> Vec<Rgba<u8>> {
            (42..56)
                .flat_map(|y| (82..100).map(move |x| (x, y)))
                .map(|(x, y)| *image.get_pixel(x, y))
                .collect()
        };

        let labelled = render(&document, 0, &RenderSpec::default(), &white(800, 600))
            .expect("render should succeed");
        let pixels = plate(&labelled.image);
        assert!(pixels.iter().any(|pixel| *pixel != white_pixel && *pixel != stroke));

        let bare = RenderSpec { show_labels: false, ..RenderSpec::default() };
        let unlabelled =
            render(&document, 0, &bare, &white(800, 600)).expect("render should succeed");
        assert!(plate(&unlabelled.image).iter().all(|pixel| *pixel == white_pixel));
        assert_eq!(labelled.hits.entries()[0].label, unlabelled.hits.entries()[0].label);
    }
}
