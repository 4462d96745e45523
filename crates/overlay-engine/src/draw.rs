use crate::RgbaImage;
use ab_glyph::{FontRef, PxScale};
use geometry::{PixelPoint, PixelPolygon, PixelRect};
use image::Rgba;
use imageproc::drawing::{
    draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut, draw_polygon_mut,
    draw_text_mut, text_size, Blend,
};
use imageproc::point::Point;
use imageproc::rect::Rect;

/// Alpha-blending canvas over the output raster.
pub(crate) type Surface = Blend<RgbaImage>;

const LABEL_FONT_PX: f64 = 12.0;
const LABEL_PADDING_PX: f64 = 2.0;
const LABEL_RISE_PX: f64 = 20.0;
const LABEL_LINE_PX: f64 = 15.0;

static LABEL_FONT: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

const PLATE_BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Ring offsets of a stroke `thickness` pixels wide, centred on the edge.
fn ring_offsets(thickness: u32) -> impl Iterator<Item = i32> {
    let thickness = thickness.max(1) as i32;
    let inset = thickness / 2;
    (0..thickness).map(move |step| step - inset)
}

fn rect_at(left: i32, top: i32, width: i32, height: i32) -> Option<Rect> {
    (width > 0 && height > 0).then(|| Rect::at(left, top).of_size(width as u32, height as u32))
}

pub(crate) fn stroke_rect(
    surface: &mut Surface,
    rect: &PixelRect,
    thickness: u32,
    color: Rgba<u8>,
) {
    let left = rect.min_x.round() as i32;
    let top = rect.min_y.round() as i32;
    let width = (rect.max_x.round() as i32) - left;
    let height = (rect.max_y.round() as i32) - top;

    for offset in ring_offsets(thickness) {
        if let Some(ring) =
            rect_at(left - offset, top - offset, width + 2 * offset, height + 2 * offset)
        {
            draw_hollow_rect_mut(surface, ring, color);
        }
    }
}

/// Strokes a closed polygon by drawing each edge shifted along its normal.
pub(crate) fn stroke_polygon(
    surface: &mut Surface,
    polygon: &PixelPolygon,
    thickness: u32,
    color: Rgba<u8>,
) {
    let points = &polygon.points;
    for (index, start) in points.iter().enumerate() {
        let end = points[(index + 1) % points.len()];
        let (dx, dy) = (end.x - start.x, end.y - start.y);
        let length = dx.hypot(dy);
        if length == 0.0 {
            continue;
        }
        let (nx, ny) = (-dy / length, dx / length);

        for offset in ring_offsets(thickness) {
            let shift = f64::from(offset);
            draw_line_segment_mut(
                surface,
                ((start.x + nx * shift) as f32, (start.y + ny * shift) as f32),
                ((end.x + nx * shift) as f32, (end.y + ny * shift) as f32),
                color,
            );
        }
    }
}

pub(crate) fn fill_polygon(surface: &mut Surface, polygon: &PixelPolygon, color: Rgba<u8>) {
    let mut points: Vec<Point<i32>> = Vec::with_capacity(polygon.len());
    for point in &polygon.points {
        let point = Point::new(point.x.round() as i32, point.y.round() as i32);
        if points.last() != Some(&point) {
            points.push(point);
        }
    }
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }

    if points.len() >= 3 {
        draw_polygon_mut(surface, &points, color);
    }
}

/// The bundled label typeface.
pub(crate) fn label_font() -> Option<FontRef<'static>> {
    FontRef::try_from_slice(LABEL_FONT).ok()
}

/// Second plate line for items the service was not certain about.
pub(crate) fn confidence_tag(confidence: f64) -> Option<String> {
    (confidence < 1.0).then(|| format!("{:.0}%", confidence * 100.0))
}

/// Draws a label plate above `anchor`, the item's first vertex: a white
/// plate with a category-colored border and one text line per entry of
/// `lines`. Empty lines are dropped.
pub(crate) fn label_plate(
    surface: &mut Surface,
    font: &FontRef<'_>,
    anchor: PixelPoint,
    lines: &[&str],
    scale: f64,
    color: Rgba<u8>,
) {
    let lines: Vec<&str> = lines.iter().copied().filter(|line| !line.is_empty()).collect();
    if lines.is_empty() {
        return;
    }

    let font_scale = PxScale::from((LABEL_FONT_PX * scale) as f32);
    let padding = (LABEL_PADDING_PX * scale).round() as i32;
    let line_height = (LABEL_LINE_PX * scale).round().max(1.0) as i32;
    let text_width =
        lines.iter().map(|line| text_size(font_scale, font, line).0).max().unwrap_or(0) as i32;

    let left = anchor.x.round() as i32;
    let top = (anchor.y - LABEL_RISE_PX * scale).max(0.0).round() as i32;
    let width = text_width + 2 * padding;
    let height = line_height * lines.len() as i32 + 2 * padding;

    if let Some(plate) = rect_at(left, top, width, height) {
        draw_filled_rect_mut(surface, plate, PLATE_BACKGROUND);
        draw_hollow_rect_mut(surface, plate, color);
    }
    for (index, line) in lines.iter().enumerate() {
        let y = top + padding + index as i32 * line_height;
        draw_text_mut(surface, color, left + padding, y, font_scale, font, line);
    }
}
