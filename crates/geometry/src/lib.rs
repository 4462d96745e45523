//! Coordinate math shared by the result model and the overlay engine.
//!
//! Source geometry lives in page-normalized space (`[0, 1]` on both axes,
//! origin top-left, y growing downward). Rendering projects it onto a raster
//! of known pixel size. Everything here is pure and deterministic.

mod polygon;

pub use polygon::{normalize_polygon, order_clockwise, rect_polygon, rotate_quarter_turn};

use serde::{Deserialize, Serialize};

/// Vertices closer than this (in normalized units) count as the same point.
pub const VERTEX_EPSILON: f64 = 1e-6;

/// Pixel tolerance used when deciding whether a polygon is axis-aligned.
const AXIS_TOLERANCE_PX: f64 = 0.5;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GeometryError {
    #[error("degenerate polygon: {distinct} distinct vertices, need at least 3")]
    Degenerate { distinct: usize },
    #[error("polygon has a non-finite coordinate")]
    NonFinite,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPoint {
    pub x: f64,
    pub y: f64,
}

impl NormalizedPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn clamped(self) -> Self {
        Self { x: self.x.clamp(0.0, 1.0), y: self.y.clamp(0.0, 1.0) }
    }

    fn same_as(&self, other: &Self) -> bool {
        (self.x - other.x).abs() <= VERTEX_EPSILON && (self.y - other.y).abs() <= VERTEX_EPSILON
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Polygon in raster pixel space. Coordinates stay fractional until drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PixelPolygon {
    pub points: Vec<PixelPoint>,
}

impl PixelPolygon {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// True when every vertex sits on the polygon's bounding rectangle corners.
    pub fn is_axis_aligned(&self) -> bool {
        let Some(rect) = bounding_rect(self) else {
            return false;
        };

        self.points.len() == 4
            && self.points.iter().all(|p| {
                let on_x = (p.x - rect.min_x).abs() <= AXIS_TOLERANCE_PX
                    || (p.x - rect.max_x).abs() <= AXIS_TOLERANCE_PX;
                let on_y = (p.y - rect.min_y).abs() <= AXIS_TOLERANCE_PX
                    || (p.y - rect.max_y).abs() <= AXIS_TOLERANCE_PX;
                on_x && on_y
            })
    }
}

/// Axis-aligned rectangle with half-open extent `[min, max)` on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelRect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl PixelRect {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    pub fn width(&self) -> f64 {
        (self.max_x - self.min_x).max(0.0)
    }

    pub fn height(&self) -> f64 {
        (self.max_y - self.min_y).max(0.0)
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn contains(&self, point: PixelPoint) -> bool {
        contains(self, point)
    }
}

/// Projects normalized vertices onto a raster of the given pixel size.
pub fn to_pixel_polygon(
    vertices: &[NormalizedPoint],
    pixel_width: u32,
    pixel_height: u32,
) -> PixelPolygon {
    let width = f64::from(pixel_width);
    let height = f64::from(pixel_height);

    PixelPolygon {
        points: vertices.iter().map(|v| PixelPoint { x: v.x * width, y: v.y * height }).collect(),
    }
}

pub fn bounding_rect(polygon: &PixelPolygon) -> Option<PixelRect> {
    let first = polygon.points.first()?;
    let mut rect = PixelRect::new(first.x, first.y, first.x, first.y);

    for point in &polygon.points[1..] {
        rect.min_x = rect.min_x.min(point.x);
        rect.min_y = rect.min_y.min(point.y);
        rect.max_x = rect.max_x.max(point.x);
        rect.max_y = rect.max_y.max(point.y);
    }

    Some(rect)
}

/// Half-open containment: a point on a shared edge belongs to exactly one of
/// two adjacent rectangles.
pub fn contains(rect: &PixelRect, point: PixelPoint) -> bool {
    point.x >= rect.min_x && point.x < rect.max_x && point.y >= rect.min_y && point.y < rect.max_y
}

pub fn overlap_area(a: &PixelRect, b: &PixelRect) -> f64 {
    let width = a.max_x.min(b.max_x) - a.min_x.max(b.min_x);
    let height = a.max_y.min(b.max_y) - a.min_y.max(b.min_y);

    if width <= 0.0 || height <= 0.0 {
        return 0.0;
    }

    width * height
}

/// Normalized bounds `(min, max)` covering every given polygon.
pub fn union_bounds<'a, I>(polygons: I) -> Option<(NormalizedPoint, NormalizedPoint)>
where
    I: IntoIterator<Item = &'a [NormalizedPoint]>,
{
    let mut bounds: Option<(NormalizedPoint, NormalizedPoint)> = None;

    for point in polygons.into_iter().flatten() {
        bounds = Some(match bounds {
            None => (*point, *point),
            Some((min, max)) => (
                NormalizedPoint::new(min.x.min(point.x), min.y.min(point.y)),
                NormalizedPoint::new(max.x.max(point.x), max.y.max(point.y)),
            ),
        });
    }

    bounds
}
