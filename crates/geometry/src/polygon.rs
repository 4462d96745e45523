use crate::{GeometryError, NormalizedPoint};
use std::cmp::Ordering;

/// Clamps, deduplicates and orders raw vertices into the canonical polygon
/// form: clockwise on screen, starting from the top-left-most vertex.
pub fn normalize_polygon(raw: &[NormalizedPoint]) -> Result<Vec<NormalizedPoint>, GeometryError> {
    if raw.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return Err(GeometryError::NonFinite);
    }

    let mut distinct: Vec<NormalizedPoint> = Vec::with_capacity(raw.len());
    for point in raw.iter().map(|p| p.clamped()) {
        if !distinct.iter().any(|seen| seen.same_as(&point)) {
            distinct.push(point);
        }
    }

    if distinct.len() < 3 {
        return Err(GeometryError::Degenerate { distinct: distinct.len() });
    }

    Ok(order_clockwise(distinct))
}

/// Sorts vertices by angle around their centroid (clockwise in y-down space)
/// and rotates the result so it starts at the top-left-most vertex.
pub fn order_clockwise(mut points: Vec<NormalizedPoint>) -> Vec<NormalizedPoint> {
    if points.is_empty() {
        return points;
    }

    let count = points.len() as f64;
    let cx = points.iter().map(|p| p.x).sum::<f64>() / count;
    let cy = points.iter().map(|p| p.y).sum::<f64>() / count;

    points.sort_by(|a, b| {
        let angle_a = (a.y - cy).atan2(a.x - cx);
        let angle_b = (b.y - cy).atan2(b.x - cx);
        angle_a.total_cmp(&angle_b)
    });

    let start = points
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| top_left_order(a, b))
        .map(|(index, _)| index)
        .unwrap_or(0);
    points.rotate_left(start);

    points
}

fn top_left_order(a: &NormalizedPoint, b: &NormalizedPoint) -> Ordering {
    (a.x + a.y)
        .total_cmp(&(b.x + b.y))
        .then_with(|| a.y.total_cmp(&b.y))
        .then_with(|| a.x.total_cmp(&b.x))
}

/// Canonical four-vertex polygon for the rectangle spanned by `min` and `max`.
pub fn rect_polygon(min: NormalizedPoint, max: NormalizedPoint) -> Vec<NormalizedPoint> {
    vec![
        NormalizedPoint::new(min.x, min.y),
        NormalizedPoint::new(max.x, min.y),
        NormalizedPoint::new(max.x, max.y),
        NormalizedPoint::new(min.x, max.y),
    ]
}

/// Maps `(x, y)` to `(1 - y, x)`: a quarter turn clockwise, used when the
/// raster's orientation disagrees with the page's declared orientation.
pub fn rotate_quarter_turn(points: &[NormalizedPoint]) -> Vec<NormalizedPoint> {
    order_clockwise(points.iter().map(|p| NormalizedPoint::new(1.0 - p.y, p.x)).collect())
}
