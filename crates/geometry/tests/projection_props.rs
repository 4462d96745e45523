use geometry::{
    bounding_rect, contains, normalize_polygon, to_pixel_polygon, NormalizedPoint, PixelPoint,
    PixelRect,
};
use proptest::prelude::*;

fn unit() -> impl Strategy<Value = f64> {
    0.0f64..=1.0
}

proptest! {
    #[test]
    fn pixel_projection_round_trips(
        x in unit(),
        y in unit(),
        width in 1u32..10_000,
        height in 1u32..10_000,
    ) {
        let polygon = to_pixel_polygon(&[NormalizedPoint::new(x, y)], width, height);
        let point = polygon.points[0];

        prop_assert!((point.x / f64::from(width) - x).abs() < 1e-9);
        prop_assert!((point.y / f64::from(height) - y).abs() < 1e-9);
    }

    #[test]
    fn normalization_is_deterministic_and_in_range(
        raw in prop::collection::vec((-0.5f64..1.5, -0.5f64..1.5), 3..8),
    ) {
        let points: Vec<NormalizedPoint> =
            raw.iter().map(|(x, y)| NormalizedPoint::new(*x, *y)).collect();

        let first = normalize_polygon(&points);
        let second = normalize_polygon(&points);
        prop_assert_eq!(&first, &second);

        if let Ok(polygon) = first {
            prop_assert!(polygon.len() >= 3);
            prop_assert!(polygon
                .iter()
                .all(|p| (0.0..=1.0).contains(&p.x) && (0.0..=1.0).contains(&p.y)));
        }
    }

    #[test]
    fn adjacent_boxes_claim_shared_edge_exactly_once(
        split in 1.0f64..99.0,
        y in 0.0f64..50.0,
    ) {
        let left = PixelRect::new(0.0, 0.0, split, 50.0);
        let right = PixelRect::new(split, 0.0, 100.0, 50.0);
        let on_edge = PixelPoint::new(split, y);

        let owners = [left, right].iter().filter(|rect| contains(rect, on_edge)).count();
        prop_assert_eq!(owners, 1);
    }

    #[test]
    fn bounding_rect_covers_every_vertex(
        raw in prop::collection::vec((unit(), unit()), 1..8),
        width in 1u32..4000,
        height in 1u32..4000,
    ) {
        let points: Vec<NormalizedPoint> =
            raw.iter().map(|(x, y)| NormalizedPoint::new(*x, *y)).collect();
        let polygon = to_pixel_polygon(&points, width, height);
        let rect = bounding_rect(&polygon).expect("non-empty polygon");

        for p in &polygon.points {
            prop_assert!(p.x >= rect.min_x && p.x <= rect.max_x);
            prop_assert!(p.y >= rect.min_y && p.y <= rect.max_y);
        }
    }
}
