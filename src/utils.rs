//! Geometry helpers shared by the estimator, the adjuster and the CLI.

use nalgebra::Point2;

/// Bounding box as `[x1, y1, x2, y2]` (top-left, bottom-right).
pub type BBox = [f64; 4];

/// Euclidean distance between two points.
pub fn measure_distance(a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    (a - b).norm()
}

/// Per-axis difference `a - b`.
pub fn measure_xy_distance(a: &Point2<f64>, b: &Point2<f64>) -> (f64, f64) {
    (a.x - b.x, a.y - b.y)
}

/// Center of a bounding box.
///
/// Used as the reference position for the ball.
pub fn bbox_center(bbox: &BBox) -> Point2<f64> {
    Point2::new((bbox[0] + bbox[2]) / 2.0, (bbox[1] + bbox[3]) / 2.0)
}

/// Bottom-center of a bounding box.
///
/// Used as the reference position for players and referees, whose feet are
/// on the pitch plane.
pub fn bbox_foot(bbox: &BBox) -> Point2<f64> {
    Point2::new((bbox[0] + bbox[2]) / 2.0, bbox[3])
}

/// Clamp a value to a range.
pub fn clamp<T: PartialOrd>(value: T, min: T, max: T) -> T {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_measure_distance() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(3.0, 4.0);
        assert_relative_eq!(measure_distance(&a, &b), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_measure_xy_distance_is_signed() {
        let old = Point2::new(110.0, 50.0);
        let new = Point2::new(100.0, 52.0);
        assert_eq!(measure_xy_distance(&old, &new), (10.0, -2.0));
    }

    #[test]
    fn test_bbox_anchors() {
        let bbox = [10.0, 20.0, 30.0, 60.0];
        assert_eq!(bbox_center(&bbox), Point2::new(20.0, 40.0));
        assert_eq!(bbox_foot(&bbox), Point2::new(20.0, 60.0));
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(5, 0, 10), 5);
        assert_eq!(clamp(-5, 0, 10), 0);
        assert_eq!(clamp(15, 0, 10), 10);
    }
}
