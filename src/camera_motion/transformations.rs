//! Coordinate transformation implementations.

use nalgebra::{Point2, Vector2};

use super::CameraMovement;

/// Trait for removing camera motion from frame coordinates.
///
/// Track positions can be interpreted in 2 references:
/// - Relative: their position on the current frame, (0, 0) is top left
/// - Absolute: their position with the camera movement removed
pub trait CoordinateTransformation: Send + Sync + std::fmt::Debug {
    /// Transform a point from relative (camera frame) to absolute coordinates.
    fn rel_to_abs(&self, point: &Point2<f64>) -> Point2<f64>;
}

/// Simple 2D translation transformation (camera pan without rotation/zoom).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TranslationTransformation {
    /// Movement vector [dx, dy].
    pub movement_vector: Vector2<f64>,
}

impl TranslationTransformation {
    /// Create a new translation transformation with the given movement vector.
    pub fn new(movement_vector: [f64; 2]) -> Self {
        Self {
            movement_vector: Vector2::new(movement_vector[0], movement_vector[1]),
        }
    }
}

impl From<CameraMovement> for TranslationTransformation {
    fn from(movement: CameraMovement) -> Self {
        Self::new(movement.into())
    }
}

impl CoordinateTransformation for TranslationTransformation {
    /// Convert relative coordinates to absolute by subtracting the movement vector.
    fn rel_to_abs(&self, point: &Point2<f64>) -> Point2<f64> {
        point - self.movement_vector
    }
}
