//! Camera motion estimation and compensation.
//!
//! This module measures how far the camera moved between consecutive frames
//! and provides the coordinate transformation used to remove that movement
//! from tracked positions:
//!
//! - [`MotionEstimator`]: reduces tracked feature pairs to one movement
//! - [`CameraMovementEstimator`]: runs detection, flow and estimation over a clip
//! - [`TranslationTransformation`]: camera pan/tilt without rotation or zoom

mod estimator;
mod movement;
mod transformations;

pub use estimator::{CameraMovementEstimator, MotionEstimator};
pub use movement::{CameraMovement, MotionSequence};
pub use transformations::{CoordinateTransformation, TranslationTransformation};
