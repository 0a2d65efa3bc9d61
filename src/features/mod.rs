//! Corner feature selection.
//!
//! Features are only selected inside a [`BorderMask`]: regions of the frame
//! (crowd, hoardings) that move rigidly with the camera and contain no
//! players. Their apparent motion is therefore the camera's motion.

mod detector;
mod mask;

pub use detector::{FeatureConfig, FeatureDetector};
pub use mask::{BorderMask, MaskRegion};

/// A sub-pixel (x, y) location in frame pixel coordinates.
pub type FeaturePoint = nalgebra::Point2<f32>;
