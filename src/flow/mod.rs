//! Sparse pyramidal optical flow.

mod lucas_kanade;
mod pyramid;

pub use lucas_kanade::{OpticalFlowConfig, OpticalFlowTracker};
pub use pyramid::{FloatImage, Pyramid};
