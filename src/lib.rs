//! # pitchcam - Camera Motion Compensation for Match Footage
//!
//! Estimates how far a broadcast camera panned between consecutive frames and
//! removes that pan from the positions of tracked players, referees and ball.
//!
//! ## Features
//!
//! - Shi–Tomasi corner selection restricted to out-of-play border regions
//! - Pyramidal Lucas–Kanade sparse optical flow
//! - Max-displacement camera movement estimate with a noise gate
//! - Fingerprinted on-disk stub cache with atomic replacement
//! - Track position adjustment and diagnostic frame overlay
//! - Concurrent tracking / camera estimation pipeline
//!
//! ## Example
//!
//! ```rust,ignore
//! use pitchcam_rs::{CameraMotionConfig, CameraMovementEstimator, PositionAdjuster};
//!
//! let config = CameraMotionConfig::default();
//! let estimator = CameraMovementEstimator::new(config.clone())?;
//! let movements = estimator.get_camera_movement(&frames, None)?;
//!
//! PositionAdjuster::new(config.adjust).add_adjusted_positions(&mut tracks, &movements)?;
//! ```

// Public modules
pub mod adjuster;
pub mod cache;
pub mod camera_motion;
pub mod config;
pub mod features;
pub mod flow;
pub mod frame;
pub mod overlay;
pub mod pipeline;
pub mod tracks;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-exports for convenience
pub use adjuster::PositionAdjuster;
pub use cache::{CacheKey, StubCache};
pub use camera_motion::{
    CameraMovement, CameraMovementEstimator, CoordinateTransformation, MotionEstimator,
    MotionSequence, TranslationTransformation,
};
pub use config::CameraMotionConfig;
pub use features::{BorderMask, FeatureDetector, FeaturePoint, MaskRegion};
pub use flow::OpticalFlowTracker;
pub use frame::{Frame, FrameSource, ImageSequence, InMemoryFrames};
pub use overlay::OverlayRenderer;
pub use pipeline::{ObjectTracker, Pipeline, PipelineOutput, PrecomputedTracks};
pub use tracks::{FrameTracks, TrackId, TrackRecord, Tracks};

// Error types
pub use crate::error::{Error, Result};

mod error {
    use thiserror::Error;

    /// Errors that can occur in the pitchcam library
    #[derive(Error, Debug)]
    pub enum Error {
        #[error("Invalid configuration: {0}")]
        InvalidConfig(String),

        #[error("Invalid points: {0}")]
        InvalidPoints(String),

        #[error("Invalid frame: {0}")]
        InvalidFrame(String),

        #[error("Frame index {frame} out of range for motion sequence of length {len}")]
        FrameIndexOutOfRange { frame: usize, len: usize },

        #[error("Stub cache error: {0}")]
        Cache(String),

        #[error("Object tracker error: {0}")]
        Tracker(String),

        #[error("Image error: {0}")]
        Image(#[from] image::ImageError),

        #[error("JSON error: {0}")]
        Json(#[from] serde_json::Error),

        #[error("IO error: {0}")]
        IoError(#[from] std::io::Error),
    }

    /// Result type for pitchcam operations
    pub type Result<T> = std::result::Result<T, Error>;
}
