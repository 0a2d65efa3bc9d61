//! End-to-end run: object tracking and camera estimation, then adjustment.

use std::path::Path;

use crate::adjuster::PositionAdjuster;
use crate::cache::CacheKey;
use crate::camera_motion::{CameraMovementEstimator, MotionSequence};
use crate::config::CameraMotionConfig;
use crate::frame::Frame;
use crate::overlay::OverlayRenderer;
use crate::tracks::{frame_span, load_tracks, Tracks};
use crate::{Error, Result};

/// Produces per-frame tracks for a clip.
///
/// Runs concurrently with camera estimation and only gets shared access to
/// the frames.
pub trait ObjectTracker: Sync {
    fn track(&self, frames: &[Frame]) -> Result<Tracks>;
}

impl<F> ObjectTracker for F
where
    F: Fn(&[Frame]) -> Result<Tracks> + Sync,
{
    fn track(&self, frames: &[Frame]) -> Result<Tracks> {
        self(frames)
    }
}

/// Tracks computed by an earlier run, e.g. loaded from a tracker's JSON dump.
#[derive(Debug, Clone, Default)]
pub struct PrecomputedTracks {
    pub tracks: Tracks,
}

impl PrecomputedTracks {
    pub fn new(tracks: Tracks) -> Self {
        Self { tracks }
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(load_tracks(path)?))
    }
}

impl ObjectTracker for PrecomputedTracks {
    fn track(&self, frames: &[Frame]) -> Result<Tracks> {
        let span = frame_span(&self.tracks);
        if span > frames.len() {
            return Err(Error::Tracker(format!(
                "precomputed tracks span {} frames, clip has {}",
                span,
                frames.len()
            )));
        }
        Ok(self.tracks.clone())
    }
}

/// Result of a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    /// Tracks with `position_adjusted` filled in.
    pub tracks: Tracks,
    pub movements: MotionSequence,
}

/// Camera movement estimation, position adjustment and overlay for one clip.
#[derive(Debug, Clone)]
pub struct Pipeline {
    estimator: CameraMovementEstimator,
    adjuster: PositionAdjuster,
    renderer: OverlayRenderer,
}

impl Pipeline {
    pub fn new(config: CameraMotionConfig) -> Result<Self> {
        Ok(Self {
            adjuster: PositionAdjuster::new(config.adjust.clone()),
            renderer: OverlayRenderer::new(config.overlay.clone())?,
            estimator: CameraMovementEstimator::new(config)?,
        })
    }

    pub fn estimator(&self) -> &CameraMovementEstimator {
        &self.estimator
    }

    /// Track objects and estimate camera movement concurrently, then adjust.
    ///
    /// Either stage failing fails the run.
    pub fn run<T: ObjectTracker>(
        &self,
        frames: &[Frame],
        tracker: &T,
        key: Option<&CacheKey>,
    ) -> Result<PipelineOutput> {
        tracing::info!("processing {} frames", frames.len());

        let (tracks, movements) = rayon::join(
            || tracker.track(frames),
            || self.estimator.get_camera_movement(frames, key),
        );
        let mut tracks = tracks?;
        let movements = movements?;

        self.adjuster.add_adjusted_positions(&mut tracks, &movements)?;
        tracing::info!(
            "adjusted {} object classes for camera movement",
            tracks.len()
        );
        Ok(PipelineOutput { tracks, movements })
    }

    /// Diagnostic frames for a finished run.
    pub fn render(&self, frames: &[Frame], output: &PipelineOutput) -> Result<Vec<Frame>> {
        self.renderer.draw(frames, &output.movements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera_motion::CameraMovement;
    use crate::tracks::{FrameTracks, TrackRecord};
    use image::{Rgb, RgbImage};

    fn blank(n: usize) -> Vec<Frame> {
        vec![RgbImage::from_pixel(64, 48, Rgb([50, 50, 50])); n]
    }

    fn one_player(n: usize) -> Tracks {
        let mut tracks = Tracks::new();
        tracks.insert(
            "players".to_string(),
            vec![FrameTracks::from([(1, TrackRecord::from_foot([10.0, 10.0, 20.0, 30.0]))]); n],
        );
        tracks
    }

    #[test]
    fn test_run_with_closure_tracker() {
        let pipeline = Pipeline::new(CameraMotionConfig::default()).unwrap();
        let frames = blank(3);
        let tracker = |frames: &[Frame]| -> Result<Tracks> { Ok(one_player(frames.len())) };

        let output = pipeline.run(&frames, &tracker, None).unwrap();
        assert_eq!(output.movements, MotionSequence::zeros(3));
        let record = &output.tracks["players"][2][&1];
        assert_eq!(record.position_adjusted, Some(record.position));
    }

    #[test]
    fn test_tracker_failure_aborts() {
        let pipeline = Pipeline::new(CameraMotionConfig::default()).unwrap();
        let tracker = |_: &[Frame]| -> Result<Tracks> { Err(Error::Tracker("boom".into())) };
        assert!(matches!(
            pipeline.run(&blank(2), &tracker, None),
            Err(Error::Tracker(_))
        ));
    }

    #[test]
    fn test_precomputed_tracks_longer_than_clip() {
        let pipeline = Pipeline::new(CameraMotionConfig::default()).unwrap();
        let tracker = PrecomputedTracks::new(one_player(5));
        assert!(matches!(
            pipeline.run(&blank(3), &tracker, None),
            Err(Error::Tracker(_))
        ));
    }

    #[test]
    fn test_render_uses_movements() {
        let pipeline = Pipeline::new(CameraMotionConfig::default()).unwrap();
        let frames = blank(2);
        let output = PipelineOutput {
            tracks: Tracks::new(),
            movements: MotionSequence::new(vec![CameraMovement::ZERO, CameraMovement::new(9.0, 0.0)]),
        };
        let rendered = pipeline.render(&frames, &output).unwrap();
        assert_eq!(rendered.len(), 2);
        assert_ne!(rendered[0], frames[0]);
    }
}
