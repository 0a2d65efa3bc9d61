//! Removal of camera movement from tracked positions.

use serde::{Deserialize, Serialize};

use crate::camera_motion::{CoordinateTransformation, MotionSequence, TranslationTransformation};
use crate::tracks::Tracks;
use crate::{Error, Result};

/// How movement is applied to positions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustConfig {
    /// Subtract the total camera offset since frame 0 instead of the
    /// movement of the current frame alone.
    pub accumulate: bool,
}

/// Writes `position_adjusted` for every tracked object.
#[derive(Debug, Clone, Default)]
pub struct PositionAdjuster {
    config: AdjustConfig,
}

impl PositionAdjuster {
    pub fn new(config: AdjustConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AdjustConfig {
        &self.config
    }

    /// Set `position_adjusted = position - movement[frame]` on every record.
    ///
    /// The adjusted value is always derived from the raw `position`, so calling
    /// this again with the same movements leaves the tracks unchanged. If any
    /// object class spans more frames than `movements` covers, nothing is
    /// modified.
    pub fn add_adjusted_positions(
        &self,
        tracks: &mut Tracks,
        movements: &MotionSequence,
    ) -> Result<()> {
        for (object, frames) in tracks.iter() {
            if frames.len() > movements.len() {
                tracing::error!(
                    "{} tracks span {} frames, camera movement covers {}",
                    object,
                    frames.len(),
                    movements.len()
                );
                return Err(Error::FrameIndexOutOfRange {
                    frame: frames.len() - 1,
                    len: movements.len(),
                });
            }
        }

        let offsets = if self.config.accumulate {
            movements.cumulative()
        } else {
            movements.clone()
        };

        let mut adjusted = 0usize;
        for frames in tracks.values_mut() {
            for (frame_num, frame_tracks) in frames.iter_mut().enumerate() {
                let transform = TranslationTransformation::from(offsets[frame_num]);
                for record in frame_tracks.values_mut() {
                    record.position_adjusted = Some(transform.rel_to_abs(&record.position));
                    adjusted += 1;
                }
            }
        }
        tracing::debug!("adjusted {} track positions", adjusted);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera_motion::CameraMovement;
    use crate::tracks::{FrameTracks, TrackRecord};
    use approx::assert_relative_eq;
    use nalgebra::Point2;

    fn record_at(x: f64, y: f64) -> TrackRecord {
        TrackRecord::new([x - 5.0, y - 20.0, x + 5.0, y], Point2::new(x, y))
    }

    fn tracks_with(frames: Vec<FrameTracks>) -> Tracks {
        let mut tracks = Tracks::new();
        tracks.insert("players".to_string(), frames);
        tracks
    }

    fn pan() -> MotionSequence {
        MotionSequence::new(vec![
            CameraMovement::ZERO,
            CameraMovement::new(10.0, 0.0),
            CameraMovement::new(0.0, -4.0),
        ])
    }

    #[test]
    fn test_subtracts_frame_movement() {
        let mut tracks = tracks_with(vec![
            FrameTracks::from([(1, record_at(100.0, 50.0))]),
            FrameTracks::from([(1, record_at(100.0, 50.0))]),
            FrameTracks::from([(1, record_at(100.0, 50.0)), (2, record_at(20.0, 30.0))]),
        ]);
        PositionAdjuster::default()
            .add_adjusted_positions(&mut tracks, &pan())
            .unwrap();

        let frames = &tracks["players"];
        assert_eq!(frames[0][&1].position_adjusted, Some(Point2::new(100.0, 50.0)));
        assert_eq!(frames[1][&1].position_adjusted, Some(Point2::new(90.0, 50.0)));
        assert_eq!(frames[2][&2].position_adjusted, Some(Point2::new(20.0, 34.0)));
        // raw positions are untouched
        assert_eq!(frames[1][&1].position, Point2::new(100.0, 50.0));
    }

    #[test]
    fn test_accumulate_uses_total_offset() {
        let mut tracks = tracks_with(vec![
            FrameTracks::new(),
            FrameTracks::new(),
            FrameTracks::from([(1, record_at(100.0, 50.0))]),
        ]);
        PositionAdjuster::new(AdjustConfig { accumulate: true })
            .add_adjusted_positions(&mut tracks, &pan())
            .unwrap();

        let adjusted = tracks["players"][2][&1].position_adjusted.unwrap();
        assert_relative_eq!(adjusted.x, 90.0);
        assert_relative_eq!(adjusted.y, 54.0);
    }

    #[test]
    fn test_idempotent() {
        let mut tracks = tracks_with(vec![
            FrameTracks::from([(4, record_at(1.0, 2.0))]),
            FrameTracks::from([(4, record_at(3.0, 4.0))]),
        ]);
        let adjuster = PositionAdjuster::default();
        adjuster.add_adjusted_positions(&mut tracks, &pan()).unwrap();
        let once = tracks.clone();
        adjuster.add_adjusted_positions(&mut tracks, &pan()).unwrap();
        assert_eq!(tracks, once);
    }

    #[test]
    fn test_short_motion_sequence_is_rejected_without_mutation() {
        let mut tracks = tracks_with(vec![
            FrameTracks::from([(1, record_at(1.0, 2.0))]),
            FrameTracks::from([(1, record_at(1.0, 2.0))]),
        ]);
        tracks.insert("ball".to_string(), vec![FrameTracks::new(); 4]);
        let before = tracks.clone();

        let result = PositionAdjuster::default().add_adjusted_positions(&mut tracks, &pan());
        assert!(matches!(
            result,
            Err(Error::FrameIndexOutOfRange { frame: 3, len: 3 })
        ));
        assert_eq!(tracks, before);
    }

    #[test]
    fn test_empty_tracks() {
        let mut tracks = Tracks::new();
        PositionAdjuster::default()
            .add_adjusted_positions(&mut tracks, &MotionSequence::default())
            .unwrap();
        assert!(tracks.is_empty());
    }
}
