//! Camera movement estimation from sparse optical flow.

use image::GrayImage;
use nalgebra::Point2;

use super::{CameraMovement, MotionSequence};
use crate::cache::{CacheKey, StubCache};
use crate::config::CameraMotionConfig;
use crate::features::{FeatureDetector, FeaturePoint};
use crate::flow::{OpticalFlowTracker, Pyramid};
use crate::frame::{to_grayscale, validate_frames, Frame, FrameSource};
use crate::utils::{measure_distance, measure_xy_distance};
use crate::{Error, Result};

/// Reduces point correspondences to a single camera movement.
///
/// The correspondence with the largest displacement is taken as the camera
/// movement. Border-region features are background, and small displacements
/// are dominated by detector and tracker jitter. If the largest displacement
/// does not exceed `minimum_distance` the camera is considered stationary.
#[derive(Debug, Clone)]
pub struct MotionEstimator {
    minimum_distance: f64,
}

impl MotionEstimator {
    pub fn new(minimum_distance: f64) -> Result<Self> {
        if !(minimum_distance.is_finite() && minimum_distance >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "minimum_distance must be finite and non-negative, got {}",
                minimum_distance
            )));
        }
        Ok(Self { minimum_distance })
    }

    pub fn minimum_distance(&self) -> f64 {
        self.minimum_distance
    }

    /// Estimate the movement between matched `old` and `new` points.
    pub fn estimate(&self, old: &[FeaturePoint], new: &[FeaturePoint]) -> Result<CameraMovement> {
        if old.len() != new.len() {
            return Err(Error::InvalidPoints(format!(
                "expected matched point sets, got {} old and {} new",
                old.len(),
                new.len()
            )));
        }

        let mut max_distance = 0.0;
        let mut movement = CameraMovement::ZERO;
        for (o, n) in old.iter().zip(new) {
            let o = Point2::new(o.x as f64, o.y as f64);
            let n = Point2::new(n.x as f64, n.y as f64);
            let distance = measure_distance(&n, &o);
            // Non-finite displacements never become the maximum.
            if distance.is_finite() && distance > max_distance {
                max_distance = distance;
                let (dx, dy) = measure_xy_distance(&o, &n);
                movement = CameraMovement::new(dx, dy);
            }
        }

        if max_distance > self.minimum_distance {
            Ok(movement)
        } else {
            Ok(CameraMovement::ZERO)
        }
    }
}

/// The frame movement is measured against: its pyramid and its features.
struct Reference {
    pyramid: Pyramid,
    features: Vec<FeaturePoint>,
}

/// Measures camera movement over a whole clip.
///
/// Frames are processed strictly in order: features detected in frame N are
/// tracked into frame N+1, then fresh features are detected in frame N+1 for
/// the next transition.
#[derive(Debug, Clone)]
pub struct CameraMovementEstimator {
    config: CameraMotionConfig,
    detector: FeatureDetector,
    tracker: OpticalFlowTracker,
    estimator: MotionEstimator,
}

impl CameraMovementEstimator {
    pub fn new(config: CameraMotionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            detector: FeatureDetector::new(config.features.clone())?,
            tracker: OpticalFlowTracker::new(config.optical_flow.clone())?,
            estimator: MotionEstimator::new(config.minimum_distance)?,
            config,
        })
    }

    pub fn config(&self) -> &CameraMotionConfig {
        &self.config
    }

    /// Camera movement per frame, served from the stub cache when possible.
    ///
    /// With `cache.read` enabled and a valid stub present, no frame is
    /// touched. Otherwise the sequence is computed and, with `cache.write`
    /// enabled, stored. `key` ties the stub to a specific input and parameter
    /// set; a stub written under another key is treated as a miss.
    pub fn get_camera_movement(
        &self,
        frames: &[Frame],
        key: Option<&CacheKey>,
    ) -> Result<MotionSequence> {
        if let Some(movements) = self.read_stub(key) {
            return Ok(movements);
        }
        self.compute_and_store(frames, key)
    }

    /// Like [`get_camera_movement`](Self::get_camera_movement), but frames are
    /// only decoded from `source` on a cache miss.
    pub fn get_camera_movement_from<S: FrameSource + ?Sized>(
        &self,
        source: &mut S,
        key: Option<&CacheKey>,
    ) -> Result<MotionSequence> {
        if let Some(movements) = self.read_stub(key) {
            return Ok(movements);
        }
        let frames = source.read_frames()?;
        self.compute_and_store(&frames, key)
    }

    fn stub(&self) -> Option<StubCache> {
        self.config.cache.path.as_ref().map(StubCache::new)
    }

    fn read_stub(&self, key: Option<&CacheKey>) -> Option<MotionSequence> {
        if !self.config.cache.read {
            return None;
        }
        let cache = self.stub()?;
        let movements = cache.load(key)?;
        tracing::info!(
            "loaded camera movement for {} frames from {}",
            movements.len(),
            cache.path().display()
        );
        Some(movements)
    }

    fn compute_and_store(&self, frames: &[Frame], key: Option<&CacheKey>) -> Result<MotionSequence> {
        let movements = self.estimate_sequence(frames)?;
        if let Some(cache) = self.stub().filter(|_| self.config.cache.write) {
            if !movements.is_empty() {
                cache.store(&movements, key)?;
            }
        }
        Ok(movements)
    }

    /// Compute camera movement for every frame, bypassing the cache.
    pub fn estimate_sequence(&self, frames: &[Frame]) -> Result<MotionSequence> {
        validate_frames(frames)?;
        let Some(first) = frames.first() else {
            return Ok(MotionSequence::default());
        };

        let mut movements = Vec::with_capacity(frames.len());
        movements.push(CameraMovement::ZERO);

        let initial = self.reference(&to_grayscale(first));
        if initial.features.is_empty() {
            tracing::warn!("No features found in frame 0");
        }
        frames
            .iter()
            .enumerate()
            .skip(1)
            .try_fold(initial, |reference, (frame_num, frame)| {
                let (movement, next) = self.step(reference, &to_grayscale(frame), frame_num)?;
                movements.push(movement);
                Ok::<_, Error>(next)
            })?;

        let movements = MotionSequence::new(movements);
        tracing::info!(
            "estimated camera movement for {} frames ({} with movement)",
            movements.len(),
            movements.moving_frames()
        );
        Ok(movements)
    }

    /// Camera movement between a single pair of grayscale frames.
    pub fn estimate_pair(&self, prev: &GrayImage, next: &GrayImage) -> Result<CameraMovement> {
        if prev.dimensions() != next.dimensions() {
            return Err(Error::InvalidFrame(format!(
                "cannot compare frames of size {:?} and {:?}",
                prev.dimensions(),
                next.dimensions()
            )));
        }
        let features = self.detector.detect(prev);
        if features.is_empty() {
            return Ok(CameraMovement::ZERO);
        }
        let tracked = self.tracker.track(prev, next, &features)?;
        self.estimator.estimate(&features, &tracked)
    }

    fn reference(&self, gray: &GrayImage) -> Reference {
        Reference {
            pyramid: self.tracker.pyramid(gray),
            features: self.detector.detect(gray),
        }
    }

    /// Measure one transition and produce the reference for the next one.
    ///
    /// A frame without features records no movement and does not replace a
    /// reference that has them.
    fn step(
        &self,
        reference: Reference,
        gray: &GrayImage,
        frame_num: usize,
    ) -> Result<(CameraMovement, Reference)> {
        let current = self.reference(gray);

        if current.features.is_empty() {
            tracing::warn!("No features found in frame {}", frame_num);
            let keep = if reference.features.is_empty() {
                current
            } else {
                reference
            };
            return Ok((CameraMovement::ZERO, keep));
        }
        if reference.features.is_empty() {
            return Ok((CameraMovement::ZERO, current));
        }

        let tracked = self.tracker.track_pyramids(
            &reference.pyramid,
            &current.pyramid,
            &reference.features,
        );
        let movement = self.estimator.estimate(&reference.features, &tracked)?;
        tracing::debug!(
            "frame {}: {} features, movement ({:.2}, {:.2})",
            frame_num,
            reference.features.len(),
            movement.x,
            movement.y
        );
        Ok((movement, current))
    }
}
