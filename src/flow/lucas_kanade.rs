//! Iterative pyramidal Lucas–Kanade point tracking.

use image::GrayImage;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use super::pyramid::{sample, Pyramid};
use crate::features::FeaturePoint;
use crate::{Error, Result};

/// Parameters for pyramidal Lucas–Kanade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpticalFlowConfig {
    /// Side of the square search window (px, odd).
    pub window_size: usize,

    /// Number of decimated levels above full resolution.
    pub max_level: usize,

    /// Iteration cap per level.
    pub max_iterations: usize,

    /// Stop iterating once an update step is shorter than this (px).
    pub epsilon: f32,

    /// Windows whose normalized minimum gradient eigenvalue is below this
    /// are too flat to refine; the point keeps its current estimate.
    pub min_eigen_threshold: f32,
}

impl Default for OpticalFlowConfig {
    fn default() -> Self {
        Self {
            window_size: 15,
            max_level: 2,
            max_iterations: 10,
            epsilon: 0.03,
            min_eigen_threshold: 1e-4,
        }
    }
}

impl OpticalFlowConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window_size < 3 || self.window_size % 2 == 0 {
            return Err(Error::InvalidConfig(format!(
                "window_size must be odd and >= 3, got {}",
                self.window_size
            )));
        }
        if self.max_iterations == 0 {
            return Err(Error::InvalidConfig(
                "max_iterations must be positive".to_string(),
            ));
        }
        if !(self.epsilon > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "epsilon must be positive, got {}",
                self.epsilon
            )));
        }
        if !(self.min_eigen_threshold >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "min_eigen_threshold must be non-negative, got {}",
                self.min_eigen_threshold
            )));
        }
        Ok(())
    }
}

/// Tracks points from one grayscale frame into the next.
#[derive(Debug, Clone)]
pub struct OpticalFlowTracker {
    config: OpticalFlowConfig,
}

impl OpticalFlowTracker {
    pub fn new(config: OpticalFlowConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &OpticalFlowConfig {
        &self.config
    }

    /// Build the pyramid this tracker expects for a frame.
    pub fn pyramid(&self, gray: &GrayImage) -> Pyramid {
        Pyramid::build(gray, self.config.max_level, self.config.window_size as u32)
    }

    /// Locate `points` (given in `prev`) in `next`.
    ///
    /// The result has the same length and order as `points`. Points that cannot
    /// be refined keep their best-effort estimate.
    pub fn track(
        &self,
        prev: &GrayImage,
        next: &GrayImage,
        points: &[FeaturePoint],
    ) -> Result<Vec<FeaturePoint>> {
        if prev.dimensions() != next.dimensions() {
            return Err(Error::InvalidFrame(format!(
                "cannot track between frames of size {:?} and {:?}",
                prev.dimensions(),
                next.dimensions()
            )));
        }
        if points.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.track_pyramids(&self.pyramid(prev), &self.pyramid(next), points))
    }

    /// Locate `points` using pre-built pyramids of equal depth.
    pub fn track_pyramids(
        &self,
        prev: &Pyramid,
        next: &Pyramid,
        points: &[FeaturePoint],
    ) -> Vec<FeaturePoint> {
        let levels = prev.num_levels().min(next.num_levels());
        points
            .iter()
            .map(|p| {
                let flow = self.track_point(prev, next, levels, p);
                FeaturePoint::new(p.x + flow.x, p.y + flow.y)
            })
            .collect()
    }

    /// Displacement of a single point at full resolution.
    fn track_point(
        &self,
        prev: &Pyramid,
        next: &Pyramid,
        levels: usize,
        point: &FeaturePoint,
    ) -> Vector2<f32> {
        let half = (self.config.window_size / 2) as i32;
        let n = (self.config.window_size * self.config.window_size) as f32;
        let eps_sq = self.config.epsilon * self.config.epsilon;
        let mut guess = Vector2::zeros();

        for lvl in (0..levels).rev() {
            let scale = (1u32 << lvl) as f32;
            let px = point.x / scale;
            let py = point.y / scale;
            let prev_level = &prev.levels[lvl];
            let next_image = &next.levels[lvl].image;

            if !window_inside(prev_level.image.dimensions(), px, py, half) {
                if lvl == 0 {
                    tracing::trace!(
                        "window at ({:.1}, {:.1}) leaves the frame, point lost",
                        point.x,
                        point.y
                    );
                    return guess;
                }
                guess *= 2.0;
                continue;
            }

            // Template and gradient matrix from the previous frame.
            let mut template = Vec::with_capacity(n as usize);
            let (mut gxx, mut gxy, mut gyy) = (0.0f32, 0.0f32, 0.0f32);
            for wy in -half..=half {
                for wx in -half..=half {
                    let (sx, sy) = (px + wx as f32, py + wy as f32);
                    let i0 = sample(&prev_level.image, sx, sy);
                    let ix = sample(&prev_level.grad_x, sx, sy);
                    let iy = sample(&prev_level.grad_y, sx, sy);
                    gxx += ix * ix;
                    gxy += ix * iy;
                    gyy += iy * iy;
                    template.push((i0, ix, iy));
                }
            }

            let det = gxx * gyy - gxy * gxy;
            let min_eig = (gxx + gyy - ((gxx - gyy) * (gxx - gyy) + 4.0 * gxy * gxy).sqrt()) / (2.0 * n);
            if !(min_eig >= self.config.min_eigen_threshold) || det.abs() < f32::EPSILON {
                tracing::trace!(
                    "flat window at ({:.1}, {:.1}) level {}, keeping estimate",
                    point.x,
                    point.y,
                    lvl
                );
                return guess * scale;
            }

            for _ in 0..self.config.max_iterations {
                let (mut bx, mut by) = (0.0f32, 0.0f32);
                let mut k = 0;
                for wy in -half..=half {
                    for wx in -half..=half {
                        let (i0, ix, iy) = template[k];
                        k += 1;
                        let i1 = sample(
                            next_image,
                            px + guess.x + wx as f32,
                            py + guess.y + wy as f32,
                        );
                        let diff = i0 - i1;
                        bx += ix * diff;
                        by += iy * diff;
                    }
                }

                let delta = Vector2::new(
                    (gyy * bx - gxy * by) / det,
                    (gxx * by - gxy * bx) / det,
                );
                if !(delta.x.is_finite() && delta.y.is_finite()) {
                    return guess * scale;
                }
                // Border pixels are replicated, so a window past the edge
                // matches nothing real. Keep the last estimate inside.
                let candidate = guess + delta;
                if !window_inside(next_image.dimensions(), px + candidate.x, py + candidate.y, half) {
                    break;
                }
                guess = candidate;
                if delta.norm_squared() < eps_sq {
                    break;
                }
            }

            if lvl > 0 {
                guess *= 2.0;
            }
        }
        guess
    }
}

/// Whether a window of radius `half` around `(x, y)`, plus the one-pixel
/// ring its gradients depend on, lies inside an image of size `dims`.
fn window_inside(dims: (u32, u32), x: f32, y: f32, half: i32) -> bool {
    let margin = half as f32 + 1.0;
    let (w, h) = (dims.0 as f32, dims.1 as f32);
    x >= margin && y >= margin && x <= w - 1.0 - margin && y <= h - 1.0 - margin
}
