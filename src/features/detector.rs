//! Shi–Tomasi "good features to track" corner selection.

use image::GrayImage;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};
use serde::{Deserialize, Serialize};

use super::{BorderMask, FeaturePoint};
use crate::{Error, Result};

/// Parameters for corner selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Maximum number of corners returned per frame.
    pub max_corners: usize,

    /// Minimum accepted corner response, relative to the best response in the mask.
    pub quality_level: f64,

    /// Minimum Euclidean distance (px) between returned corners.
    pub min_distance: f64,

    /// Side of the window (px) over which gradient products are summed.
    pub block_size: usize,

    /// Regions in which corners may be selected.
    pub mask: BorderMask,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            max_corners: 100,
            quality_level: 0.3,
            min_distance: 3.0,
            block_size: 7,
            mask: BorderMask::default(),
        }
    }
}

impl FeatureConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_corners == 0 {
            return Err(Error::InvalidConfig(
                "max_corners must be positive".to_string(),
            ));
        }
        if !(self.quality_level > 0.0 && self.quality_level <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "quality_level must be in (0, 1], got {}",
                self.quality_level
            )));
        }
        if !(self.min_distance >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "min_distance must be non-negative, got {}",
                self.min_distance
            )));
        }
        if self.block_size < 3 || self.block_size % 2 == 0 {
            return Err(Error::InvalidConfig(format!(
                "block_size must be odd and >= 3, got {}",
                self.block_size
            )));
        }
        self.mask.validate()
    }
}

/// Summed-area table over a row-major `f64` grid.
struct Integral {
    stride: usize,
    sums: Vec<f64>,
}

impl Integral {
    fn new(values: &[f64], width: usize, height: usize) -> Self {
        let stride = width + 1;
        let mut sums = vec![0.0; stride * (height + 1)];
        for y in 0..height {
            let mut row = 0.0;
            for x in 0..width {
                row += values[y * width + x];
                sums[(y + 1) * stride + x + 1] = sums[y * stride + x + 1] + row;
            }
        }
        Self { stride, sums }
    }

    /// Sum over the inclusive window `[x0, x1] x [y0, y1]`.
    fn window(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> f64 {
        let s = self.stride;
        self.sums[(y1 + 1) * s + x1 + 1] - self.sums[y0 * s + x1 + 1] - self.sums[(y1 + 1) * s + x0]
            + self.sums[y0 * s + x0]
    }
}

/// Selects corner features inside a [`BorderMask`].
#[derive(Debug, Clone)]
pub struct FeatureDetector {
    config: FeatureConfig,
}

impl FeatureDetector {
    pub fn new(config: FeatureConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Minimum-eigenvalue corner response for every masked pixel.
    ///
    /// Pixels outside the mask, or whose block would leave the frame, score 0.
    pub fn response(&self, gray: &GrayImage) -> Vec<f64> {
        let (w, h) = (gray.width() as usize, gray.height() as usize);
        let mut response = vec![0.0; w * h];
        let half = self.config.block_size / 2;
        if w <= 2 * half || h <= 2 * half {
            return response;
        }

        let gx = horizontal_sobel(gray);
        let gy = vertical_sobel(gray);
        let mut xx = vec![0.0; w * h];
        let mut xy = vec![0.0; w * h];
        let mut yy = vec![0.0; w * h];
        for (x, y, px) in gx.enumerate_pixels() {
            let i = y as usize * w + x as usize;
            let dx = px.0[0] as f64 / 8.0;
            let dy = gy.get_pixel(x, y).0[0] as f64 / 8.0;
            xx[i] = dx * dx;
            xy[i] = dx * dy;
            yy[i] = dy * dy;
        }
        let (ixx, ixy, iyy) = (
            Integral::new(&xx, w, h),
            Integral::new(&xy, w, h),
            Integral::new(&yy, w, h),
        );

        let mask = self.config.mask.rasterize(gray.width(), gray.height());
        let area = (self.config.block_size * self.config.block_size) as f64;
        for y in half..h - half {
            for x in half..w - half {
                let i = y * w + x;
                if !mask[i] {
                    continue;
                }
                let (x0, y0, x1, y1) = (x - half, y - half, x + half, y + half);
                let a = ixx.window(x0, y0, x1, y1) / area;
                let b = ixy.window(x0, y0, x1, y1) / area;
                let c = iyy.window(x0, y0, x1, y1) / area;
                let max_eig = ((a + c) + ((a - c) * (a - c) + 4.0 * b * b).sqrt()) / 2.0;
                if max_eig > 0.0 {
                    // det / max_eig keeps rank-1 (edge) windows at exactly zero
                    response[i] = ((a * c - b * b) / max_eig).max(0.0);
                }
            }
        }
        response
    }

    /// Select up to `max_corners` corners, strongest first.
    ///
    /// Returns an empty vector when nothing in the mask qualifies.
    pub fn detect(&self, gray: &GrayImage) -> Vec<FeaturePoint> {
        let (w, h) = (gray.width() as usize, gray.height() as usize);
        let response = self.response(gray);

        let max_response = response.iter().copied().fold(0.0_f64, f64::max);
        if max_response <= 0.0 {
            return Vec::new();
        }
        let threshold = max_response * self.config.quality_level;

        // Keep thresholded 3x3 local maxima.
        let mut candidates: Vec<(f64, usize, usize)> = Vec::new();
        for y in 0..h {
            for x in 0..w {
                let r = response[y * w + x];
                if r <= threshold {
                    continue;
                }
                let mut is_peak = true;
                'neighbours: for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
                    for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                        if response[ny * w + nx] > r {
                            is_peak = false;
                            break 'neighbours;
                        }
                    }
                }
                if is_peak {
                    candidates.push((r, x, y));
                }
            }
        }
        candidates.sort_by(|a, b| b.0.total_cmp(&a.0));

        let min_dist_sq = self.config.min_distance * self.config.min_distance;
        let mut corners: Vec<FeaturePoint> = Vec::with_capacity(self.config.max_corners);
        for (_, x, y) in candidates {
            let p = FeaturePoint::new(x as f32, y as f32);
            let far_enough = corners.iter().all(|q| {
                let dx = (p.x - q.x) as f64;
                let dy = (p.y - q.y) as f64;
                dx * dx + dy * dy >= min_dist_sq
            });
            if far_enough {
                corners.push(p);
                if corners.len() == self.config.max_corners {
                    break;
                }
            }
        }

        tracing::trace!(
            "selected {} corners (threshold {:.3})",
            corners.len(),
            threshold
        );
        corners
    }
}
