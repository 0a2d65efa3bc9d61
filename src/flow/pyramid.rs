//! Image pyramids for coarse-to-fine flow.

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::filter::gaussian_blur_f32;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};

use crate::utils::clamp;

/// Single-channel floating point image.
pub type FloatImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Smoothing applied before each 2x decimation.
const PYR_DOWN_SIGMA: f32 = 1.0;

/// One pyramid level: intensities and their spatial derivatives.
#[derive(Debug, Clone)]
pub struct Level {
    pub image: FloatImage,
    pub grad_x: FloatImage,
    pub grad_y: FloatImage,
}

impl Level {
    fn from_gray(gray: &GrayImage) -> Self {
        let image = FloatImage::from_fn(gray.width(), gray.height(), |x, y| {
            Luma([gray.get_pixel(x, y).0[0] as f32])
        });
        // Sobel responses are 8x the central derivative.
        let gx = horizontal_sobel(gray);
        let gy = vertical_sobel(gray);
        let grad_x = FloatImage::from_fn(gray.width(), gray.height(), |x, y| {
            Luma([gx.get_pixel(x, y).0[0] as f32 / 8.0])
        });
        let grad_y = FloatImage::from_fn(gray.width(), gray.height(), |x, y| {
            Luma([gy.get_pixel(x, y).0[0] as f32 / 8.0])
        });
        Self {
            image,
            grad_x,
            grad_y,
        }
    }
}

/// Gaussian pyramid, level 0 is full resolution.
#[derive(Debug, Clone)]
pub struct Pyramid {
    pub levels: Vec<Level>,
}

impl Pyramid {
    /// Build up to `max_level` decimated levels above the base.
    ///
    /// Decimation stops early once a level would be smaller than `min_side`
    /// pixels in either dimension.
    pub fn build(gray: &GrayImage, max_level: usize, min_side: u32) -> Self {
        let mut levels = vec![Level::from_gray(gray)];
        let mut current = gray.clone();
        for _ in 0..max_level {
            let (w, h) = ((current.width() + 1) / 2, (current.height() + 1) / 2);
            if w < min_side || h < min_side {
                break;
            }
            current = pyr_down(&current);
            levels.push(Level::from_gray(&current));
        }
        Self { levels }
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.levels[0].image.dimensions()
    }
}

/// Blur and drop every other row and column.
fn pyr_down(gray: &GrayImage) -> GrayImage {
    let blurred = gaussian_blur_f32(gray, PYR_DOWN_SIGMA);
    let (w, h) = ((gray.width() + 1) / 2, (gray.height() + 1) / 2);
    GrayImage::from_fn(w, h, |x, y| {
        let sx = (2 * x).min(gray.width() - 1);
        let sy = (2 * y).min(gray.height() - 1);
        *blurred.get_pixel(sx, sy)
    })
}

/// Bilinear sample with replicated borders.
pub fn sample(img: &FloatImage, x: f32, y: f32) -> f32 {
    let (w, h) = img.dimensions();
    let x = clamp(x, 0.0, (w - 1) as f32);
    let y = clamp(y, 0.0, (h - 1) as f32);
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p = |px: u32, py: u32| img.get_pixel(px, py).0[0];
    (1.0 - fx) * (1.0 - fy) * p(x0, y0)
        + fx * (1.0 - fy) * p(x1, y0)
        + (1.0 - fx) * fy * p(x0, y1)
        + fx * fy * p(x1, y1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pyramid_level_sizes() {
        let gray = GrayImage::new(101, 60);
        let pyr = Pyramid::build(&gray, 2, 8);
        assert_eq!(pyr.num_levels(), 3);
        assert_eq!(pyr.levels[1].image.dimensions(), (51, 30));
        assert_eq!(pyr.levels[2].image.dimensions(), (26, 15));
    }

    #[test]
    fn test_pyramid_stops_at_min_side() {
        let gray = GrayImage::new(40, 40);
        let pyr = Pyramid::build(&gray, 5, 15);
        // 40 -> 20 -> 10 (< 15, rejected)
        assert_eq!(pyr.num_levels(), 2);
    }

    #[test]
    fn test_gradients_of_ramp() {
        let gray = GrayImage::from_fn(20, 10, |x, _| Luma([(x * 3) as u8]));
        let pyr = Pyramid::build(&gray, 0, 1);
        let level = &pyr.levels[0];
        assert_relative_eq!(level.grad_x.get_pixel(10, 5).0[0], 3.0, epsilon = 1e-6);
        assert_relative_eq!(level.grad_y.get_pixel(10, 5).0[0], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_bilinear_sample() {
        let img = FloatImage::from_fn(3, 3, |x, y| Luma([(x + 10 * y) as f32]));
        assert_relative_eq!(sample(&img, 1.0, 1.0), 11.0);
        assert_relative_eq!(sample(&img, 0.5, 0.0), 0.5);
        assert_relative_eq!(sample(&img, 1.5, 1.5), 16.5);
        // replicated border
        assert_relative_eq!(sample(&img, -4.0, 0.0), 0.0);
        assert_relative_eq!(sample(&img, 9.0, 2.0), 22.0);
    }

    #[test]
    fn test_sample_nan_does_not_panic() {
        let img = FloatImage::from_pixel(4, 4, Luma([1.0]));
        assert!(sample(&img, f32::NAN, 1.0).is_nan());
    }
}
