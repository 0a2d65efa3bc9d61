//! Synthetic frames for unit tests.

use image::{GrayImage, Luma, Rgb, RgbImage};

use crate::frame::Frame;

/// Smooth product-of-sines texture sampled at `(x + shift_x, y + shift_y)`.
///
/// Sampling with a positive `shift_x` moves content left, i.e. it is what a
/// camera panning right by `shift_x` pixels would see.
pub(crate) fn texture_value(x: f64, y: f64) -> u8 {
    let tau = std::f64::consts::TAU;
    let v = 128.0 + 100.0 * (tau * x / 64.0).sin() * (tau * y / 48.0).sin();
    v.round().clamp(0.0, 255.0) as u8
}

pub(crate) fn textured_gray(w: u32, h: u32, shift_x: f64, shift_y: f64) -> GrayImage {
    GrayImage::from_fn(w, h, |x, y| {
        Luma([texture_value(x as f64 + shift_x, y as f64 + shift_y)])
    })
}

pub(crate) fn textured_frame(w: u32, h: u32, shift_x: f64, shift_y: f64) -> Frame {
    RgbImage::from_fn(w, h, |x, y| {
        let v = texture_value(x as f64 + shift_x, y as f64 + shift_y);
        Rgb([v, v, v])
    })
}

pub(crate) fn checkerboard_gray(w: u32, h: u32, square: u32) -> GrayImage {
    GrayImage::from_fn(w, h, |x, y| {
        let dark = ((x / square) + (y / square)) % 2 == 0;
        Luma([if dark { 30 } else { 220 }])
    })
}
