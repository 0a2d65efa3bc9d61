//! Camera motion benchmarks using Criterion.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{GrayImage, Luma, Rgb, RgbImage};

use pitchcam_rs::features::FeatureConfig;
use pitchcam_rs::flow::OpticalFlowConfig;
use pitchcam_rs::{
    BorderMask, CameraMotionConfig, CameraMovementEstimator, FeatureDetector, Frame,
    OpticalFlowTracker,
};

/// Broadcast-sized texture seen by a camera panned by `pan_x` pixels.
fn texture(pan_x: f64) -> Vec<u8> {
    let (w, h) = (1280u32, 720u32);
    let tau = std::f64::consts::TAU;
    let mut buf = Vec::with_capacity((w * h) as usize);
    for y in 0..h {
        for x in 0..w {
            let sx = x as f64 + pan_x;
            let v = 128.0 + 100.0 * (tau * sx / 64.0).sin() * (tau * y as f64 / 48.0).sin();
            buf.push(v.round().clamp(0.0, 255.0) as u8);
        }
    }
    buf
}

fn gray(pan_x: f64) -> GrayImage {
    let data = texture(pan_x);
    GrayImage::from_fn(1280, 720, |x, y| Luma([data[(y * 1280 + x) as usize]]))
}

fn frame(pan_x: f64) -> Frame {
    let data = texture(pan_x);
    RgbImage::from_fn(1280, 720, |x, y| {
        let v = data[(y * 1280 + x) as usize];
        Rgb([v, v, v])
    })
}

fn benchmark_detect_border_mask(c: &mut Criterion) {
    let detector = FeatureDetector::new(FeatureConfig::default()).expect("valid config");
    let img = gray(0.0);

    c.bench_function("detect_border_mask_720p", |b| {
        b.iter(|| detector.detect(black_box(&img)))
    });
}

fn benchmark_detect_full_frame(c: &mut Criterion) {
    let config = FeatureConfig {
        mask: BorderMask::full_frame(),
        ..FeatureConfig::default()
    };
    let detector = FeatureDetector::new(config).expect("valid config");
    let img = gray(0.0);

    c.bench_function("detect_full_frame_720p", |b| {
        b.iter(|| detector.detect(black_box(&img)))
    });
}

fn benchmark_track_100_points(c: &mut Criterion) {
    let tracker = OpticalFlowTracker::new(OpticalFlowConfig::default()).expect("valid config");
    let prev = gray(0.0);
    let next = gray(10.0);
    let points = FeatureDetector::new(FeatureConfig {
        mask: BorderMask::full_frame(),
        ..FeatureConfig::default()
    })
    .expect("valid config")
    .detect(&prev);

    c.bench_function("track_100_points_720p", |b| {
        b.iter(|| tracker.track(black_box(&prev), black_box(&next), black_box(&points)))
    });
}

fn benchmark_estimate_sequence_10_frames(c: &mut Criterion) {
    let estimator =
        CameraMovementEstimator::new(CameraMotionConfig::default()).expect("valid config");
    let frames: Vec<Frame> = (0..10).map(|i| frame(i as f64 * 6.0)).collect();

    c.bench_function("estimate_sequence_10_frames_720p", |b| {
        b.iter(|| estimator.estimate_sequence(black_box(&frames)))
    });
}

criterion_group!(
    benches,
    benchmark_detect_border_mask,
    benchmark_detect_full_frame,
    benchmark_track_100_points,
    benchmark_estimate_sequence_10_frames,
);
criterion_main!(benches);
