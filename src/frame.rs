//! Frame types and frame sources.
//!
//! Video decoding is handled outside this crate. A clip enters either as an
//! in-memory frame vector or as a directory of numbered still images, which is
//! what common decoders (`ffmpeg -i clip.mp4 frames/%05d.png`) produce.

use std::fs;
use std::path::{Path, PathBuf};

use image::{GrayImage, Luma, RgbImage};
use sha2::{Digest, Sha256};

use crate::{Error, Result};

/// A decoded color frame (height x width x 3).
pub type Frame = RgbImage;

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Convert a color frame to single-channel luma using BT.601 weights.
pub fn to_grayscale(frame: &Frame) -> GrayImage {
    let mut gray = GrayImage::new(frame.width(), frame.height());
    for (x, y, px) in frame.enumerate_pixels() {
        let [r, g, b] = px.0;
        let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
        gray.put_pixel(x, y, Luma([luma.round().clamp(0.0, 255.0) as u8]));
    }
    gray
}

/// Check that a frame sequence is non-degenerate and of uniform size.
pub fn validate_frames(frames: &[Frame]) -> Result<()> {
    let Some(first) = frames.first() else {
        return Ok(());
    };
    let dims = first.dimensions();
    if dims.0 == 0 || dims.1 == 0 {
        return Err(Error::InvalidFrame(format!(
            "frame 0 has empty dimensions {}x{}",
            dims.0, dims.1
        )));
    }
    for (idx, frame) in frames.iter().enumerate().skip(1) {
        if frame.dimensions() != dims {
            return Err(Error::InvalidFrame(format!(
                "frame {} is {}x{}, expected {}x{}",
                idx,
                frame.width(),
                frame.height(),
                dims.0,
                dims.1
            )));
        }
    }
    Ok(())
}

/// Source of an ordered, complete frame sequence.
pub trait FrameSource {
    /// Decode every frame of the clip in order.
    fn read_frames(&mut self) -> Result<Vec<Frame>>;

    /// Bytes identifying the input content, used to key the stub cache.
    fn identity(&self) -> Result<Vec<u8>>;
}

/// Frames already held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFrames {
    pub frames: Vec<Frame>,
}

impl InMemoryFrames {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self { frames }
    }
}

impl FrameSource for InMemoryFrames {
    fn read_frames(&mut self) -> Result<Vec<Frame>> {
        validate_frames(&self.frames)?;
        Ok(self.frames.clone())
    }

    fn identity(&self) -> Result<Vec<u8>> {
        let mut hasher = Sha256::new();
        for frame in &self.frames {
            hasher.update(frame.width().to_le_bytes());
            hasher.update(frame.height().to_le_bytes());
            hasher.update(frame.as_raw());
        }
        Ok(hasher.finalize().to_vec())
    }
}

/// A directory of still images, ordered by file name.
#[derive(Debug, Clone)]
pub struct ImageSequence {
    dir: PathBuf,
}

impl ImageSequence {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Sorted image file paths in the directory.
    pub fn paths(&self) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| {
            Error::IoError(std::io::Error::new(
                e.kind(),
                format!("failed to read frame directory '{}': {}", self.dir.display(), e),
            ))
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if path.is_file() && is_image {
                paths.push(path);
            }
        }
        paths.sort();

        if paths.is_empty() {
            return Err(Error::InvalidFrame(format!(
                "no image frames found in '{}'",
                self.dir.display()
            )));
        }
        Ok(paths)
    }
}

impl FrameSource for ImageSequence {
    fn read_frames(&mut self) -> Result<Vec<Frame>> {
        let paths = self.paths()?;
        let mut frames = Vec::with_capacity(paths.len());
        for path in &paths {
            frames.push(image::open(path)?.to_rgb8());
        }
        validate_frames(&frames)?;
        tracing::info!(
            "read {} frames from {}",
            frames.len(),
            self.dir.display()
        );
        Ok(frames)
    }

    fn identity(&self) -> Result<Vec<u8>> {
        let mut hasher = Sha256::new();
        for path in self.paths()? {
            if let Some(name) = path.file_name() {
                hasher.update(name.to_string_lossy().as_bytes());
            }
            hasher.update(fs::read(&path)?);
        }
        Ok(hasher.finalize().to_vec())
    }
}

/// Write frames as a numbered PNG sequence, returning the written paths.
pub fn save_frames<P: AsRef<Path>>(frames: &[Frame], dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(frames.len());
    for (idx, frame) in frames.iter().enumerate() {
        let path = dir.join(format!("frame_{:05}.png", idx));
        frame.save(&path)?;
        written.push(path);
    }
    tracing::info!("wrote {} frames to {}", written.len(), dir.display());
    Ok(written)
}
