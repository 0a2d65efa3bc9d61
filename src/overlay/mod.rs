//! Diagnostic overlay of camera movement on output frames.
//!
//! Each frame gets a semi-transparent white banner in its top-left corner with
//! the frame's movement written on two lines:
//!
//! ```text
//! CAMERA MOVEMENT X: 10.24
//! CAMERA MOVEMENT Y: -0.37
//! ```

mod glyphs;

use image::Rgb;
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};

use crate::camera_motion::{CameraMovement, MotionSequence};
use crate::frame::Frame;
use crate::{Error, Result};

use glyphs::{cells, glyph, ADVANCE, GLYPH_HEIGHT};

const BANNER_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const TEXT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

/// Largest accepted `text_scale`; a glyph cell is then 64 pixels wide.
pub const MAX_TEXT_SCALE: u32 = 64;

/// Banner geometry and text size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    pub banner_width: u32,
    pub banner_height: u32,

    /// Banner opacity in `[0, 1]`.
    pub alpha: f32,

    /// Pixels per font cell.
    pub text_scale: u32,

    /// Top-left corner of the first text line.
    pub text_origin: (u32, u32),

    /// Vertical distance between the two text lines.
    pub line_spacing: u32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            banner_width: 500,
            banner_height: 100,
            alpha: 0.6,
            text_scale: 3,
            text_origin: (10, 12),
            line_spacing: 45,
        }
    }
}

impl OverlayStyle {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(Error::InvalidConfig(format!(
                "overlay alpha must be in [0, 1], got {}",
                self.alpha
            )));
        }
        if !(1..=MAX_TEXT_SCALE).contains(&self.text_scale) {
            return Err(Error::InvalidConfig(format!(
                "overlay text_scale must be in [1, {}], got {}",
                MAX_TEXT_SCALE, self.text_scale
            )));
        }
        Ok(())
    }
}

/// Burns camera movement into frames.
#[derive(Debug, Clone)]
pub struct OverlayRenderer {
    style: OverlayStyle,
}

impl OverlayRenderer {
    pub fn new(style: OverlayStyle) -> Result<Self> {
        style.validate()?;
        Ok(Self { style })
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    /// Annotated copies of `frames`.
    ///
    /// Every frame needs a movement entry; extra entries are ignored.
    pub fn draw(&self, frames: &[Frame], movements: &MotionSequence) -> Result<Vec<Frame>> {
        if frames.len() > movements.len() {
            return Err(Error::FrameIndexOutOfRange {
                frame: movements.len(),
                len: movements.len(),
            });
        }
        Ok(frames
            .iter()
            .zip(movements.iter())
            .map(|(frame, movement)| self.draw_frame(frame, movement))
            .collect())
    }

    /// Annotated copy of a single frame.
    pub fn draw_frame(&self, frame: &Frame, movement: &CameraMovement) -> Frame {
        let mut out = frame.clone();
        self.draw_banner(&mut out);

        let (x, y) = self.style.text_origin;
        self.draw_text(&mut out, x, y, &format!("CAMERA MOVEMENT X: {:.2}", movement.x));
        self.draw_text(
            &mut out,
            x,
            y.saturating_add(self.style.line_spacing),
            &format!("CAMERA MOVEMENT Y: {:.2}", movement.y),
        );
        out
    }

    fn draw_banner(&self, frame: &mut Frame) {
        let w = self.style.banner_width.min(frame.width());
        let h = self.style.banner_height.min(frame.height());
        if w == 0 || h == 0 {
            return;
        }

        let mut banner = frame.clone();
        draw_filled_rect_mut(&mut banner, Rect::at(0, 0).of_size(w, h), BANNER_COLOR);

        let alpha = self.style.alpha;
        for y in 0..h {
            for x in 0..w {
                let over = banner.get_pixel(x, y).0;
                let px = frame.get_pixel_mut(x, y);
                for c in 0..3 {
                    let v = alpha * over[c] as f32 + (1.0 - alpha) * px.0[c] as f32;
                    px.0[c] = v.round().clamp(0.0, 255.0) as u8;
                }
            }
        }
    }

    fn draw_text(&self, frame: &mut Frame, x: u32, y: u32, text: &str) {
        let scale = self.style.text_scale;
        for (i, c) in text.chars().enumerate() {
            let Some(rows) = glyph(c) else {
                continue;
            };
            let advance = (i as u32).saturating_mul(ADVANCE * scale);
            let gx = x.saturating_add(advance);
            if gx >= frame.width() {
                break;
            }
            for (col, row) in cells(&rows) {
                let cx = gx.saturating_add(col * scale);
                let cy = y.saturating_add(row * scale);
                if cx >= frame.width() || cy >= frame.height() {
                    continue;
                }
                // draw_filled_rect_mut clips the far edges to the canvas.
                let rect = Rect::at(cx as i32, cy as i32).of_size(scale, scale);
                draw_filled_rect_mut(frame, rect, TEXT_COLOR);
            }
        }
    }

    /// Height in pixels of one rendered text line.
    pub fn line_height(&self) -> u32 {
        GLYPH_HEIGHT * self.style.text_scale
    }
}
