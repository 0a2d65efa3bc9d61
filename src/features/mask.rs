//! Resolution-independent feature masks.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

fn unit() -> f64 {
    1.0
}

/// Axis-aligned rectangle expressed as fractions of frame width and height.
///
/// `left`/`right` are fractions of the width, `top`/`bottom` fractions of the
/// height. Omitted vertical bounds span the full frame height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaskRegion {
    pub left: f64,
    pub right: f64,
    #[serde(default)]
    pub top: f64,
    #[serde(default = "unit")]
    pub bottom: f64,
}

impl MaskRegion {
    /// A full-height vertical strip between two width fractions.
    pub fn vertical_strip(left: f64, right: f64) -> Self {
        Self {
            left,
            right,
            top: 0.0,
            bottom: 1.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if !(in_unit(self.left) && in_unit(self.right) && self.left < self.right) {
            return Err(Error::InvalidConfig(format!(
                "mask region needs 0 <= left < right <= 1, got left={} right={}",
                self.left, self.right
            )));
        }
        if !(in_unit(self.top) && in_unit(self.bottom) && self.top < self.bottom) {
            return Err(Error::InvalidConfig(format!(
                "mask region needs 0 <= top < bottom <= 1, got top={} bottom={}",
                self.top, self.bottom
            )));
        }
        Ok(())
    }

    /// Half-open pixel bounds `(x0, x1, y0, y1)` for a frame of the given size.
    pub fn pixel_bounds(&self, width: u32, height: u32) -> (u32, u32, u32, u32) {
        let scale = |frac: f64, extent: u32, round_up: bool| -> u32 {
            let v = frac * extent as f64;
            let v = if round_up { v.ceil() } else { v.floor() };
            (v.max(0.0) as u32).min(extent)
        };
        (
            scale(self.left, width, false),
            scale(self.right, width, true),
            scale(self.top, height, false),
            scale(self.bottom, height, true),
        )
    }
}

/// Union of [`MaskRegion`]s in which features may be selected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BorderMask {
    pub regions: Vec<MaskRegion>,
}

impl Default for BorderMask {
    /// Thin strips along the extreme left and right margins.
    fn default() -> Self {
        Self {
            regions: vec![
                MaskRegion::vertical_strip(0.0, 0.02),
                MaskRegion::vertical_strip(0.98, 1.0),
            ],
        }
    }
}

impl BorderMask {
    pub fn new(regions: Vec<MaskRegion>) -> Self {
        Self { regions }
    }

    /// A mask admitting the whole frame.
    pub fn full_frame() -> Self {
        Self::new(vec![MaskRegion::vertical_strip(0.0, 1.0)])
    }

    pub fn validate(&self) -> Result<()> {
        if self.regions.is_empty() {
            return Err(Error::InvalidConfig(
                "feature mask must contain at least one region".to_string(),
            ));
        }
        self.regions.iter().try_for_each(MaskRegion::validate)
    }

    /// Row-major boolean raster of the mask for a `width` x `height` frame.
    pub fn rasterize(&self, width: u32, height: u32) -> Vec<bool> {
        let mut raster = vec![false; width as usize * height as usize];
        for region in &self.regions {
            let (x0, x1, y0, y1) = region.pixel_bounds(width, height);
            for y in y0..y1 {
                let row = y as usize * width as usize;
                for x in x0..x1 {
                    raster[row + x as usize] = true;
                }
            }
        }
        raster
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mask_covers_margins_only() {
        let mask = BorderMask::default();
        let raster = mask.rasterize(100, 10);
        // 2% of 100 px on each side
        assert!(raster[0] && raster[1]);
        assert!(!raster[2]);
        assert!(!raster[50]);
        assert!(raster[98] && raster[99]);
        assert_eq!(raster.iter().filter(|&&v| v).count(), 4 * 10);
    }

    #[test]
    fn test_region_scales_with_resolution() {
        let region = MaskRegion::vertical_strip(0.25, 0.5);
        assert_eq!(region.pixel_bounds(400, 100), (100, 200, 0, 100));
        assert_eq!(region.pixel_bounds(1920, 1080), (480, 960, 0, 1080));
    }

    #[test]
    fn test_partial_height_region() {
        let region = MaskRegion {
            left: 0.0,
            right: 0.5,
            top: 0.5,
            bottom: 1.0,
        };
        let raster = BorderMask::new(vec![region]).rasterize(4, 4);
        assert!(!raster[0]);
        assert!(raster[2 * 4]);
        assert!(!raster[2 * 4 + 2]);
    }

    #[test]
    fn test_validate() {
        assert!(BorderMask::default().validate().is_ok());
        assert!(BorderMask::new(vec![]).validate().is_err());
        assert!(BorderMask::new(vec![MaskRegion::vertical_strip(0.6, 0.4)])
            .validate()
            .is_err());
        assert!(BorderMask::new(vec![MaskRegion::vertical_strip(0.0, 1.5)])
            .validate()
            .is_err());
    }

    #[test]
    fn test_deserialize_defaults_full_height() {
        let region: MaskRegion = serde_json::from_str(r#"{"left": 0.1, "right": 0.2}"#).unwrap();
        assert_eq!(region, MaskRegion::vertical_strip(0.1, 0.2));
    }
}
