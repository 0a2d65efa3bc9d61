//! Run configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::adjuster::AdjustConfig;
use crate::cache::CacheConfig;
use crate::features::FeatureConfig;
use crate::flow::OpticalFlowConfig;
use crate::overlay::OverlayStyle;
use crate::{Error, Result};

/// Every tunable of camera movement estimation and compensation.
///
/// Missing fields in a JSON file fall back to their defaults, so a config
/// file only needs the values that differ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraMotionConfig {
    /// Largest per-frame feature displacement (px) still treated as a
    /// stationary camera.
    pub minimum_distance: f64,
    pub features: FeatureConfig,
    pub optical_flow: OpticalFlowConfig,
    pub cache: CacheConfig,
    pub adjust: AdjustConfig,
    pub overlay: OverlayStyle,
}

impl Default for CameraMotionConfig {
    fn default() -> Self {
        Self {
            minimum_distance: 5.0,
            features: FeatureConfig::default(),
            optical_flow: OpticalFlowConfig::default(),
            cache: CacheConfig::default(),
            adjust: AdjustConfig::default(),
            overlay: OverlayStyle::default(),
        }
    }
}

impl CameraMotionConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.minimum_distance.is_finite() && self.minimum_distance >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "minimum_distance must be finite and non-negative, got {}",
                self.minimum_distance
            )));
        }
        self.features.validate()?;
        self.optical_flow.validate()?;
        self.overlay.validate()?;
        Ok(())
    }

    /// Load and validate a JSON config file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read(path.as_ref())?;
        let config: Self = serde_json::from_slice(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path.as_ref(), serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::MaskRegion;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_are_valid() {
        let config = CameraMotionConfig::default();
        config.validate().unwrap();
        assert_eq!(config.minimum_distance, 5.0);
        assert_eq!(config.features.max_corners, 100);
        assert_eq!(config.optical_flow.window_size, 15);
        assert!(config.cache.path.is_none());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "minimum_distance": 3.5,
            "features": {"mask": {"regions": [{"left": 0.0, "right": 0.05}]}},
            "cache": {"path": "stubs/camera.json", "read": false}
        }"#;
        let config: CameraMotionConfig = serde_json::from_str(json).unwrap();
        config.validate().unwrap();
        assert_eq!(config.minimum_distance, 3.5);
        assert_eq!(config.features.quality_level, 0.3);
        assert_eq!(config.features.mask.regions, vec![MaskRegion::vertical_strip(0.0, 0.05)]);
        assert!(!config.cache.read);
        assert!(config.cache.write);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = CameraMotionConfig::default();
        config.minimum_distance = -1.0;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = CameraMotionConfig::default();
        config.optical_flow.window_size = 4;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = CameraMotionConfig::default();
        config.adjust.accumulate = true;
        config.to_json_file(&path).unwrap();
        assert_eq!(CameraMotionConfig::from_json_file(&path).unwrap(), config);
    }
}
