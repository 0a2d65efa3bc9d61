//! On-disk stub cache for per-frame camera movement.
//!
//! Estimating camera movement over a full match clip is the slow part of the
//! pipeline, so the result is persisted once and reused on later runs. The
//! stub is a small JSON document:
//!
//! ```json
//! { "fingerprint": "3f1a…", "movements": [[0.0, 0.0], [10.2, -0.4], …] }
//! ```
//!
//! A stub is only trusted when its fingerprint matches the [`CacheKey`] of the
//! current run. Anything unreadable, malformed or mismatched is a cache miss;
//! the caller recomputes and overwrites it.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use crate::camera_motion::MotionSequence;
use crate::config::CameraMotionConfig;
use crate::features::FeatureConfig;
use crate::flow::OpticalFlowConfig;
use crate::{Error, Result};

/// Where the stub lives and whether it may be read or written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Stub file path. `None` disables caching.
    pub path: Option<PathBuf>,

    /// Serve results from an existing stub.
    pub read: bool,

    /// Persist freshly computed results.
    pub write: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: None,
            read: true,
            write: true,
        }
    }
}

/// Fingerprint of an input clip together with the estimation parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// SHA-256 over the source identity, every parameter that influences the
    /// estimate, and the crate version.
    pub fn compute(source_identity: &[u8], config: &CameraMotionConfig) -> Result<Self> {
        #[derive(Serialize)]
        struct KeyTuple<'a> {
            minimum_distance: f64,
            features: &'a FeatureConfig,
            optical_flow: &'a OpticalFlowConfig,
            code_version: &'a str,
        }
        let tuple = KeyTuple {
            minimum_distance: config.minimum_distance,
            features: &config.features,
            optical_flow: &config.optical_flow,
            code_version: env!("CARGO_PKG_VERSION"),
        };

        let mut hasher = Sha256::new();
        hasher.update(source_identity);
        hasher.update(serde_json::to_vec(&tuple)?);
        Ok(Self(format!("{:x}", hasher.finalize())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for CacheKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    fingerprint: Option<CacheKey>,
    movements: MotionSequence,
}

/// Camera movement stub stored at a single path.
#[derive(Debug, Clone)]
pub struct StubCache {
    path: PathBuf,
}

impl StubCache {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stub if it exists, parses, and was written under `key`.
    ///
    /// Never fails: every problem is reported as a miss.
    pub fn load(&self, key: Option<&CacheKey>) -> Option<MotionSequence> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no camera movement stub at {}", self.path.display());
                return None;
            }
            Err(e) => {
                tracing::warn!("cannot read stub {}: {}", self.path.display(), e);
                return None;
            }
        };

        let envelope: Envelope = match serde_json::from_slice(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!("ignoring corrupt stub {}: {}", self.path.display(), e);
                return None;
            }
        };

        if envelope.fingerprint.as_ref() != key {
            tracing::info!(
                "stub {} was written for different input or parameters",
                self.path.display()
            );
            return None;
        }

        let movements = envelope.movements;
        match movements.get(0) {
            Some(first) if first.is_zero() => Some(movements),
            Some(_) => {
                tracing::warn!(
                    "ignoring stub {}: first frame has non-zero movement",
                    self.path.display()
                );
                None
            }
            None => {
                tracing::warn!("ignoring empty stub {}", self.path.display());
                None
            }
        }
    }

    /// Replace the stub with `movements`.
    ///
    /// The payload is written to a temporary file next to the target and then
    /// renamed over it, so readers see either the old or the new stub.
    pub fn store(&self, movements: &MotionSequence, key: Option<&CacheKey>) -> Result<()> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let envelope = Envelope {
            fingerprint: key.cloned(),
            movements: movements.clone(),
        };
        let mut tmp = NamedTempFile::new_in(parent)?;
        serde_json::to_writer(&mut tmp, &envelope)?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| {
            Error::Cache(format!(
                "failed to replace stub {}: {}",
                self.path.display(),
                e.error
            ))
        })?;

        tracing::info!(
            "stored camera movement for {} frames in {}",
            movements.len(),
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera_motion::CameraMovement;
    use tempfile::tempdir;

    fn sample() -> MotionSequence {
        MotionSequence::new(vec![
            CameraMovement::ZERO,
            CameraMovement::new(10.25, -0.5),
            CameraMovement::ZERO,
        ])
    }

    #[test]
    fn test_store_then_load() {
        let dir = tempdir().unwrap();
        let cache = StubCache::new(dir.path().join("stubs/camera.json"));
        let key = CacheKey::compute(b"clip", &CameraMotionConfig::default()).unwrap();

        cache.store(&sample(), Some(&key)).unwrap();
        assert_eq!(cache.load(Some(&key)), Some(sample()));
    }

    #[test]
    fn test_unkeyed_roundtrip() {
        let dir = tempdir().unwrap();
        let cache = StubCache::new(dir.path().join("camera.json"));
        cache.store(&sample(), None).unwrap();
        assert_eq!(cache.load(None), Some(sample()));
    }

    #[test]
    fn test_missing_file_is_miss() {
        let dir = tempdir().unwrap();
        let cache = StubCache::new(dir.path().join("absent.json"));
        assert_eq!(cache.load(None), None);
    }

    #[test]
    fn test_corrupt_payload_is_miss() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("camera.json");
        fs::write(&path, b"{\"fingerprint\": null, \"movements\": [[0.0").unwrap();
        assert_eq!(StubCache::new(&path).load(None), None);
    }

    #[test]
    fn test_invalid_structure_is_miss() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("camera.json");
        let cache = StubCache::new(&path);

        cache.store(&MotionSequence::default(), None).unwrap();
        assert_eq!(cache.load(None), None);

        fs::write(&path, b"{\"fingerprint\": null, \"movements\": [[3.0, 0.0]]}").unwrap();
        assert_eq!(cache.load(None), None);
    }

    #[test]
    fn test_fingerprint_mismatch_is_miss() {
        let dir = tempdir().unwrap();
        let cache = StubCache::new(dir.path().join("camera.json"));
        let config = CameraMotionConfig::default();
        let key_a = CacheKey::compute(b"clip-a", &config).unwrap();
        let key_b = CacheKey::compute(b"clip-b", &config).unwrap();

        cache.store(&sample(), Some(&key_a)).unwrap();
        assert_eq!(cache.load(Some(&key_b)), None);
        assert_eq!(cache.load(None), None);
    }

    #[test]
    fn test_key_depends_on_parameters() {
        let config = CameraMotionConfig::default();
        let mut tuned = config.clone();
        tuned.minimum_distance = 8.0;
        let a = CacheKey::compute(b"clip", &config).unwrap();
        let b = CacheKey::compute(b"clip", &tuned).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, CacheKey::compute(b"clip", &config).unwrap());
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn test_key_ignores_output_settings() {
        let config = CameraMotionConfig::default();
        let mut other = config.clone();
        other.adjust.accumulate = true;
        other.overlay.alpha = 0.3;
        assert_eq!(
            CacheKey::compute(b"clip", &config).unwrap(),
            CacheKey::compute(b"clip", &other).unwrap()
        );
    }

    #[test]
    fn test_store_overwrites() {
        let dir = tempdir().unwrap();
        let cache = StubCache::new(dir.path().join("camera.json"));
        cache.store(&sample(), None).unwrap();
        let shorter = MotionSequence::zeros(1);
        cache.store(&shorter, None).unwrap();
        assert_eq!(cache.load(None), Some(shorter));
    }
}
