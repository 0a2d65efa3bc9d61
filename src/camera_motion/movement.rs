//! Per-frame camera movement values.

use std::ops::{Add, Index};

use serde::{Deserialize, Serialize};

/// Camera displacement for one frame transition, in pixels.
///
/// Expressed as `old - new` feature position, i.e. how far the scene content
/// moved opposite to the camera. Serialized as a two-element array `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct CameraMovement {
    pub x: f64,
    pub y: f64,
}

impl CameraMovement {
    /// A stationary camera.
    pub const ZERO: CameraMovement = CameraMovement { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean length of the displacement.
    pub fn magnitude(&self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

impl From<[f64; 2]> for CameraMovement {
    fn from(v: [f64; 2]) -> Self {
        Self::new(v[0], v[1])
    }
}

impl From<CameraMovement> for [f64; 2] {
    fn from(m: CameraMovement) -> Self {
        [m.x, m.y]
    }
}

impl Add for CameraMovement {
    type Output = CameraMovement;

    fn add(self, rhs: CameraMovement) -> CameraMovement {
        CameraMovement::new(self.x + rhs.x, self.y + rhs.y)
    }
}

/// Camera movement per frame, indexed by frame number.
///
/// Entry 0 is always zero: the first frame has no predecessor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MotionSequence(Vec<CameraMovement>);

impl MotionSequence {
    pub fn new(movements: Vec<CameraMovement>) -> Self {
        Self(movements)
    }

    /// A stationary camera over `frame_count` frames.
    pub fn zeros(frame_count: usize) -> Self {
        Self(vec![CameraMovement::ZERO; frame_count])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, frame: usize) -> Option<CameraMovement> {
        self.0.get(frame).copied()
    }

    pub fn as_slice(&self) -> &[CameraMovement] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CameraMovement> {
        self.0.iter()
    }

    /// Running sum of movements, i.e. total camera offset since frame 0.
    pub fn cumulative(&self) -> MotionSequence {
        let mut total = CameraMovement::ZERO;
        self.0
            .iter()
            .map(|m| {
                total = total + *m;
                total
            })
            .collect()
    }

    /// Number of frames with a non-zero movement.
    pub fn moving_frames(&self) -> usize {
        self.0.iter().filter(|m| !m.is_zero()).count()
    }
}

impl Index<usize> for MotionSequence {
    type Output = CameraMovement;

    fn index(&self, frame: usize) -> &CameraMovement {
        &self.0[frame]
    }
}

impl From<Vec<CameraMovement>> for MotionSequence {
    fn from(movements: Vec<CameraMovement>) -> Self {
        Self(movements)
    }
}

impl FromIterator<CameraMovement> for MotionSequence {
    fn from_iter<I: IntoIterator<Item = CameraMovement>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
