//! Tracked object records exchanged with the object tracker.
//!
//! The tracker produces, per object class (`"players"`, `"referees"`,
//! `"ball"`, ...), one map per frame from track id to [`TrackRecord`]. Only
//! `position_adjusted` is written by this crate; every other field a tracker
//! attaches (team, colour, ball possession, ...) is carried through untouched.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::utils::{bbox_center, bbox_foot, BBox};
use crate::Result;

/// Tracker-assigned object identity.
pub type TrackId = u32;

/// One object in one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    /// `[x1, y1, x2, y2]` in frame pixels.
    pub bbox: BBox,

    /// Raw position in frame pixels.
    pub position: Point2<f64>,

    /// Position with camera movement removed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_adjusted: Option<Point2<f64>>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl TrackRecord {
    pub fn new(bbox: BBox, position: Point2<f64>) -> Self {
        Self {
            bbox,
            position,
            position_adjusted: None,
            extra: BTreeMap::new(),
        }
    }

    /// Record for a person, positioned at the bottom-center of the box.
    pub fn from_foot(bbox: BBox) -> Self {
        Self::new(bbox, bbox_foot(&bbox))
    }

    /// Record for the ball, positioned at the box center.
    pub fn from_center(bbox: BBox) -> Self {
        Self::new(bbox, bbox_center(&bbox))
    }
}

/// Track id to record, for one frame.
pub type FrameTracks = BTreeMap<TrackId, TrackRecord>;

/// Object class to per-frame tracks.
pub type Tracks = BTreeMap<String, Vec<FrameTracks>>;

/// Read tracks from a JSON file.
pub fn load_tracks<P: AsRef<Path>>(path: P) -> Result<Tracks> {
    let raw = fs::read(path.as_ref())?;
    Ok(serde_json::from_slice(&raw)?)
}

/// Write tracks to a JSON file.
pub fn save_tracks<P: AsRef<Path>>(tracks: &Tracks, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_vec_pretty(tracks)?)?;
    Ok(())
}

/// Number of frames covered by the longest object class.
pub fn frame_span(tracks: &Tracks) -> usize {
    tracks.values().map(Vec::len).max().unwrap_or(0)
}
