use glam::{Quat, Vec3};

use crate::animation::binding::TargetPath;
use crate::animation::tracks::KeyframeTrack;
use crate::errors::{MannequinError, Result};

#[derive(Debug, Clone)]
pub struct TrackMeta {
    /// Name of the bone (scene node) this track drives.
    pub bone_name: String,
    pub target: TargetPath,
}

#[derive(Debug, Clone)]
pub enum TrackData {
    Vector3(KeyframeTrack<Vec3>),
    Quaternion(KeyframeTrack<Quat>),
}

impl TrackData {
    #[must_use]
    pub fn times(&self) -> &[f32] {
        match self {
            TrackData::Vector3(t) => &t.times,
            TrackData::Quaternion(t) => &t.times,
        }
    }

    #[must_use]
    pub fn end_time(&self) -> f32 {
        match self {
            TrackData::Vector3(t) => t.end_time(),
            TrackData::Quaternion(t) => t.end_time(),
        }
    }

    fn is_well_formed(&self) -> bool {
        match self {
            TrackData::Vector3(t) => t.is_well_formed(),
            TrackData::Quaternion(t) => t.is_well_formed(),
        }
    }

    fn matches_target(&self, target: TargetPath) -> bool {
        matches!(
            (self, target),
            (TrackData::Vector3(_), TargetPath::Translation)
                | (TrackData::Quaternion(_), TargetPath::Rotation)
        )
    }
}

/// A complete track definition: target metadata plus keyframe data.
#[derive(Debug, Clone)]
pub struct Track {
    pub meta: TrackMeta,
    pub data: TrackData,
}

impl Track {
    #[must_use]
    pub fn rotation(bone_name: &str, keys: &[(f32, Quat)]) -> Self {
        Self {
            meta: TrackMeta {
                bone_name: bone_name.to_string(),
                target: TargetPath::Rotation,
            },
            data: TrackData::Quaternion(KeyframeTrack::linear(keys)),
        }
    }

    #[must_use]
    pub fn position(bone_name: &str, keys: &[(f32, Vec3)]) -> Self {
        Self {
            meta: TrackMeta {
                bone_name: bone_name.to_string(),
                target: TargetPath::Translation,
            },
            data: TrackData::Vector3(KeyframeTrack::linear(keys)),
        }
    }

    /// `<boneName>.<property>`, e.g. `Chest.quaternion`.
    #[must_use]
    pub fn target_path(&self) -> String {
        format!("{}.{}", self.meta.bone_name, self.meta.target.property_name())
    }
}

#[derive(Debug, Clone)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
    pub tracks: Vec<Track>,
}

impl AnimationClip {
    /// Creates a clip whose duration is the latest keyframe across all tracks.
    #[must_use]
    pub fn new(name: impl Into<String>, tracks: Vec<Track>) -> Self {
        let duration = tracks
            .iter()
            .map(|t| t.data.end_time())
            .fold(0.0_f32, f32::max);

        Self {
            name: name.into(),
            duration,
            tracks,
        }
    }

    /// Names of the bones this clip drives, in track order (may repeat).
    pub fn bone_names(&self) -> impl Iterator<Item = &str> {
        self.tracks.iter().map(|t| t.meta.bone_name.as_str())
    }

    /// Checks every track: non-empty, strictly increasing times, one value per
    /// time, and data kind matching the target property.
    pub fn validate(&self) -> Result<()> {
        for track in &self.tracks {
            if track.data.times().is_empty() || !track.data.is_well_formed() {
                return Err(MannequinError::InvalidRig(format!(
                    "clip '{}': track '{}' must have strictly increasing keyframe times",
                    self.name,
                    track.target_path()
                )));
            }
            if !track.data.matches_target(track.meta.target) {
                return Err(MannequinError::InvalidRig(format!(
                    "clip '{}': track '{}' carries the wrong value type",
                    self.name,
                    track.target_path()
                )));
            }
        }
        Ok(())
    }
}
