//! Procedural avatar rig.
//!
//! [`AvatarRig::build`] runs the whole authoring pipeline:
//!
//! 1. [`skeleton::build_humanoid`]: canonical bone tree at stylized proportions
//! 2. [`geometry::build_body`]: box body rigidly skinned to that tree
//! 3. [`clips::authored_clips`]: `Idle`, `Action` and `Victory`
//!
//! and validates the result before anything is serialized.
//!
//! ```rust,ignore
//! use mannequin::rig::AvatarRig;
//!
//! let rig = AvatarRig::build(&Default::default())?;
//! let glb: Vec<u8> = rig.export(&Default::default())?;
//! ```

pub mod clips;
pub mod geometry;
pub mod skeleton;

pub use clips::{ACTION, CLIP_NAMES, IDLE, VICTORY};
pub use geometry::{BodyPart, SkinnedMesh, SkinnedVertex};
pub use skeleton::{Bone, BoneTree, CANONICAL_BONES, Humanoid, Proportions, ROOT_BONE};

use rustc_hash::FxHashSet;

use crate::animation::AnimationClip;
use crate::assets::exporter::{self, SerializedAsset};
use crate::errors::{MannequinError, Result};
use crate::settings::{ExportSettings, RigSettings};

/// Skeleton, skinned body and clips, ready to export.
#[derive(Debug, Clone)]
pub struct AvatarRig {
    pub skeleton: BoneTree,
    pub proportions: Proportions,
    pub mesh: SkinnedMesh,
    pub clips: Vec<AnimationClip>,
}

impl AvatarRig {
    pub fn build(settings: &RigSettings) -> Result<Self> {
        let style = &settings.stylization;
        let humanoid = skeleton::build_humanoid(style);
        let mesh = geometry::build_body(&humanoid)?;
        let Humanoid { tree, proportions } = humanoid;

        let hips_rest = tree
            .index_of(ROOT_BONE)
            .and_then(|i| tree.get(i))
            .map(|b| b.offset)
            .ok_or_else(|| MannequinError::MissingBone {
                bone: ROOT_BONE.to_string(),
                referenced_by: "clip authoring".to_string(),
            })?;
        let clips = clips::authored_clips(hips_rest, style.body_height);

        let rig = Self {
            skeleton: tree,
            proportions,
            mesh,
            clips,
        };
        rig.validate()?;

        log::info!(
            "Avatar rig built: {} bones, {} vertices, clips {:?}",
            rig.skeleton.len(),
            rig.mesh.vertices.len(),
            rig.clip_names().collect::<Vec<_>>()
        );
        Ok(rig)
    }

    pub fn clip_names(&self) -> impl Iterator<Item = &str> {
        self.clips.iter().map(|c| c.name.as_str())
    }

    #[must_use]
    pub fn clip(&self, name: &str) -> Option<&AnimationClip> {
        self.clips.iter().find(|c| c.name == name)
    }

    /// Checks every invariant the exporter relies on.
    ///
    /// The skin refers to bones by arena index, so a stale index would bind a
    /// part to the wrong bone without any runtime error. Catch it here.
    pub fn validate(&self) -> Result<()> {
        self.skeleton.validate()?;
        let bone_count = self.skeleton.len();

        for (i, v) in self.mesh.vertices.iter().enumerate() {
            for (slot, (&joint, &weight)) in v.joints.iter().zip(&v.weights).enumerate() {
                if weight > 0.0 && usize::from(joint) >= bone_count {
                    return Err(MannequinError::InvalidRig(format!(
                        "vertex {i} slot {slot} references joint {joint}, skeleton has {bone_count} bones"
                    )));
                }
            }
            let sum: f32 = v.weights.iter().sum();
            if (sum - 1.0).abs() > 1e-4 {
                return Err(MannequinError::InvalidRig(format!(
                    "vertex {i} weights sum to {sum}"
                )));
            }
        }

        let vertex_count = self.mesh.vertices.len();
        if let Some(&index) = self
            .mesh
            .indices
            .iter()
            .find(|&&idx| usize::from(idx) >= vertex_count)
        {
            return Err(MannequinError::InvalidRig(format!(
                "index {index} exceeds vertex count {vertex_count}"
            )));
        }

        for part in &self.mesh.parts {
            if self.skeleton.index_of(&part.bone).is_none() {
                return Err(MannequinError::MissingBone {
                    bone: part.bone.clone(),
                    referenced_by: format!("body part '{}'", part.name),
                });
            }
        }

        let mut clip_names = FxHashSet::default();
        for clip in &self.clips {
            if !clip_names.insert(clip.name.as_str()) {
                return Err(MannequinError::InvalidRig(format!(
                    "duplicate clip name '{}'",
                    clip.name
                )));
            }
            clip.validate()?;
            for track in &clip.tracks {
                if self.skeleton.index_of(&track.meta.bone_name).is_none() {
                    return Err(MannequinError::MissingBone {
                        bone: track.meta.bone_name.clone(),
                        referenced_by: format!(
                            "clip '{}' track '{}'",
                            clip.name,
                            track.target_path()
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    /// Serializes the rig and returns the binary asset.
    ///
    /// Fails with [`MannequinError::NotBinary`] when `settings` select a text
    /// variant: consumers expect a binary container at `asset_path`.
    pub fn export(&self, settings: &ExportSettings) -> Result<Vec<u8>> {
        match exporter::serialize(self, settings)? {
            SerializedAsset::Binary(bytes) => {
                log::info!("Exported '{}' ({} bytes)", settings.asset_path, bytes.len());
                Ok(bytes)
            }
            other => {
                log::error!(
                    "Export of '{}' produced {}, expected a binary buffer",
                    settings.asset_path,
                    other.kind()
                );
                Err(MannequinError::NotBinary {
                    produced: other.kind(),
                })
            }
        }
    }
}
