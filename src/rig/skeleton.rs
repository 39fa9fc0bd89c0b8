//! Humanoid bone tree.
//!
//! Bones are stored in an arena (`Vec<Bone>`) and refer to each other by
//! index. A bone is always pushed after its parent, so iterating the arena in
//! order visits parents before children. The arena order is also the joint
//! order of the exported skin.

use glam::{Affine3A, Mat4, Vec3};
use rustc_hash::FxHashSet;

use crate::errors::{MannequinError, Result};
use crate::settings::Stylization;

/// Every bone of the canonical humanoid, in arena order.
pub const CANONICAL_BONES: [&str; 21] = [
    "Hips",
    "Spine",
    "Spine1",
    "Spine2",
    "Chest",
    "Neck",
    "Head",
    "LeftShoulder",
    "LeftArm",
    "LeftForeArm",
    "LeftHand",
    "RightShoulder",
    "RightArm",
    "RightForeArm",
    "RightHand",
    "LeftUpLeg",
    "LeftLeg",
    "LeftFoot",
    "RightUpLeg",
    "RightLeg",
    "RightFoot",
];

pub const ROOT_BONE: &str = "Hips";

#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: String,
    /// Translation relative to the parent bone (or to the rig origin for the root).
    pub offset: Vec3,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct BoneTree {
    bones: Vec<Bone>,
}

impl BoneTree {
    #[must_use]
    pub fn new() -> Self {
        Self { bones: Vec::new() }
    }

    /// Appends a bone and links it to `parent`. Returns the new bone's index.
    ///
    /// Structural checks are deferred to [`BoneTree::validate`].
    pub fn add_bone(&mut self, name: &str, offset: Vec3, parent: Option<usize>) -> usize {
        let index = self.bones.len();
        if let Some(p) = parent.and_then(|p| self.bones.get_mut(p)) {
            p.children.push(index);
        }
        self.bones.push(Bone {
            name: name.to_string(),
            offset,
            parent,
            children: Vec::new(),
        });
        index
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    #[must_use]
    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Bone> {
        self.bones.get(index)
    }

    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bones.iter().map(|b| b.name.as_str())
    }

    /// Index of the first bone without a parent.
    #[must_use]
    pub fn root(&self) -> Option<usize> {
        self.bones.iter().position(|b| b.parent.is_none())
    }

    /// Bind-pose world positions, accumulated down the parent chain.
    #[must_use]
    pub fn world_positions(&self) -> Vec<Vec3> {
        let mut out: Vec<Vec3> = Vec::with_capacity(self.bones.len());
        for bone in &self.bones {
            let base = bone
                .parent
                .and_then(|p| out.get(p).copied())
                .unwrap_or(Vec3::ZERO);
            out.push(base + bone.offset);
        }
        out
    }

    #[must_use]
    pub fn world_position(&self, index: usize) -> Option<Vec3> {
        self.world_positions().get(index).copied()
    }

    /// Inverse bind matrices in arena order. Bones carry no bind rotation,
    /// so each matrix is the inverse of the bone's world translation.
    #[must_use]
    pub fn inverse_bind_matrices(&self) -> Vec<Mat4> {
        self.world_positions()
            .into_iter()
            .map(|p| Mat4::from(Affine3A::from_translation(p).inverse()))
            .collect()
    }

    /// Checks the tree invariants: exactly one root at index 0, every parent
    /// precedes its child, parent/child links agree, and names are unique.
    pub fn validate(&self) -> Result<()> {
        if self.bones.is_empty() {
            return Err(MannequinError::InvalidRig("skeleton has no bones".into()));
        }

        let roots = self.bones.iter().filter(|b| b.parent.is_none()).count();
        if roots != 1 || self.bones[0].parent.is_some() {
            return Err(MannequinError::InvalidRig(format!(
                "skeleton must have exactly one root at index 0, found {roots}"
            )));
        }

        let mut seen = FxHashSet::default();
        for (index, bone) in self.bones.iter().enumerate() {
            if !seen.insert(bone.name.as_str()) {
                return Err(MannequinError::InvalidRig(format!(
                    "duplicate bone name '{}'",
                    bone.name
                )));
            }
            if let Some(parent) = bone.parent {
                let linked = parent < index
                    && self
                        .bones
                        .get(parent)
                        .is_some_and(|p| p.children.contains(&index));
                if !linked {
                    return Err(MannequinError::InvalidRig(format!(
                        "bone '{}' is not linked under its parent",
                        bone.name
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Derived dimensions the geometry builder needs beyond bone positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Proportions {
    /// Uniform factor applied to every reference length so the rig is
    /// exactly `body_height` tall.
    pub scale: f32,
    pub head_height: f32,
    pub limb_thickness: f32,
    pub torso_width: f32,
    pub torso_depth: f32,
    pub foot_length: f32,
    pub ankle_height: f32,
}

/// A built humanoid: the bone tree plus its derived proportions.
#[derive(Debug, Clone)]
pub struct Humanoid {
    pub tree: BoneTree,
    pub proportions: Proportions,
}

// Reference lengths of a realistic adult, before stylization and scaling.
const HIP_TO_UPLEG_DROP: f32 = 0.05;
const HIP_HALF_WIDTH: f32 = 0.09;
const UPPER_LEG: f32 = 0.42;
const LOWER_LEG: f32 = 0.42;
const ANKLE: f32 = 0.08;
const SPINE_SEGMENT: f32 = 0.10;
const CHEST: f32 = 0.12;
const NECK: f32 = 0.10;
const NECK_TO_HEAD: f32 = 0.08;
const HEAD: f32 = 0.23;
const SHOULDER_RISE: f32 = 0.08;
const SHOULDER_OFFSET: f32 = 0.06;
const CLAVICLE: f32 = 0.12;
const UPPER_ARM: f32 = 0.28;
const FOREARM: f32 = 0.26;

/// Builds the canonical humanoid in T-pose. Left is +X, up is +Y, forward is +Z.
#[must_use]
pub fn build_humanoid(style: &Stylization) -> Humanoid {
    let head = HEAD * style.head_scale;
    let upper_leg = UPPER_LEG * style.leg_length_scale;
    let lower_leg = LOWER_LEG * style.leg_length_scale;
    let upper_arm = UPPER_ARM * style.arm_length_scale;
    let forearm = FOREARM * style.arm_length_scale;

    let hip_height = HIP_TO_UPLEG_DROP + upper_leg + lower_leg + ANKLE;
    let torso = 3.0 * SPINE_SEGMENT + CHEST + NECK + NECK_TO_HEAD;
    let raw_height = hip_height + torso + head;
    let scale = if raw_height > 0.0 {
        style.body_height / raw_height
    } else {
        1.0
    };
    let s = |v: Vec3| v * scale;

    let mut tree = BoneTree::new();
    let hips = tree.add_bone("Hips", s(Vec3::new(0.0, hip_height, 0.0)), None);

    let spine = tree.add_bone("Spine", s(Vec3::Y * SPINE_SEGMENT), Some(hips));
    let spine1 = tree.add_bone("Spine1", s(Vec3::Y * SPINE_SEGMENT), Some(spine));
    let spine2 = tree.add_bone("Spine2", s(Vec3::Y * SPINE_SEGMENT), Some(spine1));
    let chest = tree.add_bone("Chest", s(Vec3::Y * CHEST), Some(spine2));
    let neck = tree.add_bone("Neck", s(Vec3::Y * NECK), Some(chest));
    tree.add_bone("Head", s(Vec3::Y * NECK_TO_HEAD), Some(neck));

    for (side, sign) in [("Left", 1.0_f32), ("Right", -1.0_f32)] {
        let shoulder = tree.add_bone(
            &format!("{side}Shoulder"),
            s(Vec3::new(sign * SHOULDER_OFFSET, SHOULDER_RISE, 0.0)),
            Some(chest),
        );
        let arm = tree.add_bone(
            &format!("{side}Arm"),
            s(Vec3::X * sign * CLAVICLE),
            Some(shoulder),
        );
        let forearm_bone = tree.add_bone(
            &format!("{side}ForeArm"),
            s(Vec3::X * sign * upper_arm),
            Some(arm),
        );
        tree.add_bone(
            &format!("{side}Hand"),
            s(Vec3::X * sign * forearm),
            Some(forearm_bone),
        );
    }

    for (side, sign) in [("Left", 1.0_f32), ("Right", -1.0_f32)] {
        let up_leg = tree.add_bone(
            &format!("{side}UpLeg"),
            s(Vec3::new(sign * HIP_HALF_WIDTH, -HIP_TO_UPLEG_DROP, 0.0)),
            Some(hips),
        );
        let leg = tree.add_bone(&format!("{side}Leg"), s(Vec3::NEG_Y * upper_leg), Some(up_leg));
        tree.add_bone(&format!("{side}Foot"), s(Vec3::NEG_Y * lower_leg), Some(leg));
    }

    let proportions = Proportions {
        scale,
        head_height: head * scale,
        limb_thickness: 0.08 * scale,
        torso_width: 2.0 * (SHOULDER_OFFSET + CLAVICLE * 0.5) * scale,
        torso_depth: 0.18 * scale,
        foot_length: 0.22 * scale,
        ankle_height: ANKLE * scale,
    };

    log::debug!(
        "Built humanoid: {} bones, scale {:.3}, head {:.3} m",
        tree.len(),
        scale,
        proportions.head_height
    );

    Humanoid { tree, proportions }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_order_matches_canonical_list() {
        let humanoid = build_humanoid(&Stylization::default());
        let names: Vec<&str> = humanoid.tree.names().collect();
        assert_eq!(names, CANONICAL_BONES);
        assert!(humanoid.tree.validate().is_ok());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut tree = BoneTree::new();
        let root = tree.add_bone("Hips", Vec3::ZERO, None);
        tree.add_bone("Spine", Vec3::Y, Some(root));
        tree.add_bone("Spine", Vec3::Y, Some(root));
        assert!(matches!(tree.validate(), Err(MannequinError::InvalidRig(_))));
    }

    #[test]
    fn second_root_is_rejected() {
        let mut tree = BoneTree::new();
        tree.add_bone("Hips", Vec3::ZERO, None);
        tree.add_bone("Stray", Vec3::ZERO, None);
        assert!(tree.validate().is_err());
    }
}
