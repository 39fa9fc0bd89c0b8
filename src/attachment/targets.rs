//! Attachment target registry.
//!
//! Maps canonical attachment points (`"LeftFoot"`, `"Back"`, ...) to the bone
//! that normally carries them plus the synonyms other rigging conventions use
//! for the same bone (Mixamo, Unreal, Blender `.L/.R`, ...). The table is
//! built once and never mutated.

use std::sync::LazyLock;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Ordered bone names to try: primary first, then fallbacks.
pub type BoneCandidates = SmallVec<[String; 6]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentCategory {
    Feet,
    Legs,
    Torso,
    Hands,
    Head,
    Back,
}

impl AttachmentCategory {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AttachmentCategory::Feet => "feet",
            AttachmentCategory::Legs => "legs",
            AttachmentCategory::Torso => "torso",
            AttachmentCategory::Hands => "hands",
            AttachmentCategory::Head => "head",
            AttachmentCategory::Back => "back",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentTarget {
    pub name: &'static str,
    pub category: AttachmentCategory,
    pub primary: &'static str,
    pub fallbacks: &'static [&'static str],
    pub description: &'static str,
}

impl AttachmentTarget {
    /// `[primary, ...fallbacks]`.
    pub fn candidates(&self) -> impl Iterator<Item = &'static str> {
        std::iter::once(self.primary).chain(self.fallbacks.iter().copied())
    }
}

pub static ATTACHMENT_TARGETS: [AttachmentTarget; 14] = [
    AttachmentTarget {
        name: "LeftFoot",
        category: AttachmentCategory::Feet,
        primary: "LeftFoot",
        fallbacks: &["mixamorig:LeftFoot", "foot_l", "Foot.L", "LeftAnkle", "l_foot"],
        description: "Left ankle; shoes and anklets",
    },
    AttachmentTarget {
        name: "RightFoot",
        category: AttachmentCategory::Feet,
        primary: "RightFoot",
        fallbacks: &["mixamorig:RightFoot", "foot_r", "Foot.R", "RightAnkle", "r_foot"],
        description: "Right ankle; shoes and anklets",
    },
    AttachmentTarget {
        name: "LeftLeg",
        category: AttachmentCategory::Legs,
        primary: "LeftLeg",
        fallbacks: &["mixamorig:LeftLeg", "calf_l", "Shin.L", "LeftKnee"],
        description: "Left shin; knee pads and leg wraps",
    },
    AttachmentTarget {
        name: "RightLeg",
        category: AttachmentCategory::Legs,
        primary: "RightLeg",
        fallbacks: &["mixamorig:RightLeg", "calf_r", "Shin.R", "RightKnee"],
        description: "Right shin; knee pads and leg wraps",
    },
    AttachmentTarget {
        name: "LeftUpLeg",
        category: AttachmentCategory::Legs,
        primary: "LeftUpLeg",
        fallbacks: &["mixamorig:LeftUpLeg", "thigh_l", "Thigh.L", "LeftThigh"],
        description: "Left thigh; holsters",
    },
    AttachmentTarget {
        name: "RightUpLeg",
        category: AttachmentCategory::Legs,
        primary: "RightUpLeg",
        fallbacks: &["mixamorig:RightUpLeg", "thigh_r", "Thigh.R", "RightThigh"],
        description: "Right thigh; holsters",
    },
    AttachmentTarget {
        name: "Hips",
        category: AttachmentCategory::Torso,
        primary: "Hips",
        fallbacks: &["mixamorig:Hips", "pelvis", "Pelvis", "Root"],
        description: "Pelvis; belts",
    },
    AttachmentTarget {
        name: "Spine",
        category: AttachmentCategory::Torso,
        primary: "Spine",
        fallbacks: &["mixamorig:Spine", "spine_01", "Spine.001"],
        description: "Lower back",
    },
    AttachmentTarget {
        name: "Chest",
        category: AttachmentCategory::Torso,
        primary: "Chest",
        fallbacks: &["mixamorig:Spine2", "Spine2", "spine_03", "UpperChest"],
        description: "Upper torso; necklaces and badges",
    },
    AttachmentTarget {
        name: "LeftHand",
        category: AttachmentCategory::Hands,
        primary: "LeftHand",
        fallbacks: &["mixamorig:LeftHand", "hand_l", "Hand.L", "LeftWrist"],
        description: "Left wrist; watches and held items",
    },
    AttachmentTarget {
        name: "RightHand",
        category: AttachmentCategory::Hands,
        primary: "RightHand",
        fallbacks: &["mixamorig:RightHand", "hand_r", "Hand.R", "RightWrist"],
        description: "Right wrist; watches and held items",
    },
    AttachmentTarget {
        name: "Head",
        category: AttachmentCategory::Head,
        primary: "Head",
        fallbacks: &["mixamorig:Head", "head", "Head.001"],
        description: "Skull; hats and glasses",
    },
    AttachmentTarget {
        name: "Neck",
        category: AttachmentCategory::Head,
        primary: "Neck",
        fallbacks: &["mixamorig:Neck", "neck_01", "Neck.001"],
        description: "Neck; scarves",
    },
    AttachmentTarget {
        name: "Back",
        category: AttachmentCategory::Back,
        primary: "Spine2",
        fallbacks: &["mixamorig:Spine2", "Chest", "spine_03", "Spine1"],
        description: "Between the shoulder blades; backpacks and capes",
    },
];

static TARGET_INDEX: LazyLock<FxHashMap<&'static str, &'static AttachmentTarget>> =
    LazyLock::new(|| ATTACHMENT_TARGETS.iter().map(|t| (t.name, t)).collect());

#[must_use]
pub fn attachment_target(name: &str) -> Option<&'static AttachmentTarget> {
    TARGET_INDEX.get(name).copied()
}

/// Candidate bone names for a canonical target, primary first.
///
/// Unknown names degrade to an exact match on the name itself.
#[must_use]
pub fn resolve_fallbacks(name: &str) -> BoneCandidates {
    match attachment_target(name) {
        Some(target) => target.candidates().map(ToString::to_string).collect(),
        None => {
            log::debug!("No attachment target '{name}', matching it literally");
            smallvec::smallvec![name.to_string()]
        }
    }
}
