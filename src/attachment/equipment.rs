//! Equipment item → attachment spec tables.
//!
//! Equip/unequip surfaces pass an item identifier (or nothing) and get the
//! spec back. Unknown identifiers and `None` both yield `None`.

use std::sync::LazyLock;

use glam::{Quat, Vec3};
use rustc_hash::FxHashMap;

use crate::attachment::targets::{BoneCandidates, resolve_fallbacks};
use crate::scene::Transform;

/// Local transform applied to the equipment once it is parented to its bone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttachmentOffset {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl AttachmentOffset {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    #[must_use]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// Overwrites the TRS of `transform` with this offset.
    pub fn apply_to(&self, transform: &mut Transform) {
        transform.position = self.position;
        transform.rotation = self.rotation;
        transform.scale = self.scale;
    }

    /// Reflection across the YZ plane.
    #[must_use]
    pub fn mirrored(&self) -> Self {
        Self {
            position: Vec3::new(-self.position.x, self.position.y, self.position.z),
            rotation: Quat::from_xyzw(
                self.rotation.x,
                -self.rotation.y,
                -self.rotation.z,
                self.rotation.w,
            ),
            scale: self.scale,
        }
    }
}

impl Default for AttachmentOffset {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EquipmentAttachmentSpec {
    pub asset_path: String,
    /// Canonical attachment point or bone name.
    pub attachment_node: String,
    /// Explicit fallbacks. Empty means "ask the target registry".
    pub fallback_nodes: Vec<String>,
    pub offset: AttachmentOffset,
}

impl EquipmentAttachmentSpec {
    #[must_use]
    pub fn new(asset_path: &str, attachment_node: &str) -> Self {
        Self {
            asset_path: asset_path.to_string(),
            attachment_node: attachment_node.to_string(),
            fallback_nodes: Vec::new(),
            offset: AttachmentOffset::IDENTITY,
        }
    }

    #[must_use]
    pub fn with_fallbacks(mut self, fallbacks: &[&str]) -> Self {
        self.fallback_nodes = fallbacks.iter().map(ToString::to_string).collect();
        self
    }

    #[must_use]
    pub fn with_offset(mut self, offset: AttachmentOffset) -> Self {
        self.offset = offset;
        self
    }

    /// Bone names the resolver tries, in order.
    #[must_use]
    pub fn candidates(&self) -> BoneCandidates {
        if self.fallback_nodes.is_empty() {
            return resolve_fallbacks(&self.attachment_node);
        }
        std::iter::once(&self.attachment_node)
            .chain(&self.fallback_nodes)
            .cloned()
            .collect()
    }

    /// The same item worn on the other side of the body.
    #[must_use]
    pub fn mirrored(&self) -> Self {
        Self {
            asset_path: self.asset_path.clone(),
            attachment_node: mirror_name(&self.attachment_node),
            fallback_nodes: self.fallback_nodes.iter().map(|n| mirror_name(n)).collect(),
            offset: self.offset.mirrored(),
        }
    }
}

/// Swaps the side marker of a bone name (`Left`/`Right`, `_l`/`_r`, `.L`/`.R`).
#[must_use]
pub fn mirror_name(name: &str) -> String {
    if name.contains("Left") {
        return name.replace("Left", "Right");
    }
    if name.contains("Right") {
        return name.replace("Right", "Left");
    }
    for (from, to) in [("_l", "_r"), ("_r", "_l"), (".L", ".R"), (".R", ".L")] {
        if let Some(stem) = name.strip_suffix(from) {
            return format!("{stem}{to}");
        }
    }
    if let Some(rest) = name.strip_prefix("l_") {
        return format!("r_{rest}");
    }
    if let Some(rest) = name.strip_prefix("r_") {
        return format!("l_{rest}");
    }
    name.to_string()
}

static SHOES: LazyLock<FxHashMap<&'static str, EquipmentAttachmentSpec>> = LazyLock::new(|| {
    let mut table = FxHashMap::default();
    table.insert(
        "sneaker-basic",
        EquipmentAttachmentSpec::new("models/equipment/shoes/sneaker_basic.glb", "LeftFoot")
            .with_offset(AttachmentOffset::from_position(Vec3::new(0.0, -0.02, 0.03))),
    );
    table.insert(
        "boot-leather",
        EquipmentAttachmentSpec::new("models/equipment/shoes/boot_leather.glb", "LeftFoot")
            .with_offset(AttachmentOffset {
                position: Vec3::new(0.0, 0.0, 0.02),
                rotation: Quat::IDENTITY,
                scale: Vec3::splat(1.05),
            }),
    );
    table.insert(
        "sandal-summer",
        EquipmentAttachmentSpec::new("models/equipment/shoes/sandal_summer.glb", "LeftFoot")
            .with_fallbacks(&["mixamorig:LeftFoot", "LeftAnkle"])
            .with_offset(AttachmentOffset::from_position(Vec3::new(0.0, -0.03, 0.03))),
    );
    table
});

static ACCESSORIES: LazyLock<FxHashMap<&'static str, EquipmentAttachmentSpec>> =
    LazyLock::new(|| {
        let mut table = FxHashMap::default();
        table.insert(
            "cap-baseball",
            EquipmentAttachmentSpec::new("models/equipment/accessories/cap_baseball.glb", "Head")
                .with_offset(AttachmentOffset::from_position(Vec3::new(0.0, 0.2, 0.0))),
        );
        table.insert(
            "glasses-round",
            EquipmentAttachmentSpec::new("models/equipment/accessories/glasses_round.glb", "Head")
                .with_offset(AttachmentOffset::from_position(Vec3::new(0.0, 0.1, 0.1))),
        );
        table.insert(
            "backpack-small",
            EquipmentAttachmentSpec::new("models/equipment/accessories/backpack_small.glb", "Back")
                .with_offset(AttachmentOffset {
                    position: Vec3::new(0.0, 0.0, -0.12),
                    rotation: Quat::from_rotation_y(std::f32::consts::PI),
                    scale: Vec3::ONE,
                }),
        );
        table.insert(
            "watch-sport",
            EquipmentAttachmentSpec::new("models/equipment/accessories/watch_sport.glb", "LeftHand")
                .with_offset(AttachmentOffset::from_position(Vec3::new(-0.03, 0.0, 0.0))),
        );
        table.insert(
            "belt-utility",
            EquipmentAttachmentSpec::new("models/equipment/accessories/belt_utility.glb", "Hips"),
        );
        table.insert(
            "scarf-wool",
            EquipmentAttachmentSpec::new("models/equipment/accessories/scarf_wool.glb", "Neck"),
        );
        table
    });

#[must_use]
pub fn shoe_attachment(item_id: Option<&str>) -> Option<&'static EquipmentAttachmentSpec> {
    SHOES.get(item_id?)
}

#[must_use]
pub fn accessory_attachment(item_id: Option<&str>) -> Option<&'static EquipmentAttachmentSpec> {
    ACCESSORIES.get(item_id?)
}

/// Looks an item up in every equipment table.
#[must_use]
pub fn equipment_attachment(item_id: Option<&str>) -> Option<&'static EquipmentAttachmentSpec> {
    shoe_attachment(item_id).or_else(|| accessory_attachment(item_id))
}

pub fn shoe_ids() -> impl Iterator<Item = &'static str> {
    SHOES.keys().copied()
}

pub fn accessory_ids() -> impl Iterator<Item = &'static str> {
    ACCESSORIES.keys().copied()
}
