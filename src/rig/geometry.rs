//! Low-poly body surface with rigid skinning.
//!
//! Every body part is an independent box. All vertices of a part are bound to
//! exactly one bone with weight 1; the remaining three influence slots are 0.

use glam::Vec3;

use crate::errors::{MannequinError, Result};
use crate::rig::skeleton::Humanoid;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkinnedVertex {
    pub position: Vec3,
    pub normal: Vec3,
    /// Indices into the bone arena (== skin joint order).
    pub joints: [u16; 4],
    pub weights: [f32; 4],
}

/// One box of the body and the bone that owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyPart {
    pub name: String,
    pub bone: String,
    pub first_vertex: usize,
    pub vertex_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SkinnedMesh {
    pub vertices: Vec<SkinnedVertex>,
    pub indices: Vec<u16>,
    pub parts: Vec<BodyPart>,
}

impl SkinnedMesh {
    /// Axis-aligned bounds of all vertex positions.
    #[must_use]
    pub fn bounds(&self) -> (Vec3, Vec3) {
        self.vertices.iter().fold(
            (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
            |(min, max), v| (min.min(v.position), max.max(v.position)),
        )
    }

    #[must_use]
    pub fn part(&self, name: &str) -> Option<&BodyPart> {
        self.parts.iter().find(|p| p.name == name)
    }

    /// Appends a box centred at `center` and rigidly bound to `joint`.
    fn push_box(&mut self, part: &str, bone: &str, joint: u16, center: Vec3, size: Vec3) {
        let h = size * 0.5;
        let base = self.vertices.len();

        // 4 vertices per face, counter-clockwise seen from outside.
        let faces: [(Vec3, [Vec3; 4]); 6] = [
            (
                Vec3::Z,
                [
                    Vec3::new(-h.x, -h.y, h.z),
                    Vec3::new(h.x, -h.y, h.z),
                    Vec3::new(h.x, h.y, h.z),
                    Vec3::new(-h.x, h.y, h.z),
                ],
            ),
            (
                Vec3::NEG_Z,
                [
                    Vec3::new(-h.x, -h.y, -h.z),
                    Vec3::new(-h.x, h.y, -h.z),
                    Vec3::new(h.x, h.y, -h.z),
                    Vec3::new(h.x, -h.y, -h.z),
                ],
            ),
            (
                Vec3::Y,
                [
                    Vec3::new(-h.x, h.y, -h.z),
                    Vec3::new(-h.x, h.y, h.z),
                    Vec3::new(h.x, h.y, h.z),
                    Vec3::new(h.x, h.y, -h.z),
                ],
            ),
            (
                Vec3::NEG_Y,
                [
                    Vec3::new(-h.x, -h.y, -h.z),
                    Vec3::new(h.x, -h.y, -h.z),
                    Vec3::new(h.x, -h.y, h.z),
                    Vec3::new(-h.x, -h.y, h.z),
                ],
            ),
            (
                Vec3::X,
                [
                    Vec3::new(h.x, -h.y, -h.z),
                    Vec3::new(h.x, h.y, -h.z),
                    Vec3::new(h.x, h.y, h.z),
                    Vec3::new(h.x, -h.y, h.z),
                ],
            ),
            (
                Vec3::NEG_X,
                [
                    Vec3::new(-h.x, -h.y, -h.z),
                    Vec3::new(-h.x, -h.y, h.z),
                    Vec3::new(-h.x, h.y, h.z),
                    Vec3::new(-h.x, h.y, -h.z),
                ],
            ),
        ];

        for (normal, corners) in faces {
            for corner in corners {
                self.vertices.push(SkinnedVertex {
                    position: center + corner,
                    normal,
                    joints: [joint, 0, 0, 0],
                    weights: [1.0, 0.0, 0.0, 0.0],
                });
            }
        }

        for face in 0..6 {
            let b = (base + face * 4) as u16;
            self.indices
                .extend_from_slice(&[b, b + 1, b + 2, b, b + 2, b + 3]);
        }

        self.parts.push(BodyPart {
            name: part.to_string(),
            bone: bone.to_string(),
            first_vertex: base,
            vertex_count: 24,
        });
    }
}

/// Box spanning the axis-aligned segment `a..b`, padded to `thickness` on the
/// other axes.
fn segment_box(a: Vec3, b: Vec3, thickness: f32) -> (Vec3, Vec3) {
    let center = (a + b) * 0.5;
    let size = (b - a).abs().max(Vec3::splat(thickness));
    (center, size)
}

/// Which bone owns each body part.
pub const PART_BONES: [(&str, &str); 14] = [
    ("head", "Head"),
    ("torso", "Chest"),
    ("left_upper_arm", "LeftArm"),
    ("left_forearm", "LeftForeArm"),
    ("right_upper_arm", "RightArm"),
    ("right_forearm", "RightForeArm"),
    ("left_upper_leg", "Hips"),
    ("left_lower_leg", "LeftLeg"),
    ("right_upper_leg", "Hips"),
    ("right_lower_leg", "RightLeg"),
    ("left_foot", "LeftFoot"),
    ("right_foot", "RightFoot"),
    ("left_hand", "LeftHand"),
    ("right_hand", "RightHand"),
];

/// Builds the body mesh for `humanoid`, binding each part to its owner bone.
pub fn build_body(humanoid: &Humanoid) -> Result<SkinnedMesh> {
    let tree = &humanoid.tree;
    let p = &humanoid.proportions;
    let world = tree.world_positions();

    let lookup = |name: &str, part: &str| -> Result<(u16, Vec3)> {
        let index = tree.index_of(name).ok_or_else(|| MannequinError::MissingBone {
            bone: name.to_string(),
            referenced_by: format!("body part '{part}'"),
        })?;
        Ok((index as u16, world[index]))
    };

    let mut mesh = SkinnedMesh::default();

    // Head: a cube sitting on the head bone.
    let (head, head_pos) = lookup("Head", "head")?;
    mesh.push_box(
        "head",
        "Head",
        head,
        head_pos + Vec3::Y * (p.head_height * 0.5),
        Vec3::new(p.head_height * 0.9, p.head_height, p.head_height * 0.9),
    );

    // Torso: hips up to the neck.
    let (chest, _) = lookup("Chest", "torso")?;
    let (_, hips_pos) = lookup("Hips", "torso")?;
    let (_, neck_pos) = lookup("Neck", "torso")?;
    let torso_height = neck_pos.y - hips_pos.y;
    mesh.push_box(
        "torso",
        "Chest",
        chest,
        Vec3::new(hips_pos.x, hips_pos.y + torso_height * 0.5, hips_pos.z),
        Vec3::new(p.torso_width, torso_height, p.torso_depth),
    );

    for (side, prefix) in [("left", "Left"), ("right", "Right")] {
        let upper_part = format!("{side}_upper_arm");
        let fore_part = format!("{side}_forearm");
        let hand_part = format!("{side}_hand");
        let upper_leg_part = format!("{side}_upper_leg");
        let lower_leg_part = format!("{side}_lower_leg");
        let foot_part = format!("{side}_foot");

        let arm_name = format!("{prefix}Arm");
        let forearm_name = format!("{prefix}ForeArm");
        let (arm, arm_pos) = lookup(&arm_name, &upper_part)?;
        let (forearm, forearm_pos) = lookup(&forearm_name, &fore_part)?;
        let hand_name = format!("{prefix}Hand");
        let (hand, hand_pos) = lookup(&hand_name, &hand_part)?;

        let (c, s) = segment_box(arm_pos, forearm_pos, p.limb_thickness);
        mesh.push_box(&upper_part, &arm_name, arm, c, s);
        let (c, s) = segment_box(forearm_pos, hand_pos, p.limb_thickness * 0.9);
        mesh.push_box(&fore_part, &forearm_name, forearm, c, s);

        // No finger rig: the whole hand box rides on the hand bone.
        let reach = (hand_pos - forearm_pos).normalize_or_zero() * p.limb_thickness;
        let (c, s) = segment_box(hand_pos, hand_pos + reach, p.limb_thickness);
        mesh.push_box(&hand_part, &hand_name, hand, c, s);

        // Upper legs follow the hips, lower legs follow their own leg bone.
        let (hips, _) = lookup("Hips", &upper_leg_part)?;
        let (_, up_leg_pos) = lookup(&format!("{prefix}UpLeg"), &upper_leg_part)?;
        let leg_name = format!("{prefix}Leg");
        let (leg, leg_pos) = lookup(&leg_name, &lower_leg_part)?;
        let foot_name = format!("{prefix}Foot");
        let (foot, foot_pos) = lookup(&foot_name, &foot_part)?;

        let (c, s) = segment_box(up_leg_pos, leg_pos, p.limb_thickness * 1.2);
        mesh.push_box(&upper_leg_part, "Hips", hips, c, s);
        let (c, s) = segment_box(leg_pos, foot_pos, p.limb_thickness);
        mesh.push_box(&lower_leg_part, &leg_name, leg, c, s);

        let foot_center = Vec3::new(
            foot_pos.x,
            foot_pos.y - p.ankle_height * 0.5,
            foot_pos.z + p.foot_length * 0.3,
        );
        let foot_size = Vec3::new(p.limb_thickness * 1.1, p.ankle_height, p.foot_length);
        mesh.push_box(&foot_part, &foot_name, foot, foot_center, foot_size);
    }

    log::debug!(
        "Built body mesh: {} parts, {} vertices, {} indices",
        mesh.parts.len(),
        mesh.vertices.len(),
        mesh.indices.len()
    );

    Ok(mesh)
}
