use glam::{Quat, Vec3};

use crate::scene::NodeHandle;

/// Defines the bone property an animation track drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetPath {
    /// Maps to `transform.position`
    Translation,
    /// Maps to `transform.rotation`
    Rotation,
}

impl TargetPath {
    /// Property suffix used in `<boneName>.<property>` track paths.
    #[must_use]
    pub fn property_name(self) -> &'static str {
        match self {
            TargetPath::Translation => "position",
            TargetPath::Rotation => "quaternion",
        }
    }

    /// Parses a property suffix. Accepts both `quaternion` and `rotation`.
    #[must_use]
    pub fn from_property_name(name: &str) -> Option<Self> {
        match name {
            "position" | "translation" => Some(TargetPath::Translation),
            "quaternion" | "rotation" => Some(TargetPath::Rotation),
            _ => None,
        }
    }
}

/// The value a bound property had when the binding was created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RestValue {
    Translation(Vec3),
    Rotation(Quat),
}

/// Maps track `track_index` of a clip to the target property of `node_handle`.
#[derive(Debug, Clone, Copy)]
pub struct PropertyBinding {
    pub track_index: usize,
    pub node_handle: NodeHandle,
    pub target: TargetPath,
    pub rest: RestValue,
}
