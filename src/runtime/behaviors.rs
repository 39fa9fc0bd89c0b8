//! Named behavior factories.
//!
//! Hosts attach behaviors to entities by name with a JSON property bag. The
//! registration code may run more than once, so registering a taken name is
//! a no-op rather than an error.

use glam::{Quat, Vec3};
use rustc_hash::FxHashMap;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::attachment::{AttachmentOffset, EquipmentAttachmentSpec};
use crate::errors::{MannequinError, Result};

pub const BONE_ATTACHMENT: &str = "bone-attachment";
pub const AVATAR_ANIMATION: &str = "avatar-animation";

/// Properties of the `bone-attachment` behavior.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoneAttachmentProps {
    pub target_bone: String,
    #[serde(default)]
    pub fallback_bones: Vec<String>,
    #[serde(default)]
    pub asset_path: Option<String>,
    #[serde(default)]
    pub position: Option<[f32; 3]>,
    /// Quaternion `[x, y, z, w]`.
    #[serde(default)]
    pub rotation: Option<[f32; 4]>,
    #[serde(default)]
    pub scale: Option<[f32; 3]>,
}

impl BoneAttachmentProps {
    #[must_use]
    pub fn to_spec(&self) -> EquipmentAttachmentSpec {
        let offset = AttachmentOffset {
            position: self.position.map_or(Vec3::ZERO, Vec3::from_array),
            rotation: self
                .rotation
                .map_or(Quat::IDENTITY, |r| Quat::from_array(r).normalize()),
            scale: self.scale.map_or(Vec3::ONE, Vec3::from_array),
        };
        EquipmentAttachmentSpec {
            asset_path: self.asset_path.clone().unwrap_or_default(),
            attachment_node: self.target_bone.clone(),
            fallback_nodes: self.fallback_bones.clone(),
            offset,
        }
    }
}

/// Properties of the `avatar-animation` behavior. Unset fields fall back to
/// [`RuntimeSettings`](crate::settings::RuntimeSettings).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarAnimationProps {
    #[serde(default)]
    pub initial_stance: Option<String>,
    #[serde(default)]
    pub crossfade_duration: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BehaviorConfig {
    BoneAttachment(BoneAttachmentProps),
    AvatarAnimation(AvatarAnimationProps),
}

pub type BehaviorFactory = fn(&serde_json::Value) -> Result<BehaviorConfig>;

fn parse_props<T: DeserializeOwned>(behavior: &str, props: &serde_json::Value) -> Result<T> {
    let value = if props.is_null() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        props.clone()
    };
    serde_json::from_value(value).map_err(|e| MannequinError::InvalidBehaviorProps {
        behavior: behavior.to_string(),
        reason: e.to_string(),
    })
}

fn bone_attachment_factory(props: &serde_json::Value) -> Result<BehaviorConfig> {
    parse_props(BONE_ATTACHMENT, props).map(BehaviorConfig::BoneAttachment)
}

fn avatar_animation_factory(props: &serde_json::Value) -> Result<BehaviorConfig> {
    parse_props(AVATAR_ANIMATION, props).map(BehaviorConfig::AvatarAnimation)
}

#[derive(Debug, Default)]
pub struct BehaviorRegistry {
    factories: FxHashMap<String, BehaviorFactory>,
}

impl BehaviorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` under `name`. Returns false, leaving the existing
    /// entry untouched, if the name is taken.
    pub fn register(&mut self, name: &str, factory: BehaviorFactory) -> bool {
        if self.factories.contains_key(name) {
            log::debug!("Behavior '{name}' already registered");
            return false;
        }
        self.factories.insert(name.to_string(), factory);
        true
    }

    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Parses `props` with the factory registered under `name`.
    pub fn create(&self, name: &str, props: &serde_json::Value) -> Result<BehaviorConfig> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| MannequinError::UnknownBehavior(name.to_string()))?;
        factory(props)
    }
}

/// Registers the built-in behaviors. Returns how many were newly added.
pub fn register_builtin_behaviors(registry: &mut BehaviorRegistry) -> usize {
    let added = [
        registry.register(BONE_ATTACHMENT, bone_attachment_factory),
        registry.register(AVATAR_ANIMATION, avatar_animation_factory),
    ];
    added.into_iter().filter(|&a| a).count()
}
