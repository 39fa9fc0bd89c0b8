#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod animation;
pub mod assets;
pub mod attachment;
pub mod errors;
pub mod rig;
pub mod runtime;
pub mod scene;
pub mod settings;

pub use animation::{AnimationAction, AnimationClip, AnimationMixer, Binder, LoopMode};
pub use assets::{AvatarLoader, LoadedModel, SerializedAsset};
pub use attachment::{
    AttachmentResolver, AttachmentState, EquipmentAttachmentSpec, ResolveOutcome,
    accessory_attachment, equipment_attachment, resolve_fallbacks, shoe_attachment,
};
pub use errors::{MannequinError, Result};
pub use rig::AvatarRig;
pub use runtime::{AnimationPlaybackController, AvatarWorld};
pub use scene::{Node, NodeHandle, Scene};
pub use settings::{AssetFormat, ExportSettings, MannequinSettings, RigSettings, RuntimeSettings};
