//! Equipment attachment: target registry, item tables and the runtime resolver.

pub mod equipment;
pub mod resolver;
pub mod targets;

pub use equipment::{
    AttachmentOffset, EquipmentAttachmentSpec, accessory_attachment, equipment_attachment,
    mirror_name, shoe_attachment,
};
pub use resolver::{AttachmentResolver, AttachmentState, ResolveOutcome};
pub use targets::{
    ATTACHMENT_TARGETS, AttachmentCategory, AttachmentTarget, BoneCandidates, attachment_target,
    resolve_fallbacks,
};
