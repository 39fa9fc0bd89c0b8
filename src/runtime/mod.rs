//! Frame-driven runtime host.
//!
//! - [`timer`]: accumulated-time timers with cancellation tokens
//! - [`behaviors`]: named behavior factories (`bone-attachment`, `avatar-animation`)
//! - [`controller`]: stance playback with cross-fades
//! - [`world`]: avatars, equipment and the per-frame `tick`

pub mod behaviors;
pub mod controller;
pub mod timer;
pub mod world;

pub use behaviors::{
    AVATAR_ANIMATION, AvatarAnimationProps, BONE_ATTACHMENT, BehaviorConfig, BehaviorFactory,
    BehaviorRegistry, BoneAttachmentProps, register_builtin_behaviors,
};
pub use controller::AnimationPlaybackController;
pub use timer::{CancellationToken, TimerId, TimerQueue};
pub use world::{Avatar, AvatarKey, AvatarWorld, BehaviorHandle, Equipment, EquipmentKey};
