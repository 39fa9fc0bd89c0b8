//! Keyframe animation: clips, playback actions and the blending mixer.

pub mod action;
pub mod binder;
pub mod binding;
pub mod clip;
pub mod mixer;
pub mod tracks;
mod values;

pub use action::{AnimationAction, LoopMode, TrackValue};
pub use binder::Binder;
pub use binding::{PropertyBinding, RestValue, TargetPath};
pub use clip::{AnimationClip, Track, TrackData, TrackMeta};
pub use mixer::AnimationMixer;
pub use tracks::{InterpolationMode, KeyframeCursor, KeyframeTrack};
pub use values::Interpolatable;
