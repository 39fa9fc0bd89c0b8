//! Scene Graph Module
//!
//! CPU-side scene hierarchy that hosts loaded avatars and equipment:
//! - [`Node`]: hierarchy and transform
//! - [`Transform`]: position, rotation, scale with cached matrices
//! - [`Scene`]: node arena plus name/skin component maps
//! - [`Skeleton`]: bone handles and inverse bind matrices
//! - `transform_system`: world-matrix propagation

pub mod node;
pub mod scene;
pub mod skeleton;
pub mod transform;
pub mod transform_system;

pub use node::Node;
pub use scene::Scene;
pub use skeleton::{Skeleton, SkinBinding};
pub use transform::Transform;

use slotmap::new_key_type;

new_key_type! {
    pub struct NodeHandle;
    pub struct SkeletonKey;
}
