pub mod exporter;
pub mod loader;

pub use exporter::{MESH_NODE_NAME, SKIN_NAME, SerializedAsset};
pub use loader::{AvatarLoader, LoadedModel};
