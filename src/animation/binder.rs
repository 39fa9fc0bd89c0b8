use crate::animation::binding::{PropertyBinding, RestValue, TargetPath};
use crate::animation::clip::AnimationClip;
use crate::scene::{NodeHandle, Scene};

pub struct Binder;

impl Binder {
    /// Resolves each track of `clip` to a node named after its bone, searched
    /// below `root_node`. The node's current transform is captured as the rest
    /// value. Tracks whose bone is missing are skipped with a warning.
    pub fn bind(scene: &Scene, root_node: NodeHandle, clip: &AnimationClip) -> Vec<PropertyBinding> {
        let mut bindings = Vec::with_capacity(clip.tracks.len());
        let mut missing: Vec<&str> = Vec::new();

        for (track_index, track) in clip.tracks.iter().enumerate() {
            let bone_name = track.meta.bone_name.as_str();
            let target = track.meta.target;

            let Some(node_handle) = scene.find_node_by_name(root_node, bone_name) else {
                if !missing.contains(&bone_name) {
                    missing.push(bone_name);
                }
                continue;
            };
            let Some(node) = scene.get_node(node_handle) else {
                continue;
            };

            let rest = match target {
                TargetPath::Translation => RestValue::Translation(node.transform.position),
                TargetPath::Rotation => RestValue::Rotation(node.transform.rotation),
            };

            bindings.push(PropertyBinding {
                track_index,
                node_handle,
                target,
                rest,
            });
        }

        if !missing.is_empty() {
            log::warn!(
                "Animation '{}': no node found for bones {:?}, tracks skipped",
                clip.name,
                missing
            );
        }

        bindings
    }
}
