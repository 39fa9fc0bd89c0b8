use base64::Engine as _;
use glam::{Affine3A, Mat4, Quat, Vec3};
use rustc_hash::FxHashSet;

use crate::animation::tracks::{InterpolationMode, KeyframeTrack};
use crate::animation::{AnimationClip, TargetPath, Track, TrackData, TrackMeta};
use crate::errors::{MannequinError, Result};
use crate::scene::{NodeHandle, Scene, SkeletonKey};
use crate::scene::skeleton::Skeleton;

/// What a model load added to the scene.
#[derive(Debug, Clone)]
pub struct LoadedModel {
    /// Container node holding the model's scene roots.
    pub root: NodeHandle,
    pub skeletons: Vec<SkeletonKey>,
    pub clips: Vec<AnimationClip>,
}

/// Instantiates glTF / GLB avatars into a [`Scene`].
pub struct AvatarLoader<'a> {
    scene: &'a mut Scene,
    node_mapping: Vec<NodeHandle>,
}

impl<'a> AvatarLoader<'a> {
    /// Loads a GLB container, or a `.gltf` document whose buffers are data URIs.
    pub fn load_slice(
        bytes: &[u8],
        scene: &'a mut Scene,
        parent: Option<NodeHandle>,
    ) -> Result<LoadedModel> {
        let gltf = gltf::Gltf::from_slice(bytes)?;
        let buffers = Self::load_buffers(&gltf)?;

        let mut loader = Self {
            scene,
            node_mapping: Vec::with_capacity(gltf.nodes().count()),
        };

        // Step 1: every node with name and TRS
        for node in gltf.nodes() {
            let handle = loader.create_node_shallow(&node);
            loader.node_mapping.push(handle);
        }

        // Step 2: hierarchy
        let root_handle = loader.scene.create_node_with_name("gltf_root");
        match parent {
            Some(parent) => {
                loader.scene.attach(root_handle, parent);
            }
            None => loader.scene.root_nodes.push(root_handle),
        }

        for node in gltf.nodes() {
            let parent_handle = loader.mapped(node.index())?;
            for child in node.children() {
                let child_handle = loader.mapped(child.index())?;
                loader.scene.attach(child_handle, parent_handle);
            }
        }

        if let Some(default_scene) = gltf.default_scene().or_else(|| gltf.scenes().next()) {
            for node in default_scene.nodes() {
                let node_handle = loader.mapped(node.index())?;
                loader.scene.attach(node_handle, root_handle);
            }
        }

        // Step 3: skins, now that every joint node exists
        let skeletons = loader.load_skins(&gltf, &buffers)?;

        // Step 4: bind skins to their mesh nodes
        for node in gltf.nodes() {
            if let Some(skin) = node.skin() {
                let key = *skeletons.get(skin.index()).ok_or_else(|| {
                    MannequinError::AssetIndexOutOfBounds {
                        context: "skin".to_string(),
                        index: skin.index(),
                    }
                })?;
                let handle = loader.mapped(node.index())?;
                loader.scene.bind_skeleton(handle, key);
            }
        }

        // Step 5: animations
        let clips = Self::load_animations(&gltf, &buffers)?;

        loader.scene.update_subtree(root_handle);

        log::debug!(
            "Loaded model: {} nodes, {} skins, {} clips",
            loader.node_mapping.len(),
            skeletons.len(),
            clips.len()
        );

        Ok(LoadedModel {
            root: root_handle,
            skeletons,
            clips,
        })
    }

    fn mapped(&self, index: usize) -> Result<NodeHandle> {
        self.node_mapping
            .get(index)
            .copied()
            .ok_or_else(|| MannequinError::AssetIndexOutOfBounds {
                context: "node".to_string(),
                index,
            })
    }

    fn load_buffers(gltf: &gltf::Gltf) -> Result<Vec<Vec<u8>>> {
        let mut buffer_data = Vec::new();
        for buffer in gltf.buffers() {
            match buffer.source() {
                gltf::buffer::Source::Bin => {
                    let blob = gltf.blob.as_deref().ok_or_else(|| {
                        MannequinError::GltfError("Missing GLB binary chunk".to_string())
                    })?;
                    buffer_data.push(blob.to_vec());
                }
                gltf::buffer::Source::Uri(uri) => {
                    buffer_data.push(decode_data_uri(uri)?);
                }
            }
        }
        Ok(buffer_data)
    }

    fn create_node_shallow(&mut self, node: &gltf::Node) -> NodeHandle {
        let node_name = node
            .name()
            .map_or_else(|| format!("Node_{}", node.index()), ToString::to_string);
        let handle = self.scene.create_node_with_name(&node_name);

        if let Some(scene_node) = self.scene.get_node_mut(handle) {
            let (t, r, s) = node.transform().decomposed();
            scene_node.transform.position = Vec3::from_array(t);
            scene_node.transform.rotation = Quat::from_array(r);
            scene_node.transform.scale = Vec3::from_array(s);
        }
        handle
    }

    fn load_skins(&mut self, gltf: &gltf::Gltf, buffers: &[Vec<u8>]) -> Result<Vec<SkeletonKey>> {
        let mut skeleton_keys = Vec::new();

        for skin in gltf.skins() {
            let name = skin.name().unwrap_or("Skeleton");

            let reader = skin.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));
            let ibms: Vec<Affine3A> = if let Some(iter) = reader.read_inverse_bind_matrices() {
                iter.map(|m| Affine3A::from_mat4(Mat4::from_cols_array_2d(&m)))
                    .collect()
            } else {
                vec![Affine3A::IDENTITY; skin.joints().count()]
            };

            let joints: Vec<gltf::Node> = skin.joints().collect();
            let bones = joints
                .iter()
                .map(|node| self.mapped(node.index()))
                .collect::<Result<Vec<_>>>()?;

            // Root bone: explicit `skeleton`, else the first joint whose parent
            // is not itself a joint.
            let joint_indices: FxHashSet<usize> = joints.iter().map(gltf::Node::index).collect();
            let child_joints: FxHashSet<usize> = joints
                .iter()
                .flat_map(gltf::Node::children)
                .map(|c| c.index())
                .filter(|i| joint_indices.contains(i))
                .collect();

            let root_bone_index = skin
                .skeleton()
                .and_then(|root| joints.iter().position(|n| n.index() == root.index()))
                .or_else(|| {
                    joints
                        .iter()
                        .position(|n| !child_joints.contains(&n.index()))
                })
                .unwrap_or(0);

            let skeleton = Skeleton::new(name, bones, ibms, root_bone_index);
            skeleton_keys.push(self.scene.add_skeleton(skeleton));
        }

        Ok(skeleton_keys)
    }

    fn load_animations(gltf: &gltf::Gltf, buffers: &[Vec<u8>]) -> Result<Vec<AnimationClip>> {
        let mut animations = Vec::new();

        for anim in gltf.animations() {
            let mut tracks = Vec::new();

            for channel in anim.channels() {
                let reader =
                    channel.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));
                let target = channel.target();
                let gltf_node = target.node();
                let bone_name = gltf_node
                    .name()
                    .map_or_else(|| format!("Node_{}", gltf_node.index()), ToString::to_string);

                let Some(inputs) = reader.read_inputs() else {
                    continue;
                };
                let times: Vec<f32> = inputs.collect();

                let interpolation = match channel.sampler().interpolation() {
                    gltf::animation::Interpolation::Step => InterpolationMode::Step,
                    gltf::animation::Interpolation::Linear => InterpolationMode::Linear,
                    gltf::animation::Interpolation::CubicSpline => {
                        log::warn!(
                            "Animation '{}': cubic spline on '{bone_name}' sampled as linear",
                            anim.name().unwrap_or("anim")
                        );
                        InterpolationMode::Linear
                    }
                };

                let track = match (target.property(), reader.read_outputs()) {
                    (
                        gltf::animation::Property::Translation,
                        Some(gltf::animation::util::ReadOutputs::Translations(iter)),
                    ) => Track {
                        meta: TrackMeta {
                            bone_name,
                            target: TargetPath::Translation,
                        },
                        data: TrackData::Vector3(KeyframeTrack::new(
                            times,
                            iter.map(Vec3::from_array).collect(),
                            interpolation,
                        )),
                    },
                    (
                        gltf::animation::Property::Rotation,
                        Some(gltf::animation::util::ReadOutputs::Rotations(iter)),
                    ) => Track {
                        meta: TrackMeta {
                            bone_name,
                            target: TargetPath::Rotation,
                        },
                        data: TrackData::Quaternion(KeyframeTrack::new(
                            times,
                            iter.into_f32().map(Quat::from_array).collect(),
                            interpolation,
                        )),
                    },
                    (property, _) => {
                        log::debug!("Skipping unsupported channel {property:?} on '{bone_name}'");
                        continue;
                    }
                };

                tracks.push(track);
            }

            animations.push(AnimationClip::new(anim.name().unwrap_or("anim"), tracks));
        }

        Ok(animations)
    }
}

/// Decodes a base64 `data:` URI into bytes.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| MannequinError::DataUriError(format!("external buffers are not supported: {uri}")))?;
    let (_, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| MannequinError::DataUriError("data URI is not base64".to_string()))?;
    Ok(base64::engine::general_purpose::STANDARD.decode(payload)?)
}
