//! glTF 2.0 writer for [`AvatarRig`].
//!
//! The document is assembled as JSON and all vertex, skin and animation data
//! is packed into one buffer. Depending on [`AssetFormat`] the result is a
//! binary GLB container or a text document with the buffer inlined as a
//! base64 data URI.
//!
//! Node layout: bones first, in arena order (so node index == joint index),
//! followed by a single mesh node carrying the skin.

use std::borrow::Cow;

use base64::Engine as _;
use glam::Mat4;
use serde_json::{Value, json};

use crate::animation::{InterpolationMode, TrackData};
use crate::errors::{MannequinError, Result};
use crate::rig::AvatarRig;
use crate::settings::{AssetFormat, ExportSettings};

const FLOAT: u32 = 5126;
const UNSIGNED_SHORT: u32 = 5123;
const ARRAY_BUFFER: u32 = 34962;
const ELEMENT_ARRAY_BUFFER: u32 = 34963;
const TRIANGLES: u32 = 4;

pub const MESH_NODE_NAME: &str = "AvatarMesh";
pub const SKIN_NAME: &str = "AvatarSkeleton";

/// What the serializer produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SerializedAsset {
    Binary(Vec<u8>),
    Text(String),
}

impl SerializedAsset {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            SerializedAsset::Binary(_) => "a binary buffer",
            SerializedAsset::Text(_) => "a text glTF document",
        }
    }
}

/// Accumulates the shared buffer plus its views and accessors.
#[derive(Default)]
struct BufferBuilder {
    data: Vec<u8>,
    views: Vec<Value>,
    accessors: Vec<Value>,
}

impl BufferBuilder {
    fn push_view(&mut self, bytes: &[u8], target: Option<u32>) -> usize {
        while self.data.len() % 4 != 0 {
            self.data.push(0);
        }
        let offset = self.data.len();
        self.data.extend_from_slice(bytes);

        let mut view = json!({
            "buffer": 0,
            "byteOffset": offset,
            "byteLength": bytes.len(),
        });
        if let Some(target) = target {
            view["target"] = json!(target);
        }
        self.views.push(view);
        self.views.len() - 1
    }

    fn push_accessor(
        &mut self,
        bytes: &[u8],
        target: Option<u32>,
        component_type: u32,
        count: usize,
        kind: &str,
        bounds: Option<(Vec<f32>, Vec<f32>)>,
    ) -> usize {
        let view = self.push_view(bytes, target);
        let mut accessor = json!({
            "bufferView": view,
            "componentType": component_type,
            "count": count,
            "type": kind,
        });
        if let Some((min, max)) = bounds {
            accessor["min"] = json!(min);
            accessor["max"] = json!(max);
        }
        self.accessors.push(accessor);
        self.accessors.len() - 1
    }

    fn finish(&mut self) {
        while self.data.len() % 4 != 0 {
            self.data.push(0);
        }
    }
}

fn scalar_bounds(values: &[f32]) -> (Vec<f32>, Vec<f32>) {
    let min = values.iter().copied().fold(f32::MAX, f32::min);
    let max = values.iter().copied().fold(f32::MIN, f32::max);
    (vec![min], vec![max])
}

fn interpolation_name(mode: InterpolationMode) -> &'static str {
    match mode {
        InterpolationMode::Linear => "LINEAR",
        InterpolationMode::Step => "STEP",
    }
}

/// Builds the glTF JSON document and its binary buffer.
fn build_document(rig: &AvatarRig, settings: &ExportSettings) -> Result<(Value, Vec<u8>)> {
    let mut buffer = BufferBuilder::default();
    let bones = rig.skeleton.bones();
    let bone_count = bones.len();
    let mesh_node = bone_count;

    // ---- Nodes ----
    let mut nodes: Vec<Value> = bones
        .iter()
        .map(|bone| {
            let mut node = json!({
                "name": bone.name,
                "translation": bone.offset.to_array(),
            });
            if !bone.children.is_empty() {
                node["children"] = json!(bone.children);
            }
            node
        })
        .collect();
    nodes.push(json!({
        "name": MESH_NODE_NAME,
        "mesh": 0,
        "skin": 0,
    }));

    let root = rig
        .skeleton
        .root()
        .ok_or_else(|| MannequinError::InvalidRig("skeleton has no root".into()))?;

    // ---- Mesh ----
    let vertices = &rig.mesh.vertices;
    let positions: Vec<[f32; 3]> = vertices.iter().map(|v| v.position.to_array()).collect();
    let normals: Vec<[f32; 3]> = vertices.iter().map(|v| v.normal.to_array()).collect();
    let joints: Vec<[u16; 4]> = vertices.iter().map(|v| v.joints).collect();
    let weights: Vec<[f32; 4]> = vertices.iter().map(|v| v.weights).collect();
    let (min, max) = rig.mesh.bounds();

    let position_accessor = buffer.push_accessor(
        bytemuck::cast_slice(&positions),
        Some(ARRAY_BUFFER),
        FLOAT,
        positions.len(),
        "VEC3",
        Some((min.to_array().to_vec(), max.to_array().to_vec())),
    );
    let normal_accessor = buffer.push_accessor(
        bytemuck::cast_slice(&normals),
        Some(ARRAY_BUFFER),
        FLOAT,
        normals.len(),
        "VEC3",
        None,
    );
    let joints_accessor = buffer.push_accessor(
        bytemuck::cast_slice(&joints),
        Some(ARRAY_BUFFER),
        UNSIGNED_SHORT,
        joints.len(),
        "VEC4",
        None,
    );
    let weights_accessor = buffer.push_accessor(
        bytemuck::cast_slice(&weights),
        Some(ARRAY_BUFFER),
        FLOAT,
        weights.len(),
        "VEC4",
        None,
    );
    let index_accessor = buffer.push_accessor(
        bytemuck::cast_slice(&rig.mesh.indices),
        Some(ELEMENT_ARRAY_BUFFER),
        UNSIGNED_SHORT,
        rig.mesh.indices.len(),
        "SCALAR",
        None,
    );

    // ---- Skin ----
    let ibms: Vec<[f32; 16]> = rig
        .skeleton
        .inverse_bind_matrices()
        .iter()
        .map(Mat4::to_cols_array)
        .collect();
    let ibm_accessor = buffer.push_accessor(
        bytemuck::cast_slice(&ibms),
        None,
        FLOAT,
        ibms.len(),
        "MAT4",
        None,
    );

    // ---- Animations ----
    let mut animations = Vec::with_capacity(rig.clips.len());
    for clip in &rig.clips {
        let mut samplers = Vec::with_capacity(clip.tracks.len());
        let mut channels = Vec::with_capacity(clip.tracks.len());

        for track in &clip.tracks {
            let node = rig.skeleton.index_of(&track.meta.bone_name).ok_or_else(|| {
                MannequinError::MissingBone {
                    bone: track.meta.bone_name.clone(),
                    referenced_by: format!("clip '{}'", clip.name),
                }
            })?;

            let times = track.data.times();
            let input = buffer.push_accessor(
                bytemuck::cast_slice(times),
                None,
                FLOAT,
                times.len(),
                "SCALAR",
                Some(scalar_bounds(times)),
            );

            let (output, path, interpolation) = match &track.data {
                TrackData::Vector3(t) => {
                    let values: Vec<[f32; 3]> = t.values.iter().map(|v| v.to_array()).collect();
                    let accessor = buffer.push_accessor(
                        bytemuck::cast_slice(&values),
                        None,
                        FLOAT,
                        values.len(),
                        "VEC3",
                        None,
                    );
                    (accessor, "translation", t.interpolation)
                }
                TrackData::Quaternion(t) => {
                    let values: Vec<[f32; 4]> =
                        t.values.iter().map(|q| q.normalize().to_array()).collect();
                    let accessor = buffer.push_accessor(
                        bytemuck::cast_slice(&values),
                        None,
                        FLOAT,
                        values.len(),
                        "VEC4",
                        None,
                    );
                    (accessor, "rotation", t.interpolation)
                }
            };

            channels.push(json!({
                "sampler": samplers.len(),
                "target": { "node": node, "path": path },
            }));
            samplers.push(json!({
                "input": input,
                "output": output,
                "interpolation": interpolation_name(interpolation),
            }));
        }

        animations.push(json!({
            "name": clip.name,
            "samplers": samplers,
            "channels": channels,
        }));
    }

    buffer.finish();
    let BufferBuilder {
        data,
        views,
        accessors,
    } = buffer;

    let mut buffer_entry = json!({ "byteLength": data.len() });
    if settings.format == AssetFormat::Gltf {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&data);
        buffer_entry["uri"] = json!(format!("data:application/octet-stream;base64,{encoded}"));
    }

    let document = json!({
        "asset": {
            "version": "2.0",
            "generator": settings.generator,
        },
        "scene": 0,
        "scenes": [{ "name": "AvatarScene", "nodes": [root, mesh_node] }],
        "nodes": nodes,
        "meshes": [{
            "name": "AvatarBody",
            "primitives": [{
                "attributes": {
                    "POSITION": position_accessor,
                    "NORMAL": normal_accessor,
                    "JOINTS_0": joints_accessor,
                    "WEIGHTS_0": weights_accessor,
                },
                "indices": index_accessor,
                "mode": TRIANGLES,
            }],
        }],
        "skins": [{
            "name": SKIN_NAME,
            "joints": (0..bone_count).collect::<Vec<_>>(),
            "skeleton": root,
            "inverseBindMatrices": ibm_accessor,
        }],
        "animations": animations,
        "buffers": [buffer_entry],
        "bufferViews": views,
        "accessors": accessors,
    });

    Ok((document, data))
}

/// Serializes `rig` in the format selected by `settings`.
pub fn serialize(rig: &AvatarRig, settings: &ExportSettings) -> Result<SerializedAsset> {
    let (document, bin) = build_document(rig, settings)?;

    match settings.format {
        AssetFormat::Gltf => Ok(SerializedAsset::Text(serde_json::to_string_pretty(
            &document,
        )?)),
        AssetFormat::Glb => {
            let mut json = serde_json::to_vec(&document)?;
            // JSON chunk is padded with spaces, BIN chunk with zeros.
            while json.len() % 4 != 0 {
                json.push(b' ');
            }

            let length = 12 + 8 + json.len() + 8 + bin.len();
            let length = u32::try_from(length).map_err(|_| {
                MannequinError::GltfError(format!("GLB too large: {length} bytes"))
            })?;

            let glb = gltf::binary::Glb {
                header: gltf::binary::Header {
                    magic: *b"glTF",
                    version: 2,
                    length,
                },
                json: Cow::Owned(json),
                bin: Some(Cow::Owned(bin)),
            };
            let bytes = glb.to_vec()?;
            log::debug!("GLB framed: {} bytes", bytes.len());
            Ok(SerializedAsset::Binary(bytes))
        }
    }
}
