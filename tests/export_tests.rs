//! Export Tests
//!
//! Tests for:
//! - GLB container framing
//! - Skeleton, skin and clip contents of the exported document
//! - Rejection of text output by `AvatarRig::export`
//! - Loading exported assets back into a scene

use std::collections::HashSet;

use gltf::Semantic;

use mannequin::assets::exporter::{self, SerializedAsset};
use mannequin::assets::{AvatarLoader, MESH_NODE_NAME, SKIN_NAME};
use mannequin::errors::MannequinError;
use mannequin::rig::{AvatarRig, CANONICAL_BONES, CLIP_NAMES};
use mannequin::scene::Scene;
use mannequin::settings::{AssetFormat, ExportSettings, RigSettings};

const EPSILON: f32 = 1e-4;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn rig() -> AvatarRig {
    AvatarRig::build(&RigSettings::default()).expect("rig builds")
}

fn glb_bytes() -> Vec<u8> {
    rig().export(&ExportSettings::default()).expect("export succeeds")
}

// ============================================================================
// Container
// ============================================================================

#[test]
fn glb_header_is_well_formed() {
    init_logger();
    let bytes = glb_bytes();
    assert_eq!(&bytes[0..4], b"glTF");
    let version = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
    let length = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
    assert_eq!(version, 2);
    assert_eq!(length as usize, bytes.len());
    assert_eq!(bytes.len() % 4, 0);
}

#[test]
fn glb_parses_with_embedded_buffer() {
    let bytes = glb_bytes();
    let gltf = gltf::Gltf::from_slice(&bytes).unwrap();
    assert!(gltf.blob.is_some());
    assert_eq!(gltf.buffers().count(), 1);
}

// ============================================================================
// Document Contents
// ============================================================================

#[test]
fn skin_joints_are_the_canonical_bones() {
    let bytes = glb_bytes();
    let gltf = gltf::Gltf::from_slice(&bytes).unwrap();

    let skins: Vec<_> = gltf.skins().collect();
    assert_eq!(skins.len(), 1);
    let skin = &skins[0];
    assert_eq!(skin.name(), Some(SKIN_NAME));

    let joints: Vec<&str> = skin.joints().filter_map(|j| j.name()).collect();
    assert_eq!(joints, CANONICAL_BONES);
    assert_eq!(skin.skeleton().and_then(|n| n.name().map(str::to_string)).as_deref(), Some("Hips"));
}

#[test]
fn mesh_node_carries_the_skin() {
    let bytes = glb_bytes();
    let gltf = gltf::Gltf::from_slice(&bytes).unwrap();

    let mesh_node = gltf
        .nodes()
        .find(|n| n.name() == Some(MESH_NODE_NAME))
        .expect("mesh node exported");
    assert!(mesh_node.mesh().is_some());
    assert!(mesh_node.skin().is_some());

    let primitive = mesh_node.mesh().unwrap().primitives().next().unwrap();
    for semantic in [
        Semantic::Positions,
        Semantic::Normals,
        Semantic::Joints(0),
        Semantic::Weights(0),
    ] {
        assert!(primitive.get(&semantic).is_some(), "missing {semantic:?}");
    }
}

#[test]
fn exported_clips_are_exactly_the_stances() {
    let bytes = glb_bytes();
    let gltf = gltf::Gltf::from_slice(&bytes).unwrap();
    let names: Vec<&str> = gltf.animations().filter_map(|a| a.name()).collect();
    assert_eq!(names, CLIP_NAMES);
}

#[test]
fn every_node_name_is_unique() {
    let bytes = glb_bytes();
    let gltf = gltf::Gltf::from_slice(&bytes).unwrap();
    let mut seen = HashSet::new();
    for node in gltf.nodes() {
        let name = node.name().expect("every node is named");
        assert!(seen.insert(name.to_string()), "duplicate node '{name}'");
    }
    for bone in CANONICAL_BONES {
        assert!(seen.contains(bone), "missing bone node {bone}");
    }
}

// ============================================================================
// Format Contract
// ============================================================================

#[test]
fn export_rejects_text_format() {
    init_logger();
    let settings = ExportSettings {
        format: AssetFormat::Gltf,
        ..Default::default()
    };
    match rig().export(&settings) {
        Err(MannequinError::NotBinary { produced }) => assert!(produced.contains("text")),
        other => panic!("expected NotBinary, got {other:?}"),
    }
}

#[test]
fn serializer_can_still_produce_text() {
    let settings = ExportSettings {
        format: AssetFormat::Gltf,
        ..Default::default()
    };
    let SerializedAsset::Text(json) = exporter::serialize(&rig(), &settings).unwrap() else {
        panic!("expected text output");
    };
    assert!(json.contains("data:application/octet-stream;base64,"));
    let gltf = gltf::Gltf::from_slice(json.as_bytes()).unwrap();
    assert_eq!(gltf.animations().count(), CLIP_NAMES.len());
}

// ============================================================================
// Round Trip
// ============================================================================

#[test]
fn exported_rig_loads_back_into_a_scene() {
    init_logger();
    let rig = rig();
    let bytes = rig.export(&ExportSettings::default()).unwrap();

    let mut scene = Scene::new();
    let model = AvatarLoader::load_slice(&bytes, &mut scene, None).unwrap();

    assert_eq!(model.skeletons.len(), 1);
    let clip_names: Vec<&str> = model.clips.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(clip_names, CLIP_NAMES);

    let mesh = scene.find_skinned_mesh(model.root).expect("skinned mesh loaded");
    let skeleton = scene.skeleton_of(mesh).unwrap();
    assert_eq!(skeleton.bones.len(), CANONICAL_BONES.len());
    assert_eq!(skeleton.root_bone().and_then(|b| scene.get_name(b)), Some("Hips"));

    // Bind pose survives the trip.
    let world = rig.skeleton.world_positions();
    for (index, name) in CANONICAL_BONES.iter().enumerate() {
        let node = scene.find_node_by_name(model.root, name).unwrap();
        let pos = scene.get_node(node).unwrap().transform.world_position();
        assert!(pos.distance(world[index]) < EPSILON, "{name}: {pos} vs {}", world[index]);
    }
}

#[test]
fn loaded_clips_keep_their_durations() {
    let rig = rig();
    let bytes = rig.export(&ExportSettings::default()).unwrap();
    let mut scene = Scene::new();
    let model = AvatarLoader::load_slice(&bytes, &mut scene, None).unwrap();
    for clip in &model.clips {
        let authored = rig.clip(&clip.name).unwrap();
        assert!((clip.duration - authored.duration).abs() < EPSILON);
        assert_eq!(clip.tracks.len(), authored.tracks.len());
    }
}
