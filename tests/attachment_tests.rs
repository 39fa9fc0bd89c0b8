//! Attachment Tests
//!
//! Tests for:
//! - Target registry: candidate ordering, unknown names
//! - Equipment tables: lookups by item id
//! - AttachmentResolver: readiness polling, fallback resolution,
//!   warn-once diagnostics, idempotent load events, detach

use glam::{Affine3A, Vec3};

use mannequin::attachment::{
    ATTACHMENT_TARGETS, AttachmentOffset, AttachmentResolver, AttachmentState,
    EquipmentAttachmentSpec, ResolveOutcome, accessory_attachment, attachment_target,
    equipment_attachment, resolve_fallbacks, shoe_attachment,
};
use mannequin::scene::{NodeHandle, Scene, Skeleton};

const RETRY: f32 = 0.1;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Avatar root with a single bone chain, named `bones[0] > bones[1] > ...`.
/// When `skinned`, a mesh node bound to the chain is added under the root.
fn avatar(scene: &mut Scene, bones: &[&str], skinned: bool) -> (NodeHandle, Vec<NodeHandle>) {
    let root = scene.create_node_with_name("avatar");
    scene.root_nodes.push(root);

    let mut parent = root;
    let mut handles = Vec::new();
    for name in bones {
        let bone = scene.create_node_with_name(name);
        scene.attach(bone, parent);
        handles.push(bone);
        parent = bone;
    }
    if skinned {
        add_skin(scene, root, &handles);
    }
    (root, handles)
}

fn add_skin(scene: &mut Scene, root: NodeHandle, bones: &[NodeHandle]) {
    let mesh = scene.create_node_with_name("body");
    scene.attach(mesh, root);
    let skeleton = Skeleton::new("rig", bones.to_vec(), vec![Affine3A::IDENTITY; bones.len()], 0);
    let key = scene.add_skeleton(skeleton);
    scene.bind_skeleton(mesh, key);
}

fn visual(scene: &mut Scene) -> NodeHandle {
    let node = scene.create_node_with_name("shoe");
    scene.root_nodes.push(node);
    node
}

// ============================================================================
// Target Registry
// ============================================================================

#[test]
fn every_target_lists_its_primary_first() {
    for target in &ATTACHMENT_TARGETS {
        let candidates = resolve_fallbacks(target.name);
        assert!(!candidates.is_empty());
        assert_eq!(candidates[0], target.primary, "target {}", target.name);
        assert_eq!(candidates.len(), 1 + target.fallbacks.len());
    }
}

#[test]
fn unknown_target_resolves_to_itself() {
    let candidates = resolve_fallbacks("Tail");
    assert_eq!(candidates.as_slice(), ["Tail".to_string()]);
    assert!(attachment_target("Tail").is_none());
}

#[test]
fn back_maps_to_upper_spine() {
    let candidates = resolve_fallbacks("Back");
    assert_eq!(candidates[0], "Spine2");
}

#[test]
fn targets_carry_their_body_category() {
    assert_eq!(attachment_target("LeftFoot").unwrap().category.as_str(), "feet");
    assert_eq!(attachment_target("Back").unwrap().category.as_str(), "back");
}

#[test]
fn target_names_are_unique() {
    let mut names: Vec<&str> = ATTACHMENT_TARGETS.iter().map(|t| t.name).collect();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), ATTACHMENT_TARGETS.len());
}

// ============================================================================
// Equipment Tables
// ============================================================================

#[test]
fn missing_or_unknown_item_yields_none() {
    assert!(accessory_attachment(None).is_none());
    assert!(shoe_attachment(None).is_none());
    assert!(shoe_attachment(Some("unknown-id")).is_none());
    assert!(equipment_attachment(Some("unknown-id")).is_none());
}

#[test]
fn known_items_resolve_across_tables() {
    let shoe = equipment_attachment(Some("sneaker-basic")).unwrap();
    assert_eq!(shoe.attachment_node, "LeftFoot");
    let backpack = equipment_attachment(Some("backpack-small")).unwrap();
    assert_eq!(backpack.attachment_node, "Back");
    assert_eq!(shoe_attachment(Some("sneaker-basic")), Some(shoe));
}

#[test]
fn explicit_fallbacks_replace_the_registry() {
    let sandal = shoe_attachment(Some("sandal-summer")).unwrap();
    let candidates = sandal.candidates();
    assert_eq!(
        candidates.as_slice(),
        ["LeftFoot", "mixamorig:LeftFoot", "LeftAnkle"].map(String::from)
    );
}

#[test]
fn mirrored_spec_swaps_side() {
    let spec = EquipmentAttachmentSpec::new("shoe.glb", "LeftFoot")
        .with_fallbacks(&["foot_l"])
        .with_offset(AttachmentOffset::from_position(Vec3::new(0.05, 0.0, 0.0)));
    let right = spec.mirrored();
    assert_eq!(right.attachment_node, "RightFoot");
    assert_eq!(right.fallback_nodes, vec!["foot_r".to_string()]);
    assert!((right.offset.position.x + 0.05).abs() < 1e-6);
}

// ============================================================================
// Resolver: Readiness
// ============================================================================

#[test]
fn resolver_waits_for_its_own_model() {
    let mut scene = Scene::new();
    let (root, _) = avatar(&mut scene, &["Hips", "LeftFoot"], true);
    let mut resolver =
        AttachmentResolver::new(&EquipmentAttachmentSpec::new("s.glb", "LeftFoot"), root, RETRY);
    assert_eq!(resolver.state(), AttachmentState::Unattached);

    // A retry before the model load does nothing.
    assert_eq!(resolver.retry(&mut scene), ResolveOutcome::Ignored);
    assert_eq!(resolver.attempts(), 0);
}

#[test]
fn resolver_polls_until_avatar_is_skinned() {
    init_logger();
    let mut scene = Scene::new();
    let (root, bones) = avatar(&mut scene, &["Hips", "LeftFoot"], false);
    let shoe = visual(&mut scene);
    let mut resolver =
        AttachmentResolver::new(&EquipmentAttachmentSpec::new("s.glb", "LeftFoot"), root, RETRY);

    assert_eq!(resolver.on_model_loaded(&mut scene, shoe), ResolveOutcome::RetryAfter(RETRY));
    assert_eq!(resolver.retry(&mut scene), ResolveOutcome::RetryAfter(RETRY));
    assert_eq!(resolver.state(), AttachmentState::Attempting);
    // Not being ready is not a missing bone.
    assert_eq!(resolver.warning_count(), 0);

    add_skin(&mut scene, root, &bones);
    let outcome = resolver.retry(&mut scene);
    assert!(matches!(outcome, ResolveOutcome::Attached { used_fallback: false, .. }));
    assert_eq!(resolver.attempts(), 3);
}

// ============================================================================
// Resolver: Resolution
// ============================================================================

#[test]
fn resolver_attaches_to_primary_and_applies_offset() {
    let mut scene = Scene::new();
    let (root, bones) = avatar(&mut scene, &["Hips", "LeftUpLeg", "LeftLeg", "LeftFoot"], true);
    let shoe = visual(&mut scene);
    let offset = AttachmentOffset::from_position(Vec3::new(0.0, -0.02, 0.03));
    let spec = EquipmentAttachmentSpec::new("s.glb", "LeftFoot").with_offset(offset);
    let mut resolver = AttachmentResolver::new(&spec, root, RETRY);

    let outcome = resolver.on_model_loaded(&mut scene, shoe);
    assert_eq!(
        outcome,
        ResolveOutcome::Attached {
            bone: "LeftFoot".to_string(),
            node: bones[3],
            used_fallback: false,
        }
    );
    assert!(resolver.is_attached());
    assert_eq!(resolver.attached_to(), Some(bones[3]));

    let node = scene.get_node(shoe).unwrap();
    assert_eq!(node.parent(), Some(bones[3]));
    assert_eq!(node.transform.position, offset.position);
    assert!(!scene.root_nodes.contains(&shoe));
}

#[test]
fn resolver_uses_first_available_fallback() {
    init_logger();
    let mut scene = Scene::new();
    let (root, bones) = avatar(&mut scene, &["mixamorig:Hips", "mixamorig:LeftFoot"], true);
    let shoe = visual(&mut scene);
    let mut resolver =
        AttachmentResolver::new(&EquipmentAttachmentSpec::new("s.glb", "LeftFoot"), root, RETRY);

    let outcome = resolver.on_model_loaded(&mut scene, shoe);
    assert_eq!(
        outcome,
        ResolveOutcome::Attached {
            bone: "mixamorig:LeftFoot".to_string(),
            node: bones[1],
            used_fallback: true,
        }
    );
    assert_eq!(resolver.resolved_bone(), Some("mixamorig:LeftFoot"));
}

#[test]
fn candidate_order_beats_traversal_order() {
    let mut scene = Scene::new();
    // "foot_l" is visited before "LeftFoot", but "LeftFoot" is the primary.
    let (root, _) = avatar(&mut scene, &["Hips"], true);
    let early = scene.create_node_with_name("foot_l");
    scene.attach(early, root);
    let (_, deep) = avatar(&mut scene, &["Spine", "Leg", "LeftFoot"], false);
    scene.attach(deep[0], root);

    let shoe = visual(&mut scene);
    let mut resolver =
        AttachmentResolver::new(&EquipmentAttachmentSpec::new("s.glb", "LeftFoot"), root, RETRY);
    let outcome = resolver.on_model_loaded(&mut scene, shoe);
    assert!(matches!(outcome, ResolveOutcome::Attached { node, .. } if node == deep[2]));
}

#[test]
fn duplicate_names_take_first_in_preorder() {
    let mut scene = Scene::new();
    let (root, first) = avatar(&mut scene, &["Head"], true);
    let (_, second) = avatar(&mut scene, &["Wrapper", "Head"], false);
    scene.attach(second[0], root);

    let hat = visual(&mut scene);
    let mut resolver =
        AttachmentResolver::new(&EquipmentAttachmentSpec::new("h.glb", "Head"), root, RETRY);
    resolver.on_model_loaded(&mut scene, hat);
    assert_eq!(resolver.attached_to(), Some(first[0]));
}

#[test]
fn second_load_event_is_ignored() {
    let mut scene = Scene::new();
    let (root, bones) = avatar(&mut scene, &["Hips", "LeftFoot"], true);
    let shoe = visual(&mut scene);
    let mut resolver =
        AttachmentResolver::new(&EquipmentAttachmentSpec::new("s.glb", "LeftFoot"), root, RETRY);

    assert!(matches!(resolver.on_model_loaded(&mut scene, shoe), ResolveOutcome::Attached { .. }));
    assert_eq!(resolver.on_model_loaded(&mut scene, shoe), ResolveOutcome::Ignored);
    assert_eq!(resolver.retry(&mut scene), ResolveOutcome::Ignored);

    let foot = scene.get_node(bones[1]).unwrap();
    assert_eq!(foot.children().iter().filter(|&&c| c == shoe).count(), 1);
}

// ============================================================================
// Resolver: Missing Bones
// ============================================================================

#[test]
fn missing_bone_warns_once_and_keeps_polling() {
    init_logger();
    let mut scene = Scene::new();
    let (root, _) = avatar(&mut scene, &["pelvis", "spine_01"], true);
    let shoe = visual(&mut scene);
    let mut resolver =
        AttachmentResolver::new(&EquipmentAttachmentSpec::new("s.glb", "LeftFoot"), root, RETRY);

    assert_eq!(resolver.on_model_loaded(&mut scene, shoe), ResolveOutcome::RetryAfter(RETRY));
    for _ in 0..20 {
        assert_eq!(resolver.retry(&mut scene), ResolveOutcome::RetryAfter(RETRY));
    }
    assert_eq!(resolver.state(), AttachmentState::Attempting);
    assert!(!resolver.is_attached());
    assert_eq!(resolver.warning_count(), 1);
    assert_eq!(scene.get_node(shoe).unwrap().parent(), None);
}

#[test]
fn bone_appearing_later_is_picked_up() {
    let mut scene = Scene::new();
    let (root, bones) = avatar(&mut scene, &["Hips"], true);
    let shoe = visual(&mut scene);
    let mut resolver =
        AttachmentResolver::new(&EquipmentAttachmentSpec::new("s.glb", "LeftFoot"), root, RETRY);
    resolver.on_model_loaded(&mut scene, shoe);

    let foot = scene.create_node_with_name("LeftFoot");
    scene.attach(foot, bones[0]);
    assert!(matches!(resolver.retry(&mut scene), ResolveOutcome::Attached { .. }));
    assert_eq!(resolver.warning_count(), 1);
}

#[test]
fn visual_subtree_is_not_searched() {
    init_logger();
    let mut scene = Scene::new();
    let (root, _) = avatar(&mut scene, &["Hips"], true);
    // The equipment model lives under the avatar and carries its own
    // "LeftFoot" node below its root; neither may be chosen.
    let shoe = scene.create_node_with_name("shoe");
    scene.attach(shoe, root);
    let inner_foot = scene.create_node_with_name("LeftFoot");
    scene.attach(inner_foot, shoe);

    let mut resolver =
        AttachmentResolver::new(&EquipmentAttachmentSpec::new("s.glb", "LeftFoot"), root, RETRY);
    assert_eq!(resolver.on_model_loaded(&mut scene, shoe), ResolveOutcome::RetryAfter(RETRY));
    for _ in 0..5 {
        assert_eq!(resolver.retry(&mut scene), ResolveOutcome::RetryAfter(RETRY));
    }
    assert_eq!(resolver.attempts(), 6);
    assert_eq!(resolver.warning_count(), 1, "reported as a missing bone, once");
    assert_eq!(scene.get_node(shoe).unwrap().parent(), Some(root));
}

#[test]
fn visual_root_named_like_target_is_not_searched() {
    let mut scene = Scene::new();
    let (root, _) = avatar(&mut scene, &["Hips"], true);
    let shoe = scene.create_node_with_name("LeftFoot");
    scene.attach(shoe, root);

    let mut resolver =
        AttachmentResolver::new(&EquipmentAttachmentSpec::new("s.glb", "LeftFoot"), root, RETRY);
    assert_eq!(resolver.on_model_loaded(&mut scene, shoe), ResolveOutcome::RetryAfter(RETRY));
    assert_eq!(resolver.warning_count(), 1);
}

// ============================================================================
// Resolver: Detach
// ============================================================================

#[test]
fn detach_unparents_visual() {
    let mut scene = Scene::new();
    let (root, bones) = avatar(&mut scene, &["Hips", "LeftFoot"], true);
    let shoe = visual(&mut scene);
    let mut resolver =
        AttachmentResolver::new(&EquipmentAttachmentSpec::new("s.glb", "LeftFoot"), root, RETRY);
    resolver.on_model_loaded(&mut scene, shoe);

    assert!(resolver.detach(&mut scene));
    assert_eq!(resolver.state(), AttachmentState::Removed);
    assert!(!scene.get_node(bones[1]).unwrap().children().contains(&shoe));
    assert_eq!(scene.get_node(shoe).unwrap().parent(), None);
    assert!(resolver.token().is_cancelled());
}

#[test]
fn detach_before_attaching_is_harmless() {
    let mut scene = Scene::new();
    let (root, _) = avatar(&mut scene, &["Hips"], false);
    let shoe = visual(&mut scene);
    let mut resolver =
        AttachmentResolver::new(&EquipmentAttachmentSpec::new("s.glb", "LeftFoot"), root, RETRY);

    // Never loaded.
    assert!(!resolver.detach(&mut scene));

    // Loaded but still polling.
    let mut polling =
        AttachmentResolver::new(&EquipmentAttachmentSpec::new("s.glb", "LeftFoot"), root, RETRY);
    polling.on_model_loaded(&mut scene, shoe);
    assert!(!polling.detach(&mut scene));
    assert_eq!(polling.retry(&mut scene), ResolveOutcome::Ignored);
    assert_eq!(polling.on_model_loaded(&mut scene, shoe), ResolveOutcome::Ignored);
}
