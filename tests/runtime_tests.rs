//! Runtime Tests
//!
//! Tests for:
//! - Behavior registry: idempotent registration, unknown names
//! - AvatarWorld: model loading, stance playback and cross-fades
//! - Equipment: retry scheduling until the avatar is ready, unequip
//!   cancelling pending retries

use serde_json::json;

use mannequin::attachment::{EquipmentAttachmentSpec, ResolveOutcome, shoe_attachment};
use mannequin::errors::MannequinError;
use mannequin::rig::AvatarRig;
use mannequin::runtime::behaviors::{AVATAR_ANIMATION, BONE_ATTACHMENT, register_builtin_behaviors};
use mannequin::runtime::{AvatarKey, AvatarWorld, BehaviorHandle};
use mannequin::scene::NodeHandle;
use mannequin::settings::{ExportSettings, RigSettings, RuntimeSettings};

const EPSILON: f32 = 1e-4;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn avatar_glb() -> Vec<u8> {
    AvatarRig::build(&RigSettings::default())
        .and_then(|rig| rig.export(&ExportSettings::default()))
        .expect("avatar exports")
}

fn visual(world: &mut AvatarWorld, name: &str) -> NodeHandle {
    let node = world.scene.create_node_with_name(name);
    world.scene.root_nodes.push(node);
    node
}

/// Avatar with an animation controller and the exported model loaded.
fn animated_avatar(world: &mut AvatarWorld) -> AvatarKey {
    let avatar = world.spawn_avatar("player");
    world.add_behavior(avatar, AVATAR_ANIMATION, &json!({})).unwrap();
    world.load_avatar_model(avatar, &avatar_glb()).unwrap();
    avatar
}

fn stance(world: &AvatarWorld, avatar: AvatarKey) -> Option<String> {
    world
        .avatar(avatar)
        .and_then(|a| a.animation.as_ref())
        .and_then(|c| c.current_stance().map(str::to_string))
}

fn action_weight(world: &AvatarWorld, avatar: AvatarKey, clip: &str) -> f32 {
    let controller = world.avatar(avatar).unwrap().animation.as_ref().unwrap();
    let mixer = controller.mixer();
    let index = mixer.find_action(clip).unwrap();
    mixer.action(index).unwrap().weight
}

// ============================================================================
// Behavior Registry
// ============================================================================

#[test]
fn builtin_behaviors_are_registered_once() {
    let mut world = AvatarWorld::default();
    assert!(world.behaviors().is_registered(BONE_ATTACHMENT));
    assert!(world.behaviors().is_registered(AVATAR_ANIMATION));
    assert_eq!(register_builtin_behaviors(world.behaviors_mut()), 0);
    assert_eq!(world.behaviors().len(), 2);
}

#[test]
fn unknown_behavior_is_an_error() {
    let mut world = AvatarWorld::default();
    let avatar = world.spawn_avatar("player");
    let err = world.add_behavior(avatar, "teleporter", &json!({})).unwrap_err();
    assert!(matches!(err, MannequinError::UnknownBehavior(name) if name == "teleporter"));
}

#[test]
fn bone_attachment_behavior_creates_equipment() {
    let mut world = AvatarWorld::default();
    let avatar = world.spawn_avatar("player");
    let handle = world
        .add_behavior(
            avatar,
            BONE_ATTACHMENT,
            &json!({ "targetBone": "RightHand", "fallbackBones": ["hand_r"], "assetPath": "sword.glb" }),
        )
        .unwrap();
    let BehaviorHandle::Equipment(key) = handle else {
        panic!("expected equipment handle");
    };
    let item = world.equipment(key).unwrap();
    assert_eq!(item.asset_path, "sword.glb");
    assert_eq!(item.resolver.candidates(), ["RightHand", "hand_r"].map(String::from));
}

// ============================================================================
// Stances
// ============================================================================

#[test]
fn initial_stance_plays_after_load() {
    init_logger();
    let mut world = AvatarWorld::default();
    let avatar = animated_avatar(&mut world);
    assert_eq!(stance(&world, avatar).as_deref(), Some("Idle"));
}

#[test]
fn stance_before_load_is_rejected() {
    let mut world = AvatarWorld::default();
    let avatar = world.spawn_avatar("player");
    world.add_behavior(avatar, AVATAR_ANIMATION, &json!({})).unwrap();
    assert!(!world.play_stance(avatar, "Idle"));
    assert_eq!(stance(&world, avatar), None);
}

#[test]
fn stance_lookup_ignores_case() {
    let mut world = AvatarWorld::default();
    let avatar = animated_avatar(&mut world);

    assert!(world.play_stance(avatar, "VICTORY"));
    assert_eq!(stance(&world, avatar).as_deref(), Some("Victory"));
    assert!(world.play_stance(avatar, "action"));
    assert_eq!(stance(&world, avatar).as_deref(), Some("Action"));
}

#[test]
fn unknown_stance_keeps_current_playback() {
    let mut world = AvatarWorld::default();
    let avatar = animated_avatar(&mut world);
    assert!(!world.play_stance(avatar, "nonexistent"));
    assert_eq!(stance(&world, avatar).as_deref(), Some("Idle"));
}

#[test]
fn stance_change_cross_fades() {
    let mut world = AvatarWorld::new(RuntimeSettings {
        crossfade_duration: 0.4,
        ..Default::default()
    });
    let avatar = animated_avatar(&mut world);
    world.tick(0.5);
    assert!((action_weight(&world, avatar, "Idle") - 1.0).abs() < EPSILON);

    world.play_stance(avatar, "Action");
    world.tick(0.2);
    let idle = action_weight(&world, avatar, "Idle");
    let action = action_weight(&world, avatar, "Action");
    assert!((idle - 0.5).abs() < 1e-3, "idle weight {idle}");
    assert!((action - 0.5).abs() < 1e-3, "action weight {action}");

    world.tick(0.3);
    assert!(action_weight(&world, avatar, "Idle").abs() < EPSILON);
    assert!((action_weight(&world, avatar, "Action") - 1.0).abs() < EPSILON);
}

#[test]
fn victory_lifts_the_hips_off_rest() {
    let mut world = AvatarWorld::new(RuntimeSettings {
        crossfade_duration: 0.0,
        initial_stance: Some("Victory".to_string()),
        ..Default::default()
    });
    let avatar = animated_avatar(&mut world);
    let root = world.avatar(avatar).unwrap().root;
    let hips = world.scene.find_node_by_name(root, "Hips").unwrap();
    let rest_y = world.scene.get_node(hips).unwrap().transform.position.y;

    world.tick(0.4);
    let lifted = world.scene.get_node(hips).unwrap().transform.position.y;
    assert!(lifted > rest_y + 0.01, "rest {rest_y}, lifted {lifted}");
}

#[test]
fn finished_cross_fade_returns_old_stance_bones_to_rest() {
    let mut world = AvatarWorld::new(RuntimeSettings {
        initial_stance: Some("Victory".to_string()),
        ..Default::default()
    });
    let avatar = animated_avatar(&mut world);
    let root = world.avatar(avatar).unwrap().root;
    let arm = world.scene.find_node_by_name(root, "LeftArm").unwrap();
    let hips = world.scene.find_node_by_name(root, "Hips").unwrap();
    let arm_rest = world.scene.get_node(arm).unwrap().transform.rotation;
    let hips_rest = world.scene.get_node(hips).unwrap().transform.position;

    for _ in 0..120 {
        world.tick(1.0 / 60.0);
    }
    let raised = world.scene.get_node(arm).unwrap().transform.rotation;
    assert!(raised.angle_between(arm_rest) > 0.1, "victory raises the arm");

    // Idle never touches the arms or the hips position.
    assert!(world.play_stance(avatar, "Idle"));
    for _ in 0..60 {
        world.tick(1.0 / 60.0);
    }
    let arm_now = world.scene.get_node(arm).unwrap().transform.rotation;
    let hips_now = world.scene.get_node(hips).unwrap().transform.position;
    assert!(arm_now.angle_between(arm_rest) < 1e-3, "arm residual {}", arm_now.angle_between(arm_rest));
    assert!(hips_now.distance(hips_rest) < EPSILON, "hips at {hips_now}, rest {hips_rest}");
}

// ============================================================================
// Equipment
// ============================================================================

#[test]
fn equip_on_loaded_avatar_attaches_immediately() {
    let mut world = AvatarWorld::default();
    let avatar = animated_avatar(&mut world);
    let spec = shoe_attachment(Some("sneaker-basic")).unwrap();
    let key = world.equip(avatar, spec).unwrap();
    let shoe = visual(&mut world, "sneaker");

    let outcome = world.equipment_model_loaded(key, shoe);
    assert!(matches!(&outcome, ResolveOutcome::Attached { bone, used_fallback: false, .. } if bone == "LeftFoot"));
    assert_eq!(world.pending_timers(), 0);

    let parent = world.scene.get_node(shoe).unwrap().parent().unwrap();
    assert_eq!(world.scene.get_name(parent), Some("LeftFoot"));
}

#[test]
fn equip_before_avatar_load_retries_until_ready() {
    init_logger();
    let mut world = AvatarWorld::default();
    let avatar = world.spawn_avatar("player");
    let key = world
        .equip(avatar, &EquipmentAttachmentSpec::new("hat.glb", "Head"))
        .unwrap();
    let hat = visual(&mut world, "hat");

    let retry = world.settings().retry_interval;
    assert_eq!(world.equipment_model_loaded(key, hat), ResolveOutcome::RetryAfter(retry));
    assert_eq!(world.pending_timers(), 1);

    // Still not ready: the retry reschedules itself.
    world.tick(retry * 1.5);
    assert_eq!(world.pending_timers(), 1);
    assert!(!world.equipment(key).unwrap().resolver.is_attached());

    world.load_avatar_model(avatar, &avatar_glb()).unwrap();
    world.tick(retry * 1.5);
    let resolver = &world.equipment(key).unwrap().resolver;
    assert!(resolver.is_attached());
    assert_eq!(resolver.resolved_bone(), Some("Head"));
    assert_eq!(world.pending_timers(), 0);
}

#[test]
fn unequip_cancels_pending_retry() {
    let mut world = AvatarWorld::default();
    let avatar = world.spawn_avatar("player");
    let key = world
        .equip(avatar, &EquipmentAttachmentSpec::new("hat.glb", "Head"))
        .unwrap();
    let hat = visual(&mut world, "hat");
    world.equipment_model_loaded(key, hat);
    assert_eq!(world.pending_timers(), 1);

    assert!(world.unequip(key));
    assert!(world.equipment(key).is_none());
    assert!(world.scene.get_node(hat).is_none());

    world.load_avatar_model(avatar, &avatar_glb()).unwrap();
    world.tick(1.0);
    assert_eq!(world.pending_timers(), 0);
    assert!(!world.unequip(key), "stale key");
}

#[test]
fn unequip_detaches_from_bone() {
    let mut world = AvatarWorld::default();
    let avatar = animated_avatar(&mut world);
    let key = world
        .equip(avatar, shoe_attachment(Some("boot-leather")).unwrap())
        .unwrap();
    let boot = visual(&mut world, "boot");
    let ResolveOutcome::Attached { node: foot, .. } = world.equipment_model_loaded(key, boot) else {
        panic!("expected attachment");
    };

    assert!(world.unequip(key));
    assert!(!world.scene.get_node(foot).unwrap().children().contains(&boot));
    assert!(world.scene.get_node(boot).is_none());
}

#[test]
fn attached_equipment_follows_animated_bone() {
    let mut world = AvatarWorld::new(RuntimeSettings {
        crossfade_duration: 0.0,
        initial_stance: Some("Victory".to_string()),
        ..Default::default()
    });
    let avatar = animated_avatar(&mut world);
    let key = world
        .equip(avatar, &EquipmentAttachmentSpec::new("belt.glb", "Hips"))
        .unwrap();
    let belt = visual(&mut world, "belt");
    world.equipment_model_loaded(key, belt);
    world.tick(0.0);
    let before = world.scene.get_node(belt).unwrap().transform.world_position();

    world.tick(0.4);
    let after = world.scene.get_node(belt).unwrap().transform.world_position();
    assert!(after.y > before.y + 0.01, "before {before}, after {after}");
}

#[test]
fn equip_on_unknown_avatar_fails() {
    let mut world = AvatarWorld::default();
    let avatar = world.spawn_avatar("ghost");
    let mut other = AvatarWorld::default();
    // A key from another world does not resolve here.
    assert!(other.equip(avatar, &EquipmentAttachmentSpec::new("x.glb", "Head")).is_none());
    assert!(matches!(
        other.load_avatar_model(avatar, &[]),
        Err(MannequinError::UnknownEntity(_))
    ));
}

#[test]
fn reloading_avatar_replaces_model_and_reattaches_equipment() {
    init_logger();
    let mut world = AvatarWorld::new(RuntimeSettings {
        crossfade_duration: 0.0,
        initial_stance: Some("Victory".to_string()),
        ..Default::default()
    });
    let avatar = animated_avatar(&mut world);
    let key = world
        .equip(avatar, shoe_attachment(Some("sneaker-basic")).unwrap())
        .unwrap();
    let shoe = visual(&mut world, "sneaker");
    let ResolveOutcome::Attached { node: old_foot, .. } = world.equipment_model_loaded(key, shoe) else {
        panic!("expected attachment");
    };
    let old_model = world.avatar(avatar).unwrap().model_root.unwrap();

    world.load_avatar_model(avatar, &avatar_glb()).unwrap();

    let root = world.avatar(avatar).unwrap().root;
    let new_model = world.avatar(avatar).unwrap().model_root.unwrap();
    assert_ne!(new_model, old_model);
    assert!(world.scene.get_node(old_model).is_none());
    assert!(world.scene.get_node(old_foot).is_none());
    assert_eq!(world.scene.get_node(root).unwrap().children(), &[new_model]);

    // The shoe survived and sits on the new foot.
    let resolver = &world.equipment(key).unwrap().resolver;
    assert!(resolver.is_attached());
    let new_foot = resolver.attached_to().unwrap();
    assert!(world.scene.is_descendant_of(new_foot, new_model));
    assert_eq!(world.scene.get_node(shoe).unwrap().parent(), Some(new_foot));
    assert_eq!(world.pending_timers(), 0);

    // The controller drives the new skeleton.
    let hips = world.scene.find_node_by_name(new_model, "Hips").unwrap();
    let rest_y = world.scene.get_node(hips).unwrap().transform.position.y;
    world.tick(0.4);
    let lifted = world.scene.get_node(hips).unwrap().transform.position.y;
    assert!(lifted > rest_y + 0.01, "rest {rest_y}, lifted {lifted}");
    assert_eq!(stance(&world, avatar).as_deref(), Some("Victory"));
}
