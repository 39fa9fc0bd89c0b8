use slotmap::{SlotMap, new_key_type};

use crate::animation::AnimationClip;
use crate::assets::AvatarLoader;
use crate::attachment::{AttachmentResolver, EquipmentAttachmentSpec, ResolveOutcome};
use crate::errors::{MannequinError, Result};
use crate::runtime::behaviors::{BehaviorConfig, BehaviorRegistry, register_builtin_behaviors};
use crate::runtime::controller::AnimationPlaybackController;
use crate::runtime::timer::TimerQueue;
use crate::scene::{NodeHandle, Scene};
use crate::settings::RuntimeSettings;

new_key_type! {
    pub struct AvatarKey;
    pub struct EquipmentKey;
}

pub struct Avatar {
    /// Entity node; the loaded model is placed under it.
    pub root: NodeHandle,
    pub model_root: Option<NodeHandle>,
    pub clips: Vec<AnimationClip>,
    pub animation: Option<AnimationPlaybackController>,
}

pub struct Equipment {
    pub avatar: AvatarKey,
    /// Entity node; the item's model is loaded under it.
    pub node: NodeHandle,
    pub asset_path: String,
    pub resolver: AttachmentResolver,
}

/// What [`AvatarWorld::add_behavior`] created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BehaviorHandle {
    Equipment(EquipmentKey),
    Animation(AvatarKey),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerTask {
    RetryAttachment(EquipmentKey),
}

/// Single-threaded host: owns the scene, the avatars, their equipment and
/// the retry timers, and advances everything once per frame via [`tick`].
///
/// [`tick`]: AvatarWorld::tick
pub struct AvatarWorld {
    pub scene: Scene,
    settings: RuntimeSettings,
    timers: TimerQueue<TimerTask>,
    avatars: SlotMap<AvatarKey, Avatar>,
    equipment: SlotMap<EquipmentKey, Equipment>,
    behaviors: BehaviorRegistry,
}

impl Default for AvatarWorld {
    fn default() -> Self {
        Self::new(RuntimeSettings::default())
    }
}

impl AvatarWorld {
    #[must_use]
    pub fn new(settings: RuntimeSettings) -> Self {
        let mut behaviors = BehaviorRegistry::new();
        register_builtin_behaviors(&mut behaviors);
        Self {
            scene: Scene::new(),
            settings,
            timers: TimerQueue::new(),
            avatars: SlotMap::with_key(),
            equipment: SlotMap::with_key(),
            behaviors,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    #[must_use]
    pub fn behaviors(&self) -> &BehaviorRegistry {
        &self.behaviors
    }

    pub fn behaviors_mut(&mut self) -> &mut BehaviorRegistry {
        &mut self.behaviors
    }

    #[must_use]
    pub fn avatar(&self, key: AvatarKey) -> Option<&Avatar> {
        self.avatars.get(key)
    }

    #[must_use]
    pub fn equipment(&self, key: EquipmentKey) -> Option<&Equipment> {
        self.equipment.get(key)
    }

    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    // ========================================================================
    // Avatars
    // ========================================================================

    pub fn spawn_avatar(&mut self, name: &str) -> AvatarKey {
        let root = self.scene.create_node_with_name(name);
        self.scene.root_nodes.push(root);
        self.avatars.insert(Avatar {
            root,
            model_root: None,
            clips: Vec::new(),
            animation: None,
        })
    }

    /// Instantiates the avatar's model from GLB bytes and hands its clips to
    /// the animation controller, if one is attached.
    ///
    /// A previously loaded model is replaced: its subtree is removed, the
    /// controller rebinds to the new clips and equipment attached to the old
    /// bones is resolved again against the new ones.
    pub fn load_avatar_model(&mut self, key: AvatarKey, bytes: &[u8]) -> Result<()> {
        let root = self
            .avatars
            .get(key)
            .map(|a| a.root)
            .ok_or_else(|| MannequinError::UnknownEntity(format!("avatar {key:?}")))?;

        let model = AvatarLoader::load_slice(bytes, &mut self.scene, Some(root))?;

        let previous = self.avatars.get_mut(key).and_then(|a| a.model_root.take());
        let reattach = match previous {
            Some(previous) => {
                log::info!("Replacing model of avatar {key:?}");
                let reattach = self.release_equipment(key);
                self.scene.remove_node(previous);
                reattach
            }
            None => Vec::new(),
        };

        if let Some(avatar) = self.avatars.get_mut(key) {
            avatar.model_root = Some(model.root);
            avatar.clips = model.clips;
            if let Some(controller) = avatar.animation.as_mut() {
                if previous.is_some() {
                    controller.unload();
                }
                controller.on_model_loaded(&self.scene, model.root, &avatar.clips);
            }
        }

        for (item, visual) in reattach {
            self.equipment_model_loaded(item, visual);
        }
        Ok(())
    }

    /// Detaches every item attached to `avatar` and gives each a fresh
    /// resolver. Returns the items with their visuals, ready to resolve again.
    fn release_equipment(&mut self, avatar: AvatarKey) -> Vec<(EquipmentKey, NodeHandle)> {
        let mut released = Vec::new();
        for (key, item) in &mut self.equipment {
            if item.avatar != avatar || !item.resolver.is_attached() {
                continue;
            }
            let Some(visual) = item.resolver.visual() else {
                continue;
            };
            item.resolver.detach(&mut self.scene);
            item.resolver = item.resolver.restarted();
            released.push((key, visual));
        }
        released
    }

    /// Returns false if the avatar is unknown or has no animation controller.
    pub fn play_stance(&mut self, key: AvatarKey, stance: &str) -> bool {
        self.avatars
            .get_mut(key)
            .and_then(|a| a.animation.as_mut())
            .is_some_and(|c| c.play_stance(stance))
    }

    // ========================================================================
    // Behaviors
    // ========================================================================

    /// Instantiates the behavior registered as `name` on `avatar`.
    pub fn add_behavior(
        &mut self,
        avatar: AvatarKey,
        name: &str,
        props: &serde_json::Value,
    ) -> Result<BehaviorHandle> {
        if !self.avatars.contains_key(avatar) {
            return Err(MannequinError::UnknownEntity(format!("avatar {avatar:?}")));
        }

        match self.behaviors.create(name, props)? {
            BehaviorConfig::BoneAttachment(props) => {
                let spec = props.to_spec();
                self.equip(avatar, &spec)
                    .map(BehaviorHandle::Equipment)
                    .ok_or_else(|| MannequinError::UnknownEntity(format!("avatar {avatar:?}")))
            }
            BehaviorConfig::AvatarAnimation(props) => {
                let mut controller = AnimationPlaybackController::new(&self.settings);
                if let Some(fade) = props.crossfade_duration {
                    controller = controller.with_crossfade(fade);
                }
                if props.initial_stance.is_some() {
                    controller = controller.with_initial_stance(props.initial_stance);
                }

                let Some(entry) = self.avatars.get_mut(avatar) else {
                    return Err(MannequinError::UnknownEntity(format!("avatar {avatar:?}")));
                };
                if let Some(model_root) = entry.model_root {
                    controller.on_model_loaded(&self.scene, model_root, &entry.clips);
                }
                if entry.animation.is_some() {
                    log::warn!("Replacing animation controller on avatar {avatar:?}");
                }
                entry.animation = Some(controller);
                Ok(BehaviorHandle::Animation(avatar))
            }
        }
    }

    // ========================================================================
    // Equipment
    // ========================================================================

    /// Creates an equipment entity for `spec` on `avatar`. Resolution starts
    /// once the item's model is loaded.
    pub fn equip(&mut self, avatar: AvatarKey, spec: &EquipmentAttachmentSpec) -> Option<EquipmentKey> {
        let avatar_root = self.avatars.get(avatar)?.root;
        let node = self
            .scene
            .create_node_with_name(&format!("equipment:{}", spec.attachment_node));
        self.scene.root_nodes.push(node);

        let resolver = AttachmentResolver::new(spec, avatar_root, self.settings.retry_interval);
        log::debug!(
            "Equipping '{}' on '{}' (candidates {:?})",
            spec.asset_path,
            spec.attachment_node,
            resolver.candidates()
        );

        Some(self.equipment.insert(Equipment {
            avatar,
            node,
            asset_path: spec.asset_path.clone(),
            resolver,
        }))
    }

    /// The item's model is ready; `visual` is its root node.
    pub fn equipment_model_loaded(&mut self, key: EquipmentKey, visual: NodeHandle) -> ResolveOutcome {
        let Some(item) = self.equipment.get_mut(key) else {
            return ResolveOutcome::Ignored;
        };
        let outcome = item.resolver.on_model_loaded(&mut self.scene, visual);
        self.schedule_retry(key, &outcome);
        outcome
    }

    /// Loads the item's model from GLB bytes under its entity node, then
    /// reports it loaded.
    pub fn load_equipment_model(&mut self, key: EquipmentKey, bytes: &[u8]) -> Result<ResolveOutcome> {
        let Some(item) = self.equipment.get(key) else {
            return Ok(ResolveOutcome::Ignored);
        };
        let model = AvatarLoader::load_slice(bytes, &mut self.scene, Some(item.node))?;
        Ok(self.equipment_model_loaded(key, model.root))
    }

    /// Removes an equipment entity, detaching it from its bone first.
    /// Returns false if the key is stale.
    pub fn unequip(&mut self, key: EquipmentKey) -> bool {
        let Some(mut item) = self.equipment.remove(key) else {
            return false;
        };
        item.resolver.detach(&mut self.scene);
        if let Some(visual) = item.resolver.visual() {
            self.scene.remove_node(visual);
        }
        self.scene.remove_node(item.node);
        true
    }

    fn schedule_retry(&mut self, key: EquipmentKey, outcome: &ResolveOutcome) {
        if let ResolveOutcome::RetryAfter(delay) = *outcome
            && let Some(item) = self.equipment.get(key)
        {
            self.timers.schedule(
                delay,
                TimerTask::RetryAttachment(key),
                Some(item.resolver.token()),
            );
        }
    }

    // ========================================================================
    // Frame
    // ========================================================================

    /// Fires due retries, advances animation, then updates world matrices.
    pub fn tick(&mut self, dt: f32) {
        for task in self.timers.advance(dt) {
            match task {
                TimerTask::RetryAttachment(key) => {
                    let Some(item) = self.equipment.get_mut(key) else {
                        continue;
                    };
                    let outcome = item.resolver.retry(&mut self.scene);
                    self.schedule_retry(key, &outcome);
                }
            }
        }

        for avatar in self.avatars.values_mut() {
            if let Some(controller) = avatar.animation.as_mut() {
                controller.update(dt, &mut self.scene);
            }
        }

        self.scene.update();
    }
}
