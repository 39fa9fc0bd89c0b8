//! Runtime bone attachment.
//!
//! One [`AttachmentResolver`] belongs to one equipped item. It waits for the
//! item's model, then polls until the avatar's skinned model is present and
//! parents the model under the first candidate bone found.
//!
//! ```text
//! Unattached --model loaded--> Attempting --bone found--> Attached
//!                                  |  ^                       |
//!                                  +--+ retry (not ready /    | detach
//!                                        no bone, warn once)  v
//!                                                          Removed
//! ```

use rustc_hash::{FxHashMap, FxHashSet};

use crate::attachment::equipment::{AttachmentOffset, EquipmentAttachmentSpec};
use crate::attachment::targets::{BoneCandidates, attachment_target};
use crate::runtime::timer::CancellationToken;
use crate::scene::{NodeHandle, Scene};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentState {
    /// Waiting for the equipment's own model.
    Unattached,
    /// Polling the avatar for a matching bone.
    Attempting,
    Attached,
    Removed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolveOutcome {
    Attached {
        bone: String,
        node: NodeHandle,
        used_fallback: bool,
    },
    /// Try again after this many seconds.
    RetryAfter(f32),
    /// The event does not apply in the current state.
    Ignored,
}

#[derive(Debug)]
pub struct AttachmentResolver {
    target: String,
    candidates: BoneCandidates,
    offset: AttachmentOffset,
    avatar_root: NodeHandle,
    retry_interval: f32,

    state: AttachmentState,
    visual: Option<NodeHandle>,
    attached_to: Option<NodeHandle>,
    resolved_bone: Option<String>,

    warned: FxHashSet<String>,
    warning_count: usize,
    attempts: u32,
    token: CancellationToken,
}

impl AttachmentResolver {
    #[must_use]
    pub fn new(spec: &EquipmentAttachmentSpec, avatar_root: NodeHandle, retry_interval: f32) -> Self {
        Self::with_candidates(
            &spec.attachment_node,
            spec.candidates(),
            spec.offset,
            avatar_root,
            retry_interval,
        )
    }

    /// `candidates` must start with the primary bone.
    #[must_use]
    pub fn with_candidates(
        target: &str,
        candidates: BoneCandidates,
        offset: AttachmentOffset,
        avatar_root: NodeHandle,
        retry_interval: f32,
    ) -> Self {
        Self {
            target: target.to_string(),
            candidates,
            offset,
            avatar_root,
            retry_interval: retry_interval.max(0.0),
            state: AttachmentState::Unattached,
            visual: None,
            attached_to: None,
            resolved_bone: None,
            warned: FxHashSet::default(),
            warning_count: 0,
            attempts: 0,
            token: CancellationToken::new(),
        }
    }

    /// A new, unattached resolver for the same target, candidates and avatar.
    #[must_use]
    pub fn restarted(&self) -> Self {
        Self::with_candidates(
            &self.target,
            self.candidates.clone(),
            self.offset,
            self.avatar_root,
            self.retry_interval,
        )
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> AttachmentState {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.state == AttachmentState::Attached
    }

    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    #[must_use]
    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Candidate that matched, once attached.
    #[must_use]
    pub fn resolved_bone(&self) -> Option<&str> {
        self.resolved_bone.as_deref()
    }

    #[must_use]
    pub fn attached_to(&self) -> Option<NodeHandle> {
        self.attached_to
    }

    #[must_use]
    pub fn visual(&self) -> Option<NodeHandle> {
        self.visual
    }

    /// Number of missing-bone diagnostics emitted so far.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Token cancelled when the resolver is removed. Pending retries hold a
    /// clone and must not fire once it is cancelled.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// The equipment's model finished loading; `visual` is its root node.
    ///
    /// Only the first call starts resolution. Later calls are ignored, so a
    /// resolver never attaches twice.
    pub fn on_model_loaded(&mut self, scene: &mut Scene, visual: NodeHandle) -> ResolveOutcome {
        if self.state != AttachmentState::Unattached {
            log::debug!(
                "Model loaded for '{}' in state {:?}, ignoring",
                self.target,
                self.state
            );
            return ResolveOutcome::Ignored;
        }
        self.visual = Some(visual);
        self.state = AttachmentState::Attempting;
        self.attempt(scene)
    }

    /// A scheduled retry fired.
    pub fn retry(&mut self, scene: &mut Scene) -> ResolveOutcome {
        if self.state != AttachmentState::Attempting || self.token.is_cancelled() {
            return ResolveOutcome::Ignored;
        }
        self.attempt(scene)
    }

    fn attempt(&mut self, scene: &mut Scene) -> ResolveOutcome {
        self.attempts += 1;

        let Some(visual) = self.visual else {
            return ResolveOutcome::Ignored;
        };

        if scene.find_skinned_mesh(self.avatar_root).is_none() {
            log::debug!(
                "Avatar not ready for '{}' (attempt {}), retrying in {}s",
                self.target,
                self.attempts,
                self.retry_interval
            );
            return ResolveOutcome::RetryAfter(self.retry_interval);
        }

        let Some((candidate_index, bone)) = self.find_bone(scene) else {
            if self.warned.insert(self.target.clone()) {
                self.warning_count += 1;
                let category = attachment_target(&self.target).map_or("custom", |t| t.category.as_str());
                log::warn!(
                    "No bone for {category} attachment '{}' (tried {:?})",
                    self.target,
                    self.candidates
                );
            }
            return ResolveOutcome::RetryAfter(self.retry_interval);
        };

        if !scene.attach(visual, bone) {
            return ResolveOutcome::RetryAfter(self.retry_interval);
        }
        if let Some(node) = scene.get_node_mut(visual) {
            self.offset.apply_to(&mut node.transform);
        }
        scene.update_subtree(visual);

        let bone_name = self.candidates[candidate_index].clone();
        let used_fallback = candidate_index > 0;
        if used_fallback {
            log::info!(
                "Attachment '{}' resolved via fallback bone '{}'",
                self.target,
                bone_name
            );
        } else {
            log::debug!("Attachment '{}' resolved to '{}'", self.target, bone_name);
        }

        self.state = AttachmentState::Attached;
        self.attached_to = Some(bone);
        self.resolved_bone = Some(bone_name.clone());

        ResolveOutcome::Attached {
            bone: bone_name,
            node: bone,
            used_fallback,
        }
    }

    /// First candidate present below the avatar root, outside the visual's
    /// own subtree. Candidate order wins over traversal order; among
    /// same-named nodes the first in pre-order is taken.
    fn find_bone(&self, scene: &Scene) -> Option<(usize, NodeHandle)> {
        let mut by_name: FxHashMap<&str, NodeHandle> = FxHashMap::default();
        for handle in scene.traverse(self.avatar_root) {
            if let Some(visual) = self.visual
                && scene.is_descendant_of(handle, visual)
            {
                continue;
            }
            if let Some(name) = scene.get_name(handle) {
                by_name.entry(name).or_insert(handle);
            }
        }

        self.candidates
            .iter()
            .enumerate()
            .find_map(|(i, name)| by_name.get(name.as_str()).map(|&h| (i, h)))
    }

    /// Removes the resolver. If attached, the visual is unparented from its
    /// bone and becomes a scene root. Returns whether anything was detached.
    pub fn detach(&mut self, scene: &mut Scene) -> bool {
        self.token.cancel();
        let was_attached = self.state == AttachmentState::Attached;
        self.state = AttachmentState::Removed;

        if !was_attached {
            return false;
        }

        self.attached_to = None;
        match self.visual {
            Some(visual) => scene.detach(visual),
            None => false,
        }
    }
}
