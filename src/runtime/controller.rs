use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::animation::{AnimationAction, AnimationClip, AnimationMixer, Binder};
use crate::scene::{NodeHandle, Scene};
use crate::settings::RuntimeSettings;

/// Plays stance clips on one avatar, cross-fading between them.
///
/// Stances are looked up case-insensitively. Requesting an unknown stance
/// logs and leaves playback untouched. Requesting the current stance again
/// restarts it.
pub struct AnimationPlaybackController {
    mixer: AnimationMixer,
    /// Lower-cased clip name -> action index in the mixer.
    stances: FxHashMap<String, usize>,
    current: Option<usize>,
    crossfade_duration: f32,
    initial_stance: Option<String>,
    loaded: bool,
}

impl AnimationPlaybackController {
    #[must_use]
    pub fn new(settings: &RuntimeSettings) -> Self {
        Self {
            mixer: AnimationMixer::new(),
            stances: FxHashMap::default(),
            current: None,
            crossfade_duration: settings.crossfade_duration.max(0.0),
            initial_stance: settings.initial_stance.clone(),
            loaded: false,
        }
    }

    #[must_use]
    pub fn with_crossfade(mut self, duration: f32) -> Self {
        self.crossfade_duration = duration.max(0.0);
        self
    }

    #[must_use]
    pub fn with_initial_stance(mut self, stance: Option<String>) -> Self {
        self.initial_stance = stance;
        self
    }

    /// Binds `clips` to the hierarchy under `root` and indexes them by
    /// lower-cased name. All actions start disabled; the initial stance, if
    /// any, is then played.
    pub fn on_model_loaded(&mut self, scene: &Scene, root: NodeHandle, clips: &[AnimationClip]) {
        if self.loaded {
            log::debug!("Animation controller already loaded, ignoring");
            return;
        }

        for clip in clips {
            let key = clip.name.to_lowercase();
            if self.stances.contains_key(&key) {
                log::warn!("Duplicate stance '{}' (case-insensitive), keeping the first", clip.name);
                continue;
            }

            let mut action = AnimationAction::new(Arc::new(clip.clone()));
            action.bindings = Binder::bind(scene, root, clip);
            action.enabled = false;
            action.weight = 0.0;

            let index = self.mixer.add_action(action);
            self.stances.insert(key, index);
        }
        self.loaded = true;

        log::debug!("Animation controller indexed {} stances", self.stances.len());

        if let Some(stance) = self.initial_stance.clone() {
            self.play_stance(&stance);
        }
    }

    /// Drops every action and binding so a replacement model can be loaded.
    pub fn unload(&mut self) {
        self.mixer = AnimationMixer::new();
        self.stances.clear();
        self.current = None;
        self.loaded = false;
    }

    #[inline]
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    #[must_use]
    pub fn has_stance(&self, name: &str) -> bool {
        self.stances.contains_key(&name.to_lowercase())
    }

    /// Clip name of the stance most recently started.
    #[must_use]
    pub fn current_stance(&self) -> Option<&str> {
        self.current
            .and_then(|i| self.mixer.action(i))
            .map(AnimationAction::name)
    }

    #[must_use]
    pub fn crossfade_duration(&self) -> f32 {
        self.crossfade_duration
    }

    #[must_use]
    pub fn mixer(&self) -> &AnimationMixer {
        &self.mixer
    }

    /// Cross-fades into the stance called `name` (any case).
    /// Returns false when the stance is unknown or clips are not loaded yet.
    pub fn play_stance(&mut self, name: &str) -> bool {
        if !self.loaded {
            log::debug!("play_stance('{name}') before clips loaded, ignoring");
            return false;
        }

        let Some(&next) = self.stances.get(&name.to_lowercase()) else {
            log::warn!("Unknown stance '{name}', keeping current playback");
            return false;
        };

        let fade = self.crossfade_duration;
        if let Some(current) = self.current
            && current != next
            && let Some(action) = self.mixer.action_mut(current)
        {
            action.fade_out(fade);
        }

        if let Some(action) = self.mixer.action_mut(next) {
            action.reset();
            action.fade_in(fade);
        }
        self.current = Some(next);

        log::debug!("Stance -> '{name}' (fade {fade}s)");
        true
    }

    /// Advances playback. Must be called every frame.
    pub fn update(&mut self, dt: f32, scene: &mut Scene) {
        if self.loaded {
            self.mixer.update(dt, scene);
        }
    }
}
