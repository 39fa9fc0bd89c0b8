use std::sync::Arc;

use glam::{Quat, Vec3};

use crate::animation::{
    binding::PropertyBinding,
    clip::{AnimationClip, TrackData},
    tracks::KeyframeCursor,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopMode {
    Once,
    Loop,
    PingPong,
}

/// A linear weight ramp in progress.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Fade {
    from: f32,
    to: f32,
    duration: f32,
    elapsed: f32,
}

impl Fade {
    fn current(&self) -> f32 {
        if self.duration <= 0.0 {
            return self.to;
        }
        let t = (self.elapsed / self.duration).clamp(0.0, 1.0);
        self.from + (self.to - self.from) * t
    }

    fn finished(&self) -> bool {
        self.elapsed >= self.duration
    }
}

/// Playback state of one clip: time, looping, weight and fades.
#[derive(Debug, Clone)]
pub struct AnimationAction {
    clip: Arc<AnimationClip>,

    pub time: f32,
    pub time_scale: f32,
    pub weight: f32,
    pub loop_mode: LoopMode,
    pub paused: bool,
    pub enabled: bool,

    pub bindings: Vec<PropertyBinding>,

    pub(crate) track_cursors: Vec<KeyframeCursor>,
    /// Unwrapped playback clock; `time` is derived from it per loop mode.
    clock: f32,
    fade: Option<Fade>,
}

impl AnimationAction {
    #[must_use]
    pub fn new(clip: Arc<AnimationClip>) -> Self {
        let track_count = clip.tracks.len();
        Self {
            clip,
            time: 0.0,
            time_scale: 1.0,
            weight: 1.0,
            loop_mode: LoopMode::Loop,
            paused: false,
            enabled: true,
            bindings: Vec::new(),
            track_cursors: vec![KeyframeCursor::default(); track_count],
            clock: 0.0,
            fade: None,
        }
    }

    #[must_use]
    pub fn clip(&self) -> &Arc<AnimationClip> {
        &self.clip
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.clip.name
    }

    /// Rewinds to the start and clears any fade. Does not change `enabled`.
    pub fn reset(&mut self) {
        self.time = 0.0;
        self.clock = 0.0;
        self.paused = false;
        self.fade = None;
        self.track_cursors.fill(KeyframeCursor::default());
    }

    /// Enables the action and ramps its weight from 0 to 1 over `duration`.
    pub fn fade_in(&mut self, duration: f32) {
        self.enabled = true;
        self.weight = 0.0;
        self.fade = Some(Fade {
            from: 0.0,
            to: 1.0,
            duration,
            elapsed: 0.0,
        });
        if duration <= 0.0 {
            self.weight = 1.0;
            self.fade = None;
        }
    }

    /// Ramps the weight from its current value to 0 over `duration`, then
    /// disables the action.
    pub fn fade_out(&mut self, duration: f32) {
        if !self.enabled {
            return;
        }
        if duration <= 0.0 {
            self.weight = 0.0;
            self.enabled = false;
            self.fade = None;
            return;
        }
        self.fade = Some(Fade {
            from: self.weight,
            to: 0.0,
            duration,
            elapsed: 0.0,
        });
    }

    #[must_use]
    pub fn is_fading(&self) -> bool {
        self.fade.is_some()
    }

    /// True while the action contributes to the pose.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.enabled && self.weight > 0.0
    }

    /// Core logic: advance time and fades.
    pub fn update(&mut self, dt: f32) {
        if !self.enabled {
            return;
        }

        if let Some(fade) = &mut self.fade {
            fade.elapsed += dt;
            self.weight = fade.current();
            if fade.finished() {
                let target = fade.to;
                self.fade = None;
                if target <= 0.0 {
                    self.enabled = false;
                }
            }
        }

        if self.paused {
            return;
        }

        let duration = self.clip.duration;
        if duration <= 0.0 {
            return;
        }

        self.clock += dt * self.time_scale;

        match self.loop_mode {
            LoopMode::Once => {
                if self.clock >= duration {
                    self.clock = duration;
                    self.paused = true;
                } else if self.clock < 0.0 {
                    self.clock = 0.0;
                    self.paused = true;
                }
                self.time = self.clock;
            }
            LoopMode::Loop => {
                self.clock = self.clock.rem_euclid(duration);
                self.time = self.clock;
            }
            LoopMode::PingPong => {
                let double_duration = duration * 2.0;
                self.clock = self.clock.rem_euclid(double_duration);
                // Second half of the cycle plays backward.
                self.time = if self.clock > duration {
                    double_duration - self.clock
                } else {
                    self.clock
                };
            }
        }
    }

    /// Gets the value of the specified track at the current time.
    pub fn sample_track(&mut self, track_index: usize) -> Option<TrackValue> {
        let track = self.clip.tracks.get(track_index)?;
        let cursor = self.track_cursors.get_mut(track_index)?;

        match &track.data {
            TrackData::Vector3(t) => t
                .sample_with_cursor(self.time, cursor)
                .map(TrackValue::Vector3),
            TrackData::Quaternion(t) => t
                .sample_with_cursor(self.time, cursor)
                .map(TrackValue::Quaternion),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackValue {
    Vector3(Vec3),
    Quaternion(Quat),
}
