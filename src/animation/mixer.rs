use glam::{Quat, Vec3};
use rustc_hash::FxHashMap;

use crate::animation::action::{AnimationAction, TrackValue};
use crate::animation::binding::{RestValue, TargetPath};
use crate::animation::values::Interpolatable;
use crate::scene::{NodeHandle, Scene};

/// Running weighted blend for one bone property.
#[derive(Debug, Clone, Copy)]
enum Accumulator {
    Translation { value: Vec3, weight: f32, rest: Vec3 },
    Rotation { value: Quat, weight: f32, rest: Quat },
}

impl Accumulator {
    fn start(rest: RestValue) -> Self {
        match rest {
            RestValue::Translation(rest) => Accumulator::Translation {
                value: rest,
                weight: 0.0,
                rest,
            },
            RestValue::Rotation(rest) => Accumulator::Rotation {
                value: rest,
                weight: 0.0,
                rest,
            },
        }
    }

    fn add(&mut self, sample: TrackValue, w: f32) {
        match (self, sample) {
            (Accumulator::Translation { value, weight, .. }, TrackValue::Vector3(v)) => {
                *value = Vec3::blend_weighted(*value, *weight, v, w);
                *weight += w;
            }
            (Accumulator::Rotation { value, weight, .. }, TrackValue::Quaternion(q)) => {
                *value = Quat::blend_weighted(*value, *weight, q, w);
                *weight += w;
            }
            _ => {}
        }
    }

    fn weight(&self) -> f32 {
        match self {
            Accumulator::Translation { weight, .. } | Accumulator::Rotation { weight, .. } => *weight,
        }
    }

    fn rest(&self) -> RestValue {
        match *self {
            Accumulator::Translation { rest, .. } => RestValue::Translation(rest),
            Accumulator::Rotation { rest, .. } => RestValue::Rotation(rest),
        }
    }

    /// Fills any weight short of 1.0 with the rest value.
    fn resolve(self) -> TrackValue {
        match self {
            Accumulator::Translation {
                value,
                weight,
                rest,
            } => {
                if weight < 1.0 {
                    TrackValue::Vector3(Vec3::blend_weighted(value, weight, rest, 1.0 - weight))
                } else {
                    TrackValue::Vector3(value)
                }
            }
            Accumulator::Rotation {
                value,
                weight,
                rest,
            } => {
                if weight < 1.0 {
                    TrackValue::Quaternion(
                        Quat::blend_weighted(value, weight, rest, 1.0 - weight).normalize(),
                    )
                } else {
                    TrackValue::Quaternion(value.normalize())
                }
            }
        }
    }
}

/// Owns the actions of one animated hierarchy and writes their blended pose
/// into the scene.
#[derive(Default)]
pub struct AnimationMixer {
    actions: Vec<AnimationAction>,
    /// Properties written by the last update, with their rest values.
    written: FxHashMap<(NodeHandle, TargetPath), RestValue>,
}

impl AnimationMixer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an action and returns its index.
    pub fn add_action(&mut self, action: AnimationAction) -> usize {
        self.actions.push(action);
        self.actions.len() - 1
    }

    #[must_use]
    pub fn actions(&self) -> &[AnimationAction] {
        &self.actions
    }

    #[must_use]
    pub fn action(&self, index: usize) -> Option<&AnimationAction> {
        self.actions.get(index)
    }

    pub fn action_mut(&mut self, index: usize) -> Option<&mut AnimationAction> {
        self.actions.get_mut(index)
    }

    /// Index of the first action whose clip is called `name` (exact match).
    #[must_use]
    pub fn find_action(&self, name: &str) -> Option<usize> {
        self.actions.iter().position(|a| a.name() == name)
    }

    /// Advances every action by `dt`, then blends their samples and writes
    /// the result to the bound nodes.
    pub fn update(&mut self, dt: f32, scene: &mut Scene) {
        for action in &mut self.actions {
            action.update(dt);
        }

        let mut blend: FxHashMap<(NodeHandle, TargetPath), Accumulator> = FxHashMap::default();

        for action in &mut self.actions {
            if !action.is_running() {
                continue;
            }
            let weight = action.weight;

            for i in 0..action.bindings.len() {
                let binding = action.bindings[i];
                let Some(sample) = action.sample_track(binding.track_index) else {
                    continue;
                };
                blend
                    .entry((binding.node_handle, binding.target))
                    .or_insert_with(|| Accumulator::start(binding.rest))
                    .add(sample, weight);
            }
        }

        // No running action drives these any more: put them back at rest.
        for (key, rest) in &self.written {
            blend.entry(*key).or_insert_with(|| Accumulator::start(*rest));
        }

        self.written.clear();
        for ((node_handle, target), acc) in blend {
            let Some(node) = scene.get_node_mut(node_handle) else {
                continue;
            };
            if acc.weight() > 0.0 {
                self.written.insert((node_handle, target), acc.rest());
            }
            match acc.resolve() {
                TrackValue::Vector3(v) => node.transform.position = v,
                TrackValue::Quaternion(q) => node.transform.rotation = q,
            }
        }
    }
}
