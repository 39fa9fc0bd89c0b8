//! Authored stance clips.
//!
//! Rotations are relative to the T-pose bind rotation (identity). Every clip
//! returns to its first key so the player can loop it without a pop.

use glam::{Quat, Vec3};

use crate::animation::{AnimationClip, Track};

pub const IDLE: &str = "Idle";
pub const ACTION: &str = "Action";
pub const VICTORY: &str = "Victory";

/// Names of every authored clip, in export order.
pub const CLIP_NAMES: [&str; 3] = [IDLE, ACTION, VICTORY];

const BREATH_ANGLE: f32 = 0.04;
const BREATH_PERIOD: f32 = 2.0;

/// Slow chest pitch that reads as breathing.
#[must_use]
pub fn idle_clip() -> AnimationClip {
    let half = BREATH_PERIOD * 0.5;
    AnimationClip::new(
        IDLE,
        vec![Track::rotation(
            "Chest",
            &[
                (0.0, Quat::IDENTITY),
                (half, Quat::from_rotation_x(BREATH_ANGLE)),
                (BREATH_PERIOD, Quat::IDENTITY),
            ],
        )],
    )
}

/// Right-hand punch: the arm winds back, then strikes forward while the hips
/// twist against it.
#[must_use]
pub fn action_clip() -> AnimationClip {
    // The right arm points along -X; +Y rotation swings it toward +Z.
    let wind_up = Quat::from_rotation_y(-0.6);
    let strike = Quat::from_rotation_y(1.4);

    AnimationClip::new(
        ACTION,
        vec![
            Track::rotation(
                "RightArm",
                &[
                    (0.0, Quat::IDENTITY),
                    (0.25, wind_up),
                    (0.45, strike),
                    (0.8, Quat::IDENTITY),
                ],
            ),
            Track::rotation(
                "Hips",
                &[
                    (0.0, Quat::IDENTITY),
                    (0.25, Quat::from_rotation_y(0.15)),
                    (0.45, Quat::from_rotation_y(-0.25)),
                    (0.8, Quat::IDENTITY),
                ],
            ),
        ],
    )
}

/// Both arms raised overhead with a small wave, bouncing on the hips.
///
/// `hips_rest` is the root bone's bind offset; the bounce is added to it since
/// a position track replaces the bone's translation. `bounce` is in meters.
#[must_use]
pub fn victory_clip(hips_rest: Vec3, bounce: f32) -> AnimationClip {
    const RAISE: f32 = 1.2;
    const WAVE: f32 = 0.25;
    let times = [0.0, 0.4, 0.8, 1.2, 1.6];

    let wave_keys = |sign: f32| -> Vec<(f32, Quat)> {
        times
            .iter()
            .enumerate()
            .map(|(i, &t)| {
                let angle = if i % 2 == 0 { RAISE } else { RAISE + WAVE };
                (t, Quat::from_rotation_z(sign * angle))
            })
            .collect()
    };

    let bounce_keys: Vec<(f32, Vec3)> = times
        .iter()
        .enumerate()
        .map(|(i, &t)| {
            let lift = if i % 2 == 0 { 0.0 } else { bounce };
            (t, hips_rest + Vec3::Y * lift)
        })
        .collect();

    AnimationClip::new(
        VICTORY,
        vec![
            // Left arm points along +X, so +Z rotation lifts it.
            Track::rotation("LeftArm", &wave_keys(1.0)),
            Track::rotation("RightArm", &wave_keys(-1.0)),
            Track::position("Hips", &bounce_keys),
        ],
    )
}

/// The three stance clips for a rig whose root rests at `hips_rest`.
#[must_use]
pub fn authored_clips(hips_rest: Vec3, body_height: f32) -> Vec<AnimationClip> {
    vec![
        idle_clip(),
        action_clip(),
        victory_clip(hips_rest, body_height * 0.04),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::TrackData;

    #[test]
    fn clips_loop_seamlessly() {
        for clip in authored_clips(Vec3::new(0.0, 0.5, 0.0), 1.2) {
            assert!(clip.validate().is_ok());
            for track in &clip.tracks {
                match &track.data {
                    TrackData::Quaternion(t) => {
                        let first = t.values[0];
                        let last = t.values[t.values.len() - 1];
                        assert!(first.angle_between(last) < 1e-5, "{}", track.target_path());
                    }
                    TrackData::Vector3(t) => {
                        let first = t.values[0];
                        let last = t.values[t.values.len() - 1];
                        assert!(first.distance(last) < 1e-6, "{}", track.target_path());
                    }
                }
            }
        }
    }

    #[test]
    fn victory_bounce_stays_above_rest() {
        let rest = Vec3::new(0.0, 0.5, 0.0);
        let clip = victory_clip(rest, 0.05);
        let hips = clip
            .tracks
            .iter()
            .find(|t| t.target_path() == "Hips.position")
            .unwrap();
        let TrackData::Vector3(track) = &hips.data else {
            panic!("expected a position track");
        };
        assert!(track.values.iter().all(|v| v.y >= rest.y - 1e-6));
        assert!((clip.duration - 1.6).abs() < 1e-6);
    }
}
