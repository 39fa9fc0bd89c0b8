use crate::animation::values::Interpolatable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpolationMode {
    Linear,
    Step,
}

/// How far the cursor scans linearly before falling back to binary search.
const MAX_SCAN_OFFSET: usize = 3;

/// Remembers the last keyframe interval a track was sampled in, so that
/// monotonic playback resolves the next interval in O(1).
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyframeCursor {
    pub last_index: usize,
}

/// A time-ordered sequence of values driving one bone property.
///
/// `times` must be strictly increasing and `values.len() == times.len()`;
/// [`AnimationClip::validate`](crate::animation::AnimationClip::validate)
/// enforces this for authored clips.
#[derive(Debug, Clone)]
pub struct KeyframeTrack<T: Interpolatable> {
    pub times: Vec<f32>,
    pub values: Vec<T>,
    pub interpolation: InterpolationMode,
}

impl<T: Interpolatable> KeyframeTrack<T> {
    #[must_use]
    pub fn new(times: Vec<f32>, values: Vec<T>, interpolation: InterpolationMode) -> Self {
        Self {
            times,
            values,
            interpolation,
        }
    }

    /// Builds a linear track from `(time, value)` pairs.
    #[must_use]
    pub fn linear(keys: &[(f32, T)]) -> Self {
        let (times, values) = keys.iter().copied().unzip();
        Self::new(times, values, InterpolationMode::Linear)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    #[must_use]
    pub fn end_time(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }

    /// Stateless sample. Returns `None` for an empty track.
    #[must_use]
    pub fn sample(&self, time: f32) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let next_idx = self.times.partition_point(|&t| t <= time);
        Some(self.sample_at_frame(next_idx.saturating_sub(1), time))
    }

    /// Samples using (and updating) a cursor. Returns `None` for an empty track.
    pub fn sample_with_cursor(&self, time: f32, cursor: &mut KeyframeCursor) -> Option<T> {
        let len = self.len();
        match len {
            0 => return None,
            1 => return Some(self.values[0]),
            _ => {}
        }

        let i = cursor.last_index.min(len - 1);
        let local = if time >= self.times[i] {
            // Forward playback: check the next few intervals.
            (0..=MAX_SCAN_OFFSET)
                .map(|offset| i + offset)
                .take_while(|&idx| idx < len)
                .find(|&idx| idx == len - 1 || time < self.times[idx + 1])
        } else {
            // Reverse playback or loop wrap: scan backward.
            (0..=MAX_SCAN_OFFSET)
                .filter_map(|offset| i.checked_sub(offset))
                .find(|&idx| time >= self.times[idx])
        };

        let index = local.unwrap_or_else(|| {
            self.times
                .partition_point(|&t| t <= time)
                .saturating_sub(1)
        });
        cursor.last_index = index;

        Some(self.sample_at_frame(index, time))
    }

    fn sample_at_frame(&self, index: usize, time: f32) -> T {
        let len = self.len();
        if index >= len - 1 {
            return self.values[len - 1];
        }
        if time <= self.times[0] {
            return self.values[0];
        }

        let t0 = self.times[index];
        let t1 = self.times[index + 1];
        let dt = t1 - t0;
        let t = if dt > 1e-6 { (time - t0) / dt } else { 0.0 }.clamp(0.0, 1.0);

        match self.interpolation {
            InterpolationMode::Step => self.values[index],
            InterpolationMode::Linear => {
                T::interpolate_linear(self.values[index], self.values[index + 1], t)
            }
        }
    }

    /// True when keyframe times are strictly increasing and match the values.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.times.len() == self.values.len()
            && self.times.windows(2).all(|w| w[0] < w[1])
            && self.times.iter().all(|t| t.is_finite() && *t >= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> KeyframeTrack<f32> {
        KeyframeTrack::linear(&[(0.0, 0.0), (1.0, 10.0), (2.0, 20.0), (3.0, 30.0)])
    }

    #[test]
    fn cursor_matches_stateless_sampling_forward_and_back() {
        let track = ramp();
        let mut cursor = KeyframeCursor::default();
        for &t in &[0.0, 0.4, 1.2, 2.9, 3.5, 0.1, 1.5] {
            let a = track.sample_with_cursor(t, &mut cursor).unwrap();
            let b = track.sample(t).unwrap();
            assert!((a - b).abs() < 1e-5, "t={t}: cursor {a} vs stateless {b}");
        }
    }

    #[test]
    fn empty_track_samples_none() {
        let track: KeyframeTrack<f32> = KeyframeTrack::linear(&[]);
        assert!(track.sample(0.5).is_none());
        assert!(track.sample_with_cursor(0.5, &mut KeyframeCursor::default()).is_none());
    }

    #[test]
    fn non_increasing_times_are_rejected() {
        let track = KeyframeTrack::linear(&[(0.0, 1.0_f32), (0.0, 2.0)]);
        assert!(!track.is_well_formed());
        assert!(ramp().is_well_formed());
    }
}
