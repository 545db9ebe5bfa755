//! Reward shaping.
//!
//! Exactly one reward function is active per run. The standing reward is the
//! default; the locomotion reward matches the commanded velocity while
//! facing the target.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::observation::PostureSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardMode {
    /// Product of clearance and uprightness terms.
    #[default]
    Standing,
    /// Velocity matching times facing alignment.
    Locomotion,
}

/// Product of five [0, 1] factors; 1 only when fully upright at baseline clearance.
pub fn standing_reward(posture: &PostureSample) -> f64 {
    posture.chest_clearance
        * posture.hip_clearance
        * posture.hips_up
        * posture.shin_left_up
        * posture.shin_right_up
}

/// How closely `actual` matches `goal`, on a curve falling from 1 at zero
/// deviation to 0 at a deviation of `target_speed` or more.
pub fn matching_velocity_reward(goal: &Vector3<f64>, actual: &Vector3<f64>, target_speed: f64) -> f64 {
    let deviation = (actual - goal).norm();
    if target_speed <= 0.0 {
        // No scale to normalize by: only an exact match counts.
        return if deviation == 0.0 { 1.0 } else { 0.0 };
    }
    let delta = deviation.clamp(0.0, target_speed);
    (1.0 - (delta / target_speed).powi(2)).powi(2)
}

/// Alignment of the body's horizontal heading with the frame forward, in [0, 1].
///
/// The heading is the mean of the head and hips forward axes with the
/// vertical component dropped; it is not renormalized.
pub fn look_at_target_reward(
    frame_forward: &Vector3<f64>,
    head_forward: &Vector3<f64>,
    hips_forward: &Vector3<f64>,
) -> f64 {
    let mut heading = (head_forward + hips_forward) / 2.0;
    heading.y = 0.0;
    (frame_forward.dot(&heading) + 1.0) * 0.5
}

/// Arithmetic mean of segment velocities. Zero for an empty set.
pub fn average_velocity<I>(velocities: I) -> Vector3<f64>
where
    I: IntoIterator<Item = Vector3<f64>>,
{
    let (sum, count) = velocities
        .into_iter()
        .fold((Vector3::zeros(), 0usize), |(sum, n), v| (sum + v, n + 1));
    if count == 0 {
        return Vector3::zeros();
    }
    sum / count as f64
}

/// Reward accrued by the agent.
///
/// `add` accumulates into the pending amount handed to the trainer with the
/// next decision; `episode_total` keeps the running sum since the last reset.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RewardAccumulator {
    pending: f64,
    episode_total: f64,
}

impl RewardAccumulator {
    pub fn add(&mut self, delta: f64) {
        self.pending += delta;
        self.episode_total += delta;
    }

    /// Reward accrued since the last `take`, resetting it to zero.
    pub fn take(&mut self) -> f64 {
        std::mem::take(&mut self.pending)
    }

    pub fn pending(&self) -> f64 {
        self.pending
    }

    pub fn episode_total(&self) -> f64 {
        self.episode_total
    }

    pub fn reset(&mut self) {
        self.pending = 0.0;
        self.episode_total = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn posture(values: [f64; 5]) -> PostureSample {
        PostureSample {
            chest_clearance: values[0],
            hip_clearance: values[1],
            hips_up: values[2],
            shin_left_up: values[3],
            shin_right_up: values[4],
            head_height_delta: 1.5,
        }
    }

    #[test]
    fn test_standing_reward_is_product() {
        assert_relative_eq!(standing_reward(&posture([1.0; 5])), 1.0);
        assert_relative_eq!(
            standing_reward(&posture([0.5, 0.8, 1.0, 0.5, 1.0])),
            0.2,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_standing_reward_zero_when_any_factor_zero() {
        for i in 0..5 {
            let mut values = [0.9; 5];
            values[i] = 0.0;
            assert_eq!(standing_reward(&posture(values)), 0.0);
        }
    }

    #[test]
    fn test_standing_reward_monotone_in_each_factor() {
        let base = [0.7, 0.6, 0.9, 0.8, 0.95];
        for i in 0..5 {
            let mut last = -1.0;
            for step in 0..=10 {
                let mut values = base;
                values[i] = step as f64 / 10.0;
                let r = standing_reward(&posture(values));
                assert!(r >= last, "factor {} not monotone at {}", i, step);
                assert!((0.0..=1.0).contains(&r));
                last = r;
            }
        }
    }

    #[test]
    fn test_matching_velocity_reward_extremes() {
        for &s in &[0.00001, 0.5, 3.0, 5.0, 7.0, 9.0] {
            let goal = Vector3::new(0.0, 0.0, s);
            assert_eq!(matching_velocity_reward(&goal, &goal, s), 1.0);

            let far = goal + Vector3::new(s, 0.0, 0.0);
            assert_eq!(matching_velocity_reward(&goal, &far, s), 0.0);

            let farther = goal + Vector3::new(0.0, 2.0 * s, 0.0);
            assert_eq!(matching_velocity_reward(&goal, &farther, s), 0.0);
        }
    }

    #[test]
    fn test_matching_velocity_reward_curve() {
        let goal = Vector3::new(0.0, 0.0, 4.0);
        let actual = Vector3::new(0.0, 0.0, 2.0);
        // (1 - (2/4)^2)^2 = 0.5625
        assert_relative_eq!(matching_velocity_reward(&goal, &actual, 4.0), 0.5625);
    }

    #[test]
    fn test_matching_velocity_reward_zero_speed() {
        let zero = Vector3::zeros();
        assert_eq!(matching_velocity_reward(&zero, &zero, 0.0), 1.0);
        assert_eq!(matching_velocity_reward(&zero, &Vector3::x(), 0.0), 0.0);
    }

    #[test]
    fn test_look_at_target_reward() {
        let z = Vector3::z();
        assert_relative_eq!(look_at_target_reward(&z, &z, &z), 1.0);
        assert_relative_eq!(look_at_target_reward(&z, &-z, &-z), 0.0);
        assert_relative_eq!(look_at_target_reward(&z, &Vector3::x(), &Vector3::x()), 0.5);
        // Vertical components do not count.
        assert_relative_eq!(look_at_target_reward(&z, &Vector3::y(), &z), 0.75);
    }

    #[test]
    fn test_average_velocity() {
        let avg = average_velocity(vec![
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(3.0, 2.0, 0.0),
        ]);
        assert_relative_eq!(avg, Vector3::new(2.0, 1.0, 0.0));
        assert_eq!(average_velocity(Vec::new()), Vector3::zeros());
    }

    #[test]
    fn test_accumulator_take_and_total() {
        let mut acc = RewardAccumulator::default();
        acc.add(0.25);
        acc.add(1.0);
        assert_relative_eq!(acc.take(), 1.25);
        assert_eq!(acc.pending(), 0.0);
        acc.add(0.5);
        assert_relative_eq!(acc.episode_total(), 1.75);
        acc.reset();
        assert_eq!(acc.episode_total(), 0.0);
    }
}
