//! Per-agent episode state and target speed sampling.

use rand::Rng;
use serde::Serialize;

use crate::config::MAX_WALKING_SPEED;

/// Mutable training state owned by one agent.
#[derive(Debug, Clone, Serialize)]
pub struct EpisodeState {
    target_walking_speed: f64,
    /// Index into the speed option set chosen at the last reset.
    pub speed_index: usize,
    /// Chest stand-assist impulse is due on the next scheduled step.
    pub stand_assist_pending: bool,
    /// Chest clearance captured once at initialization.
    pub starting_chest_clearance: f64,
    /// Hip clearance captured once at initialization.
    pub starting_hip_clearance: f64,
    /// Completed resets since initialization.
    pub episode: u64,
}

impl EpisodeState {
    pub fn new(target_walking_speed: f64, starting_chest_clearance: f64, starting_hip_clearance: f64) -> Self {
        Self {
            target_walking_speed: clamp_speed(target_walking_speed),
            speed_index: 0,
            stand_assist_pending: false,
            starting_chest_clearance,
            starting_hip_clearance,
            episode: 0,
        }
    }

    pub fn target_walking_speed(&self) -> f64 {
        self.target_walking_speed
    }

    /// Set the commanded speed, clamped to [0, MAX_WALKING_SPEED].
    pub fn set_target_walking_speed(&mut self, speed: f64) {
        self.target_walking_speed = clamp_speed(speed);
    }
}

fn clamp_speed(speed: f64) -> f64 {
    if speed.is_nan() {
        return 0.0;
    }
    speed.clamp(0.0, MAX_WALKING_SPEED)
}

/// Uniform draw over a fixed discrete speed set.
#[derive(Debug, Clone)]
pub struct SpeedSampler {
    options: Vec<f64>,
}

impl SpeedSampler {
    pub fn new(options: Vec<f64>) -> Self {
        Self { options }
    }

    /// Pick an option uniformly; returns `(index, speed)`.
    ///
    /// The option set must be non-empty (checked by config validation).
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> (usize, f64) {
        let index = rng.gen_range(0..self.options.len());
        (index, self.options[index])
    }

    pub fn options(&self) -> &[f64] {
        &self.options
    }
}
