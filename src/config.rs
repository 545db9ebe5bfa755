//! Walker configuration loader — reads walker_config.json for per-run tuning.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::WalkerError;
use crate::reward::RewardMode;

/// Upper bound of the commanded walking speed.
pub const MAX_WALKING_SPEED: f64 = 9.0;

/// Top-level walker configuration, loaded from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkerConfig {
    /// Walking speed used until the first episode samples one.
    #[serde(default = "default_target_walking_speed")]
    pub target_walking_speed: f64,

    /// Discrete set the per-episode target speed is drawn from.
    #[serde(default = "default_speed_options")]
    pub speed_options: Vec<f64>,

    /// Recognized but not honored: every episode samples from `speed_options`.
    #[serde(default)]
    pub randomize_walk_speed_each_episode: bool,

    /// Physics layers the ground probe hits.
    #[serde(default = "default_ground_layer_mask")]
    pub ground_layer_mask: u32,

    #[serde(default = "default_ground_probe_max_distance")]
    pub ground_probe_max_distance: f64,

    /// Upward impulse applied to the chest when the policy asks for a stand assist.
    #[serde(default = "default_stand_assist_impulse")]
    pub stand_assist_impulse: f64,

    /// Simulated seconds the settling gate waits before polling velocities.
    #[serde(default = "default_settling_delay_secs")]
    pub settling_delay_secs: f64,

    /// A decision is requested every `decision_period` physics ticks.
    #[serde(default = "default_decision_period")]
    pub decision_period: u64,

    #[serde(default = "default_settle_velocity_threshold")]
    pub settle_velocity_threshold: f64,

    /// Physics step length in seconds.
    #[serde(default = "default_fixed_timestep")]
    pub fixed_timestep: f64,

    #[serde(default)]
    pub reward_mode: RewardMode,

    /// Seed for facing and speed sampling. Entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_target_walking_speed() -> f64 {
    MAX_WALKING_SPEED
}

fn default_speed_options() -> Vec<f64> {
    vec![0.00001, 3.0, 5.0, 7.0, 9.0]
}

fn default_ground_layer_mask() -> u32 {
    1
}

fn default_ground_probe_max_distance() -> f64 {
    2.0
}

fn default_stand_assist_impulse() -> f64 {
    50.0
}

fn default_settling_delay_secs() -> f64 {
    2.0
}

fn default_decision_period() -> u64 {
    5
}

fn default_settle_velocity_threshold() -> f64 {
    0.1
}

fn default_fixed_timestep() -> f64 {
    0.02
}

impl WalkerConfig {
    /// Load configuration from a JSON file. Falls back to defaults if the file is missing.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!(
                "Config file not found at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(path).context("Failed to read walker config file")?;

        let config: WalkerConfig =
            serde_json::from_str(&contents).context("Failed to parse walker config JSON")?;

        config
            .validate()
            .with_context(|| format!("Invalid walker config at {}", path.display()))?;

        Ok(config)
    }

    /// Reject values the control loop cannot run with.
    pub fn validate(&self) -> Result<(), WalkerError> {
        if self.speed_options.is_empty() {
            return Err(WalkerError::invalid_config("speed_options is empty"));
        }
        if let Some(bad) = self
            .speed_options
            .iter()
            .find(|s| !(0.0..=MAX_WALKING_SPEED).contains(*s))
        {
            return Err(WalkerError::invalid_config(format!(
                "speed option {} outside [0, {}]",
                bad, MAX_WALKING_SPEED
            )));
        }
        if self.ground_layer_mask == 0 {
            return Err(WalkerError::invalid_config("ground_layer_mask selects no layers"));
        }
        if !(self.ground_probe_max_distance > 0.0 && self.ground_probe_max_distance.is_finite()) {
            return Err(WalkerError::invalid_config(
                "ground_probe_max_distance must be positive and finite",
            ));
        }
        if self.decision_period == 0 {
            return Err(WalkerError::invalid_config("decision_period must be at least 1"));
        }
        if !(self.fixed_timestep > 0.0 && self.fixed_timestep.is_finite()) {
            return Err(WalkerError::invalid_config("fixed_timestep must be positive and finite"));
        }
        if !(self.settling_delay_secs >= 0.0 && self.settling_delay_secs.is_finite()) {
            return Err(WalkerError::invalid_config(
                "settling_delay_secs must be finite and not negative",
            ));
        }
        if !(self.settle_velocity_threshold >= 0.0) {
            return Err(WalkerError::invalid_config(
                "settle_velocity_threshold must not be negative",
            ));
        }
        if !(self.stand_assist_impulse >= 0.0) {
            return Err(WalkerError::invalid_config("stand_assist_impulse must not be negative"));
        }
        Ok(())
    }
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            target_walking_speed: default_target_walking_speed(),
            speed_options: default_speed_options(),
            randomize_walk_speed_each_episode: false,
            ground_layer_mask: default_ground_layer_mask(),
            ground_probe_max_distance: default_ground_probe_max_distance(),
            stand_assist_impulse: default_stand_assist_impulse(),
            settling_delay_secs: default_settling_delay_secs(),
            decision_period: default_decision_period(),
            settle_velocity_threshold: default_settle_velocity_threshold(),
            fixed_timestep: default_fixed_timestep(),
            reward_mode: RewardMode::default(),
            seed: None,
        }
    }
}
