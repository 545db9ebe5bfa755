//! The walker agent: episode lifecycle, decision gating and the per-tick step.
//!
//! The training framework drives the agent through four entry points:
//! `on_episode_begin`, `fixed_update` once per physics tick, and, whenever a
//! tick reports `decision_requested`, `collect_observations` followed by
//! `on_action_received` with the policy's output.

use nalgebra::{Point3, UnitQuaternion, Vector3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::action::{self, DecodedAction};
use crate::body::{BodySegments, SegmentRole};
use crate::config::WalkerConfig;
use crate::episode::{EpisodeState, SpeedSampler};
use crate::error::WalkerError;
use crate::frame::{FrameProvider, OrientationCube, ReferenceFrame};
use crate::gate::{GateState, SettlingGate};
use crate::observation::{self, Observation};
use crate::probe::{GroundProbe, GroundQuery};
use crate::reward::{
    average_velocity, look_at_target_reward, matching_velocity_reward, standing_reward,
    RewardAccumulator, RewardMode,
};

/// What happened on one physics tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TickOutcome {
    pub tick: u64,
    /// Gate state after this tick's poll.
    pub gate: GateState,
    /// The framework should collect observations and query the policy.
    pub decision_requested: bool,
    /// Shaped reward added on this tick, if it was a scheduled step.
    pub reward: Option<f64>,
    pub stand_assist_applied: bool,
}

pub struct WalkerAgent<W, F = OrientationCube> {
    config: WalkerConfig,
    world: W,
    frame_provider: F,
    frame: ReferenceFrame,
    probe: GroundProbe,
    target: Point3<f64>,
    world_dir_to_walk: Vector3<f64>,
    episode: EpisodeState,
    gate: SettlingGate,
    speeds: SpeedSampler,
    rewards: RewardAccumulator,
    rng: ChaCha8Rng,
    tick: u64,
}

impl<W> WalkerAgent<W, OrientationCube>
where
    W: BodySegments + GroundQuery,
{
    /// Agent using the horizontal look-at-target reference frame.
    pub fn with_orientation_cube(
        config: WalkerConfig,
        world: W,
        target: Point3<f64>,
    ) -> Result<Self, WalkerError> {
        Self::new(config, world, OrientationCube, target)
    }
}

impl<W, F> WalkerAgent<W, F>
where
    W: BodySegments + GroundQuery,
    F: FrameProvider,
{
    /// Validate the configuration and segment set, and capture the starting
    /// clearance baselines. The baselines are never recaptured.
    pub fn new(
        config: WalkerConfig,
        world: W,
        mut frame_provider: F,
        target: Point3<f64>,
    ) -> Result<Self, WalkerError> {
        config.validate()?;

        if let Some(&missing) = SegmentRole::ALL.iter().find(|&&r| !world.contains(r)) {
            return Err(WalkerError::MissingSegment(missing));
        }

        let probe = GroundProbe::new(config.ground_probe_max_distance, config.ground_layer_mask);
        let starting_chest = probe.clearance(&world, &world.segment(SegmentRole::Chest).position);
        let starting_hips = probe.clearance(&world, &world.segment(SegmentRole::Hips).position);
        if !(starting_chest > 0.0 && starting_chest.is_finite()) {
            return Err(WalkerError::DegenerateBaseline(starting_chest));
        }

        if config.randomize_walk_speed_each_episode {
            tracing::warn!(
                "randomize_walk_speed_each_episode is set but not honored; \
                 target speed is always sampled from speed_options"
            );
        }

        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let root = world.segment(SegmentRole::ROOT);
        let frame = frame_provider.update_orientation(&root, &target);

        tracing::info!(
            starting_chest_clearance = starting_chest,
            starting_hip_clearance = starting_hips,
            reward_mode = ?config.reward_mode,
            "walker agent initialized"
        );

        Ok(Self {
            episode: EpisodeState::new(config.target_walking_speed, starting_chest, starting_hips),
            gate: SettlingGate::new(config.settling_delay_secs, config.settle_velocity_threshold),
            speeds: SpeedSampler::new(config.speed_options.clone()),
            world_dir_to_walk: target - root.position,
            rewards: RewardAccumulator::default(),
            config,
            world,
            frame_provider,
            frame,
            probe,
            target,
            rng,
            tick: 0,
        })
    }

    /// Reset the body, randomize facing and target speed, and close the gate.
    pub fn on_episode_begin(&mut self) {
        for role in SegmentRole::ALL {
            self.world.reset_segment(role);
            self.world.randomize_joint_settings(role);
        }

        let yaw_degrees: f64 = self.rng.gen_range(0.0..360.0);
        let yaw = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), yaw_degrees.to_radians());
        let root = self.world.segment(SegmentRole::ROOT);
        self.world.set_rotation(SegmentRole::ROOT, yaw * root.rotation);

        self.update_orientation_objects();

        let (index, speed) = self.speeds.sample(&mut self.rng);
        self.episode.speed_index = index;
        self.episode.set_target_walking_speed(speed);

        self.episode.episode += 1;
        self.rewards.reset();
        let generation = self.gate.restart();

        tracing::info!(
            episode = self.episode.episode,
            generation,
            yaw_degrees,
            speed_index = index,
            target_walking_speed = self.episode.target_walking_speed(),
            "episode begin"
        );
    }

    /// Current observation. Pure read of the world state.
    pub fn collect_observations(&self) -> Observation {
        observation::assemble(&self.world, &self.probe, &self.frame, &self.target, &self.episode)
    }

    /// Decode the policy output, drive the joints and arm the stand assist.
    pub fn on_action_received(&mut self, actions: &[f64]) -> Result<DecodedAction, WalkerError> {
        let decoded = action::decode(actions)?;
        decoded.apply(&mut self.world);
        if decoded.stand_assist {
            self.episode.stand_assist_pending = true;
        }
        Ok(decoded)
    }

    /// One physics tick: refresh the frame and, on scheduled ticks with the
    /// gate open, apply the stand assist, add the reward and request a decision.
    pub fn fixed_update(&mut self) -> TickOutcome {
        let tick = self.tick;
        self.update_orientation_objects();

        let mut outcome = TickOutcome {
            tick,
            gate: self.gate.state(),
            decision_requested: false,
            reward: None,
            stand_assist_applied: false,
        };

        if self.gate.is_open() && tick % self.config.decision_period == 0 {
            if self.episode.stand_assist_pending {
                self.episode.stand_assist_pending = false;
                let impulse = Vector3::y() * self.config.stand_assist_impulse;
                self.world.add_impulse(SegmentRole::Chest, impulse);
                outcome.stand_assist_applied = true;
                tracing::debug!(tick, impulse = self.config.stand_assist_impulse, "chest stand assist applied");
            }

            let reward = self.shaped_reward();
            self.rewards.add(reward);
            outcome.reward = Some(reward);
            outcome.decision_requested = true;
        }

        let root = self.world.segment(SegmentRole::ROOT);
        outcome.gate = self.gate.poll(tick, self.config.fixed_timestep, &root);

        self.tick += 1;
        outcome
    }

    /// Reward for the current state under the configured mode.
    pub fn shaped_reward(&self) -> f64 {
        match self.config.reward_mode {
            RewardMode::Standing => {
                standing_reward(&observation::sample_posture(&self.world, &self.probe, &self.episode))
            }
            RewardMode::Locomotion => {
                let forward = self.frame.forward();
                let speed = self.episode.target_walking_speed();
                let goal = observation::goal_velocity(&self.frame, speed);
                let avg = self.average_velocity();
                let head = self.world.segment(SegmentRole::Head);
                let hips = self.world.segment(SegmentRole::Hips);
                matching_velocity_reward(&goal, &avg, speed)
                    * look_at_target_reward(&forward, &head.forward(), &hips.forward())
            }
        }
    }

    /// Mean linear velocity over every segment.
    pub fn average_velocity(&self) -> Vector3<f64> {
        average_velocity(SegmentRole::ALL.iter().map(|&r| self.world.segment(r).linear_velocity))
    }

    /// The agent reached the target object.
    pub fn touched_target(&mut self) {
        self.rewards.add(1.0);
    }

    pub fn add_reward(&mut self, delta: f64) {
        self.rewards.add(delta);
    }

    /// Reward accrued since the last call.
    pub fn take_reward(&mut self) -> f64 {
        self.rewards.take()
    }

    /// Move the target the agent walks toward. Takes effect on the next tick.
    pub fn set_target_position(&mut self, target: Point3<f64>) {
        self.target = target;
    }

    fn update_orientation_objects(&mut self) {
        let root = self.world.segment(SegmentRole::ROOT);
        self.world_dir_to_walk = self.target - root.position;
        self.frame = self.frame_provider.update_orientation(&root, &self.target);
    }

    pub fn config(&self) -> &WalkerConfig {
        &self.config
    }

    pub fn episode(&self) -> &EpisodeState {
        &self.episode
    }

    pub fn gate_state(&self) -> GateState {
        self.gate.state()
    }

    pub fn frame(&self) -> &ReferenceFrame {
        &self.frame
    }

    pub fn target(&self) -> Point3<f64> {
        self.target
    }

    /// World-space vector from the root to the target.
    pub fn world_dir_to_walk(&self) -> Vector3<f64> {
        self.world_dir_to_walk
    }

    pub fn rewards(&self) -> &RewardAccumulator {
        &self.rewards
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }
}
