//! Episode rollouts. Glue between the agent, a policy and a steppable world.
//!
//! Plays the training framework's part: ticks the agent at the fixed
//! timestep, answers decision requests with the policy, and ends each
//! episode after `max_ticks` physics ticks.

use anyhow::{Context, Result};
use serde::Serialize;
use std::time::{Duration, Instant};

use crate::agent::WalkerAgent;
use crate::body::BodySegments;
use crate::frame::FrameProvider;
use crate::gate::GateState;
use crate::inference::Policy;
use crate::probe::GroundQuery;
use crate::sim::Simulate;

/// Per-episode record, written as one JSON line by the binary.
#[derive(Debug, Clone, Serialize)]
pub struct EpisodeSummary {
    pub episode: u64,
    pub ticks: u64,
    pub decisions: u64,
    pub stand_assists: u64,
    pub total_reward: f64,
    pub target_walking_speed: f64,
    pub speed_index: usize,
    /// Ticks from reset until the settling gate opened.
    pub gate_opened_after: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct Rollout {
    pub max_ticks: u64,
    /// Pace ticks to wall-clock time at the fixed timestep.
    pub realtime: bool,
}

impl Rollout {
    pub fn new(max_ticks: u64) -> Self {
        Self {
            max_ticks,
            realtime: false,
        }
    }

    /// Run one full episode from reset to the step limit.
    pub fn run_episode<W, F, P>(
        &self,
        agent: &mut WalkerAgent<W, F>,
        policy: &mut P,
    ) -> Result<EpisodeSummary>
    where
        W: BodySegments + GroundQuery + Simulate,
        F: FrameProvider,
        P: Policy + ?Sized,
    {
        agent.on_episode_begin();

        let dt = agent.config().fixed_timestep;
        let period = Duration::from_secs_f64(dt);
        let mut decisions = 0;
        let mut stand_assists = 0;
        let mut gate_opened_after = None;

        for n in 0..self.max_ticks {
            let tick_start = Instant::now();

            let outcome = agent.fixed_update();
            if outcome.stand_assist_applied {
                stand_assists += 1;
            }
            if gate_opened_after.is_none() && outcome.gate == GateState::Open {
                gate_opened_after = Some(n + 1);
            }

            if outcome.decision_requested {
                let observation = agent.collect_observations().to_vec();
                let actions = policy
                    .act(&observation)
                    .with_context(|| format!("Policy failed at tick {}", outcome.tick))?;
                agent
                    .on_action_received(&actions)
                    .context("Policy output rejected by action decoder")?;
                decisions += 1;
            }

            agent.world_mut().step(dt);

            if self.realtime {
                let took = tick_start.elapsed();
                if took > period {
                    tracing::warn!(
                        "Tick budget exceeded by {:.1}ms",
                        (took - period).as_secs_f64() * 1000.0
                    );
                } else {
                    spin_sleep::sleep(period - took);
                }
            }
        }

        let summary = EpisodeSummary {
            episode: agent.episode().episode,
            ticks: self.max_ticks,
            decisions,
            stand_assists,
            total_reward: agent.rewards().episode_total(),
            target_walking_speed: agent.episode().target_walking_speed(),
            speed_index: agent.episode().speed_index,
            gate_opened_after,
        };

        tracing::info!(
            episode = summary.episode,
            decisions = summary.decisions,
            total_reward = summary.total_reward,
            "episode complete"
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ACTION_LEN;
    use crate::config::WalkerConfig;
    use crate::inference::{RandomPolicy, ZeroPolicy};
    use crate::sim::MockRagdoll;
    use nalgebra::Point3;

    fn agent(seed: u64) -> WalkerAgent<MockRagdoll> {
        let config = WalkerConfig {
            seed: Some(seed),
            ..WalkerConfig::default()
        };
        WalkerAgent::with_orientation_cube(config, MockRagdoll::new(seed), Point3::new(0.0, 0.0, 25.0))
            .unwrap()
    }

    #[test]
    fn test_zero_policy_episode() {
        let mut agent = agent(1);
        let summary = Rollout::new(300)
            .run_episode(&mut agent, &mut ZeroPolicy::new(ACTION_LEN))
            .unwrap();

        assert_eq!(summary.episode, 1);
        assert_eq!(summary.gate_opened_after, Some(100));
        // Ticks 100..300 at a period of 5.
        assert_eq!(summary.decisions, 40);
        assert_eq!(summary.stand_assists, 0);
        assert!(summary.total_reward > 0.0);
    }

    #[test]
    fn test_random_rollouts_are_deterministic() {
        let run = |seed| {
            let mut agent = agent(seed);
            let mut policy = RandomPolicy::new(ACTION_LEN, seed);
            let rollout = Rollout::new(400);
            (0..2)
                .map(|_| rollout.run_episode(&mut agent, &mut policy).unwrap().total_reward)
                .collect::<Vec<_>>()
        };
        assert_eq!(run(3), run(3));
    }

    #[test]
    fn test_short_policy_output_is_an_error() {
        let mut agent = agent(2);
        let result = Rollout::new(200).run_episode(&mut agent, &mut ZeroPolicy::new(5));
        assert!(result.is_err());
    }
}
