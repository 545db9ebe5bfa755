//! Settling gate: suppresses decision requests after an episode reset.
//!
//! After every reset the gate waits a fixed amount of simulated time, then
//! polls the root segment's velocities once per tick until the body is judged
//! to have settled. Only then may the step scheduler request decisions.
//!
//! The settle test keeps waiting only while BOTH the linear and the angular
//! speed exceed the threshold, so a body that has stopped translating but is
//! still spinning (or the reverse) is let through. This is most likely
//! unintended (an OR would wait for full rest), but changing it alters
//! training dynamics for existing policies.

use serde::Serialize;

use crate::body::SegmentState;

/// Remaining delay below this counts as elapsed (absorbs timestep rounding).
const DELAY_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GateState {
    /// Not started, or just reset.
    Closed,
    /// Waiting out the fixed settling delay.
    DelayWait { remaining: f64 },
    /// Polling root velocities every tick.
    Settling,
    /// Decisions may be requested until the next reset.
    Open,
}

#[derive(Debug, Clone)]
pub struct SettlingGate {
    state: GateState,
    delay: f64,
    threshold: f64,
    generation: u64,
    last_tick: Option<u64>,
}

impl SettlingGate {
    pub fn new(delay: f64, threshold: f64) -> Self {
        Self {
            state: GateState::Closed,
            delay,
            threshold,
            generation: 0,
            last_tick: None,
        }
    }

    /// Close the gate and start a fresh wait, superseding any wait in progress.
    /// Returns the new generation id.
    pub fn restart(&mut self) -> u64 {
        self.generation += 1;
        self.last_tick = None;
        self.state = GateState::DelayWait {
            remaining: self.delay,
        };
        tracing::debug!(generation = self.generation, delay = self.delay, "settling gate restarted");
        self.generation
    }

    /// Advance the gate by one physics tick. Polling the same tick twice is a no-op.
    pub fn poll(&mut self, tick: u64, dt: f64, root: &SegmentState) -> GateState {
        if self.last_tick == Some(tick) {
            return self.state;
        }
        self.last_tick = Some(tick);

        if let GateState::DelayWait { remaining } = self.state {
            let remaining = remaining - dt;
            if remaining > DELAY_EPSILON {
                self.state = GateState::DelayWait { remaining };
                return self.state;
            }
            self.state = GateState::Settling;
            tracing::debug!(generation = self.generation, tick, "settling delay elapsed");
        }

        if self.state == GateState::Settling && !self.still_moving(root) {
            self.state = GateState::Open;
            tracing::debug!(
                generation = self.generation,
                tick,
                speed = root.linear_velocity.norm(),
                angular_speed = root.angular_velocity.norm(),
                "settling gate open"
            );
        }

        self.state
    }

    fn still_moving(&self, root: &SegmentState) -> bool {
        root.linear_velocity.norm() > self.threshold && root.angular_velocity.norm() > self.threshold
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == GateState::Open
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
