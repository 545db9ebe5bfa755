//! Walker runtime — agent-side control loop for a bipedal ragdoll learning
//! to walk toward a moving target at a commanded speed.
//!
//! The physics engine, the stabilized-frame source and the policy are
//! collaborators behind traits ([`BodySegments`], [`GroundQuery`],
//! [`FrameProvider`], [`Policy`]). This crate owns the task definition:
//! episode resets and the settling gate, the observation and action
//! schemas, and reward shaping.

pub mod action;
pub mod agent;
pub mod body;
pub mod config;
pub mod episode;
pub mod error;
pub mod frame;
pub mod gate;
pub mod inference;
pub mod observation;
pub mod probe;
pub mod reward;
pub mod rl_utils;
pub mod runner;
pub mod sim;

pub use action::{DecodedAction, ACTION_LEN, ACTION_VERSION};
pub use agent::{TickOutcome, WalkerAgent};
pub use body::{BodySegments, SegmentRole, SegmentState};
pub use config::WalkerConfig;
pub use error::WalkerError;
pub use frame::{FrameProvider, OrientationCube, ReferenceFrame};
pub use gate::GateState;
pub use inference::Policy;
pub use observation::{Observation, OBS_LEN, OBS_VERSION};
pub use probe::{GroundProbe, GroundQuery};
pub use reward::RewardMode;
