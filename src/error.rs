//! Error types for the walker control loop.

use thiserror::Error;

use crate::body::SegmentRole;

/// Errors surfaced by agent initialization and the decision boundary.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum WalkerError {
    /// A segment required by the observation/action schema is not registered.
    #[error("body segment not registered: {0}")]
    MissingSegment(SegmentRole),

    /// The chest starting clearance is unusable as a normalization baseline.
    #[error("chest starting ground clearance must be positive and finite, got {0}")]
    DegenerateBaseline(f64),

    /// A configuration value is out of its accepted range.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// The policy produced an action vector of the wrong length.
    #[error("action vector length mismatch: expected {expected}, got {actual}")]
    ActionLength {
        /// Length required by the action schema.
        expected: usize,
        /// Length actually received.
        actual: usize,
    },
}

impl WalkerError {
    pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}
