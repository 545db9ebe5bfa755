//! Flat policy output to per-joint target rotations.
//!
//! Values are consumed positionally in `JOINT_LAYOUT` order, one per driven
//! axis; undriven axes are fixed at 0 and consume nothing. The final value is
//! the stand-assist trigger.

use serde::Serialize;

use crate::body::{AxisMask, BodySegments, SegmentRole};
use crate::error::WalkerError;

/// Current action encoding version.
/// Increment when changing the order or the per-segment axis counts.
pub const ACTION_VERSION: u32 = 1;

/// Driven axes per segment, in wire order.
pub const JOINT_LAYOUT: [(SegmentRole, AxisMask); 13] = [
    (SegmentRole::Chest, AxisMask::XYZ),
    (SegmentRole::Spine, AxisMask::XYZ),
    (SegmentRole::ThighLeft, AxisMask::XY),
    (SegmentRole::ThighRight, AxisMask::XY),
    (SegmentRole::ShinLeft, AxisMask::X),
    (SegmentRole::ShinRight, AxisMask::X),
    (SegmentRole::FootRight, AxisMask::XYZ),
    (SegmentRole::FootLeft, AxisMask::XYZ),
    (SegmentRole::ArmLeft, AxisMask::XY),
    (SegmentRole::ArmRight, AxisMask::XY),
    (SegmentRole::ForearmLeft, AxisMask::X),
    (SegmentRole::ForearmRight, AxisMask::X),
    (SegmentRole::Head, AxisMask::XY),
];

/// Number of joint-rotation values before the stand-assist trigger.
pub const JOINT_VALUES_LEN: usize = joint_values_len();

/// Total action length: joint values plus the stand-assist trigger.
pub const ACTION_LEN: usize = JOINT_VALUES_LEN + 1;

const fn joint_values_len() -> usize {
    let mut len = 0;
    let mut i = 0;
    while i < JOINT_LAYOUT.len() {
        len += JOINT_LAYOUT[i].1.count();
        i += 1;
    }
    len
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct JointTarget {
    pub role: SegmentRole,
    /// Target rotation per axis; undriven axes are 0.
    pub rotation: [f64; 3],
}

/// Named view of one decision's action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedAction {
    pub joint_targets: Vec<JointTarget>,
    /// The trigger value was strictly positive.
    pub stand_assist: bool,
}

/// Decode a flat action vector. The length must be exactly `ACTION_LEN`.
pub fn decode(actions: &[f64]) -> Result<DecodedAction, WalkerError> {
    if actions.len() != ACTION_LEN {
        return Err(WalkerError::ActionLength {
            expected: ACTION_LEN,
            actual: actions.len(),
        });
    }

    let mut values = actions.iter().copied();
    let mut next = || values.next().unwrap_or(0.0);

    let joint_targets = JOINT_LAYOUT
        .iter()
        .map(|&(role, mask)| {
            let x = if mask.x { next() } else { 0.0 };
            let y = if mask.y { next() } else { 0.0 };
            let z = if mask.z { next() } else { 0.0 };
            JointTarget {
                role,
                rotation: [x, y, z],
            }
        })
        .collect();

    let stand_assist = next() > 0.0;

    Ok(DecodedAction {
        joint_targets,
        stand_assist,
    })
}

impl DecodedAction {
    /// Push every joint target to the segment registry.
    pub fn apply<B: BodySegments + ?Sized>(&self, body: &mut B) {
        for target in &self.joint_targets {
            let [x, y, z] = target.rotation;
            body.set_joint_target_rotation(target.role, x, y, z);
        }
    }

    pub fn target(&self, role: SegmentRole) -> Option<&JointTarget> {
        self.joint_targets.iter().find(|t| t.role == role)
    }
}
