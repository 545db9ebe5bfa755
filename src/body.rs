//! Body segment registry contract.
//!
//! The physics engine owns the ragdoll. This module names the segments, the
//! per-tick kinematic snapshot read from each one, and the operations the
//! control loop is allowed to perform on them.

use std::fmt;

use nalgebra::{Point3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Role tag of a ragdoll segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentRole {
    Hips,
    Chest,
    Spine,
    Head,
    ThighLeft,
    ShinLeft,
    FootLeft,
    ThighRight,
    ShinRight,
    FootRight,
    ArmLeft,
    ForearmLeft,
    HandLeft,
    ArmRight,
    ForearmRight,
    HandRight,
}

impl SegmentRole {
    /// Fixed enumeration order used by observations and velocity averaging.
    /// Changing it changes the observation schema.
    pub const ALL: [SegmentRole; 16] = [
        SegmentRole::Hips,
        SegmentRole::Chest,
        SegmentRole::Spine,
        SegmentRole::Head,
        SegmentRole::ThighLeft,
        SegmentRole::ShinLeft,
        SegmentRole::FootLeft,
        SegmentRole::ThighRight,
        SegmentRole::ShinRight,
        SegmentRole::FootRight,
        SegmentRole::ArmLeft,
        SegmentRole::ForearmLeft,
        SegmentRole::HandLeft,
        SegmentRole::ArmRight,
        SegmentRole::ForearmRight,
        SegmentRole::HandRight,
    ];

    /// The segment the reference frame and settling gate follow.
    pub const ROOT: SegmentRole = SegmentRole::Hips;

    pub fn name(self) -> &'static str {
        match self {
            SegmentRole::Hips => "hips",
            SegmentRole::Chest => "chest",
            SegmentRole::Spine => "spine",
            SegmentRole::Head => "head",
            SegmentRole::ThighLeft => "thigh_l",
            SegmentRole::ShinLeft => "shin_l",
            SegmentRole::FootLeft => "foot_l",
            SegmentRole::ThighRight => "thigh_r",
            SegmentRole::ShinRight => "shin_r",
            SegmentRole::FootRight => "foot_r",
            SegmentRole::ArmLeft => "arm_l",
            SegmentRole::ForearmLeft => "forearm_l",
            SegmentRole::HandLeft => "hand_l",
            SegmentRole::ArmRight => "arm_r",
            SegmentRole::ForearmRight => "forearm_r",
            SegmentRole::HandRight => "hand_r",
        }
    }

    /// Whether the segment's local rotation is part of its observation block.
    /// The root and both hands are excluded.
    pub const fn observes_local_rotation(self) -> bool {
        !matches!(
            self,
            SegmentRole::Hips | SegmentRole::HandLeft | SegmentRole::HandRight
        )
    }
}

impl fmt::Display for SegmentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which of the three rotational joint axes a segment drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisMask {
    pub x: bool,
    pub y: bool,
    pub z: bool,
}

impl AxisMask {
    pub const XYZ: AxisMask = AxisMask { x: true, y: true, z: true };
    pub const XY: AxisMask = AxisMask { x: true, y: true, z: false };
    pub const X: AxisMask = AxisMask { x: true, y: false, z: false };

    /// Number of action values this mask consumes.
    pub const fn count(self) -> usize {
        self.x as usize + self.y as usize + self.z as usize
    }
}

/// Kinematic snapshot of one segment, read once per use.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentState {
    /// World-space position.
    pub position: Point3<f64>,
    /// World-space rotation.
    pub rotation: UnitQuaternion<f64>,
    /// Rotation relative to the parent segment.
    pub local_rotation: UnitQuaternion<f64>,
    pub linear_velocity: Vector3<f64>,
    pub angular_velocity: Vector3<f64>,
    pub touching_ground: bool,
}

impl SegmentState {
    /// A motionless segment at `position` with identity rotations.
    pub fn at_rest(position: Point3<f64>) -> Self {
        Self {
            position,
            rotation: UnitQuaternion::identity(),
            local_rotation: UnitQuaternion::identity(),
            linear_velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            touching_ground: false,
        }
    }

    /// The segment's local +Y axis in world space.
    pub fn up(&self) -> Vector3<f64> {
        self.rotation * Vector3::y()
    }

    /// The segment's local +Z axis in world space.
    pub fn forward(&self) -> Vector3<f64> {
        self.rotation * Vector3::z()
    }
}

/// Registry of physical segments owned by the physics engine.
///
/// The control loop never creates or destroys segments; it reads snapshots
/// and writes joint targets, resets and impulses through this trait.
pub trait BodySegments {
    /// Whether a segment with this role is registered.
    fn contains(&self, role: SegmentRole) -> bool;

    /// Current kinematic state of a registered segment.
    fn segment(&self, role: SegmentRole) -> SegmentState;

    /// Restore the segment's canonical pose and zero its velocities.
    fn reset_segment(&mut self, role: SegmentRole);

    /// Re-randomize the segment's internal joint compliance settings.
    fn randomize_joint_settings(&mut self, role: SegmentRole);

    /// Overwrite the segment's world rotation.
    fn set_rotation(&mut self, role: SegmentRole, rotation: UnitQuaternion<f64>);

    /// Set the joint drive target. Each value is a normalized [-1, 1]
    /// command; axes the segment does not drive receive 0.
    fn set_joint_target_rotation(&mut self, role: SegmentRole, x: f64, y: f64, z: f64);

    /// Apply an instantaneous impulse at the segment's center of mass.
    fn add_impulse(&mut self, role: SegmentRole, impulse: Vector3<f64>);
}
