//! Kinematic ragdoll stand-in for dry runs and tests.
//!
//! Not a physics engine: segments integrate their own velocities with linear
//! damping, joint targets push velocities around, and the ground is the
//! plane y = 0. It implements the same registry and raycast contracts a real
//! engine binding does, so the control loop can run headless without one.

use std::collections::BTreeMap;

use nalgebra::{Point3, UnitQuaternion, Vector3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::body::{BodySegments, SegmentRole, SegmentState};
use crate::probe::GroundQuery;

/// Joint target of 1.0 maps to this rotation (radians) per axis.
const MAX_JOINT_ANGLE: f64 = std::f64::consts::FRAC_PI_4;

/// Velocity added per second per unit of joint target.
const DRIVE_GAIN: f64 = 0.5;

/// Segments this close to the plane count as touching it.
const CONTACT_HEIGHT: f64 = 0.06;

/// Canonical standing pose: role, position, mass.
const STANDING_POSE: [(SegmentRole, [f64; 3], f64); 16] = [
    (SegmentRole::Hips, [0.0, 1.0, 0.0], 15.0),
    (SegmentRole::Chest, [0.0, 1.45, 0.0], 8.0),
    (SegmentRole::Spine, [0.0, 1.2, 0.0], 8.0),
    (SegmentRole::Head, [0.0, 1.75, 0.0], 5.0),
    (SegmentRole::ThighLeft, [-0.1, 0.75, 0.0], 6.0),
    (SegmentRole::ShinLeft, [-0.1, 0.35, 0.0], 4.0),
    (SegmentRole::FootLeft, [-0.1, 0.05, 0.05], 1.0),
    (SegmentRole::ThighRight, [0.1, 0.75, 0.0], 6.0),
    (SegmentRole::ShinRight, [0.1, 0.35, 0.0], 4.0),
    (SegmentRole::FootRight, [0.1, 0.05, 0.05], 1.0),
    (SegmentRole::ArmLeft, [-0.3, 1.45, 0.0], 2.0),
    (SegmentRole::ForearmLeft, [-0.55, 1.45, 0.0], 1.5),
    (SegmentRole::HandLeft, [-0.75, 1.45, 0.0], 0.5),
    (SegmentRole::ArmRight, [0.3, 1.45, 0.0], 2.0),
    (SegmentRole::ForearmRight, [0.55, 1.45, 0.0], 1.5),
    (SegmentRole::HandRight, [0.75, 1.45, 0.0], 0.5),
];

#[derive(Debug, Clone)]
struct MockSegment {
    state: SegmentState,
    canonical: Point3<f64>,
    mass: f64,
    joint_target: [f64; 3],
    /// Scales how strongly joint targets move the segment.
    compliance: f64,
}

impl MockSegment {
    fn new(position: Point3<f64>, mass: f64) -> Self {
        let mut state = SegmentState::at_rest(position);
        state.touching_ground = position.y <= CONTACT_HEIGHT;
        Self {
            state,
            canonical: position,
            mass,
            joint_target: [0.0; 3],
            compliance: 1.0,
        }
    }
}

/// Advances a world by one physics step.
pub trait Simulate {
    fn step(&mut self, dt: f64);
}

/// Ragdoll with all sixteen segments in a standing pose on flat ground.
#[derive(Debug, Clone)]
pub struct MockRagdoll {
    segments: BTreeMap<SegmentRole, MockSegment>,
    rng: ChaCha8Rng,
    /// Fraction of velocity removed per second.
    pub damping: f64,
    pub ground_layer: u32,
    impulses: Vec<(SegmentRole, Vector3<f64>)>,
}

impl MockRagdoll {
    pub fn new(seed: u64) -> Self {
        let segments = STANDING_POSE
            .iter()
            .map(|&(role, [x, y, z], mass)| (role, MockSegment::new(Point3::new(x, y, z), mass)))
            .collect();

        Self {
            segments,
            rng: ChaCha8Rng::seed_from_u64(seed),
            damping: 2.0,
            ground_layer: 1,
            impulses: Vec::new(),
        }
    }

    /// Drop a segment, e.g. to exercise incomplete-registry handling.
    pub fn remove_segment(&mut self, role: SegmentRole) {
        self.segments.remove(&role);
    }

    pub fn set_velocity(&mut self, role: SegmentRole, velocity: Vector3<f64>) {
        if let Some(seg) = self.segments.get_mut(&role) {
            seg.state.linear_velocity = velocity;
        }
    }

    pub fn set_angular_velocity(&mut self, role: SegmentRole, angular_velocity: Vector3<f64>) {
        if let Some(seg) = self.segments.get_mut(&role) {
            seg.state.angular_velocity = angular_velocity;
        }
    }

    pub fn set_position(&mut self, role: SegmentRole, position: Point3<f64>) {
        if let Some(seg) = self.segments.get_mut(&role) {
            seg.state.position = position;
        }
    }

    /// Last joint target written for a segment.
    pub fn joint_target(&self, role: SegmentRole) -> Option<[f64; 3]> {
        self.segments.get(&role).map(|s| s.joint_target)
    }

    pub fn compliance(&self, role: SegmentRole) -> Option<f64> {
        self.segments.get(&role).map(|s| s.compliance)
    }

    /// Every impulse applied so far, in order.
    pub fn impulses(&self) -> &[(SegmentRole, Vector3<f64>)] {
        &self.impulses
    }
}

impl Simulate for MockRagdoll {
    /// Advance every segment by `dt` seconds.
    fn step(&mut self, dt: f64) {
        let decay = (1.0 - self.damping * dt).max(0.0);

        for seg in self.segments.values_mut() {
            let [x, y, z] = seg.joint_target;
            let drive = Vector3::new(x, y, z) * (DRIVE_GAIN * seg.compliance * dt);

            let s = &mut seg.state;
            s.linear_velocity = (s.linear_velocity + drive) * decay;
            s.angular_velocity *= decay;
            s.position += s.linear_velocity * dt;

            if s.position.y < 0.0 {
                s.position.y = 0.0;
                s.linear_velocity.y = s.linear_velocity.y.max(0.0);
            }
            s.touching_ground = s.position.y <= CONTACT_HEIGHT;
        }
    }
}

impl BodySegments for MockRagdoll {
    fn contains(&self, role: SegmentRole) -> bool {
        self.segments.contains_key(&role)
    }

    fn segment(&self, role: SegmentRole) -> SegmentState {
        self.segments
            .get(&role)
            .map(|s| s.state)
            .unwrap_or_else(|| SegmentState::at_rest(Point3::origin()))
    }

    fn reset_segment(&mut self, role: SegmentRole) {
        if let Some(seg) = self.segments.get_mut(&role) {
            let canonical = seg.canonical;
            seg.state = SegmentState::at_rest(canonical);
            seg.state.touching_ground = canonical.y <= CONTACT_HEIGHT;
            seg.joint_target = [0.0; 3];
        }
    }

    fn randomize_joint_settings(&mut self, role: SegmentRole) {
        let compliance = self.rng.gen_range(0.5..1.5);
        if let Some(seg) = self.segments.get_mut(&role) {
            seg.compliance = compliance;
        }
    }

    fn set_rotation(&mut self, role: SegmentRole, rotation: UnitQuaternion<f64>) {
        if let Some(seg) = self.segments.get_mut(&role) {
            seg.state.rotation = rotation;
        }
    }

    fn set_joint_target_rotation(&mut self, role: SegmentRole, x: f64, y: f64, z: f64) {
        if let Some(seg) = self.segments.get_mut(&role) {
            let target = [x.clamp(-1.0, 1.0), y.clamp(-1.0, 1.0), z.clamp(-1.0, 1.0)];
            seg.joint_target = target;
            seg.state.local_rotation = UnitQuaternion::from_euler_angles(
                target[0] * MAX_JOINT_ANGLE,
                target[1] * MAX_JOINT_ANGLE,
                target[2] * MAX_JOINT_ANGLE,
            );
        }
    }

    fn add_impulse(&mut self, role: SegmentRole, impulse: Vector3<f64>) {
        if let Some(seg) = self.segments.get_mut(&role) {
            seg.state.linear_velocity += impulse / seg.mass;
            self.impulses.push((role, impulse));
        }
    }
}

impl GroundQuery for MockRagdoll {
    fn raycast_down(&self, origin: &Point3<f64>, max_distance: f64, layer_mask: u32) -> Option<f64> {
        if layer_mask & self.ground_layer == 0 {
            return None;
        }
        (origin.y >= 0.0 && origin.y <= max_distance).then_some(origin.y)
    }
}
