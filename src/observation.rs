//! Observation assembly.
//!
//! The policy sees a flat vector; internally every entry has a name so the
//! layout can be asserted on field by field. Layout (frame-local unless noted):
//!
//! ```text
//! chest_clearance, hip_clearance                       2
//! hips_up, shin_l_up, shin_r_up                        3
//! head_height_delta (world)                            1
//! velocity_error                                       1
//! avg_velocity, goal_velocity                          3 + 3
//! hips_to_frame, head_to_frame (x, y, z, w)            4 + 4
//! target_position                                      3
//! per segment, in SegmentRole::ALL order:
//!   touching_ground, velocity, angular_velocity,
//!   position_from_hips                                 1 + 3 + 3 + 3
//!   local_rotation (not hips / hands)                  4
//! ```

use nalgebra::{Point3, Vector3};
use serde::Serialize;

use crate::body::{BodySegments, SegmentRole, SegmentState};
use crate::episode::EpisodeState;
use crate::frame::ReferenceFrame;
use crate::probe::{GroundProbe, GroundQuery};
use crate::reward::average_velocity;
use crate::rl_utils::{clamp01, from_to_rotation, quat_to_array, up_alignment, vec_to_array};

/// Current observation schema version.
/// Increment when adding/removing/reordering fields or changing the segment set.
pub const OBS_VERSION: u32 = 1;

const GLOBAL_LEN: usize = 2 + 3 + 1 + 1 + 3 + 3 + 4 + 4 + 3;
const SEGMENT_BASE_LEN: usize = 1 + 3 + 3 + 3;
const LOCAL_ROTATION_LEN: usize = 4;

/// Total observation length for the fixed segment set.
pub const OBS_LEN: usize = obs_len();

const fn obs_len() -> usize {
    let mut len = GLOBAL_LEN;
    let mut i = 0;
    while i < SegmentRole::ALL.len() {
        len += SEGMENT_BASE_LEN;
        if SegmentRole::ALL[i].observes_local_rotation() {
            len += LOCAL_ROTATION_LEN;
        }
        i += 1;
    }
    len
}

/// Postural terms shared by the observation and the reward shaper.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PostureSample {
    /// Chest clearance over the chest baseline, in [0, 1].
    pub chest_clearance: f64,
    /// Hip clearance over the chest baseline, in [0, 1].
    pub hip_clearance: f64,
    pub hips_up: f64,
    pub shin_left_up: f64,
    pub shin_right_up: f64,
    /// Head height above the mean foot height (world units, unclamped).
    pub head_height_delta: f64,
}

/// Read the postural terms from the current body state.
///
/// Both clearance ratios divide by the chest's starting clearance. The hip
/// ratio using the chest baseline is long-standing behavior that trained
/// policies depend on; the hip baseline is kept in `EpisodeState` but unused.
pub fn sample_posture<W>(world: &W, probe: &GroundProbe, episode: &EpisodeState) -> PostureSample
where
    W: BodySegments + GroundQuery + ?Sized,
{
    let hips = world.segment(SegmentRole::Hips);
    let chest = world.segment(SegmentRole::Chest);
    let head = world.segment(SegmentRole::Head);
    let shin_l = world.segment(SegmentRole::ShinLeft);
    let shin_r = world.segment(SegmentRole::ShinRight);
    let foot_l = world.segment(SegmentRole::FootLeft);
    let foot_r = world.segment(SegmentRole::FootRight);

    let baseline = episode.starting_chest_clearance;

    PostureSample {
        chest_clearance: clamp01(probe.clearance(world, &chest.position) / baseline),
        hip_clearance: clamp01(probe.clearance(world, &hips.position) / baseline),
        hips_up: up_alignment(&hips.up()),
        shin_left_up: up_alignment(&shin_l.up()),
        shin_right_up: up_alignment(&shin_r.up()),
        head_height_delta: head.position.y - (foot_l.position.y + foot_r.position.y) / 2.0,
    }
}

/// One segment's block of the observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentObservation {
    pub role: SegmentRole,
    pub touching_ground: bool,
    pub velocity: [f64; 3],
    pub angular_velocity: [f64; 3],
    pub position_from_hips: [f64; 3],
    pub local_rotation: Option<[f64; 4]>,
}

/// Named view of one decision's observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub posture: PostureSample,
    /// Distance between the goal velocity and the average segment velocity.
    pub velocity_error: f64,
    pub avg_velocity: [f64; 3],
    pub goal_velocity: [f64; 3],
    /// Rotation taking the hips forward axis onto the frame forward.
    pub hips_to_frame: [f64; 4],
    /// Rotation taking the head forward axis onto the frame forward.
    pub head_to_frame: [f64; 4],
    pub target_position: [f64; 3],
    pub segments: Vec<SegmentObservation>,
}

/// Build the observation. Reads state only; safe to call repeatedly per tick.
pub fn assemble<W>(
    world: &W,
    probe: &GroundProbe,
    frame: &ReferenceFrame,
    target: &Point3<f64>,
    episode: &EpisodeState,
) -> Observation
where
    W: BodySegments + GroundQuery + ?Sized,
{
    let posture = sample_posture(world, probe, episode);

    let states: Vec<SegmentState> = SegmentRole::ALL.iter().map(|&r| world.segment(r)).collect();
    let hips = states[0];
    let head = world.segment(SegmentRole::Head);

    let forward = frame.forward();
    let goal = goal_velocity(frame, episode.target_walking_speed());
    let avg_velocity = average_velocity(states.iter().map(|s| s.linear_velocity));

    let segments = SegmentRole::ALL
        .iter()
        .zip(states.iter())
        .map(|(&role, s)| SegmentObservation {
            role,
            touching_ground: s.touching_ground,
            velocity: vec_to_array(&frame.inverse_transform_direction(&s.linear_velocity)),
            angular_velocity: vec_to_array(&frame.inverse_transform_direction(&s.angular_velocity)),
            position_from_hips: vec_to_array(
                &frame.inverse_transform_direction(&(s.position - hips.position)),
            ),
            local_rotation: role
                .observes_local_rotation()
                .then(|| quat_to_array(&s.local_rotation)),
        })
        .collect();

    Observation {
        posture,
        velocity_error: (goal - avg_velocity).norm(),
        avg_velocity: vec_to_array(&frame.inverse_transform_direction(&avg_velocity)),
        goal_velocity: vec_to_array(&frame.inverse_transform_direction(&goal)),
        hips_to_frame: quat_to_array(&from_to_rotation(&hips.forward(), &forward)),
        head_to_frame: quat_to_array(&from_to_rotation(&head.forward(), &forward)),
        target_position: vec_to_array(&frame.inverse_transform_point(target)),
        segments,
    }
}

impl Observation {
    /// Serialize positionally, in schema order.
    pub fn to_vec(&self) -> Vec<f64> {
        let mut obs = Vec::with_capacity(OBS_LEN);

        obs.push(self.posture.chest_clearance);
        obs.push(self.posture.hip_clearance);
        obs.push(self.posture.hips_up);
        obs.push(self.posture.shin_left_up);
        obs.push(self.posture.shin_right_up);
        obs.push(self.posture.head_height_delta);
        obs.push(self.velocity_error);
        obs.extend_from_slice(&self.avg_velocity);
        obs.extend_from_slice(&self.goal_velocity);
        obs.extend_from_slice(&self.hips_to_frame);
        obs.extend_from_slice(&self.head_to_frame);
        obs.extend_from_slice(&self.target_position);

        for seg in &self.segments {
            obs.push(if seg.touching_ground { 1.0 } else { 0.0 });
            obs.extend_from_slice(&seg.velocity);
            obs.extend_from_slice(&seg.angular_velocity);
            obs.extend_from_slice(&seg.position_from_hips);
            if let Some(rotation) = &seg.local_rotation {
                obs.extend_from_slice(rotation);
            }
        }

        obs
    }

    /// Names of every positional entry, matching `to_vec`.
    pub fn field_names() -> Vec<String> {
        const XYZ: &[&str] = &["x", "y", "z"];
        const XYZW: &[&str] = &["x", "y", "z", "w"];

        fn axes(names: &mut Vec<String>, prefix: &str, axes: &[&str]) {
            names.extend(axes.iter().map(|a| format!("{}.{}", prefix, a)));
        }

        let mut names: Vec<String> = [
            "chest_clearance",
            "hip_clearance",
            "hips_up",
            "shin_l_up",
            "shin_r_up",
            "head_height_delta",
            "velocity_error",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        axes(&mut names, "avg_velocity", XYZ);
        axes(&mut names, "goal_velocity", XYZ);
        axes(&mut names, "hips_to_frame", XYZW);
        axes(&mut names, "head_to_frame", XYZW);
        axes(&mut names, "target_position", XYZ);

        for role in SegmentRole::ALL {
            names.push(format!("{}.touching_ground", role));
            axes(&mut names, &format!("{}.velocity", role), XYZ);
            axes(&mut names, &format!("{}.angular_velocity", role), XYZ);
            axes(&mut names, &format!("{}.position_from_hips", role), XYZ);
            if role.observes_local_rotation() {
                axes(&mut names, &format!("{}.local_rotation", role), XYZW);
            }
        }

        names
    }
}

/// Goal velocity in world space: frame forward scaled by the target speed.
pub fn goal_velocity(frame: &ReferenceFrame, target_speed: f64) -> Vector3<f64> {
    frame.forward() * target_speed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::MockRagdoll;
    use approx::assert_relative_eq;
    use nalgebra::UnitQuaternion;

    fn setup() -> (MockRagdoll, GroundProbe, EpisodeState) {
        let world = MockRagdoll::new(1);
        let probe = GroundProbe::default();
        let chest = probe.clearance(&world, &world.segment(SegmentRole::Chest).position);
        let hips = probe.clearance(&world, &world.segment(SegmentRole::Hips).position);
        (world, probe, EpisodeState::new(5.0, chest, hips))
    }

    #[test]
    fn test_obs_len_matches_segment_set() {
        assert_eq!(OBS_LEN, 24 + 16 * 10 + 13 * 4);
        assert_eq!(Observation::field_names().len(), OBS_LEN);
    }

    #[test]
    fn test_to_vec_has_schema_length() {
        let (world, probe, episode) = setup();
        let frame = ReferenceFrame::default();
        let obs = assemble(&world, &probe, &frame, &Point3::new(0.0, 0.0, 10.0), &episode);
        assert_eq!(obs.to_vec().len(), OBS_LEN);
    }

    #[test]
    fn test_upright_pose_at_baseline() {
        let (world, probe, episode) = setup();
        let posture = sample_posture(&world, &probe, &episode);
        assert_relative_eq!(posture.chest_clearance, 1.0, epsilon = 1e-12);
        assert_relative_eq!(posture.hips_up, 1.0, epsilon = 1e-12);
        assert_relative_eq!(posture.shin_left_up, 1.0, epsilon = 1e-12);
        assert!(posture.head_height_delta > 1.0);
    }

    #[test]
    fn test_hip_ratio_uses_chest_baseline() {
        let (world, probe, episode) = setup();
        let posture = sample_posture(&world, &probe, &episode);
        let hips = probe.clearance(&world, &world.segment(SegmentRole::Hips).position);
        assert_relative_eq!(
            posture.hip_clearance,
            hips / episode.starting_chest_clearance,
            epsilon = 1e-12
        );
        assert!(posture.hip_clearance < 1.0);
    }

    #[test]
    fn test_velocities_are_frame_local() {
        let (mut world, probe, episode) = setup();
        for role in SegmentRole::ALL {
            world.set_velocity(role, Vector3::new(2.0, 0.0, 0.0));
        }
        // Frame looking down world +X.
        let frame = ReferenceFrame {
            origin: Point3::origin(),
            rotation: UnitQuaternion::face_towards(&Vector3::x(), &Vector3::y()),
        };
        let obs = assemble(&world, &probe, &frame, &Point3::new(10.0, 0.0, 0.0), &episode);

        assert_relative_eq!(obs.avg_velocity[2], 2.0, epsilon = 1e-12);
        assert_relative_eq!(obs.goal_velocity[2], 5.0, epsilon = 1e-12);
        assert_relative_eq!(obs.velocity_error, 3.0, epsilon = 1e-12);
        assert_relative_eq!(obs.target_position[2], 10.0, epsilon = 1e-12);
        assert_relative_eq!(obs.segments[3].velocity[2], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_blocks_follow_role() {
        let (world, probe, episode) = setup();
        let obs = assemble(&world, &probe, &ReferenceFrame::default(), &Point3::origin(), &episode);
        for seg in &obs.segments {
            assert_eq!(seg.local_rotation.is_some(), seg.role.observes_local_rotation());
        }
        assert_eq!(obs.segments[0].position_from_hips, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_assemble_is_pure() {
        let (world, probe, episode) = setup();
        let frame = ReferenceFrame::default();
        let target = Point3::new(1.0, 0.0, 4.0);
        let a = assemble(&world, &probe, &frame, &target, &episode);
        let b = assemble(&world, &probe, &frame, &target, &episode);
        assert_eq!(a, b);
    }
}
