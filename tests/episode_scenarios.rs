//! End-to-end episode scenarios against the kinematic ragdoll.

use approx::assert_relative_eq;
use nalgebra::{Point3, Vector3};

use walker_runtime::action::JOINT_LAYOUT;
use walker_runtime::sim::MockRagdoll;
use walker_runtime::{BodySegments, GateState, SegmentRole, WalkerAgent, WalkerConfig, ACTION_LEN};

fn agent(seed: u64) -> WalkerAgent<MockRagdoll> {
    let config = WalkerConfig {
        seed: Some(seed),
        ..WalkerConfig::default()
    };
    WalkerAgent::with_orientation_cube(config, MockRagdoll::new(seed), Point3::new(0.0, 0.0, 15.0))
        .expect("agent init")
}

/// Tick until the settling gate opens.
fn open_gate(agent: &mut WalkerAgent<MockRagdoll>) {
    for _ in 0..1000 {
        if agent.fixed_update().gate == GateState::Open {
            return;
        }
    }
    panic!("gate never opened");
}

/// Tick until the next decision request and return its tick.
fn next_decision(agent: &mut WalkerAgent<MockRagdoll>) -> u64 {
    loop {
        let outcome = agent.fixed_update();
        if outcome.decision_requested {
            return outcome.tick;
        }
    }
}

#[test]
fn scenario_a_gate_opens_right_after_delay_when_at_rest() {
    let mut agent = agent(1);
    agent.on_episode_begin();
    assert_eq!(agent.gate_state(), GateState::DelayWait { remaining: 2.0 });

    let dt = agent.config().fixed_timestep;
    let ticks = (2.01 / dt).ceil() as u64;

    let mut states = Vec::new();
    for _ in 0..ticks {
        let outcome = agent.fixed_update();
        assert_eq!(agent.world().segment(SegmentRole::Hips).linear_velocity, Vector3::zeros());
        states.push(outcome.gate);
    }

    // Never parked in Settling: the first settling poll already lets it through.
    assert!(!states.contains(&GateState::Settling));
    let opened_at = states.iter().position(|s| *s == GateState::Open).expect("gate opened");
    assert!(states[..opened_at]
        .iter()
        .all(|s| matches!(s, GateState::DelayWait { .. })));
    assert!(opened_at as f64 * dt >= 2.0 - dt - 1e-9);
}

#[test]
fn scenario_a_moving_root_keeps_gate_settling() {
    let mut agent = agent(2);
    agent.on_episode_begin();
    for _ in 0..100 {
        agent.world_mut().set_velocity(SegmentRole::Hips, Vector3::new(1.0, 0.0, 0.0));
        agent.world_mut().set_angular_velocity(SegmentRole::Hips, Vector3::new(0.0, 1.0, 0.0));
        agent.fixed_update();
    }
    assert_eq!(agent.gate_state(), GateState::Settling);

    // Translation stops while rotation continues: the gate still opens.
    agent.world_mut().set_velocity(SegmentRole::Hips, Vector3::zeros());
    assert_eq!(agent.fixed_update().gate, GateState::Open);
}

#[test]
fn scenario_b_zero_action_neutralizes_joints_without_assist() {
    let mut agent = agent(3);
    agent.on_episode_begin();

    agent.on_action_received(&vec![0.7; ACTION_LEN]).unwrap();
    let decoded = agent.on_action_received(&vec![0.0; ACTION_LEN]).unwrap();
    assert!(!decoded.stand_assist);

    for (role, _) in JOINT_LAYOUT {
        assert_eq!(agent.world().joint_target(role), Some([0.0; 3]), "{}", role);
    }
    // 0.7 armed the assist; zeros do not clear an armed assist.
    assert!(agent.episode().stand_assist_pending);

    let mut fresh = self::agent(4);
    fresh.on_episode_begin();
    fresh.on_action_received(&vec![0.0; ACTION_LEN]).unwrap();
    assert!(!fresh.episode().stand_assist_pending);
}

#[test]
fn scenario_c_stand_assist_applies_exactly_once() {
    let mut agent = agent(5);
    agent.on_episode_begin();
    open_gate(&mut agent);
    next_decision(&mut agent);

    let mut actions = vec![0.0; ACTION_LEN];
    actions[ACTION_LEN - 1] = 0.5;
    agent.on_action_received(&actions).unwrap();
    assert!(agent.episode().stand_assist_pending);
    assert!(agent.world().impulses().is_empty());

    // Off-schedule ticks do not apply it.
    let mut applied = Vec::new();
    loop {
        let outcome = agent.fixed_update();
        applied.push(outcome.stand_assist_applied);
        if outcome.decision_requested {
            break;
        }
    }
    assert_eq!(applied.iter().filter(|a| **a).count(), 1);
    assert_eq!(applied.last(), Some(&true));
    assert!(!agent.episode().stand_assist_pending);

    let impulses = agent.world().impulses();
    assert_eq!(impulses.len(), 1);
    assert_eq!(impulses[0].0, SegmentRole::Chest);
    assert_relative_eq!(impulses[0].1.y, 50.0);
    assert_relative_eq!(impulses[0].1.x.hypot(impulses[0].1.z), 0.0);

    // Without a new positive trigger the next scheduled step applies nothing.
    agent.on_action_received(&vec![0.0; ACTION_LEN]).unwrap();
    next_decision(&mut agent);
    assert_eq!(agent.world().impulses().len(), 1);
}

#[test]
fn speed_index_is_uniform_over_resets() {
    let mut agent = agent(6);
    let options = agent.config().speed_options.len();
    let resets = 5000;

    let mut counts = vec![0u32; options];
    for _ in 0..resets {
        agent.on_episode_begin();
        counts[agent.episode().speed_index] += 1;
    }

    let expected = resets as f64 / options as f64;
    let chi_square: f64 = counts
        .iter()
        .map(|&c| (c as f64 - expected).powi(2) / expected)
        .sum();
    // 4 degrees of freedom, p = 0.001
    assert!(chi_square < 18.47, "chi-square {} for counts {:?}", chi_square, counts);
}

#[test]
fn target_speed_stays_in_range_across_resets() {
    let mut agent = agent(7);
    for _ in 0..200 {
        agent.on_episode_begin();
        let speed = agent.episode().target_walking_speed();
        assert!((0.0..=9.0).contains(&speed));
    }
}

#[test]
fn observations_do_not_change_world_state() {
    let mut agent = agent(8);
    agent.on_episode_begin();
    let before = agent.world().segment(SegmentRole::Chest);
    let a = agent.collect_observations();
    let b = agent.collect_observations();
    assert_eq!(a, b);
    assert_eq!(agent.world().segment(SegmentRole::Chest), before);

    for value in [a.posture.chest_clearance, a.posture.hip_clearance] {
        assert!((0.0..=1.0).contains(&value));
    }
}
