//! Reinforcement learning utilities — normalization and rotation helpers
//! shared by the observation assembler and the reward shaper.

use nalgebra::{Unit, UnitQuaternion, Vector3};

/// Clamp a value into [0, 1]. NaN maps to 0.
#[inline]
pub fn clamp01(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Map the dot product of `up` with world-up from [-1, 1] onto [0, 1].
///
/// 1.0 when aligned, 0.5 when orthogonal, 0.0 when opposite.
#[inline]
pub fn up_alignment(up: &Vector3<f64>) -> f64 {
    clamp01((up.dot(&Vector3::y()) + 1.0) / 2.0)
}

/// Shortest rotation taking direction `from` onto direction `to`.
///
/// Zero-length inputs give the identity. Anti-parallel inputs give a half
/// turn about an axis orthogonal to `from`.
pub fn from_to_rotation(from: &Vector3<f64>, to: &Vector3<f64>) -> UnitQuaternion<f64> {
    if from.norm_squared() < f64::EPSILON || to.norm_squared() < f64::EPSILON {
        return UnitQuaternion::identity();
    }
    if let Some(rotation) = UnitQuaternion::rotation_between(from, to) {
        return rotation;
    }

    // rotation_between gives up on (near) anti-parallel vectors
    let mut axis = from.cross(&Vector3::x());
    if axis.norm_squared() < 1e-12 {
        axis = from.cross(&Vector3::y());
    }
    UnitQuaternion::from_axis_angle(&Unit::new_normalize(axis), std::f64::consts::PI)
}

/// Quaternion components in `[x, y, z, w]` order.
#[inline]
pub fn quat_to_array(q: &UnitQuaternion<f64>) -> [f64; 4] {
    let c = q.coords;
    [c.x, c.y, c.z, c.w]
}

/// Vector components as a plain array.
#[inline]
pub fn vec_to_array(v: &Vector3<f64>) -> [f64; 3] {
    [v.x, v.y, v.z]
}
