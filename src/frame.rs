//! Stabilized reference frame.
//!
//! Ragdolls tumble during training, so observations and goals are expressed
//! in a frame that sits at the root segment and looks horizontally toward the
//! target instead of in the root's own, erratic, orientation.

use nalgebra::{Point3, UnitQuaternion, Vector3};

use crate::body::SegmentState;

/// Origin + orientation, recomputed every physics tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceFrame {
    pub origin: Point3<f64>,
    pub rotation: UnitQuaternion<f64>,
}

impl Default for ReferenceFrame {
    fn default() -> Self {
        Self {
            origin: Point3::origin(),
            rotation: UnitQuaternion::identity(),
        }
    }
}

impl ReferenceFrame {
    /// The frame's +Z axis in world space.
    pub fn forward(&self) -> Vector3<f64> {
        self.rotation * Vector3::z()
    }

    /// Express a world-space direction in frame-local axes.
    pub fn inverse_transform_direction(&self, direction: &Vector3<f64>) -> Vector3<f64> {
        self.rotation.inverse_transform_vector(direction)
    }

    /// Express a world-space point in frame-local coordinates.
    pub fn inverse_transform_point(&self, point: &Point3<f64>) -> Vector3<f64> {
        self.rotation.inverse_transform_vector(&(point - self.origin))
    }
}

/// Source of the stabilized frame.
pub trait FrameProvider {
    fn update_orientation(&mut self, root: &SegmentState, target: &Point3<f64>) -> ReferenceFrame;
}

/// Frame anchored at the root, yawed to face the target on the ground plane.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrientationCube;

impl FrameProvider for OrientationCube {
    fn update_orientation(&mut self, root: &SegmentState, target: &Point3<f64>) -> ReferenceFrame {
        let mut dir = target - root.position;
        dir.y = 0.0;

        let rotation = if dir.norm_squared() < 1e-12 {
            UnitQuaternion::identity()
        } else {
            UnitQuaternion::face_towards(&dir, &Vector3::y())
        };

        ReferenceFrame {
            origin: root.position,
            rotation,
        }
    }
}
