//! Ground-clearance probe.

use nalgebra::Point3;

/// Physics raycast primitive.
pub trait GroundQuery {
    /// Cast a ray straight down from `origin`. Returns the hit distance, or
    /// `None` when nothing on `layer_mask` is within `max_distance`.
    fn raycast_down(&self, origin: &Point3<f64>, max_distance: f64, layer_mask: u32) -> Option<f64>;
}

/// Downward ray probe returning clearance normalized by the ray length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundProbe {
    pub max_distance: f64,
    pub layer_mask: u32,
}

impl GroundProbe {
    pub const DEFAULT_MAX_DISTANCE: f64 = 2.0;

    pub fn new(max_distance: f64, layer_mask: u32) -> Self {
        Self {
            max_distance,
            layer_mask,
        }
    }

    /// Normalized distance to ground in [0, 1]; 1.0 when no ground is hit.
    pub fn clearance<G: GroundQuery + ?Sized>(&self, ground: &G, origin: &Point3<f64>) -> f64 {
        match ground.raycast_down(origin, self.max_distance, self.layer_mask) {
            Some(distance) => (distance / self.max_distance).clamp(0.0, 1.0),
            None => 1.0,
        }
    }
}

impl Default for GroundProbe {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_DISTANCE, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Flat ground at y = 0 on layer 1.
    struct Plane;

    impl GroundQuery for Plane {
        fn raycast_down(&self, origin: &Point3<f64>, max_distance: f64, layer_mask: u32) -> Option<f64> {
            if layer_mask & 1 == 0 || origin.y < 0.0 || origin.y > max_distance {
                return None;
            }
            Some(origin.y)
        }
    }

    #[test]
    fn test_clearance_is_normalized() {
        let probe = GroundProbe::default();
        assert_eq!(probe.clearance(&Plane, &Point3::new(0.0, 0.0, 0.0)), 0.0);
        assert_eq!(probe.clearance(&Plane, &Point3::new(0.0, 1.0, 0.0)), 0.5);
        assert_eq!(probe.clearance(&Plane, &Point3::new(0.0, 2.0, 0.0)), 1.0);
    }

    #[test]
    fn test_clearance_in_unit_range_over_probe_span() {
        let probe = GroundProbe::default();
        for i in 0..=200 {
            let y = i as f64 * 0.01;
            let c = probe.clearance(&Plane, &Point3::new(0.0, y, 0.0));
            assert!((0.0..=1.0).contains(&c), "clearance {} at height {}", c, y);
        }
    }

    #[test]
    fn test_miss_returns_full_clearance() {
        let probe = GroundProbe::default();
        assert_eq!(probe.clearance(&Plane, &Point3::new(0.0, 2.5, 0.0)), 1.0);

        let wrong_layer = GroundProbe::new(2.0, 0b10);
        assert_eq!(wrong_layer.clearance(&Plane, &Point3::new(0.0, 0.3, 0.0)), 1.0);
    }
}
