//! Vertical walls: a planar segment with an elevation band.

use silt_core::geometry::planar_cross;
use silt_core::Vec3;

use crate::error::ObstacleError;

/// A vertical wall standing on the planar segment `a`–`b` between
/// elevations `lower` and `upper`.
#[derive(Clone, Debug, PartialEq)]
pub struct Wall {
    a: Vec3,
    b: Vec3,
    lower: f64,
    upper: f64,
}

impl Wall {
    /// Create a wall. The `z` of the endpoints is ignored.
    pub fn new(a: Vec3, b: Vec3, lower: f64, upper: f64) -> Result<Self, ObstacleError> {
        if !a.is_finite() || !b.is_finite() || !lower.is_finite() || !upper.is_finite() {
            return Err(ObstacleError::NonFinite);
        }
        if (b - a).planar_length() <= 0.0 {
            return Err(ObstacleError::DegenerateWall {
                reason: "endpoints coincide in plan".into(),
            });
        }
        if lower > upper {
            return Err(ObstacleError::DegenerateWall {
                reason: format!("lower elevation {lower} above upper elevation {upper}"),
            });
        }
        Ok(Self { a, b, lower, upper })
    }

    /// Planar endpoints.
    pub fn endpoints(&self) -> (Vec3, Vec3) {
        (self.a, self.b)
    }

    /// `(lower, upper)` elevation band.
    pub fn elevation(&self) -> (f64, f64) {
        (self.lower, self.upper)
    }

    /// Parameter `s ∈ [0, 1]` along `start → target` where the movement
    /// crosses the wall, or `None`.
    ///
    /// The movement is blocked only if its plan projection intersects the
    /// wall segment and its elevation range overlaps the wall's band.
    pub fn crossing(&self, start: Vec3, target: Vec3) -> Option<f64> {
        let z_min = start.z.min(target.z);
        let z_max = start.z.max(target.z);
        if z_max < self.lower || z_min > self.upper {
            return None;
        }
        let d = target - start;
        let e = self.b - self.a;
        let denom = planar_cross(d, e);
        if denom.abs() <= f64::EPSILON * d.planar_length() * e.planar_length() {
            // parallel or collinear
            return None;
        }
        let w = self.a - start;
        let s = planar_cross(w, e) / denom;
        let u = planar_cross(w, d) / denom;
        ((0.0..=1.0).contains(&s) && (0.0..=1.0).contains(&u)).then_some(s)
    }
}
