//! Bounded planar polygons.

use silt_core::Vec3;

use crate::error::ObstacleError;

/// A flat polygon in 3D space, e.g. a building slab or an impermeable layer.
#[derive(Clone, Debug, PartialEq)]
pub struct Plane {
    vertices: Vec<Vec3>,
    normal: Vec3,
    centroid: Vec3,
    extent: f64,
    /// Axis dropped when projecting for the point-in-polygon test.
    dominant: usize,
}

impl Plane {
    /// Build a polygon from at least three non-collinear vertices in order.
    ///
    /// Vertices are assumed coplanar; the normal is the Newell average.
    pub fn new(vertices: Vec<Vec3>) -> Result<Self, ObstacleError> {
        if vertices.len() < 3 {
            return Err(ObstacleError::DegeneratePolygon {
                reason: format!("{} vertices, need at least 3", vertices.len()),
            });
        }
        if vertices.iter().any(|v| !v.is_finite()) {
            return Err(ObstacleError::NonFinite);
        }
        let mut newell = Vec3::ZERO;
        for (i, cur) in vertices.iter().enumerate() {
            let next = vertices[(i + 1) % vertices.len()];
            newell += Vec3::new(
                (cur.y - next.y) * (cur.z + next.z),
                (cur.z - next.z) * (cur.x + next.x),
                (cur.x - next.x) * (cur.y + next.y),
            );
        }
        let normal = newell.normalized().ok_or(ObstacleError::DegeneratePolygon {
            reason: "vertices are collinear".into(),
        })?;
        let sum = vertices.iter().fold(Vec3::ZERO, |acc, &v| acc + v);
        let centroid = sum * (1.0 / vertices.len() as f64);
        let extent = vertices
            .iter()
            .map(|&v| (v - centroid).length())
            .fold(0.0, f64::max);
        let (ax, ay, az) = (normal.x.abs(), normal.y.abs(), normal.z.abs());
        let dominant = if az >= ax && az >= ay {
            2
        } else if ay >= ax {
            1
        } else {
            0
        };
        Ok(Self {
            vertices,
            normal,
            centroid,
            extent,
            dominant,
        })
    }

    /// Unit normal.
    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    /// Mean of the vertices; the representative point for pre-filtering.
    pub fn centroid(&self) -> Vec3 {
        self.centroid
    }

    /// Largest vertex distance from the centroid [m].
    pub fn extent(&self) -> f64 {
        self.extent
    }

    /// Cheap rejection: true if a movement of `movement_length` starting at
    /// `start` cannot possibly reach the polygon.
    pub fn is_far(&self, start: Vec3, movement_length: f64) -> bool {
        let reach = 3.0 * movement_length + self.extent;
        (start - self.centroid).length_squared() > reach * reach
    }

    /// Parameter `s ∈ [0, 1]` along `start → target` where the movement
    /// pierces the polygon, or `None`.
    pub fn crossing(&self, start: Vec3, target: Vec3) -> Option<f64> {
        let d = target - start;
        let denom = self.normal.dot(d);
        if denom.abs() <= f64::EPSILON * d.length() {
            return None;
        }
        let s = self.normal.dot(self.centroid - start) / denom;
        if !(0.0..=1.0).contains(&s) {
            return None;
        }
        self.contains(start + d * s).then_some(s)
    }

    /// Crossing-number test on the projection that drops the dominant
    /// normal axis. `p` is assumed to lie in the polygon's plane.
    fn contains(&self, p: Vec3) -> bool {
        let project = |v: Vec3| match self.dominant {
            0 => (v.y, v.z),
            1 => (v.z, v.x),
            _ => (v.x, v.y),
        };
        let (px, py) = project(p);
        let n = self.vertices.len();
        let mut inside = false;
        for i in 0..n {
            let (xi, yi) = project(self.vertices[i]);
            let (xj, yj) = project(self.vertices[(i + n - 1) % n]);
            if (yi > py) != (yj > py) && px < (xj - xi) * (py - yi) / (yj - yi) + xi {
                inside = !inside;
            }
        }
        inside
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A 4 × 4 m horizontal slab at z = 2 centred on (2, 2).
    fn slab() -> Plane {
        Plane::new(vec![
            Vec3::new(0.0, 0.0, 2.0),
            Vec3::new(4.0, 0.0, 2.0),
            Vec3::new(4.0, 4.0, 2.0),
            Vec3::new(0.0, 4.0, 2.0),
        ])
        .unwrap()
    }

    #[test]
    fn horizontal_slab_geometry() {
        let p = slab();
        assert!((p.normal().z.abs() - 1.0).abs() < 1e-12);
        assert_eq!(p.centroid(), Vec3::new(2.0, 2.0, 2.0));
        assert!((p.extent() - 8f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn vertical_movement_through_slab() {
        let s = slab()
            .crossing(Vec3::new(1.0, 1.0, 0.0), Vec3::new(1.0, 1.0, 4.0))
            .unwrap();
        assert!((s - 0.5).abs() < 1e-12);
    }

    #[test]
    fn movement_beside_slab_passes() {
        assert_eq!(
            slab().crossing(Vec3::new(5.0, 1.0, 0.0), Vec3::new(5.0, 1.0, 4.0)),
            None
        );
    }

    #[test]
    fn movement_stopping_short_passes() {
        assert_eq!(
            slab().crossing(Vec3::new(1.0, 1.0, 0.0), Vec3::new(1.0, 1.0, 1.5)),
            None
        );
    }

    #[test]
    fn vertical_polygon_uses_other_projection() {
        let wall = Plane::new(vec![
            Vec3::new(3.0, 0.0, 0.0),
            Vec3::new(3.0, 2.0, 0.0),
            Vec3::new(3.0, 2.0, 2.0),
            Vec3::new(3.0, 0.0, 2.0),
        ])
        .unwrap();
        let s = wall
            .crossing(Vec3::new(0.0, 1.0, 1.0), Vec3::new(6.0, 1.0, 1.0))
            .unwrap();
        assert!((s - 0.5).abs() < 1e-12);
        assert_eq!(
            wall.crossing(Vec3::new(0.0, 1.0, 3.0), Vec3::new(6.0, 1.0, 3.0)),
            None
        );
    }

    #[test]
    fn far_prefilter() {
        let p = slab();
        assert!(p.is_far(Vec3::new(100.0, 100.0, 2.0), 1.0));
        assert!(!p.is_far(Vec3::new(6.0, 2.0, 2.0), 1.0));
    }

    #[test]
    fn rejects_degenerate_polygons() {
        assert!(matches!(
            Plane::new(vec![Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0)]),
            Err(ObstacleError::DegeneratePolygon { .. })
        ));
        assert!(matches!(
            Plane::new(vec![
                Vec3::ZERO,
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(2.0, 0.0, 0.0)
            ]),
            Err(ObstacleError::DegeneratePolygon { .. })
        ));
    }
}
