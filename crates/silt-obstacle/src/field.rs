//! The obstacle set consulted by the soil mover.

use silt_core::Vec3;

use crate::plane::Plane;
use crate::wall::Wall;

/// Distance [m] a blocked particle is kept in front of the obstacle.
pub const BACK_OFF: f64 = 0.001;

/// A single collision primitive.
#[derive(Clone, Debug, PartialEq)]
pub enum Obstacle {
    /// Vertical wall with an elevation band.
    Wall(Wall),
    /// Bounded polygon.
    Plane(Plane),
}

impl Obstacle {
    /// Crossing parameter along `start → target`, if the movement hits.
    pub fn crossing(&self, start: Vec3, target: Vec3, movement_length: f64) -> Option<f64> {
        match self {
            Self::Wall(w) => w.crossing(start, target),
            Self::Plane(p) => {
                if p.is_far(start, movement_length) {
                    None
                } else {
                    p.crossing(start, target)
                }
            }
        }
    }
}

impl From<Wall> for Obstacle {
    fn from(w: Wall) -> Self {
        Self::Wall(w)
    }
}

impl From<Plane> for Obstacle {
    fn from(p: Plane) -> Self {
        Self::Plane(p)
    }
}

/// Outcome of a movement check.
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Movement {
    /// The path to the target is clear.
    Unblocked,
    /// The path hits an obstacle; the particle stops at `position`.
    Blocked {
        /// Deflected position one [`BACK_OFF`] before the obstacle.
        position: Vec3,
        /// Index of the obstacle that was hit.
        obstacle: usize,
    },
}

impl Movement {
    /// Final position for a movement towards `target`.
    pub fn resolve(self, target: Vec3) -> Vec3 {
        match self {
            Self::Unblocked => target,
            Self::Blocked { position, .. } => position,
        }
    }

    /// True if an obstacle was hit.
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }
}

/// Read-only collection of obstacles shared by all workers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObstacleField {
    obstacles: Vec<Obstacle>,
}

impl ObstacleField {
    /// An empty field; every movement is unblocked.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an obstacle and return its index.
    pub fn push(&mut self, obstacle: impl Into<Obstacle>) -> usize {
        self.obstacles.push(obstacle.into());
        self.obstacles.len() - 1
    }

    /// Builder form of [`push`](Self::push).
    pub fn with(mut self, obstacle: impl Into<Obstacle>) -> Self {
        self.push(obstacle);
        self
    }

    /// Number of obstacles.
    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    /// True if the field holds no obstacles.
    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    /// The obstacles in insertion order.
    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    /// Check a movement of `movement_length` metres from `start` to `target`.
    ///
    /// The nearest crossing along the path wins. Its parameter is reduced
    /// by `BACK_OFF / movement_length` (not below 0) and the deflected point
    /// is interpolated on the path at that parameter.
    pub fn check_movement(&self, start: Vec3, target: Vec3, movement_length: f64) -> Movement {
        if movement_length <= 0.0 || !movement_length.is_finite() {
            return Movement::Unblocked;
        }
        let nearest = self
            .obstacles
            .iter()
            .enumerate()
            .filter_map(|(i, o)| o.crossing(start, target, movement_length).map(|s| (i, s)))
            .min_by(|a, b| a.1.total_cmp(&b.1));
        match nearest {
            None => Movement::Unblocked,
            Some((obstacle, s)) => {
                let s = (s - BACK_OFF / movement_length).max(0.0);
                Movement::Blocked {
                    position: start.lerp(target, s),
                    obstacle,
                }
            }
        }
    }
}
