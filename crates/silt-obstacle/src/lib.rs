//! 3D collision primitives for subsurface particle movement.
//!
//! An [`ObstacleField`] holds read-only [`Wall`] and [`Plane`] obstacles.
//! [`check_movement`](ObstacleField::check_movement) returns a
//! [`Movement`]: either the path is clear or it is blocked, in which case
//! the particle stops one millimetre before the nearest obstacle along its
//! path. Nothing here mutates particles; the caller applies the outcome.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod field;
pub mod plane;
pub mod wall;

pub use error::ObstacleError;
pub use field::{Movement, Obstacle, ObstacleField, BACK_OFF};
pub use plane::Plane;
pub use wall::Wall;
