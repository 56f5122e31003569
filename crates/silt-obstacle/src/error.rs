//! Errors from constructing obstacles.

use std::error::Error;
use std::fmt;

/// Rejected obstacle geometry.
#[derive(Clone, Debug, PartialEq)]
pub enum ObstacleError {
    /// A wall with zero planar length or an inverted elevation range.
    DegenerateWall {
        /// What is wrong with it.
        reason: String,
    },
    /// A polygon with fewer than three vertices or no defined normal.
    DegeneratePolygon {
        /// What is wrong with it.
        reason: String,
    },
    /// A coordinate is NaN or infinite.
    NonFinite,
}

impl fmt::Display for ObstacleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DegenerateWall { reason } => write!(f, "degenerate wall: {reason}"),
            Self::DegeneratePolygon { reason } => write!(f, "degenerate polygon: {reason}"),
            Self::NonFinite => write!(f, "obstacle coordinates must be finite"),
        }
    }
}

impl Error for ObstacleError {}
