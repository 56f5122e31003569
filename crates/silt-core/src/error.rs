//! Error types shared across the Silt workspace.

use std::error::Error;
use std::fmt;

use crate::id::{CapacityId, ParticleId};
use crate::topology::CapacityKind;

/// Errors from particle status transitions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParticleError {
    /// The particle already left the simulation and cannot re-enter it.
    Terminal {
        /// The particle that was asked to move.
        particle: ParticleId,
    },
}

impl fmt::Display for ParticleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terminal { particle } => {
                write!(f, "particle {particle} has left the simulation")
            }
        }
    }
}

impl Error for ParticleError {}

/// Errors from lookups against the topology view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TopologyError {
    /// The capacity id is not known to the view.
    UnknownCapacity {
        /// The unknown id.
        capacity: CapacityId,
    },
    /// The capacity exists but is of a different kind than required.
    WrongKind {
        /// The capacity that was looked up.
        capacity: CapacityId,
        /// The kind the caller required.
        expected: CapacityKind,
        /// The kind the view reported.
        found: CapacityKind,
    },
    /// The view has no surface cells.
    NoSurface,
}

impl fmt::Display for TopologyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCapacity { capacity } => write!(f, "unknown capacity {capacity}"),
            Self::WrongKind {
                capacity,
                expected,
                found,
            } => write!(
                f,
                "capacity {capacity} is a {found:?}, expected a {expected:?}"
            ),
            Self::NoSurface => write!(f, "topology has no surface cells"),
        }
    }
}

impl Error for TopologyError {}
