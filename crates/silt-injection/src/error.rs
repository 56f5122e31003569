//! Errors from defining and realizing injections.

use std::error::Error;
use std::fmt;

use silt_core::{InjectionId, MaterialId, ParticleId, TopologyError};

/// Errors raised while allocating, validating or placing injections.
#[derive(Clone, Debug, PartialEq)]
pub enum InjectionError {
    /// An injection asked for zero particles.
    EmptyRange,
    /// The particle id space overflowed.
    IdSpaceExhausted,
    /// A sub-areal injection, or the surface it spreads over, has no cells.
    EmptyCellSet,
    /// A particle id does not belong to the injection it was mapped with.
    IdOutOfRange {
        /// The id that was mapped.
        id: ParticleId,
        /// First id of the injection.
        first: ParticleId,
        /// Last id of the injection.
        last: ParticleId,
    },
    /// The injection references a material that is not registered.
    UnknownMaterial {
        /// The missing material.
        material: MaterialId,
    },
    /// A numeric field of the injection is out of range.
    InvalidSpec {
        /// The offending injection.
        injection: InjectionId,
        /// What is wrong with it.
        reason: String,
    },
    /// The injection target could not be resolved in the topology.
    Topology(TopologyError),
}

impl fmt::Display for InjectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyRange => write!(f, "injection must release at least one particle"),
            Self::IdSpaceExhausted => write!(f, "particle id space exhausted"),
            Self::EmptyCellSet => write!(f, "injection cell set is empty"),
            Self::IdOutOfRange { id, first, last } => {
                write!(f, "particle {id} is outside injection range [{first}, {last}]")
            }
            Self::UnknownMaterial { material } => write!(f, "unknown material {material}"),
            Self::InvalidSpec { injection, reason } => {
                write!(f, "invalid injection {injection}: {reason}")
            }
            Self::Topology(e) => write!(f, "injection target: {e}"),
        }
    }
}

impl Error for InjectionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Topology(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TopologyError> for InjectionError {
    fn from(e: TopologyError) -> Self {
        Self::Topology(e)
    }
}
