//! Core types and traits for the Silt particle transport engine.
//!
//! This is the leaf crate with no internal dependencies. It defines the
//! fundamental abstractions used throughout the Silt workspace: typed
//! identifiers, error types, planar/3D geometry, the time-index mapper,
//! materials, the per-particle state record, and the read-only
//! [`HydraulicView`] through which the externally owned drainage topology
//! and its hydraulic results are consumed.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod geometry;
pub mod id;
pub mod material;
pub mod particle;
pub mod time;
pub mod topology;

pub use error::{ParticleError, TopologyError};
pub use geometry::Vec3;
pub use id::{CapacityId, InjectionId, MaterialId, ParticleId};
pub use material::{Material, Settling};
pub use particle::{Particle, ParticleStatus};
pub use time::{TimeIndex, TimeIndexer};
pub use topology::{CapacityKind, Connection, ConnectionList, HydraulicView, PipeEnd};
