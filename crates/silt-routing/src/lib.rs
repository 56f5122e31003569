//! Routing and dispersion models.
//!
//! A [`Routing`] model decides which connection a particle leaves a node
//! through, and whether a particle in motion deposits or a resting one is
//! eroded. A [`Dispersion`] model yields the coefficient that scales the
//! random-walk jump. Both are shared read-only by every worker; all
//! randomness comes from the caller's per-worker generator.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod dispersion;
pub mod erosion;
pub mod error;
pub mod probe;
pub mod routing;

pub use config::{ErosionConfig, OutflowSelection, RoutingConfig};
pub use dispersion::{
    jump_std_dev, standard_normal, ConstantDispersion, Dispersion, MaterialDispersion, Parameter,
    VelocityScaledDispersion,
};
pub use erosion::ErosiveRouting;
pub use error::RoutingError;
pub use probe::{CapacityProbe, VelocityProvider};
pub use routing::{HomogeneousRouting, Route, Routing, Search};
