//! Silt: Lagrangian particle transport and routing for urban drainage.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Silt sub-crates. For most users, adding `silt` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use silt::prelude::*;
//! use silt_test_utils::fixtures::straight_sewer;
//!
//! let sewer = straight_sewer(3, 10.0, 1.0);
//! let head = sewer.nodes[0];
//! let mut sim = Simulation::builder(sewer.net)
//!     .config(SimulationConfig { end_time: 60.0, ..Default::default() })
//!     .material(Material::new(MaterialId(0), "sand", 0.5))
//!     .injection(InjectionSpec::new(
//!         InjectionKind::Point { capacity: head, offset: 0.0 },
//!         MaterialId(0),
//!         100,
//!     ))
//!     .build()
//!     .unwrap();
//! let steps = sim.run(&StopHandle::new()).unwrap();
//! assert_eq!(steps, 60);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `silt-core` | IDs, geometry, particles, materials, the hydraulic view |
//! | [`routing`] | `silt-routing` | Routing, deposition/erosion and dispersion models |
//! | [`injection`] | `silt-injection` | Injection specs, placement and id allocation |
//! | [`obstacle`] | `silt-obstacle` | Walls and planes clipping subsurface moves |
//! | [`measure`] | `silt-measure` | Visit aggregation, time series, traces |
//! | [`engine`] | `silt-engine` | Worker pool and step coordinator |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and IDs (`silt-core`).
///
/// Implement [`types::HydraulicView`] to plug a drainage model into the
/// engine.
pub use silt_core as types;

/// Routing and dispersion models (`silt-routing`).
pub use silt_routing as routing;

/// Injection specifications and particle id allocation (`silt-injection`).
pub use silt_injection as injection;

/// Subsurface collision primitives (`silt-obstacle`).
pub use silt_obstacle as obstacle;

/// Visit aggregation and measurement time series (`silt-measure`).
///
/// The [`measure::MeasurementStore`] of a run is available through
/// [`engine::Simulation::store`].
pub use silt_measure as measure;

/// Worker pool and step coordinator (`silt-engine`).
pub use silt_engine as engine;

/// Common imports for typical Silt usage.
///
/// ```rust
/// use silt::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use silt_core::{
        CapacityId, CapacityKind, HydraulicView, Material, MaterialId, Particle, ParticleId,
        ParticleStatus, Settling, TimeIndex, TimeIndexer, Vec3,
    };

    // Models
    pub use silt_routing::{
        ConstantDispersion, Dispersion, ErosionConfig, ErosiveRouting, HomogeneousRouting,
        Routing, RoutingConfig,
    };

    // Injection
    pub use silt_injection::{InjectionKind, InjectionSpec};

    // Obstacles
    pub use silt_obstacle::{ObstacleField, Plane, Wall};

    // Measurement
    pub use silt_measure::{MeasurementStore, Sample, SamplingIntervals};

    // Engine
    pub use silt_engine::{
        Simulation, SimulationConfig, SimulationError, StepMetrics, StopHandle,
    };
}
