//! Worker pool and step coordinator for the Silt particle transport engine.
//!
//! A [`Simulation`] partitions the particle population over a fixed pool
//! of worker threads. Every step the coordinator hands each worker its
//! measurement aggregator, waits until all workers have replied (the
//! barrier), folds the aggregators into the [`MeasurementStore`] and
//! advances the clock. Workers own their particles and random generators
//! for the whole run; topology, routing, dispersion and obstacles are
//! shared read-only.
//!
//! [`MeasurementStore`]: silt_measure::MeasurementStore

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod metrics;
mod mover;
pub mod simulation;
mod worker;

pub use config::{ConfigError, SimulationConfig};
pub use metrics::{StepCounters, StepMetrics};
pub use simulation::{Simulation, SimulationBuilder, SimulationError, StopHandle};
