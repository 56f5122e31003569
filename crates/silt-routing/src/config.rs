//! Immutable routing configuration.
//!
//! Passed into model constructors once; nothing in the routing path reads
//! process-global switches.

use crate::error::{non_negative, positive, RoutingError};

/// How a node's outflow connection is picked among the wetted candidates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OutflowSelection {
    /// Probability proportional to each connection's discharge.
    #[default]
    FlowProportional,
    /// Every wetted outflow connection is equally likely.
    Uniform,
}

/// Configuration shared by all routing models.
#[derive(Clone, Debug, PartialEq)]
pub struct RoutingConfig {
    /// Water depth [m] below which a node or surface cell counts as dry
    /// and nothing moves. Default: 0.001.
    pub dry_threshold: f64,
    /// Total candidate discharge [m³/s] below which routing is skipped.
    /// Default: 1e-5.
    pub negligible_flow: f64,
    /// Outflow selection rule. Default: flow-proportional.
    pub outflow: OutflowSelection,
    /// Whether a node's overflow discharge competes with its pipes
    /// during downstream routing. Default: true.
    pub spill_to_surface: bool,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            dry_threshold: 0.001,
            negligible_flow: 1e-5,
            outflow: OutflowSelection::FlowProportional,
            spill_to_surface: true,
        }
    }
}

impl RoutingConfig {
    /// Check that all thresholds are finite and non-negative.
    pub fn validate(&self) -> Result<(), RoutingError> {
        non_negative("dry_threshold", self.dry_threshold)?;
        non_negative("negligible_flow", self.negligible_flow)?;
        Ok(())
    }
}

/// Critical velocities for the depositing/eroding model.
#[derive(Clone, Debug, PartialEq)]
pub struct ErosionConfig {
    /// Critical deposition velocity `v_dep` [m/s]. Default: 0.1.
    pub deposition_velocity: f64,
    /// Critical erosion velocity `v_ero` [m/s]. Default: 0.3.
    pub erosion_velocity: f64,
}

impl Default for ErosionConfig {
    fn default() -> Self {
        Self {
            deposition_velocity: 0.1,
            erosion_velocity: 0.3,
        }
    }
}

impl ErosionConfig {
    /// Both velocities must be finite and strictly positive.
    pub fn validate(&self) -> Result<(), RoutingError> {
        positive("deposition_velocity", self.deposition_velocity)?;
        positive("erosion_velocity", self.erosion_velocity)?;
        Ok(())
    }
}
