//! Velocity-dependent deposition and erosion.

use rand::{Rng, RngCore};

use silt_core::{CapacityId, HydraulicView, Particle, TimeIndex};

use crate::config::{ErosionConfig, RoutingConfig};
use crate::error::RoutingError;
use crate::probe::VelocityProvider;
use crate::routing::{HomogeneousRouting, Route, Routing, Search};

/// Routing model whose particles settle in slow water and are picked up
/// again in fast water.
///
/// With `v` the flow speed a particle feels:
///
/// - deposition probability `P_dep = 1 - v² / v_dep²`
/// - erosion probability `P_ero = v² / v_ero² - 1`
///
/// Neither probability is clamped to `[0, 1]`. A value at or below zero
/// never fires and a value at or above one always fires. Node routing is
/// that of [`HomogeneousRouting`].
#[derive(Clone, Debug)]
pub struct ErosiveRouting {
    base: HomogeneousRouting,
    erosion: ErosionConfig,
}

impl ErosiveRouting {
    /// Create from routing and erosion configuration; both are validated.
    pub fn new(routing: RoutingConfig, erosion: ErosionConfig) -> Result<Self, RoutingError> {
        erosion.validate()?;
        Ok(Self {
            base: HomogeneousRouting::new(routing)?,
            erosion,
        })
    }

    /// The critical velocities in use.
    pub fn erosion_config(&self) -> &ErosionConfig {
        &self.erosion
    }

    /// `P_dep` for flow speed `v`.
    pub fn deposition_probability(&self, v: f64) -> f64 {
        let v_dep = self.erosion.deposition_velocity;
        1.0 - (v * v) / (v_dep * v_dep)
    }

    /// `P_ero` for flow speed `v`.
    pub fn erosion_probability(&self, v: f64) -> f64 {
        let v_ero = self.erosion.erosion_velocity;
        (v * v) / (v_ero * v_ero) - 1.0
    }
}

impl Routing for ErosiveRouting {
    fn name(&self) -> &str {
        "ErosiveRouting"
    }

    fn config(&self) -> &RoutingConfig {
        self.base.config()
    }

    fn decide_deposit(
        &self,
        _particle: &Particle,
        capacity: &dyn VelocityProvider,
        rng: &mut dyn RngCore,
    ) -> bool {
        let p = self.deposition_probability(capacity.current_velocity());
        rng.random::<f64>() < p
    }

    fn decide_erode(
        &self,
        _particle: &Particle,
        capacity: &dyn VelocityProvider,
        rng: &mut dyn RngCore,
    ) -> bool {
        let p = self.erosion_probability(capacity.current_velocity());
        rng.random::<f64>() < p
    }

    fn choose_connection(
        &self,
        node: CapacityId,
        view: &dyn HydraulicView,
        t: TimeIndex,
        search: Search,
        rng: &mut dyn RngCore,
    ) -> Result<Option<Route>, RoutingError> {
        self.base.choose_connection(node, view, t, search, rng)
    }
}
