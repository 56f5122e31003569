//! Velocity capability consulted by deposition and erosion decisions.
//!
//! The capacity kind is resolved once per call site into a
//! [`CapacityProbe`]; the models only see the [`VelocityProvider`]
//! capability and never switch on capacity types themselves.

use silt_core::{CapacityId, CapacityKind, HydraulicView, TimeIndex, TopologyError};

/// Anything that can report the flow speed a particle currently feels.
pub trait VelocityProvider {
    /// Current flow speed [m/s]; the sign is irrelevant to the models.
    fn current_velocity(&self) -> f64;
}

impl VelocityProvider for f64 {
    fn current_velocity(&self) -> f64 {
        *self
    }
}

/// Velocity of one capacity at one timestep.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CapacityProbe {
    /// The probed capacity.
    pub capacity: CapacityId,
    /// Its kind.
    pub kind: CapacityKind,
    /// Flow speed [m/s].
    pub velocity: f64,
}

impl CapacityProbe {
    /// Read the flow speed of `capacity` at `t`.
    ///
    /// Pipes report their mean velocity, surface and soil cells the
    /// magnitude of their local velocity vector. Manholes are treated as
    /// still water.
    pub fn resolve(
        view: &dyn HydraulicView,
        capacity: CapacityId,
        t: TimeIndex,
    ) -> Result<Self, TopologyError> {
        let kind = view
            .kind(capacity)
            .ok_or(TopologyError::UnknownCapacity { capacity })?;
        let velocity = match kind {
            CapacityKind::Pipe => view.velocity(capacity, t).abs(),
            CapacityKind::Manhole => 0.0,
            CapacityKind::SurfaceCell => view.surface_velocity(capacity, t).planar_length(),
            CapacityKind::SoilCell => view.soil_velocity(capacity, t).length(),
        };
        Ok(Self {
            capacity,
            kind,
            velocity,
        })
    }
}

impl VelocityProvider for CapacityProbe {
    fn current_velocity(&self) -> f64 {
        self.velocity
    }
}
