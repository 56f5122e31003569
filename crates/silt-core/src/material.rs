//! Immutable physical descriptors carried by particles.

use crate::id::MaterialId;

/// Settling behaviour class of a material.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Settling {
    /// Stays at the water surface; never deposits.
    Floating,
    /// Travels with the flow in suspension.
    Suspended,
    /// Sinks with the given settling velocity [m/s].
    Settling {
        /// Terminal settling velocity [m/s].
        velocity: f64,
    },
}

/// A transported material (pollutant, sediment fraction, tracer).
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    /// Index of this material in the run's material table.
    pub id: MaterialId,
    /// Human-readable name.
    pub name: String,
    /// Density [kg/m³].
    pub density: f64,
    /// Mass carried by one particle when an injection does not fix a total mass [kg].
    pub mass_per_particle: f64,
    /// Settling class.
    pub settling: Settling,
}

impl Material {
    /// A suspended material with the given per-particle mass and water density.
    pub fn new(id: MaterialId, name: impl Into<String>, mass_per_particle: f64) -> Self {
        Self {
            id,
            name: name.into(),
            density: 1000.0,
            mass_per_particle,
            settling: Settling::Suspended,
        }
    }

    /// Set the density [kg/m³].
    pub fn with_density(mut self, density: f64) -> Self {
        self.density = density;
        self
    }

    /// Set the settling class.
    pub fn with_settling(mut self, settling: Settling) -> Self {
        self.settling = settling;
        self
    }
}
