//! The mutable per-particle record threaded through movers and routing.
//!
//! The domain status is private and only changes through
//! [`Particle::enter`] and [`Particle::leave`], so "active" is always
//! derived from the status and can never disagree with it.

use crate::error::ParticleError;
use crate::geometry::Vec3;
use crate::id::{CapacityId, InjectionId, MaterialId, ParticleId};
use crate::topology::CapacityKind;

/// Which domain a particle is in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParticleStatus {
    /// Spawned but not yet released by its injection.
    Waiting,
    /// Inside a pipe or manhole.
    InPipeNetwork,
    /// On the 2D surface mesh.
    OnSurface,
    /// In the 3D subsurface.
    InSoil,
    /// Left the modeled domain. Terminal.
    LeftSimulation,
}

impl ParticleStatus {
    /// True for the three domain states.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            Self::InPipeNetwork | Self::OnSurface | Self::InSoil
        )
    }
}

/// A mass-carrying Lagrangian particle.
#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    id: ParticleId,
    material: MaterialId,
    mass: f64,
    injection: InjectionId,
    ordinal: u64,
    release_time: f64,
    status: ParticleStatus,
    capacity: Option<CapacityId>,
    /// Position along the current capacity's axis [m] (pipes only).
    pub position_1d: f64,
    /// Position in projected 3D space.
    pub position_3d: Vec3,
    /// Last axial velocity [m/s].
    pub velocity_1d: f64,
    /// Cumulative path length [m].
    pub travelled: f64,
    /// Whether the particle currently rests on the bed.
    pub deposited: bool,
}

impl Particle {
    /// A particle waiting for release at `release_time`.
    ///
    /// `ordinal` is the particle's position within its injection's id range.
    pub fn waiting(
        id: ParticleId,
        material: MaterialId,
        mass: f64,
        injection: InjectionId,
        ordinal: u64,
        release_time: f64,
    ) -> Self {
        Self {
            id,
            material,
            mass,
            injection,
            ordinal,
            release_time,
            status: ParticleStatus::Waiting,
            capacity: None,
            position_1d: 0.0,
            position_3d: Vec3::ZERO,
            velocity_1d: 0.0,
            travelled: 0.0,
            deposited: false,
        }
    }

    /// Unique id within the run.
    pub fn id(&self) -> ParticleId {
        self.id
    }

    /// Material carried.
    pub fn material(&self) -> MaterialId {
        self.material
    }

    /// Mass carried [kg].
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Injection that produced this particle.
    pub fn injection(&self) -> InjectionId {
        self.injection
    }

    /// Ordinal within the injection's id range.
    pub fn ordinal(&self) -> u64 {
        self.ordinal
    }

    /// Simulation time at which the particle becomes active [s].
    pub fn release_time(&self) -> f64 {
        self.release_time
    }

    /// Current domain status.
    pub fn status(&self) -> ParticleStatus {
        self.status
    }

    /// True while the particle is in one of the three domains.
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Capacity currently occupied, if active.
    pub fn capacity(&self) -> Option<CapacityId> {
        self.capacity
    }

    /// Move the particle into `capacity`, deriving its status from `kind`.
    ///
    /// Used both for release and for every domain or capacity change.
    /// A particle that has left the simulation is never resurrected.
    pub fn enter(
        &mut self,
        capacity: CapacityId,
        kind: CapacityKind,
        position_1d: f64,
        position_3d: Vec3,
    ) -> Result<(), ParticleError> {
        if self.status == ParticleStatus::LeftSimulation {
            return Err(ParticleError::Terminal { particle: self.id });
        }
        let next = kind.domain();
        if self.status.is_active() && self.status != next {
            // Domain change: a resting particle is picked up by the new domain.
            self.deposited = false;
        }
        self.status = next;
        self.capacity = Some(capacity);
        self.position_1d = position_1d;
        self.position_3d = position_3d;
        Ok(())
    }

    /// Remove the particle from the modeled domain. Terminal.
    pub fn leave(&mut self) {
        self.status = ParticleStatus::LeftSimulation;
        self.capacity = None;
        self.deposited = false;
        self.velocity_1d = 0.0;
    }
}
