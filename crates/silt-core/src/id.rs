//! Strongly-typed identifiers.

use std::fmt;

/// Identifies a particle within one simulation run.
///
/// Allocated in contiguous ranges per injection by the run's id allocator.
/// Ids are only unique within a run; a new run starts again at zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticleId(pub u64);

impl fmt::Display for ParticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ParticleId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Identifies a capacity: a pipe, manhole, surface cell or soil cell.
///
/// Capacity ids are assigned by the topology layer and are stable for the
/// lifetime of a [`HydraulicView`](crate::HydraulicView).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CapacityId(pub u32);

impl fmt::Display for CapacityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for CapacityId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies a material. `MaterialId(n)` is the n-th registered material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub u32);

impl fmt::Display for MaterialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for MaterialId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies an injection. `InjectionId(n)` is the n-th registered injection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InjectionId(pub u32);

impl fmt::Display for InjectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for InjectionId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}
