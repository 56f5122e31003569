//! Linear mapping from a particle id onto an ordered index space.
//!
//! Particles of an injection spread evenly over `len` slots: the first id
//! maps to slot 0, the last id to slot `len - 1`.

use silt_core::ParticleId;

use crate::allocator::IdRange;
use crate::error::InjectionError;

/// `floor((len - 1) * (id - first) / (last - first))`.
///
/// Computed in integer arithmetic, so the mapping is exact, monotonic and
/// idempotent. A single-particle range maps to slot 0.
pub fn spread_index(len: usize, range: IdRange, id: ParticleId) -> Result<usize, InjectionError> {
    let ordinal = range.ordinal(id).ok_or(InjectionError::IdOutOfRange {
        id,
        first: range.first,
        last: range.last,
    })?;
    if len == 0 {
        return Err(InjectionError::EmptyCellSet);
    }
    let span = range.last.0 - range.first.0;
    if span == 0 {
        return Ok(0);
    }
    let slot = (len as u128 - 1) * ordinal as u128 / span as u128;
    Ok(slot as usize)
}

/// `(id - first) / (last - first)` in `[0, 1]`; 0 for a single-particle range.
pub fn spread_fraction(range: IdRange, id: ParticleId) -> Result<f64, InjectionError> {
    let ordinal = range.ordinal(id).ok_or(InjectionError::IdOutOfRange {
        id,
        first: range.first,
        last: range.last,
    })?;
    let span = range.last.0 - range.first.0;
    if span == 0 {
        return Ok(0.0);
    }
    Ok(ordinal as f64 / span as f64)
}
