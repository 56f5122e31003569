//! Per-run particle id allocation.

use silt_core::ParticleId;

use crate::error::InjectionError;

/// A contiguous inclusive range of particle ids `[first, last]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IdRange {
    /// First id of the range.
    pub first: ParticleId,
    /// Last id of the range (inclusive).
    pub last: ParticleId,
}

impl IdRange {
    /// Number of ids in the range.
    pub fn len(&self) -> u64 {
        self.last.0 - self.first.0 + 1
    }

    /// Always false: an allocated range holds at least one id.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// True if `id` lies within the range.
    pub fn contains(&self, id: ParticleId) -> bool {
        (self.first.0..=self.last.0).contains(&id.0)
    }

    /// Zero-based position of `id` within the range.
    pub fn ordinal(&self, id: ParticleId) -> Option<u64> {
        self.contains(id).then(|| id.0 - self.first.0)
    }

    /// Iterate over all ids in order.
    pub fn iter(&self) -> impl Iterator<Item = ParticleId> {
        (self.first.0..=self.last.0).map(ParticleId)
    }
}

/// Hands out monotonically increasing particle ids for one simulation run.
///
/// Every run owns its allocator; ids restart at zero after
/// [`reset`](Self::reset), so two runs with the same injections produce the
/// same ids.
#[derive(Debug, Default)]
pub struct ParticleIdAllocator {
    next: u64,
}

impl ParticleIdAllocator {
    /// A fresh allocator starting at id 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `count` consecutive ids.
    pub fn allocate(&mut self, count: u64) -> Result<IdRange, InjectionError> {
        if count == 0 {
            return Err(InjectionError::EmptyRange);
        }
        let last = self
            .next
            .checked_add(count - 1)
            .ok_or(InjectionError::IdSpaceExhausted)?;
        let range = IdRange {
            first: ParticleId(self.next),
            last: ParticleId(last),
        };
        self.next = last.checked_add(1).ok_or(InjectionError::IdSpaceExhausted)?;
        Ok(range)
    }

    /// The id the next allocation will start at.
    pub fn peek(&self) -> ParticleId {
        ParticleId(self.next)
    }

    /// Number of ids handed out since the last reset.
    pub fn allocated(&self) -> u64 {
        self.next
    }

    /// Restart at id 0 for a new run.
    pub fn reset(&mut self) {
        self.next = 0;
    }
}
