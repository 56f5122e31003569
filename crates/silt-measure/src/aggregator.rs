//! Worker-local visit counters.

use indexmap::IndexMap;

use silt_core::{CapacityId, Particle};

use crate::error::MeasurementError;
use crate::sample::Sample;
use crate::store::MeasurementStore;

/// Visit counters owned by exactly one worker.
///
/// Keys survive [`reset_counters`](Self::reset_counters), so a worker that
/// keeps visiting the same capacities stops allocating after warm-up.
#[derive(Clone, Debug, Default)]
pub struct LocalAggregator {
    counters: IndexMap<CapacityId, Sample>,
}

impl LocalAggregator {
    /// An empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count `particle` as present in `capacity`; `new_arrival` marks it
    /// as having arrived during this step.
    pub fn record_visit(&mut self, capacity: CapacityId, particle: &Particle, new_arrival: bool) {
        let entry = self.counters.entry(capacity).or_default();
        entry.count += 1;
        entry.mass += particle.mass();
        if new_arrival {
            entry.immigrated += 1;
            entry.immigrated_mass += particle.mass();
        }
    }

    /// Zero every counter, keeping the key set.
    pub fn reset_counters(&mut self) {
        for sample in self.counters.values_mut() {
            *sample = Sample::default();
        }
    }

    /// Fold all non-empty counters into `store` at `time`.
    pub fn merge_into(&self, store: &mut MeasurementStore, time: f64) -> Result<(), MeasurementError> {
        store.merge(time, self.counters.iter())
    }

    /// Counters for `capacity`, if it was ever visited.
    pub fn get(&self, capacity: CapacityId) -> Option<&Sample> {
        self.counters.get(&capacity)
    }

    /// Number of capacities ever visited since construction.
    pub fn key_count(&self) -> usize {
        self.counters.len()
    }

    /// True if every counter is zero.
    pub fn is_clear(&self) -> bool {
        self.counters.values().all(Sample::is_empty)
    }

    /// Sum of all counted mass [kg].
    pub fn total_mass(&self) -> f64 {
        self.counters.values().map(|s| s.mass).sum()
    }
}
