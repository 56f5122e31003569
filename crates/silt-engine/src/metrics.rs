//! Per-step counters and timings.

use std::ops::AddAssign;

/// Events counted by the workers during one step.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StepCounters {
    /// Particles active at the end of the step.
    pub active: u64,
    /// Particles still waiting for release.
    pub waiting: u64,
    /// Particles released during the step.
    pub released: u64,
    /// Particles that left the modeled domain during the step.
    pub left: u64,
    /// Routing walks that never reached their threshold.
    pub routing_inconsistencies: u64,
    /// Flow speeds above the configured bound.
    pub velocity_warnings: u64,
    /// Soil movements clipped by an obstacle.
    pub blocked_movements: u64,
    /// Particles spilled from a node onto the surface.
    pub spills: u64,
    /// Spills that found no linked surface cell.
    pub spill_failures: u64,
    /// Particles captured by surface inlets.
    pub drained: u64,
    /// Particles stopped by the per-step hop limit.
    pub hop_limit_hits: u64,
    /// Releases whose placement could not be resolved.
    pub placement_failures: u64,
    /// Topology lookups or state transitions that failed mid-move.
    pub consistency_errors: u64,
}

impl AddAssign<&StepCounters> for StepCounters {
    fn add_assign(&mut self, rhs: &StepCounters) {
        self.active += rhs.active;
        self.waiting += rhs.waiting;
        self.released += rhs.released;
        self.left += rhs.left;
        self.routing_inconsistencies += rhs.routing_inconsistencies;
        self.velocity_warnings += rhs.velocity_warnings;
        self.blocked_movements += rhs.blocked_movements;
        self.spills += rhs.spills;
        self.spill_failures += rhs.spill_failures;
        self.drained += rhs.drained;
        self.hop_limit_hits += rhs.hop_limit_hits;
        self.placement_failures += rhs.placement_failures;
        self.consistency_errors += rhs.consistency_errors;
    }
}

/// Timing and counters for a single step.
///
/// All durations are in microseconds.
#[derive(Clone, Debug, Default)]
pub struct StepMetrics {
    /// Simulation time at the end of the step [s].
    pub time: f64,
    /// Wall-clock time for the entire step.
    pub total_us: u64,
    /// Busy time of the slowest worker.
    pub slowest_worker_us: u64,
    /// Time spent merging aggregators into the store.
    pub merge_us: u64,
    /// Counters summed over all workers.
    pub counters: StepCounters,
}
