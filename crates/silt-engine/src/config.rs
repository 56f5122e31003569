//! Simulation configuration, validation, and error types.

use std::error::Error;
use std::fmt;

use silt_core::TimeIndexer;

// ── SimulationConfig ────────────────────────────────────────────

/// Run-wide settings for a [`Simulation`](crate::Simulation).
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationConfig {
    /// Step length [s]. Default: 1.0.
    pub dt: f64,
    /// Simulation start time [s]. Default: 0.0.
    pub start_time: f64,
    /// Simulation end time [s]. Default: 3600.0.
    pub end_time: f64,
    /// Seed of the per-worker random streams. Default: 0.
    pub seed: u64,
    /// Worker thread count. `None` = auto-detect. Default: `None`.
    pub worker_count: Option<usize>,
    /// Maximum node hand-overs per particle and step. Default: 16.
    pub max_hops_per_step: u32,
    /// Flow speed [m/s] above which a warning is raised. Default: 10.0.
    pub velocity_bound: f64,
    /// Whether particle position histories are recorded. Default: false.
    pub record_traces: bool,
    /// Spacing of trace samples [s]. Default: 60.0.
    pub trace_interval: f64,
    /// Mapping from simulation time to the hydraulic timestep.
    /// `None` reads every step at [`TimeIndex(0)`](silt_core::TimeIndex).
    /// Default: `None`.
    pub hydraulics: Option<TimeIndexer>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            dt: 1.0,
            start_time: 0.0,
            end_time: 3600.0,
            seed: 0,
            worker_count: None,
            max_hops_per_step: 16,
            velocity_bound: 10.0,
            record_traces: false,
            trace_interval: 60.0,
            hydraulics: None,
        }
    }
}

impl SimulationConfig {
    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(ConfigError::InvalidTimeStep { dt: self.dt });
        }
        if !self.start_time.is_finite()
            || !self.end_time.is_finite()
            || self.end_time < self.start_time
        {
            return Err(ConfigError::InvalidTimeRange {
                start: self.start_time,
                end: self.end_time,
            });
        }
        if self.max_hops_per_step == 0 {
            return Err(ConfigError::ZeroHops);
        }
        if !(self.velocity_bound > 0.0) {
            return Err(ConfigError::InvalidVelocityBound {
                bound: self.velocity_bound,
            });
        }
        if self.record_traces && !(self.trace_interval.is_finite() && self.trace_interval > 0.0) {
            return Err(ConfigError::InvalidTraceInterval {
                interval: self.trace_interval,
            });
        }
        Ok(())
    }

    /// Resolve the worker count, clamping explicit values to `[1, 64]`.
    pub fn resolved_worker_count(&self) -> usize {
        match self.worker_count {
            Some(n) => n.clamp(1, 64),
            None => {
                let cpus = std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(4);
                cpus.clamp(1, 16)
            }
        }
    }

    /// Number of steps between `start_time` and `end_time`.
    ///
    /// A ratio within rounding error of a whole number counts as that
    /// number, so `0.27 / 0.09` is three steps and not four.
    pub fn step_count(&self) -> u64 {
        let ratio = (self.end_time - self.start_time) / self.dt;
        let nearest = ratio.round();
        if (ratio - nearest).abs() <= STEP_TOLERANCE * nearest.max(1.0) {
            nearest.max(0.0) as u64
        } else {
            ratio.ceil().max(0.0) as u64
        }
    }
}

/// Relative slack when deciding whether the time range is a whole number
/// of steps.
const STEP_TOLERANCE: f64 = 1e-9;

// ── ConfigError ─────────────────────────────────────────────────

/// Errors detected during [`SimulationConfig::validate()`].
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// `dt` is not finite or not positive.
    InvalidTimeStep {
        /// The rejected step length.
        dt: f64,
    },
    /// The time range is not finite or ends before it starts.
    InvalidTimeRange {
        /// Configured start.
        start: f64,
        /// Configured end.
        end: f64,
    },
    /// `max_hops_per_step` is zero.
    ZeroHops,
    /// The velocity warning bound is not positive.
    InvalidVelocityBound {
        /// The rejected bound.
        bound: f64,
    },
    /// Traces are enabled with a non-positive interval.
    InvalidTraceInterval {
        /// The rejected interval.
        interval: f64,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTimeStep { dt } => write!(f, "time step must be finite and > 0, got {dt}"),
            Self::InvalidTimeRange { start, end } => {
                write!(f, "invalid time range [{start}, {end}]")
            }
            Self::ZeroHops => write!(f, "max_hops_per_step must be at least 1"),
            Self::InvalidVelocityBound { bound } => {
                write!(f, "velocity bound must be > 0, got {bound}")
            }
            Self::InvalidTraceInterval { interval } => {
                write!(f, "trace interval must be finite and > 0, got {interval}")
            }
        }
    }
}

impl Error for ConfigError {}
