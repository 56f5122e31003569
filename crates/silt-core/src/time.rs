//! Mapping from simulation time to the discrete hydraulic timestep.

use std::fmt;

/// Index of a hydraulic result interval.
///
/// All time-dependent [`HydraulicView`](crate::HydraulicView) readers
/// take a `TimeIndex`; the mapping from seconds is done once per step by
/// [`TimeIndexer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TimeIndex(pub usize);

impl fmt::Display for TimeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Converts wall-clock simulation time (seconds) into hydraulic intervals.
///
/// Interval `i` covers `[origin + i * interval, origin + (i + 1) * interval)`.
/// Times before the first interval map to index 0, times after the last
/// map to the last index: the hydraulic state is held at its boundary
/// values outside the recorded range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeIndexer {
    origin: f64,
    interval: f64,
    count: usize,
}

impl TimeIndexer {
    /// Create a mapper over `count` intervals of `interval` seconds starting at `origin`.
    ///
    /// Returns `None` if `interval` is not finite and positive, `origin`
    /// is not finite, or `count` is zero.
    pub fn new(origin: f64, interval: f64, count: usize) -> Option<Self> {
        if !origin.is_finite() || !interval.is_finite() || interval <= 0.0 || count == 0 {
            return None;
        }
        Some(Self {
            origin,
            interval,
            count,
        })
    }

    /// Start of the first interval in seconds.
    pub fn origin(&self) -> f64 {
        self.origin
    }

    /// Interval length in seconds.
    pub fn interval(&self) -> f64 {
        self.interval
    }

    /// Number of intervals.
    pub fn count(&self) -> usize {
        self.count
    }

    /// End of the last interval in seconds.
    pub fn end(&self) -> f64 {
        self.origin + self.interval * self.count as f64
    }

    /// Interval containing `time`, clamped to the recorded range.
    pub fn index_at(&self, time: f64) -> TimeIndex {
        TimeIndex(self.locate(time).0)
    }

    /// Interval containing `time` plus the fractional position inside it (`[0, 1)`).
    ///
    /// Clamped times report a fraction of 0 at the start and 1 at the end.
    pub fn locate(&self, time: f64) -> (usize, f64) {
        let rel = (time - self.origin) / self.interval;
        if !(rel > 0.0) {
            return (0, 0.0);
        }
        let idx = rel.floor() as usize;
        if idx >= self.count {
            return (self.count - 1, 1.0);
        }
        (idx, rel - idx as f64)
    }

    /// Start time of interval `index`.
    pub fn time_of(&self, index: TimeIndex) -> f64 {
        self.origin + self.interval * index.0 as f64
    }
}
