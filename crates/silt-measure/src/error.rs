//! Errors from the measurement store.

use std::error::Error;
use std::fmt;

/// Errors raised while merging or querying measurements.
#[derive(Clone, Debug, PartialEq)]
pub enum MeasurementError {
    /// A merge targeted a timestamp earlier than the latest one recorded.
    NonMonotonic {
        /// The rejected timestamp.
        time: f64,
        /// The latest recorded timestamp.
        last: f64,
    },
    /// Sampling interval definition is invalid.
    InvalidInterval {
        /// What is wrong with it.
        reason: String,
    },
    /// A sampling interval index beyond the defined intervals.
    IntervalOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of intervals.
        count: usize,
    },
}

impl fmt::Display for MeasurementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonMonotonic { time, last } => {
                write!(f, "timestamp {time} precedes latest recorded timestamp {last}")
            }
            Self::InvalidInterval { reason } => write!(f, "invalid sampling interval: {reason}"),
            Self::IntervalOutOfRange { index, count } => {
                write!(f, "sampling interval {index} out of range (0..{count})")
            }
        }
    }
}

impl Error for MeasurementError {}
