//! Visit aggregation and measurement time series.
//!
//! Each worker records particle visits into its own [`LocalAggregator`];
//! there is no sharing on the hot path. After every worker has finished a
//! step the coordinator folds the aggregators into the global
//! [`MeasurementStore`] and resets them for reuse. The store answers
//! per-capacity lookups by time and per-sampling-interval statistics.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod aggregator;
pub mod error;
pub mod sample;
pub mod series;
pub mod store;
pub mod trace;

pub use aggregator::LocalAggregator;
pub use error::MeasurementError;
pub use sample::{Interpolated, Sample};
pub use series::TimeSeries;
pub use store::{IntervalStats, MeasurementStore, SamplingIntervals};
pub use trace::{TracePoint, TraceRecorder};
