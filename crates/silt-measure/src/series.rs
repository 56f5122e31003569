//! Per-capacity time series.

use crate::error::MeasurementError;
use crate::sample::{Interpolated, Sample};

/// Samples of one capacity ordered by strictly increasing timestamp.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimeSeries {
    times: Vec<f64>,
    samples: Vec<Sample>,
}

impl TimeSeries {
    /// An empty series.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `sample` at `time`.
    ///
    /// A timestamp equal to the latest one accumulates into that sample;
    /// an earlier one is rejected.
    pub fn accumulate(&mut self, time: f64, sample: &Sample) -> Result<(), MeasurementError> {
        match self.times.last() {
            Some(&last) if time < last => Err(MeasurementError::NonMonotonic { time, last }),
            Some(&last) if time == last => {
                if let Some(s) = self.samples.last_mut() {
                    *s += sample;
                }
                Ok(())
            }
            _ => {
                self.times.push(time);
                self.samples.push(*sample);
                Ok(())
            }
        }
    }

    /// Number of timestamps.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// True if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Recorded timestamps.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Iterate `(time, sample)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (f64, &Sample)> {
        self.times.iter().copied().zip(self.samples.iter())
    }

    /// Sample recorded exactly at `time`.
    pub fn exact(&self, time: f64) -> Option<&Sample> {
        let i = self.times.partition_point(|&t| t < time);
        (self.times.get(i) == Some(&time)).then(|| &self.samples[i])
    }

    /// Latest sample at or before `time`.
    pub fn at_or_before(&self, time: f64) -> Option<(f64, &Sample)> {
        let i = self.times.partition_point(|&t| t <= time);
        let i = i.checked_sub(1)?;
        Some((self.times[i], &self.samples[i]))
    }

    /// Linear interpolation between the samples around `time`.
    ///
    /// `None` before the first sample; the last sample is held after the end.
    pub fn interpolate(&self, time: f64) -> Option<Interpolated> {
        let i = self.times.partition_point(|&t| t <= time);
        let lo = i.checked_sub(1)?;
        match self.times.get(i) {
            None => Some(Interpolated::from(&self.samples[lo])),
            Some(&t1) => {
                let t0 = self.times[lo];
                let s = (time - t0) / (t1 - t0);
                Some(Interpolated::between(&self.samples[lo], &self.samples[i], s))
            }
        }
    }
}
