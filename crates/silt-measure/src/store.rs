//! The global measurement store and per-interval statistics.

use indexmap::IndexMap;

use silt_core::CapacityId;

use crate::error::MeasurementError;
use crate::sample::{Interpolated, Sample};
use crate::series::TimeSeries;

// ── SamplingIntervals ───────────────────────────────────────────

/// Equal-length measurement intervals `(start + i·length, start + (i+1)·length]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplingIntervals {
    start: f64,
    length: f64,
    count: usize,
}

impl SamplingIntervals {
    /// `count` intervals of `length` seconds starting at `start`.
    pub fn new(start: f64, length: f64, count: usize) -> Result<Self, MeasurementError> {
        if !start.is_finite() {
            return Err(MeasurementError::InvalidInterval {
                reason: format!("start must be finite, got {start}"),
            });
        }
        if !length.is_finite() || length <= 0.0 {
            return Err(MeasurementError::InvalidInterval {
                reason: format!("length must be finite and > 0, got {length}"),
            });
        }
        if count == 0 {
            return Err(MeasurementError::InvalidInterval {
                reason: "at least one interval is required".into(),
            });
        }
        Ok(Self {
            start,
            length,
            count,
        })
    }

    /// Number of intervals.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Interval length [s].
    pub fn length(&self) -> f64 {
        self.length
    }

    /// `(t0, t1)` bounds of interval `index`.
    pub fn bounds(&self, index: usize) -> Result<(f64, f64), MeasurementError> {
        if index >= self.count {
            return Err(MeasurementError::IntervalOutOfRange {
                index,
                count: self.count,
            });
        }
        let t0 = self.start + index as f64 * self.length;
        Ok((t0, t0 + self.length))
    }
}

/// Aggregates of one capacity over one sampling interval.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct IntervalStats {
    /// Timestamps that fell into the interval.
    pub stamps: usize,
    /// Mean particle count over those timestamps.
    pub mean_count: f64,
    /// Mean mass present [kg].
    pub mean_mass: f64,
    /// Total particles that arrived during the interval.
    pub immigrated: u64,
    /// Total mass that arrived during the interval [kg].
    pub immigrated_mass: f64,
}

// ── MeasurementStore ────────────────────────────────────────────

/// Per-capacity time series plus the global timeline of merge stamps.
///
/// Only capacities that were ever visited own a series. A capacity without
/// a sample at a timeline stamp reads as empty at that stamp.
#[derive(Clone, Debug, Default)]
pub struct MeasurementStore {
    timeline: Vec<f64>,
    series: IndexMap<CapacityId, TimeSeries>,
}

impl MeasurementStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `time` on the timeline; repeated calls with the same stamp are no-ops.
    pub fn stamp(&mut self, time: f64) -> Result<(), MeasurementError> {
        match self.timeline.last() {
            Some(&last) if time < last => Err(MeasurementError::NonMonotonic { time, last }),
            Some(&last) if time == last => Ok(()),
            _ => {
                self.timeline.push(time);
                Ok(())
            }
        }
    }

    /// Fold counters into the series at `time`. Empty samples are skipped.
    pub fn merge<'a>(
        &mut self,
        time: f64,
        samples: impl IntoIterator<Item = (&'a CapacityId, &'a Sample)>,
    ) -> Result<(), MeasurementError> {
        self.stamp(time)?;
        for (capacity, sample) in samples {
            if sample.is_empty() {
                continue;
            }
            self.series
                .entry(*capacity)
                .or_default()
                .accumulate(time, sample)?;
        }
        Ok(())
    }

    /// All merge stamps in order.
    pub fn timeline(&self) -> &[f64] {
        &self.timeline
    }

    /// Series of `capacity`, if it was ever visited.
    pub fn series(&self, capacity: CapacityId) -> Option<&TimeSeries> {
        self.series.get(&capacity)
    }

    /// Every capacity that was ever visited, in first-visit order.
    pub fn capacities(&self) -> impl Iterator<Item = CapacityId> + '_ {
        self.series.keys().copied()
    }

    fn stamp_at_or_before(&self, time: f64) -> Option<usize> {
        self.timeline.partition_point(|&t| t <= time).checked_sub(1)
    }

    fn sample_at_stamp(&self, capacity: CapacityId, stamp: f64) -> Sample {
        self.series
            .get(&capacity)
            .and_then(|s| s.exact(stamp))
            .copied()
            .unwrap_or_default()
    }

    /// State of `capacity` at the latest stamp at or before `time`.
    pub fn sample_at(&self, capacity: CapacityId, time: f64) -> Sample {
        match self.stamp_at_or_before(time) {
            Some(i) => self.sample_at_stamp(capacity, self.timeline[i]),
            None => Sample::default(),
        }
    }

    /// Linear interpolation between the stamps around `time`.
    ///
    /// `None` before the first stamp; the last stamp is held after the end.
    pub fn interpolate(&self, capacity: CapacityId, time: f64) -> Option<Interpolated> {
        let lo = self.stamp_at_or_before(time)?;
        let t0 = self.timeline[lo];
        let a = self.sample_at_stamp(capacity, t0);
        match self.timeline.get(lo + 1) {
            None => Some(Interpolated::from(&a)),
            Some(&t1) => {
                let b = self.sample_at_stamp(capacity, t1);
                Some(Interpolated::between(&a, &b, (time - t0) / (t1 - t0)))
            }
        }
    }

    /// Total mass present in all capacities at the latest stamp at or before `time`.
    pub fn total_mass(&self, time: f64) -> f64 {
        let Some(i) = self.stamp_at_or_before(time) else {
            return 0.0;
        };
        let stamp = self.timeline[i];
        self.series
            .values()
            .filter_map(|s| s.exact(stamp))
            .map(|s| s.mass)
            .sum()
    }

    /// Aggregate `capacity` over stamps in `(t0, t1]`.
    pub fn stats_between(&self, capacity: CapacityId, t0: f64, t1: f64) -> IntervalStats {
        let lo = self.timeline.partition_point(|&t| t <= t0);
        let hi = self.timeline.partition_point(|&t| t <= t1);
        let stamps = hi.saturating_sub(lo);
        let mut stats = IntervalStats {
            stamps,
            ..Default::default()
        };
        if stamps == 0 {
            return stats;
        }
        let Some(series) = self.series.get(&capacity) else {
            return stats;
        };
        let mut count = 0u64;
        let mut mass = 0.0;
        for (t, s) in series.iter() {
            if t > t0 && t <= t1 {
                count += s.count;
                mass += s.mass;
                stats.immigrated += s.immigrated;
                stats.immigrated_mass += s.immigrated_mass;
            }
        }
        stats.mean_count = count as f64 / stamps as f64;
        stats.mean_mass = mass / stamps as f64;
        stats
    }

    /// Aggregate `capacity` over sampling interval `index`.
    pub fn interval_stats(
        &self,
        capacity: CapacityId,
        intervals: &SamplingIntervals,
        index: usize,
    ) -> Result<IntervalStats, MeasurementError> {
        let (t0, t1) = intervals.bounds(index)?;
        Ok(self.stats_between(capacity, t0, t1))
    }

    /// Mean concentration [kg/m³] in interval `index` for a capacity
    /// holding `volume` m³ of water; `None` for a dry capacity.
    pub fn concentration(
        &self,
        capacity: CapacityId,
        intervals: &SamplingIntervals,
        index: usize,
        volume: f64,
    ) -> Result<Option<f64>, MeasurementError> {
        let stats = self.interval_stats(capacity, intervals, index)?;
        Ok((volume > 0.0).then(|| stats.mean_mass / volume))
    }

    /// Mass flux [kg/s] into `capacity` during interval `index`.
    pub fn mass_flux(
        &self,
        capacity: CapacityId,
        intervals: &SamplingIntervals,
        index: usize,
    ) -> Result<f64, MeasurementError> {
        let stats = self.interval_stats(capacity, intervals, index)?;
        Ok(stats.immigrated_mass / intervals.length())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const C: CapacityId = CapacityId(4);

    fn sample(count: u64, mass: f64, immigrated: u64, immigrated_mass: f64) -> Sample {
        Sample {
            count,
            mass,
            immigrated,
            immigrated_mass,
        }
    }

    fn store() -> MeasurementStore {
        let mut store = MeasurementStore::new();
        let a = [(C, sample(2, 2.0, 2, 2.0))];
        let b = [(C, sample(4, 4.0, 2, 2.0))];
        store.merge(10.0, a.iter().map(|(c, s)| (c, s))).unwrap();
        // The capacity is empty at t = 20.
        store.merge(20.0, std::iter::empty()).unwrap();
        store.merge(30.0, b.iter().map(|(c, s)| (c, s))).unwrap();
        store
    }

    #[test]
    fn absent_sample_reads_empty() {
        let s = store();
        assert_eq!(s.timeline(), &[10.0, 20.0, 30.0]);
        assert_eq!(s.sample_at(C, 15.0).count, 2);
        assert_eq!(s.sample_at(C, 20.0), Sample::default());
        assert_eq!(s.sample_at(C, 5.0), Sample::default());
        assert_eq!(s.sample_at(CapacityId(99), 30.0), Sample::default());
    }

    #[test]
    fn interpolates_through_empty_stamp() {
        let s = store();
        assert_eq!(s.interpolate(C, 15.0).unwrap().count, 1.0);
        assert_eq!(s.interpolate(C, 25.0).unwrap().mass, 2.0);
        assert_eq!(s.interpolate(C, 99.0).unwrap().count, 4.0);
        assert!(s.interpolate(C, 0.0).is_none());
    }

    #[test]
    fn merge_rejects_going_back_in_time() {
        let mut s = store();
        assert!(matches!(
            s.merge(25.0, std::iter::empty()),
            Err(MeasurementError::NonMonotonic { .. })
        ));
    }

    #[test]
    fn interval_statistics() {
        let s = store();
        let intervals = SamplingIntervals::new(0.0, 30.0, 2).unwrap();
        let stats = s.interval_stats(C, &intervals, 0).unwrap();
        assert_eq!(stats.stamps, 3);
        assert_eq!(stats.mean_count, 2.0);
        assert_eq!(stats.mean_mass, 2.0);
        assert_eq!(stats.immigrated, 4);
        assert_eq!(s.mass_flux(C, &intervals, 0).unwrap(), 4.0 / 30.0);
        assert_eq!(s.concentration(C, &intervals, 0, 4.0).unwrap(), Some(0.5));
        assert_eq!(s.concentration(C, &intervals, 0, 0.0).unwrap(), None);

        let empty = s.interval_stats(C, &intervals, 1).unwrap();
        assert_eq!(empty.stamps, 0);
        assert_eq!(empty.mean_mass, 0.0);
        assert!(matches!(
            s.interval_stats(C, &intervals, 2),
            Err(MeasurementError::IntervalOutOfRange { index: 2, count: 2 })
        ));
    }

    #[test]
    fn total_mass_sums_capacities() {
        let mut s = MeasurementStore::new();
        let samples = [
            (CapacityId(1), sample(1, 0.5, 0, 0.0)),
            (CapacityId(2), sample(3, 1.5, 0, 0.0)),
        ];
        s.merge(1.0, samples.iter().map(|(c, x)| (c, x))).unwrap();
        assert_eq!(s.total_mass(1.0), 2.0);
        assert_eq!(s.total_mass(0.5), 0.0);
    }

    #[test]
    fn rejects_bad_intervals() {
        assert!(SamplingIntervals::new(0.0, 0.0, 3).is_err());
        assert!(SamplingIntervals::new(0.0, 10.0, 0).is_err());
        assert!(SamplingIntervals::new(f64::NAN, 10.0, 1).is_err());
    }
}
