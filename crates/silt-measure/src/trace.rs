//! Optional particle position histories.

use indexmap::IndexMap;

use silt_core::{CapacityId, Particle, ParticleId, Vec3};

/// One recorded position of a particle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TracePoint {
    /// Simulation time [s].
    pub time: f64,
    /// Position at that time.
    pub position: Vec3,
    /// Capacity occupied at that time.
    pub capacity: Option<CapacityId>,
}

/// Samples active particle positions every `interval` seconds.
#[derive(Clone, Debug)]
pub struct TraceRecorder {
    interval: f64,
    next_due: f64,
    traces: IndexMap<ParticleId, Vec<TracePoint>>,
}

impl TraceRecorder {
    /// Record at `start` and then every `interval` seconds.
    pub fn new(start: f64, interval: f64) -> Self {
        Self {
            interval,
            next_due: start,
            traces: IndexMap::new(),
        }
    }

    /// True if a sample is due at `time`.
    pub fn is_due(&self, time: f64) -> bool {
        time >= self.next_due
    }

    /// Record every active particle if a sample is due at `time`.
    pub fn record<'a>(&mut self, time: f64, particles: impl IntoIterator<Item = &'a Particle>) {
        if !self.is_due(time) {
            return;
        }
        for p in particles.into_iter().filter(|p| p.is_active()) {
            self.traces.entry(p.id()).or_default().push(TracePoint {
                time,
                position: p.position_3d,
                capacity: p.capacity(),
            });
        }
        if self.interval > 0.0 {
            while self.next_due <= time {
                self.next_due += self.interval;
            }
        } else {
            self.next_due = f64::INFINITY;
        }
    }

    /// History of one particle.
    pub fn trace(&self, particle: ParticleId) -> Option<&[TracePoint]> {
        self.traces.get(&particle).map(Vec::as_slice)
    }

    /// All histories, in first-recorded order.
    pub fn traces(&self) -> &IndexMap<ParticleId, Vec<TracePoint>> {
        &self.traces
    }

    /// Append another recorder's histories; particles are disjoint across workers.
    pub fn absorb(&mut self, other: &TraceRecorder) {
        for (id, points) in &other.traces {
            self.traces.entry(*id).or_default().extend_from_slice(points);
        }
    }

    /// Drop all histories; the sampling schedule is kept.
    pub fn clear(&mut self) {
        self.traces.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use silt_core::{CapacityKind, InjectionId, MaterialId};

    fn active(id: u64) -> Particle {
        let mut p = Particle::waiting(ParticleId(id), MaterialId(0), 1.0, InjectionId(0), 0, 0.0);
        p.enter(CapacityId(1), CapacityKind::SurfaceCell, 0.0, Vec3::new(id as f64, 0.0, 0.0))
            .unwrap();
        p
    }

    #[test]
    fn samples_on_schedule() {
        let mut rec = TraceRecorder::new(0.0, 10.0);
        let particles = vec![active(1), active(2)];
        for step in 0..=25 {
            rec.record(step as f64, &particles);
        }
        let t: Vec<f64> = rec.trace(ParticleId(1)).unwrap().iter().map(|p| p.time).collect();
        assert_eq!(t, vec![0.0, 10.0, 20.0]);
        assert_eq!(rec.traces().len(), 2);
    }

    #[test]
    fn waiting_particles_are_not_traced() {
        let mut rec = TraceRecorder::new(0.0, 1.0);
        let waiting = Particle::waiting(ParticleId(7), MaterialId(0), 1.0, InjectionId(0), 0, 5.0);
        rec.record(0.0, [&waiting]);
        assert!(rec.trace(ParticleId(7)).is_none());
    }

    #[test]
    fn absorb_merges_histories() {
        let mut a = TraceRecorder::new(0.0, 1.0);
        let mut b = TraceRecorder::new(0.0, 1.0);
        a.record(0.0, &[active(1)]);
        b.record(0.0, &[active(2)]);
        a.absorb(&b);
        assert!(a.trace(ParticleId(2)).is_some());
    }
}
