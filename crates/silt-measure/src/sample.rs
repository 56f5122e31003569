//! Per-capacity counters.

use std::ops::AddAssign;

/// Particle presence in one capacity at one timestamp.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Sample {
    /// Particles present.
    pub count: u64,
    /// Mass present [kg].
    pub mass: f64,
    /// Particles that arrived during the step.
    pub immigrated: u64,
    /// Mass of the particles that arrived during the step [kg].
    pub immigrated_mass: f64,
}

impl Sample {
    /// True if no particle was counted.
    pub fn is_empty(&self) -> bool {
        self.count == 0 && self.immigrated == 0
    }
}

impl AddAssign<&Sample> for Sample {
    fn add_assign(&mut self, rhs: &Sample) {
        self.count += rhs.count;
        self.mass += rhs.mass;
        self.immigrated += rhs.immigrated;
        self.immigrated_mass += rhs.immigrated_mass;
    }
}

/// A [`Sample`] linearly interpolated between two timestamps.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Interpolated {
    /// Particles present.
    pub count: f64,
    /// Mass present [kg].
    pub mass: f64,
    /// Arrived particles.
    pub immigrated: f64,
    /// Arrived mass [kg].
    pub immigrated_mass: f64,
}

impl Interpolated {
    /// `a + (b - a) * s`, component-wise.
    pub fn between(a: &Sample, b: &Sample, s: f64) -> Self {
        let lerp = |x: f64, y: f64| x + (y - x) * s;
        Self {
            count: lerp(a.count as f64, b.count as f64),
            mass: lerp(a.mass, b.mass),
            immigrated: lerp(a.immigrated as f64, b.immigrated as f64),
            immigrated_mass: lerp(a.immigrated_mass, b.immigrated_mass),
        }
    }
}

impl From<&Sample> for Interpolated {
    fn from(s: &Sample) -> Self {
        Self::between(s, s, 0.0)
    }
}
