//! Dispersion models for the random-walk jump.
//!
//! A random-walk jump along one axis has standard deviation
//! `sqrt(D) * sqrt(2 * dt)`, see [`jump_std_dev`]. Models expose their
//! tunable values as named, unit-tagged [`Parameter`]s so configuration
//! front-ends can bind to them without knowing the concrete type.

use rand::{Rng, RngCore};
use silt_core::{MaterialId, Particle};

use crate::error::{non_negative, RoutingError};

/// A named, unit-tagged tunable value.
#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
    /// Parameter name, unique within a model.
    pub name: String,
    /// Unit string, e.g. `"m^2/s"`.
    pub unit: &'static str,
    /// Current value.
    pub value: f64,
}

impl Parameter {
    fn new(name: impl Into<String>, unit: &'static str, value: f64) -> Self {
        Self {
            name: name.into(),
            unit,
            value,
        }
    }
}

/// Source of the dispersion coefficient [m²/s] for a particle.
pub trait Dispersion: Send + Sync {
    /// Human-readable model name.
    fn name(&self) -> &str;

    /// Dispersion coefficient for `particle` [m²/s].
    fn coefficient(&self, particle: &Particle) -> f64;

    /// Square root of [`coefficient`](Dispersion::coefficient).
    fn sqrt_coefficient(&self, particle: &Particle) -> f64;

    /// Current tunable parameters.
    fn parameters(&self) -> Vec<Parameter>;

    /// Change a tunable parameter by name.
    fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), RoutingError>;
}

/// Standard deviation of a single-axis random-walk jump over `dt` seconds.
pub fn jump_std_dev(model: &dyn Dispersion, particle: &Particle, dt: f64) -> f64 {
    model.sqrt_coefficient(particle) * (2.0 * dt).sqrt()
}

/// Draw a standard normal sample using the Box-Muller transform.
pub fn standard_normal(rng: &mut dyn RngCore) -> f64 {
    let u1: f64 = rng.random::<f64>().max(1e-300); // avoid ln(0)
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

// ── ConstantDispersion ──────────────────────────────────────────

/// The same coefficient for every particle.
///
/// The square root is cached and recomputed eagerly whenever the
/// coefficient changes.
#[derive(Clone, Debug, PartialEq)]
pub struct ConstantDispersion {
    coefficient: f64,
    sqrt: f64,
}

impl ConstantDispersion {
    /// Default coefficient [m²/s].
    pub const DEFAULT: f64 = 2.0;

    /// Create with coefficient `d` [m²/s].
    pub fn new(d: f64) -> Result<Self, RoutingError> {
        non_negative("D", d)?;
        Ok(Self {
            coefficient: d,
            sqrt: d.sqrt(),
        })
    }

    /// Replace the coefficient and its cached square root.
    pub fn set_coefficient(&mut self, d: f64) -> Result<(), RoutingError> {
        non_negative("D", d)?;
        self.coefficient = d;
        self.sqrt = d.sqrt();
        Ok(())
    }
}

impl Default for ConstantDispersion {
    fn default() -> Self {
        Self {
            coefficient: Self::DEFAULT,
            sqrt: Self::DEFAULT.sqrt(),
        }
    }
}

impl Dispersion for ConstantDispersion {
    fn name(&self) -> &str {
        "ConstantDispersion"
    }

    fn coefficient(&self, _particle: &Particle) -> f64 {
        self.coefficient
    }

    fn sqrt_coefficient(&self, _particle: &Particle) -> f64 {
        self.sqrt
    }

    fn parameters(&self) -> Vec<Parameter> {
        vec![Parameter::new("D", "m^2/s", self.coefficient)]
    }

    fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), RoutingError> {
        match name {
            "D" => self.set_coefficient(value),
            _ => Err(RoutingError::UnknownParameter { name: name.into() }),
        }
    }
}

// ── MaterialDispersion ──────────────────────────────────────────

/// A coefficient per material, with a fallback for unlisted materials.
///
/// Parameters are named `"default"` and `"material_<id>"`.
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialDispersion {
    default: (f64, f64),
    table: Vec<Option<(f64, f64)>>,
}

impl MaterialDispersion {
    /// Create with a fallback coefficient [m²/s].
    pub fn new(default: f64) -> Result<Self, RoutingError> {
        non_negative("default", default)?;
        Ok(Self {
            default: (default, default.sqrt()),
            table: Vec::new(),
        })
    }

    /// Set the coefficient for one material.
    pub fn with_material(mut self, material: MaterialId, d: f64) -> Result<Self, RoutingError> {
        self.set_material(material, d)?;
        Ok(self)
    }

    /// Set the coefficient for one material in place.
    pub fn set_material(&mut self, material: MaterialId, d: f64) -> Result<(), RoutingError> {
        non_negative(&format!("material_{material}"), d)?;
        let idx = material.0 as usize;
        if self.table.len() <= idx {
            self.table.resize(idx + 1, None);
        }
        self.table[idx] = Some((d, d.sqrt()));
        Ok(())
    }

    fn entry(&self, material: MaterialId) -> (f64, f64) {
        self.table
            .get(material.0 as usize)
            .copied()
            .flatten()
            .unwrap_or(self.default)
    }
}

impl Dispersion for MaterialDispersion {
    fn name(&self) -> &str {
        "MaterialDispersion"
    }

    fn coefficient(&self, particle: &Particle) -> f64 {
        self.entry(particle.material()).0
    }

    fn sqrt_coefficient(&self, particle: &Particle) -> f64 {
        self.entry(particle.material()).1
    }

    fn parameters(&self) -> Vec<Parameter> {
        let mut out = vec![Parameter::new("default", "m^2/s", self.default.0)];
        for (i, entry) in self.table.iter().enumerate() {
            if let Some((d, _)) = entry {
                out.push(Parameter::new(format!("material_{i}"), "m^2/s", *d));
            }
        }
        out
    }

    fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), RoutingError> {
        if name == "default" {
            non_negative(name, value)?;
            self.default = (value, value.sqrt());
            return Ok(());
        }
        let id = name
            .strip_prefix("material_")
            .and_then(|s| s.parse::<u32>().ok())
            .ok_or_else(|| RoutingError::UnknownParameter { name: name.into() })?;
        self.set_material(MaterialId(id), value)
    }
}

// ── VelocityScaledDispersion ────────────────────────────────────

/// Longitudinal dispersion proportional to the particle's axial speed:
/// `D = max(floor, dispersivity * |v|)`.
#[derive(Clone, Debug, PartialEq)]
pub struct VelocityScaledDispersion {
    dispersivity: f64,
    floor: f64,
}

impl VelocityScaledDispersion {
    /// Create with `dispersivity` [m] and a minimum coefficient `floor` [m²/s].
    pub fn new(dispersivity: f64, floor: f64) -> Result<Self, RoutingError> {
        non_negative("dispersivity", dispersivity)?;
        non_negative("floor", floor)?;
        Ok(Self {
            dispersivity,
            floor,
        })
    }
}

impl Dispersion for VelocityScaledDispersion {
    fn name(&self) -> &str {
        "VelocityScaledDispersion"
    }

    fn coefficient(&self, particle: &Particle) -> f64 {
        (self.dispersivity * particle.velocity_1d.abs()).max(self.floor)
    }

    fn sqrt_coefficient(&self, particle: &Particle) -> f64 {
        self.coefficient(particle).sqrt()
    }

    fn parameters(&self) -> Vec<Parameter> {
        vec![
            Parameter::new("dispersivity", "m", self.dispersivity),
            Parameter::new("floor", "m^2/s", self.floor),
        ]
    }

    fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), RoutingError> {
        match name {
            "dispersivity" => {
                non_negative(name, value)?;
                self.dispersivity = value;
            }
            "floor" => {
                non_negative(name, value)?;
                self.floor = value;
            }
            _ => return Err(RoutingError::UnknownParameter { name: name.into() }),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use silt_core::{InjectionId, ParticleId};

    fn particle(material: u32) -> Particle {
        Particle::waiting(ParticleId(0), MaterialId(material), 1.0, InjectionId(0), 0, 0.0)
    }

    // ---------------------------------------------------------------
    // ConstantDispersion
    // ---------------------------------------------------------------

    #[test]
    fn constant_defaults_to_two() {
        let d = ConstantDispersion::default();
        let p = particle(0);
        assert_eq!(d.coefficient(&p), 2.0);
        assert!((d.sqrt_coefficient(&p) - 2.0f64.sqrt()).abs() < 1e-15);
    }

    #[test]
    fn constant_recomputes_sqrt_on_change() {
        let mut d = ConstantDispersion::default();
        d.set_parameter("D", 9.0).unwrap();
        let p = particle(0);
        assert_eq!(d.coefficient(&p), 9.0);
        assert_eq!(d.sqrt_coefficient(&p), 3.0);
        assert_eq!(d.parameters()[0].value, 9.0);
        assert_eq!(d.parameters()[0].unit, "m^2/s");
    }

    #[test]
    fn constant_rejects_unknown_and_negative() {
        let mut d = ConstantDispersion::default();
        assert!(matches!(
            d.set_parameter("alpha", 1.0),
            Err(RoutingError::UnknownParameter { .. })
        ));
        assert!(d.set_parameter("D", -1.0).is_err());
        assert_eq!(d.coefficient(&particle(0)), 2.0, "rejected value leaves state untouched");
    }

    #[test]
    fn jump_std_dev_scales_with_dt() {
        let d = ConstantDispersion::new(2.0).unwrap();
        let p = particle(0);
        // sqrt(2) * sqrt(2 * 0.5) = sqrt(2)
        assert!((jump_std_dev(&d, &p, 0.5) - 2.0f64.sqrt()).abs() < 1e-12);
        let zero = ConstantDispersion::new(0.0).unwrap();
        assert_eq!(jump_std_dev(&zero, &p, 10.0), 0.0);
    }

    // ---------------------------------------------------------------
    // MaterialDispersion
    // ---------------------------------------------------------------

    #[test]
    fn material_table_falls_back_to_default() {
        let d = MaterialDispersion::new(1.0)
            .unwrap()
            .with_material(MaterialId(2), 4.0)
            .unwrap();
        assert_eq!(d.coefficient(&particle(0)), 1.0);
        assert_eq!(d.coefficient(&particle(2)), 4.0);
        assert_eq!(d.sqrt_coefficient(&particle(2)), 2.0);
        assert_eq!(d.coefficient(&particle(7)), 1.0);
    }

    #[test]
    fn material_parameters_round_through_names() {
        let mut d = MaterialDispersion::new(1.0).unwrap();
        d.set_parameter("material_3", 0.25).unwrap();
        d.set_parameter("default", 0.5).unwrap();
        let names: Vec<_> = d.parameters().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["default", "material_3"]);
        assert_eq!(d.sqrt_coefficient(&particle(3)), 0.5);
        assert!(d.set_parameter("material_x", 1.0).is_err());
    }

    // ---------------------------------------------------------------
    // VelocityScaledDispersion
    // ---------------------------------------------------------------

    #[test]
    fn velocity_scaled_uses_floor_at_rest() {
        let d = VelocityScaledDispersion::new(5.0, 0.01).unwrap();
        let mut p = particle(0);
        assert_eq!(d.coefficient(&p), 0.01);
        p.velocity_1d = -0.4;
        assert!((d.coefficient(&p) - 2.0).abs() < 1e-12);
        assert!((d.sqrt_coefficient(&p) - 2.0f64.sqrt()).abs() < 1e-12);
    }

    // ---------------------------------------------------------------
    // Sampling
    // ---------------------------------------------------------------

    #[test]
    fn standard_normal_has_unit_moments() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let n = 50_000;
        let samples: Vec<f64> = (0..n).map(|_| standard_normal(&mut rng)).collect();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let var = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.02, "mean {mean}");
        assert!((var - 1.0).abs() < 0.03, "variance {var}");
    }
}
