//! Injection descriptions, realized injections and particle placement.

use silt_core::{
    CapacityId, CapacityKind, HydraulicView, InjectionId, Material, MaterialId, Particle,
    ParticleId, TopologyError, Vec3,
};

use crate::allocator::{IdRange, ParticleIdAllocator};
use crate::error::InjectionError;
use crate::spread::{spread_fraction, spread_index};

/// Where the particles of an injection enter the system.
#[derive(Clone, Debug, PartialEq)]
pub enum InjectionKind {
    /// A single capacity with a fixed axial offset.
    Point {
        /// Target capacity (pipe, manhole, surface or soil cell).
        capacity: CapacityId,
        /// Offset along the capacity's axis [m].
        offset: f64,
    },
    /// A pipe at a fixed distance from its start node.
    Pipe {
        /// Target pipe.
        pipe: CapacityId,
        /// Distance from the start node [m], clamped to the pipe length.
        distance: f64,
    },
    /// Spread evenly over every surface cell of the topology.
    Areal,
    /// Spread evenly over an explicit ordered list of surface cells.
    SubAreal {
        /// Cells in spreading order.
        cells: Vec<CapacityId>,
    },
}

/// User-facing description of an injection.
#[derive(Clone, Debug, PartialEq)]
pub struct InjectionSpec {
    /// Placement rule.
    pub kind: InjectionKind,
    /// Material carried by every particle.
    pub material: MaterialId,
    /// Number of particles to release.
    pub count: u64,
    /// Total injected mass [kg]. `None` uses the material's per-particle mass.
    pub total_mass: Option<f64>,
    /// Release time of the first particle [s].
    pub start_time: f64,
    /// Time over which releases are spread evenly [s]; 0 releases all at once.
    pub duration: f64,
}

impl InjectionSpec {
    /// Release `count` particles of `material` at `t = 0` with `kind`.
    pub fn new(kind: InjectionKind, material: MaterialId, count: u64) -> Self {
        Self {
            kind,
            material,
            count,
            total_mass: None,
            start_time: 0.0,
            duration: 0.0,
        }
    }

    /// Shorthand for an areal injection over the whole surface.
    pub fn areal(material: MaterialId, count: u64) -> Self {
        Self::new(InjectionKind::Areal, material, count)
    }

    /// Fix the total injected mass [kg].
    pub fn with_total_mass(mut self, mass: f64) -> Self {
        self.total_mass = Some(mass);
        self
    }

    /// Release the first particle at `start` and spread the rest over `duration`.
    pub fn released(mut self, start: f64, duration: f64) -> Self {
        self.start_time = start;
        self.duration = duration;
        self
    }

    fn check(&self, id: InjectionId) -> Result<(), InjectionError> {
        let invalid = |reason: String| InjectionError::InvalidSpec {
            injection: id,
            reason,
        };
        if self.count == 0 {
            return Err(InjectionError::EmptyRange);
        }
        if let Some(m) = self.total_mass {
            if !m.is_finite() || m < 0.0 {
                return Err(invalid(format!("total mass must be finite and >= 0, got {m}")));
            }
        }
        if !self.start_time.is_finite() {
            return Err(invalid(format!("start time must be finite, got {}", self.start_time)));
        }
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(invalid(format!(
                "duration must be finite and >= 0, got {}",
                self.duration
            )));
        }
        match &self.kind {
            InjectionKind::SubAreal { cells } if cells.is_empty() => {
                Err(InjectionError::EmptyCellSet)
            }
            InjectionKind::Point { offset, .. } if !offset.is_finite() => {
                Err(invalid(format!("offset must be finite, got {offset}")))
            }
            InjectionKind::Pipe { distance, .. } if !distance.is_finite() => {
                Err(invalid(format!("distance must be finite, got {distance}")))
            }
            _ => Ok(()),
        }
    }

    /// Validate and reserve an id range for this injection.
    pub fn realize(
        self,
        id: InjectionId,
        allocator: &mut ParticleIdAllocator,
        materials: &[Material],
    ) -> Result<Injection, InjectionError> {
        self.check(id)?;
        let material = materials
            .iter()
            .find(|m| m.id == self.material)
            .ok_or(InjectionError::UnknownMaterial {
                material: self.material,
            })?;
        let range = allocator.allocate(self.count)?;
        let particle_mass = match self.total_mass {
            Some(total) => total / self.count as f64,
            None => material.mass_per_particle,
        };
        Ok(Injection {
            id,
            spec: self,
            range,
            particle_mass,
        })
    }
}

/// Initial location of a released particle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// Capacity the particle starts in.
    pub capacity: CapacityId,
    /// Kind of that capacity.
    pub kind: CapacityKind,
    /// Axial position within the capacity [m].
    pub position_1d: f64,
    /// 3D position.
    pub position_3d: Vec3,
}

/// An injection bound to its id range.
#[derive(Clone, Debug, PartialEq)]
pub struct Injection {
    id: InjectionId,
    spec: InjectionSpec,
    range: IdRange,
    particle_mass: f64,
}

impl Injection {
    /// Identifier of this injection.
    pub fn id(&self) -> InjectionId {
        self.id
    }

    /// The description this injection was realized from.
    pub fn spec(&self) -> &InjectionSpec {
        &self.spec
    }

    /// Ids owned by this injection.
    pub fn range(&self) -> IdRange {
        self.range
    }

    /// Mass of one particle [kg].
    pub fn particle_mass(&self) -> f64 {
        self.particle_mass
    }

    /// Release time of particle `id`:
    /// `start + duration * (id - first) / (last - first)`.
    pub fn release_time(&self, id: ParticleId) -> Result<f64, InjectionError> {
        let s = spread_fraction(self.range, id)?;
        Ok(self.spec.start_time + self.spec.duration * s)
    }

    /// All particles of this injection in `Waiting` status, in id order.
    pub fn spawn_particles(&self) -> Result<Vec<Particle>, InjectionError> {
        self.range
            .iter()
            .enumerate()
            .map(|(ordinal, id)| {
                Ok(Particle::waiting(
                    id,
                    self.spec.material,
                    self.particle_mass,
                    self.id,
                    ordinal as u64,
                    self.release_time(id)?,
                ))
            })
            .collect()
    }

    /// Initial placement of particle `id`.
    pub fn locate(
        &self,
        id: ParticleId,
        view: &dyn HydraulicView,
    ) -> Result<Placement, InjectionError> {
        match &self.spec.kind {
            InjectionKind::Point { capacity, offset } => {
                let kind = view.kind(*capacity).ok_or(TopologyError::UnknownCapacity {
                    capacity: *capacity,
                })?;
                if !self.range.contains(id) {
                    return Err(self.out_of_range(id));
                }
                if kind == CapacityKind::Pipe {
                    return pipe_placement(view, *capacity, *offset);
                }
                Ok(Placement {
                    capacity: *capacity,
                    kind,
                    position_1d: *offset,
                    position_3d: view.position(*capacity),
                })
            }
            InjectionKind::Pipe { pipe, distance } => {
                if !self.range.contains(id) {
                    return Err(self.out_of_range(id));
                }
                pipe_placement(view, *pipe, *distance)
            }
            InjectionKind::Areal => {
                let cells = view.surface_cells();
                if cells.is_empty() {
                    return Err(TopologyError::NoSurface.into());
                }
                let index = spread_index(cells.len(), self.range, id)?;
                Ok(surface_placement(view, cells[index]))
            }
            InjectionKind::SubAreal { cells } => {
                let index = spread_index(cells.len(), self.range, id)?;
                let cell = cells[index];
                match view.kind(cell) {
                    Some(CapacityKind::SurfaceCell) => Ok(surface_placement(view, cell)),
                    Some(found) => Err(TopologyError::WrongKind {
                        capacity: cell,
                        expected: CapacityKind::SurfaceCell,
                        found,
                    }
                    .into()),
                    None => Err(TopologyError::UnknownCapacity { capacity: cell }.into()),
                }
            }
        }
    }

    fn out_of_range(&self, id: ParticleId) -> InjectionError {
        InjectionError::IdOutOfRange {
            id,
            first: self.range.first,
            last: self.range.last,
        }
    }
}

fn pipe_placement(
    view: &dyn HydraulicView,
    pipe: CapacityId,
    distance: f64,
) -> Result<Placement, InjectionError> {
    match view.kind(pipe) {
        Some(CapacityKind::Pipe) => {}
        Some(found) => {
            return Err(TopologyError::WrongKind {
                capacity: pipe,
                expected: CapacityKind::Pipe,
                found,
            }
            .into())
        }
        None => return Err(TopologyError::UnknownCapacity { capacity: pipe }.into()),
    }
    let length = view
        .pipe_length(pipe)
        .ok_or(TopologyError::UnknownCapacity { capacity: pipe })?;
    let position_1d = distance.clamp(0.0, length.max(0.0));
    let position_3d = view
        .pipe_point(pipe, position_1d)
        .ok_or(TopologyError::UnknownCapacity { capacity: pipe })?;
    Ok(Placement {
        capacity: pipe,
        kind: CapacityKind::Pipe,
        position_1d,
        position_3d,
    })
}

fn surface_placement(view: &dyn HydraulicView, cell: CapacityId) -> Placement {
    Placement {
        capacity: cell,
        kind: CapacityKind::SurfaceCell,
        position_1d: 0.0,
        position_3d: view.position(cell),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use silt_test_utils::fixtures::{flat_catchment, straight_sewer};

    fn materials() -> Vec<Material> {
        vec![Material::new(MaterialId(0), "tracer", 0.25)]
    }

    fn realize(spec: InjectionSpec) -> Injection {
        let mut alloc = ParticleIdAllocator::new();
        spec.realize(InjectionId(0), &mut alloc, &materials()).unwrap()
    }

    // ---------------------------------------------------------------
    // Realization
    // ---------------------------------------------------------------

    #[test]
    fn mass_defaults_to_material() {
        let inj = realize(InjectionSpec::areal(MaterialId(0), 10));
        assert_eq!(inj.particle_mass(), 0.25);
        let inj = realize(InjectionSpec::areal(MaterialId(0), 10).with_total_mass(5.0));
        assert_eq!(inj.particle_mass(), 0.5);
    }

    #[test]
    fn unknown_material_is_rejected() {
        let mut alloc = ParticleIdAllocator::new();
        let err = InjectionSpec::areal(MaterialId(3), 10)
            .realize(InjectionId(0), &mut alloc, &materials())
            .unwrap_err();
        assert_eq!(err, InjectionError::UnknownMaterial { material: MaterialId(3) });
        // Nothing was allocated for the failed injection.
        assert_eq!(alloc.allocated(), 0);
    }

    #[test]
    fn empty_sub_area_is_rejected() {
        let mut alloc = ParticleIdAllocator::new();
        let spec = InjectionSpec::new(InjectionKind::SubAreal { cells: vec![] }, MaterialId(0), 5);
        assert_eq!(
            spec.realize(InjectionId(0), &mut alloc, &materials()),
            Err(InjectionError::EmptyCellSet)
        );
    }

    #[test]
    fn negative_duration_is_rejected() {
        let mut alloc = ParticleIdAllocator::new();
        let spec = InjectionSpec::areal(MaterialId(0), 5).released(0.0, -1.0);
        assert!(matches!(
            spec.realize(InjectionId(2), &mut alloc, &materials()),
            Err(InjectionError::InvalidSpec { injection: InjectionId(2), .. })
        ));
    }

    // ---------------------------------------------------------------
    // Release schedule
    // ---------------------------------------------------------------

    #[test]
    fn releases_spread_over_duration() {
        let inj = realize(InjectionSpec::areal(MaterialId(0), 5).released(60.0, 40.0));
        let times: Vec<f64> = inj
            .spawn_particles()
            .unwrap()
            .iter()
            .map(|p| p.release_time())
            .collect();
        assert_eq!(times, vec![60.0, 70.0, 80.0, 90.0, 100.0]);
    }

    #[test]
    fn single_particle_releases_at_start() {
        let inj = realize(InjectionSpec::areal(MaterialId(0), 1).released(5.0, 100.0));
        assert_eq!(inj.release_time(ParticleId(0)), Ok(5.0));
    }

    #[test]
    fn spawned_particles_wait() {
        let inj = realize(InjectionSpec::areal(MaterialId(0), 3));
        let particles = inj.spawn_particles().unwrap();
        assert_eq!(particles.len(), 3);
        assert!(particles.iter().all(|p| !p.is_active()));
        assert_eq!(particles[2].ordinal(), 2);
        assert_eq!(particles[2].id(), ParticleId(2));
    }

    // ---------------------------------------------------------------
    // Placement
    // ---------------------------------------------------------------

    #[test]
    fn areal_spreads_over_all_cells() {
        let (net, cells) = flat_catchment(5, 10, 1.0);
        let mut alloc = ParticleIdAllocator::new();
        alloc.allocate(100).unwrap();
        let inj = InjectionSpec::areal(MaterialId(0), 300)
            .realize(InjectionId(1), &mut alloc, &materials())
            .unwrap();
        let first = inj.locate(ParticleId(100), &net).unwrap();
        let last = inj.locate(ParticleId(399), &net).unwrap();
        assert_eq!(first.capacity, cells[0]);
        assert_eq!(last.capacity, cells[99]);
        assert_eq!(first.kind, CapacityKind::SurfaceCell);
        assert_eq!(first.position_3d, net.position(cells[0]));
    }

    #[test]
    fn sub_areal_indexes_into_cell_list() {
        let (net, cells) = flat_catchment(2, 2, 1.0);
        let subset = vec![cells[6], cells[1], cells[3]];
        let inj = realize(InjectionSpec::new(
            InjectionKind::SubAreal {
                cells: subset.clone(),
            },
            MaterialId(0),
            9,
        ));
        let placed: Vec<CapacityId> = inj
            .range()
            .iter()
            .map(|id| inj.locate(id, &net).unwrap().capacity)
            .collect();
        assert_eq!(placed[0], subset[0]);
        assert_eq!(placed[8], subset[2]);
        assert!(placed.iter().all(|c| subset.contains(c)));
    }

    #[test]
    fn pipe_injection_clamps_distance() {
        let sewer = straight_sewer(2, 10.0, 0.5);
        let inj = realize(InjectionSpec::new(
            InjectionKind::Pipe {
                pipe: sewer.pipes[0],
                distance: 25.0,
            },
            MaterialId(0),
            4,
        ));
        let p = inj.locate(ParticleId(3), &sewer.net).unwrap();
        assert_eq!(p.capacity, sewer.pipes[0]);
        assert_eq!(Some(p.position_1d), sewer.net.pipe_length(sewer.pipes[0]));
        assert!((p.position_3d.x - 10.0).abs() < 1e-9);
    }

    #[test]
    fn pipe_injection_into_manhole_is_wrong_kind() {
        let sewer = straight_sewer(2, 10.0, 0.5);
        let inj = realize(InjectionSpec::new(
            InjectionKind::Pipe {
                pipe: sewer.nodes[0],
                distance: 1.0,
            },
            MaterialId(0),
            1,
        ));
        assert!(matches!(
            inj.locate(ParticleId(0), &sewer.net),
            Err(InjectionError::Topology(TopologyError::WrongKind { .. }))
        ));
    }

    #[test]
    fn point_injection_into_manhole() {
        let sewer = straight_sewer(2, 10.0, 0.5);
        let node = sewer.nodes[1];
        let inj = realize(InjectionSpec::new(
            InjectionKind::Point {
                capacity: node,
                offset: 0.0,
            },
            MaterialId(0),
            2,
        ));
        let p = inj.locate(ParticleId(1), &sewer.net).unwrap();
        assert_eq!(p.kind, CapacityKind::Manhole);
        assert_eq!(p.position_3d, sewer.net.position(node));
        assert!(inj.locate(ParticleId(2), &sewer.net).is_err());
    }

    #[test]
    fn areal_without_surface_fails() {
        let sewer = straight_sewer(1, 10.0, 0.5);
        let inj = realize(InjectionSpec::areal(MaterialId(0), 2));
        assert_eq!(
            inj.locate(ParticleId(0), &sewer.net),
            Err(InjectionError::Topology(TopologyError::NoSurface))
        );
    }
}
