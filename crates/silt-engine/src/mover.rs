//! Domain movers: advance one particle by one step.
//!
//! A [`Mover`] borrows the shared environment plus the calling worker's
//! generator and counters. Every random draw goes through the worker's
//! generator, so a worker's particles evolve identically on every run with
//! the same seed.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use rand::{Rng, RngCore};

use silt_core::{
    CapacityId, CapacityKind, Connection, HydraulicView, InjectionId, Particle, ParticleError,
    PipeEnd, TimeIndex, TopologyError, Vec3,
};
use silt_injection::{Injection, InjectionError};
use silt_obstacle::ObstacleField;
use silt_routing::{jump_std_dev, standard_normal, CapacityProbe, Dispersion, Route, Routing, Search};

use crate::config::SimulationConfig;
use crate::metrics::StepCounters;

/// Read-only state shared by every worker.
pub(crate) struct Environment {
    pub view: Arc<dyn HydraulicView>,
    pub routing: Arc<dyn Routing>,
    pub dispersion: Arc<dyn Dispersion>,
    pub obstacles: Arc<ObstacleField>,
    pub injections: Vec<Injection>,
    pub config: SimulationConfig,
}

/// Time window of the step being executed.
#[derive(Clone, Copy, Debug)]
pub(crate) struct StepClock {
    pub time: f64,
    pub dt: f64,
    pub index: TimeIndex,
}

/// A failed move. The particle keeps whatever state it reached.
#[derive(Debug)]
pub(crate) enum MoveError {
    UnknownInjection(InjectionId),
    Particle(ParticleError),
    Topology(TopologyError),
    Injection(InjectionError),
}

impl fmt::Display for MoveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownInjection(id) => write!(f, "unknown injection {id}"),
            Self::Particle(e) => write!(f, "{e}"),
            Self::Topology(e) => write!(f, "{e}"),
            Self::Injection(e) => write!(f, "{e}"),
        }
    }
}

impl Error for MoveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::UnknownInjection(_) => None,
            Self::Particle(e) => Some(e),
            Self::Topology(e) => Some(e),
            Self::Injection(e) => Some(e),
        }
    }
}

impl From<ParticleError> for MoveError {
    fn from(e: ParticleError) -> Self {
        Self::Particle(e)
    }
}

impl From<TopologyError> for MoveError {
    fn from(e: TopologyError) -> Self {
        Self::Topology(e)
    }
}

impl From<InjectionError> for MoveError {
    fn from(e: InjectionError) -> Self {
        Self::Injection(e)
    }
}

/// Place a waiting particle at its injection's location.
pub(crate) fn release(env: &Environment, p: &mut Particle) -> Result<(), MoveError> {
    let injection = env
        .injections
        .get(p.injection().0 as usize)
        .ok_or(MoveError::UnknownInjection(p.injection()))?;
    let placement = injection.locate(p.id(), &*env.view)?;
    p.enter(
        placement.capacity,
        placement.kind,
        placement.position_1d,
        placement.position_3d,
    )?;
    Ok(())
}

pub(crate) struct Mover<'a> {
    pub env: &'a Environment,
    pub clock: StepClock,
    pub rng: &'a mut dyn RngCore,
    pub counters: &'a mut StepCounters,
}

impl Mover<'_> {
    /// Advance `p` by one step in whatever domain it occupies.
    pub fn advance(&mut self, p: &mut Particle) -> Result<(), MoveError> {
        let Some(capacity) = p.capacity().filter(|_| p.is_active()) else {
            return Ok(());
        };
        let kind = self
            .env
            .view
            .kind(capacity)
            .ok_or(TopologyError::UnknownCapacity { capacity })?;
        match kind {
            CapacityKind::Pipe => self.move_in_pipe(p, capacity),
            CapacityKind::Manhole => self.move_from_node(p, capacity),
            CapacityKind::SurfaceCell => self.move_on_surface(p, capacity),
            CapacityKind::SoilCell => self.move_in_soil(p, capacity),
        }
    }

    // ── Shared helpers ──────────────────────────────────────────

    fn jump(&mut self, p: &Particle) -> f64 {
        let sigma = jump_std_dev(&*self.env.dispersion, p, self.clock.dt);
        if sigma > 0.0 {
            sigma * standard_normal(&mut *self.rng)
        } else {
            0.0
        }
    }

    fn check_velocity(&mut self, capacity: CapacityId, speed: f64) {
        let bound = self.env.config.velocity_bound;
        if speed > bound {
            log::warn!("capacity {capacity}: flow speed {speed} m/s exceeds bound {bound} m/s");
            self.counters.velocity_warnings += 1;
        }
    }

    /// Deposition / erosion. Returns whether the particle moves this step.
    fn bed_exchange(&mut self, p: &mut Particle, capacity: CapacityId) -> Result<bool, MoveError> {
        let env = self.env;
        let probe = CapacityProbe::resolve(&*env.view, capacity, self.clock.index)?;
        if p.deposited {
            if env.routing.decide_erode(p, &probe, &mut *self.rng) {
                p.deposited = false;
                return Ok(true);
            }
            return Ok(false);
        }
        if env.routing.decide_deposit(p, &probe, &mut *self.rng) {
            p.deposited = true;
            p.velocity_1d = 0.0;
            return Ok(false);
        }
        Ok(true)
    }

    fn exit(&mut self, p: &mut Particle) {
        p.leave();
        self.counters.left += 1;
    }

    // ── Pipe network ────────────────────────────────────────────

    fn move_in_pipe(&mut self, p: &mut Particle, pipe: CapacityId) -> Result<(), MoveError> {
        if !self.bed_exchange(p, pipe)? {
            return Ok(());
        }
        let v = self.env.view.velocity(pipe, self.clock.index);
        self.check_velocity(pipe, v.abs());
        let ds = v * self.clock.dt + self.jump(p);
        p.velocity_1d = v;
        self.travel(p, pipe, ds)
    }

    /// Move `ds` metres along `pipe` (negative towards its start), handing
    /// the particle over at nodes until the distance is used up.
    fn travel(&mut self, p: &mut Particle, pipe: CapacityId, ds: f64) -> Result<(), MoveError> {
        let env = self.env;
        let view = &*env.view;
        let t = self.clock.index;
        let mut pipe = pipe;
        let mut ds = ds;
        let mut hops = 0;
        loop {
            let length = view
                .pipe_length(pipe)
                .ok_or(TopologyError::UnknownCapacity { capacity: pipe })?;
            let target = p.position_1d + ds;
            if (0.0..=length).contains(&target) {
                p.position_1d = target;
                p.position_3d = view.pipe_point(pipe, target).unwrap_or(p.position_3d);
                p.travelled += ds.abs();
                return Ok(());
            }
            let (start, end) = view
                .pipe_nodes(pipe)
                .ok_or(TopologyError::UnknownCapacity { capacity: pipe })?;
            let (node, remaining) = if target > length {
                (end, target - length)
            } else {
                (start, -target)
            };
            p.travelled += ds.abs() - remaining;
            let search = if (ds > 0.0) == (view.flow(pipe, t) >= 0.0) {
                Search::Downstream
            } else {
                Search::Upstream
            };
            p.enter(node, CapacityKind::Manhole, 0.0, view.position(node))?;
            if view.is_outfall(node) {
                log::trace!(
                    "particle {} left through outfall {node} at t={}",
                    p.id(),
                    self.clock.time
                );
                self.exit(p);
                return Ok(());
            }
            hops += 1;
            if hops > env.config.max_hops_per_step {
                self.counters.hop_limit_hits += 1;
                return Ok(());
            }
            let Some(conn) = self.route(p, node, search)? else {
                return Ok(());
            };
            self.enter_pipe(p, conn, node)?;
            pipe = conn.pipe;
            ds = match conn.end {
                PipeEnd::Start => remaining,
                PipeEnd::End => -remaining,
            };
        }
    }

    fn move_from_node(&mut self, p: &mut Particle, node: CapacityId) -> Result<(), MoveError> {
        if self.env.view.is_outfall(node) {
            self.exit(p);
            return Ok(());
        }
        match self.route(p, node, Search::Downstream)? {
            Some(conn) => {
                self.enter_pipe(p, conn, node)?;
                self.move_in_pipe(p, conn.pipe)
            }
            None => Ok(()),
        }
    }

    fn enter_pipe(
        &mut self,
        p: &mut Particle,
        conn: Connection,
        node: CapacityId,
    ) -> Result<(), MoveError> {
        let view = &*self.env.view;
        let length = view
            .pipe_length(conn.pipe)
            .ok_or(TopologyError::UnknownCapacity {
                capacity: conn.pipe,
            })?;
        let entry = conn.entry_position(length, 0.0);
        let point = view
            .pipe_point(conn.pipe, entry)
            .unwrap_or_else(|| view.position(node));
        p.enter(conn.pipe, CapacityKind::Pipe, entry, point)?;
        Ok(())
    }

    /// Ask the routing model for the next pipe. Spills are applied here;
    /// `None` leaves the particle where it is.
    fn route(
        &mut self,
        p: &mut Particle,
        node: CapacityId,
        search: Search,
    ) -> Result<Option<Connection>, MoveError> {
        let env = self.env;
        let decision =
            env.routing
                .choose_connection(node, &*env.view, self.clock.index, search, &mut *self.rng);
        match decision {
            Ok(Some(Route::Pipe(conn))) => Ok(Some(conn)),
            Ok(Some(Route::Surface)) => {
                self.spill(p, node)?;
                Ok(None)
            }
            Ok(None) => Ok(None),
            Err(e) => {
                log::error!("particle {}: {e}", p.id());
                self.counters.routing_inconsistencies += 1;
                Ok(None)
            }
        }
    }

    /// Move a spilled particle onto the surface. Linked nodes use their
    /// coupled cell; unlinked nodes spill into the cell above them.
    fn spill(&mut self, p: &mut Particle, node: CapacityId) -> Result<(), MoveError> {
        let view = &*self.env.view;
        if let Some(cell) = view.surface_link(node) {
            p.enter(cell, CapacityKind::SurfaceCell, 0.0, view.position(cell))?;
            self.counters.spills += 1;
            return Ok(());
        }
        let at = view.position(node);
        match view.locate_surface(at, None) {
            Some(cell) => {
                let landing = Vec3::new(at.x, at.y, view.position(cell).z);
                p.enter(cell, CapacityKind::SurfaceCell, 0.0, landing)?;
                self.counters.spills += 1;
            }
            None => {
                log::warn!(
                    "node {node} spilled particle {} but no surface cell lies above it",
                    p.id()
                );
                self.counters.spill_failures += 1;
            }
        }
        Ok(())
    }

    // ── Surface ─────────────────────────────────────────────────

    fn move_on_surface(&mut self, p: &mut Particle, cell: CapacityId) -> Result<(), MoveError> {
        let env = self.env;
        let view = &*env.view;
        let t = self.clock.index;
        if view.water_height(cell, t) < env.routing.config().dry_threshold {
            return Ok(());
        }
        if !self.bed_exchange(p, cell)? {
            return Ok(());
        }
        if self.try_drain(p, cell)? {
            return Ok(());
        }
        let velocity = view.surface_velocity(cell, t);
        let speed = velocity.planar_length();
        self.check_velocity(cell, speed);
        let dt = self.clock.dt;
        let step = Vec3::new(
            velocity.x * dt + self.jump(p),
            velocity.y * dt + self.jump(p),
            0.0,
        );
        let mut target = p.position_3d + step;
        p.velocity_1d = speed;
        match view.locate_surface(target, Some(cell)) {
            Some(next) => {
                target.z = view.position(next).z;
                p.travelled += step.planar_length();
                p.enter(next, CapacityKind::SurfaceCell, 0.0, target)?;
            }
            None => self.exit(p),
        }
        Ok(())
    }

    /// Capture into the cell's inlet with probability `q·dt / volume`.
    fn try_drain(&mut self, p: &mut Particle, cell: CapacityId) -> Result<bool, MoveError> {
        let view = &*self.env.view;
        let t = self.clock.index;
        let Some(node) = view.drain(cell) else {
            return Ok(false);
        };
        let q = view.drain_flow(cell, t);
        let volume = view.water_volume(cell, t);
        if q <= 0.0 || volume <= 0.0 {
            return Ok(false);
        }
        if self.rng.random::<f64>() < q * self.clock.dt / volume {
            p.enter(node, CapacityKind::Manhole, 0.0, view.position(node))?;
            self.counters.drained += 1;
            return Ok(true);
        }
        Ok(false)
    }

    // ── Soil ────────────────────────────────────────────────────

    fn move_in_soil(&mut self, p: &mut Particle, cell: CapacityId) -> Result<(), MoveError> {
        let env = self.env;
        let view = &*env.view;
        let velocity = view.soil_velocity(cell, self.clock.index);
        self.check_velocity(cell, velocity.length());
        let jump = Vec3::new(self.jump(p), self.jump(p), self.jump(p));
        let step = velocity * self.clock.dt + jump;
        let start = p.position_3d;
        let target = start + step;
        let movement = env.obstacles.check_movement(start, target, step.length());
        if movement.is_blocked() {
            self.counters.blocked_movements += 1;
        }
        let end = movement.resolve(target);
        p.travelled += (end - start).length();
        p.velocity_1d = velocity.length();
        match view.locate_soil(end, Some(cell)) {
            Some(next) => p.enter(next, CapacityKind::SoilCell, 0.0, end)?,
            None => self.exit(p),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use silt_core::{MaterialId, ParticleId, ParticleStatus};
    use silt_obstacle::Wall;
    use silt_routing::{
        ConstantDispersion, HomogeneousRouting, RoutingConfig, RoutingError, VelocityProvider,
    };
    use silt_test_utils::fixtures::{flat_catchment, straight_sewer};
    use silt_test_utils::MockNetwork;

    fn env(net: MockNetwork) -> Environment {
        env_with(net, ObstacleField::new())
    }

    fn env_with(net: MockNetwork, obstacles: ObstacleField) -> Environment {
        Environment {
            view: Arc::new(net),
            routing: Arc::new(HomogeneousRouting::default()),
            dispersion: Arc::new(ConstantDispersion::new(0.0).unwrap()),
            obstacles: Arc::new(obstacles),
            injections: Vec::new(),
            config: SimulationConfig::default(),
        }
    }

    fn particle_in(capacity: CapacityId, kind: CapacityKind, p1: f64, p3: Vec3) -> Particle {
        let mut p = Particle::waiting(ParticleId(1), MaterialId(0), 1.0, InjectionId(0), 0, 0.0);
        p.enter(capacity, kind, p1, p3).unwrap();
        p
    }

    fn step(env: &Environment, p: &mut Particle, dt: f64) -> StepCounters {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut counters = StepCounters::default();
        let mut mover = Mover {
            env,
            clock: StepClock {
                time: 0.0,
                dt,
                index: TimeIndex(0),
            },
            rng: &mut rng,
            counters: &mut counters,
        };
        mover.advance(p).unwrap();
        counters
    }

    // ---------------------------------------------------------------
    // Pipe network
    // ---------------------------------------------------------------

    #[test]
    fn advects_within_pipe() {
        let sewer = straight_sewer(2, 100.0, 1.0);
        let pipe = sewer.pipes[0];
        let env = env(sewer.net);
        let mut p = particle_in(pipe, CapacityKind::Pipe, 0.0, Vec3::ZERO);
        step(&env, &mut p, 10.0);
        assert_eq!(p.capacity(), Some(pipe));
        assert!((p.position_1d - 10.0).abs() < 1e-12);
        assert!((p.travelled - 10.0).abs() < 1e-12);
        assert_eq!(p.velocity_1d, 1.0);
    }

    #[test]
    fn remaining_distance_carries_into_next_pipe() {
        let sewer = straight_sewer(2, 10.0, 1.0);
        let (p0, p1) = (sewer.pipes[0], sewer.pipes[1]);
        let env = env(sewer.net);
        let mut p = particle_in(p0, CapacityKind::Pipe, 8.0, Vec3::ZERO);
        step(&env, &mut p, 5.0);
        assert_eq!(p.capacity(), Some(p1));
        let len0 = env.view.pipe_length(p0).unwrap();
        assert!((p.position_1d - (13.0 - len0)).abs() < 1e-9);
        assert!((p.travelled - 5.0).abs() < 1e-9);
    }

    #[test]
    fn outfall_removes_particle() {
        let sewer = straight_sewer(1, 10.0, 2.0);
        let pipe = sewer.pipes[0];
        let env = env(sewer.net);
        let mut p = particle_in(pipe, CapacityKind::Pipe, 5.0, Vec3::ZERO);
        let counters = step(&env, &mut p, 10.0);
        assert_eq!(p.status(), ParticleStatus::LeftSimulation);
        assert_eq!(p.capacity(), None);
        assert_eq!(counters.left, 1);
    }

    #[test]
    fn hop_limit_stops_at_node() {
        let sewer = straight_sewer(40, 1.0, 1.0);
        let (first, node) = (sewer.pipes[0], sewer.nodes[17]);
        let mut env = env(sewer.net);
        env.config.max_hops_per_step = 16;
        let mut p = particle_in(first, CapacityKind::Pipe, 0.0, Vec3::ZERO);
        let counters = step(&env, &mut p, 30.0);
        assert_eq!(counters.hop_limit_hits, 1);
        assert_eq!(p.capacity(), Some(node));
        assert_eq!(p.status(), ParticleStatus::InPipeNetwork);
    }

    #[test]
    fn node_particle_is_routed_downstream() {
        let sewer = straight_sewer(2, 10.0, 1.0);
        let (node, pipe) = (sewer.nodes[1], sewer.pipes[1]);
        let env = env(sewer.net);
        let mut p = particle_in(node, CapacityKind::Manhole, 0.0, Vec3::ZERO);
        step(&env, &mut p, 4.0);
        assert_eq!(p.capacity(), Some(pipe));
        assert!((p.position_1d - 4.0).abs() < 1e-12);
    }

    #[test]
    fn spill_without_link_is_counted() {
        let mut net = MockNetwork::new();
        let j = net.add_manhole(Vec3::new(0.0, 0.0, 10.0), 0.5);
        let out = net.add_outfall(Vec3::new(10.0, 0.0, 9.0));
        net.add_pipe(j, out, 1e-3, 0.1);
        net.set_spill_flow(j, 1e3);
        let env = env(net);
        let mut spills = StepCounters::default();
        for seed in 0..20u64 {
            let mut p = particle_in(j, CapacityKind::Manhole, 0.0, Vec3::ZERO);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut mover = Mover {
                env: &env,
                clock: StepClock {
                    time: 0.0,
                    dt: 1.0,
                    index: TimeIndex(0),
                },
                rng: &mut rng,
                counters: &mut spills,
            };
            mover.advance(&mut p).unwrap();
        }
        assert!(spills.spill_failures >= 18);
        assert_eq!(spills.spills, 0);
    }

    #[test]
    fn spill_reaches_linked_surface() {
        let mut net = MockNetwork::new();
        let j = net.add_manhole(Vec3::new(0.0, 0.0, 10.0), 0.5);
        let out = net.add_outfall(Vec3::new(10.0, 0.0, 9.0));
        net.add_pipe(j, out, 1e-3, 0.1);
        net.set_spill_flow(j, 1e3);
        let cells = net.add_surface_grid(Vec3::new(-5.0, -5.0, 11.0), 2, 2, 5.0);
        net.link_surface(j, cells[3]);
        let env = env(net);
        let mut landed = 0;
        for seed in 0..20u64 {
            let mut p = particle_in(j, CapacityKind::Manhole, 0.0, Vec3::ZERO);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut counters = StepCounters::default();
            let mut mover = Mover {
                env: &env,
                clock: StepClock {
                    time: 0.0,
                    dt: 1.0,
                    index: TimeIndex(0),
                },
                rng: &mut rng,
                counters: &mut counters,
            };
            mover.advance(&mut p).unwrap();
            if p.status() == ParticleStatus::OnSurface {
                assert_eq!(p.capacity(), Some(cells[3]));
                assert_eq!(counters.spills, 1);
                landed += 1;
            }
        }
        assert!(landed >= 18);
    }

    #[test]
    fn unlinked_spill_lands_in_cell_above_node() {
        let mut net = MockNetwork::new();
        let cells = net.add_surface_grid(Vec3::new(-5.0, -5.0, 11.0), 2, 2, 5.0);
        let j = net.add_manhole(Vec3::new(1.0, 1.0, 10.0), 0.5);
        let out = net.add_outfall(Vec3::new(10.0, 0.0, 9.0));
        net.add_pipe(j, out, 1e-3, 0.1);
        net.set_spill_flow(j, 1e3);
        let above = net.locate_surface(net.position(j), None);
        assert!(above.is_some());
        assert!(cells.contains(&above.unwrap()));
        let env = env(net);
        let mut counters = StepCounters::default();
        let mut landed = 0;
        for seed in 0..20u64 {
            let mut p = particle_in(j, CapacityKind::Manhole, 0.0, Vec3::ZERO);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut mover = Mover {
                env: &env,
                clock: StepClock {
                    time: 0.0,
                    dt: 1.0,
                    index: TimeIndex(0),
                },
                rng: &mut rng,
                counters: &mut counters,
            };
            mover.advance(&mut p).unwrap();
            if p.status() == ParticleStatus::OnSurface {
                assert_eq!(p.capacity(), above);
                assert_eq!(p.position_3d.x, 1.0);
                assert_eq!(p.position_3d.y, 1.0);
                landed += 1;
            }
        }
        assert!(landed >= 18);
        assert_eq!(counters.spills, landed);
        assert_eq!(counters.spill_failures, 0);
    }

    #[test]
    fn routing_inconsistency_leaves_particle_at_node() {
        struct Shortfall(RoutingConfig);

        impl Routing for Shortfall {
            fn name(&self) -> &str {
                "Shortfall"
            }

            fn config(&self) -> &RoutingConfig {
                &self.0
            }

            fn decide_deposit(
                &self,
                _particle: &Particle,
                _capacity: &dyn VelocityProvider,
                _rng: &mut dyn RngCore,
            ) -> bool {
                false
            }

            fn decide_erode(
                &self,
                _particle: &Particle,
                _capacity: &dyn VelocityProvider,
                _rng: &mut dyn RngCore,
            ) -> bool {
                false
            }

            fn choose_connection(
                &self,
                _node: CapacityId,
                _view: &dyn HydraulicView,
                _t: TimeIndex,
                _search: Search,
                _rng: &mut dyn RngCore,
            ) -> Result<Option<Route>, RoutingError> {
                Err(RoutingError::AccumulationShortfall {
                    node: CapacityId(0),
                    threshold: 1.0,
                    accumulated: 0.5,
                })
            }
        }

        let sewer = straight_sewer(2, 10.0, 1.0);
        let node = sewer.nodes[1];
        let mut env = env(sewer.net);
        env.routing = Arc::new(Shortfall(RoutingConfig::default()));
        let mut p = particle_in(node, CapacityKind::Manhole, 0.0, Vec3::ZERO);
        let counters = step(&env, &mut p, 4.0);
        assert_eq!(counters.routing_inconsistencies, 1);
        assert_eq!(p.capacity(), Some(node));
        assert_eq!(p.status(), ParticleStatus::InPipeNetwork);
    }

    // ---------------------------------------------------------------
    // Surface
    // ---------------------------------------------------------------

    #[test]
    fn surface_advection_changes_cell() {
        let (mut net, cells) = flat_catchment(4, 1, 10.0);
        net.set_surface_velocity(Vec3::new(1.0, 0.0, 0.0));
        let start = net.position(cells[0]);
        let env = env(net);
        let mut p = particle_in(cells[0], CapacityKind::SurfaceCell, 0.0, start);
        step(&env, &mut p, 10.0);
        assert!((p.position_3d.x - (start.x + 10.0)).abs() < 1e-12);
        assert_eq!(p.capacity(), env.view.locate_surface(p.position_3d, None));
        assert_ne!(p.capacity(), Some(cells[0]));
    }

    #[test]
    fn dry_cell_holds_particle() {
        let (mut net, cells) = flat_catchment(2, 1, 10.0);
        net.set_surface_velocity(Vec3::new(5.0, 0.0, 0.0));
        net.set_surface_depth(0.0001);
        let start = net.position(cells[0]);
        let env = env(net);
        let mut p = particle_in(cells[0], CapacityKind::SurfaceCell, 0.0, start);
        step(&env, &mut p, 10.0);
        assert_eq!(p.position_3d, start);
    }

    #[test]
    fn leaving_mesh_removes_particle() {
        let (mut net, cells) = flat_catchment(2, 1, 10.0);
        net.set_surface_velocity(Vec3::new(-5.0, 0.0, 0.0));
        let start = net.position(cells[0]);
        let env = env(net);
        let mut p = particle_in(cells[0], CapacityKind::SurfaceCell, 0.0, start);
        let counters = step(&env, &mut p, 10.0);
        assert_eq!(p.status(), ParticleStatus::LeftSimulation);
        assert_eq!(counters.left, 1);
    }

    #[test]
    fn inlet_captures_particle() {
        let (mut net, cells) = flat_catchment(2, 1, 10.0);
        let node = net.add_manhole(Vec3::new(5.0, 5.0, -2.0), 0.2);
        // q·dt / volume ≥ 1 makes capture certain.
        net.set_drain(cells[0], node, 100.0);
        let start = net.position(cells[0]);
        let env = env(net);
        let mut p = particle_in(cells[0], CapacityKind::SurfaceCell, 0.0, start);
        let counters = step(&env, &mut p, 1.0);
        assert_eq!(p.capacity(), Some(node));
        assert_eq!(p.status(), ParticleStatus::InPipeNetwork);
        assert_eq!(counters.drained, 1);
    }

    // ---------------------------------------------------------------
    // Soil
    // ---------------------------------------------------------------

    #[test]
    fn wall_clips_seepage() {
        let mut net = MockNetwork::new();
        let soil = net.add_soil_box(Vec3::new(-20.0, -20.0, -5.0), Vec3::new(20.0, 20.0, 5.0));
        net.set_soil_velocity(Vec3::new(1.0, 0.0, 0.0));
        let wall = Wall::new(Vec3::new(5.0, -1.0, 0.0), Vec3::new(5.0, 1.0, 0.0), 0.0, 2.0).unwrap();
        let env = env_with(net, ObstacleField::new().with(wall));
        let mut p = particle_in(soil, CapacityKind::SoilCell, 0.0, Vec3::new(0.0, 0.0, 1.0));
        let counters = step(&env, &mut p, 10.0);
        assert_eq!(counters.blocked_movements, 1);
        assert!((p.position_3d.x - 4.999).abs() < 1e-9);
        assert_eq!(p.capacity(), Some(soil));
    }

    #[test]
    fn leaving_soil_removes_particle() {
        let mut net = MockNetwork::new();
        let soil = net.add_soil_box(Vec3::ZERO, Vec3::new(1.0, 1.0, 1.0));
        net.set_soil_velocity(Vec3::new(0.0, 0.0, -1.0));
        let env = env(net);
        let mut p = particle_in(soil, CapacityKind::SoilCell, 0.0, Vec3::new(0.5, 0.5, 0.5));
        step(&env, &mut p, 1.0);
        assert_eq!(p.status(), ParticleStatus::LeftSimulation);
    }

    #[test]
    fn excessive_velocity_is_flagged_not_clamped() {
        let sewer = straight_sewer(1, 1000.0, 50.0);
        let pipe = sewer.pipes[0];
        let env = env(sewer.net);
        let mut p = particle_in(pipe, CapacityKind::Pipe, 0.0, Vec3::ZERO);
        let counters = step(&env, &mut p, 1.0);
        assert_eq!(counters.velocity_warnings, 1);
        assert!((p.position_1d - 50.0).abs() < 1e-12);
    }
}
