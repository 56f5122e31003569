//! Integration test: areal release over a surface catchment.
//!
//! Particles spread evenly over every surface cell, visit statistics are
//! merged at the end of each step, and the same seed reproduces the same
//! run bit for bit.

use silt_core::{HydraulicView, Material, MaterialId, ParticleStatus, Vec3};
use silt_engine::{Simulation, SimulationConfig, StopHandle};
use silt_injection::InjectionSpec;
use silt_routing::ConstantDispersion;
use silt_test_utils::fixtures::flat_catchment;

const MASS: f64 = 0.5;

fn sand() -> Material {
    Material::new(MaterialId(0), "sand", MASS)
}

fn config(end_time: f64, seed: u64, workers: usize) -> SimulationConfig {
    SimulationConfig {
        end_time,
        seed,
        worker_count: Some(workers),
        ..Default::default()
    }
}

// ── Areal release ────────────────────────────────────────────────

#[test]
fn areal_release_visits_every_cell() {
    let (net, cells) = flat_catchment(5, 10, 1.0);
    assert_eq!(cells.len(), 100);
    let mut sim = Simulation::builder(net)
        .config(config(10.0, 1, 4))
        .material(sand())
        .injection(InjectionSpec::areal(MaterialId(0), 300))
        .dispersion(ConstantDispersion::new(0.0).unwrap())
        .build()
        .unwrap();

    let metrics = sim.step().unwrap();
    assert_eq!(metrics.counters.released, 300);
    assert_eq!(metrics.counters.active, 300);
    assert_eq!(metrics.counters.left, 0);

    let store = sim.store();
    assert_eq!(store.timeline(), &[1.0]);
    assert_eq!(store.capacities().count(), 100);
    assert!((store.total_mass(1.0) - 300.0 * MASS).abs() < 1e-9);

    let counted: u64 = cells.iter().map(|&c| store.sample_at(c, 1.0).count).sum();
    assert_eq!(counted, 300);
    // First and last ids land on the first and last cell.
    assert!(store.sample_at(cells[0], 1.0).count >= 1);
    assert!(store.sample_at(cells[99], 1.0).count >= 1);
    // Everything was released this step, so every visit is a new arrival.
    for &c in &cells {
        let s = store.sample_at(c, 1.0);
        assert_eq!(s.count, s.immigrated);
    }
}

#[test]
fn still_water_keeps_particles_in_their_cells() {
    let (net, cells) = flat_catchment(3, 3, 2.0);
    let mut sim = Simulation::builder(net)
        .config(config(5.0, 7, 2))
        .material(sand())
        .injection(InjectionSpec::areal(MaterialId(0), 18))
        .dispersion(ConstantDispersion::new(0.0).unwrap())
        .build()
        .unwrap();
    sim.run(&StopHandle::new()).unwrap();

    for &c in &cells {
        let first = sim.store().sample_at(c, 1.0);
        let last = sim.store().sample_at(c, 5.0);
        assert_eq!(first.count, last.count);
        assert_eq!(last.immigrated, 0);
    }
    let particles = sim.particles().unwrap();
    assert!(particles.iter().all(|p| p.status() == ParticleStatus::OnSurface));
    assert!(particles.iter().all(|p| p.travelled == 0.0));
}

#[test]
fn delayed_release_waits() {
    let (net, _) = flat_catchment(2, 2, 1.0);
    let mut sim = Simulation::builder(net)
        .config(config(10.0, 1, 1))
        .material(sand())
        .injection(InjectionSpec::areal(MaterialId(0), 10).released(3.0, 4.0))
        .dispersion(ConstantDispersion::new(0.0).unwrap())
        .build()
        .unwrap();

    let m = sim.step().unwrap();
    assert_eq!(m.counters.waiting, 10);
    assert_eq!(sim.store().total_mass(1.0), 0.0);

    sim.run(&StopHandle::new()).unwrap();
    assert!((sim.store().total_mass(10.0) - 10.0 * MASS).abs() < 1e-9);
    // Release times spread linearly over [3, 7]: t in (3, 4] sees the first.
    let at_four: u64 = sim
        .store()
        .capacities()
        .map(|c| sim.store().sample_at(c, 4.0).count)
        .sum();
    assert!(at_four >= 1 && at_four < 10);
}

// ── Outflow ──────────────────────────────────────────────────────

#[test]
fn advection_carries_particles_off_the_mesh() {
    let (mut net, _) = flat_catchment(4, 1, 1.0);
    net.set_surface_velocity(Vec3::new(0.5, 0.0, 0.0));
    let mut sim = Simulation::builder(net)
        .config(config(20.0, 3, 2))
        .material(sand())
        .injection(InjectionSpec::areal(MaterialId(0), 40))
        .dispersion(ConstantDispersion::new(0.0).unwrap())
        .build()
        .unwrap();

    let mut left = 0;
    while !sim.is_finished() {
        left += sim.step().unwrap().counters.left;
    }
    assert_eq!(left, 40);
    assert_eq!(sim.store().total_mass(20.0), 0.0);
    let particles = sim.particles().unwrap();
    assert!(particles
        .iter()
        .all(|p| p.status() == ParticleStatus::LeftSimulation && p.capacity().is_none()));
}

#[test]
fn inlets_capture_surface_particles() {
    let (mut net, cells) = flat_catchment(2, 1, 1.0);
    let node = net.add_manhole(Vec3::new(0.5, 0.5, -2.0), 0.2);
    for &c in &cells {
        net.set_drain(c, node, 1.0);
    }
    let mut sim = Simulation::builder(net)
        .config(config(1.0, 1, 1))
        .material(sand())
        .injection(InjectionSpec::areal(MaterialId(0), 12))
        .build()
        .unwrap();
    let m = sim.step().unwrap();
    assert_eq!(m.counters.drained, 12);
    assert_eq!(sim.store().sample_at(node, 1.0).count, 12);
}

// ── Determinism ──────────────────────────────────────────────────

fn dispersive_run(seed: u64) -> Vec<silt_core::Particle> {
    let (mut net, _) = flat_catchment(10, 10, 1.0);
    net.set_surface_velocity(Vec3::new(0.05, 0.02, 0.0));
    let mut sim = Simulation::builder(net)
        .config(config(20.0, seed, 4))
        .material(sand())
        .injection(InjectionSpec::areal(MaterialId(0), 200))
        .dispersion(ConstantDispersion::new(0.01).unwrap())
        .build()
        .unwrap();
    sim.run(&StopHandle::new()).unwrap();
    sim.particles().unwrap()
}

#[test]
fn same_seed_reproduces_run() {
    assert_eq!(dispersive_run(42), dispersive_run(42));
}

#[test]
fn different_seed_changes_run() {
    let a = dispersive_run(1);
    let b = dispersive_run(2);
    assert_ne!(a, b);
}

#[test]
fn traces_follow_particles() {
    let (mut net, _) = flat_catchment(10, 1, 1.0);
    net.set_surface_velocity(Vec3::new(0.05, 0.0, 0.0));
    let mut sim = Simulation::builder(net)
        .config(SimulationConfig {
            end_time: 10.0,
            record_traces: true,
            trace_interval: 2.0,
            worker_count: Some(2),
            ..Default::default()
        })
        .material(sand())
        .injection(InjectionSpec::areal(MaterialId(0), 4))
        .dispersion(ConstantDispersion::new(0.0).unwrap())
        .build()
        .unwrap();
    sim.run(&StopHandle::new()).unwrap();
    let traces = sim.traces().unwrap();
    assert_eq!(traces.len(), 4);
    for points in traces.values() {
        // Sampled at t = 1, 2, 4, 6, 8, 10.
        assert_eq!(points.len(), 6);
        assert!(points.windows(2).all(|w| w[0].time < w[1].time));
        assert!(points.windows(2).all(|w| w[0].position.x < w[1].position.x));
    }
}

#[test]
fn view_can_be_shared() {
    let (net, _) = flat_catchment(2, 2, 1.0);
    let view: std::sync::Arc<dyn HydraulicView> = std::sync::Arc::new(net);
    let sim = Simulation::builder_shared(view.clone())
        .config(config(1.0, 0, 1))
        .build()
        .unwrap();
    assert_eq!(sim.particle_count(), 0);
    assert_eq!(view.surface_cells().len(), 8);
}
