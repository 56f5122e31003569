//! Benchmark scenarios for the Silt particle transport engine.
//!
//! - [`reference_network`]: a catchment grid drained by a straight trunk sewer
//! - [`reference_simulation`]: 10K particles released over a 50x20 catchment
//! - [`stress_simulation`]: 100K particles over a 200x50 catchment

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use silt_core::{HydraulicView, Material, MaterialId, Vec3};
use silt_engine::{Simulation, SimulationConfig, SimulationError};
use silt_injection::InjectionSpec;
use silt_routing::ConstantDispersion;
use silt_test_utils::MockNetwork;

/// An `nx` x `ny` grid of `cell_size` squares at 12 m elevation with a
/// trunk sewer running along its centre line.
///
/// Every surface cell drains into the manhole below its column and every
/// manhole spills back onto the cell above it. Surface water drifts
/// slowly towards the outfall end.
pub fn reference_network(nx: usize, ny: usize, cell_size: f64) -> MockNetwork {
    let mut net = MockNetwork::new();
    let cells = net.add_surface_grid(Vec3::new(0.0, 0.0, 12.0), nx, ny, cell_size);
    net.set_surface_velocity(Vec3::new(0.05, -0.01, 0.0));

    let y = ny as f64 * cell_size / 2.0;
    let mut nodes = Vec::with_capacity(nx + 1);
    for i in 0..=nx {
        let position = Vec3::new(i as f64 * cell_size, y, 10.0 - 0.05 * i as f64);
        let node = if i == nx {
            net.add_outfall(position)
        } else {
            net.add_manhole(position, 0.4)
        };
        nodes.push(node);
    }
    for w in nodes.windows(2) {
        net.add_pipe(w[0], w[1], 0.05, 1.0);
    }
    for (i, &node) in nodes[..nx].iter().enumerate() {
        let above = Vec3::new((i as f64 + 0.5) * cell_size, y, 12.0);
        if let Some(cell) = net.locate_surface(above, None) {
            net.link_surface(node, cell);
        }
        net.set_spill_flow(node, 1e-3);
    }
    for &cell in &cells {
        let column = (net.position(cell).x / cell_size) as usize;
        net.set_drain(cell, nodes[column.min(nx - 1)], 1e-4);
    }
    net
}

fn simulation(
    net: MockNetwork,
    particles: u64,
    seed: u64,
    workers: usize,
) -> Result<Simulation, SimulationError> {
    Simulation::builder(net)
        .config(SimulationConfig {
            end_time: 1e7,
            seed,
            worker_count: Some(workers),
            ..Default::default()
        })
        .material(Material::new(MaterialId(0), "sediment", 1e-3))
        .injection(InjectionSpec::areal(MaterialId(0), particles))
        .dispersion(ConstantDispersion::new(0.01).unwrap_or_default())
        .build()
}

/// 10K particles over a 50x20 catchment (2000 cells).
pub fn reference_simulation(seed: u64, workers: usize) -> Result<Simulation, SimulationError> {
    simulation(reference_network(50, 20, 2.0), 10_000, seed, workers)
}

/// 100K particles over a 200x50 catchment (20000 cells).
pub fn stress_simulation(seed: u64, workers: usize) -> Result<Simulation, SimulationError> {
    simulation(reference_network(200, 50, 2.0), 100_000, seed, workers)
}
