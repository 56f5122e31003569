//! Reusable network fixtures.
//!
//! - [`straight_sewer`]: a chain of manholes draining to an outfall.
//! - [`flat_catchment`]: a triangulated surface grid with still water.

use silt_core::{CapacityId, Vec3};

use crate::MockNetwork;

/// A straight sewer laid along the x axis.
pub struct Sewer {
    pub net: MockNetwork,
    /// Manholes from upstream to downstream; the last one is the outfall.
    pub nodes: Vec<CapacityId>,
    /// `pipes[i]` runs from `nodes[i]` to `nodes[i + 1]`.
    pub pipes: Vec<CapacityId>,
}

impl Sewer {
    pub fn outfall(&self) -> CapacityId {
        self.nodes[self.nodes.len() - 1]
    }
}

/// `segments` pipes of `length` metres each, falling 0.1 m per pipe and
/// carrying 0.05 m³/s at `velocity`.
pub fn straight_sewer(segments: usize, length: f64, velocity: f64) -> Sewer {
    let mut net = MockNetwork::new();
    let mut nodes = Vec::with_capacity(segments + 1);
    for i in 0..=segments {
        let position = Vec3::new(i as f64 * length, 0.0, 10.0 - 0.1 * i as f64);
        let id = if i == segments {
            net.add_outfall(position)
        } else {
            net.add_manhole(position, 0.3)
        };
        nodes.push(id);
    }
    let pipes = nodes
        .windows(2)
        .map(|w| net.add_pipe(w[0], w[1], 0.05, velocity))
        .collect();
    Sewer { net, nodes, pipes }
}

/// A flat `nx` × `ny` surface grid of `cell_size` squares at the origin
/// with 5 cm of still water. Returns the network and its `2·nx·ny` cells.
pub fn flat_catchment(nx: usize, ny: usize, cell_size: f64) -> (MockNetwork, Vec<CapacityId>) {
    let mut net = MockNetwork::new();
    let cells = net.add_surface_grid(Vec3::ZERO, nx, ny, cell_size);
    (net, cells)
}
