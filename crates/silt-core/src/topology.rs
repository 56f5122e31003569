//! Read-only view onto the drainage topology and its hydraulic results.
//!
//! The topology (pipes, manholes, surface mesh, subsurface cells) and the
//! per-timestep hydraulic fields are owned by an external layer. The
//! transport core only ever reads them through [`HydraulicView`], and only
//! for the [`TimeIndex`] the coordinator fixed for the current step, so
//! any number of workers may share one view concurrently.

use smallvec::SmallVec;

use crate::geometry::Vec3;
use crate::id::CapacityId;
use crate::particle::ParticleStatus;
use crate::time::TimeIndex;

/// The closed set of capacity kinds a particle can occupy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CapacityKind {
    /// A pipe segment with a 1D axis from its start node to its end node.
    Pipe,
    /// A manhole / junction node.
    Manhole,
    /// A triangle of the 2D surface mesh.
    SurfaceCell,
    /// A cell of the 3D subsurface domain.
    SoilCell,
}

impl CapacityKind {
    /// The particle status implied by occupying a capacity of this kind.
    pub fn domain(self) -> ParticleStatus {
        match self {
            Self::Pipe | Self::Manhole => ParticleStatus::InPipeNetwork,
            Self::SurfaceCell => ParticleStatus::OnSurface,
            Self::SoilCell => ParticleStatus::InSoil,
        }
    }
}

/// Which end of a pipe a connection attaches to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PipeEnd {
    /// The end at axial position 0.
    Start,
    /// The end at axial position `length`.
    End,
}

/// A link between a node and one end of an adjacent pipe.
///
/// Pipe flow is signed along the pipe axis (positive from start to end),
/// so whether a connection currently carries water away from the node
/// depends on both the attached end and the flow sign.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Connection {
    /// The attached pipe.
    pub pipe: CapacityId,
    /// Which end of the pipe touches the node.
    pub end: PipeEnd,
    /// Invert elevation of the pipe at this node [m].
    pub invert: f64,
}

/// Connection storage for one node; nodes rarely have more than four pipes.
pub type ConnectionList = SmallVec<[Connection; 4]>;

impl Connection {
    /// True if `flow` leaves the node into the pipe.
    pub fn is_inlet_to_pipe(&self, flow: f64) -> bool {
        match self.end {
            PipeEnd::Start => flow > 0.0,
            PipeEnd::End => flow < 0.0,
        }
    }

    /// True if `flow` leaves the pipe into the node.
    pub fn is_outlet_from_pipe(&self, flow: f64) -> bool {
        match self.end {
            PipeEnd::Start => flow < 0.0,
            PipeEnd::End => flow > 0.0,
        }
    }

    /// True if the invert lies at or below `water_level`.
    pub fn is_wetted(&self, water_level: f64) -> bool {
        self.invert <= water_level
    }

    /// Axial position after entering the pipe through this connection and
    /// travelling `distance` metres into it.
    pub fn entry_position(&self, pipe_length: f64, distance: f64) -> f64 {
        let d = distance.clamp(0.0, pipe_length);
        match self.end {
            PipeEnd::Start => d,
            PipeEnd::End => pipe_length - d,
        }
    }
}

/// Read-only accessors over topology and hydraulic state.
///
/// Time-dependent readers take the [`TimeIndex`] of the current step.
/// Implementations must be safe to read from many threads at once and
/// must not change between the start and the end of a step.
///
/// Readers on a capacity of the wrong kind return neutral values
/// (zero flow, zero velocity); kind mismatches are a caller bug that
/// [`kind`](HydraulicView::kind) lets callers rule out first.
pub trait HydraulicView: Send + Sync {
    /// Kind of `capacity`, or `None` if it is unknown.
    fn kind(&self, capacity: CapacityId) -> Option<CapacityKind>;

    /// Signed pipe discharge [m³/s], positive from start to end.
    fn flow(&self, pipe: CapacityId, t: TimeIndex) -> f64;

    /// Signed mean pipe velocity [m/s], positive from start to end.
    fn velocity(&self, pipe: CapacityId, t: TimeIndex) -> f64;

    /// Water depth [m] in a pipe, manhole or surface cell.
    fn water_height(&self, capacity: CapacityId, t: TimeIndex) -> f64;

    /// Water surface elevation [m] in a manhole or surface cell.
    fn water_level(&self, capacity: CapacityId, t: TimeIndex) -> f64;

    /// Stored water volume [m³] in a capacity.
    fn water_volume(&self, capacity: CapacityId, t: TimeIndex) -> f64;

    /// Axis length of a pipe [m].
    fn pipe_length(&self, pipe: CapacityId) -> Option<f64>;

    /// `(start, end)` nodes of a pipe.
    fn pipe_nodes(&self, pipe: CapacityId) -> Option<(CapacityId, CapacityId)>;

    /// Representative position: node location or cell centroid.
    fn position(&self, capacity: CapacityId) -> Vec3;

    /// Connections of a node, ordered bottom-to-top by invert elevation.
    fn connections(&self, node: CapacityId) -> &[Connection];

    /// True if the node is a free outfall where particles leave the network.
    fn is_outfall(&self, node: CapacityId) -> bool;

    /// Discharge overflowing from a node onto the surface [m³/s].
    fn spill_flow(&self, _node: CapacityId, _t: TimeIndex) -> f64 {
        0.0
    }

    /// Surface cell receiving a node's overflow, if the node is coupled.
    fn surface_link(&self, _node: CapacityId) -> Option<CapacityId> {
        None
    }

    /// All surface cells in a fixed order (the areal injection index space).
    fn surface_cells(&self) -> &[CapacityId];

    /// Depth-averaged surface velocity of a cell [m/s]; `z` is ignored.
    fn surface_velocity(&self, _cell: CapacityId, _t: TimeIndex) -> Vec3 {
        Vec3::ZERO
    }

    /// Surface cell containing the planar projection of `point`.
    ///
    /// `hint` is the cell the point most likely lies in or near.
    fn locate_surface(&self, point: Vec3, hint: Option<CapacityId>) -> Option<CapacityId>;

    /// Node drained by an inlet inside a surface cell.
    fn drain(&self, _cell: CapacityId) -> Option<CapacityId> {
        None
    }

    /// Discharge captured by a cell's inlet [m³/s].
    fn drain_flow(&self, _cell: CapacityId, _t: TimeIndex) -> f64 {
        0.0
    }

    /// Seepage velocity in a soil cell [m/s].
    fn soil_velocity(&self, _cell: CapacityId, _t: TimeIndex) -> Vec3 {
        Vec3::ZERO
    }

    /// Soil cell containing `point`.
    fn locate_soil(&self, _point: Vec3, _hint: Option<CapacityId>) -> Option<CapacityId> {
        None
    }

    /// 3D position at `distance` metres along a pipe's axis.
    fn pipe_point(&self, pipe: CapacityId, distance: f64) -> Option<Vec3> {
        let (start, end) = self.pipe_nodes(pipe)?;
        let length = self.pipe_length(pipe)?;
        let s = if length > 0.0 {
            (distance / length).clamp(0.0, 1.0)
        } else {
            0.0
        };
        Some(self.position(start).lerp(self.position(end), s))
    }
}
