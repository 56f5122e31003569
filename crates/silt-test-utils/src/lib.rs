//! Test utilities and mock hydraulic networks for Silt development.
//!
//! [`MockNetwork`] is an in-memory [`HydraulicView`] with steady hydraulics:
//! every reader ignores the time index. Build it up with the `add_*`
//! methods and tweak hydraulic state with the `set_*` methods before
//! handing it to code under test.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use silt_core::{
    CapacityId, CapacityKind, Connection, ConnectionList, HydraulicView, PipeEnd, TimeIndex, Vec3,
};

/// Plan area [m²] assumed for every manhole when computing stored volume.
pub const MANHOLE_AREA: f64 = 1.0;

/// Default surface water depth [m].
pub const DEFAULT_SURFACE_DEPTH: f64 = 0.05;

#[derive(Clone, Debug)]
struct Node {
    position: Vec3,
    depth: f64,
    outfall: bool,
    connections: ConnectionList,
    spill: f64,
    surface_link: Option<CapacityId>,
}

#[derive(Clone, Debug)]
struct Pipe {
    start: CapacityId,
    end: CapacityId,
    length: f64,
    flow: f64,
    velocity: f64,
    depth: f64,
}

#[derive(Clone, Debug)]
struct Triangle {
    vertices: [Vec3; 3],
    centroid: Vec3,
    area: f64,
    depth: f64,
    drain: Option<(CapacityId, f64)>,
}

#[derive(Clone, Debug)]
struct SoilBox {
    min: Vec3,
    max: Vec3,
}

#[derive(Clone, Debug)]
enum Entry {
    Node(Node),
    Pipe(Pipe),
    Surface(Triangle),
    Soil(SoilBox),
}

/// In-memory drainage network with steady hydraulics.
#[derive(Clone, Debug, Default)]
pub struct MockNetwork {
    entries: Vec<Entry>,
    surface: Vec<CapacityId>,
    surface_velocity: Vec3,
    soil_velocity: Vec3,
    volume_override: Vec<(CapacityId, f64)>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, entry: Entry) -> CapacityId {
        let id = CapacityId(self.entries.len() as u32);
        self.entries.push(entry);
        id
    }

    fn entry(&self, id: CapacityId) -> Option<&Entry> {
        self.entries.get(id.0 as usize)
    }

    fn node(&self, id: CapacityId) -> Option<&Node> {
        match self.entry(id)? {
            Entry::Node(n) => Some(n),
            _ => None,
        }
    }

    fn node_mut(&mut self, id: CapacityId) -> &mut Node {
        match self.entries.get_mut(id.0 as usize) {
            Some(Entry::Node(n)) => n,
            _ => panic!("{id} is not a node"),
        }
    }

    fn pipe(&self, id: CapacityId) -> Option<&Pipe> {
        match self.entry(id)? {
            Entry::Pipe(p) => Some(p),
            _ => None,
        }
    }

    fn pipe_mut(&mut self, id: CapacityId) -> &mut Pipe {
        match self.entries.get_mut(id.0 as usize) {
            Some(Entry::Pipe(p)) => p,
            _ => panic!("{id} is not a pipe"),
        }
    }

    fn triangle(&self, id: CapacityId) -> Option<&Triangle> {
        match self.entry(id)? {
            Entry::Surface(t) => Some(t),
            _ => None,
        }
    }

    fn triangle_mut(&mut self, id: CapacityId) -> &mut Triangle {
        match self.entries.get_mut(id.0 as usize) {
            Some(Entry::Surface(t)) => t,
            _ => panic!("{id} is not a surface cell"),
        }
    }

    // ── Pipe network ────────────────────────────────────────────

    /// Add a manhole whose bottom lies at `position.z`.
    pub fn add_manhole(&mut self, position: Vec3, water_depth: f64) -> CapacityId {
        self.push(Entry::Node(Node {
            position,
            depth: water_depth,
            outfall: false,
            connections: ConnectionList::new(),
            spill: 0.0,
            surface_link: None,
        }))
    }

    /// Add a free outfall. It is always wet so routing can reach it.
    pub fn add_outfall(&mut self, position: Vec3) -> CapacityId {
        let id = self.add_manhole(position, 1.0);
        self.node_mut(id).outfall = true;
        id
    }

    /// Add a pipe from `start` to `end` running full with the given steady
    /// discharge and velocity. Both ends are connected at the node bottom.
    pub fn add_pipe(
        &mut self,
        start: CapacityId,
        end: CapacityId,
        flow: f64,
        velocity: f64,
    ) -> CapacityId {
        let (a, b) = match (self.node(start), self.node(end)) {
            (Some(a), Some(b)) => (a.position, b.position),
            _ => panic!("pipe endpoints must be nodes"),
        };
        let id = self.push(Entry::Pipe(Pipe {
            start,
            end,
            length: (b - a).length(),
            flow,
            velocity,
            depth: 0.1,
        }));
        self.connect(start, Connection {
            pipe: id,
            end: PipeEnd::Start,
            invert: a.z,
        });
        self.connect(end, Connection {
            pipe: id,
            end: PipeEnd::End,
            invert: b.z,
        });
        id
    }

    fn connect(&mut self, node: CapacityId, conn: Connection) {
        let list = &mut self.node_mut(node).connections;
        list.push(conn);
        list.sort_by(|x, y| x.invert.total_cmp(&y.invert));
    }

    /// Move the invert of `pipe` at `node`; connections stay sorted.
    pub fn set_invert(&mut self, node: CapacityId, pipe: CapacityId, invert: f64) {
        let list = &mut self.node_mut(node).connections;
        for conn in list.iter_mut().filter(|c| c.pipe == pipe) {
            conn.invert = invert;
        }
        list.sort_by(|x, y| x.invert.total_cmp(&y.invert));
    }

    pub fn set_pipe_flow(&mut self, pipe: CapacityId, flow: f64, velocity: f64) {
        let p = self.pipe_mut(pipe);
        p.flow = flow;
        p.velocity = velocity;
    }

    pub fn set_pipe_length(&mut self, pipe: CapacityId, length: f64) {
        self.pipe_mut(pipe).length = length;
    }

    pub fn set_water_depth(&mut self, capacity: CapacityId, depth: f64) {
        match self.entries.get_mut(capacity.0 as usize) {
            Some(Entry::Node(n)) => n.depth = depth,
            Some(Entry::Pipe(p)) => p.depth = depth,
            Some(Entry::Surface(t)) => t.depth = depth,
            _ => panic!("{capacity} has no water depth"),
        }
    }

    /// Override the stored water volume reported for `capacity`.
    pub fn set_water_volume(&mut self, capacity: CapacityId, volume: f64) {
        self.volume_override.retain(|(c, _)| *c != capacity);
        self.volume_override.push((capacity, volume));
    }

    pub fn set_spill_flow(&mut self, node: CapacityId, flow: f64) {
        self.node_mut(node).spill = flow;
    }

    /// Couple `node` to the surface cell receiving its overflow.
    pub fn link_surface(&mut self, node: CapacityId, cell: CapacityId) {
        self.node_mut(node).surface_link = Some(cell);
    }

    // ── Surface ─────────────────────────────────────────────────

    /// Add an `nx` × `ny` grid of square cells, each split into two
    /// triangles, starting at `origin`. Returns the new cells in order.
    pub fn add_surface_grid(
        &mut self,
        origin: Vec3,
        nx: usize,
        ny: usize,
        cell_size: f64,
    ) -> Vec<CapacityId> {
        let mut cells = Vec::with_capacity(2 * nx * ny);
        for j in 0..ny {
            for i in 0..nx {
                let x0 = origin.x + i as f64 * cell_size;
                let y0 = origin.y + j as f64 * cell_size;
                let p00 = Vec3::new(x0, y0, origin.z);
                let p10 = Vec3::new(x0 + cell_size, y0, origin.z);
                let p11 = Vec3::new(x0 + cell_size, y0 + cell_size, origin.z);
                let p01 = Vec3::new(x0, y0 + cell_size, origin.z);
                cells.push(self.add_triangle([p00, p10, p11]));
                cells.push(self.add_triangle([p00, p11, p01]));
            }
        }
        cells
    }

    pub fn add_triangle(&mut self, vertices: [Vec3; 3]) -> CapacityId {
        let [a, b, c] = vertices;
        let centroid = (a + b + c) * (1.0 / 3.0);
        let area = 0.5 * (b - a).cross(c - a).length();
        let id = self.push(Entry::Surface(Triangle {
            vertices,
            centroid,
            area,
            depth: DEFAULT_SURFACE_DEPTH,
            drain: None,
        }));
        self.surface.push(id);
        id
    }

    /// Uniform surface velocity for every cell.
    pub fn set_surface_velocity(&mut self, velocity: Vec3) {
        self.surface_velocity = velocity;
    }

    /// Set the water depth of every surface cell.
    pub fn set_surface_depth(&mut self, depth: f64) {
        for id in self.surface.clone() {
            self.triangle_mut(id).depth = depth;
        }
    }

    /// Place an inlet in `cell` draining `flow` into `node`.
    pub fn set_drain(&mut self, cell: CapacityId, node: CapacityId, flow: f64) {
        self.triangle_mut(cell).drain = Some((node, flow));
    }

    // ── Soil ────────────────────────────────────────────────────

    /// Add an axis-aligned soil cell.
    pub fn add_soil_box(&mut self, min: Vec3, max: Vec3) -> CapacityId {
        self.push(Entry::Soil(SoilBox { min, max }))
    }

    /// Uniform seepage velocity for every soil cell.
    pub fn set_soil_velocity(&mut self, velocity: Vec3) {
        self.soil_velocity = velocity;
    }
}

fn contains_planar(tri: &Triangle, p: Vec3) -> bool {
    let [a, b, c] = tri.vertices;
    let side = |u: Vec3, v: Vec3| (v.x - u.x) * (p.y - u.y) - (v.y - u.y) * (p.x - u.x);
    let d1 = side(a, b);
    let d2 = side(b, c);
    let d3 = side(c, a);
    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}

impl HydraulicView for MockNetwork {
    fn kind(&self, capacity: CapacityId) -> Option<CapacityKind> {
        Some(match self.entry(capacity)? {
            Entry::Node(_) => CapacityKind::Manhole,
            Entry::Pipe(_) => CapacityKind::Pipe,
            Entry::Surface(_) => CapacityKind::SurfaceCell,
            Entry::Soil(_) => CapacityKind::SoilCell,
        })
    }

    fn flow(&self, pipe: CapacityId, _t: TimeIndex) -> f64 {
        self.pipe(pipe).map_or(0.0, |p| p.flow)
    }

    fn velocity(&self, pipe: CapacityId, _t: TimeIndex) -> f64 {
        self.pipe(pipe).map_or(0.0, |p| p.velocity)
    }

    fn water_height(&self, capacity: CapacityId, _t: TimeIndex) -> f64 {
        match self.entry(capacity) {
            Some(Entry::Node(n)) => n.depth,
            Some(Entry::Pipe(p)) => p.depth,
            Some(Entry::Surface(t)) => t.depth,
            _ => 0.0,
        }
    }

    fn water_level(&self, capacity: CapacityId, t: TimeIndex) -> f64 {
        match self.entry(capacity) {
            Some(Entry::Node(n)) => n.position.z + n.depth,
            Some(Entry::Surface(tri)) => tri.centroid.z + tri.depth,
            Some(Entry::Pipe(p)) => self.position(p.start).z + self.water_height(capacity, t),
            _ => 0.0,
        }
    }

    fn water_volume(&self, capacity: CapacityId, _t: TimeIndex) -> f64 {
        if let Some((_, v)) = self.volume_override.iter().find(|(c, _)| *c == capacity) {
            return *v;
        }
        match self.entry(capacity) {
            Some(Entry::Node(n)) => n.depth * MANHOLE_AREA,
            Some(Entry::Pipe(p)) => {
                if p.velocity != 0.0 {
                    (p.flow / p.velocity).abs() * p.length
                } else {
                    0.0
                }
            }
            Some(Entry::Surface(t)) => t.depth * t.area,
            Some(Entry::Soil(s)) => {
                let d = s.max - s.min;
                d.x * d.y * d.z
            }
            None => 0.0,
        }
    }

    fn pipe_length(&self, pipe: CapacityId) -> Option<f64> {
        self.pipe(pipe).map(|p| p.length)
    }

    fn pipe_nodes(&self, pipe: CapacityId) -> Option<(CapacityId, CapacityId)> {
        self.pipe(pipe).map(|p| (p.start, p.end))
    }

    fn position(&self, capacity: CapacityId) -> Vec3 {
        match self.entry(capacity) {
            Some(Entry::Node(n)) => n.position,
            Some(Entry::Pipe(p)) => self.position(p.start).lerp(self.position(p.end), 0.5),
            Some(Entry::Surface(t)) => t.centroid,
            Some(Entry::Soil(s)) => s.min.lerp(s.max, 0.5),
            None => Vec3::ZERO,
        }
    }

    fn connections(&self, node: CapacityId) -> &[Connection] {
        self.node(node)
            .map(|n| n.connections.as_slice())
            .unwrap_or(&[])
    }

    fn is_outfall(&self, node: CapacityId) -> bool {
        self.node(node).is_some_and(|n| n.outfall)
    }

    fn spill_flow(&self, node: CapacityId, _t: TimeIndex) -> f64 {
        self.node(node).map_or(0.0, |n| n.spill)
    }

    fn surface_link(&self, node: CapacityId) -> Option<CapacityId> {
        self.node(node)?.surface_link
    }

    fn surface_cells(&self) -> &[CapacityId] {
        &self.surface
    }

    fn surface_velocity(&self, cell: CapacityId, _t: TimeIndex) -> Vec3 {
        if self.triangle(cell).is_some() {
            self.surface_velocity
        } else {
            Vec3::ZERO
        }
    }

    fn locate_surface(&self, point: Vec3, hint: Option<CapacityId>) -> Option<CapacityId> {
        if let Some(h) = hint {
            if self.triangle(h).is_some_and(|t| contains_planar(t, point)) {
                return Some(h);
            }
        }
        self.surface
            .iter()
            .copied()
            .find(|&id| self.triangle(id).is_some_and(|t| contains_planar(t, point)))
    }

    fn drain(&self, cell: CapacityId) -> Option<CapacityId> {
        self.triangle(cell)?.drain.map(|(node, _)| node)
    }

    fn drain_flow(&self, cell: CapacityId, _t: TimeIndex) -> f64 {
        self.triangle(cell)
            .and_then(|t| t.drain)
            .map_or(0.0, |(_, q)| q)
    }

    fn soil_velocity(&self, cell: CapacityId, _t: TimeIndex) -> Vec3 {
        match self.entry(cell) {
            Some(Entry::Soil(_)) => self.soil_velocity,
            _ => Vec3::ZERO,
        }
    }

    fn locate_soil(&self, point: Vec3, hint: Option<CapacityId>) -> Option<CapacityId> {
        let inside = |id: CapacityId| match self.entry(id) {
            Some(Entry::Soil(s)) => {
                point.x >= s.min.x
                    && point.x <= s.max.x
                    && point.y >= s.min.y
                    && point.y <= s.max.y
                    && point.z >= s.min.z
                    && point.z <= s.max.z
            }
            _ => false,
        };
        if let Some(h) = hint.filter(|&h| inside(h)) {
            return Some(h);
        }
        (0..self.entries.len() as u32).map(CapacityId).find(|&id| inside(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: TimeIndex = TimeIndex(0);

    #[test]
    fn pipe_connects_both_nodes() {
        let mut net = MockNetwork::new();
        let a = net.add_manhole(Vec3::new(0.0, 0.0, 5.0), 0.2);
        let b = net.add_manhole(Vec3::new(3.0, 4.0, 5.0), 0.2);
        let p = net.add_pipe(a, b, 0.1, 0.5);
        assert_eq!(net.pipe_length(p), Some(5.0));
        assert_eq!(net.connections(a)[0].end, PipeEnd::Start);
        assert_eq!(net.connections(b)[0].end, PipeEnd::End);
        assert_eq!(net.kind(p), Some(CapacityKind::Pipe));
    }

    #[test]
    fn connections_stay_sorted_by_invert() {
        let mut net = MockNetwork::new();
        let j = net.add_manhole(Vec3::new(0.0, 0.0, 1.0), 0.2);
        let a = net.add_manhole(Vec3::new(1.0, 0.0, 0.0), 0.2);
        let b = net.add_manhole(Vec3::new(0.0, 1.0, 0.0), 0.2);
        let p1 = net.add_pipe(j, a, 0.1, 0.5);
        let p2 = net.add_pipe(j, b, 0.1, 0.5);
        net.set_invert(j, p1, 2.0);
        let pipes: Vec<_> = net.connections(j).iter().map(|c| c.pipe).collect();
        assert_eq!(pipes, vec![p2, p1]);
    }

    #[test]
    fn grid_triangles_cover_plane() {
        let mut net = MockNetwork::new();
        let cells = net.add_surface_grid(Vec3::ZERO, 5, 10, 2.0);
        assert_eq!(cells.len(), 100);
        for &c in &cells {
            let centroid = net.position(c);
            assert_eq!(net.locate_surface(centroid, None), Some(c));
        }
        assert_eq!(net.locate_surface(Vec3::new(-1.0, 1.0, 0.0), None), None);
        assert_eq!(net.locate_surface(Vec3::new(10.5, 1.0, 0.0), None), None);
    }

    #[test]
    fn soil_boxes_locate_points() {
        let mut net = MockNetwork::new();
        let s = net.add_soil_box(Vec3::ZERO, Vec3::new(10.0, 10.0, 2.0));
        assert_eq!(net.locate_soil(Vec3::new(5.0, 5.0, 1.0), None), Some(s));
        assert_eq!(net.locate_soil(Vec3::new(5.0, 5.0, 3.0), Some(s)), None);
        assert_eq!(net.water_volume(s, T0), 200.0);
    }
}
