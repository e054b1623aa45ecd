use std::io::{self, Read, Write};

mod expander;
mod graph_pool;

pub use expander::{GraphEdge, GraphExpander};
pub use graph_pool::GraphPool;

use skua_core::traits::NodePool;
use skua_core::{NodeMemberPointer, NodeRef};

/// A directed graph with embedded xy coordinates and non-negative edge costs.
///
/// Each edge carries a `label` channel alongside its cost. Labels start out
/// unset (NaN) and are free for callers to use; [`Graph::perturb`] stashes
/// pre-edit costs there so heuristics can keep bounding searches on the
/// edited graph.
#[derive(Debug)]
pub struct Graph {
    xy: Vec<(i32, i32)>,
    edges: Vec<Vec<Edge>>,
}

/// An outgoing edge of a [`Graph`] node.
#[derive(Copy, Clone, Debug)]
pub struct Edge {
    pub to: u32,
    pub cost: f64,
    /// Caller-managed annotation; NaN when unset.
    pub label: f64,
}

impl Graph {
    pub fn new() -> Self {
        Graph {
            xy: vec![],
            edges: vec![],
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.xy.len()
    }

    /// Adds a node at `(x, y)` and returns its id.
    pub fn add_node(&mut self, x: i32, y: i32) -> u32 {
        assert!(self.xy.len() < u32::MAX as usize, "graph is full");
        let id = self.xy.len() as u32;
        self.xy.push((x, y));
        self.edges.push(vec![]);
        id
    }

    /// Adds a directed edge with an unset label.
    #[track_caller]
    pub fn add_edge(&mut self, from: u32, to: u32, cost: f64) {
        assert!((from as usize) < self.xy.len(), "edge endpoint out of range");
        assert!((to as usize) < self.xy.len(), "edge endpoint out of range");
        debug_assert!(cost >= 0.0, "negative edge cost");
        self.edges[from as usize].push(Edge {
            to,
            cost,
            label: f64::NAN,
        });
    }

    #[track_caller]
    pub fn get_xy(&self, node: u32) -> (i32, i32) {
        self.xy[node as usize]
    }

    /// The outgoing edges of `node`, in insertion order.
    #[track_caller]
    pub fn outgoing(&self, node: u32) -> &[Edge] {
        &self.edges[node as usize]
    }

    #[track_caller]
    pub fn outgoing_mut(&mut self, node: u32) -> &mut [Edge] {
        &mut self.edges[node as usize]
    }

    /// Builds the graph with every edge flipped.
    ///
    /// Costs and labels are carried over; edge ids are not preserved.
    pub fn reverse(&self) -> Graph {
        let mut edges = vec![vec![]; self.xy.len()];
        for (from, out) in self.edges.iter().enumerate() {
            for edge in out {
                edges[edge.to as usize].push(Edge {
                    to: from as u32,
                    cost: edge.cost,
                    label: edge.label,
                });
            }
        }
        Graph {
            xy: self.xy.clone(),
            edges,
        }
    }

    /// Applies runtime cost edits.
    ///
    /// Each `(from, to, cost)` edit rewrites the cost of every `from -> to`
    /// edge. The first time an edge is edited its original cost is stashed in
    /// the label channel; later edits keep that stash, so the label always
    /// holds the cost the graph was built with. Edits naming absent edges do
    /// nothing.
    #[track_caller]
    pub fn perturb(&mut self, edits: impl IntoIterator<Item = (u32, u32, f64)>) {
        for (from, to, cost) in edits {
            assert!((from as usize) < self.xy.len(), "edge endpoint out of range");
            debug_assert!(cost >= 0.0, "negative edge cost");
            for edge in &mut self.edges[from as usize] {
                if edge.to == to {
                    if edge.label.is_nan() {
                        edge.label = edge.cost;
                    }
                    edge.cost = cost;
                }
            }
        }
    }

    /// Serializes the graph in little-endian binary.
    ///
    /// Layout: node count, xy pairs, then per node an edge count followed by
    /// `(to, cost, label)` triples. Labels round-trip bit-exactly, so unset
    /// (NaN) labels survive.
    pub fn save(&self, to: &mut impl Write) -> io::Result<()> {
        to.write_all(&(self.xy.len() as u32).to_le_bytes())?;
        for &(x, y) in &self.xy {
            to.write_all(&x.to_le_bytes())?;
            to.write_all(&y.to_le_bytes())?;
        }
        for out in &self.edges {
            to.write_all(&(out.len() as u32).to_le_bytes())?;
            for edge in out {
                to.write_all(&edge.to.to_le_bytes())?;
                to.write_all(&edge.cost.to_le_bytes())?;
                to.write_all(&edge.label.to_le_bytes())?;
            }
        }
        Ok(())
    }

    /// Deserializes a graph written by [`Graph::save`].
    ///
    /// Out-of-range edge endpoints and non-finite or negative costs are
    /// reported as `InvalidData`.
    pub fn load(from: &mut impl Read) -> io::Result<Graph> {
        let num_nodes = read_u32(from)? as usize;
        let mut xy = Vec::with_capacity(num_nodes);
        for _ in 0..num_nodes {
            let x = read_i32(from)?;
            let y = read_i32(from)?;
            xy.push((x, y));
        }
        let mut edges = Vec::with_capacity(num_nodes);
        for _ in 0..num_nodes {
            let count = read_u32(from)? as usize;
            let mut out = Vec::with_capacity(count);
            for _ in 0..count {
                let to = read_u32(from)?;
                let cost = read_f64(from)?;
                let label = read_f64(from)?;
                if to as usize >= num_nodes {
                    return Err(invalid_data("edge endpoint out of range"));
                }
                if !(cost >= 0.0 && cost.is_finite()) {
                    return Err(invalid_data("edge cost out of range"));
                }
                out.push(Edge { to, cost, label });
            }
            edges.push(out);
        }
        Ok(Graph { xy, edges })
    }

    /// Bytes of memory in use by the graph.
    pub fn mem(&self) -> usize {
        self.xy.capacity() * std::mem::size_of::<(i32, i32)>()
            + self.edges.capacity() * std::mem::size_of::<Vec<Edge>>()
            + self
                .edges
                .iter()
                .map(|out| out.capacity() * std::mem::size_of::<Edge>())
                .sum::<usize>()
    }
}

impl Default for Graph {
    fn default() -> Self {
        Graph::new()
    }
}

/// Node pools which can generate nodes for graph ids.
///
/// # Safety
///
/// `generate_unchecked` must be sound for every id less than `num_ids`, and
/// `state_member` must belong to the pool's node layout.
pub unsafe trait GraphStateMapper: NodePool<State = u32> {
    fn num_ids(&self) -> usize;

    fn state_member(&self) -> NodeMemberPointer<u32>;

    /// Like [`NodePool::generate`], but skips the range check.
    ///
    /// # Safety
    ///
    /// `state` must be less than `num_ids`.
    unsafe fn generate_unchecked(&self, state: u32) -> NodeRef;
}

// SAFETY: hash pools accept any state, and the state member is the one the
// pool was constructed with.
unsafe impl GraphStateMapper for skua_core::HashPool<u32> {
    fn num_ids(&self) -> usize {
        usize::MAX
    }

    fn state_member(&self) -> NodeMemberPointer<u32> {
        skua_core::HashPool::state_member(self)
    }

    unsafe fn generate_unchecked(&self, state: u32) -> NodeRef {
        self.generate(state)
    }
}

/// Straight-line distance between two xy coordinates.
pub fn euclidean_distance((x1, y1): (i32, i32), (x2, y2): (i32, i32)) -> f64 {
    let dx = (x1 - x2) as f64;
    let dy = (y1 - y2) as f64;
    (dx * dx + dy * dy).sqrt()
}

const DEGREE_TO_RADIAN: f64 = 0.017453292519943295;
const EARTH_RADIUS: f64 = 6_371_009.0;

/// Great-circle distance in metres between two `(longitude, latitude)`
/// points given in degrees, on a sphere of mean earth radius.
pub fn haversine_distance((lon1, lat1): (f64, f64), (lon2, lat2): (f64, f64)) -> f64 {
    let lat1 = lat1 * DEGREE_TO_RADIAN;
    let lat2 = lat2 * DEGREE_TO_RADIAN;
    let dlat = (lat2 - lat1).abs();
    let dlon = (lon2 - lon1).abs() * DEGREE_TO_RADIAN;
    let a = 0.5 - dlat.cos() / 2.0 + lat1.cos() * lat2.cos() * (1.0 - dlon.cos()) / 2.0;
    2.0 * EARTH_RADIUS * a.sqrt().asin()
}

/// [`haversine_distance`] for coordinates stored as integer microdegrees,
/// the convention for road-network xy data.
pub fn haversine_distance_microdeg(a: (i32, i32), b: (i32, i32)) -> f64 {
    haversine_distance(
        (a.0 as f64 * 1e-6, a.1 as f64 * 1e-6),
        (b.0 as f64 * 1e-6, b.1 as f64 * 1e-6),
    )
}

fn invalid_data(msg: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

fn read_u32(from: &mut impl Read) -> io::Result<u32> {
    let mut bytes = [0; 4];
    from.read_exact(&mut bytes)?;
    Ok(u32::from_le_bytes(bytes))
}

fn read_i32(from: &mut impl Read) -> io::Result<i32> {
    let mut bytes = [0; 4];
    from.read_exact(&mut bytes)?;
    Ok(i32::from_le_bytes(bytes))
}

fn read_f64(from: &mut impl Read) -> io::Result<f64> {
    let mut bytes = [0; 8];
    from.read_exact(&mut bytes)?;
    Ok(f64::from_le_bytes(bytes))
}

#[cfg(test)]
fn two_triangles() -> Graph {
    // 0 -> 1 -> 2 -> 0, plus 0 -> 2.
    let mut graph = Graph::new();
    graph.add_node(0, 0);
    graph.add_node(3, 4);
    graph.add_node(3, 0);
    graph.add_edge(0, 1, 5.0);
    graph.add_edge(1, 2, 4.0);
    graph.add_edge(2, 0, 3.0);
    graph.add_edge(0, 2, 3.0);
    graph
}

#[test]
fn construction_accessors() {
    let graph = two_triangles();
    assert_eq!(graph.num_nodes(), 3);
    assert_eq!(graph.get_xy(1), (3, 4));
    let out: Vec<_> = graph.outgoing(0).iter().map(|e| (e.to, e.cost)).collect();
    assert_eq!(out, vec![(1, 5.0), (2, 3.0)]);
    assert!(graph.outgoing(0)[0].label.is_nan());
    assert!(graph.outgoing(1).len() == 1 && graph.outgoing(2).len() == 1);
}

#[test]
fn reverse_flips_every_edge() {
    let mut graph = two_triangles();
    graph.outgoing_mut(0)[0].label = 7.5;
    let rev = graph.reverse();
    assert_eq!(rev.num_nodes(), 3);
    let into_1: Vec<_> = rev.outgoing(1).iter().map(|e| (e.to, e.cost)).collect();
    assert_eq!(into_1, vec![(0, 5.0)]);
    assert_eq!(rev.outgoing(1)[0].label, 7.5);
    let mut into_2: Vec<_> = rev.outgoing(2).iter().map(|e| (e.to, e.cost)).collect();
    into_2.sort_by_key(|&(to, _)| to);
    assert_eq!(into_2, vec![(0, 3.0), (1, 4.0)]);
    assert_eq!(rev.outgoing(0)[0].to, 2);
}

#[test]
fn perturb_stashes_original_cost_once() {
    let mut graph = two_triangles();
    graph.perturb([(0, 1, 9.0)]);
    assert_eq!(graph.outgoing(0)[0].cost, 9.0);
    assert_eq!(graph.outgoing(0)[0].label, 5.0);
    graph.perturb([(0, 1, 11.0), (2, 1, 100.0)]);
    assert_eq!(graph.outgoing(0)[0].cost, 11.0);
    assert_eq!(graph.outgoing(0)[0].label, 5.0);
    // The absent 2 -> 1 edit changed nothing.
    assert_eq!(graph.outgoing(2)[0].to, 0);
    assert_eq!(graph.outgoing(2)[0].cost, 3.0);
}

#[test]
fn save_load_round_trip() {
    let mut graph = two_triangles();
    graph.outgoing_mut(1)[0].label = -2.25;
    let mut bytes = vec![];
    graph.save(&mut bytes).unwrap();
    let loaded = Graph::load(&mut &bytes[..]).unwrap();
    assert_eq!(loaded.num_nodes(), graph.num_nodes());
    for id in 0..graph.num_nodes() as u32 {
        assert_eq!(loaded.get_xy(id), graph.get_xy(id));
        assert_eq!(loaded.outgoing(id).len(), graph.outgoing(id).len());
        for (a, b) in loaded.outgoing(id).iter().zip(graph.outgoing(id)) {
            assert_eq!(a.to, b.to);
            assert_eq!(a.cost, b.cost);
            assert_eq!(a.label.to_bits(), b.label.to_bits());
        }
    }
}

#[test]
fn load_rejects_corrupt_bytes() {
    let graph = two_triangles();
    let mut bytes = vec![];
    graph.save(&mut bytes).unwrap();

    // First edge's `to` field follows the node count and 3 xy pairs and the
    // first edge count.
    let edge_start = 4 + 3 * 8 + 4;
    let mut bad = bytes.clone();
    bad[edge_start..edge_start + 4].copy_from_slice(&99u32.to_le_bytes());
    let err = Graph::load(&mut &bad[..]).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidData);

    let mut bad = bytes.clone();
    bad[edge_start + 4..edge_start + 12].copy_from_slice(&(-1.0f64).to_le_bytes());
    let err = Graph::load(&mut &bad[..]).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidData);

    bytes.truncate(bytes.len() - 3);
    assert!(Graph::load(&mut &bytes[..]).is_err());
}

#[test]
fn distances() {
    assert_eq!(euclidean_distance((0, 0), (3, 4)), 5.0);
    assert_eq!(euclidean_distance((2, 2), (2, 2)), 0.0);

    // One degree of longitude along the equator is R * pi / 180 metres.
    let d = haversine_distance((0.0, 0.0), (1.0, 0.0));
    assert!((d - 111_194.9266).abs() < 0.05);
    let d = haversine_distance_microdeg((0, 0), (1_000_000, 0));
    assert!((d - 111_194.9266).abs() < 0.05);
    assert_eq!(haversine_distance_microdeg((500, 300), (500, 300)), 0.0);
    // Symmetric.
    let a = (151_209_900, -33_865_143);
    let b = (144_963_100, -37_813_600);
    assert_eq!(
        haversine_distance_microdeg(a, b),
        haversine_distance_microdeg(b, a)
    );
}
