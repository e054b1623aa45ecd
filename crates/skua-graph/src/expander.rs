use skua_core::traits::{Cost, EdgeId, Expander, Successor};
use skua_core::NodeRef;

use crate::{Graph, GraphStateMapper};

/// Expander yielding the outgoing edges of a graph node.
pub struct GraphExpander<'a, P> {
    graph: &'a Graph,
    node_pool: &'a P,
}

/// An expanded graph edge; `edge_id` is the edge's index in the originating
/// node's outgoing list.
pub struct GraphEdge<'a> {
    pub successor: NodeRef<'a>,
    pub cost: f64,
    pub edge_id: usize,
}

impl<'a, P: GraphStateMapper> GraphExpander<'a, P> {
    pub fn new(graph: &'a Graph, node_pool: &'a P) -> Self {
        assert!(graph.num_nodes() <= node_pool.num_ids(), "node pool too small");
        GraphExpander { graph, node_pool }
    }
}

impl<'a, P: GraphStateMapper> Expander<'a> for GraphExpander<'a, P> {
    type Edge = GraphEdge<'a>;

    fn expand(&mut self, node: NodeRef<'a>, edges: &mut Vec<GraphEdge<'a>>) {
        let id = node.get(self.node_pool.state_member());
        // Ids outside the graph have no outgoing edges.
        if id as usize >= self.graph.num_nodes() {
            return;
        }
        for (edge_id, edge) in self.graph.outgoing(id).iter().enumerate() {
            // SAFETY: edge endpoints were range-checked when they were added,
            // and the pool covers every id in the graph.
            let successor = unsafe { self.node_pool.generate_unchecked(edge.to) };
            edges.push(GraphEdge {
                successor,
                cost: edge.cost,
                edge_id,
            });
        }
    }
}

impl<'a> Successor<'a> for GraphEdge<'a> {
    fn successor(&self) -> NodeRef<'a> {
        self.successor
    }
}

impl Cost for GraphEdge<'_> {
    fn cost(&self) -> f64 {
        self.cost
    }
}

impl EdgeId for GraphEdge<'_> {
    fn edge_id(&self) -> usize {
        self.edge_id
    }
}

#[test]
fn expands_outgoing_edges() {
    let graph = crate::two_triangles();
    let mut builder = skua_core::NodeBuilder::new();
    let state = builder.add_field(u32::MAX);
    let pool = crate::GraphPool::new(builder.build(), state, graph.num_nodes());
    let mut expander = GraphExpander::new(&graph, &pool);

    let mut edges = vec![];
    expander.expand(pool.generate(0), &mut edges);
    let got: Vec<_> = edges
        .iter()
        .map(|e| (e.successor.get(state), e.cost, e.edge_id))
        .collect();
    assert_eq!(got, vec![(1, 5.0, 0), (2, 3.0, 1)]);

    edges.clear();
    expander.expand(pool.generate(1), &mut edges);
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].successor.get(state), 2);
}

#[test]
fn out_of_range_id_expands_to_nothing() {
    let graph = crate::two_triangles();
    let mut builder = skua_core::NodeBuilder::new();
    let state = builder.add_field(u32::MAX);
    let pool = skua_core::HashPool::new(builder.build(), state);
    let mut expander = GraphExpander::new(&graph, &pool);

    let mut edges = vec![];
    expander.expand(pool.generate(250), &mut edges);
    assert!(edges.is_empty());
}
