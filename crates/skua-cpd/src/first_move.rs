use skua_core::traits::{Cost, EdgeId, Expander, OpenList, Successor};
use skua_core::{NodeBuilder, NodeMemberPointer, NodeRef};

/// Dijkstra search which tracks, for every settled node, the set of first
/// moves out of the start that begin an optimal path to it.
///
/// Tied paths are detected by exact `==` on g values and union their move
/// sets. Ties discovered after a node has already been settled are not
/// propagated further.
pub struct FirstMoveSearcher {
    first_move: NodeMemberPointer<u64>,
    g: NodeMemberPointer<f64>,
}

impl FirstMoveSearcher {
    pub fn new(builder: &mut NodeBuilder) -> Self {
        FirstMoveSearcher {
            first_move: builder.add_field(0),
            g: builder.add_field(f64::INFINITY),
        }
    }

    /// The g field registered by this searcher; order open lists by it.
    pub fn g(&self) -> NodeMemberPointer<f64> {
        self.g
    }

    /// Runs the search from `start`, reporting `(node, first_moves)` for
    /// every other reachable node in nondecreasing g order.
    pub fn search<'a, Exp, Edge, Open>(
        &mut self,
        start: NodeRef<'a>,
        mut expander: Exp,
        mut open: Open,
        mut found: impl FnMut(NodeRef<'a>, u64),
    ) where
        Exp: Expander<'a, Edge = Edge>,
        Edge: Successor<'a> + Cost + EdgeId,
        Open: OpenList<'a>,
    {
        let FirstMoveSearcher { first_move, g } = *self;

        start.set(g, 0.0);

        // The start node's successors seed the move sets; everything after
        // that only propagates and unions them.
        let mut edges = vec![];
        expander.expand(start, &mut edges);
        for edge in &edges {
            let successor = edge.successor();
            let edge_id = edge.edge_id();
            assert!(
                edge_id < 63,
                "edge id {edge_id} out of range for first-move sets"
            );
            let new_g = edge.cost();
            if new_g < successor.get(g) {
                successor.set(g, new_g);
                successor.set(first_move, 1 << edge_id);
                successor.set_parent(Some(start));
                open.relaxed(successor);
            } else if new_g == successor.get(g) {
                successor.set(first_move, successor.get(first_move) | 1 << edge_id);
            }
        }

        while let Some(node) = open.next() {
            found(node, node.get(first_move));
            edges.clear();
            expander.expand(node, &mut edges);

            let node_g = node.get(g);
            let node_first_move = node.get(first_move);

            for edge in &edges {
                let successor = edge.successor();
                let new_g = edge.cost() + node_g;
                if new_g < successor.get(g) {
                    successor.set(g, new_g);
                    successor.set(first_move, node_first_move);
                    successor.set_parent(Some(node));
                    open.relaxed(successor);
                } else if new_g == successor.get(g) {
                    successor.set(first_move, successor.get(first_move) | node_first_move);
                }
            }
        }
    }
}

#[cfg(test)]
fn run_search(graph: &skua_graph::Graph, start: u32) -> Vec<u64> {
    use skua_graph::{GraphExpander, GraphPool};

    let mut builder = NodeBuilder::new();
    let state = builder.add_field(u32::MAX);
    let mut searcher = FirstMoveSearcher::new(&mut builder);
    let mut queues = skua_core::PriorityQueueFactory::new(&mut builder);
    let pool = GraphPool::new(builder.build(), state, graph.num_nodes());

    let mut first_moves = vec![0; graph.num_nodes()];
    searcher.search(
        pool.generate(start),
        GraphExpander::new(graph, &pool),
        queues.new_queue(searcher.g()),
        |node, fm| first_moves[node.get(state) as usize] = fm,
    );
    first_moves
}

#[test]
fn moves_propagate_down_the_path() {
    // 0 -> 1 -> 2 -> 3 with a direct slower 0 -> 2.
    let mut graph = skua_graph::Graph::new();
    for _ in 0..4 {
        graph.add_node(0, 0);
    }
    graph.add_edge(0, 1, 1.0); // edge 0 of node 0
    graph.add_edge(0, 2, 5.0); // edge 1 of node 0
    graph.add_edge(1, 2, 1.0);
    graph.add_edge(2, 3, 1.0);

    let first_moves = run_search(&graph, 0);
    assert_eq!(first_moves[0], 0, "start is not reported");
    assert_eq!(first_moves[1], 1 << 0);
    assert_eq!(first_moves[2], 1 << 0, "the direct edge is not optimal");
    assert_eq!(first_moves[3], 1 << 0);
}

#[test]
fn tied_paths_union_their_moves() {
    // Diamond: 0 -> 1 -> 3 and 0 -> 2 -> 3 with equal costs.
    let mut graph = skua_graph::Graph::new();
    for _ in 0..4 {
        graph.add_node(0, 0);
    }
    graph.add_edge(0, 1, 1.0);
    graph.add_edge(0, 2, 1.0);
    graph.add_edge(1, 3, 1.0);
    graph.add_edge(2, 3, 1.0);

    let first_moves = run_search(&graph, 0);
    assert_eq!(first_moves[1], 1 << 0);
    assert_eq!(first_moves[2], 1 << 1);
    assert_eq!(first_moves[3], 1 << 0 | 1 << 1);
}

#[test]
fn unreached_nodes_keep_empty_sets() {
    let mut graph = skua_graph::Graph::new();
    for _ in 0..3 {
        graph.add_node(0, 0);
    }
    graph.add_edge(0, 1, 1.0);

    let first_moves = run_search(&graph, 0);
    assert_eq!(first_moves[2], 0);
}
