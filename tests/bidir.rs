use rand::prelude::*;
use rand_pcg::Pcg64;
use skua::graph::{euclidean_distance, Graph, GraphExpander, GraphPool};
use skua::search::{
    BidirDijkstra, BidirExhaustive, BidirHeuristic, BidirPolicy, BidirSearcher, Frontier,
    SearchParameters, Searcher, Solution, COST_MAX,
};
use skua::{NodeBuilder, NodeRef, PriorityQueueFactory};

fn connect(graph: &mut Graph, rng: &mut Pcg64, a: u32, b: u32, euclidean_costs: bool) {
    let cost = if euclidean_costs {
        euclidean_distance(graph.get_xy(a), graph.get_xy(b)).ceil() + rng.gen_range(0..3) as f64
    } else {
        rng.gen_range(1..10) as f64
    };
    graph.add_edge(a, b, cost);
    graph.add_edge(b, a, cost);
}

/// Connected undirected graph: a random spanning tree plus `extra` chords.
/// With `euclidean_costs`, costs dominate the straight-line distance between
/// the endpoints, which keeps the euclidean heuristic admissible.
fn random_graph(rng: &mut Pcg64, nodes: u32, extra: u32, euclidean_costs: bool) -> Graph {
    let mut graph = Graph::new();
    for _ in 0..nodes {
        graph.add_node(rng.gen_range(0..50), rng.gen_range(0..50));
    }
    for node in 1..nodes {
        let anchor = rng.gen_range(0..node);
        connect(&mut graph, rng, node, anchor, euclidean_costs);
    }
    for _ in 0..extra {
        let a = rng.gen_range(0..nodes);
        let b = rng.gen_range(0..nodes);
        if a != b {
            connect(&mut graph, rng, a, b, euclidean_costs);
        }
    }
    graph
}

fn unidirectional(graph: &Graph, start: u32, target: u32) -> Solution<u32> {
    let mut builder = NodeBuilder::new();
    let state = builder.add_field(u32::MAX);
    let mut searcher: Searcher = Searcher::new(&mut builder);
    let mut queues = PriorityQueueFactory::new(&mut builder);
    let pool = GraphPool::new(builder.build(), state, graph.num_nodes());
    searcher.search(
        GraphExpander::new(graph, &pool),
        queues.new_queue(searcher.ordering()),
        |_| 0.0,
        |node| node.get(state) == target,
        pool.generate(start),
        state,
        &SearchParameters::default(),
    )
}

fn bidirectional<B: BidirPolicy>(
    graph: &Graph,
    reverse: &Graph,
    mut forward_h: impl FnMut(u32) -> f64,
    mut backward_h: impl FnMut(u32) -> f64,
    start: u32,
    target: u32,
) -> Solution<u32> {
    let mut fwd_builder = NodeBuilder::new();
    let fwd_state = fwd_builder.add_field(u32::MAX);
    let mut bwd_builder = NodeBuilder::new();
    let bwd_state = bwd_builder.add_field(u32::MAX);
    let mut searcher = BidirSearcher::<B>::new(&mut fwd_builder, &mut bwd_builder);
    let mut fwd_queues = PriorityQueueFactory::new(&mut fwd_builder);
    let mut bwd_queues = PriorityQueueFactory::new(&mut bwd_builder);
    let fwd_pool = GraphPool::new(fwd_builder.build(), fwd_state, graph.num_nodes());
    let bwd_pool = GraphPool::new(bwd_builder.build(), bwd_state, graph.num_nodes());
    searcher.search(
        Frontier {
            pool: &fwd_pool,
            expander: GraphExpander::new(graph, &fwd_pool),
            open: fwd_queues.new_queue(searcher.forward_ordering()),
            heuristic: |node: NodeRef| forward_h(node.get(fwd_state)),
            state: fwd_state,
        },
        Frontier {
            pool: &bwd_pool,
            expander: GraphExpander::new(reverse, &bwd_pool),
            open: bwd_queues.new_queue(searcher.backward_ordering()),
            heuristic: |node: NodeRef| backward_h(node.get(bwd_state)),
            state: bwd_state,
        },
        start,
        target,
        &SearchParameters::default(),
    )
}

/// The stitched path must be a real edge chain whose costs add up to the
/// reported cost.
fn assert_path_matches(graph: &Graph, solution: &Solution<u32>, start: u32, target: u32) {
    assert!(solution.found());
    assert_eq!(*solution.path.first().unwrap(), start);
    assert_eq!(*solution.path.last().unwrap(), target);
    let mut total = 0.0;
    for pair in solution.path.windows(2) {
        let step = graph
            .outgoing(pair[0])
            .iter()
            .filter(|edge| edge.to == pair[1])
            .map(|edge| edge.cost)
            .fold(f64::INFINITY, f64::min);
        assert!(step.is_finite(), "no edge {} -> {}", pair[0], pair[1]);
        total += step;
    }
    assert_eq!(total, solution.cost);
}

#[test]
fn dijkstra_coupling_matches_unidirectional() {
    let mut rng = Pcg64::seed_from_u64(0x5eed);
    let graph = random_graph(&mut rng, 30, 25, false);
    let reverse = graph.reverse();
    for start in 0..30u32 {
        for target in (0..30u32).step_by(3) {
            let uni = unidirectional(&graph, start, target);
            let bidir =
                bidirectional::<BidirDijkstra>(&graph, &reverse, |_| 0.0, |_| 0.0, start, target);
            assert_eq!(uni.cost, bidir.cost, "{start} -> {target}");
            assert_path_matches(&graph, &bidir, start, target);
        }
    }
}

#[test]
fn heuristic_frontiers_match_unidirectional() {
    let mut rng = Pcg64::seed_from_u64(0xca11);
    let graph = random_graph(&mut rng, 30, 25, true);
    let reverse = graph.reverse();
    for start in (0..30u32).step_by(2) {
        for target in (1..30u32).step_by(3) {
            let uni = unidirectional(&graph, start, target);
            let start_xy = graph.get_xy(start);
            let target_xy = graph.get_xy(target);
            let bidir = bidirectional::<BidirHeuristic>(
                &graph,
                &reverse,
                |s| euclidean_distance(graph.get_xy(s), target_xy),
                |s| euclidean_distance(graph.get_xy(s), start_xy),
                start,
                target,
            );
            assert_eq!(uni.cost, bidir.cost, "{start} -> {target}");
            assert_path_matches(&graph, &bidir, start, target);
        }
    }
}

#[test]
fn exhaustive_coupling_matches_unidirectional() {
    let mut rng = Pcg64::seed_from_u64(0xe4ab);
    let graph = random_graph(&mut rng, 24, 18, false);
    let reverse = graph.reverse();
    for start in (0..24u32).step_by(2) {
        for target in (0..24u32).step_by(5) {
            let uni = unidirectional(&graph, start, target);
            let bidir =
                bidirectional::<BidirExhaustive>(&graph, &reverse, |_| 0.0, |_| 0.0, start, target);
            assert_eq!(uni.cost, bidir.cost, "{start} -> {target}");
        }
    }
}

#[test]
fn disconnected_pairs_fail_in_both_directions() {
    // Two disjoint chains.
    let mut graph = Graph::new();
    for i in 0..6 {
        graph.add_node(i, 0);
    }
    for (a, b) in [(0u32, 1u32), (1, 2), (3, 4), (4, 5)] {
        graph.add_edge(a, b, 1.0);
        graph.add_edge(b, a, 1.0);
    }
    let reverse = graph.reverse();

    let uni = unidirectional(&graph, 0, 5);
    assert!(!uni.found());

    let bidir = bidirectional::<BidirDijkstra>(&graph, &reverse, |_| 0.0, |_| 0.0, 0, 5);
    assert!(!bidir.found());
    assert_eq!(bidir.cost, COST_MAX);
    assert!(bidir.path.is_empty());

    let bidir = bidirectional::<BidirExhaustive>(&graph, &reverse, |_| 0.0, |_| 0.0, 0, 5);
    assert!(!bidir.found());
}

#[test]
fn meeting_at_the_start_state() {
    let mut rng = Pcg64::seed_from_u64(7);
    let graph = random_graph(&mut rng, 10, 5, false);
    let reverse = graph.reverse();
    for target in [0u32, 4, 9] {
        let solution =
            bidirectional::<BidirDijkstra>(&graph, &reverse, |_| 0.0, |_| 0.0, target, target);
        assert_eq!(solution.cost, 0.0);
        assert_eq!(solution.path, vec![target]);
    }
}
