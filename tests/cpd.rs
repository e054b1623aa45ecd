use rand::prelude::*;
use rand_pcg::Pcg64;
use skua::cpd::{CpdHeuristic, GraphCpd};
use skua::graph::{Graph, GraphExpander, GraphPool};
use skua::search::{SearchParameters, Searcher};
use skua::{NodeBuilder, PriorityQueueFactory};

/// Connected undirected graph with integer costs, so distance sums are exact.
fn random_graph(rng: &mut Pcg64, nodes: u32, extra: u32) -> Graph {
    let mut graph = Graph::new();
    for _ in 0..nodes {
        graph.add_node(rng.gen_range(0..100), rng.gen_range(0..100));
    }
    for node in 1..nodes {
        let anchor = rng.gen_range(0..node);
        let cost = rng.gen_range(1..12) as f64;
        graph.add_edge(node, anchor, cost);
        graph.add_edge(anchor, node, cost);
    }
    for _ in 0..extra {
        let a = rng.gen_range(0..nodes);
        let b = rng.gen_range(0..nodes);
        if a != b {
            let cost = rng.gen_range(1..12) as f64;
            graph.add_edge(a, b, cost);
            graph.add_edge(b, a, cost);
        }
    }
    graph
}

/// Runs Dijkstra to exhaustion and reads the settled distances back out of
/// the node pool.
fn distances_from(graph: &Graph, source: u32) -> Vec<f64> {
    let mut builder = NodeBuilder::new();
    let state = builder.add_field(u32::MAX);
    let mut searcher: Searcher = Searcher::new(&mut builder);
    let mut queues = PriorityQueueFactory::new(&mut builder);
    let pool = GraphPool::new(builder.build(), state, graph.num_nodes());
    searcher.search(
        GraphExpander::new(graph, &pool),
        queues.new_queue(searcher.ordering()),
        |_| 0.0,
        |_| false,
        pool.generate(source),
        state,
        &SearchParameters::default(),
    );
    (0..graph.num_nodes() as u32)
        .map(|node| {
            pool.get(node)
                .map_or(f64::INFINITY, |node| node.get(searcher.g()))
        })
        .collect()
}

fn all_distances(graph: &Graph) -> Vec<Vec<f64>> {
    (0..graph.num_nodes() as u32)
        .map(|source| distances_from(graph, source))
        .collect()
}

/// Stashes every edge's current cost in its label channel without changing
/// any cost.
fn label_all_edges(graph: &mut Graph) {
    let mut identity = vec![];
    for from in 0..graph.num_nodes() as u32 {
        for edge in graph.outgoing(from) {
            identity.push((from, edge.to, edge.cost));
        }
    }
    graph.perturb(identity);
}

#[test]
fn first_moves_step_down_the_true_distances() {
    let mut rng = Pcg64::seed_from_u64(0xc9d);
    let mut graph = random_graph(&mut rng, 26, 20);
    let island = graph.add_node(99, 99);
    let distance = all_distances(&graph);
    let cpd = GraphCpd::compute(&graph, |_, _, _| {});
    for source in 0..graph.num_nodes() as u32 {
        for target in 0..graph.num_nodes() as u32 {
            let d = distance[source as usize][target as usize];
            match cpd.get_first_move(source, target) {
                Some(edge_id) => {
                    let edge = graph.outgoing(source)[edge_id];
                    assert_eq!(
                        edge.cost + distance[edge.to as usize][target as usize],
                        d,
                        "{source} -> {target}"
                    );
                }
                None => {
                    assert!(source == target || d.is_infinite(), "{source} -> {target}");
                }
            }
        }
    }
    assert_eq!(cpd.get_first_move(0, island), None);
    assert_eq!(cpd.get_first_move(island, 0), None);
}

#[test]
fn oracle_serialization_round_trips() {
    let mut rng = Pcg64::seed_from_u64(0x5e1a);
    let graph = random_graph(&mut rng, 22, 15);
    let cpd = GraphCpd::compute(&graph, |_, _, _| {});
    let mut bytes = vec![];
    cpd.save(&mut bytes).unwrap();
    let loaded = GraphCpd::load(&mut &bytes[..]).unwrap();
    assert!(loaded == cpd);
    for source in 0..graph.num_nodes() as u32 {
        for target in 0..graph.num_nodes() as u32 {
            assert_eq!(
                loaded.get_first_move(source, target),
                cpd.get_first_move(source, target)
            );
        }
    }
}

#[test]
fn chunked_builds_merge_into_the_parallel_result() {
    let mut rng = Pcg64::seed_from_u64(0xb01d);
    let graph = random_graph(&mut rng, 24, 18);
    let full = GraphCpd::compute(&graph, |_, _, _| {});
    let mut merged = GraphCpd::compute_range(&graph, 0..9, |_, _, _| {});
    merged += GraphCpd::compute_range(&graph, 9..17, |_, _, _| {});
    merged += GraphCpd::compute_range(&graph, 17..24, |_, _, _| {});
    assert!(merged == full);
    for source in [0u32, 8, 16, 23] {
        for target in 0..graph.num_nodes() as u32 {
            assert_eq!(
                merged.get_first_move(source, target),
                full.get_first_move(source, target)
            );
        }
    }
}

#[test]
fn heuristic_bounds_unperturbed_distances_exactly() {
    let mut rng = Pcg64::seed_from_u64(0x60d);
    let graph = random_graph(&mut rng, 20, 14);
    let distance = all_distances(&graph);
    let cpd = GraphCpd::compute(&graph, |_, _, _| {});
    let mut heuristic = CpdHeuristic::new(&graph, &cpd);
    for source in 0..20u32 {
        for target in 0..20u32 {
            let d = distance[source as usize][target as usize];
            assert_eq!(heuristic.h(source, target), d, "{source} -> {target}");
            assert_eq!(heuristic.ub(source, target), d, "{source} -> {target}");
        }
    }
}

#[test]
fn perturbed_graphs_keep_the_bounds_admissible() {
    let mut rng = Pcg64::seed_from_u64(0xd1f);
    let mut graph = random_graph(&mut rng, 20, 14);
    let cpd = GraphCpd::compute(&graph, |_, _, _| {});

    label_all_edges(&mut graph);
    for _ in 0..6 {
        let from = rng.gen_range(0..20u32);
        if let Some(edge) = graph.outgoing(from).first().copied() {
            graph.perturb([
                (from, edge.to, edge.cost * 3.0),
                (edge.to, from, edge.cost * 3.0),
            ]);
        }
    }

    let perturbed = all_distances(&graph);
    let mut heuristic = CpdHeuristic::new(&graph, &cpd);
    heuristic.labels_are_lower_bounds();
    for source in 0..20u32 {
        for target in 0..20u32 {
            let d = perturbed[source as usize][target as usize];
            let lb = heuristic.h(source, target);
            let ub = heuristic.ub(source, target);
            assert!(lb <= d + 1e-9, "{source} -> {target}: {lb} > {d}");
            assert!(ub + 1e-9 >= d, "{source} -> {target}: {ub} < {d}");
        }
    }
}

#[test]
fn the_heuristic_guides_search_to_optimal_paths() {
    let mut rng = Pcg64::seed_from_u64(0xfa57);
    let mut graph = random_graph(&mut rng, 16, 10);
    let cpd = GraphCpd::compute(&graph, |_, _, _| {});

    label_all_edges(&mut graph);
    for _ in 0..5 {
        let from = rng.gen_range(0..16u32);
        if let Some(edge) = graph.outgoing(from).first().copied() {
            graph.perturb([
                (from, edge.to, edge.cost * 4.0),
                (edge.to, from, edge.cost * 4.0),
            ]);
        }
    }

    let perturbed = all_distances(&graph);
    let mut heuristic = CpdHeuristic::new(&graph, &cpd);
    heuristic.labels_are_lower_bounds();

    let mut builder = NodeBuilder::new();
    let state = builder.add_field(u32::MAX);
    let mut searcher: Searcher = Searcher::new(&mut builder);
    let mut queues = PriorityQueueFactory::new(&mut builder);
    let mut pool = GraphPool::new(builder.build(), state, graph.num_nodes());
    for source in 0..16u32 {
        for target in [3u32, 11] {
            pool.reset();
            let solution = searcher.search(
                GraphExpander::new(&graph, &pool),
                queues.new_queue(searcher.ordering()),
                |node| heuristic.h(node.get(state), target),
                |node| node.get(state) == target,
                pool.generate(source),
                state,
                &SearchParameters::default(),
            );
            assert_eq!(
                solution.cost,
                perturbed[source as usize][target as usize],
                "{source} -> {target}"
            );
        }
    }
}
