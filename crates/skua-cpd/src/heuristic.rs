use skua_graph::Graph;

use crate::{GraphCpd, FIRST_MOVE_NONE};

/// Distance bounds and moves derived from a CPD's first-move chains.
///
/// Walking the chain from `start` to `target` and summing edge values along
/// it yields a lower bound `h` and an upper bound `ub` on the distance; every
/// node on the chain caches its bounds, tagged with the target they were
/// computed for, so repeated queries against one target amortize to a few
/// lookups.
///
/// The oracle must cover the whole graph. Targets whose row is missing are
/// treated as unreachable and bound by [`f64::INFINITY`].
///
/// Edge labels change what is summed. By default an edge contributes its
/// cost to both bounds, except that a set (non-NaN) label replaces the cost
/// in the upper bound. In lower-bound label mode
/// ([`CpdHeuristic::labels_are_lower_bounds`]) the label instead replaces
/// the cost in the lower bound and must be set on every edge walked; this is
/// the mode for graphs perturbed with [`Graph::perturb`], whose labels hold
/// the original costs. The lower-bound contribution is additionally scaled
/// by `hscale`.
pub struct CpdHeuristic<'a> {
    graph: &'a Graph,
    cpd: &'a GraphCpd,
    hscale: f64,
    label_as_lb: bool,
    cache: Vec<CacheEntry>,
}

#[derive(Copy, Clone)]
struct CacheEntry {
    lb: f64,
    ub: f64,
    next: u32,
    target: u32,
}

const NO_TARGET: u32 = u32::MAX;

impl<'a> CpdHeuristic<'a> {
    pub fn new(graph: &'a Graph, cpd: &'a GraphCpd) -> Self {
        assert!(
            graph.num_nodes() == cpd.num_nodes(),
            "cpd built for a different graph"
        );
        CpdHeuristic {
            graph,
            cpd,
            hscale: 1.0,
            label_as_lb: false,
            cache: vec![
                CacheEntry {
                    lb: 0.0,
                    ub: 0.0,
                    next: FIRST_MOVE_NONE as u32,
                    target: NO_TARGET,
                };
                graph.num_nodes()
            ],
        }
    }

    /// Scales every per-edge lower-bound contribution by `hscale`.
    ///
    /// Values above 1 trade admissibility for search speed.
    pub fn set_hscale(&mut self, hscale: f64) {
        assert!(hscale > 0.0, "hscale must be positive");
        self.hscale = hscale;
        self.invalidate();
    }

    /// Switches to lower-bound label mode; see the type docs.
    pub fn labels_are_lower_bounds(&mut self) {
        self.label_as_lb = true;
        self.invalidate();
    }

    /// Lower bound on the distance from `start` to `target`.
    pub fn h(&mut self, start: u32, target: u32) -> f64 {
        if start == target {
            return 0.0;
        }
        self.ensure(start, target);
        self.cache[start as usize].lb
    }

    /// Upper bound on the distance from `start` to `target`.
    pub fn ub(&mut self, start: u32, target: u32) -> f64 {
        if start == target {
            return 0.0;
        }
        self.ensure(start, target);
        self.cache[start as usize].ub
    }

    /// The first move of the walked chain, or None when `start == target` or
    /// no chain exists.
    pub fn get_move(&mut self, start: u32, target: u32) -> Option<usize> {
        if start == target {
            return None;
        }
        self.ensure(start, target);
        let next = self.cache[start as usize].next;
        (next != FIRST_MOVE_NONE as u32).then_some(next as usize)
    }

    /// Bytes of memory in use by the cache.
    pub fn mem(&self) -> usize {
        self.cache.capacity() * std::mem::size_of::<CacheEntry>()
    }

    /// Walks the first-move chain from `start` until it hits the target, a
    /// node already cached for this target, or a dead end, then unwinds the
    /// visited chain accumulating bounds into the cache.
    fn ensure(&mut self, start: u32, target: u32) {
        if self.cache[start as usize].target == target {
            return;
        }

        let mut stack = vec![];
        let mut node = start;
        let (mut lb, mut ub);
        loop {
            if node == target {
                lb = 0.0;
                ub = 0.0;
                break;
            }
            let entry = self.cache[node as usize];
            if entry.target == target {
                lb = entry.lb;
                ub = entry.ub;
                break;
            }
            match self.cpd.get_first_move(node, target) {
                Some(edge_id) => {
                    stack.push((node, edge_id as u32));
                    node = self.graph.outgoing(node)[edge_id].to;
                }
                None => {
                    lb = f64::INFINITY;
                    ub = f64::INFINITY;
                    self.cache[node as usize] = CacheEntry {
                        lb,
                        ub,
                        next: FIRST_MOVE_NONE as u32,
                        target,
                    };
                    break;
                }
            }
        }

        for &(node, edge_id) in stack.iter().rev() {
            let edge = self.graph.outgoing(node)[edge_id as usize];
            if self.label_as_lb {
                assert!(
                    !edge.label.is_nan(),
                    "edge without a label in lower-bound label mode"
                );
                lb += edge.label * self.hscale;
                ub += edge.cost;
            } else {
                lb += edge.cost * self.hscale;
                ub += if edge.label.is_nan() { edge.cost } else { edge.label };
            }
            self.cache[node as usize] = CacheEntry {
                lb,
                ub,
                next: edge_id,
                target,
            };
        }
    }

    fn invalidate(&mut self) {
        for entry in &mut self.cache {
            entry.target = NO_TARGET;
        }
    }
}

#[cfg(test)]
fn line_graph(costs: &[f64]) -> Graph {
    let mut graph = Graph::new();
    for i in 0..=costs.len() {
        graph.add_node(i as i32, 0);
    }
    for (i, &cost) in costs.iter().enumerate() {
        graph.add_edge(i as u32, i as u32 + 1, cost);
        graph.add_edge(i as u32 + 1, i as u32, cost);
    }
    graph
}

#[test]
fn bounds_along_a_chain() {
    let graph = line_graph(&[1.0, 1.0]);
    let cpd = GraphCpd::compute(&graph, |_, _, _| {});
    let mut heuristic = CpdHeuristic::new(&graph, &cpd);

    assert_eq!(heuristic.h(0, 2), 2.0);
    assert_eq!(heuristic.ub(0, 2), 2.0);
    assert_eq!(heuristic.get_move(0, 2), Some(0));
    // The walk populated the intermediate node too.
    assert_eq!(heuristic.h(1, 2), 1.0);
    assert_eq!(heuristic.h(2, 2), 0.0);
    assert_eq!(heuristic.get_move(2, 2), None);
    // Walking backwards uses 1's other edge.
    assert_eq!(heuristic.h(2, 0), 2.0);
    assert_eq!(heuristic.get_move(1, 0), Some(0));
}

#[test]
fn unreachable_targets_are_unbounded() {
    let mut graph = line_graph(&[1.0]);
    graph.add_node(9, 9);
    let cpd = GraphCpd::compute(&graph, |_, _, _| {});
    let mut heuristic = CpdHeuristic::new(&graph, &cpd);

    assert_eq!(heuristic.h(0, 2), f64::INFINITY);
    assert_eq!(heuristic.ub(0, 2), f64::INFINITY);
    assert_eq!(heuristic.get_move(0, 2), None);
}

#[test]
fn perturbed_costs_split_the_bounds() {
    let mut graph = line_graph(&[2.0, 3.0]);
    let cpd = GraphCpd::compute(&graph, |_, _, _| {});
    // Raising costs stashes the originals (2.0 and 3.0) in the labels.
    graph.perturb([(0, 1, 5.0), (1, 0, 5.0), (1, 2, 4.0), (2, 1, 4.0)]);
    let mut heuristic = CpdHeuristic::new(&graph, &cpd);
    heuristic.labels_are_lower_bounds();

    // lb sums the stashed originals; ub sums the edited costs.
    assert_eq!(heuristic.h(0, 2), 5.0);
    assert_eq!(heuristic.ub(0, 2), 9.0);
    assert_eq!(heuristic.get_move(0, 2), Some(0));
}

#[test]
#[should_panic(expected = "edge without a label")]
fn lower_bound_mode_requires_labels() {
    let graph = line_graph(&[1.0, 1.0]);
    let cpd = GraphCpd::compute(&graph, |_, _, _| {});
    let mut heuristic = CpdHeuristic::new(&graph, &cpd);
    heuristic.labels_are_lower_bounds();
    heuristic.h(0, 2);
}

#[test]
fn hscale_scales_only_the_lower_bound() {
    let graph = line_graph(&[2.0, 3.0]);
    let cpd = GraphCpd::compute(&graph, |_, _, _| {});
    let mut heuristic = CpdHeuristic::new(&graph, &cpd);
    assert_eq!(heuristic.h(0, 2), 5.0);
    heuristic.set_hscale(2.0);
    assert_eq!(heuristic.h(0, 2), 10.0);
    assert_eq!(heuristic.ub(0, 2), 5.0);
}
