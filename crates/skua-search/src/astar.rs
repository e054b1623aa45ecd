use std::marker::PhantomData;
use std::time::Instant;

use skua_core::traits::{Cost, Expander, OpenList, Successor};
use skua_core::{FieldComparator, NodeBuilder, NodeMemberPointer, NodeRef};

use crate::{
    Admissibility, AnySolution, Feasibility, NoReopen, ReopenPolicy, SearchMetrics,
    SearchParameters, Solution, UntilExhaustion, COST_MAX,
};

/// Best-first search over a single frontier.
///
/// The admissibility, feasibility, and reopening rules are fixed at the type
/// level; everything else (domain, heuristic, node pool, queue) is supplied
/// per search. With the default policies this is plain optimal A*.
///
/// Target nodes are never expanded. When one is popped it becomes the
/// incumbent solution, and the search continues until the admissibility
/// policy accepts the incumbent against the best queued f-value.
pub struct Searcher<A = AnySolution, F = UntilExhaustion, R = NoReopen> {
    g: NodeMemberPointer<f64>,
    h: NodeMemberPointer<f64>,
    f: NodeMemberPointer<f64>,
    expanded: NodeMemberPointer<bool>,
    _policy: PhantomData<(A, F, R)>,
}

impl<A: Admissibility, F: Feasibility, R: ReopenPolicy> Searcher<A, F, R> {
    pub fn new(builder: &mut NodeBuilder) -> Self {
        Searcher {
            g: builder.add_field(f64::INFINITY),
            // h is computed lazily; NaN marks it unset.
            h: builder.add_field(f64::NAN),
            f: builder.add_field(f64::INFINITY),
            expanded: builder.add_field(false),
            _policy: PhantomData,
        }
    }

    /// The field holding each node's cost from the start.
    pub fn g(&self) -> NodeMemberPointer<f64> {
        self.g
    }

    /// Comparator ordering nodes by f-value, preferring larger g on ties.
    pub fn ordering(&self) -> impl FieldComparator {
        (self.f, self.h)
    }

    /// Runs the search from `start`, reading each node's state out of
    /// `state` to build the returned path.
    pub fn search<'a, S, E, O>(
        &mut self,
        mut expander: E,
        mut open: O,
        mut heuristic: impl FnMut(NodeRef<'a>) -> f64,
        mut goal_test: impl FnMut(NodeRef<'a>) -> bool,
        start: NodeRef<'a>,
        state: NodeMemberPointer<S>,
        params: &SearchParameters,
    ) -> Solution<S>
    where
        S: Copy + 'static,
        E: Expander<'a>,
        E::Edge: Successor<'a> + Cost,
        O: OpenList<'a>,
    {
        assert!(params.weight >= 1.0, "suboptimality weight below 1");
        assert!(params.epsilon >= 0.0, "negative suboptimality epsilon");

        let timer = Instant::now();
        let mut metrics = SearchMetrics::default();
        let mut incumbent = None;
        let mut ub = COST_MAX;
        let mut edges = vec![];

        start.set(self.g, 0.0);
        let start_h = heuristic(start);
        start.set(self.h, start_h);
        start.set(self.f, start_h);
        open.relaxed(start);
        metrics.generated += 1;
        metrics.heap_ops += 1;

        while let Some(best) = open.peek() {
            metrics.time = timer.elapsed();
            let lb = best.get(self.f);
            if !F::feasible(lb, &metrics, params) {
                break;
            }
            if A::admissible(lb, ub, params) {
                break;
            }
            let Some(node) = open.next() else { break };
            metrics.heap_ops += 1;

            if goal_test(node) {
                let node_g = node.get(self.g);
                if node_g < ub {
                    ub = node_g;
                    incumbent = Some(node);
                }
                continue;
            }

            if node.get(self.expanded) {
                metrics.reopened += 1;
            }
            node.set(self.expanded, true);
            metrics.expanded += 1;

            edges.clear();
            expander.expand(node, &mut edges);
            let node_g = node.get(self.g);
            for edge in &edges {
                metrics.touched += 1;
                let successor = edge.successor();
                let new_g = node_g + edge.cost();
                if new_g < successor.get(self.g) {
                    if successor.get(self.expanded) && !R::ALLOWED {
                        continue;
                    }
                    let mut successor_h = successor.get(self.h);
                    if successor_h.is_nan() {
                        successor_h = heuristic(successor);
                        successor.set(self.h, successor_h);
                        metrics.generated += 1;
                    }
                    successor.set(self.g, new_g);
                    successor.set(self.f, new_g + successor_h);
                    successor.set_parent(Some(node));
                    open.relaxed(successor);
                    metrics.heap_ops += 1;
                }
            }
        }

        metrics.time = timer.elapsed();
        metrics.surplus = metrics
            .generated
            .saturating_sub(metrics.expanded - metrics.reopened);

        match incumbent {
            Some(end) => {
                let mut path = vec![];
                let mut node = Some(end);
                while let Some(n) = node {
                    path.push(n.get(state));
                    node = n.get_parent();
                }
                path.reverse();
                Solution {
                    path,
                    cost: ub,
                    metrics,
                }
            }
            None => Solution::failure(metrics),
        }
    }
}
