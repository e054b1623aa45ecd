use std::marker::PhantomData;
use std::time::Instant;

use skua_core::traits::{Cost, Expander, NodePool, OpenList, Successor};
use skua_core::{FieldComparator, NodeBuilder, NodeMemberPointer, NodeRef};

use crate::{
    Admissibility, BidirPolicy, NoReopen, ReopenPolicy, SearchMetrics, SearchParameters, Solution,
    WAdmissible, COST_MAX,
};

/// One direction of a bidirectional search: the pool, expander, open list,
/// and heuristic for that frontier, plus the field its states live in.
///
/// The backward frontier must operate on the reversed domain, and its
/// heuristic must estimate distance to the forward start.
pub struct Frontier<'a, P: NodePool, E, O, H> {
    pub pool: &'a P,
    pub expander: E,
    pub open: O,
    pub heuristic: H,
    pub state: NodeMemberPointer<P::State>,
}

#[derive(Clone, Copy)]
struct SideFields {
    g: NodeMemberPointer<f64>,
    h: NodeMemberPointer<f64>,
    f: NodeMemberPointer<f64>,
    expanded: NodeMemberPointer<bool>,
}

impl SideFields {
    fn new(builder: &mut NodeBuilder) -> Self {
        SideFields {
            g: builder.add_field(f64::INFINITY),
            h: builder.add_field(f64::NAN),
            f: builder.add_field(f64::INFINITY),
            expanded: builder.add_field(false),
        }
    }
}

/// Two coupled best-first searches meeting in the middle.
///
/// Each frontier has its own node layout, so the two directions are stitched
/// together through states: whenever a relaxation improves a node, the
/// opposite pool is probed for the same state, and the combined g-values form
/// a candidate solution. The search stops once the admissibility policy
/// accepts the best candidate against the coupling policy's lower bound; with
/// the default policies ([`WAdmissible`] at unit weight) the result is
/// optimal.
pub struct BidirSearcher<B, A = WAdmissible, R = NoReopen> {
    fwd: SideFields,
    bwd: SideFields,
    _policy: PhantomData<(B, A, R)>,
}

impl<B: BidirPolicy, A: Admissibility, R: ReopenPolicy> BidirSearcher<B, A, R> {
    pub fn new(forward: &mut NodeBuilder, backward: &mut NodeBuilder) -> Self {
        BidirSearcher {
            fwd: SideFields::new(forward),
            bwd: SideFields::new(backward),
            _policy: PhantomData,
        }
    }

    /// Comparator for the forward open list.
    pub fn forward_ordering(&self) -> impl FieldComparator {
        (self.fwd.f, self.fwd.h)
    }

    /// Comparator for the backward open list.
    pub fn backward_ordering(&self) -> impl FieldComparator {
        (self.bwd.f, self.bwd.h)
    }

    pub fn forward_g(&self) -> NodeMemberPointer<f64> {
        self.fwd.g
    }

    pub fn backward_g(&self) -> NodeMemberPointer<f64> {
        self.bwd.g
    }

    pub fn search<'f, 'b, S, PF, PB, EF, EB, OF, OB, HF, HB>(
        &mut self,
        mut forward: Frontier<'f, PF, EF, OF, HF>,
        mut backward: Frontier<'b, PB, EB, OB, HB>,
        start: S,
        target: S,
        params: &SearchParameters,
    ) -> Solution<S>
    where
        S: Copy + Eq + 'static,
        PF: NodePool<State = S>,
        PB: NodePool<State = S>,
        EF: Expander<'f>,
        EF::Edge: Successor<'f> + Cost,
        EB: Expander<'b>,
        EB::Edge: Successor<'b> + Cost,
        OF: OpenList<'f>,
        OB: OpenList<'b>,
        HF: FnMut(NodeRef<'f>) -> f64,
        HB: FnMut(NodeRef<'b>) -> f64,
    {
        assert!(params.weight >= 1.0, "suboptimality weight below 1");
        assert!(params.epsilon >= 0.0, "negative suboptimality epsilon");

        let timer = Instant::now();
        let mut metrics = SearchMetrics::default();
        let mut ub = COST_MAX;
        let mut meet = None;
        let mut forward_edges = vec![];
        let mut backward_edges = vec![];

        let root = forward.pool.generate(start);
        Self::init_root(root, self.fwd, &mut forward.heuristic);
        forward.open.relaxed(root);
        let root = backward.pool.generate(target);
        Self::init_root(root, self.bwd, &mut backward.heuristic);
        backward.open.relaxed(root);
        metrics.generated += 2;
        metrics.heap_ops += 2;

        // Covers start == target, where both roots share a state.
        if let Some(node) = backward.pool.get(start) {
            let candidate = node.get(self.bwd.g);
            if candidate < ub {
                ub = candidate;
                meet = Some(start);
            }
        }

        loop {
            metrics.time = timer.elapsed();
            if !B::solvable(forward.open.len(), backward.open.len()) {
                break;
            }
            let forward_best = forward.open.peek().map(|n| n.get(self.fwd.f));
            let backward_best = backward.open.peek().map(|n| n.get(self.bwd.f));
            let lb = B::lowerbound(forward_best, backward_best);
            if A::admissible(lb, ub, params) {
                break;
            }
            let expand_forward = match (forward_best, backward_best) {
                (Some(ff), Some(bf)) => ff <= bf,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };
            if expand_forward {
                expand_side(
                    &mut forward,
                    self.fwd,
                    backward.pool,
                    self.bwd.g,
                    &mut forward_edges,
                    &mut ub,
                    &mut meet,
                    &mut metrics,
                    R::ALLOWED,
                );
            } else {
                expand_side(
                    &mut backward,
                    self.bwd,
                    forward.pool,
                    self.fwd.g,
                    &mut backward_edges,
                    &mut ub,
                    &mut meet,
                    &mut metrics,
                    R::ALLOWED,
                );
            }
        }

        metrics.time = timer.elapsed();
        metrics.surplus = metrics
            .generated
            .saturating_sub(metrics.expanded - metrics.reopened);

        let (Some(meet), Some(forward_meet)) = (meet, meet.and_then(|s| forward.pool.get(s)))
        else {
            return Solution::failure(metrics);
        };
        let Some(backward_meet) = backward.pool.get(meet) else {
            return Solution::failure(metrics);
        };

        let mut path = vec![];
        let mut node = Some(forward_meet);
        while let Some(n) = node {
            path.push(n.get(forward.state));
            node = n.get_parent();
        }
        path.reverse();
        let mut node = backward_meet.get_parent();
        while let Some(n) = node {
            path.push(n.get(backward.state));
            node = n.get_parent();
        }
        Solution {
            path,
            cost: ub,
            metrics,
        }
    }

    fn init_root<'a>(
        root: NodeRef<'a>,
        fields: SideFields,
        heuristic: &mut impl FnMut(NodeRef<'a>) -> f64,
    ) {
        root.set(fields.g, 0.0);
        let h = heuristic(root);
        root.set(fields.h, h);
        root.set(fields.f, h);
    }
}

#[allow(clippy::too_many_arguments)]
fn expand_side<'a, S, P, PO, E, O, H>(
    frontier: &mut Frontier<'a, P, E, O, H>,
    fields: SideFields,
    other_pool: &PO,
    other_g: NodeMemberPointer<f64>,
    edges: &mut Vec<E::Edge>,
    ub: &mut f64,
    meet: &mut Option<S>,
    metrics: &mut SearchMetrics,
    reopen: bool,
) where
    S: Copy + 'static,
    P: NodePool<State = S>,
    PO: NodePool<State = S>,
    E: Expander<'a>,
    E::Edge: Successor<'a> + Cost,
    O: OpenList<'a>,
    H: FnMut(NodeRef<'a>) -> f64,
{
    let Some(node) = frontier.open.next() else {
        return;
    };
    metrics.heap_ops += 1;
    if node.get(fields.expanded) {
        metrics.reopened += 1;
    }
    node.set(fields.expanded, true);
    metrics.expanded += 1;

    edges.clear();
    frontier.expander.expand(node, edges);
    let node_g = node.get(fields.g);
    for edge in edges.iter() {
        metrics.touched += 1;
        let successor = edge.successor();
        let new_g = node_g + edge.cost();
        if new_g < successor.get(fields.g) {
            if successor.get(fields.expanded) && !reopen {
                continue;
            }
            let mut successor_h = successor.get(fields.h);
            if successor_h.is_nan() {
                successor_h = (frontier.heuristic)(successor);
                successor.set(fields.h, successor_h);
                metrics.generated += 1;
            }
            successor.set(fields.g, new_g);
            successor.set(fields.f, new_g + successor_h);
            successor.set_parent(Some(node));
            frontier.open.relaxed(successor);
            metrics.heap_ops += 1;

            let state = successor.get(frontier.state);
            if let Some(other) = other_pool.get(state) {
                let candidate = new_g + other.get(other_g);
                if candidate < *ub {
                    *ub = candidate;
                    *meet = Some(state);
                }
            }
        }
    }
}
