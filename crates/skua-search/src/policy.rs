use std::time::Duration;

use crate::{SearchMetrics, COST_MAX};

/// Per-search tuning knobs consulted by the termination policies.
///
/// The defaults leave every cutoff disabled and request a true optimal
/// solution (unit weight, zero epsilon).
#[derive(Clone, Copy, Debug)]
pub struct SearchParameters {
    /// Suboptimality factor accepted by [`WAdmissible`]. Must be at least 1.
    pub weight: f64,
    /// Additive suboptimality accepted by [`EpsAdmissible`]. Must be
    /// non-negative.
    pub epsilon: f64,
    /// [`UntilCutoff`] stops once the best f-value exceeds this.
    pub cost_cutoff: f64,
    /// [`UntilCutoff`] stops once this many nodes have been expanded.
    pub expansion_cutoff: u64,
    /// [`UntilCutoff`] stops once this much time has elapsed.
    pub time_cutoff: Duration,
}

impl Default for SearchParameters {
    fn default() -> Self {
        SearchParameters {
            weight: 1.0,
            epsilon: 0.0,
            cost_cutoff: COST_MAX,
            expansion_cutoff: u64::MAX,
            time_cutoff: Duration::MAX,
        }
    }
}

/// Decides when the best solution found so far is good enough to return.
///
/// `lb` is the smallest f-value still queued (the lower bound on any future
/// solution) and `ub` is the cost of the incumbent solution, [`COST_MAX`] if
/// none has been found yet.
pub trait Admissibility {
    fn admissible(lb: f64, ub: f64, params: &SearchParameters) -> bool;
}

/// Accept the first complete solution.
///
/// Because nodes leave the open list in f-order, with an admissible heuristic
/// this still yields the optimal solution in unidirectional search.
pub struct AnySolution;

impl Admissibility for AnySolution {
    fn admissible(_lb: f64, ub: f64, _params: &SearchParameters) -> bool {
        ub != COST_MAX
    }
}

/// Accept a solution within a multiplicative factor `weight` of optimal.
pub struct WAdmissible;

impl Admissibility for WAdmissible {
    fn admissible(lb: f64, ub: f64, params: &SearchParameters) -> bool {
        ub <= params.weight * lb
    }
}

/// Accept a solution within an additive `epsilon` of optimal.
pub struct EpsAdmissible;

impl Admissibility for EpsAdmissible {
    fn admissible(lb: f64, ub: f64, params: &SearchParameters) -> bool {
        ub <= lb + params.epsilon
    }
}

/// Decides whether the search may keep expanding nodes.
///
/// Checked once per expansion against the best queued f-value, so a cutoff
/// takes effect with single-expansion granularity.
pub trait Feasibility {
    fn feasible(best_f: f64, metrics: &SearchMetrics, params: &SearchParameters) -> bool;
}

/// Search until the open list runs dry.
pub struct UntilExhaustion;

impl Feasibility for UntilExhaustion {
    fn feasible(_best_f: f64, _metrics: &SearchMetrics, _params: &SearchParameters) -> bool {
        true
    }
}

/// Search until any of the cost, expansion, or time cutoffs trips.
pub struct UntilCutoff;

impl Feasibility for UntilCutoff {
    fn feasible(best_f: f64, metrics: &SearchMetrics, params: &SearchParameters) -> bool {
        best_f <= params.cost_cutoff
            && metrics.expanded < params.expansion_cutoff
            && metrics.time <= params.time_cutoff
    }
}

/// Whether nodes which were already expanded may be expanded again when a
/// cheaper path to them is found. Irrelevant with consistent heuristics;
/// without one, reopening trades extra expansions for optimality.
pub trait ReopenPolicy {
    const ALLOWED: bool;
}

pub struct Reopen;

impl ReopenPolicy for Reopen {
    const ALLOWED: bool = true;
}

pub struct NoReopen;

impl ReopenPolicy for NoReopen {
    const ALLOWED: bool = false;
}

/// Frontier coupling rules for bidirectional search.
pub trait BidirPolicy {
    /// Lower bound on the cost of any solution not yet discovered, from the
    /// best queued f-values of the two frontiers.
    fn lowerbound(forward_best: Option<f64>, backward_best: Option<f64>) -> f64;

    /// Whether the search can still make progress given the two open list
    /// sizes.
    fn solvable(forward_len: usize, backward_len: usize) -> bool;
}

/// Frontiers guided by admissible heuristics: either frontier's best f-value
/// bounds the remaining solutions, and both must be non-empty to continue.
pub struct BidirHeuristic;

impl BidirPolicy for BidirHeuristic {
    fn lowerbound(forward_best: Option<f64>, backward_best: Option<f64>) -> f64 {
        f64::min(
            forward_best.unwrap_or(COST_MAX),
            backward_best.unwrap_or(COST_MAX),
        )
    }

    fn solvable(forward_len: usize, backward_len: usize) -> bool {
        forward_len > 0 && backward_len > 0
    }
}

/// Heuristic-free frontiers: any undiscovered solution must extend both, so
/// the bound is the sum of the two best g-values.
pub struct BidirDijkstra;

impl BidirPolicy for BidirDijkstra {
    fn lowerbound(forward_best: Option<f64>, backward_best: Option<f64>) -> f64 {
        debug_assert!(
            forward_best.is_some() && backward_best.is_some(),
            "sum lower bound needs both frontiers non-empty"
        );
        forward_best.unwrap_or(COST_MAX) + backward_best.unwrap_or(COST_MAX)
    }

    fn solvable(forward_len: usize, backward_len: usize) -> bool {
        forward_len > 0 && backward_len > 0
    }
}

/// Hierarchy-style frontiers where all shortest paths are up-down: one
/// frontier may run dry while the other still has work to do.
pub struct BidirExhaustive;

impl BidirPolicy for BidirExhaustive {
    fn lowerbound(forward_best: Option<f64>, backward_best: Option<f64>) -> f64 {
        f64::min(
            forward_best.unwrap_or(COST_MAX),
            backward_best.unwrap_or(COST_MAX),
        )
    }

    fn solvable(forward_len: usize, backward_len: usize) -> bool {
        forward_len > 0 || backward_len > 0
    }
}
