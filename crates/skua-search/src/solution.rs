use crate::SearchMetrics;

/// Cost reported for targets no search could reach.
pub const COST_MAX: f64 = f64::INFINITY;

/// The outcome of a search: the path found, its cost, and the effort metrics
/// of the run.
///
/// A failed search is represented by an empty path with cost [`COST_MAX`];
/// the metrics still describe the work done before giving up.
#[derive(Clone, Debug)]
pub struct Solution<S> {
    pub path: Vec<S>,
    pub cost: f64,
    pub metrics: SearchMetrics,
}

impl<S> Solution<S> {
    pub fn failure(metrics: SearchMetrics) -> Self {
        Solution {
            path: vec![],
            cost: COST_MAX,
            metrics,
        }
    }

    /// Whether the search produced a path.
    pub fn found(&self) -> bool {
        !self.path.is_empty()
    }
}
