mod astar;
mod bidir;
mod metrics;
mod policy;
mod solution;

pub use astar::Searcher;
pub use bidir::{BidirSearcher, Frontier};
pub use metrics::SearchMetrics;
pub use policy::{
    Admissibility, AnySolution, BidirDijkstra, BidirExhaustive, BidirHeuristic, BidirPolicy,
    EpsAdmissible, Feasibility, NoReopen, Reopen, ReopenPolicy, SearchParameters, UntilCutoff,
    UntilExhaustion, WAdmissible,
};
pub use solution::{Solution, COST_MAX};
