pub use skua_core::*;
pub use skua_cpd as cpd;
pub use skua_graph as graph;
pub use skua_grid as grid;
pub use skua_jps as jps;
pub use skua_search as search;
pub use skua_wjps as wjps;
