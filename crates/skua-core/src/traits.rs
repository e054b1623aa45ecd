use crate::node::NodeRef;

/// Generates the successors of a node.
pub trait Expander<'a> {
    type Edge: 'a;

    /// Appends the successor edges of `node` to `edges`.
    ///
    /// `edges` is not cleared first; the caller owns the buffer.
    fn expand(&mut self, node: NodeRef<'a>, edges: &mut Vec<Self::Edge>);
}

/// Edges which designate the node they lead to.
pub trait Successor<'a> {
    fn successor(&self) -> NodeRef<'a>;
}

/// Edges with a traversal cost.
pub trait Cost {
    fn cost(&self) -> f64;
}

/// Edges which know their position in the originating node's edge list.
pub trait EdgeId {
    fn edge_id(&self) -> usize;
}

/// A successor node along with the cost of reaching it.
pub struct WeightedEdge<'a> {
    pub successor: NodeRef<'a>,
    pub cost: f64,
}

impl<'a> Successor<'a> for WeightedEdge<'a> {
    fn successor(&self) -> NodeRef<'a> {
        self.successor
    }
}

impl Cost for WeightedEdge<'_> {
    fn cost(&self) -> f64 {
        self.cost
    }
}

/// Maps states to search nodes, one node per state per search.
///
/// `generate` hands out the node for a state, allocating and initializing it
/// to the layout defaults the first time the state is seen in the current
/// search. `get` only reports nodes already generated since the last `reset`;
/// nodes from earlier searches are never visible.
pub trait NodePool {
    type State: Copy;

    /// Starts a new search, invalidating all previously generated nodes.
    fn reset(&mut self);

    /// Returns the node for `state`, allocating it if necessary.
    fn generate(&self, state: Self::State) -> NodeRef;

    /// Returns the node for `state` if it was generated in this search.
    fn get(&self, state: Self::State) -> Option<NodeRef>;
}

/// Order in which a search visits relaxed nodes.
pub trait OpenList<'a> {
    /// Records that `node`'s key improved, queueing it if necessary.
    fn relaxed(&mut self, node: NodeRef<'a>);

    /// Removes and returns the best queued node.
    fn next(&mut self) -> Option<NodeRef<'a>>;

    /// Returns the best queued node without removing it.
    fn peek(&self) -> Option<NodeRef<'a>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
