use skua_core::traits::Expander;
use skua_core::NodeRef;

use crate::{BitGrid, Direction, GridEdge, GridStateMapper};

/// Expander for the 8-connected grid graph.
///
/// Diagonal moves are allowed only when both adjacent orthogonal cells are
/// traversable, so paths never cut corners.
pub struct EightConnectedExpander<'a, P> {
    map: &'a BitGrid,
    node_pool: &'a P,
}

impl<'a, P: GridStateMapper> EightConnectedExpander<'a, P> {
    pub fn new(map: &'a BitGrid, node_pool: &'a P) -> Self {
        assert!(node_pool.width() >= map.width(), "node pool too small");
        assert!(node_pool.height() >= map.height(), "node pool too small");
        EightConnectedExpander { map, node_pool }
    }
}

impl<'a, P: GridStateMapper> Expander<'a> for EightConnectedExpander<'a, P> {
    type Edge = GridEdge<'a>;

    fn expand(&mut self, node: NodeRef<'a>, edges: &mut Vec<GridEdge<'a>>) {
        let (x, y) = node.get(self.node_pool.state_member());
        debug_assert!(self.map.get(x, y), "expanded untraversable node");

        // SAFETY: all probed cells are within one step of an in-bounds cell,
        // and cells that test traversable are in-bounds for the pool.
        unsafe {
            let north = self.map.get_unchecked(x, y - 1);
            let west = self.map.get_unchecked(x - 1, y);
            let south = self.map.get_unchecked(x, y + 1);
            let east = self.map.get_unchecked(x + 1, y);
            let mut push = |x, y, cost, direction| {
                edges.push(GridEdge {
                    successor: self.node_pool.generate_unchecked((x, y)),
                    cost,
                    direction,
                });
            };
            if north {
                push(x, y - 1, 1.0, Direction::North);
            }
            if west {
                push(x - 1, y, 1.0, Direction::West);
            }
            if south {
                push(x, y + 1, 1.0, Direction::South);
            }
            if east {
                push(x + 1, y, 1.0, Direction::East);
            }
            if north && west && self.map.get_unchecked(x - 1, y - 1) {
                push(x - 1, y - 1, std::f64::consts::SQRT_2, Direction::NorthWest);
            }
            if west && south && self.map.get_unchecked(x - 1, y + 1) {
                push(x - 1, y + 1, std::f64::consts::SQRT_2, Direction::SouthWest);
            }
            if south && east && self.map.get_unchecked(x + 1, y + 1) {
                push(x + 1, y + 1, std::f64::consts::SQRT_2, Direction::SouthEast);
            }
            if east && north && self.map.get_unchecked(x + 1, y - 1) {
                push(x + 1, y - 1, std::f64::consts::SQRT_2, Direction::NorthEast);
            }
        }
    }
}
