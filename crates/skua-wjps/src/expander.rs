use enumset::EnumSet;
use skua_core::traits::{Expander, NodePool, WeightedEdge};
use skua_core::{NodeMemberPointer, NodeRef};
use skua_grid::{Direction, Grid, GridStateMapper};

use crate::{NbCache, WeightedGrid};

#[derive(Clone, Copy)]
struct JumpSlot {
    version: u32,
    stop: i32,
    cost: f64,
}

struct CellExtra {
    stamp: u64,
    prospective_g: f64,
    prospective_parent: (i32, i32),
    moving_direction: Option<Direction>,
    successors: EnumSet<Direction>,
    successor_version: u32,
    /// Successor set per entry direction; all-set marks an unfilled slot.
    successor_sets: [EnumSet<Direction>; 8],
    /// Cached straight jumps, indexed west, east, north, south.
    jump_cache: [JumpSlot; 4],
}

/// Per-map caches for weighted jump point search.
///
/// Holds the neighborhood cache along with per-cell state: the successor set
/// for each entry direction, the stop and cost of the straight jump through
/// the cell in each orthogonal direction, and the prospective-parent
/// bookkeeping that prunes dominated moves during a search.
///
/// The prospective fields are per-search, reset lazily by a search number
/// stamp. The successor sets and jump caches persist across searches and
/// validate against the map's row and column versions, so terrain edits
/// invalidate exactly the cells whose neighborhoods they touch.
pub struct WjpsCaches {
    nbcache: NbCache,
    cells: Grid<CellExtra>,
    search_number: u64,
}

impl WjpsCaches {
    pub fn new(map: &WeightedGrid, nbcache: NbCache) -> Self {
        WjpsCaches {
            nbcache,
            cells: Grid::new(map.width(), map.height(), |_, _| CellExtra {
                stamp: 0,
                prospective_g: f64::INFINITY,
                prospective_parent: (0, 0),
                moving_direction: None,
                successors: EnumSet::empty(),
                successor_version: 0,
                successor_sets: [EnumSet::all(); 8],
                jump_cache: [JumpSlot {
                    version: 0,
                    stop: 0,
                    cost: 0.0,
                }; 4],
            }),
            search_number: 1,
        }
    }

    /// Bytes of memory in use by the caches.
    pub fn mem(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.cells.storage().len() * std::mem::size_of::<CellExtra>()
            + self.nbcache.mem()
    }

    fn begin_search(&mut self) {
        match self.search_number.checked_add(1) {
            Some(next) => self.search_number = next,
            None => {
                // The stamp wrapped; wipe every cell so none can collide
                // with a recycled search number.
                for cell in self.cells.storage_mut() {
                    cell.stamp = 0;
                }
                self.search_number = 1;
            }
        }
    }

    fn get_extra(&mut self, x: i32, y: i32) -> &mut CellExtra {
        let search_number = self.search_number;
        let extra = &mut self.cells[(x, y)];
        if extra.stamp != search_number {
            extra.stamp = search_number;
            extra.prospective_g = f64::INFINITY;
            extra.prospective_parent = (0, 0);
            extra.moving_direction = None;
            extra.successors = EnumSet::empty();
        }
        extra
    }

    fn successor_set(
        &mut self,
        map: &WeightedGrid,
        x: i32,
        y: i32,
        going: Direction,
    ) -> EnumSet<Direction> {
        let guard = map.row_version(y).wrapping_add(map.col_version(x));
        let cell = &mut self.cells[(x, y)];
        if cell.successor_version != guard {
            cell.successor_sets = [EnumSet::all(); 8];
            cell.successor_version = guard;
        }
        let slot = &mut cell.successor_sets[going as usize];
        if *slot == EnumSet::all() {
            // Real sets never have all eight bits, since no move continues
            // backwards.
            *slot = self.nbcache.successors(map, x, y, going);
        }
        *slot
    }
}

/// Jump point search expander for weighted grid maps.
///
/// Straight moves jump through locally uniform stretches in one step, with
/// the stop and accumulated cost of each stride cached per cell. While a
/// node's successors are generated, every cell they pass through records the
/// best prospective parent seen so far; arrivals dominated by a cheaper or
/// equally cheap path from elsewhere prune the dominated direction from its
/// parent's successor set before it is ever expanded.
///
/// Carlson, M., Moghadam, S. K., Harabor, D. D., Stuckey, P. J., & Ebrahimi,
/// M. (2023). Optimal pathfinding on weighted grid maps. In Proceedings of
/// the AAAI Conference on Artificial Intelligence (Vol. 37, pp. 12373-12380).
pub struct WjpsExpander<'a, P> {
    map: &'a WeightedGrid,
    caches: &'a mut WjpsCaches,
    node_pool: &'a P,
    g: NodeMemberPointer<f64>,
    target: (i32, i32),
}

impl<'a, P: GridStateMapper> WjpsExpander<'a, P> {
    /// Prepares one search from `start` to `target`, seeding the start
    /// cell's successor set from its raw traversable neighbors.
    pub fn new(
        map: &'a WeightedGrid,
        caches: &'a mut WjpsCaches,
        node_pool: &'a P,
        g: NodeMemberPointer<f64>,
        start: (i32, i32),
        target: (i32, i32),
    ) -> Self {
        assert!(node_pool.width() >= map.width(), "node pool too small");
        assert!(node_pool.height() >= map.height(), "node pool too small");
        assert!(
            caches.cells.width() == map.width() && caches.cells.height() == map.height(),
            "caches built for a different map"
        );
        assert!(
            g.layout_id() == node_pool.state_member().layout_id(),
            "mismatched layouts"
        );
        assert!(map.traversable(start.0, start.1), "untraversable start");
        assert!(map.traversable(target.0, target.1), "untraversable target");
        let mut expander = WjpsExpander {
            map,
            caches,
            node_pool,
            g,
            target,
        };
        expander.caches.begin_search();
        expander.seed_start(start);
        expander
    }

    fn seed_start(&mut self, start: (i32, i32)) {
        let (x, y) = start;
        let north = self.map.traversable(x, y - 1);
        let south = self.map.traversable(x, y + 1);
        let west = self.map.traversable(x - 1, y);
        let east = self.map.traversable(x + 1, y);
        if north {
            self.caches.get_extra(x, y).successors |= Direction::North;
            self.prospect(start, (x, y - 1), Direction::North, self.map.vertical_cost(x, y - 1));
            if east && self.map.traversable(x + 1, y - 1) {
                self.caches.get_extra(x, y).successors |= Direction::NorthEast;
                self.prospect(
                    start,
                    (x + 1, y - 1),
                    Direction::NorthEast,
                    self.map.diagonal_cost(x, y - 1),
                );
            }
            if west && self.map.traversable(x - 1, y - 1) {
                self.caches.get_extra(x, y).successors |= Direction::NorthWest;
                self.prospect(
                    start,
                    (x - 1, y - 1),
                    Direction::NorthWest,
                    self.map.diagonal_cost(x - 1, y - 1),
                );
            }
        }
        if south {
            self.caches.get_extra(x, y).successors |= Direction::South;
            self.prospect(start, (x, y + 1), Direction::South, self.map.vertical_cost(x, y));
            if east && self.map.traversable(x + 1, y + 1) {
                self.caches.get_extra(x, y).successors |= Direction::SouthEast;
                self.prospect(
                    start,
                    (x + 1, y + 1),
                    Direction::SouthEast,
                    self.map.diagonal_cost(x, y),
                );
            }
            if west && self.map.traversable(x - 1, y + 1) {
                self.caches.get_extra(x, y).successors |= Direction::SouthWest;
                self.prospect(
                    start,
                    (x - 1, y + 1),
                    Direction::SouthWest,
                    self.map.diagonal_cost(x - 1, y),
                );
            }
        }
        if east {
            self.caches.get_extra(x, y).successors |= Direction::East;
            self.prospect(start, (x + 1, y), Direction::East, self.map.horizontal_cost(x, y));
        }
        if west {
            self.caches.get_extra(x, y).successors |= Direction::West;
            self.prospect(start, (x - 1, y), Direction::West, self.map.horizontal_cost(x - 1, y));
        }
    }

    fn successors(&mut self, x: i32, y: i32) -> EnumSet<Direction> {
        self.caches.get_extra(x, y).successors
    }

    /// Marks `to` as reached by a move in `direction` costing `g` in total.
    ///
    /// The first arrival claims the cell: its successor set is filled in and
    /// each member direction is prospected so competing parents can fight
    /// over the onward cells. Arrivals tieing the node's settled g keep only
    /// the successors both parents agree on.
    fn reach(&mut self, from: (i32, i32), to: (i32, i32), direction: Direction, g: f64) {
        let node_g = self.node_pool.generate(to).get(self.g);
        if g < node_g {
            let successors = self.caches.successor_set(self.map, to.0, to.1, direction);
            let extra = self.caches.get_extra(to.0, to.1);
            extra.prospective_g = g;
            extra.prospective_parent = from;
            extra.moving_direction = Some(direction);
            extra.successors = successors;
            for dir in successors {
                let (dx, dy) = dir.vector();
                let step = self.step_cost(to.0, to.1, dir);
                self.prospect(to, (to.0 + dx, to.1 + dy), dir, g + step);
            }
        } else if g == node_g {
            let successors = self.caches.successor_set(self.map, to.0, to.1, direction);
            self.caches.get_extra(to.0, to.1).successors &= successors;
        }
    }

    /// Offers `to` a prospective parent. The better arrival keeps the cell,
    /// with ties preferring straight moves over diagonal ones; the loser's
    /// direction is pruned from its parent's successor set.
    fn prospect(&mut self, from: (i32, i32), to: (i32, i32), direction: Direction, g: f64) {
        let extra = self.caches.get_extra(to.0, to.1);
        let preferred = !direction.is_diagonal()
            && extra.moving_direction.map_or(false, |dir| dir.is_diagonal());
        if g < extra.prospective_g || g == extra.prospective_g && preferred {
            let old_parent = extra.prospective_parent;
            let old_direction = extra.moving_direction;
            extra.prospective_g = g;
            extra.prospective_parent = from;
            extra.moving_direction = Some(direction);
            if old_parent != from {
                if let Some(old) = old_direction {
                    self.caches.get_extra(old_parent.0, old_parent.1).successors -= old;
                }
            }
        } else {
            self.caches.get_extra(from.0, from.1).successors -= direction;
        }
    }

    fn step_cost(&self, x: i32, y: i32, dir: Direction) -> f64 {
        match dir {
            Direction::North => self.map.vertical_cost(x, y - 1),
            Direction::South => self.map.vertical_cost(x, y),
            Direction::West => self.map.horizontal_cost(x - 1, y),
            Direction::East => self.map.horizontal_cost(x, y),
            Direction::NorthWest => self.map.diagonal_cost(x - 1, y - 1),
            Direction::NorthEast => self.map.diagonal_cost(x, y - 1),
            Direction::SouthWest => self.map.diagonal_cost(x - 1, y),
            Direction::SouthEast => self.map.diagonal_cost(x, y),
        }
    }

    fn diagonal_step<const DX: i32, const DY: i32>(&self, x: i32, y: i32) -> f64 {
        self.map.diagonal_cost(x + DX.min(0), y + DY.min(0))
    }

    fn jump_x<const DX: i32>(
        &mut self,
        edges: &mut Vec<WeightedEdge<'a>>,
        from: (i32, i32),
        x: i32,
        y: i32,
        g: f64,
        cost: f64,
    ) {
        let slot = if DX < 0 { 0 } else { 1 };
        let dir = if DX < 0 { Direction::West } else { Direction::East };
        let version = self.map.row_version(y);
        if self.caches.cells[(x, y)].jump_cache[slot].version != version {
            self.calculate_jump_x::<DX>(x, y, slot, version);
        }
        let cached = self.caches.cells[(x, y)].jump_cache[slot];
        let mut stop = cached.stop;
        let mut cost = cost + cached.cost;
        if y == self.target.1 && strictly_between::<DX>(x, stop, self.target.0) {
            // The jump overshoots the target; stop there instead.
            let overshoot = self.caches.cells[(self.target.0, y)].jump_cache[slot];
            debug_assert!(overshoot.version == version);
            stop = self.target.0;
            cost -= overshoot.cost;
        }
        if (stop, y) == self.target || !self.caches.successor_set(self.map, stop, y, dir).is_empty()
        {
            // SAFETY: jumps stop on traversable cells of the map, which the
            // node pool was checked to cover.
            let successor = unsafe { self.node_pool.generate_unchecked((stop, y)) };
            edges.push(WeightedEdge { successor, cost });
            self.reach(from, (stop, y), dir, g + cost);
        }
    }

    fn jump_y<const DY: i32>(
        &mut self,
        edges: &mut Vec<WeightedEdge<'a>>,
        from: (i32, i32),
        x: i32,
        y: i32,
        g: f64,
        cost: f64,
    ) {
        let slot = if DY < 0 { 2 } else { 3 };
        let dir = if DY < 0 { Direction::North } else { Direction::South };
        let version = self.map.col_version(x);
        if self.caches.cells[(x, y)].jump_cache[slot].version != version {
            self.calculate_jump_y::<DY>(x, y, slot, version);
        }
        let cached = self.caches.cells[(x, y)].jump_cache[slot];
        let mut stop = cached.stop;
        let mut cost = cost + cached.cost;
        if x == self.target.0 && strictly_between::<DY>(y, stop, self.target.1) {
            // The jump overshoots the target; stop there instead.
            let overshoot = self.caches.cells[(x, self.target.1)].jump_cache[slot];
            debug_assert!(overshoot.version == version);
            stop = self.target.1;
            cost -= overshoot.cost;
        }
        if (x, stop) == self.target || !self.caches.successor_set(self.map, x, stop, dir).is_empty()
        {
            // SAFETY: jumps stop on traversable cells of the map, which the
            // node pool was checked to cover.
            let successor = unsafe { self.node_pool.generate_unchecked((x, stop)) };
            edges.push(WeightedEdge { successor, cost });
            self.reach(from, (x, stop), dir, g + cost);
        }
    }

    /// Walks from `x`, `y` until local uniformity breaks or a cell with a
    /// valid cached jump is found, then writes the stop and cumulative cost
    /// into every cell walked over on the way back.
    fn calculate_jump_x<const DX: i32>(&mut self, x: i32, y: i32, slot: usize, version: u32) {
        let mut steps = 0;
        let mut cx = x;
        let (stop, mut cost) = loop {
            steps += 1;
            cx += DX;
            if !self.map.locally_uniform(cx, y) {
                break (cx, 0.0);
            }
            let cached = self.caches.cells[(cx, y)].jump_cache[slot];
            if cached.version == version {
                break (cached.stop, cached.cost);
            }
        };
        for _ in 0..steps {
            cx -= DX;
            cost += self.map.horizontal_cost(cx.min(cx + DX), y);
            self.caches.cells[(cx, y)].jump_cache[slot] = JumpSlot { version, stop, cost };
        }
        debug_assert!(cx == x);
    }

    fn calculate_jump_y<const DY: i32>(&mut self, x: i32, y: i32, slot: usize, version: u32) {
        let mut steps = 0;
        let mut cy = y;
        let (stop, mut cost) = loop {
            steps += 1;
            cy += DY;
            if !self.map.locally_uniform(x, cy) {
                break (cy, 0.0);
            }
            let cached = self.caches.cells[(x, cy)].jump_cache[slot];
            if cached.version == version {
                break (cached.stop, cached.cost);
            }
        };
        for _ in 0..steps {
            cy -= DY;
            cost += self.map.vertical_cost(x, cy.min(cy + DY));
            self.caches.cells[(x, cy)].jump_cache[slot] = JumpSlot { version, stop, cost };
        }
        debug_assert!(cy == y);
    }

    /// Strides diagonally, probing a straight jump along each of the two
    /// component directions still in `successors` at every step. The stride
    /// ends at the first cell that is not locally uniform, which is always
    /// emitted.
    fn jump_diag<const DX: i32, const DY: i32>(
        &mut self,
        edges: &mut Vec<WeightedEdge<'a>>,
        x: i32,
        y: i32,
        g: f64,
        successors: EnumSet<Direction>,
    ) {
        let from = (x, y);
        let vertical = if DY < 0 { Direction::North } else { Direction::South };
        let horizontal = if DX < 0 { Direction::West } else { Direction::East };
        let diagonal = match (DX < 0, DY < 0) {
            (true, true) => Direction::NorthWest,
            (true, false) => Direction::SouthWest,
            (false, true) => Direction::NorthEast,
            (false, false) => Direction::SouthEast,
        };
        let mut cost = self.diagonal_step::<DX, DY>(x, y);
        let (mut cx, mut cy) = (x + DX, y + DY);
        while self.map.locally_uniform(cx, cy) && (cx, cy) != self.target {
            if successors.contains(vertical) {
                self.jump_y::<DY>(edges, from, cx, cy, g, cost);
            }
            if successors.contains(horizontal) {
                self.jump_x::<DX>(edges, from, cx, cy, g, cost);
            }
            cost += self.diagonal_step::<DX, DY>(cx, cy);
            cx += DX;
            cy += DY;
        }
        // SAFETY: diagonal strides only leave locally uniform cells, so the
        // stop is traversable and in-bounds of the map.
        let successor = unsafe { self.node_pool.generate_unchecked((cx, cy)) };
        edges.push(WeightedEdge { successor, cost });
        self.reach(from, (cx, cy), diagonal, g + cost);
    }
}

impl<'a, P: GridStateMapper> Expander<'a> for WjpsExpander<'a, P> {
    type Edge = WeightedEdge<'a>;

    fn expand(&mut self, node: NodeRef<'a>, edges: &mut Vec<WeightedEdge<'a>>) {
        let (x, y) = node.get(self.node_pool.state_member());
        let g = node.get(self.g);
        // Reaching a jump point can prune entries of this node's set, so it
        // is re-read before every probe. Diagonal strides keep the snapshot
        // taken when they begin.
        if self.successors(x, y).contains(Direction::NorthWest) {
            let successors = self.successors(x, y);
            self.jump_diag::<-1, -1>(edges, x, y, g, successors);
        }
        if self.successors(x, y).contains(Direction::North) {
            self.jump_y::<-1>(edges, (x, y), x, y, g, 0.0);
        }
        if self.successors(x, y).contains(Direction::NorthEast) {
            let successors = self.successors(x, y);
            self.jump_diag::<1, -1>(edges, x, y, g, successors);
        }
        if self.successors(x, y).contains(Direction::West) {
            self.jump_x::<-1>(edges, (x, y), x, y, g, 0.0);
        }
        if self.successors(x, y).contains(Direction::East) {
            self.jump_x::<1>(edges, (x, y), x, y, g, 0.0);
        }
        if self.successors(x, y).contains(Direction::SouthWest) {
            let successors = self.successors(x, y);
            self.jump_diag::<-1, 1>(edges, x, y, g, successors);
        }
        if self.successors(x, y).contains(Direction::South) {
            self.jump_y::<1>(edges, (x, y), x, y, g, 0.0);
        }
        if self.successors(x, y).contains(Direction::SouthEast) {
            let successors = self.successors(x, y);
            self.jump_diag::<1, 1>(edges, x, y, g, successors);
        }
    }
}

fn strictly_between<const D: i32>(from: i32, to: i32, target: i32) -> bool {
    if D < 0 {
        to < target && target < from
    } else {
        from < target && target < to
    }
}

#[cfg(test)]
use skua_core::NodeBuilder;
#[cfg(test)]
use skua_grid::GridPool;

#[cfg(test)]
use crate::{two_costs, weighted};

#[cfg(test)]
fn harness(map: &WeightedGrid) -> (GridPool, NodeMemberPointer<f64>, WjpsCaches) {
    let mut builder = NodeBuilder::new();
    let state = builder.add_field((-1, -1));
    let g = builder.add_field(f64::INFINITY);
    let pool = GridPool::new(builder.build(), state, map.width(), map.height());
    let caches = WjpsCaches::new(map, NbCache::hash());
    (pool, g, caches)
}

#[cfg(test)]
fn expansion<'a, P: GridStateMapper>(
    expander: &mut WjpsExpander<'a, P>,
    pool: &P,
    node: NodeRef<'a>,
) -> Vec<((i32, i32), f64)> {
    let mut edges = vec![];
    expander.expand(node, &mut edges);
    edges
        .iter()
        .map(|edge| (edge.successor.get(pool.state_member()), edge.cost))
        .collect()
}

#[test]
fn start_expansions_jump_to_uniformity_breaks() {
    use std::f64::consts::SQRT_2;
    let map = weighted(
        &[
            "......", //
            "......",
            "......",
            "......",
            "......",
            "......",
        ],
        two_costs(1.0, 3.0),
    );
    let (mut pool, g, mut caches) = harness(&map);
    pool.reset();
    let mut expander = WjpsExpander::new(&map, &mut caches, &pool, g, (2, 2), (5, 5));
    let start = pool.generate((2, 2));
    start.set(g, 0.0);
    let got = expansion(&mut expander, &pool, start);
    // Straight jumps all dead-end on the map edge with no way to continue;
    // only the diagonal strides produce jump points, and the southeast one
    // runs until the target.
    let expected = [
        ((0, 0), 2.0 * SQRT_2),
        ((4, 0), 2.0 * SQRT_2),
        ((0, 4), 2.0 * SQRT_2),
        ((5, 5), 3.0 * SQRT_2),
    ];
    assert_eq!(got.len(), expected.len(), "{got:?}");
    for ((state, cost), &(expected_state, expected_cost)) in got.iter().zip(&expected) {
        assert_eq!(*state, expected_state);
        assert!((cost - expected_cost).abs() < 1e-9);
    }
}

#[test]
fn jumps_stop_at_cost_boundaries() {
    let map = weighted(
        &[
            "....,,,,", //
            "....,,,,",
            "....,,,,",
            "....,,,,",
            "....,,,,",
        ],
        two_costs(1.0, 3.0),
    );
    let (mut pool, g, mut caches) = harness(&map);
    pool.reset();
    let mut expander = WjpsExpander::new(&map, &mut caches, &pool, g, (1, 2), (7, 4));
    let start = pool.generate((1, 2));
    start.set(g, 0.0);
    let got = expansion(&mut expander, &pool, start);
    // Eastbound, the jump stops next to the seam where the cost changes.
    assert!(
        got.contains(&((3, 2), 2.0)),
        "no jump point by the seam: {got:?}"
    );
    // Crossing the seam is a single step to the first expensive cell.
    let node = pool.generate((3, 2));
    node.set(g, 2.0);
    let got = expansion(&mut expander, &pool, node);
    assert_eq!(got.len(), 1, "{got:?}");
    assert_eq!(got[0].0, (4, 2));
    assert!((got[0].1 - 2.0).abs() < 1e-9);
    // Within the expensive region the eastbound jump dead-ends on the map
    // edge, which is not a jump point.
    let node = pool.generate((4, 2));
    node.set(g, 4.0);
    let got = expansion(&mut expander, &pool, node);
    assert!(got.is_empty(), "{got:?}");
}

#[test]
fn label_edits_invalidate_cached_jumps() {
    let map_rows = [
        "......,,", //
        "......,,",
        "......,,",
        "......,,",
        "......,,",
    ];
    let mut map = weighted(&map_rows, two_costs(1.0, 3.0));
    let (mut pool, g, mut caches) = harness(&map);
    for _ in 0..2 {
        pool.reset();
        let mut expander = WjpsExpander::new(&map, &mut caches, &pool, g, (1, 2), (7, 4));
        let start = pool.generate((1, 2));
        start.set(g, 0.0);
        let got = expansion(&mut expander, &pool, start);
        // The second search answers from the caches filled by the first.
        assert!(got.contains(&((5, 2), 4.0)), "{got:?}");
    }
    map.set_label(3, 2, 2);
    pool.reset();
    let mut expander = WjpsExpander::new(&map, &mut caches, &pool, g, (1, 2), (7, 4));
    let start = pool.generate((1, 2));
    start.set(g, 0.0);
    let got = expansion(&mut expander, &pool, start);
    assert!(got.contains(&((2, 2), 1.0)), "{got:?}");
    assert!(
        !got.iter().any(|&(state, _)| state == (5, 2)),
        "stale jump: {got:?}"
    );
}

#[test]
fn dominated_moves_are_pruned_from_the_parent() {
    use std::f64::consts::SQRT_2;
    let mut costs = two_costs(1.0, 2.0);
    costs[3] = 10.0;
    let map = weighted(
        &[
            ";;;", //
            ";;;",
            "...",
        ],
        costs,
    );
    let (mut pool, g, mut caches) = harness(&map);
    pool.reset();
    let mut expander = WjpsExpander::new(&map, &mut caches, &pool, g, (1, 1), (0, 2));
    let start = pool.generate((1, 1));
    start.set(g, 0.0);
    let got = expansion(&mut expander, &pool, start);
    // Reaching the jump point below the start prospects the two cells of
    // the cheap row flanking it, which beat the start's direct diagonals.
    // The southeast stride is stolen before its probe runs, so nothing is
    // emitted toward (2, 2).
    let expected = [
        ((0, 0), 10.0 * SQRT_2),
        ((2, 0), 10.0 * SQRT_2),
        ((0, 2), 5.5 * SQRT_2),
        ((1, 2), 5.5),
    ];
    assert_eq!(got.len(), expected.len(), "{got:?}");
    for ((state, cost), &(expected_state, expected_cost)) in got.iter().zip(&expected) {
        assert_eq!(*state, expected_state);
        assert!((cost - expected_cost).abs() < 1e-9);
    }
}
