use std::f64::consts::SQRT_2;

use skua_core::traits::{Expander, WeightedEdge};
use skua_core::NodeRef;
use skua_grid::{BitGrid, Direction, GridStateMapper};

use crate::{canonical_successors, reached_direction, skipped_past, JpsGrid};

/// Locates jump points online by scanning the bit-packed map one word at a
/// time.
pub struct OnlineJumpPointLocator<'a> {
    map: &'a JpsGrid,
    target: (i32, i32),
}

impl<'a> OnlineJumpPointLocator<'a> {
    pub fn new(map: &'a JpsGrid, target: (i32, i32)) -> Self {
        assert!(
            target.0 >= 0 && target.0 < map.map.width(),
            "target x out of bounds"
        );
        assert!(
            target.1 >= 0 && target.1 < map.map.height(),
            "target y out of bounds"
        );
        OnlineJumpPointLocator { map, target }
    }

    pub fn target(&self) -> (i32, i32) {
        self.target
    }

    /// Collects the jump point successors of `at` in direction `dir`, with
    /// the cost of the move reaching each.
    ///
    /// Diagonal directions can produce several successors, one per straight
    /// jump point discovered along the diagonal. Produces nothing when the
    /// first step in `dir` is obstructed.
    pub fn jump(&self, dir: Direction, at: (i32, i32)) -> Vec<((i32, i32), f64)> {
        let (x, y) = at;
        let map = &self.map.map;
        assert!(map.get(x, y), "jump from non-traversable cell");
        let (dx, dy) = dir.vector();
        let legal = if dir.is_diagonal() {
            map.get(x + dx, y) && map.get(x, y + dy) && map.get(x + dx, y + dy)
        } else {
            map.get(x + dx, y + dy)
        };
        let mut successors = vec![];
        if !legal {
            return successors;
        }
        let mut found = |successor, cost| successors.push((successor, cost));
        // SAFETY: `at` is traversable, hence in-bounds, and the legality of
        // the first step was just checked.
        unsafe {
            match dir {
                Direction::North => self.jump_y::<-1>(&mut found, x, y, 0.0),
                Direction::West => self.jump_x::<-1>(&mut found, x, y, 0.0),
                Direction::South => self.jump_y::<1>(&mut found, x, y, 0.0),
                Direction::East => self.jump_x::<1>(&mut found, x, y, 0.0),
                Direction::NorthWest => self.jump_diag::<-1, -1>(&mut found, x, y),
                Direction::SouthWest => self.jump_diag::<-1, 1>(&mut found, x, y),
                Direction::SouthEast => self.jump_diag::<1, 1>(&mut found, x, y),
                Direction::NorthEast => self.jump_diag::<1, -1>(&mut found, x, y),
            }
        }
        successors
    }

    /// Jumps horizontally, reporting the jump point reached, if any.
    ///
    /// Preconditions:
    /// - `x`, `y` are in-bounds of the map.
    /// - `DX` is -1 or 1.
    /// - `x+DX`, `y` is traversable.
    unsafe fn jump_x<const DX: i32>(
        &self,
        found: &mut impl FnMut((i32, i32), f64),
        x: i32,
        y: i32,
        cost: f64,
    ) {
        let (mut new_x, mut successor) = unsafe {
            match DX {
                -1 => scan_west(&self.map.map, x, y),
                1 => scan_east(&self.map.map, x, y),
                _ => unreachable!(),
            }
        };
        if y == self.target.1 && skipped_past::<DX>(x, new_x, self.target.0) {
            successor = true;
            new_x = self.target.0;
        }
        if successor {
            found((new_x, y), cost + (DX * (new_x - x)) as f64);
        }
    }

    /// Jumps vertically, reporting the jump point reached, if any.
    ///
    /// Preconditions:
    /// - `x`, `y` are in-bounds of the map.
    /// - `DY` is -1 or 1.
    /// - `x`, `y+DY` is traversable.
    unsafe fn jump_y<const DY: i32>(
        &self,
        found: &mut impl FnMut((i32, i32), f64),
        x: i32,
        y: i32,
        cost: f64,
    ) {
        let (mut new_y, mut successor) = unsafe {
            // tmap is the transpose of map, so a vertical jump is a
            // horizontal jump from the transposed position.
            match DY {
                -1 => scan_west(&self.map.tmap, y, x),
                1 => scan_east(&self.map.tmap, y, x),
                _ => unreachable!(),
            }
        };
        if x == self.target.0 && skipped_past::<DY>(y, new_y, self.target.1) {
            // The target is strictly between y and the scan's stop, so it
            // is in-bounds.
            successor = true;
            new_y = self.target.1;
        }
        if successor {
            found((x, new_y), cost + (DY * (new_y - y)) as f64);
        }
    }

    /// Jumps diagonally, reporting every straight jump point discovered
    /// along the diagonal and the target if the diagonal lands on it.
    ///
    /// Preconditions:
    /// - `x`, `y` are in-bounds of the map.
    /// - `DX`, `DY` are -1 or 1.
    /// - `x+DX`, `y+DY` is traversable.
    unsafe fn jump_diag<const DX: i32, const DY: i32>(
        &self,
        found: &mut impl FnMut((i32, i32), f64),
        mut x: i32,
        mut y: i32,
    ) {
        unsafe {
            let mut cost = 0.0;
            // Invariant: x+DX, y+DY is traversable, which keeps the stepped
            // position in-bounds.
            loop {
                x += DX;
                y += DY;
                cost += SQRT_2;

                if (x, y) == self.target {
                    found((x, y), cost);
                    break;
                }

                // x, y is in-bounds, so one further step reads stay within
                // the padding.
                let x_t = self.map.map.get_unchecked(x + DX, y);
                let y_t = self.map.map.get_unchecked(x, y + DY);
                let xy_t = self.map.map.get_unchecked(x + DX, y + DY);
                if x_t {
                    self.jump_x::<DX>(found, x, y, cost);
                }
                if y_t {
                    self.jump_y::<DY>(found, x, y, cost);
                }
                if !(x_t && y_t && xy_t) {
                    break;
                }
            }
        }
    }
}

/// Scans east along row `y` for the first stop strictly right of `x`: a
/// turning point next to an adjacent-row obstruction, or an obstruction in
/// the row itself.
///
/// Preconditions:
/// - `x`, `y` are in-bounds of `map`.
///
/// Postconditions for return value `(stop_x, jump_point)`:
/// - if `jump_point`: `(stop_x, y)` is traversable and in-bounds of `map`
/// - if `!jump_point`: `(stop_x, y)` is the obstruction ending the run
/// - `stop_x` is greater than `x`
#[inline(always)]
unsafe fn scan_east(map: &BitGrid, x: i32, y: i32) -> (i32, bool) {
    let (mut word_x, bit) = map.word_offset(x);
    // Stops at or before x are previous scans' business. The double shift
    // also keeps bit == 63 defined.
    let mut eligible = !0 << bit << 1;
    // Carries hold the last bit of each adjacent row's previous word so
    // obstruction-to-open transitions at the word seam are seen.
    let mut carry_above = 1;
    let mut carry_below = 1;
    loop {
        // SAFETY: y is in-bounds, and the border obstruction bit stops the
        // scan before word_x can leave the row.
        let [above, row, below] = unsafe { map.word_triple(word_x, y) };

        // A turning point is a traversable adjacent-row cell immediately
        // after an obstruction.
        let above_turning = !(above << 1 | carry_above) & above;
        let below_turning = !(below << 1 | carry_below) & below;
        let stops = (above_turning | below_turning | !row) & eligible;

        if stops != 0 {
            let stop = stops.trailing_zeros();
            return (map.word_base(word_x) + stop as i32, row & 1 << stop != 0);
        }

        carry_above = above >> 63;
        carry_below = below >> 63;
        eligible = !0;
        word_x += 1;
    }
}

/// Scans west along row `y` for the first stop strictly left of `x`; the
/// mirror image of [`scan_east`], with the same contract.
#[inline(always)]
unsafe fn scan_west(map: &BitGrid, x: i32, y: i32) -> (i32, bool) {
    let (mut word_x, bit) = map.word_offset(x);
    let mut eligible = !(!0 << bit);
    let mut carry_above = 1 << 63;
    let mut carry_below = 1 << 63;
    loop {
        // SAFETY: y is in-bounds, and the border obstruction bit at the
        // start of the row stops the scan no later than word 0.
        let [above, row, below] = unsafe { map.word_triple(word_x, y) };

        let above_turning = !(above >> 1 | carry_above) & above;
        let below_turning = !(below >> 1 | carry_below) & below;
        let stops = (above_turning | below_turning | !row) & eligible;

        if stops != 0 {
            let stop = 63 - stops.leading_zeros();
            return (map.word_base(word_x) + stop as i32, row & 1 << stop != 0);
        }

        carry_above = above << 63;
        carry_below = below << 63;
        eligible = !0;
        word_x -= 1;
    }
}

/// Jump point search expander.
///
/// Harabor, D., & Grastien, A. (2014, May). Improving jump point search. In Proceedings of the
/// International Conference on Automated Planning and Scheduling (Vol. 24, pp. 128-135).
pub struct JpsExpander<'a, P> {
    node_pool: &'a P,
    jpl: OnlineJumpPointLocator<'a>,
}

impl<'a, P: GridStateMapper> JpsExpander<'a, P> {
    pub fn new(map: &'a JpsGrid, node_pool: &'a P, target: (i32, i32)) -> Self {
        assert!(node_pool.width() >= map.map.width(), "node pool too small");
        assert!(node_pool.height() >= map.map.height(), "node pool too small");
        JpsExpander {
            node_pool,
            jpl: OnlineJumpPointLocator::new(map, target),
        }
    }
}

impl<'a, P: GridStateMapper> Expander<'a> for JpsExpander<'a, P> {
    type Edge = WeightedEdge<'a>;

    fn expand(&mut self, node: NodeRef<'a>, edges: &mut Vec<WeightedEdge<'a>>) {
        let state = self.node_pool.state_member();
        let (x, y) = node.get(state);

        let dir = node
            .get_parent()
            .and_then(|parent| reached_direction(parent.get(state), (x, y)));
        let successors = canonical_successors(self.jpl.map.map.get_neighborhood(x, y), dir);

        let node_pool = self.node_pool;
        let mut found = |successor, cost| {
            edges.push(WeightedEdge {
                // SAFETY: jump points are in-bounds of the map, which the
                // node pool was checked to cover.
                successor: unsafe { node_pool.generate_unchecked(successor) },
                cost,
            });
        };

        // SAFETY: the canonical successor set only keeps directions whose
        // first step is traversable, as each jump requires.
        unsafe {
            if successors.contains(Direction::North) {
                self.jpl.jump_y::<-1>(&mut found, x, y, 0.0);
            }
            if successors.contains(Direction::West) {
                self.jpl.jump_x::<-1>(&mut found, x, y, 0.0);
            }
            if successors.contains(Direction::South) {
                self.jpl.jump_y::<1>(&mut found, x, y, 0.0);
            }
            if successors.contains(Direction::East) {
                self.jpl.jump_x::<1>(&mut found, x, y, 0.0);
            }
            if successors.contains(Direction::NorthWest) {
                self.jpl.jump_diag::<-1, -1>(&mut found, x, y);
            }
            if successors.contains(Direction::SouthWest) {
                self.jpl.jump_diag::<-1, 1>(&mut found, x, y);
            }
            if successors.contains(Direction::SouthEast) {
                self.jpl.jump_diag::<1, 1>(&mut found, x, y);
            }
            if successors.contains(Direction::NorthEast) {
                self.jpl.jump_diag::<1, -1>(&mut found, x, y);
            }
        }
    }
}

#[cfg(test)]
fn grid(rows: &[&str]) -> JpsGrid {
    let mut map = BitGrid::new(rows[0].len() as i32, rows.len() as i32);
    for (y, row) in rows.iter().enumerate() {
        for (x, cell) in row.bytes().enumerate() {
            map.set(x as i32, y as i32, cell == b'.');
        }
    }
    map.into()
}

#[test]
fn east_scan_stops_at_turning_point() {
    let map = grid(&[
        "....#.....", //
        "..........",
        "..........",
    ]);
    // SAFETY: coordinates in-bounds.
    unsafe {
        assert_eq!(scan_east(&map.map, 0, 1), (5, true));
        assert_eq!(scan_east(&map.map, 5, 1), (10, false));
        assert_eq!(scan_east(&map.map, 0, 2), (10, false));
    }
}

#[test]
fn east_scan_stops_at_obstruction() {
    let map = grid(&["..........", ".......#..", ".........."]);
    // SAFETY: coordinates in-bounds.
    unsafe {
        assert_eq!(scan_east(&map.map, 2, 1), (7, false));
    }
}

#[test]
fn west_scan_mirrors_east() {
    let map = grid(&[
        "......#...", //
        "..........",
        "...#......",
    ]);
    // SAFETY: coordinates in-bounds.
    unsafe {
        // Moving west along the middle row: the row above opens west of
        // x=6, the row below opens west of x=3.
        assert_eq!(scan_west(&map.map, 9, 1), (5, true));
        assert_eq!(scan_west(&map.map, 5, 1), (2, true));
        assert_eq!(scan_west(&map.map, 2, 1), (-1, false));
    }
}

#[test]
fn scans_cross_word_seams() {
    let mut map = BitGrid::new(100, 3);
    for y in 0..3 {
        for x in 0..100 {
            map.set(x, y, true);
        }
    }
    map.set(62, 0, false);
    map.set(75, 2, false);
    let map = JpsGrid::from(map);
    // SAFETY: coordinates in-bounds.
    unsafe {
        // The turning point at x=63 sits in bit 0 of the second word; its
        // obstruction is the last bit of the first.
        assert_eq!(scan_east(&map.map, 10, 1), (63, true));
        assert_eq!(scan_east(&map.map, 63, 1), (76, true));
        assert_eq!(scan_west(&map.map, 90, 1), (74, true));
        assert_eq!(scan_west(&map.map, 74, 1), (61, true));
    }
}

#[test]
fn jump_clips_to_target() {
    let map = grid(&[
        "..........", //
        "..........",
        "..........",
        "..........",
    ]);
    let jpl = OnlineJumpPointLocator::new(&map, (7, 2));
    assert_eq!(jpl.jump(Direction::East, (2, 2)), vec![((7, 2), 5.0)]);
    assert_eq!(jpl.jump(Direction::West, (9, 2)), vec![((7, 2), 2.0)]);
    assert_eq!(jpl.jump(Direction::South, (7, 0)), vec![((7, 2), 2.0)]);
    // Off the target's row, the jump dead-ends at the border.
    assert_eq!(jpl.jump(Direction::East, (2, 1)), vec![]);
}

#[test]
fn jump_blocked_immediately_returns_nothing() {
    let map = grid(&[
        "..........", //
        "..#.......",
        "..........",
    ]);
    let jpl = OnlineJumpPointLocator::new(&map, (9, 0));
    assert_eq!(jpl.jump(Direction::East, (1, 1)), vec![]);
    assert_eq!(jpl.jump(Direction::NorthEast, (1, 2)), vec![]);
}

#[test]
fn diagonal_jump_reports_straight_jump_points() {
    let map = grid(&[
        ".....", //
        "..#..",
        ".....",
        ".....",
    ]);
    let jpl = OnlineJumpPointLocator::new(&map, (4, 3));
    let successors = jpl.jump(Direction::NorthEast, (0, 3));
    assert_eq!(successors.len(), 2);
    // One diagonal step to (1, 2), then two straight steps each way around
    // the obstruction.
    assert_eq!(successors[0].0, (3, 2));
    assert_eq!(successors[1].0, (1, 0));
    assert!((successors[0].1 - (SQRT_2 + 2.0)).abs() < 1e-12);
    assert!((successors[1].1 - (SQRT_2 + 2.0)).abs() < 1e-12);
}

#[test]
fn diagonal_jump_reaches_target() {
    let map = grid(&[
        ".....", //
        ".....",
        ".....",
        ".....",
        ".....",
    ]);
    let jpl = OnlineJumpPointLocator::new(&map, (4, 0));
    let successors = jpl.jump(Direction::NorthEast, (0, 4));
    assert_eq!(successors.len(), 1);
    assert_eq!(successors[0].0, (4, 0));
    assert!((successors[0].1 - 4.0 * SQRT_2).abs() < 1e-12);
}
