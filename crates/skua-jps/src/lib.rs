//! Jump point search primitives for bit-packed grid maps.

use enumset::EnumSet;
use skua_grid::{BitGrid, Direction};

mod online;

pub use online::{JpsExpander, OnlineJumpPointLocator};

/// A traversability map paired with its transpose.
///
/// Vertical jumps scan the transpose, where columns of the original map are
/// contiguous words.
pub struct JpsGrid {
    map: BitGrid,
    tmap: BitGrid,
}

impl JpsGrid {
    pub fn map(&self) -> &BitGrid {
        &self.map
    }
}

impl From<BitGrid> for JpsGrid {
    fn from(map: BitGrid) -> Self {
        let mut tmap = BitGrid::new(map.height(), map.width());
        for y in 0..map.height() {
            for x in 0..map.width() {
                tmap.set(y, x, map.get(x, y));
            }
        }
        JpsGrid { map, tmap }
    }
}

/// The direction of travel by which `to` was reached from `from`.
///
/// Jump moves may combine a diagonal leg with a straight leg; the straight
/// leg comes last, so the axis with the larger displacement decides.
pub fn reached_direction(from: (i32, i32), to: (i32, i32)) -> Option<Direction> {
    use std::cmp::Ordering;
    use Direction::*;
    let dx = to.0 - from.0;
    let dy = to.1 - from.1;
    match dx.abs().cmp(&dy.abs()) {
        Ordering::Greater => Some(if dx < 0 { West } else { East }),
        Ordering::Less => Some(if dy < 0 { North } else { South }),
        Ordering::Equal => match (dx < 0, dy < 0) {
            _ if dx == 0 => None,
            (true, true) => Some(NorthWest),
            (true, false) => Some(SouthWest),
            (false, true) => Some(NorthEast),
            (false, false) => Some(SouthEast),
        },
    }
}

/// Computes the canonical successor directions of a node from its
/// traversable neighborhood and the direction of travel which reached it.
///
/// Successors are pruned to moves which no equal-or-cheaper path through the
/// node's neighbors could make redundant. Diagonal moves additionally
/// require both adjacent orthogonal cells to be traversable (no corner
/// cutting). `None` means the node is a search start, which keeps every
/// legal move.
pub fn canonical_successors(
    nb: EnumSet<Direction>,
    going: Option<Direction>,
) -> EnumSet<Direction> {
    let Some(dir) = going else {
        return start_successors(nb);
    };
    // Rotate the neighborhood so the direction of travel becomes North (or
    // NorthWest), evaluate the pruning rules there, and rotate back.
    let group_index = dir as u32 % 4;
    let nb = rotate_set(nb, 4 - group_index);
    let successors = if dir.is_diagonal() {
        northwest_successors(nb)
    } else {
        north_successors(nb)
    };
    rotate_set(successors, group_index)
}

fn start_successors(nb: EnumSet<Direction>) -> EnumSet<Direction> {
    use Direction::*;
    let mut successors = nb & (North | West | South | East);
    for diagonal in [NorthWest, SouthWest, SouthEast, NorthEast] {
        let turns = diagonal as u32 % 4;
        let a = North.rotate_ccw(turns);
        let b = West.rotate_ccw(turns);
        if nb.is_superset(a | b | diagonal) {
            successors |= diagonal;
        }
    }
    successors
}

fn north_successors(nb: EnumSet<Direction>) -> EnumSet<Direction> {
    use Direction::*;
    let mut successors = EnumSet::empty();
    if nb.contains(North) {
        successors |= North;
    }
    // A sideways move is kept only when forced; that is, when the cell
    // behind it is blocked so no path through the parent reaches it.
    if nb.contains(West) && !nb.contains(SouthWest) {
        successors |= West;
        if nb.is_superset(North | NorthWest) {
            successors |= NorthWest;
        }
    }
    if nb.contains(East) && !nb.contains(SouthEast) {
        successors |= East;
        if nb.is_superset(North | NorthEast) {
            successors |= NorthEast;
        }
    }
    successors
}

fn northwest_successors(nb: EnumSet<Direction>) -> EnumSet<Direction> {
    use Direction::*;
    let mut successors = nb & (North | West);
    if nb.is_superset(North | West | NorthWest) {
        successors |= NorthWest;
    }
    successors
}

fn rotate_set(set: EnumSet<Direction>, quarter_turns: u32) -> EnumSet<Direction> {
    set.iter().map(|dir| dir.rotate_ccw(quarter_turns)).collect()
}

fn skipped_past<const D: i32>(from: i32, to: i32, target: i32) -> bool {
    in_direction::<D>(from, target) && in_direction::<D>(target, to)
}

fn in_direction<const D: i32>(from: i32, to: i32) -> bool {
    if D < 0 {
        to < from
    } else {
        from < to
    }
}

#[test]
fn reached_direction_cases() {
    use Direction::*;
    assert_eq!(reached_direction((0, 0), (5, 0)), Some(East));
    assert_eq!(reached_direction((3, 3), (3, 1)), Some(North));
    assert_eq!(reached_direction((0, 0), (3, 3)), Some(SouthEast));
    assert_eq!(reached_direction((4, 4), (2, 2)), Some(NorthWest));
    assert_eq!(reached_direction((2, 2), (2, 2)), None);
    // Compound diagonal-then-straight moves resolve to the straight leg.
    assert_eq!(reached_direction((0, 0), (5, 2)), Some(East));
    assert_eq!(reached_direction((0, 0), (2, 5)), Some(South));
}

#[test]
fn canonical_successors_prune_to_travel_direction() {
    use Direction::*;
    let open = EnumSet::all();
    assert_eq!(canonical_successors(open, Some(East)), EnumSet::from(East));
    assert_eq!(canonical_successors(open, Some(North)), EnumSet::from(North));
    assert_eq!(
        canonical_successors(open, Some(SouthWest)),
        South | West | SouthWest
    );
    assert_eq!(canonical_successors(open, None), open);
}

#[test]
fn canonical_successors_keep_forced_neighbors() {
    use Direction::*;
    // Going east past a blocked cell to the northwest forces the turn north.
    let nb = EnumSet::all() - NorthWest;
    assert_eq!(
        canonical_successors(nb, Some(East)),
        East | North | NorthEast
    );
    // The same neighborhood rotated a quarter turn, going north.
    let nb = EnumSet::all() - SouthWest;
    assert_eq!(
        canonical_successors(nb, Some(North)),
        North | West | NorthWest
    );
}

#[test]
fn start_successors_respect_corner_cutting() {
    use Direction::*;
    let nb = EnumSet::all() - North;
    assert_eq!(
        canonical_successors(nb, None),
        West | South | East | SouthWest | SouthEast
    );
}
