use enumset::{EnumSet, EnumSetType};
use skua_core::traits::{Cost, NodePool, Successor};
use skua_core::{HashPool, NodeMemberPointer, NodeRef};

mod bitgrid;
mod eight_connected;
mod grid;
mod grid_pool;
mod time_expanded;

pub use bitgrid::BitGrid;
pub use eight_connected::EightConnectedExpander;
pub use grid::Grid;
pub use grid_pool::GridPool;
pub use time_expanded::{TimeExpandedExpander, TimeExpandedPool, TimeTarget};

/// The eight grid moves.
///
/// The orthogonal and diagonal directions each form a group of four in which
/// a quarter turn counter-clockwise is `+1` (mod 4); this is what makes
/// neighborhood canonicalization by rotation cheap.
#[derive(EnumSetType, Debug)]
pub enum Direction {
    North,
    West,
    South,
    East,
    NorthWest,
    SouthWest,
    SouthEast,
    NorthEast,
}

const DIRECTIONS: [Direction; 8] = [
    Direction::North,
    Direction::West,
    Direction::South,
    Direction::East,
    Direction::NorthWest,
    Direction::SouthWest,
    Direction::SouthEast,
    Direction::NorthEast,
];

impl Direction {
    /// The unit step this direction takes, with y growing southwards.
    #[inline(always)]
    pub fn vector(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::West => (-1, 0),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::NorthWest => (-1, -1),
            Direction::SouthWest => (-1, 1),
            Direction::SouthEast => (1, 1),
            Direction::NorthEast => (1, -1),
        }
    }

    #[inline(always)]
    pub fn backwards(self) -> Direction {
        self.rotate_ccw(2)
    }

    #[inline(always)]
    pub fn is_diagonal(self) -> bool {
        self as usize >= 4
    }

    /// Rotates by `quarter_turns` * 90 degrees counter-clockwise, staying
    /// within the orthogonal or diagonal group.
    #[inline(always)]
    pub fn rotate_ccw(self, quarter_turns: u32) -> Direction {
        let index = self as usize;
        DIRECTIONS[index / 4 * 4 + (index + quarter_turns as usize) % 4]
    }
}

/// An edge of the 8-connected grid graph.
pub struct GridEdge<'a> {
    pub successor: NodeRef<'a>,
    pub cost: f64,
    pub direction: Direction,
}

impl<'a> Successor<'a> for GridEdge<'a> {
    fn successor(&self) -> NodeRef<'a> {
        self.successor
    }
}

impl Cost for GridEdge<'_> {
    fn cost(&self) -> f64 {
        self.cost
    }
}

/// Node pools whose states are grid coordinates.
///
/// # Safety
/// `generate_unchecked` must be sound to call for all coordinates inside the
/// `width()` by `height()` rectangle, and `state_member` must belong to the
/// layout of the nodes the pool hands out.
pub unsafe trait GridStateMapper: NodePool<State = (i32, i32)> {
    fn width(&self) -> i32;
    fn height(&self) -> i32;
    fn state_member(&self) -> NodeMemberPointer<(i32, i32)>;

    /// Returns the node for `state`, without checking it is in-bounds.
    ///
    /// # Safety
    /// `state` must be within the pool's rectangle.
    unsafe fn generate_unchecked(&self, state: (i32, i32)) -> NodeRef;
}

// SAFETY: a hash pool accepts any state, so every coordinate is in-bounds.
unsafe impl GridStateMapper for HashPool<(i32, i32)> {
    fn width(&self) -> i32 {
        i32::MAX
    }

    fn height(&self) -> i32 {
        i32::MAX
    }

    fn state_member(&self) -> NodeMemberPointer<(i32, i32)> {
        HashPool::state_member(self)
    }

    unsafe fn generate_unchecked(&self, state: (i32, i32)) -> NodeRef {
        self.generate(state)
    }
}

/// Octile distance between two cells; the optimal cost when every cell
/// between them is traversable.
pub fn octile_distance(from: (i32, i32), to: (i32, i32)) -> f64 {
    let dx = (from.0 - to.0).abs();
    let dy = (from.1 - to.1).abs();
    let diagonal = dx.min(dy);
    let straight = dx.max(dy) - diagonal;
    diagonal as f64 * std::f64::consts::SQRT_2 + straight as f64
}

#[test]
fn rotation_is_a_group_symmetry() {
    for dir in EnumSet::<Direction>::all() {
        assert_eq!(dir.rotate_ccw(4), dir);
        assert_eq!(dir.rotate_ccw(1).rotate_ccw(3), dir);
        assert_eq!(dir.is_diagonal(), dir.rotate_ccw(1).is_diagonal());
        // A quarter turn counter-clockwise maps (x, y) to (y, -x).
        let (x, y) = dir.vector();
        assert_eq!(dir.rotate_ccw(1).vector(), (y, -x));
        let (bx, by) = dir.backwards().vector();
        assert_eq!((bx, by), (-x, -y));
    }
}

#[test]
fn octile_distance_cases() {
    assert_eq!(octile_distance((0, 0), (5, 0)), 5.0);
    assert_eq!(octile_distance((2, 3), (2, 3)), 0.0);
    assert_eq!(
        octile_distance((0, 0), (4, 4)),
        4.0 * std::f64::consts::SQRT_2
    );
    assert_eq!(
        octile_distance((1, 1), (4, 7)),
        3.0 * std::f64::consts::SQRT_2 + 3.0
    );
}
