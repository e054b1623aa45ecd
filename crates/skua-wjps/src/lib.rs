//! Jump point search for grid maps with per-cell terrain costs.

use skua_grid::Grid;

mod expander;
mod nbcache;

pub use expander::{WjpsCaches, WjpsExpander};
pub use nbcache::{NbCache, TooManyCostClasses};

/// A grid of terrain labels with a table of per-label traversal costs.
///
/// Labels are `u8` tile classes; label 0 is an obstacle, and every other
/// label appearing in the map must have a finite positive cost. Moves are
/// charged the mean cost of the cells they touch: an orthogonal step costs
/// the average of the two cells it moves between, and a diagonal step the
/// average of the four cells around its crossing point times sqrt(2).
///
/// Rows and columns carry version counters, bumped for the three rows and
/// three columns around every label edit. The jump and successor caches
/// validate against these counters instead of being rebuilt when the
/// terrain changes.
pub struct WeightedGrid {
    labels: Grid<u8>,
    costs: [f64; 256],
    row_versions: Vec<u32>,
    col_versions: Vec<u32>,
}

impl WeightedGrid {
    /// Creates a map with each cell's label given by `labels(x, y)`.
    ///
    /// Panics if any cell uses a label whose cost is not finite and
    /// positive.
    pub fn new(
        width: i32,
        height: i32,
        costs: [f64; 256],
        mut labels: impl FnMut(i32, i32) -> u8,
    ) -> Self {
        // One cell of obstacle padding on every side lets neighborhood reads
        // skip bounds checks on the real edge.
        let labels = Grid::new(width + 2, height + 2, |x, y| {
            if x == 0 || y == 0 || x == width + 1 || y == height + 1 {
                0
            } else {
                labels(x - 1, y - 1)
            }
        });
        for &label in labels.storage() {
            assert!(
                label == 0 || costs[label as usize] > 0.0 && costs[label as usize].is_finite(),
                "label {label} has no finite positive cost"
            );
        }
        WeightedGrid {
            labels,
            costs,
            row_versions: vec![1; height as usize],
            col_versions: vec![1; width as usize],
        }
    }

    #[inline(always)]
    pub fn width(&self) -> i32 {
        self.labels.width() - 2
    }

    #[inline(always)]
    pub fn height(&self) -> i32 {
        self.labels.height() - 2
    }

    /// The label of the cell at `x`, `y`; in-bounds up to one cell of
    /// padding, where the label is always 0.
    #[inline(always)]
    pub fn label(&self, x: i32, y: i32) -> u8 {
        self.labels[(x + 1, y + 1)]
    }

    #[inline(always)]
    pub fn cost_of(&self, label: u8) -> f64 {
        self.costs[label as usize]
    }

    #[inline(always)]
    pub fn traversable(&self, x: i32, y: i32) -> bool {
        self.label(x, y) != 0
    }

    /// Relabels the cell at `x`, `y` and bumps the version counters of every
    /// row and column whose cached jumps or successor sets could see the
    /// change.
    pub fn set_label(&mut self, x: i32, y: i32, label: u8) {
        assert!(x >= 0 && x < self.width(), "x out of bounds");
        assert!(y >= 0 && y < self.height(), "y out of bounds");
        assert!(
            label == 0 || self.costs[label as usize] > 0.0 && self.costs[label as usize].is_finite(),
            "label {label} has no finite positive cost"
        );
        self.labels[(x + 1, y + 1)] = label;
        for row in (y - 1).max(0)..=(y + 1).min(self.height() - 1) {
            let version = &mut self.row_versions[row as usize];
            *version = version.wrapping_add(1);
        }
        for col in (x - 1).max(0)..=(x + 1).min(self.width() - 1) {
            let version = &mut self.col_versions[col as usize];
            *version = version.wrapping_add(1);
        }
    }

    /// The cheapest traversal cost in the map; the scale factor that keeps
    /// octile distance an admissible heuristic here.
    pub fn lowest_cost(&self) -> f64 {
        let mut lowest = f64::INFINITY;
        for y in 0..self.height() {
            for x in 0..self.width() {
                let label = self.label(x, y);
                if label != 0 {
                    lowest = lowest.min(self.costs[label as usize]);
                }
            }
        }
        lowest
    }

    /// Cost of the move between `(x, y)` and `(x + 1, y)`.
    #[inline(always)]
    pub fn horizontal_cost(&self, x: i32, y: i32) -> f64 {
        debug_assert!(
            self.traversable(x, y) && self.traversable(x + 1, y),
            "move through an obstacle"
        );
        (self.cost_at(x, y) + self.cost_at(x + 1, y)) / 2.0
    }

    /// Cost of the move between `(x, y)` and `(x, y + 1)`.
    #[inline(always)]
    pub fn vertical_cost(&self, x: i32, y: i32) -> f64 {
        debug_assert!(
            self.traversable(x, y) && self.traversable(x, y + 1),
            "move through an obstacle"
        );
        (self.cost_at(x, y) + self.cost_at(x, y + 1)) / 2.0
    }

    /// Cost of either diagonal move across the 2x2 block whose northwest
    /// corner is `(x, y)`.
    #[inline(always)]
    pub fn diagonal_cost(&self, x: i32, y: i32) -> f64 {
        debug_assert!(
            self.traversable(x, y)
                && self.traversable(x + 1, y)
                && self.traversable(x, y + 1)
                && self.traversable(x + 1, y + 1),
            "move through an obstacle"
        );
        let sum = self.cost_at(x, y)
            + self.cost_at(x + 1, y)
            + self.cost_at(x, y + 1)
            + self.cost_at(x + 1, y + 1);
        sum * std::f64::consts::SQRT_2 / 4.0
    }

    /// Whether all eight neighbors of `(x, y)` share its label. Straight
    /// jumps stride through locally uniform cells without stopping.
    #[inline(always)]
    pub fn locally_uniform(&self, x: i32, y: i32) -> bool {
        let label = self.label(x, y);
        self.label(x - 1, y - 1) == label
            && self.label(x, y - 1) == label
            && self.label(x + 1, y - 1) == label
            && self.label(x - 1, y) == label
            && self.label(x + 1, y) == label
            && self.label(x - 1, y + 1) == label
            && self.label(x, y + 1) == label
            && self.label(x + 1, y + 1) == label
    }

    /// Bytes of memory in use by the map.
    pub fn mem(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.labels.storage().len()
            + (self.row_versions.len() + self.col_versions.len()) * std::mem::size_of::<u32>()
    }

    #[inline(always)]
    fn cost_at(&self, x: i32, y: i32) -> f64 {
        self.costs[self.label(x, y) as usize]
    }

    #[inline(always)]
    pub(crate) fn row_version(&self, y: i32) -> u32 {
        self.row_versions[y as usize]
    }

    #[inline(always)]
    pub(crate) fn col_version(&self, x: i32) -> u32 {
        self.col_versions[x as usize]
    }
}

#[cfg(test)]
fn weighted(rows: &[&str], costs: [f64; 256]) -> WeightedGrid {
    WeightedGrid::new(
        rows[0].len() as i32,
        rows.len() as i32,
        costs,
        |x, y| match rows[y as usize].as_bytes()[x as usize] {
            b'#' => 0,
            b'.' => 1,
            b',' => 2,
            b';' => 3,
            cell => panic!("unknown cell {}", cell as char),
        },
    )
}

#[cfg(test)]
fn two_costs(a: f64, b: f64) -> [f64; 256] {
    let mut costs = [f64::NAN; 256];
    costs[1] = a;
    costs[2] = b;
    costs
}

#[test]
fn move_costs_average_the_crossed_cells() {
    use std::f64::consts::SQRT_2;
    let map = weighted(
        &[
            "..,,", //
            "..,,",
        ],
        two_costs(1.0, 3.0),
    );
    assert_eq!(map.horizontal_cost(0, 0), 1.0);
    assert_eq!(map.horizontal_cost(1, 0), 2.0);
    assert_eq!(map.horizontal_cost(2, 0), 3.0);
    assert_eq!(map.vertical_cost(2, 0), 3.0);
    assert_eq!(map.diagonal_cost(0, 0), SQRT_2);
    assert_eq!(map.diagonal_cost(1, 0), 2.0 * SQRT_2);
    assert_eq!(map.diagonal_cost(2, 0), 3.0 * SQRT_2);
}

#[test]
fn local_uniformity_checks_every_neighbor() {
    let mut map = weighted(
        &[
            ".....", //
            ".....",
            ".....",
            ".....",
            ".....",
        ],
        two_costs(1.0, 3.0),
    );
    assert!(map.locally_uniform(2, 2));
    // Border padding breaks uniformity along the real edge.
    assert!(!map.locally_uniform(0, 0));
    assert!(!map.locally_uniform(4, 2));
    // A changed label to the east must be noticed like any other neighbor.
    map.set_label(3, 2, 2);
    assert!(!map.locally_uniform(2, 2));
    assert!(!map.locally_uniform(3, 1));
    assert!(map.locally_uniform(1, 2));
}

#[test]
fn label_edits_bump_adjacent_versions() {
    let mut map = weighted(
        &[
            "......", //
            "......",
            "......",
            "......",
            "......",
        ],
        two_costs(1.0, 3.0),
    );
    let rows: Vec<u32> = (0..5).map(|y| map.row_version(y)).collect();
    let cols: Vec<u32> = (0..6).map(|x| map.col_version(x)).collect();
    map.set_label(2, 3, 2);
    for y in 0..5 {
        let bumped = (2..=4).contains(&y);
        assert_eq!(map.row_version(y) != rows[y as usize], bumped, "row {y}");
    }
    for x in 0..6 {
        let bumped = (1..=3).contains(&x);
        assert_eq!(map.col_version(x) != cols[x as usize], bumped, "col {x}");
    }
    // Edits on the edge clamp to the rows and columns that exist.
    map.set_label(0, 0, 2);
    assert_eq!(map.row_version(0), rows[0].wrapping_add(1));
    assert_eq!(map.row_version(1), rows[1].wrapping_add(1));
    assert_eq!(map.col_version(0), cols[0].wrapping_add(1));
}

#[test]
fn lowest_cost_ignores_obstacles() {
    let map = weighted(
        &[
            ",,##", //
            ",,..",
        ],
        two_costs(0.5, 3.0),
    );
    assert_eq!(map.lowest_cost(), 0.5);
}
