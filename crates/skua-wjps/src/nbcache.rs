use ahash::AHashMap;
use enumset::EnumSet;
use skua_grid::Direction;

use crate::WeightedGrid;

/// Number of 3x3 patches over a two-cost alphabet (obstacle plus two
/// classes).
const PATCH_CONFIGURATIONS: usize = 3usize.pow(9);

/// Offsets of the nine patch cells in index order; the center is index 4.
const PATCH_OFFSETS: [(i32, i32); 9] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (0, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

const CENTER: usize = 4;

/// Cache of canonical successor sets for weighted 3x3 neighborhoods.
///
/// The successors of a cell depend only on the costs of its eight neighbors
/// and the direction it was entered from, so they can be computed once per
/// distinct neighborhood by running Dijkstra's algorithm over the patch and
/// keeping the moves the center is the canonical parent for. Patches are
/// rotated so the entry direction becomes north (or northwest for diagonal
/// entries) before the lookup, which makes all four rotations of a
/// neighborhood share one entry.
///
/// Two backing stores are available. [`NbCache::hash`] keys entries by the
/// patch labels and works for any cost table. [`NbCache::flat`] enumerates
/// every patch over a two-cost alphabet up front and answers lookups with
/// plain indexing, but refuses maps with more than two distinct costs.
#[derive(Debug, PartialEq)]
pub struct NbCache {
    store: Store,
}

#[derive(Debug, PartialEq)]
enum Store {
    Hash(AHashMap<([u8; 9], bool), EnumSet<Direction>>),
    Flat {
        classes: [u8; 256],
        class_costs: [f64; 2],
        table: Box<[EnumSet<Direction>]>,
    },
}

/// Error building a flat neighborhood table over a map whose labels use more
/// than two distinct traversal costs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TooManyCostClasses {
    pub distinct: usize,
}

impl std::fmt::Display for TooManyCostClasses {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "flat neighborhood tables support at most 2 distinct costs, but the map uses {}",
            self.distinct
        )
    }
}

impl std::error::Error for TooManyCostClasses {}

impl NbCache {
    /// Creates an empty cache keyed by neighborhood labels.
    pub fn hash() -> Self {
        NbCache {
            store: Store::Hash(AHashMap::new()),
        }
    }

    /// Creates a cache with a preallocated entry for every neighborhood over
    /// the costs `map` uses.
    pub fn flat(map: &WeightedGrid) -> Result<Self, TooManyCostClasses> {
        let mut costs: Vec<f64> = vec![];
        for y in 0..map.height() {
            for x in 0..map.width() {
                let label = map.label(x, y);
                if label != 0 {
                    let cost = map.cost_of(label);
                    if !costs.contains(&cost) {
                        costs.push(cost);
                    }
                }
            }
        }
        if costs.len() > 2 {
            return Err(TooManyCostClasses {
                distinct: costs.len(),
            });
        }
        costs.sort_by(f64::total_cmp);
        // Classify the whole label alphabet so later relabelings to unused
        // labels with a known cost still hit the table.
        let mut classes = [0; 256];
        for label in 1..=255 {
            let cost = map.cost_of(label as u8);
            if let Some(class) = costs.iter().position(|&c| c == cost) {
                classes[label] = class as u8 + 1;
            }
        }
        let class_costs = match costs[..] {
            [] => [f64::INFINITY; 2],
            [a] => [a, a],
            [a, b] => [a, b],
            _ => unreachable!(),
        };
        Ok(NbCache {
            store: Store::Flat {
                classes,
                class_costs,
                table: vec![EnumSet::all(); 2 * PATCH_CONFIGURATIONS].into_boxed_slice(),
            },
        })
    }

    /// The canonical successors of the cell at `x`, `y` when entered by a
    /// move in direction `going`. The cell and the neighbor the move came
    /// from must be traversable.
    pub fn successors(
        &mut self,
        map: &WeightedGrid,
        x: i32,
        y: i32,
        going: Direction,
    ) -> EnumSet<Direction> {
        debug_assert!(map.traversable(x, y), "entered an obstacle");
        let turns = (4 - going as u32 % 4) % 4;
        let diagonal = going.is_diagonal();
        let canonical = match &mut self.store {
            Store::Hash(cache) => {
                let mut patch = [0; 9];
                for (cell, &(dx, dy)) in patch.iter_mut().zip(&PATCH_OFFSETS) {
                    *cell = map.label(x + dx, y + dy);
                }
                let patch = rotate_patch(patch, turns);
                match cache.get(&(patch, diagonal)) {
                    Some(&successors) => successors,
                    None => {
                        let mut costs = [f64::INFINITY; 9];
                        for (cost, &label) in costs.iter_mut().zip(&patch) {
                            if label != 0 {
                                *cost = map.cost_of(label);
                            }
                        }
                        let successors = patch_successors(&costs, diagonal);
                        cache.insert((patch, diagonal), successors);
                        successors
                    }
                }
            }
            Store::Flat {
                classes,
                class_costs,
                table,
            } => {
                let mut patch = [0; 9];
                for (cell, &(dx, dy)) in patch.iter_mut().zip(&PATCH_OFFSETS) {
                    *cell = classes[map.label(x + dx, y + dy) as usize];
                }
                let patch = rotate_patch(patch, turns);
                let mut index = 0;
                for &class in patch.iter().rev() {
                    index = index * 3 + class as usize;
                }
                if diagonal {
                    index += PATCH_CONFIGURATIONS;
                }
                // An unentered slot holds the all-set sentinel, which real
                // successor sets never contain since no move continues
                // backwards.
                if table[index] == EnumSet::all() {
                    let mut costs = [f64::INFINITY; 9];
                    for (cost, &class) in costs.iter_mut().zip(&patch) {
                        if class != 0 {
                            *cost = class_costs[class as usize - 1];
                        }
                    }
                    table[index] = patch_successors(&costs, diagonal);
                }
                table[index]
            }
        };
        rotate_set(canonical, going as u32 % 4)
    }

    /// Bytes of memory in use by the cache.
    pub fn mem(&self) -> usize {
        std::mem::size_of::<Self>()
            + match &self.store {
                Store::Hash(cache) => {
                    cache.capacity()
                        * std::mem::size_of::<(([u8; 9], bool), EnumSet<Direction>)>()
                }
                Store::Flat { table, .. } => std::mem::size_of_val(&**table),
            }
    }
}

fn rotate_patch(patch: [u8; 9], quarter_turns: u32) -> [u8; 9] {
    let mut rotated = [0; 9];
    for (i, &(dx, dy)) in PATCH_OFFSETS.iter().enumerate() {
        let (mut dx, mut dy) = (dx, dy);
        for _ in 0..quarter_turns % 4 {
            (dx, dy) = (dy, -dx);
        }
        rotated[(dx + 1 + 3 * (dy + 1)) as usize] = patch[i];
    }
    rotated
}

fn rotate_set(set: EnumSet<Direction>, quarter_turns: u32) -> EnumSet<Direction> {
    set.iter().map(|dir| dir.rotate_ccw(quarter_turns)).collect()
}

/// Dijkstra search over a 3x3 patch from the cell the entering move came
/// from, with infinite cost marking obstacles. A direction is a canonical
/// successor if its cell is reachable and the center is its parent after
/// tie-breaking.
fn patch_successors(costs: &[f64; 9], diagonal: bool) -> EnumSet<Direction> {
    // The entry is canonicalized to north or northwest, so the move's source
    // is the south or southeast cell.
    let source = if diagonal { 8 } else { 7 };
    debug_assert!(costs[source].is_finite(), "entered from an obstacle");
    let mut g = [f64::INFINITY; 9];
    let mut parent = [usize::MAX; 9];
    let mut settled = [false; 9];
    g[source] = 0.0;
    loop {
        let mut current = usize::MAX;
        for i in 0..9 {
            if !settled[i] && g[i].is_finite() && (current == usize::MAX || g[i] < g[current]) {
                current = i;
            }
        }
        if current == usize::MAX {
            break;
        }
        settled[current] = true;
        for (next, step) in patch_moves(costs, current) {
            let new_g = g[current] + step;
            if new_g < g[next] {
                g[next] = new_g;
                parent[next] = current;
            } else if new_g == g[next] {
                // Equal-cost paths re-parent in favor of orthogonal
                // predecessors, then the center, so a cell reachable
                // orthogonally from the center is always claimed by it.
                let old_ortho = ortho_adjacent(parent[next], next);
                let new_ortho = ortho_adjacent(current, next);
                if new_ortho && !old_ortho || new_ortho == old_ortho && current == CENTER {
                    parent[next] = current;
                }
            }
        }
    }
    let mut successors = EnumSet::empty();
    for dir in EnumSet::<Direction>::all() {
        let (dx, dy) = dir.vector();
        let cell = (dx + 1 + 3 * (dy + 1)) as usize;
        if parent[cell] == CENTER {
            successors |= dir;
        }
    }
    successors
}

fn ortho_adjacent(from: usize, to: usize) -> bool {
    if from > 8 {
        return false;
    }
    let dx = (from % 3) as i32 - (to % 3) as i32;
    let dy = (from / 3) as i32 - (to / 3) as i32;
    dx.abs() + dy.abs() == 1
}

fn patch_moves(costs: &[f64; 9], from: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
    let x = (from % 3) as i32;
    let y = (from / 3) as i32;
    EnumSet::<Direction>::all().iter().filter_map(move |dir| {
        let (dx, dy) = dir.vector();
        let (to_x, to_y) = (x + dx, y + dy);
        if to_x < 0 || to_x > 2 || to_y < 0 || to_y > 2 {
            return None;
        }
        let to = (to_x + 3 * to_y) as usize;
        if costs[to].is_infinite() {
            return None;
        }
        let cost = if dir.is_diagonal() {
            let corner_a = (x + 3 * to_y) as usize;
            let corner_b = (to_x + 3 * y) as usize;
            if costs[corner_a].is_infinite() || costs[corner_b].is_infinite() {
                return None;
            }
            (costs[from] + costs[to] + costs[corner_a] + costs[corner_b])
                * std::f64::consts::SQRT_2
                / 4.0
        } else {
            (costs[from] + costs[to]) / 2.0
        };
        Some((to, cost))
    })
}

#[cfg(test)]
use crate::{two_costs, weighted};

#[test]
fn straight_travel_through_uniform_costs_continues_straight() {
    let map = weighted(
        &[
            "...", //
            "...",
            "...",
        ],
        two_costs(1.0, 3.0),
    );
    let mut cache = NbCache::hash();
    assert_eq!(
        cache.successors(&map, 1, 1, Direction::East),
        EnumSet::only(Direction::East),
    );
    assert_eq!(
        cache.successors(&map, 1, 1, Direction::SouthEast),
        Direction::South | Direction::East | Direction::SouthEast,
    );
}

#[test]
fn cost_boundaries_force_extra_successors() {
    let map = weighted(
        &[
            ",,,", //
            "...",
            "...",
        ],
        two_costs(1.0, 2.0),
    );
    let mut cache = NbCache::hash();
    // Heading east under the expensive row, the cheap detour around the
    // northeast corner must be kept alongside the straight move.
    assert_eq!(
        cache.successors(&map, 1, 1, Direction::East),
        Direction::East | Direction::NorthEast,
    );
}

#[test]
fn obstacles_block_corner_cutting() {
    let map = weighted(
        &[
            ".#.", //
            "...",
            "...",
        ],
        two_costs(1.0, 3.0),
    );
    let mut cache = NbCache::hash();
    // The northeast cell is reachable, but only around the obstacle through
    // the east neighbor, so it is not a successor of the center.
    let successors = cache.successors(&map, 1, 1, Direction::East);
    assert!(!successors.contains(Direction::NorthEast));
    assert!(successors.contains(Direction::East));
}

#[test]
fn flat_construction_rejects_more_than_two_costs() {
    let mut costs = two_costs(1.0, 2.0);
    costs[3] = 4.0;
    let map = weighted(
        &[
            "..,", //
            ".;.",
            ",..",
        ],
        costs,
    );
    assert_eq!(NbCache::flat(&map), Err(TooManyCostClasses { distinct: 3 }));
    let map = weighted(
        &[
            "..,", //
            "...",
            ",..",
        ],
        costs,
    );
    assert!(NbCache::flat(&map).is_ok());
}

#[test]
fn flat_and_hash_stores_agree() {
    let map = weighted(
        &[
            ".,,.#", //
            "..,..",
            "#....",
            ".,.#.",
            ".....",
        ],
        two_costs(1.0, 2.5),
    );
    let mut hash = NbCache::hash();
    let mut flat = NbCache::flat(&map).unwrap();
    for y in 0..map.height() {
        for x in 0..map.width() {
            if !map.traversable(x, y) {
                continue;
            }
            for going in EnumSet::<Direction>::all() {
                let (dx, dy) = going.vector();
                if !map.traversable(x - dx, y - dy) {
                    continue;
                }
                if going.is_diagonal()
                    && !(map.traversable(x - dx, y) && map.traversable(x, y - dy))
                {
                    continue;
                }
                assert_eq!(
                    hash.successors(&map, x, y, going),
                    flat.successors(&map, x, y, going),
                    "disagree at ({x}, {y}) going {going:?}",
                );
            }
        }
    }
}

impl NbCache {
    #[cfg(test)]
    fn flat_entries(&self) -> usize {
        match &self.store {
            Store::Hash(_) => 0,
            Store::Flat { table, .. } => {
                table.iter().filter(|&&set| set != EnumSet::all()).count()
            }
        }
    }
}

#[test]
fn flat_lookups_fill_their_slot_once() {
    let map = weighted(
        &[
            "...", //
            ".,.",
            "...",
        ],
        two_costs(1.0, 2.0),
    );
    let mut flat = NbCache::flat(&map).unwrap();
    flat.successors(&map, 1, 0, Direction::East);
    let entries = flat.flat_entries();
    assert_eq!(entries, 1);
    flat.successors(&map, 1, 0, Direction::East);
    assert_eq!(flat.flat_entries(), entries);
}
