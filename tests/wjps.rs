use std::f64::consts::SQRT_2;

use rand::prelude::*;
use rand_pcg::Pcg64;
use skua::grid::{octile_distance, BitGrid, EightConnectedExpander, GridPool};
use skua::search::{SearchParameters, Searcher, Solution};
use skua::traits::{Expander, WeightedEdge};
use skua::wjps::{NbCache, WeightedGrid, WjpsCaches, WjpsExpander};
use skua::{NodeBuilder, NodeMemberPointer, NodeRef, PriorityQueueFactory};

fn random_occupancy(rng: &mut Pcg64, width: i32, height: i32, open_chance: f64) -> Vec<Vec<bool>> {
    (0..height)
        .map(|_| (0..width).map(|_| rng.gen_bool(open_chance)).collect())
        .collect()
}

/// The same occupancy as a uniform-cost weighted map and as a bit grid.
fn uniform_pair(open: &[Vec<bool>]) -> (WeightedGrid, BitGrid) {
    let height = open.len() as i32;
    let width = open[0].len() as i32;
    let mut costs = [f64::NAN; 256];
    costs[1] = 1.0;
    let weighted = WeightedGrid::new(width, height, costs, |x, y| {
        open[y as usize][x as usize] as u8
    });
    let mut map = BitGrid::new(width, height);
    for y in 0..height {
        for x in 0..width {
            map.set(x, y, open[y as usize][x as usize]);
        }
    }
    (weighted, map)
}

fn random_traversable(rng: &mut Pcg64, map: &WeightedGrid) -> (i32, i32) {
    loop {
        let x = rng.gen_range(0..map.width());
        let y = rng.gen_range(0..map.height());
        if map.traversable(x, y) {
            return (x, y);
        }
    }
}

fn astar_grid(map: &BitGrid, start: (i32, i32), target: (i32, i32)) -> Solution<(i32, i32)> {
    let mut builder = NodeBuilder::new();
    let state = builder.add_field((-1, -1));
    let mut searcher: Searcher = Searcher::new(&mut builder);
    let mut queues = PriorityQueueFactory::new(&mut builder);
    let pool = GridPool::new(builder.build(), state, map.width(), map.height());
    searcher.search(
        EightConnectedExpander::new(map, &pool),
        queues.new_queue(searcher.ordering()),
        |node| octile_distance(node.get(state), target),
        |node| node.get(state) == target,
        pool.generate(start),
        state,
        &SearchParameters::default(),
    )
}

/// Plain one-step expander over a weighted grid, for reference searches.
struct WeightedGridExpander<'a> {
    map: &'a WeightedGrid,
    pool: &'a GridPool,
    state: NodeMemberPointer<(i32, i32)>,
}

impl<'a> Expander<'a> for WeightedGridExpander<'a> {
    type Edge = WeightedEdge<'a>;

    fn expand(&mut self, node: NodeRef<'a>, edges: &mut Vec<WeightedEdge<'a>>) {
        let (x, y) = node.get(self.state);
        if self.map.traversable(x, y - 1) {
            edges.push(WeightedEdge {
                successor: self.pool.generate((x, y - 1)),
                cost: self.map.vertical_cost(x, y - 1),
            });
        }
        if self.map.traversable(x, y + 1) {
            edges.push(WeightedEdge {
                successor: self.pool.generate((x, y + 1)),
                cost: self.map.vertical_cost(x, y),
            });
        }
        if self.map.traversable(x - 1, y) {
            edges.push(WeightedEdge {
                successor: self.pool.generate((x - 1, y)),
                cost: self.map.horizontal_cost(x - 1, y),
            });
        }
        if self.map.traversable(x + 1, y) {
            edges.push(WeightedEdge {
                successor: self.pool.generate((x + 1, y)),
                cost: self.map.horizontal_cost(x, y),
            });
        }
        for (dx, dy) in [(-1, -1), (-1, 1), (1, -1), (1, 1)] {
            if self.map.traversable(x + dx, y)
                && self.map.traversable(x, y + dy)
                && self.map.traversable(x + dx, y + dy)
            {
                edges.push(WeightedEdge {
                    successor: self.pool.generate((x + dx, y + dy)),
                    cost: self.map.diagonal_cost(x + dx.min(0), y + dy.min(0)),
                });
            }
        }
    }
}

fn reference_weighted(
    map: &WeightedGrid,
    start: (i32, i32),
    target: (i32, i32),
) -> Solution<(i32, i32)> {
    let mut builder = NodeBuilder::new();
    let state = builder.add_field((-1, -1));
    let mut searcher: Searcher = Searcher::new(&mut builder);
    let mut queues = PriorityQueueFactory::new(&mut builder);
    let pool = GridPool::new(builder.build(), state, map.width(), map.height());
    searcher.search(
        WeightedGridExpander {
            map,
            pool: &pool,
            state,
        },
        queues.new_queue(searcher.ordering()),
        |_| 0.0,
        |node| node.get(state) == target,
        pool.generate(start),
        state,
        &SearchParameters::default(),
    )
}

fn wjps_search(
    map: &WeightedGrid,
    searcher: &mut Searcher,
    queues: &mut PriorityQueueFactory,
    pool: &mut GridPool,
    caches: &mut WjpsCaches,
    state: NodeMemberPointer<(i32, i32)>,
    start: (i32, i32),
    target: (i32, i32),
) -> Solution<(i32, i32)> {
    pool.reset();
    let scale = map.lowest_cost();
    searcher.search(
        WjpsExpander::new(map, caches, &*pool, searcher.g(), start, target),
        queues.new_queue(searcher.ordering()),
        |node| octile_distance(node.get(state), target) * scale,
        |node| node.get(state) == target,
        pool.generate(start),
        state,
        &SearchParameters::default(),
    )
}

#[test]
fn uniform_terrain_matches_eight_connected_astar() {
    let mut rng = Pcg64::seed_from_u64(0x3a9);
    for (width, height, open_chance) in [(24, 18, 0.7), (40, 12, 0.85), (16, 16, 0.55)] {
        let open = random_occupancy(&mut rng, width, height, open_chance);
        let (weighted, map) = uniform_pair(&open);

        let mut builder = NodeBuilder::new();
        let state = builder.add_field((-1, -1));
        let mut searcher: Searcher = Searcher::new(&mut builder);
        let mut queues = PriorityQueueFactory::new(&mut builder);
        let mut pool = GridPool::new(builder.build(), state, width, height);
        let mut caches = WjpsCaches::new(&weighted, NbCache::hash());

        for _ in 0..15 {
            let start = random_traversable(&mut rng, &weighted);
            let target = random_traversable(&mut rng, &weighted);
            let reference = astar_grid(&map, start, target);
            let solution = wjps_search(
                &weighted,
                &mut searcher,
                &mut queues,
                &mut pool,
                &mut caches,
                state,
                start,
                target,
            );
            assert_eq!(
                reference.found(),
                solution.found(),
                "{start:?} -> {target:?}"
            );
            if reference.found() {
                assert!(
                    (reference.cost - solution.cost).abs() < 1e-9,
                    "{start:?} -> {target:?}: {} vs {}",
                    reference.cost,
                    solution.cost
                );
            }
        }
    }
}

#[test]
fn mixed_terrain_matches_a_plain_weighted_search() {
    let mut rng = Pcg64::seed_from_u64(0x77e);
    let mut costs = [f64::NAN; 256];
    costs[1] = 1.0;
    costs[2] = 2.5;
    for _ in 0..3 {
        let weighted = WeightedGrid::new(20, 14, costs, |_, _| {
            if rng.gen_bool(0.15) {
                0
            } else if rng.gen_bool(0.4) {
                2
            } else {
                1
            }
        });

        let mut builder = NodeBuilder::new();
        let state = builder.add_field((-1, -1));
        let mut searcher: Searcher = Searcher::new(&mut builder);
        let mut queues = PriorityQueueFactory::new(&mut builder);
        let mut pool = GridPool::new(builder.build(), state, 20, 14);
        let mut caches = WjpsCaches::new(&weighted, NbCache::hash());

        for _ in 0..12 {
            let start = random_traversable(&mut rng, &weighted);
            let target = random_traversable(&mut rng, &weighted);
            let reference = reference_weighted(&weighted, start, target);
            let solution = wjps_search(
                &weighted,
                &mut searcher,
                &mut queues,
                &mut pool,
                &mut caches,
                state,
                start,
                target,
            );
            assert_eq!(
                reference.found(),
                solution.found(),
                "{start:?} -> {target:?}"
            );
            if reference.found() {
                assert!(
                    (reference.cost - solution.cost).abs() < 1e-9,
                    "{start:?} -> {target:?}: {} vs {}",
                    reference.cost,
                    solution.cost
                );
            }
        }
    }
}

#[test]
fn flat_and_hash_stores_agree_end_to_end() {
    let mut rng = Pcg64::seed_from_u64(0xf1a7);
    let mut costs = [f64::NAN; 256];
    costs[1] = 1.0;
    costs[2] = 3.0;
    let weighted = WeightedGrid::new(18, 12, costs, |_, _| {
        if rng.gen_bool(0.2) {
            0
        } else if rng.gen_bool(0.3) {
            2
        } else {
            1
        }
    });

    let mut builder = NodeBuilder::new();
    let state = builder.add_field((-1, -1));
    let mut searcher: Searcher = Searcher::new(&mut builder);
    let mut queues = PriorityQueueFactory::new(&mut builder);
    let mut pool = GridPool::new(builder.build(), state, 18, 12);
    let mut hash_caches = WjpsCaches::new(&weighted, NbCache::hash());
    let mut flat_caches = WjpsCaches::new(&weighted, NbCache::flat(&weighted).unwrap());

    for _ in 0..10 {
        let start = random_traversable(&mut rng, &weighted);
        let target = random_traversable(&mut rng, &weighted);
        let hashed = wjps_search(
            &weighted,
            &mut searcher,
            &mut queues,
            &mut pool,
            &mut hash_caches,
            state,
            start,
            target,
        );
        let flat = wjps_search(
            &weighted,
            &mut searcher,
            &mut queues,
            &mut pool,
            &mut flat_caches,
            state,
            start,
            target,
        );
        assert_eq!(hashed.cost, flat.cost, "{start:?} -> {target:?}");
        assert_eq!(hashed.path, flat.path, "{start:?} -> {target:?}");
    }
}

#[test]
fn label_edits_reroute_later_searches() {
    let mut costs = [f64::NAN; 256];
    costs[1] = 1.0;
    let mut weighted = WeightedGrid::new(9, 5, costs, |_, _| 1);

    let mut builder = NodeBuilder::new();
    let state = builder.add_field((-1, -1));
    let mut searcher: Searcher = Searcher::new(&mut builder);
    let mut queues = PriorityQueueFactory::new(&mut builder);
    let mut pool = GridPool::new(builder.build(), state, 9, 5);
    let mut caches = WjpsCaches::new(&weighted, NbCache::hash());

    let open = wjps_search(
        &weighted,
        &mut searcher,
        &mut queues,
        &mut pool,
        &mut caches,
        state,
        (0, 2),
        (8, 2),
    );
    assert!((open.cost - 8.0).abs() < 1e-9);

    // Wall off the middle of the straight line; later searches must see the
    // edit through the same caches.
    weighted.set_label(4, 2, 0);
    let blocked = wjps_search(
        &weighted,
        &mut searcher,
        &mut queues,
        &mut pool,
        &mut caches,
        state,
        (0, 2),
        (8, 2),
    );
    let reference = reference_weighted(&weighted, (0, 2), (8, 2));
    assert!((blocked.cost - reference.cost).abs() < 1e-9);
    assert!((blocked.cost - (6.0 + 2.0 * SQRT_2)).abs() < 1e-9);

    weighted.set_label(4, 2, 1);
    let reopened = wjps_search(
        &weighted,
        &mut searcher,
        &mut queues,
        &mut pool,
        &mut caches,
        state,
        (0, 2),
        (8, 2),
    );
    assert!((reopened.cost - 8.0).abs() < 1e-9);
}
