use std::f64::consts::SQRT_2;

use rand::prelude::*;
use rand_pcg::Pcg64;
use skua::grid::{octile_distance, BitGrid, EightConnectedExpander, GridPool};
use skua::jps::{JpsExpander, JpsGrid};
use skua::search::{SearchParameters, Searcher, Solution};
use skua::{NodeBuilder, PriorityQueueFactory};

fn bitgrid(rows: &[&str]) -> BitGrid {
    let mut map = BitGrid::new(rows[0].len() as i32, rows.len() as i32);
    for (y, row) in rows.iter().enumerate() {
        for (x, cell) in row.bytes().enumerate() {
            map.set(x as i32, y as i32, cell == b'.');
        }
    }
    map
}

fn random_map(rng: &mut Pcg64, width: i32, height: i32, open_chance: f64) -> BitGrid {
    let mut map = BitGrid::new(width, height);
    for y in 0..height {
        for x in 0..width {
            map.set(x, y, rng.gen_bool(open_chance));
        }
    }
    map
}

fn random_open_cell(rng: &mut Pcg64, map: &BitGrid) -> (i32, i32) {
    loop {
        let x = rng.gen_range(0..map.width());
        let y = rng.gen_range(0..map.height());
        if map.get(x, y) {
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

fn astar_jps(map: &JpsGrid, start: (i32, i32), target: (i32, i32)) -> Solution<(i32, i32)> {
    let mut builder = NodeBuilder::new();
    let state = builder.add_field((-1, -1));
    let mut searcher: Searcher = Searcher::new(&mut builder);
    let mut queues = PriorityQueueFactory::new(&mut builder);
    let pool = GridPool::new(builder.build(), state, map.map().width(), map.map().height());
    searcher.search(
        JpsExpander::new(map, &pool, target),
        queues.new_queue(searcher.ordering()),
        |node| octile_distance(node.get(state), target),
        |node| node.get(state) == target,
        pool.generate(start),
        state,
        &SearchParameters::default(),
    )
}

#[test]
fn jump_point_search_matches_eight_connected_astar() {
    let mut rng = Pcg64::seed_from_u64(0x9a117);
    for (width, height, open_chance) in [(70, 24, 0.75), (100, 16, 0.85), (40, 40, 0.6)] {
        let map: JpsGrid = random_map(&mut rng, width, height, open_chance).into();
        for _ in 0..12 {
            let start = random_open_cell(&mut rng, map.map());
            let target = random_open_cell(&mut rng, map.map());
            let reference = astar_grid(map.map(), start, target);
            let jps = astar_jps(&map, start, target);
            assert_eq!(reference.found(), jps.found(), "{start:?} -> {target:?}");
            if reference.found() {
                assert!(
                    (reference.cost - jps.cost).abs() < 1e-9,
                    "{start:?} -> {target:?}: {} vs {}",
                    reference.cost,
                    jps.cost
                );
                assert_eq!(*jps.path.first().unwrap(), start);
                assert_eq!(*jps.path.last().unwrap(), target);
            }
        }
    }
}

#[test]
fn the_target_is_never_jumped_past() {
    let map = bitgrid(&[
        "..........",
        "..........",
        "..........",
        "..........",
        "..........",
    ]);
    let map = JpsGrid::from(map);
    // In open space the scans run all the way to the border and find no jump
    // points; the target must still be reached exactly.
    let solution = astar_jps(&map, (1, 2), (8, 2));
    assert_eq!(solution.cost, 7.0);
    assert_eq!(solution.path, vec![(1, 2), (8, 2)]);
    let solution = astar_jps(&map, (2, 4), (6, 0));
    assert_eq!(solution.cost, 4.0 * SQRT_2);
}

#[test]
fn straight_runs_cross_word_seams() {
    let mut map = BitGrid::new(100, 3);
    for y in 0..3 {
        for x in 0..100 {
            map.set(x, y, true);
        }
    }
    map.set(62, 0, false);
    map.set(75, 2, false);
    let map = JpsGrid::from(map);
    let solution = astar_jps(&map, (10, 1), (90, 1));
    assert_eq!(solution.cost, 80.0);
    let solution = astar_jps(&map, (90, 1), (10, 1));
    assert_eq!(solution.cost, 80.0);
}

#[test]
fn dead_end_corridors_are_walked_to_the_end() {
    let map = bitgrid(&[
        "########", //
        "#......#",
        "########",
    ]);
    let map = JpsGrid::from(map);
    let solution = astar_jps(&map, (1, 1), (6, 1));
    assert_eq!(solution.cost, 5.0);
    assert_eq!(solution.path, vec![(1, 1), (6, 1)]);
}
