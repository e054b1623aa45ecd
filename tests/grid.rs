use std::f64::consts::SQRT_2;

use skua::grid::{
    octile_distance, BitGrid, EightConnectedExpander, GridPool, TimeExpandedExpander,
    TimeExpandedPool, TimeTarget,
};
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

fn time_search(
    map: &BitGrid,
    start: (i32, i32),
    target: TimeTarget,
    horizon: u32,
) -> Solution<((i32, i32), u32)> {
    let mut builder = NodeBuilder::new();
    let state = builder.add_field(((-1, -1), 0));
    let mut searcher: Searcher = Searcher::new(&mut builder);
    let mut queues = PriorityQueueFactory::new(&mut builder);
    let pool = TimeExpandedPool::new(builder.build(), state, map.width(), map.height());
    searcher.search(
        TimeExpandedExpander::new(map, &pool, horizon),
        queues.new_queue(searcher.ordering()),
        |_| 0.0,
        |node| target.test(node.get(state)),
        pool.generate((start, 0)),
        state,
        &SearchParameters::default(),
    )
}

#[test]
fn empty_grid_walks_the_diagonal() {
    let map = bitgrid(&[".....", ".....", ".....", ".....", "....."]);
    let solution = astar_grid(&map, (0, 0), (4, 4));
    assert_eq!(solution.cost, 4.0 * SQRT_2);
    assert_eq!(solution.path.len(), 5);
    assert_eq!(solution.path[0], (0, 0));
    assert_eq!(solution.path[4], (4, 4));
}

#[test]
fn corner_cutting_is_forbidden() {
    let map = bitgrid(&[
        ".#.", //
        ".#.",
        "...",
    ]);
    let solution = astar_grid(&map, (0, 0), (2, 0));
    // Squeezing diagonally past the wall end is illegal; the path has to
    // walk around the full wall.
    assert_eq!(solution.cost, 6.0);
    assert_eq!(solution.path.len(), 7);
}

#[test]
fn blocked_targets_are_unreachable() {
    let map = bitgrid(&[
        "...", //
        ".#.",
        "...",
    ]);
    let solution = astar_grid(&map, (0, 0), (1, 1));
    assert!(!solution.found());
    assert!(solution.path.is_empty());
}

#[test]
fn waiting_meets_a_deadline() {
    let map = bitgrid(&["...."]);
    let solution = time_search(&map, (0, 0), TimeTarget::At((2, 0), 5), 8);
    assert!(solution.found());
    assert_eq!(solution.cost, 5.0);
    assert_eq!(solution.path.len(), 6);
    assert_eq!(*solution.path.last().unwrap(), ((2, 0), 5));
    for pair in solution.path.windows(2) {
        let ((x1, y1), t1) = pair[0];
        let ((x2, y2), t2) = pair[1];
        assert_eq!(t2, t1 + 1);
        assert!((x2 - x1).abs() + (y2 - y1).abs() <= 1, "illegal move");
    }
    // Two cells of travel, so an arrival at t=5 spends exactly three waits.
    let waits = solution
        .path
        .windows(2)
        .filter(|pair| pair[0].0 == pair[1].0)
        .count();
    assert_eq!(waits, 3);
}

#[test]
fn target_tests_distinguish_arrival_times() {
    let map = bitgrid(&["...."]);
    let any = time_search(&map, (0, 0), TimeTarget::Any((3, 0)), 10);
    assert_eq!(any.cost, 3.0);
    let at = time_search(&map, (0, 0), TimeTarget::At((3, 0), 6), 10);
    assert_eq!(at.cost, 6.0);
    let after = time_search(&map, (0, 0), TimeTarget::AtOrAfter((3, 0), 5), 10);
    assert_eq!(after.cost, 5.0);
    // A deadline earlier than the cell can be reached is unsatisfiable.
    let too_early = time_search(&map, (0, 0), TimeTarget::At((3, 0), 2), 10);
    assert!(!too_early.found());
}

#[test]
fn the_horizon_bounds_reachable_times() {
    let map = bitgrid(&["..."]);
    let solution = time_search(&map, (0, 0), TimeTarget::At((2, 0), 6), 4);
    assert!(!solution.found());
    let solution = time_search(&map, (0, 0), TimeTarget::At((2, 0), 4), 4);
    assert_eq!(solution.cost, 4.0);
}
