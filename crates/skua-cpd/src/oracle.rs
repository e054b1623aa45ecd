use std::io::{Read, Write};
use std::ops::{AddAssign, Range};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use skua_core::{NodeBuilder, PriorityQueueFactory};
use skua_graph::{Graph, GraphExpander, GraphPool};

use crate::first_move::FirstMoveSearcher;
use crate::order::GraphOrder;
use crate::{invalid_data, CpdRow, FIRST_MOVE_NONE};

/// A compressed path database over a [`Graph`].
///
/// Holds one [`CpdRow`] per computed source node; looking up `(source,
/// target)` yields the id of an out-edge of `source` that begins an optimal
/// path to `target`. Rows index targets by the oracle's depth-first preorder,
/// which keeps runs long and rows small.
///
/// Rows must describe optimal first moves; [`crate::CpdHeuristic`] walks
/// move chains and relies on them terminating at the target.
#[derive(Debug, PartialEq)]
pub struct GraphCpd {
    order: GraphOrder,
    rows: Vec<Option<Box<CpdRow>>>,
}

impl GraphCpd {
    /// Creates an oracle for `graph` with no rows computed.
    pub fn new(graph: &Graph) -> GraphCpd {
        assert!(
            graph.num_nodes() < 1 << 26,
            "graph too large for 26-bit row indices"
        );
        GraphCpd {
            order: GraphOrder::dfs_preorder(graph),
            rows: empty_rows(graph.num_nodes()),
        }
    }

    /// Computes every row of the oracle.
    ///
    /// See [`GraphCpd::compute_range`] for the progress callback contract.
    pub fn compute(
        graph: &Graph,
        progress_callback: impl FnMut(usize, usize, Duration) + Send,
    ) -> GraphCpd {
        Self::compute_range(graph, 0..graph.num_nodes(), progress_callback)
    }

    /// Computes the rows of sources in `range`, leaving the rest empty.
    ///
    /// Sources are split into contiguous chunks, one rayon worker per chunk,
    /// each with its own search machinery. The progress callback observes
    /// `(rows done, rows total, time since start)` under a mutex, once per
    /// completed row.
    pub fn compute_range(
        graph: &Graph,
        range: Range<usize>,
        progress_callback: impl FnMut(usize, usize, Duration) + Send,
    ) -> GraphCpd {
        assert!(range.end <= graph.num_nodes(), "row range out of bounds");
        let mut cpd = GraphCpd::new(graph);
        let total = range.len();
        if total == 0 {
            return cpd;
        }

        let start_time = Instant::now();
        let progress = Mutex::new((0, progress_callback));

        let workers = num_cpus::get().min(total);
        let chunk_size = (total + workers - 1) / workers;
        let order = &cpd.order;

        let partials: Vec<GraphCpd> = (0..workers)
            .into_par_iter()
            .map(|worker| {
                let lo = range.start + worker * chunk_size;
                let hi = (lo + chunk_size).min(range.end);
                let mut partial = GraphCpd {
                    order: order.clone(),
                    rows: empty_rows(graph.num_nodes()),
                };

                let mut builder = NodeBuilder::new();
                let state = builder.add_field(u32::MAX);
                let mut searcher = FirstMoveSearcher::new(&mut builder);
                let mut queues = PriorityQueueFactory::new(&mut builder);
                let mut pool = GraphPool::new(builder.build(), state, graph.num_nodes());

                let mut first_moves = vec![0; graph.num_nodes()];
                for source in lo..hi {
                    pool.reset();
                    first_moves.fill(0);
                    searcher.search(
                        pool.generate(source as u32),
                        GraphExpander::new(graph, &pool),
                        queues.new_queue(searcher.g()),
                        |node, fm| first_moves[order.to_index(node.get(state))] = fm,
                    );
                    partial.rows[source] = Some(CpdRow::compress(first_moves.iter().copied()));

                    let mut progress = progress.lock().unwrap();
                    let (done, callback) = &mut *progress;
                    *done += 1;
                    callback(*done, total, start_time.elapsed());
                }

                partial
            })
            .collect();

        for partial in partials {
            cpd += partial;
        }
        cpd
    }

    /// Installs the row of `source` from per-target first-move bitmasks,
    /// indexed by the oracle's row order ([`GraphCpd::order`]). A zero mask
    /// marks a target as having no move.
    #[track_caller]
    pub fn add_row(&mut self, source: u32, first_move_bits: impl IntoIterator<Item = u64>) {
        self.rows[source as usize] = Some(CpdRow::compress(first_move_bits));
    }

    /// The id of an out-edge of `source` beginning an optimal path to
    /// `target`, or None if `target` is unreachable, equal to `source`, or
    /// the row was never computed.
    #[track_caller]
    pub fn get_first_move(&self, source: u32, target: u32) -> Option<usize> {
        let row = self.rows[source as usize].as_deref()?;
        let first_move = row.lookup(self.order.to_index(target));
        (first_move != FIRST_MOVE_NONE).then_some(first_move)
    }

    /// The target relabeling rows are indexed by.
    pub fn order(&self) -> &GraphOrder {
        &self.order
    }

    pub fn num_nodes(&self) -> usize {
        self.rows.len()
    }

    pub fn save(&self, to: &mut impl Write) -> std::io::Result<()> {
        self.order.save(to)?;
        let count = self.rows.iter().filter(|row| row.is_some()).count();
        to.write_all(&(count as u32).to_le_bytes())?;
        for (source, row) in self.rows.iter().enumerate() {
            if let Some(row) = row {
                to.write_all(&(source as u32).to_le_bytes())?;
                row.save(to)?;
            }
        }
        Ok(())
    }

    pub fn load(from: &mut impl Read) -> std::io::Result<GraphCpd> {
        let order = GraphOrder::load(from)?;
        let mut rows = empty_rows(order.num_ids());

        let mut bytes = [0; 4];
        from.read_exact(&mut bytes)?;
        let count = u32::from_le_bytes(bytes) as usize;
        for _ in 0..count {
            from.read_exact(&mut bytes)?;
            let source = u32::from_le_bytes(bytes) as usize;
            if source >= rows.len() {
                return Err(invalid_data("cpd row id out of range"));
            }
            if rows[source].is_some() {
                return Err(invalid_data("cpd row repeated"));
            }
            rows[source] = Some(CpdRow::load(from)?);
        }

        Ok(GraphCpd { order, rows })
    }

    /// Bytes of memory in use by the oracle.
    pub fn mem(&self) -> usize {
        self.order.mem()
            + self.rows.capacity() * std::mem::size_of::<Option<Box<CpdRow>>>()
            + self.rows.iter().flatten().map(|row| row.mem()).sum::<usize>()
    }
}

/// Merges the computed rows of `rhs` into `self`.
///
/// Both sides must order rows identically, and no row may be present in
/// both; this is the join step of the chunked parallel build.
impl AddAssign for GraphCpd {
    fn add_assign(&mut self, rhs: GraphCpd) {
        debug_assert!(self.order == rhs.order, "merged cpds order rows differently");
        assert_eq!(self.rows.len(), rhs.rows.len());
        for (dst, src) in self.rows.iter_mut().zip(rhs.rows) {
            if let Some(row) = src {
                debug_assert!(dst.is_none(), "merged cpds share a row");
                *dst = Some(row);
            }
        }
    }
}

fn empty_rows(num_nodes: usize) -> Vec<Option<Box<CpdRow>>> {
    (0..num_nodes).map(|_| None).collect()
}

#[cfg(test)]
fn undirected(graph: &mut Graph, a: u32, b: u32, cost: f64) {
    graph.add_edge(a, b, cost);
    graph.add_edge(b, a, cost);
}

#[cfg(test)]
fn path_graph() -> Graph {
    // 0 - 1 - 2 with unit edges, plus an isolated node 3.
    let mut graph = Graph::new();
    for i in 0..4 {
        graph.add_node(i, 0);
    }
    undirected(&mut graph, 0, 1, 1.0);
    undirected(&mut graph, 1, 2, 1.0);
    graph
}

#[test]
fn first_moves_point_along_the_path() {
    let graph = path_graph();
    let cpd = GraphCpd::compute(&graph, |_, _, _| {});

    // 0's only edge leads to 1 and starts the optimal path to both 1 and 2.
    assert_eq!(cpd.get_first_move(0, 1), Some(0));
    assert_eq!(cpd.get_first_move(0, 2), Some(0));
    // 1 reaches 0 by its first edge and 2 by its second.
    assert_eq!(cpd.get_first_move(1, 0), Some(0));
    assert_eq!(cpd.get_first_move(1, 2), Some(1));
    // No move for the row's own source or for unreachable targets.
    assert_eq!(cpd.get_first_move(0, 0), None);
    assert_eq!(cpd.get_first_move(0, 3), None);
    assert_eq!(cpd.get_first_move(3, 0), None);
}

#[test]
fn range_builds_merge_to_the_full_oracle() {
    let graph = path_graph();
    let full = GraphCpd::compute(&graph, |_, _, _| {});
    let mut left = GraphCpd::compute_range(&graph, 0..2, |_, _, _| {});
    let right = GraphCpd::compute_range(&graph, 2..4, |_, _, _| {});
    assert_eq!(left.get_first_move(2, 0), None, "row 2 not yet merged");
    left += right;
    assert!(left == full);
}

#[test]
fn progress_is_reported_per_row() {
    let graph = path_graph();
    let mut seen = vec![];
    GraphCpd::compute(&graph, |done, total, _| seen.push((done, total)));
    assert_eq!(seen, vec![(1, 4), (2, 4), (3, 4), (4, 4)]);
}

#[test]
fn oracle_round_trips() {
    let graph = path_graph();
    let cpd = GraphCpd::compute(&graph, |_, _, _| {});
    let mut bytes = vec![];
    cpd.save(&mut bytes).unwrap();
    let loaded = GraphCpd::load(&mut &bytes[..]).unwrap();
    assert!(loaded == cpd);
    for source in 0..4 {
        for target in 0..4 {
            assert_eq!(
                loaded.get_first_move(source, target),
                cpd.get_first_move(source, target)
            );
        }
    }

    // Partial oracles keep their missing rows through serialization.
    let partial = GraphCpd::compute_range(&graph, 1..3, |_, _, _| {});
    let mut bytes = vec![];
    partial.save(&mut bytes).unwrap();
    let loaded = GraphCpd::load(&mut &bytes[..]).unwrap();
    assert!(loaded == partial);
    assert_eq!(loaded.get_first_move(0, 1), None);
    assert_eq!(loaded.get_first_move(1, 2), Some(1));
}

#[test]
fn load_rejects_corrupt_oracles() {
    let graph = path_graph();
    let mut cpd = GraphCpd::new(&graph);
    cpd.add_row(2, [1, 1, 0, 1]);
    let bytes = {
        let mut bytes = vec![];
        cpd.save(&mut bytes).unwrap();
        bytes
    };
    // Layout: order (4 + 4 * 4 bytes), row count, then row 2's record.
    let count_at = 4 + 4 * 4;
    let record = bytes[count_at + 4..].to_vec();

    // The same row twice.
    let mut bad = bytes.clone();
    bad[count_at..count_at + 4].copy_from_slice(&2u32.to_le_bytes());
    bad.extend_from_slice(&record);
    let err = GraphCpd::load(&mut &bad[..]).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);

    // A row for a source beyond the graph.
    let mut bad = bytes.clone();
    bad[count_at + 4..count_at + 8].copy_from_slice(&99u32.to_le_bytes());
    let err = GraphCpd::load(&mut &bad[..]).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
}
