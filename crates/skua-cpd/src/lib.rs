//! Compressed path databases: first-move oracles with run-length compressed
//! rows, and an admissible heuristic that walks them.

use std::io::{Read, Write};

mod first_move;
mod heuristic;
mod oracle;
mod order;

pub use first_move::FirstMoveSearcher;
pub use heuristic::CpdHeuristic;
pub use oracle::GraphCpd;
pub use order::GraphOrder;

/// Move index stored for ids that have no usable first move.
///
/// Edge ids must stay below this value so it can share the 6-bit move field
/// of a [`CpdRow`] entry.
pub const FIRST_MOVE_NONE: usize = 63;

/// One row of a compressed path database.
///
/// A row belongs to a single source and maps every target id to a first move.
/// Runs of consecutive ids sharing a move are stored as one entry each; the
/// entries are kept in Eytzinger order so lookups touch a cache-friendly
/// implicit binary tree.
#[derive(Debug)]
#[repr(transparent)]
pub struct CpdRow {
    runs: [CpdEntry],
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct CpdEntry(u32);

impl CpdEntry {
    fn start(self) -> usize {
        (self.0 & ((1 << 26) - 1)) as usize
    }

    fn edge(self) -> usize {
        (self.0 >> 26) as usize
    }
}

impl CpdRow {
    fn from_raw_box(slice: Box<[CpdEntry]>) -> Box<CpdRow> {
        // SAFETY: CpdRow is a transparent wrapper around [CpdEntry].
        unsafe { std::mem::transmute(slice) }
    }

    /// Compresses a row from per-id first-move bitmasks.
    ///
    /// Masks are indexed by target id; a zero mask means the id has no first
    /// move and maps to [`FIRST_MOVE_NONE`]. Runs of ids whose masks share a
    /// move are merged, and each entry keeps the lowest shared move.
    pub fn compress(first_move_bits: impl IntoIterator<Item = u64>) -> Box<CpdRow> {
        let mut iter = first_move_bits
            .into_iter()
            .map(|moves| if moves == 0 { 1 << FIRST_MOVE_NONE } else { moves });

        let mut runs = vec![];
        if let Some(first) = iter.next() {
            let mut current_id = 0;
            let mut current_moves = first;
            for (id, moves) in iter.chain(Some(0)).enumerate() {
                if current_moves & moves == 0 {
                    debug_assert!(current_id < 1 << 26, "id exceeds 26-bit row index");
                    runs.push(CpdEntry(current_id | current_moves.trailing_zeros() << 26));
                    current_id = id as u32 + 1;
                    current_moves = moves;
                } else {
                    current_moves &= moves;
                }
            }
        }

        let sorted = runs.clone();
        reorder_eytzinger(&sorted, &mut runs, &mut 0, 0);

        Self::from_raw_box(runs.into_boxed_slice())
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// The first move for target `id`, or [`FIRST_MOVE_NONE`].
    pub fn lookup(&self, id: usize) -> usize {
        let mut i = 0;
        let mut result = FIRST_MOVE_NONE;
        while i < self.runs.len() {
            if id < self.runs[i].start() {
                i = 2 * i + 1;
            } else {
                result = self.runs[i].edge();
                i = 2 * i + 2;
            }
        }
        result
    }

    pub fn save(&self, to: &mut impl Write) -> std::io::Result<()> {
        to.write_all(&(self.runs.len() as u32).to_le_bytes())?;
        for &run in &self.runs {
            to.write_all(&run.0.to_le_bytes())?;
        }
        Ok(())
    }

    pub fn load(from: &mut impl Read) -> std::io::Result<Box<Self>> {
        let mut bytes = [0; 4];
        from.read_exact(&mut bytes)?;
        let len = u32::from_le_bytes(bytes) as usize;
        let runs = (0..len)
            .map(|_| {
                from.read_exact(&mut bytes)?;
                Ok(CpdEntry(u32::from_le_bytes(bytes)))
            })
            .collect::<std::io::Result<_>>()?;
        Ok(Self::from_raw_box(runs))
    }

    /// Bytes of memory in use by the row.
    pub fn mem(&self) -> usize {
        self.runs.len() * std::mem::size_of::<CpdEntry>()
    }
}

impl PartialEq for CpdRow {
    fn eq(&self, other: &Self) -> bool {
        self.runs == other.runs
    }
}

pub(crate) fn invalid_data(msg: &'static str) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, msg)
}

/// Re-orders the sorted runs into Eytzinger order, allowing slightly faster
/// lookup than binary search. `next` is the cursor into `sorted`.
fn reorder_eytzinger(sorted: &[CpdEntry], into: &mut [CpdEntry], next: &mut usize, k: usize) {
    if k < into.len() {
        reorder_eytzinger(sorted, into, next, 2 * k + 1);
        into[k] = sorted[*next];
        *next += 1;
        reorder_eytzinger(sorted, into, next, 2 * k + 2);
    }
}

#[test]
fn compress_merges_shared_moves() {
    let row = CpdRow::compress([0b01, 0b11, 0b10, 0b10]);
    assert_eq!(row.len(), 2);
    assert_eq!(row.lookup(0), 0);
    assert_eq!(row.lookup(1), 0);
    assert_eq!(row.lookup(2), 1);
    assert_eq!(row.lookup(3), 1);
}

#[test]
fn zero_masks_map_to_none() {
    let row = CpdRow::compress([0b100, 0, 0, 0b1000]);
    assert_eq!(row.lookup(0), 2);
    assert_eq!(row.lookup(1), FIRST_MOVE_NONE);
    assert_eq!(row.lookup(2), FIRST_MOVE_NONE);
    assert_eq!(row.lookup(3), 3);
}

#[test]
fn lookup_walks_deeper_trees() {
    // 5 runs of 2 ids each; id i takes move i / 2.
    let masks: Vec<u64> = (0..10).map(|i| 1 << (i / 2)).collect();
    let row = CpdRow::compress(masks);
    assert_eq!(row.len(), 5);
    for id in 0..10 {
        assert_eq!(row.lookup(id), id / 2, "id {id}");
    }
}

#[test]
fn empty_row_has_no_moves() {
    let row = CpdRow::compress(std::iter::empty());
    assert!(row.is_empty());
    assert_eq!(row.lookup(0), FIRST_MOVE_NONE);
    assert_eq!(row.lookup(71), FIRST_MOVE_NONE);
}

#[test]
fn row_round_trips() {
    let row = CpdRow::compress((0..100u64).map(|i| 1 << (i / 13)));
    let mut bytes = vec![];
    row.save(&mut bytes).unwrap();
    let loaded = CpdRow::load(&mut &bytes[..]).unwrap();
    assert!(*loaded == *row);
    for id in 0..100 {
        assert_eq!(loaded.lookup(id), row.lookup(id));
    }

    let empty = CpdRow::compress(std::iter::empty());
    let mut bytes = vec![];
    empty.save(&mut bytes).unwrap();
    assert!(CpdRow::load(&mut &bytes[..]).unwrap().is_empty());
}
