use std::cell::{Cell, RefCell};
use std::ptr::NonNull;

use skua_core::traits::{Expander, NodePool, WeightedEdge};
use skua_core::{Node, NodeAllocator, NodeMemberPointer, NodeRef};

use crate::{BitGrid, Grid};

/// State of a time-expanded grid search: a cell and the timestep it is
/// occupied at.
pub type TimeState = ((i32, i32), u32);

/// Node pool for the time-expanded grid, one slab of slots per timestep.
///
/// Slabs are appended as deeper timesteps are first touched and are retained
/// across resets, so repeated searches settle to a steady memory footprint
/// instead of reallocating per search.
pub struct TimeExpandedPool {
    search_number: u64,
    width: i32,
    height: i32,
    slabs: RefCell<Vec<Grid<Cell<(u64, *mut Node)>>>>,
    state_field: NodeMemberPointer<TimeState>,
    allocator: NodeAllocator,
}

impl TimeExpandedPool {
    pub fn new(
        allocator: NodeAllocator,
        state_field: NodeMemberPointer<TimeState>,
        width: i32,
        height: i32,
    ) -> Self {
        assert!(
            allocator.layout_id() == state_field.layout_id(),
            "mismatched layouts"
        );
        assert!(width > 0, "width must be positive");
        assert!(height > 0, "height must be positive");
        TimeExpandedPool {
            search_number: 1,
            width,
            height,
            slabs: RefCell::new(vec![]),
            state_field,
            allocator,
        }
    }

    pub fn reset(&mut self) {
        match self.search_number.checked_add(1) {
            Some(next) => self.search_number = next,
            None => {
                for slab in self.slabs.get_mut().iter_mut() {
                    for slot in slab.storage_mut() {
                        slot.set((0, std::ptr::null_mut()));
                    }
                }
                self.search_number = 1;
            }
        }
        self.allocator.reset();
    }

    #[track_caller]
    pub fn generate(&self, state: TimeState) -> NodeRef {
        let ((x, y), t) = state;
        assert!(x >= 0 && x < self.width, "x out of bounds");
        assert!(y >= 0 && y < self.height, "y out of bounds");
        let mut slabs = self.slabs.borrow_mut();
        while slabs.len() <= t as usize {
            slabs.push(Grid::new(self.width, self.height, |_, _| {
                Cell::new((0, std::ptr::null_mut()))
            }));
        }
        let slot = &slabs[t as usize][(x, y)];
        let (number, ptr) = slot.get();
        if number == self.search_number {
            // SAFETY: slots stamped with the current search number hold
            // nodes from the current allocator epoch.
            return unsafe { NodeRef::from_raw(NonNull::new_unchecked(ptr)) };
        }
        let node = self.allocator.new_node();
        node.set(self.state_field, state);
        slot.set((self.search_number, node.raw().as_ptr()));
        node
    }

    #[track_caller]
    pub fn get(&self, state: TimeState) -> Option<NodeRef> {
        let ((x, y), t) = state;
        assert!(x >= 0 && x < self.width, "x out of bounds");
        assert!(y >= 0 && y < self.height, "y out of bounds");
        let slabs = self.slabs.borrow();
        let slot = slabs.get(t as usize)?[(x, y)].get();
        if slot.0 == self.search_number {
            // SAFETY: as in generate.
            Some(unsafe { NodeRef::from_raw(NonNull::new_unchecked(slot.1)) })
        } else {
            None
        }
    }

    pub fn state_member(&self) -> NodeMemberPointer<TimeState> {
        self.state_field
    }

    /// Number of timestep slabs currently allocated.
    pub fn depth(&self) -> usize {
        self.slabs.borrow().len()
    }

    /// Bytes of memory in use by the pool.
    pub fn mem(&self) -> usize {
        let slabs = self.slabs.borrow();
        self.allocator.mem()
            + slabs.len()
                * self.width as usize
                * self.height as usize
                * std::mem::size_of::<(u64, *mut Node)>()
    }
}

impl NodePool for TimeExpandedPool {
    type State = TimeState;

    fn reset(&mut self) {
        TimeExpandedPool::reset(self)
    }

    fn generate(&self, state: TimeState) -> NodeRef {
        TimeExpandedPool::generate(self, state)
    }

    fn get(&self, state: TimeState) -> Option<NodeRef> {
        TimeExpandedPool::get(self, state)
    }
}

/// Target conditions for time-expanded searches.
#[derive(Clone, Copy, Debug)]
pub enum TimeTarget {
    /// Reach the cell at any timestep.
    Any((i32, i32)),
    /// Occupy the cell at exactly the given timestep.
    At((i32, i32), u32),
    /// Occupy the cell at or after the given timestep.
    AtOrAfter((i32, i32), u32),
}

impl TimeTarget {
    pub fn test(self, state: TimeState) -> bool {
        let (xy, t) = state;
        match self {
            TimeTarget::Any(target) => xy == target,
            TimeTarget::At(target, time) => xy == target && t == time,
            TimeTarget::AtOrAfter(target, time) => xy == target && t >= time,
        }
    }
}

/// Expander for single-agent moves on the time-expanded grid: the four
/// cardinal moves plus waiting in place, all unit cost, each advancing time
/// by one step.
pub struct TimeExpandedExpander<'a> {
    map: &'a BitGrid,
    pool: &'a TimeExpandedPool,
    horizon: u32,
}

impl<'a> TimeExpandedExpander<'a> {
    /// Creates an expander which refuses to step past `horizon`, bounding
    /// the otherwise infinite state space.
    pub fn new(map: &'a BitGrid, pool: &'a TimeExpandedPool, horizon: u32) -> Self {
        assert!(pool.width >= map.width(), "node pool too small");
        assert!(pool.height >= map.height(), "node pool too small");
        TimeExpandedExpander { map, pool, horizon }
    }
}

impl<'a> Expander<'a> for TimeExpandedExpander<'a> {
    type Edge = WeightedEdge<'a>;

    fn expand(&mut self, node: NodeRef<'a>, edges: &mut Vec<WeightedEdge<'a>>) {
        let ((x, y), t) = node.get(self.pool.state_member());
        if t >= self.horizon {
            return;
        }
        for (dx, dy) in [(0, -1), (1, 0), (0, 1), (-1, 0)] {
            if self.map.get(x + dx, y + dy) {
                edges.push(WeightedEdge {
                    successor: self.pool.generate(((x + dx, y + dy), t + 1)),
                    cost: 1.0,
                });
            }
        }
        edges.push(WeightedEdge {
            successor: self.pool.generate(((x, y), t + 1)),
            cost: 1.0,
        });
    }
}

#[test]
fn slabs_grow_and_persist() {
    let mut builder = skua_core::NodeBuilder::new();
    let state = builder.add_field(((-1, -1), 0));
    let mut pool = TimeExpandedPool::new(builder.build(), state, 4, 4);
    pool.generate(((1, 1), 0));
    pool.generate(((1, 1), 5));
    assert_eq!(pool.depth(), 6);
    assert!(pool.get(((1, 1), 5)).is_some());
    assert!(pool.get(((1, 1), 3)).is_none());
    pool.reset();
    assert_eq!(pool.depth(), 6);
    assert!(pool.get(((1, 1), 5)).is_none());
}

#[test]
fn target_tests() {
    let target = TimeTarget::Any((2, 2));
    assert!(target.test(((2, 2), 7)));
    assert!(!target.test(((2, 1), 7)));
    let target = TimeTarget::At((2, 2), 3);
    assert!(target.test(((2, 2), 3)));
    assert!(!target.test(((2, 2), 4)));
    let target = TimeTarget::AtOrAfter((2, 2), 3);
    assert!(!target.test(((2, 2), 2)));
    assert!(target.test(((2, 2), 9)));
}
