use std::cell::Cell;
use std::ptr::NonNull;

use skua_core::traits::NodePool;
use skua_core::{Node, NodeAllocator, NodeMemberPointer, NodeRef};

use crate::{Grid, GridStateMapper};

/// Node pool for a bounded grid, with constant-time generation.
///
/// Every cell has a dedicated slot holding the search number it was last
/// generated in; bumping the pool's search number on reset invalidates all
/// slots at once, so nodes never leak between searches.
pub struct GridPool {
    search_number: u64,
    map: Grid<Cell<(u64, *mut Node)>>,
    state_field: NodeMemberPointer<(i32, i32)>,
    allocator: NodeAllocator,
}

impl GridPool {
    /// Creates a pool covering `width` by `height` cells.
    ///
    /// Panics if `state_field` does not belong to `allocator`'s layout.
    pub fn new(
        allocator: NodeAllocator,
        state_field: NodeMemberPointer<(i32, i32)>,
        width: i32,
        height: i32,
    ) -> Self {
        assert!(
            allocator.layout_id() == state_field.layout_id(),
            "mismatched layouts"
        );
        GridPool {
            search_number: 1,
            map: Grid::new(width, height, |_, _| Cell::new((0, std::ptr::null_mut()))),
            state_field,
            allocator,
        }
    }

    pub fn reset(&mut self) {
        match self.search_number.checked_add(1) {
            Some(next) => self.search_number = next,
            None => {
                // The stamp wrapped; wipe every slot so none can collide
                // with a recycled search number.
                for slot in self.map.storage_mut() {
                    slot.set((0, std::ptr::null_mut()));
                }
                self.search_number = 1;
            }
        }
        self.allocator.reset();
    }

    #[track_caller]
    pub fn generate(&self, state: (i32, i32)) -> NodeRef {
        self.bounds_check(state);
        // SAFETY: bounds just checked.
        unsafe { self.generate_unchecked(state) }
    }

    #[track_caller]
    pub fn get(&self, state: (i32, i32)) -> Option<NodeRef> {
        self.bounds_check(state);
        let (x, y) = state;
        // SAFETY: bounds just checked.
        let (number, ptr) = unsafe { self.map.get_unchecked(x, y).get() };
        if number == self.search_number {
            // SAFETY: slots stamped with the current search number hold
            // nodes from the current allocator epoch.
            Some(unsafe { NodeRef::from_raw(NonNull::new_unchecked(ptr)) })
        } else {
            None
        }
    }

    pub fn width(&self) -> i32 {
        self.map.width()
    }

    pub fn height(&self) -> i32 {
        self.map.height()
    }

    /// Bytes of memory in use by the pool.
    pub fn mem(&self) -> usize {
        self.allocator.mem() + self.map.storage().len() * std::mem::size_of::<(u64, *mut Node)>()
    }

    #[inline(always)]
    #[track_caller]
    fn bounds_check(&self, (x, y): (i32, i32)) {
        assert!(x >= 0 && x < self.map.width(), "x out of bounds");
        assert!(y >= 0 && y < self.map.height(), "y out of bounds");
    }
}

impl NodePool for GridPool {
    type State = (i32, i32);

    fn reset(&mut self) {
        GridPool::reset(self)
    }

    fn generate(&self, state: (i32, i32)) -> NodeRef {
        GridPool::generate(self, state)
    }

    fn get(&self, state: (i32, i32)) -> Option<NodeRef> {
        GridPool::get(self, state)
    }
}

// SAFETY: generate_unchecked is sound for all cells of the map rectangle,
// and state_field was layout-checked at construction.
unsafe impl GridStateMapper for GridPool {
    fn width(&self) -> i32 {
        self.map.width()
    }

    fn height(&self) -> i32 {
        self.map.height()
    }

    fn state_member(&self) -> NodeMemberPointer<(i32, i32)> {
        self.state_field
    }

    unsafe fn generate_unchecked(&self, state: (i32, i32)) -> NodeRef {
        let (x, y) = state;
        // SAFETY: guaranteed by the caller.
        let slot = unsafe { self.map.get_unchecked(x, y) };
        let (number, ptr) = slot.get();
        if number == self.search_number {
            // SAFETY: as in get.
            return unsafe { NodeRef::from_raw(NonNull::new_unchecked(ptr)) };
        }
        let node = self.allocator.new_node();
        // SAFETY: layout compatibility was checked at construction.
        unsafe {
            node.set_unchecked(self.state_field, state);
        }
        slot.set((self.search_number, node.raw().as_ptr()));
        node
    }
}

#[test]
fn searches_are_isolated() {
    let mut builder = skua_core::NodeBuilder::new();
    let state = builder.add_field((-1, -1));
    let g = builder.add_field(f64::INFINITY);
    let mut pool = GridPool::new(builder.build(), state, 8, 8);
    let node = pool.generate((3, 4));
    node.set(g, 12.5);
    assert!(pool.generate((3, 4)).ptr_eq(node));
    assert!(pool.get((3, 4)).is_some());
    assert!(pool.get((4, 3)).is_none());
    pool.reset();
    assert!(pool.get((3, 4)).is_none());
    let fresh = pool.generate((3, 4));
    assert_eq!(fresh.get(g), f64::INFINITY);
    assert_eq!(fresh.get(state), (3, 4));
}
