use std::cell::Cell;
use std::ptr::NonNull;

use skua_core::traits::NodePool;
use skua_core::{Node, NodeAllocator, NodeMemberPointer, NodeRef};

use crate::GraphStateMapper;

/// Node pool for a graph with a known id range, with constant-time generation.
///
/// Every id has a dedicated slot holding the search number it was last
/// generated in; bumping the pool's search number on reset invalidates all
/// slots at once.
pub struct GraphPool {
    search_number: u64,
    slots: Vec<Cell<(u64, *mut Node)>>,
    state_field: NodeMemberPointer<u32>,
    allocator: NodeAllocator,
}

impl GraphPool {
    /// Creates a pool covering ids `0..num_ids`.
    ///
    /// Panics if `state_field` does not belong to `allocator`'s layout.
    pub fn new(
        allocator: NodeAllocator,
        state_field: NodeMemberPointer<u32>,
        num_ids: usize,
    ) -> Self {
        assert!(
            allocator.layout_id() == state_field.layout_id(),
            "mismatched layouts"
        );
        GraphPool {
            search_number: 1,
            slots: (0..num_ids)
                .map(|_| Cell::new((0, std::ptr::null_mut())))
                .collect(),
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
                for slot in &mut self.slots {
                    slot.set((0, std::ptr::null_mut()));
                }
                self.search_number = 1;
            }
        }
        self.allocator.reset();
    }

    #[track_caller]
    pub fn generate(&self, state: u32) -> NodeRef {
        assert!((state as usize) < self.slots.len(), "node id out of bounds");
        // SAFETY: bounds just checked.
        unsafe { self.generate_unchecked(state) }
    }

    #[track_caller]
    pub fn get(&self, state: u32) -> Option<NodeRef> {
        assert!((state as usize) < self.slots.len(), "node id out of bounds");
        let (number, ptr) = self.slots[state as usize].get();
        if number == self.search_number {
            // SAFETY: slots stamped with the current search number hold
            // nodes from the current allocator epoch.
            Some(unsafe { NodeRef::from_raw(NonNull::new_unchecked(ptr)) })
        } else {
            None
        }
    }

    /// Bytes of memory in use by the pool.
    pub fn mem(&self) -> usize {
        self.allocator.mem() + self.slots.len() * std::mem::size_of::<(u64, *mut Node)>()
    }
}

impl NodePool for GraphPool {
    type State = u32;

    fn reset(&mut self) {
        GraphPool::reset(self)
    }

    fn generate(&self, state: u32) -> NodeRef {
        GraphPool::generate(self, state)
    }

    fn get(&self, state: u32) -> Option<NodeRef> {
        GraphPool::get(self, state)
    }
}

// SAFETY: generate_unchecked is sound for all ids below slots.len(), and
// state_field was layout-checked at construction.
unsafe impl GraphStateMapper for GraphPool {
    fn num_ids(&self) -> usize {
        self.slots.len()
    }

    fn state_member(&self) -> NodeMemberPointer<u32> {
        self.state_field
    }

    unsafe fn generate_unchecked(&self, state: u32) -> NodeRef {
        // SAFETY: guaranteed by the caller.
        let slot = unsafe { self.slots.get_unchecked(state as usize) };
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
    let state = builder.add_field(u32::MAX);
    let g = builder.add_field(f64::INFINITY);
    let mut pool = GraphPool::new(builder.build(), state, 16);
    let node = pool.generate(11);
    node.set(g, 3.5);
    assert!(pool.generate(11).ptr_eq(node));
    assert!(pool.get(11).is_some());
    assert!(pool.get(12).is_none());
    pool.reset();
    assert!(pool.get(11).is_none());
    let fresh = pool.generate(11);
    assert_eq!(fresh.get(g), f64::INFINITY);
    assert_eq!(fresh.get(state), 11);
}
