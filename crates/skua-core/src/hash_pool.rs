use std::cell::RefCell;
use std::hash::Hash;
use std::ptr::NonNull;

use ahash::AHashMap;

use crate::node::{Node, NodeAllocator, NodeMemberPointer, NodeRef};
use crate::traits::NodePool;

/// Node pool for state spaces too large or irregular to enumerate up front.
///
/// States are mapped to nodes through a hash table which is cleared on reset,
/// so a fresh search never observes nodes from an earlier one.
pub struct HashPool<S> {
    map: RefCell<AHashMap<S, NonNull<Node>>>,
    state_field: NodeMemberPointer<S>,
    allocator: NodeAllocator,
}

impl<S: Copy + Hash + Eq + 'static> HashPool<S> {
    /// Creates a pool allocating from `allocator` and storing each node's
    /// state in `state_field`.
    ///
    /// Panics if `state_field` does not belong to `allocator`'s layout.
    pub fn new(allocator: NodeAllocator, state_field: NodeMemberPointer<S>) -> Self {
        assert!(
            allocator.layout_id() == state_field.layout_id(),
            "mismatched layouts"
        );
        HashPool {
            map: RefCell::new(AHashMap::new()),
            state_field,
            allocator,
        }
    }

    pub fn reset(&mut self) {
        self.map.get_mut().clear();
        self.allocator.reset();
    }

    pub fn generate(&self, state: S) -> NodeRef {
        let mut map = self.map.borrow_mut();
        if let Some(&ptr) = map.get(&state) {
            // SAFETY: the pointer was produced by our allocator, which is
            // only reset together with clearing the map.
            return unsafe { NodeRef::from_raw(ptr) };
        }
        let node = self.allocator.new_node();
        node.set(self.state_field, state);
        map.insert(state, node.raw());
        node
    }

    pub fn get(&self, state: S) -> Option<NodeRef> {
        self.map
            .borrow()
            .get(&state)
            // SAFETY: as in generate.
            .map(|&ptr| unsafe { NodeRef::from_raw(ptr) })
    }

    /// The field nodes of this pool store their state in.
    pub fn state_member(&self) -> NodeMemberPointer<S> {
        self.state_field
    }

    /// Bytes of memory in use by the pool.
    pub fn mem(&self) -> usize {
        self.allocator.mem()
            + self.map.borrow().capacity() * std::mem::size_of::<(S, NonNull<Node>)>()
    }
}

impl<S: Copy + Hash + Eq + 'static> NodePool for HashPool<S> {
    type State = S;

    fn reset(&mut self) {
        HashPool::reset(self)
    }

    fn generate(&self, state: S) -> NodeRef {
        HashPool::generate(self, state)
    }

    fn get(&self, state: S) -> Option<NodeRef> {
        HashPool::get(self, state)
    }
}

#[test]
fn same_state_same_node() {
    let mut builder = crate::NodeBuilder::new();
    let state = builder.add_field((-1i32, -1i32));
    let g = builder.add_field(f64::INFINITY);
    let mut pool = HashPool::new(builder.build(), state);
    let a = pool.generate((4, 2));
    a.set(g, 7.0);
    let again = pool.generate((4, 2));
    assert!(a.ptr_eq(again));
    assert_eq!(again.get(g), 7.0);
    assert!(pool.get((0, 0)).is_none());
    pool.reset();
    assert!(pool.get((4, 2)).is_none());
    let fresh = pool.generate((4, 2));
    assert_eq!(fresh.get(g), f64::INFINITY);
}
