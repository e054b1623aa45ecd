use std::cmp::Ordering;

use crate::node::{LayoutId, NodeBuilder, NodeMemberPointer, NodeRef};
use crate::traits::OpenList;

/// Comparator over node fields, used to order a [`PriorityQueue`].
///
/// # Safety
/// `le_unchecked` may only be called on nodes whose layout the comparator
/// reported compatible via `compatible_layout`.
pub unsafe trait FieldComparator: Copy {
    /// Whether `a` orders at-or-before `b`.
    ///
    /// # Safety
    /// Both nodes must belong to a layout this comparator is compatible with.
    unsafe fn le_unchecked(&self, a: NodeRef, b: NodeRef) -> bool;

    /// Whether this comparator may be used on nodes of the given layout.
    fn compatible_layout(&self, layout: LayoutId) -> bool;
}

// SAFETY: compatible_layout verifies the field belongs to the layout, which
// is exactly the precondition of get_unchecked.
unsafe impl<T: PartialOrd + Copy + 'static> FieldComparator for NodeMemberPointer<T> {
    unsafe fn le_unchecked(&self, a: NodeRef, b: NodeRef) -> bool {
        // SAFETY: guaranteed by the caller.
        let (a, b) = unsafe { (a.get_unchecked(*self), b.get_unchecked(*self)) };
        matches!(a.partial_cmp(&b), Some(Ordering::Less | Ordering::Equal))
    }

    fn compatible_layout(&self, layout: LayoutId) -> bool {
        self.layout_id() == layout
    }
}

/// Comparator adaptor which reverses the ordering of the inner comparator.
#[derive(Clone, Copy)]
pub struct Reverse<C>(pub C);

// SAFETY: defers to the inner comparator's compatibility check.
unsafe impl<C: FieldComparator> FieldComparator for Reverse<C> {
    unsafe fn le_unchecked(&self, a: NodeRef, b: NodeRef) -> bool {
        // SAFETY: guaranteed by the caller.
        unsafe { self.0.le_unchecked(b, a) }
    }

    fn compatible_layout(&self, layout: LayoutId) -> bool {
        self.0.compatible_layout(layout)
    }
}

macro_rules! tuple_comparator {
    ($($c:ident),+) => {
        // SAFETY: compatible only when every component comparator is.
        unsafe impl<$($c: FieldComparator),+> FieldComparator for ($($c,)+) {
            unsafe fn le_unchecked(&self, a: NodeRef, b: NodeRef) -> bool {
                #[allow(non_snake_case)]
                let ($($c,)+) = self;
                $(
                    // SAFETY: guaranteed by the caller.
                    unsafe {
                        if !$c.le_unchecked(a, b) {
                            return false;
                        }
                        if !$c.le_unchecked(b, a) {
                            return true;
                        }
                    }
                )+
                true
            }

            fn compatible_layout(&self, layout: LayoutId) -> bool {
                #[allow(non_snake_case)]
                let ($($c,)+) = self;
                $($c.compatible_layout(layout))&&+
            }
        }
    };
}

tuple_comparator!(C1);
tuple_comparator!(C1, C2);
tuple_comparator!(C1, C2, C3);
tuple_comparator!(C1, C2, C3, C4);

/// Registers the heap index field needed by [`PriorityQueue`]s.
///
/// All queues created from one factory share the same index field, so at most
/// one of them may hold any given node at a time. In exchange, re-relaxing a
/// queued node is a cheap decrease-key instead of a duplicate push.
pub struct PriorityQueueFactory {
    index: NodeMemberPointer<usize>,
}

impl PriorityQueueFactory {
    pub fn new(builder: &mut NodeBuilder) -> PriorityQueueFactory {
        PriorityQueueFactory {
            index: builder.add_field(usize::MAX),
        }
    }

    pub fn new_queue<'a, C: FieldComparator>(&mut self, cmp: C) -> PriorityQueue<'a, C> {
        assert!(
            cmp.compatible_layout(self.index.layout_id()),
            "mismatched layouts"
        );
        PriorityQueue {
            cmp,
            index: self.index,
            heap: vec![],
        }
    }
}

/// Binary heap of nodes with an intrusive index field for decrease-key.
pub struct PriorityQueue<'a, C> {
    cmp: C,
    index: NodeMemberPointer<usize>,
    heap: Vec<NodeRef<'a>>,
}

impl<'a, C: FieldComparator> PriorityQueue<'a, C> {
    /// Removes and returns the least node, or `None` if the queue is empty.
    pub fn pop(&mut self) -> Option<NodeRef<'a>> {
        if self.heap.is_empty() {
            return None;
        }
        let result = self.heap.swap_remove(0);
        if !self.heap.is_empty() {
            // SAFETY: heap membership implies a compatible layout.
            unsafe {
                self.heap[0].set_unchecked(self.index, 0);
                self.sift_down(0);
            }
        }
        Some(result)
    }

    /// Restores the heap property after `node`'s key improved, inserting the
    /// node if it is not currently queued.
    pub fn relax(&mut self, node: NodeRef<'a>) {
        assert!(
            self.cmp.compatible_layout(node.layout_id()),
            "mismatched layouts"
        );
        // SAFETY: layout check passed.
        unsafe {
            let index = node.get_unchecked(self.index);
            if self.heap.get(index).is_some_and(|&n| n.ptr_eq(node)) {
                self.sift_up(index);
            } else {
                node.set_unchecked(self.index, self.heap.len());
                self.heap.push(node);
                self.sift_up(self.heap.len() - 1);
            }
        }
    }

    /// # Safety
    /// `index` must be in-bounds, and all queued nodes must have a layout
    /// compatible with the comparator.
    unsafe fn sift_up(&mut self, mut index: usize) {
        // SAFETY: parent indexes are in-bounds whenever index is.
        unsafe {
            while index > 0 {
                let parent = (index - 1) / 2;
                if self.cmp.le_unchecked(self.heap[parent], self.heap[index]) {
                    break;
                }
                self.swap(parent, index);
                index = parent;
            }
        }
    }

    /// # Safety
    /// As for `sift_up`.
    unsafe fn sift_down(&mut self, mut index: usize) {
        // SAFETY: child indexes are checked against the heap length.
        unsafe {
            loop {
                let mut least = index;
                for child in [index * 2 + 1, index * 2 + 2] {
                    if child < self.heap.len()
                        && !self.cmp.le_unchecked(self.heap[least], self.heap[child])
                    {
                        least = child;
                    }
                }
                if least == index {
                    break;
                }
                self.swap(least, index);
                index = least;
            }
        }
    }

    /// # Safety
    /// Both indexes must be in-bounds.
    unsafe fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        // SAFETY: heap membership implies a compatible layout.
        unsafe {
            self.heap[a].set_unchecked(self.index, a);
            self.heap[b].set_unchecked(self.index, b);
        }
    }
}

impl<'a, C: FieldComparator> OpenList<'a> for PriorityQueue<'a, C> {
    fn relaxed(&mut self, node: NodeRef<'a>) {
        self.relax(node);
    }

    fn next(&mut self) -> Option<NodeRef<'a>> {
        self.pop()
    }

    fn peek(&self) -> Option<NodeRef<'a>> {
        self.heap.first().copied()
    }

    fn len(&self) -> usize {
        self.heap.len()
    }
}

#[test]
fn pops_in_order() {
    let mut builder = NodeBuilder::new();
    let key = builder.add_field(f64::INFINITY);
    let mut factory = PriorityQueueFactory::new(&mut builder);
    let alloc = builder.build();
    let mut queue = factory.new_queue(key);
    for k in [4.0, 1.5, 3.0, 0.5, 2.0] {
        let node = alloc.new_node();
        node.set(key, k);
        queue.relax(node);
    }
    let mut popped = vec![];
    while let Some(node) = queue.pop() {
        popped.push(node.get(key));
    }
    assert_eq!(popped, vec![0.5, 1.5, 2.0, 3.0, 4.0]);
}

#[test]
fn relax_decreases_key_in_place() {
    let mut builder = NodeBuilder::new();
    let key = builder.add_field(f64::INFINITY);
    let mut factory = PriorityQueueFactory::new(&mut builder);
    let alloc = builder.build();
    let mut queue = factory.new_queue(key);
    let a = alloc.new_node();
    let b = alloc.new_node();
    a.set(key, 10.0);
    b.set(key, 5.0);
    queue.relax(a);
    queue.relax(b);
    a.set(key, 1.0);
    queue.relax(a);
    assert_eq!(queue.len(), 2);
    assert!(queue.pop().unwrap().ptr_eq(a));
    assert!(queue.pop().unwrap().ptr_eq(b));
    assert!(queue.pop().is_none());
}
