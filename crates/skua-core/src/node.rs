use std::alloc::Layout;
use std::marker::PhantomData;
use std::mem::MaybeUninit;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};

use bumpalo::Bump;

/// Identifier for a node layout produced by a [`NodeBuilder`].
///
/// Layout ids are globally unique for the lifetime of the process, which is
/// what makes the runtime layout checks on [`NodeRef::get`] and
/// [`NodeRef::set`] sound.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayoutId(u64);

impl LayoutId {
    fn next() -> LayoutId {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        let id = NEXT.fetch_add(1, Ordering::Relaxed);
        if id == u64::MAX {
            // The counter has wrapped; handing out a duplicate id would let
            // field accesses alias across unrelated layouts.
            std::process::abort();
        }
        LayoutId(id)
    }
}

/// Builder for a node layout.
///
/// Each search algorithm registers the per-node fields it needs (g value,
/// queue index, state, and so on) before the allocator is built. Every node
/// allocated from the resulting [`NodeAllocator`] carries all registered
/// fields, initialized to the defaults given at registration.
pub struct NodeBuilder {
    id: LayoutId,
    layout: Layout,
    init: Vec<u8>,
}

impl NodeBuilder {
    #[allow(clippy::new_without_default)]
    pub fn new() -> NodeBuilder {
        let layout = Layout::new::<NodeHeader>();
        let id = LayoutId::next();
        let mut init = vec![0; layout.size()];
        let header = NodeHeader {
            layout_id: id,
            parent: None,
        };
        // SAFETY: init covers exactly the header's bytes.
        unsafe {
            init.as_mut_ptr().cast::<NodeHeader>().write_unaligned(header);
        }
        NodeBuilder { id, layout, init }
    }

    /// Registers a field of type `T` with the given default value.
    ///
    /// The default is written into every node when it is allocated.
    pub fn add_field<T: Copy + 'static>(&mut self, default: T) -> NodeMemberPointer<T> {
        let (layout, offset) = self
            .layout
            .extend(Layout::new::<T>())
            .expect("node layout too large");
        self.layout = layout;
        self.init.resize(offset + std::mem::size_of::<T>(), 0);
        // SAFETY: the image was just resized to cover offset..offset+size.
        unsafe {
            self.init
                .as_mut_ptr()
                .add(offset)
                .cast::<T>()
                .write_unaligned(default);
        }
        NodeMemberPointer {
            layout_id: self.id,
            offset,
            _marker: PhantomData,
        }
    }

    pub fn build(self) -> NodeAllocator {
        NodeAllocator {
            id: self.id,
            layout: self.layout.pad_to_align(),
            init: self.init,
            arena: Bump::new(),
        }
    }

    /// Like [`NodeBuilder::build`], but reserves arena space for `capacity`
    /// nodes up front.
    pub fn build_with_capacity(self, capacity: usize) -> NodeAllocator {
        let layout = self.layout.pad_to_align();
        NodeAllocator {
            id: self.id,
            layout,
            init: self.init,
            arena: Bump::with_capacity(layout.size() * capacity),
        }
    }
}

/// Arena allocator for nodes of a single layout.
pub struct NodeAllocator {
    id: LayoutId,
    layout: Layout,
    init: Vec<u8>,
    arena: Bump,
}

impl NodeAllocator {
    /// The id of the layout this allocator produces nodes of.
    pub fn layout_id(&self) -> LayoutId {
        self.id
    }

    /// Allocates a new node with all fields set to their defaults.
    pub fn new_node(&self) -> NodeRef {
        let ptr = self.arena.alloc_layout(self.layout);
        // SAFETY: the allocation is at least init.len() bytes, and the init
        // image is a valid bit pattern for every field in the layout.
        unsafe {
            ptr.as_ptr()
                .copy_from_nonoverlapping(self.init.as_ptr(), self.init.len());
        }
        NodeRef {
            ptr: ptr.cast(),
            _marker: PhantomData,
        }
    }

    /// Frees all nodes allocated from this allocator.
    pub fn reset(&mut self) {
        self.arena.reset();
    }

    /// Bytes of memory held by the allocation arena.
    pub fn mem(&self) -> usize {
        self.arena.allocated_bytes()
    }
}

#[derive(Clone, Copy)]
#[repr(C)]
struct NodeHeader {
    layout_id: LayoutId,
    parent: Option<NonNull<Node>>,
}

/// An allocated node. Only ever handled through [`NodeRef`] or raw pointers;
/// the field data trails the header and is accessed via
/// [`NodeMemberPointer`]s.
#[repr(C)]
pub struct Node {
    header: NodeHeader,
    data: [MaybeUninit<u8>; 0],
}

/// Reference to a node allocated from a [`NodeAllocator`].
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    ptr: NonNull<Node>,
    _marker: PhantomData<&'a NodeAllocator>,
}

impl<'a> NodeRef<'a> {
    /// The id of the layout this node was allocated with.
    #[inline(always)]
    pub fn layout_id(self) -> LayoutId {
        self.header().layout_id
    }

    /// Reads the field `f` points to.
    ///
    /// Panics if `f` does not belong to this node's layout.
    #[inline(always)]
    #[track_caller]
    pub fn get<T: Copy + 'static>(self, f: NodeMemberPointer<T>) -> T {
        assert!(self.layout_id() == f.layout_id, "mismatched layouts");
        // SAFETY: layout check passed.
        unsafe { self.get_unchecked(f) }
    }

    /// Writes the field `f` points to.
    ///
    /// Panics if `f` does not belong to this node's layout.
    #[inline(always)]
    #[track_caller]
    pub fn set<T: Copy + 'static>(self, f: NodeMemberPointer<T>, value: T) {
        assert!(self.layout_id() == f.layout_id, "mismatched layouts");
        // SAFETY: layout check passed.
        unsafe { self.set_unchecked(f, value) }
    }

    /// Reads the field `f` points to without checking layouts.
    ///
    /// # Safety
    /// `f` must belong to this node's layout.
    #[inline(always)]
    #[cfg_attr(debug_assertions, track_caller)]
    pub unsafe fn get_unchecked<T: Copy + 'static>(self, f: NodeMemberPointer<T>) -> T {
        debug_assert!(self.layout_id() == f.layout_id, "mismatched layouts");
        // SAFETY: the offset is in-bounds for the layout and was produced
        // aligned by Layout::extend.
        unsafe { self.field_ptr(f.offset).cast::<T>().read() }
    }

    /// Writes the field `f` points to without checking layouts.
    ///
    /// # Safety
    /// `f` must belong to this node's layout.
    #[inline(always)]
    #[cfg_attr(debug_assertions, track_caller)]
    pub unsafe fn set_unchecked<T: Copy + 'static>(self, f: NodeMemberPointer<T>, value: T) {
        debug_assert!(self.layout_id() == f.layout_id, "mismatched layouts");
        // SAFETY: as for get_unchecked; T: Copy so no drop is skipped.
        unsafe { self.field_ptr(f.offset).cast::<T>().write(value) }
    }

    /// The node this node's parent pointer designates, if any.
    #[inline(always)]
    pub fn get_parent(self) -> Option<NodeRef<'a>> {
        self.header().parent.map(|ptr| NodeRef {
            ptr,
            _marker: PhantomData,
        })
    }

    #[inline(always)]
    pub fn set_parent(self, parent: Option<NodeRef<'a>>) {
        // SAFETY: the pointer is valid for writes and we never form a
        // reference to the header.
        unsafe {
            std::ptr::addr_of_mut!((*self.ptr.as_ptr()).header.parent)
                .write(parent.map(|p| p.ptr));
        }
    }

    /// Whether `self` and `other` refer to the same node.
    #[inline(always)]
    pub fn ptr_eq(self, other: NodeRef) -> bool {
        self.ptr == other.ptr
    }

    /// The raw pointer underlying this reference.
    #[inline(always)]
    pub fn raw(self) -> NonNull<Node> {
        self.ptr
    }

    /// Reconstitutes a reference from [`NodeRef::raw`].
    ///
    /// # Safety
    /// `ptr` must have been produced by [`NodeRef::raw`] on a node whose
    /// allocator is live and not reset for all of `'a`.
    #[inline(always)]
    pub unsafe fn from_raw(ptr: NonNull<Node>) -> NodeRef<'a> {
        NodeRef {
            ptr,
            _marker: PhantomData,
        }
    }

    #[inline(always)]
    fn header(self) -> NodeHeader {
        // SAFETY: every node starts with a valid header.
        unsafe { std::ptr::addr_of!((*self.ptr.as_ptr()).header).read() }
    }

    #[inline(always)]
    fn field_ptr(self, offset: usize) -> *mut u8 {
        self.ptr.as_ptr().cast::<u8>().wrapping_add(offset)
    }
}

/// Typed handle to a field of a node layout.
pub struct NodeMemberPointer<T> {
    layout_id: LayoutId,
    offset: usize,
    _marker: PhantomData<fn(T) -> T>,
}

impl<T> Clone for NodeMemberPointer<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for NodeMemberPointer<T> {}

impl<T> NodeMemberPointer<T> {
    /// The id of the layout this field belongs to.
    #[inline(always)]
    pub fn layout_id(self) -> LayoutId {
        self.layout_id
    }

    /// Whether `self` and `other` point into the same layout.
    #[inline(always)]
    pub fn same_layout<U>(self, other: NodeMemberPointer<U>) -> bool {
        self.layout_id == other.layout_id
    }
}

#[test]
fn fields_initialize_to_defaults() {
    let mut builder = NodeBuilder::new();
    let a = builder.add_field(42i32);
    let b = builder.add_field(f64::INFINITY);
    let c = builder.add_field((8i8, 16i16));
    let alloc = builder.build();
    let node = alloc.new_node();
    assert_eq!(node.get(a), 42);
    assert_eq!(node.get(b), f64::INFINITY);
    assert_eq!(node.get(c), (8, 16));
    node.set(a, -1);
    assert_eq!(node.get(a), -1);
    let other = alloc.new_node();
    assert_eq!(other.get(a), 42);
}

#[test]
fn parent_links() {
    let mut builder = NodeBuilder::new();
    let _ = builder.add_field(0u64);
    let alloc = builder.build();
    let a = alloc.new_node();
    let b = alloc.new_node();
    assert!(a.get_parent().is_none());
    b.set_parent(Some(a));
    assert!(b.get_parent().unwrap().ptr_eq(a));
    b.set_parent(None);
    assert!(b.get_parent().is_none());
}

#[test]
#[should_panic(expected = "mismatched layouts")]
fn mismatched_layout_access_panics() {
    let mut builder_a = NodeBuilder::new();
    let field_a = builder_a.add_field(0i32);
    let mut builder_b = NodeBuilder::new();
    let _field_b = builder_b.add_field(0i32);
    let alloc_b = builder_b.build();
    alloc_b.new_node().get(field_a);
}
