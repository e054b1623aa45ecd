//! Core machinery shared by every search algorithm in this workspace:
//! arena-allocated nodes with runtime-checked field layouts, an intrusive
//! priority queue with decrease-key, and the traits gluing node pools,
//! expanders, and open lists to the search engines.
#![warn(missing_docs)]
#![deny(unsafe_op_in_unsafe_fn)]

mod hash_pool;
mod node;
mod pqueue;
pub mod traits;

pub use hash_pool::HashPool;
pub use node::{LayoutId, Node, NodeAllocator, NodeBuilder, NodeMemberPointer, NodeRef};
pub use pqueue::{FieldComparator, PriorityQueue, PriorityQueueFactory, Reverse};
