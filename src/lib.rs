//! Referenceable Heaps and Search Trees for Rust
//!
//! This crate provides priority queues that hand out a stable [`HeapRef`] for every
//! inserted element, so the element can later be re-keyed or removed in place. They
//! are the building block of Dijkstra, Prim and similar algorithms, whose running
//! time depends directly on the cost of `decrease_key` and `extract_min`.
//!
//! # Features
//!
//! - **Pairing Heap**: O(1) insert, find_min and meld; O(log n) amortized extract_min
//!   and decrease_key (the tight decrease_key bound is conjectured, not proven)
//! - **Fibonacci Heap**: O(1) insert and meld; O(1) amortized decrease_key; O(log n)
//!   amortized extract_min
//! - **Binomial Heap**: O(log n) worst case for every operation
//! - **Red-Black Tree**: balanced search tree usable as a heap, with ordered queries
//!   and optional per-subtree summaries (size, minimum, maximum)
//! - **Splay Tree**: self-adjusting search tree with O(log n) amortized split and meld
//!
//! All structures implement [`ReferenceableHeap`]; the trees also implement
//! [`BinarySearchTree`]. Keys are ordered by a [`Comparator`], either the natural
//! order of the key type or a custom three-way comparison.
//!
//! # Handles
//!
//! A handle stays valid until its element is removed, across melds and splits.
//! Using a handle after removal, or with a structure that does not hold its element,
//! is reported as [`HeapError::InvalidHandle`] or [`HeapError::ForeignHandle`].
//!
//! # Example
//!
//! ```rust
//! use referenceable_heaps::fibonacci::FibonacciHeap;
//! use referenceable_heaps::ReferenceableHeap;
//!
//! let mut heap = FibonacciHeap::new();
//! let handle1 = heap.insert(5, "item1");
//! let _handle2 = heap.insert(3, "item2");
//! heap.decrease_key(&handle1, 1).unwrap();
//! assert_eq!(heap.peek(), Some((&1, &"item1")));
//! ```
//!
//! When the implementation is chosen at runtime, see [`builder`].

pub mod binomial;
mod bst;
pub mod builder;
pub mod compare;
pub mod fibonacci;
mod forest;
pub mod handle;
pub mod pairing;
pub mod red_black;
pub mod splay;
pub mod traits;

// Re-export the main types for convenience
pub use builder::{AnyHeap, AnyTree, HeapBuilder, HeapKind, TreeBuilder, TreeKind};
pub use compare::Comparator;
pub use handle::HeapRef;
pub use traits::{BinarySearchTree, HeapError, ReferenceableHeap, Result};
