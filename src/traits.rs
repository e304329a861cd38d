//! Common traits for referenceable heaps and search trees
//!
//! This module provides a two-tier trait hierarchy:
//!
//! - [`ReferenceableHeap`]: a priority queue that hands out a [`HeapRef`] for every
//!   inserted element, so the element can later be re-keyed or removed in place
//! - [`BinarySearchTree`]: extends the heap contract with ordered queries
//!   (maximum, floor/ceiling, predecessor/successor) and splitting
//!
//! Consumers such as shortest-path or spanning-tree algorithms only rely on
//! `insert`, `decrease_key`, `extract_min` and `meld`, so any implementation can be
//! substituted for another.

use std::cmp::Ordering;

use thiserror::Error;

use crate::compare::Comparator;
use crate::handle::HeapRef;

/// Error type for heap and tree operations
///
/// Every check happens before the structure is touched, so an error never leaves
/// a heap in a partially modified state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HeapError {
    /// The structure has no elements
    #[error("the structure is empty")]
    Empty,
    /// `decrease_key` was given a key greater than the current one
    #[error("new key is greater than the current key")]
    KeyNotDecreased,
    /// `increase_key` was given a key smaller than the current one
    #[error("new key is smaller than the current key")]
    KeyNotIncreased,
    /// The two structures of a meld order their keys differently
    #[error("cannot meld structures with different comparators")]
    ComparatorMismatch,
    /// The two structures of a meld are different implementations
    #[error("cannot meld structures of different implementations")]
    ImplementationMismatch,
    /// The implementation does not provide the requested operation
    #[error("operation not supported by {0}")]
    Unsupported(&'static str),
    /// The handle's element was removed (or its structure cleared or dropped)
    #[error("handle is no longer valid (element was removed)")]
    InvalidHandle,
    /// The handle's element lives in another structure
    #[error("handle belongs to a different structure")]
    ForeignHandle,
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, HeapError>;

/// Priority queue that returns a stable handle for every inserted element
///
/// Keys are ordered by the structure's [`Comparator`], either the natural order of
/// `K` or a user supplied three-way comparison. Values are optional payload; use
/// `V = ()` when no value is needed.
///
/// # Example
///
/// ```rust
/// use referenceable_heaps::fibonacci::FibonacciHeap;
/// use referenceable_heaps::ReferenceableHeap;
///
/// let mut heap = FibonacciHeap::new();
/// let a = heap.insert(10, "a");
/// heap.insert(20, "b");
/// heap.decrease_key(&a, 5).unwrap();
/// assert_eq!(heap.peek(), Some((&5, &"a")));
/// assert_eq!(heap.extract_min(), Ok((5, "a")));
/// ```
pub trait ReferenceableHeap<K, V> {
    /// Iterator over `(handle, key, value)` of every element
    type Iter<'a>: Iterator<Item = (&'a HeapRef, &'a K, &'a V)>
    where
        Self: 'a,
        K: 'a,
        V: 'a;

    /// The comparator ordering this structure's keys
    fn comparator(&self) -> &Comparator<K>;

    /// Returns the number of elements
    fn len(&self) -> usize;

    /// Returns true if the structure holds no elements
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inserts an element, returning a handle to it
    ///
    /// # Time Complexity
    /// O(1) amortized for pairing and Fibonacci heaps, O(log n) for the others.
    fn insert(&mut self, key: K, value: V) -> HeapRef;

    /// Inserts a key with a default value
    fn insert_key(&mut self, key: K) -> HeapRef
    where
        V: Default,
    {
        self.insert(key, V::default())
    }

    /// Returns a handle to an element with minimal key, without removing it
    ///
    /// Ties are broken arbitrarily. Self-adjusting structures restructure on access,
    /// hence `&mut self`.
    ///
    /// # Errors
    /// Returns [`HeapError::Empty`] if there are no elements.
    fn find_min(&mut self) -> Result<HeapRef>;

    /// Removes an element with minimal key, returning its key and value
    ///
    /// # Errors
    /// Returns [`HeapError::Empty`] if there are no elements.
    fn extract_min(&mut self) -> Result<(K, V)>;

    /// Lowers the key of the referenced element
    ///
    /// An equal key is accepted and restores the heap order like any smaller key.
    ///
    /// # Errors
    /// [`HeapError::KeyNotDecreased`] if `new_key` is greater than the current key,
    /// or a handle error.
    fn decrease_key(&mut self, handle: &HeapRef, new_key: K) -> Result<()>;

    /// Raises the key of the referenced element
    ///
    /// None of the structures can raise a key in place, so the element is detached,
    /// re-keyed and attached again. The handle stays valid.
    ///
    /// # Errors
    /// [`HeapError::KeyNotIncreased`] if `new_key` is smaller than the current key,
    /// or a handle error.
    fn increase_key(&mut self, handle: &HeapRef, new_key: K) -> Result<()>;

    /// Removes the referenced element, returning its key and value
    fn remove(&mut self, handle: &HeapRef) -> Result<(K, V)>;

    /// Moves every element of `other` into `self`
    ///
    /// `other` is left empty but usable. Handles into `other` stay valid and now
    /// refer to elements of `self`. Melding a structure with itself is ruled out by
    /// the borrow checker.
    ///
    /// # Errors
    /// [`HeapError::ComparatorMismatch`] if the comparators are not the same.
    fn meld(&mut self, other: &mut Self) -> Result<()>
    where
        Self: Sized;

    /// Removes every element, invalidating all handles
    fn clear(&mut self);

    /// Returns true if the handle refers to an element of this structure
    fn contains(&self, handle: &HeapRef) -> bool;

    /// Returns the key of the referenced element
    fn key(&self, handle: &HeapRef) -> Result<&K>;

    /// Returns the value of the referenced element
    fn value(&self, handle: &HeapRef) -> Result<&V>;

    /// Returns the value of the referenced element mutably
    fn value_mut(&mut self, handle: &HeapRef) -> Result<&mut V>;

    /// Replaces the value of the referenced element, returning the old one
    fn set_value(&mut self, handle: &HeapRef, value: V) -> Result<V> {
        Ok(std::mem::replace(self.value_mut(handle)?, value))
    }

    /// Iterates over all elements
    ///
    /// Heaps yield their forest in pre-order, trees yield keys in order. Mutating
    /// the structure ends the iteration (enforced by the borrow).
    fn iter(&self) -> Self::Iter<'_>;

    /// Finds an element whose key equals `key`
    ///
    /// The default is a linear scan; search trees override it with an O(log n) descent.
    fn find(&mut self, key: &K) -> Option<HeapRef> {
        let cmp = self.comparator();
        self.iter()
            .find(|&(_, k, _)| cmp.compare(key, k) == Ordering::Equal)
            .map(|(handle, _, _)| handle.clone())
    }

    /// Returns the minimal key and its value, or `None` if empty
    fn peek(&mut self) -> Option<(&K, &V)> {
        let handle = self.find_min().ok()?;
        let this = &*self;
        Some((this.key(&handle).ok()?, this.value(&handle).ok()?))
    }
}

/// Binary search tree with heap capabilities and ordered queries
///
/// Queries by key return `None` when no element qualifies.
///
/// # Example
///
/// ```rust
/// use referenceable_heaps::splay::SplayTree;
/// use referenceable_heaps::{BinarySearchTree, ReferenceableHeap};
///
/// let mut tree: SplayTree<i32> = SplayTree::new();
/// for k in [1, 5, 10, 15, 20] {
///     tree.insert_key(k);
/// }
/// let upper = tree.split_greater(&10).unwrap();
/// assert_eq!(tree.len(), 3);
/// assert_eq!(upper.len(), 2);
/// ```
pub trait BinarySearchTree<K, V>: ReferenceableHeap<K, V> {
    /// Returns a handle to an element with maximal key
    ///
    /// # Errors
    /// Returns [`HeapError::Empty`] if there are no elements.
    fn find_max(&mut self) -> Result<HeapRef>;

    /// Removes an element with maximal key, returning its key and value
    fn extract_max(&mut self) -> Result<(K, V)>;

    /// Element with key equal to `key`, or else the greatest key smaller than it
    fn find_or_smaller(&mut self, key: &K) -> Option<HeapRef>;

    /// Element with key equal to `key`, or else the smallest key greater than it
    fn find_or_greater(&mut self, key: &K) -> Option<HeapRef>;

    /// Element with the greatest key strictly smaller than `key`
    fn find_smaller(&mut self, key: &K) -> Option<HeapRef>;

    /// Element with the smallest key strictly greater than `key`
    fn find_greater(&mut self, key: &K) -> Option<HeapRef>;

    /// In-order predecessor of the referenced element (may share its key)
    fn predecessor(&mut self, handle: &HeapRef) -> Result<Option<HeapRef>>;

    /// In-order successor of the referenced element (may share its key)
    fn successor(&mut self, handle: &HeapRef) -> Result<Option<HeapRef>>;

    /// Moves every element with key strictly smaller than `key` into a new tree
    fn split_smaller(&mut self, key: &K) -> Result<Self>
    where
        Self: Sized;

    /// Moves every element with key strictly greater than `key` into a new tree
    fn split_greater(&mut self, key: &K) -> Result<Self>
    where
        Self: Sized;

    /// Moves every element with key strictly greater than the referenced element's
    /// key into a new tree; the element and its duplicates stay in `self`
    fn split(&mut self, handle: &HeapRef) -> Result<Self>
    where
        Self: Sized;
}
