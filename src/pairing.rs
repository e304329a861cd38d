//! Pairing Heap implementation
//!
//! A pairing heap is a single heap-ordered multiway tree with:
//! - O(1) insert, find_min and meld
//! - O(log n) amortized extract_min
//! - O(log n) amortized decrease_key
//!
//! The logarithmic bounds for `extract_min` and `decrease_key` are the known upper
//! bounds; the tight amortized cost of pairing heaps is a long-standing open
//! question (conjectured to be o(log n) for `decrease_key`), so treat them as
//! conjectured rather than proven tight.
//!
//! Trees are encoded child/sibling: every node links to its first child and its
//! next sibling, and `prev` links back to the previous sibling or, for a first
//! child, to the parent.

use std::marker::PhantomData;
use std::ptr::NonNull;
use std::rc::Rc;

use crate::compare::Comparator;
use crate::forest::{self, ForestNode, Link, PreOrder};
use crate::handle::{HeapRef, Owner};
use crate::traits::{HeapError, ReferenceableHeap, Result};

struct Node<K, V> {
    key: K,
    value: V,
    handle: HeapRef,
    child: Link<Node<K, V>>,
    next: Link<Node<K, V>>,
    prev: Link<Node<K, V>>, // parent or previous sibling
}

impl<K, V> ForestNode for Node<K, V> {
    type Key = K;
    type Value = V;

    fn first_child(&self) -> Link<Self> {
        self.child
    }

    fn next_sibling(&self) -> Link<Self> {
        self.next
    }

    fn handle(&self) -> &HeapRef {
        &self.handle
    }

    fn key(&self) -> &K {
        &self.key
    }

    fn value(&self) -> &V {
        &self.value
    }
}

/// Pairing Heap
///
/// # Example
///
/// ```rust
/// use referenceable_heaps::pairing::PairingHeap;
/// use referenceable_heaps::ReferenceableHeap;
///
/// let mut heap = PairingHeap::new();
/// let handle = heap.insert(5, "item");
/// heap.decrease_key(&handle, 1).unwrap();
/// assert_eq!(heap.peek(), Some((&1, &"item")));
/// ```
pub struct PairingHeap<K, V = ()> {
    root: Link<Node<K, V>>,
    len: usize,
    cmp: Comparator<K>,
    owner: Rc<Owner>,
    _phantom: PhantomData<Box<Node<K, V>>>,
}

/// Pre-order iterator over a [`PairingHeap`]
pub struct Iter<'a, K, V> {
    inner: PreOrder<'a, Node<K, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a HeapRef, &'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K: Ord, V> PairingHeap<K, V> {
    /// Creates an empty heap ordered by the natural order of `K`
    pub fn new() -> Self {
        Self::with_comparator(Comparator::natural())
    }
}

impl<K: Ord, V> Default for PairingHeap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Drop for PairingHeap<K, V> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<K, V> PairingHeap<K, V> {
    /// Creates an empty heap ordered by `cmp`
    pub fn with_comparator(cmp: Comparator<K>) -> Self {
        Self {
            root: None,
            len: 0,
            cmp,
            owner: Owner::new(),
            _phantom: PhantomData,
        }
    }

    fn node(&self, handle: &HeapRef) -> Result<NonNull<Node<K, V>>> {
        handle.resolve(&self.owner)
    }

    /// Links two detached trees, returning the new root
    ///
    /// On equal keys `a` stays the root.
    unsafe fn link(&self, a: NonNull<Node<K, V>>, b: NonNull<Node<K, V>>) -> NonNull<Node<K, V>> {
        let (parent, child) = if self.cmp.less(&(*b.as_ptr()).key, &(*a.as_ptr()).key) {
            (b, a)
        } else {
            (a, b)
        };

        let first = (*parent.as_ptr()).child;
        (*child.as_ptr()).next = first;
        (*child.as_ptr()).prev = Some(parent);
        if let Some(first) = first {
            (*first.as_ptr()).prev = Some(child);
        }
        (*parent.as_ptr()).child = Some(child);
        parent
    }

    /// Combines a sibling list into a single tree with the two-pass pairing rule
    unsafe fn merge_pairs(&self, first: Link<Node<K, V>>) -> Link<Node<K, V>> {
        let first = first?;
        if (*first.as_ptr()).next.is_none() {
            (*first.as_ptr()).prev = None;
            return Some(first);
        }

        // First pass: pair adjacent trees left to right
        let mut pairs = Vec::new();
        let mut current = Some(first);
        while let Some(a) = current {
            let b = (*a.as_ptr()).next;
            (*a.as_ptr()).next = None;
            (*a.as_ptr()).prev = None;

            match b {
                Some(b) => {
                    current = (*b.as_ptr()).next;
                    (*b.as_ptr()).next = None;
                    (*b.as_ptr()).prev = None;
                    pairs.push(self.link(a, b));
                }
                None => {
                    pairs.push(a);
                    current = None;
                }
            }
        }

        // Second pass: fold the pairs right to left
        let mut result = pairs.pop()?;
        while let Some(pair) = pairs.pop() {
            result = self.link(pair, result);
        }
        Some(result)
    }

    /// Cuts a non-root node (with its subtree) out of its sibling list
    unsafe fn cut(&mut self, node: NonNull<Node<K, V>>) {
        let Some(prev) = (*node.as_ptr()).prev else {
            return;
        };
        let next = (*node.as_ptr()).next;

        if (*prev.as_ptr()).child == Some(node) {
            (*prev.as_ptr()).child = next;
        } else {
            (*prev.as_ptr()).next = next;
        }
        if let Some(next) = next {
            (*next.as_ptr()).prev = Some(prev);
        }

        (*node.as_ptr()).next = None;
        (*node.as_ptr()).prev = None;
    }

    /// Adds a detached tree to the heap
    unsafe fn attach(&mut self, node: NonNull<Node<K, V>>) {
        self.root = Some(match self.root {
            Some(root) => self.link(root, node),
            None => node,
        });
        self.len += 1;
    }

    /// Takes a node out of the heap, leaving it without links
    unsafe fn detach(&mut self, node: NonNull<Node<K, V>>) {
        if self.root != Some(node) {
            self.cut(node);
        }
        let children = (*node.as_ptr()).child.take();
        let rest = self.merge_pairs(children);

        if self.root == Some(node) {
            self.root = rest;
        } else if let Some(rest) = rest {
            if let Some(root) = self.root {
                self.root = Some(self.link(root, rest));
            }
        }
        self.len -= 1;
    }

    unsafe fn free(node: NonNull<Node<K, V>>) -> (K, V) {
        let node = Box::from_raw(node.as_ptr());
        node.handle.release();
        (node.key, node.value)
    }
}

impl<K, V> ReferenceableHeap<K, V> for PairingHeap<K, V> {
    type Iter<'a>
        = Iter<'a, K, V>
    where
        Self: 'a,
        K: 'a,
        V: 'a;

    fn comparator(&self) -> &Comparator<K> {
        &self.cmp
    }

    fn len(&self) -> usize {
        self.len
    }

    fn insert(&mut self, key: K, value: V) -> HeapRef {
        let handle = HeapRef::new(&self.owner);
        let node = NonNull::from(Box::leak(Box::new(Node {
            key,
            value,
            handle: handle.clone(),
            child: None,
            next: None,
            prev: None,
        })));
        handle.bind(node);
        unsafe { self.attach(node) };
        handle
    }

    fn find_min(&mut self) -> Result<HeapRef> {
        let root = self.root.ok_or(HeapError::Empty)?;
        Ok(unsafe { (*root.as_ptr()).handle.clone() })
    }

    fn extract_min(&mut self) -> Result<(K, V)> {
        let root = self.root.ok_or(HeapError::Empty)?;
        unsafe {
            self.detach(root);
            Ok(Self::free(root))
        }
    }

    fn decrease_key(&mut self, handle: &HeapRef, new_key: K) -> Result<()> {
        let node = self.node(handle)?;
        unsafe {
            if self.cmp.less(&(*node.as_ptr()).key, &new_key) {
                return Err(HeapError::KeyNotDecreased);
            }
            (*node.as_ptr()).key = new_key;

            if let Some(root) = self.root {
                if root != node {
                    self.cut(node);
                    self.root = Some(self.link(root, node));
                }
            }
        }
        Ok(())
    }

    fn increase_key(&mut self, handle: &HeapRef, new_key: K) -> Result<()> {
        let node = self.node(handle)?;
        unsafe {
            if self.cmp.less(&new_key, &(*node.as_ptr()).key) {
                return Err(HeapError::KeyNotIncreased);
            }
            self.detach(node);
            (*node.as_ptr()).key = new_key;
            self.attach(node);
        }
        Ok(())
    }

    fn remove(&mut self, handle: &HeapRef) -> Result<(K, V)> {
        let node = self.node(handle)?;
        unsafe {
            self.detach(node);
            Ok(Self::free(node))
        }
    }

    fn meld(&mut self, other: &mut Self) -> Result<()> {
        if !self.cmp.same_as(&other.cmp) {
            return Err(HeapError::ComparatorMismatch);
        }
        let Some(other_root) = other.root.take() else {
            return Ok(());
        };

        self.root = Some(match self.root {
            Some(root) => unsafe { self.link(root, other_root) },
            None => other_root,
        });
        self.len += std::mem::take(&mut other.len);

        Owner::hand_over(&mut other.owner, &self.owner);
        Ok(())
    }

    fn clear(&mut self) {
        if let Some(root) = self.root.take() {
            unsafe { forest::free_forest(Some(root)) };
        }
        self.len = 0;
    }

    fn contains(&self, handle: &HeapRef) -> bool {
        self.node(handle).is_ok()
    }

    fn key(&self, handle: &HeapRef) -> Result<&K> {
        let node = self.node(handle)?;
        Ok(unsafe { &(*node.as_ptr()).key })
    }

    fn value(&self, handle: &HeapRef) -> Result<&V> {
        let node = self.node(handle)?;
        Ok(unsafe { &(*node.as_ptr()).value })
    }

    fn value_mut(&mut self, handle: &HeapRef) -> Result<&mut V> {
        let node = self.node(handle)?;
        Ok(unsafe { &mut (*node.as_ptr()).value })
    }

    fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: PreOrder::new(self.root, self.len),
        }
    }
}
