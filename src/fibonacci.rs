//! Fibonacci Heap implementation
//!
//! A Fibonacci heap is a lazily consolidated forest of heap-ordered trees with:
//! - O(1) insert, find_min and meld
//! - O(1) amortized decrease_key
//! - O(log n) amortized extract_min and remove
//!
//! # Algorithm Overview
//!
//! Roots are kept in a doubly linked list and the minimum root is tracked
//! separately. Inserting and melding only append to the root list; all the
//! restructuring is deferred to removal, which consolidates roots of equal degree
//! until every degree appears at most once.
//!
//! **Cascading cuts**: a node that loses a child is marked; losing a second child
//! cuts it from its parent as well. This keeps the size of a subtree exponential in
//! its degree, which bounds the degrees by O(log n).

use std::marker::PhantomData;
use std::ptr::NonNull;
use std::rc::Rc;

use log::trace;
use smallvec::SmallVec;

use crate::compare::Comparator;
use crate::forest::{self, ForestNode, Link, PreOrder};
use crate::handle::{HeapRef, Owner};
use crate::traits::{HeapError, ReferenceableHeap, Result};

/// Internal node structure
///
/// Sibling lists (root list included) are linear, doubly linked through `prev`
/// and `next`.
struct Node<K, V> {
    key: K,
    value: V,
    handle: HeapRef,
    parent: Link<Node<K, V>>,
    child: Link<Node<K, V>>,
    prev: Link<Node<K, V>>,
    next: Link<Node<K, V>>,
    degree: usize,
    marked: bool,
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

/// Fibonacci Heap
///
/// # Example
///
/// ```rust
/// use referenceable_heaps::fibonacci::FibonacciHeap;
/// use referenceable_heaps::ReferenceableHeap;
///
/// let mut heap = FibonacciHeap::new();
/// let handle = heap.insert(5, "item");
/// heap.decrease_key(&handle, 1).unwrap();
/// assert_eq!(heap.peek(), Some((&1, &"item")));
/// ```
pub struct FibonacciHeap<K, V = ()> {
    begin: Link<Node<K, V>>,
    end: Link<Node<K, V>>,
    min: Link<Node<K, V>>,
    len: usize,
    cmp: Comparator<K>,
    owner: Rc<Owner>,
    _phantom: PhantomData<Box<Node<K, V>>>,
}

/// Pre-order iterator over a [`FibonacciHeap`]
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

impl<K: Ord, V> FibonacciHeap<K, V> {
    /// Creates an empty heap ordered by the natural order of `K`
    pub fn new() -> Self {
        Self::with_comparator(Comparator::natural())
    }
}

impl<K: Ord, V> Default for FibonacciHeap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Drop for FibonacciHeap<K, V> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<K, V> FibonacciHeap<K, V> {
    /// Creates an empty heap ordered by `cmp`
    pub fn with_comparator(cmp: Comparator<K>) -> Self {
        Self {
            begin: None,
            end: None,
            min: None,
            len: 0,
            cmp,
            owner: Owner::new(),
            _phantom: PhantomData,
        }
    }

    fn node(&self, handle: &HeapRef) -> Result<NonNull<Node<K, V>>> {
        handle.resolve(&self.owner)
    }

    unsafe fn less(&self, a: NonNull<Node<K, V>>, b: NonNull<Node<K, V>>) -> bool {
        self.cmp.less(&(*a.as_ptr()).key, &(*b.as_ptr()).key)
    }

    unsafe fn update_min(&mut self, node: NonNull<Node<K, V>>) {
        match self.min {
            Some(min) if !self.less(node, min) => {}
            _ => self.min = Some(node),
        }
    }

    /// Appends a detached node to the root list
    unsafe fn add_root(&mut self, node: NonNull<Node<K, V>>) {
        (*node.as_ptr()).parent = None;
        (*node.as_ptr()).next = None;
        (*node.as_ptr()).prev = self.end;
        match self.end {
            Some(end) => (*end.as_ptr()).next = Some(node),
            None => self.begin = Some(node),
        }
        self.end = Some(node);
    }

    unsafe fn unlink_root(&mut self, node: NonNull<Node<K, V>>) {
        let prev = (*node.as_ptr()).prev.take();
        let next = (*node.as_ptr()).next.take();
        match prev {
            Some(prev) => (*prev.as_ptr()).next = next,
            None => self.begin = next,
        }
        match next {
            Some(next) => (*next.as_ptr()).prev = prev,
            None => self.end = prev,
        }
    }

    /// Removes a non-root node (with its subtree) from its parent's child list
    unsafe fn cut(&mut self, node: NonNull<Node<K, V>>) {
        let Some(parent) = (*node.as_ptr()).parent.take() else {
            return;
        };
        let prev = (*node.as_ptr()).prev.take();
        let next = (*node.as_ptr()).next.take();

        match prev {
            Some(prev) => (*prev.as_ptr()).next = next,
            None => (*parent.as_ptr()).child = next,
        }
        if let Some(next) = next {
            (*next.as_ptr()).prev = prev;
        }
        (*parent.as_ptr()).degree -= 1;
        (*node.as_ptr()).marked = false;
    }

    /// Marks `node` after it lost a child, cutting marked ancestors
    ///
    /// Roots are never marked.
    unsafe fn cascading_cut(&mut self, mut node: NonNull<Node<K, V>>) {
        while let Some(parent) = (*node.as_ptr()).parent {
            if !(*node.as_ptr()).marked {
                (*node.as_ptr()).marked = true;
                return;
            }
            self.cut(node);
            self.add_root(node);
            node = parent;
        }
    }

    /// Makes the root with the larger key the first child of the other
    ///
    /// On equal keys `a` stays the root.
    unsafe fn link(
        &self,
        a: NonNull<Node<K, V>>,
        b: NonNull<Node<K, V>>,
    ) -> NonNull<Node<K, V>> {
        let (parent, child) = if self.less(b, a) { (b, a) } else { (a, b) };

        let first = (*parent.as_ptr()).child;
        (*child.as_ptr()).parent = Some(parent);
        (*child.as_ptr()).prev = None;
        (*child.as_ptr()).next = first;
        (*child.as_ptr()).marked = false;
        if let Some(first) = first {
            (*first.as_ptr()).prev = Some(child);
        }
        (*parent.as_ptr()).child = Some(child);
        (*parent.as_ptr()).degree += 1;
        parent
    }

    /// Links roots of equal degree until all degrees are distinct, then rebuilds
    /// the root list and the minimum
    unsafe fn consolidate(&mut self) {
        let mut by_degree: SmallVec<[Link<Node<K, V>>; 64]> = SmallVec::new();
        let mut roots = 0usize;

        let mut current = self.begin.take();
        self.end = None;
        while let Some(node) = current {
            current = (*node.as_ptr()).next.take();
            (*node.as_ptr()).prev = None;
            roots += 1;

            let mut tree = node;
            let mut degree = (*tree.as_ptr()).degree;
            loop {
                if degree >= by_degree.len() {
                    by_degree.resize(degree + 1, None);
                }
                match by_degree[degree].take() {
                    Some(other) => {
                        tree = self.link(other, tree);
                        degree += 1;
                    }
                    None => {
                        by_degree[degree] = Some(tree);
                        break;
                    }
                }
            }
        }

        self.min = None;
        let mut trees = 0usize;
        for tree in by_degree.into_iter().flatten() {
            self.add_root(tree);
            self.update_min(tree);
            trees += 1;
        }
        trace!("fibonacci heap consolidated {roots} roots into {trees} trees");
    }

    /// Adds a detached, childless node to the heap
    unsafe fn attach(&mut self, node: NonNull<Node<K, V>>) {
        self.add_root(node);
        self.update_min(node);
        self.len += 1;
    }

    /// Takes a node out of the heap, promoting its children to roots
    unsafe fn detach(&mut self, node: NonNull<Node<K, V>>) {
        match (*node.as_ptr()).parent {
            Some(parent) => {
                self.cut(node);
                self.cascading_cut(parent);
            }
            None => self.unlink_root(node),
        }

        let mut child = (*node.as_ptr()).child.take();
        while let Some(c) = child {
            child = (*c.as_ptr()).next;
            (*c.as_ptr()).marked = false;
            self.add_root(c);
        }
        (*node.as_ptr()).degree = 0;
        (*node.as_ptr()).marked = false;

        self.len -= 1;
        if self.len == 0 {
            self.begin = None;
            self.end = None;
            self.min = None;
        } else {
            self.consolidate();
        }
    }

    unsafe fn free(node: NonNull<Node<K, V>>) -> (K, V) {
        let node = Box::from_raw(node.as_ptr());
        node.handle.release();
        (node.key, node.value)
    }
}

impl<K, V> ReferenceableHeap<K, V> for FibonacciHeap<K, V> {
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

    /// Inserts a new element as a single-node root
    ///
    /// **Time Complexity**: O(1)
    fn insert(&mut self, key: K, value: V) -> HeapRef {
        let handle = HeapRef::new(&self.owner);
        let node = NonNull::from(Box::leak(Box::new(Node {
            key,
            value,
            handle: handle.clone(),
            parent: None,
            child: None,
            prev: None,
            next: None,
            degree: 0,
            marked: false,
        })));
        handle.bind(node);
        unsafe { self.attach(node) };
        handle
    }

    fn find_min(&mut self) -> Result<HeapRef> {
        let min = self.min.ok_or(HeapError::Empty)?;
        Ok(unsafe { (*min.as_ptr()).handle.clone() })
    }

    /// Removes the minimum root and consolidates the root list
    ///
    /// **Time Complexity**: O(log n) amortized
    fn extract_min(&mut self) -> Result<(K, V)> {
        let min = self.min.ok_or(HeapError::Empty)?;
        unsafe {
            self.detach(min);
            Ok(Self::free(min))
        }
    }

    /// Lowers a key, cutting the node from its parent if the heap order breaks
    ///
    /// **Time Complexity**: O(1) amortized
    fn decrease_key(&mut self, handle: &HeapRef, new_key: K) -> Result<()> {
        let node = self.node(handle)?;
        unsafe {
            if self.cmp.less(&(*node.as_ptr()).key, &new_key) {
                return Err(HeapError::KeyNotDecreased);
            }
            (*node.as_ptr()).key = new_key;

            if let Some(parent) = (*node.as_ptr()).parent {
                if self.less(node, parent) {
                    self.cut(node);
                    self.add_root(node);
                    self.cascading_cut(parent);
                }
            }
            if (*node.as_ptr()).parent.is_none() {
                self.update_min(node);
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

    /// Appends the other root list to this one
    ///
    /// **Time Complexity**: O(1)
    fn meld(&mut self, other: &mut Self) -> Result<()> {
        if !self.cmp.same_as(&other.cmp) {
            return Err(HeapError::ComparatorMismatch);
        }
        let (Some(begin), Some(end)) = (other.begin.take(), other.end.take()) else {
            return Ok(());
        };
        let other_min = other.min.take();

        unsafe {
            match self.end {
                Some(last) => {
                    (*last.as_ptr()).next = Some(begin);
                    (*begin.as_ptr()).prev = Some(last);
                }
                None => self.begin = Some(begin),
            }
            self.end = Some(end);
            if let Some(other_min) = other_min {
                self.update_min(other_min);
            }
        }
        self.len += std::mem::take(&mut other.len);

        Owner::hand_over(&mut other.owner, &self.owner);
        Ok(())
    }

    fn clear(&mut self) {
        let begin = self.begin.take();
        self.end = None;
        self.min = None;
        self.len = 0;
        unsafe { forest::free_forest(begin) };
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
            inner: PreOrder::new(self.begin, self.len),
        }
    }
}
