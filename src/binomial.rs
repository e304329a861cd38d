//! Binomial Heap implementation
//!
//! A binomial heap is a collection of binomial trees with:
//! - O(log n) insert, find_min, extract_min and meld
//! - O(log n) decrease_key, increase_key and remove
//!
//! # Algorithm Overview
//!
//! The heap keeps at most one tree of each rank, stored in an array indexed by
//! rank, mirroring the binary representation of its size.
//!
//! **Binomial Tree Bₖ**: recursively defined:
//! - B₀ is a single node
//! - Bₖ is formed by linking two Bₖ₋₁ trees
//! - Bₖ has exactly 2ᵏ nodes and height k
//!
//! Children are ordered by decreasing rank, so the first child of a Bₖ root is a
//! Bₖ₋₁ tree. Removing a root therefore yields a ready-made rank array to meld back.
//!
//! Decreasing a key sifts the element up by exchanging payloads with its parent
//! instead of relinking nodes; handles are rebound on every exchange.

use std::marker::PhantomData;
use std::mem;
use std::ptr::NonNull;
use std::rc::Rc;

use log::trace;
use smallvec::SmallVec;

use crate::compare::Comparator;
use crate::forest::{self, ForestNode, Link, PreOrder};
use crate::handle::{HeapRef, Owner};
use crate::traits::{HeapError, ReferenceableHeap, Result};

struct Node<K, V> {
    key: K,
    value: V,
    handle: HeapRef,
    parent: Link<Node<K, V>>,
    child: Link<Node<K, V>>,
    prev: Link<Node<K, V>>,
    next: Link<Node<K, V>>,
    /// Number of children; a root of rank k holds a Bₖ tree
    rank: usize,
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

/// Binomial Heap
///
/// # Example
///
/// ```rust
/// use referenceable_heaps::binomial::BinomialHeap;
/// use referenceable_heaps::ReferenceableHeap;
///
/// let mut heap = BinomialHeap::new();
/// let handle = heap.insert(5, "item");
/// heap.decrease_key(&handle, 1).unwrap();
/// assert_eq!(heap.peek(), Some((&1, &"item")));
/// ```
pub struct BinomialHeap<K, V = ()> {
    /// Trees indexed by rank, each slot holds at most one tree
    roots: Vec<Link<Node<K, V>>>,
    len: usize,
    cmp: Comparator<K>,
    owner: Rc<Owner>,
    _phantom: PhantomData<Box<Node<K, V>>>,
}

/// Pre-order iterator over a [`BinomialHeap`], trees in increasing rank
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

impl<K: Ord, V> BinomialHeap<K, V> {
    /// Creates an empty heap ordered by the natural order of `K`
    pub fn new() -> Self {
        Self::with_comparator(Comparator::natural())
    }
}

impl<K: Ord, V> Default for BinomialHeap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Drop for BinomialHeap<K, V> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<K, V> BinomialHeap<K, V> {
    /// Creates an empty heap ordered by `cmp`
    pub fn with_comparator(cmp: Comparator<K>) -> Self {
        Self {
            roots: Vec::new(),
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

    /// Root with minimal key and its rank; ties go to the lowest rank
    fn min_root(&self) -> Option<(usize, NonNull<Node<K, V>>)> {
        let mut best: Option<(usize, NonNull<Node<K, V>>)> = None;
        for (rank, root) in self.roots.iter().enumerate() {
            let Some(root) = *root else { continue };
            match best {
                Some((_, b)) if !unsafe { self.less(root, b) } => {}
                _ => best = Some((rank, root)),
            }
        }
        best
    }

    /// Links two trees of equal rank; on equal keys `a` stays the root
    unsafe fn link(&self, a: NonNull<Node<K, V>>, b: NonNull<Node<K, V>>) -> NonNull<Node<K, V>> {
        let (parent, child) = if self.less(b, a) { (b, a) } else { (a, b) };

        let first = (*parent.as_ptr()).child;
        (*child.as_ptr()).parent = Some(parent);
        (*child.as_ptr()).prev = None;
        (*child.as_ptr()).next = first;
        if let Some(first) = first {
            (*first.as_ptr()).prev = Some(child);
        }
        (*parent.as_ptr()).child = Some(child);
        (*parent.as_ptr()).rank += 1;
        parent
    }

    /// Adds a single tree of the given rank, propagating carries upwards
    unsafe fn add_tree(&mut self, tree: NonNull<Node<K, V>>) {
        let mut carry = tree;
        let mut rank = (*carry.as_ptr()).rank;
        loop {
            if rank >= self.roots.len() {
                self.roots.resize(rank + 1, None);
                trace!("binomial heap grew to {} ranks", self.roots.len());
            }
            match self.roots[rank].take() {
                Some(existing) => {
                    carry = self.link(existing, carry);
                    rank += 1;
                }
                None => {
                    self.roots[rank] = Some(carry);
                    return;
                }
            }
        }
    }

    /// Adds a whole rank array, rank by rank like a ripple-carry adder
    unsafe fn merge_roots(&mut self, other: Vec<Link<Node<K, V>>>) {
        if other.len() > self.roots.len() {
            self.roots.resize(other.len(), None);
        }

        let mut carry: Link<Node<K, V>> = None;
        for rank in 0..self.roots.len() {
            let incoming = other.get(rank).copied().flatten();
            if incoming.is_none() && carry.is_none() {
                continue;
            }

            let mut trees: SmallVec<[NonNull<Node<K, V>>; 3]> = SmallVec::new();
            trees.extend(self.roots[rank].take());
            trees.extend(incoming);
            trees.extend(carry.take());

            match trees.as_slice() {
                [] => {}
                [one] => self.roots[rank] = Some(*one),
                [a, b] => carry = Some(self.link(*a, *b)),
                [keep, a, b, ..] => {
                    self.roots[rank] = Some(*keep);
                    carry = Some(self.link(*a, *b));
                }
            }
        }
        if let Some(carry) = carry {
            self.roots.push(Some(carry));
            trace!("binomial heap grew to {} ranks", self.roots.len());
        }
        self.trim();
    }

    fn trim(&mut self) {
        while let Some(None) = self.roots.last() {
            self.roots.pop();
        }
    }

    /// Exchanges the elements stored in two nodes, keeping the handles bound
    unsafe fn swap_payload(a: NonNull<Node<K, V>>, b: NonNull<Node<K, V>>) {
        let (x, y) = (&mut *a.as_ptr(), &mut *b.as_ptr());
        mem::swap(&mut x.key, &mut y.key);
        mem::swap(&mut x.value, &mut y.value);
        mem::swap(&mut x.handle, &mut y.handle);
        x.handle.bind(a);
        y.handle.bind(b);
    }

    /// Removes a root, melding its children back in
    unsafe fn remove_root(&mut self, root: NonNull<Node<K, V>>) {
        let rank = (*root.as_ptr()).rank;
        self.roots[rank] = None;

        let mut children: Vec<Link<Node<K, V>>> = vec![None; rank];
        let mut child = (*root.as_ptr()).child.take();
        while let Some(c) = child {
            child = (*c.as_ptr()).next.take();
            (*c.as_ptr()).prev = None;
            (*c.as_ptr()).parent = None;
            children[(*c.as_ptr()).rank] = Some(c);
        }
        (*root.as_ptr()).rank = 0;

        self.merge_roots(children);
        self.len -= 1;
    }

    /// Takes an element out of the heap
    ///
    /// The element is sifted to the root of its tree first, so the returned node
    /// (which now holds the element) is generally not the node it started in.
    unsafe fn detach(&mut self, node: NonNull<Node<K, V>>) -> NonNull<Node<K, V>> {
        let mut node = node;
        while let Some(parent) = (*node.as_ptr()).parent {
            Self::swap_payload(node, parent);
            node = parent;
        }
        self.remove_root(node);
        node
    }

    unsafe fn attach(&mut self, node: NonNull<Node<K, V>>) {
        self.add_tree(node);
        self.len += 1;
    }

    unsafe fn free(node: NonNull<Node<K, V>>) -> (K, V) {
        let node = Box::from_raw(node.as_ptr());
        node.handle.release();
        (node.key, node.value)
    }
}

impl<K, V> ReferenceableHeap<K, V> for BinomialHeap<K, V> {
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

    /// Inserts a new element
    ///
    /// **Time Complexity**: O(log n) worst-case, O(1) amortized
    ///
    /// **Algorithm**: binary increment; the single-node tree is carried upwards
    /// through occupied ranks, linking at each step.
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
            rank: 0,
        })));
        handle.bind(node);
        unsafe { self.attach(node) };
        handle
    }

    /// Scans the roots for the minimum
    ///
    /// **Time Complexity**: O(log n)
    fn find_min(&mut self) -> Result<HeapRef> {
        let (_, root) = self.min_root().ok_or(HeapError::Empty)?;
        Ok(unsafe { (*root.as_ptr()).handle.clone() })
    }

    fn extract_min(&mut self) -> Result<(K, V)> {
        let (_, root) = self.min_root().ok_or(HeapError::Empty)?;
        unsafe {
            self.remove_root(root);
            Ok(Self::free(root))
        }
    }

    /// Lowers a key and sifts the element up its tree
    ///
    /// **Time Complexity**: O(log n) worst-case, bounded by the tree height
    fn decrease_key(&mut self, handle: &HeapRef, new_key: K) -> Result<()> {
        let node = self.node(handle)?;
        unsafe {
            if self.cmp.less(&(*node.as_ptr()).key, &new_key) {
                return Err(HeapError::KeyNotDecreased);
            }
            (*node.as_ptr()).key = new_key;

            let mut node = node;
            while let Some(parent) = (*node.as_ptr()).parent {
                if !self.less(node, parent) {
                    break;
                }
                Self::swap_payload(node, parent);
                node = parent;
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
            let node = self.detach(node);
            (*node.as_ptr()).key = new_key;
            self.attach(node);
        }
        Ok(())
    }

    fn remove(&mut self, handle: &HeapRef) -> Result<(K, V)> {
        let node = self.node(handle)?;
        unsafe {
            let node = self.detach(node);
            Ok(Self::free(node))
        }
    }

    /// Adds the trees of `other` rank by rank
    ///
    /// **Time Complexity**: O(log n)
    fn meld(&mut self, other: &mut Self) -> Result<()> {
        if !self.cmp.same_as(&other.cmp) {
            return Err(HeapError::ComparatorMismatch);
        }
        if other.len == 0 {
            return Ok(());
        }

        let roots = mem::take(&mut other.roots);
        unsafe { self.merge_roots(roots) };
        self.len += mem::take(&mut other.len);

        Owner::hand_over(&mut other.owner, &self.owner);
        Ok(())
    }

    fn clear(&mut self) {
        let roots = mem::take(&mut self.roots);
        self.len = 0;
        unsafe { forest::free_forest(roots.into_iter().flatten()) };
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
            inner: PreOrder::new(self.roots.iter().flatten().copied(), self.len),
        }
    }
}
