//! Splay Tree implementation
//!
//! A self-adjusting binary search tree (Sleator & Tarjan, 1985) with:
//! - O(log n) amortized insert, remove and every query
//! - O(log n) amortized split and meld of disjoint key ranges
//!
//! Every access rotates the touched node to the root (zig, zig-zig or zig-zag
//! steps), so recently used elements stay cheap to reach. Splitting and melding
//! fall out of this directly:
//!
//! - **split**: splay the pivot to the root and cut off one of its subtrees
//! - **meld**: splay the maximum of the lower tree, hang the other tree as its
//!   right child
//!
//! Each node stores the size of its subtree, which gives `len` in O(1) and is kept
//! up to date by every rotation.

use std::cmp::Ordering;
use std::marker::PhantomData;
use std::rc::Rc;

use log::trace;

use crate::bst::{self, InOrder, Link, Miss, NodePtr, Teardown};
use crate::compare::Comparator;
use crate::handle::{HeapRef, Owner};
use crate::traits::{BinarySearchTree, HeapError, ReferenceableHeap, Result};

type Node<K, V> = NodePtr<K, V, usize>;

/// Splay Tree
///
/// # Example
///
/// ```rust
/// use referenceable_heaps::splay::SplayTree;
/// use referenceable_heaps::{BinarySearchTree, ReferenceableHeap};
///
/// let mut tree = SplayTree::new();
/// let handles: Vec<_> = [1, 5, 10, 15, 20].into_iter().map(|k| tree.insert(k, k)).collect();
///
/// let upper = tree.split(&handles[2]).unwrap();
/// assert_eq!(upper.len(), 2);
/// assert!(upper.contains(&handles[4]));
/// assert!(tree.contains(&handles[2]));
/// ```
pub struct SplayTree<K, V = ()> {
    root: Link<K, V, usize>,
    cmp: Comparator<K>,
    owner: Rc<Owner>,
    _phantom: PhantomData<Box<bst::TreeNode<K, V, usize>>>,
}

/// In-order iterator over a [`SplayTree`]
pub struct Iter<'a, K, V> {
    inner: InOrder<'a, K, V, usize>,
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

impl<K: Ord, V> SplayTree<K, V> {
    /// Creates an empty tree ordered by the natural order of `K`
    pub fn new() -> Self {
        Self::with_comparator(Comparator::natural())
    }
}

impl<K: Ord, V> Default for SplayTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Drop for SplayTree<K, V> {
    fn drop(&mut self) {
        self.clear();
        Owner::leave(&self.owner);
    }
}

unsafe fn size<K, V>(node: Link<K, V, usize>) -> usize {
    node.map_or(0, |n| (*n.as_ptr()).extra)
}

/// Rotates `node` above its parent, keeping subtree sizes exact
unsafe fn rotate<K, V>(node: Node<K, V>) {
    let Some(parent) = (*node.as_ptr()).parent else {
        return;
    };
    let grandparent = (*parent.as_ptr()).parent;
    let parent_size = (*parent.as_ptr()).extra;

    if (*parent.as_ptr()).left == Some(node) {
        let inner = (*node.as_ptr()).right;
        (*parent.as_ptr()).extra = parent_size - (*node.as_ptr()).extra + size(inner);
        (*parent.as_ptr()).left = inner;
        if let Some(inner) = inner {
            (*inner.as_ptr()).parent = Some(parent);
        }
        (*node.as_ptr()).right = Some(parent);
    } else {
        let inner = (*node.as_ptr()).left;
        (*parent.as_ptr()).extra = parent_size - (*node.as_ptr()).extra + size(inner);
        (*parent.as_ptr()).right = inner;
        if let Some(inner) = inner {
            (*inner.as_ptr()).parent = Some(parent);
        }
        (*node.as_ptr()).left = Some(parent);
    }
    (*node.as_ptr()).extra = parent_size;

    (*node.as_ptr()).parent = grandparent;
    (*parent.as_ptr()).parent = Some(node);
    if let Some(grandparent) = grandparent {
        if (*grandparent.as_ptr()).left == Some(parent) {
            (*grandparent.as_ptr()).left = Some(node);
        } else {
            (*grandparent.as_ptr()).right = Some(node);
        }
    }
}

/// Rotates `node` up to the root of its tree and returns it
unsafe fn splay<K, V>(node: Node<K, V>) -> Node<K, V> {
    while let Some(parent) = (*node.as_ptr()).parent {
        if (*parent.as_ptr()).parent.is_none() {
            // zig
            rotate(node);
        } else if bst::is_left_child(node) == bst::is_left_child(parent) {
            // zig-zig
            rotate(parent);
            rotate(node);
        } else {
            // zig-zag
            rotate(node);
            rotate(node);
        }
    }
    node
}

/// Concatenates two trees, every key of `low` being at most every key of `high`
unsafe fn join<K, V>(low: Link<K, V, usize>, high: Link<K, V, usize>) -> Link<K, V, usize> {
    let Some(low) = low else {
        return high;
    };
    let Some(high) = high else {
        return Some(low);
    };
    let top = splay(bst::max(low));
    (*top.as_ptr()).right = Some(high);
    (*high.as_ptr()).parent = Some(top);
    (*top.as_ptr()).extra += (*high.as_ptr()).extra;
    Some(top)
}

impl<K, V> SplayTree<K, V> {
    /// Creates an empty tree ordered by `cmp`
    pub fn with_comparator(cmp: Comparator<K>) -> Self {
        Self {
            root: None,
            cmp,
            owner: Owner::new(),
            _phantom: PhantomData,
        }
    }

    /// A tree over a detached subtree of this one
    ///
    /// Shares the comparator and the owner, so handles move along with their
    /// elements.
    fn sibling(&self, root: Link<K, V, usize>) -> Self {
        Self {
            root,
            cmp: self.cmp.clone(),
            owner: Owner::enlist(&self.owner),
            _phantom: PhantomData,
        }
    }

    fn node(&self, handle: &HeapRef) -> Result<Node<K, V>> {
        bst::resolve(handle, &self.owner, self.root)
    }

    /// Splays `node` (if any) and returns its handle
    fn access(&mut self, node: Link<K, V, usize>) -> Option<HeapRef> {
        let node = node?;
        unsafe {
            self.root = Some(splay(node));
            Some((*node.as_ptr()).handle.clone())
        }
    }

    /// Inserts a detached node and splays it
    unsafe fn attach(&mut self, node: Node<K, V>) {
        (*node.as_ptr()).extra = 1;
        let Some(root) = self.root else {
            self.root = Some(node);
            return;
        };
        bst::insert_leaf(root, &self.cmp, node);
        let mut ancestor = (*node.as_ptr()).parent;
        while let Some(p) = ancestor {
            (*p.as_ptr()).extra += 1;
            ancestor = (*p.as_ptr()).parent;
        }
        self.root = Some(splay(node));
    }

    /// Takes an element out of the tree and splays the place it left
    ///
    /// An element with two children first trades places with its successor, so the
    /// returned node (which holds the element) may differ from `node`.
    unsafe fn detach(&mut self, node: Node<K, V>) -> Node<K, V> {
        let mut node = node;
        if let (Some(_), Some(right)) = ((*node.as_ptr()).left, (*node.as_ptr()).right) {
            let successor = bst::min(right);
            bst::swap_payload(node, successor);
            node = successor;
        }

        let child = (*node.as_ptr()).left.or((*node.as_ptr()).right);
        let parent = (*node.as_ptr()).parent;
        bst::replace_child(&mut self.root, node, child);

        let mut ancestor = parent;
        while let Some(p) = ancestor {
            (*p.as_ptr()).extra -= 1;
            ancestor = (*p.as_ptr()).parent;
        }

        (*node.as_ptr()).parent = None;
        (*node.as_ptr()).left = None;
        (*node.as_ptr()).right = None;
        (*node.as_ptr()).extra = 1;

        if let Some(next) = child.or(parent) {
            self.root = Some(splay(next));
        }
        node
    }

    /// Detaches and returns everything smaller than `key`
    unsafe fn cut_smaller(&mut self, key: &K) -> Link<K, V, usize> {
        let pred = bst::find_smaller(self.root, &self.cmp, key)?;
        let pred = splay(pred);
        self.root = (*pred.as_ptr()).right.take();
        if let Some(rest) = self.root {
            (*pred.as_ptr()).extra -= (*rest.as_ptr()).extra;
            (*rest.as_ptr()).parent = None;
        }
        Some(pred)
    }

    /// Detaches and returns `node` with everything after it
    unsafe fn cut_from(&mut self, node: Node<K, V>) -> Node<K, V> {
        let node = splay(node);
        self.root = (*node.as_ptr()).left.take();
        if let Some(rest) = self.root {
            (*node.as_ptr()).extra -= (*rest.as_ptr()).extra;
            (*rest.as_ptr()).parent = None;
        }
        node
    }

    /// Detaches and returns everything greater than `key`
    unsafe fn cut_greater(&mut self, key: &K) -> Link<K, V, usize> {
        let succ = bst::find_greater(self.root, &self.cmp, key)?;
        Some(self.cut_from(succ))
    }

    /// Melds trees whose key ranges overlap
    ///
    /// The parts of each tree outside the common range are split off first, the
    /// common part of `other` is reinserted node by node, and the outer parts are
    /// joined back at both ends.
    unsafe fn meld_overlapping(
        &mut self,
        other: &mut Self,
        (min1, max1): (Node<K, V>, Node<K, V>),
        (min2, max2): (Node<K, V>, Node<K, V>),
    ) {
        // nodes are neither freed nor moved while melding, keys stay put
        let (min1, max1): (*const K, *const K) = (&(*min1.as_ptr()).key, &(*max1.as_ptr()).key);
        let (min2, max2): (*const K, *const K) = (&(*min2.as_ptr()).key, &(*max2.as_ptr()).key);

        let low = match self.cmp.compare(&*min1, &*min2) {
            Ordering::Less => self.cut_smaller(&*min2),
            Ordering::Greater => other.cut_smaller(&*min1),
            Ordering::Equal => None,
        };
        let high = match self.cmp.compare(&*max1, &*max2) {
            Ordering::Less => other.cut_greater(&*max1),
            Ordering::Greater => self.cut_greater(&*max2),
            Ordering::Equal => None,
        };

        trace!(
            "splay meld reinserts {} overlapping nodes",
            size(other.root)
        );
        for node in Teardown::new(other.root.take()) {
            self.attach(node);
        }

        self.root = join(low, self.root);
        self.root = join(self.root, high);
    }
}

impl<K, V> ReferenceableHeap<K, V> for SplayTree<K, V> {
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
        unsafe { size(self.root) }
    }

    fn insert(&mut self, key: K, value: V) -> HeapRef {
        let (node, handle) = bst::alloc(&self.owner, key, value, |_, _| 1);
        unsafe { self.attach(node) };
        handle
    }

    fn find_min(&mut self) -> Result<HeapRef> {
        let root = self.root.ok_or(HeapError::Empty)?;
        self.access(Some(unsafe { bst::min(root) })).ok_or(HeapError::Empty)
    }

    fn extract_min(&mut self) -> Result<(K, V)> {
        let root = self.root.ok_or(HeapError::Empty)?;
        unsafe {
            let node = self.detach(bst::min(root));
            Ok(bst::free(node))
        }
    }

    fn decrease_key(&mut self, handle: &HeapRef, new_key: K) -> Result<()> {
        let node = self.node(handle)?;
        unsafe {
            if self.cmp.less(&(*node.as_ptr()).key, &new_key) {
                return Err(HeapError::KeyNotDecreased);
            }
            let node = self.detach(node);
            (*node.as_ptr()).key = new_key;
            self.attach(node);
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
            Ok(bst::free(node))
        }
    }

    /// Moves every element of `other` into this tree
    ///
    /// **Time Complexity**: O(log n) amortized when all keys of one tree are at most
    /// all keys of the other; otherwise the overlapping part of `other` is
    /// reinserted element by element.
    fn meld(&mut self, other: &mut Self) -> Result<()> {
        if !self.cmp.same_as(&other.cmp) {
            return Err(HeapError::ComparatorMismatch);
        }
        let (Some(root1), Some(root2)) = (self.root, other.root) else {
            if self.root.is_none() {
                self.root = other.root.take();
                Owner::hand_over(&mut other.owner, &self.owner);
            }
            return Ok(());
        };

        unsafe {
            let max1 = splay(bst::max(root1));
            let min2 = splay(bst::min(root2));
            if !self.cmp.less(&(*min2.as_ptr()).key, &(*max1.as_ptr()).key) {
                trace!("splay meld: appending greater tree");
                self.root = join(Some(max1), Some(min2));
            } else {
                let min1 = splay(bst::min(max1));
                let max2 = splay(bst::max(min2));
                if !self.cmp.less(&(*min1.as_ptr()).key, &(*max2.as_ptr()).key) {
                    trace!("splay meld: prepending smaller tree");
                    self.root = join(Some(max2), Some(min1));
                } else {
                    self.root = Some(min1);
                    other.root = Some(max2);
                    self.meld_overlapping(other, (min1, max1), (min2, max2));
                }
            }
        }
        other.root = None;

        Owner::hand_over(&mut other.owner, &self.owner);
        Ok(())
    }

    fn clear(&mut self) {
        let root = self.root.take();
        unsafe { bst::free_tree(root) };
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
            inner: InOrder::new(self.root, self.len()),
        }
    }

    fn find(&mut self, key: &K) -> Option<HeapRef> {
        let node = unsafe { bst::find(self.root, &self.cmp, key, Miss::Nothing) };
        self.access(node)
    }
}

impl<K, V> BinarySearchTree<K, V> for SplayTree<K, V> {
    fn find_max(&mut self) -> Result<HeapRef> {
        let root = self.root.ok_or(HeapError::Empty)?;
        self.access(Some(unsafe { bst::max(root) })).ok_or(HeapError::Empty)
    }

    fn extract_max(&mut self) -> Result<(K, V)> {
        let root = self.root.ok_or(HeapError::Empty)?;
        unsafe {
            let node = self.detach(bst::max(root));
            Ok(bst::free(node))
        }
    }

    fn find_or_smaller(&mut self, key: &K) -> Option<HeapRef> {
        let node = unsafe { bst::find(self.root, &self.cmp, key, Miss::Smaller) };
        self.access(node)
    }

    fn find_or_greater(&mut self, key: &K) -> Option<HeapRef> {
        let node = unsafe { bst::find(self.root, &self.cmp, key, Miss::Greater) };
        self.access(node)
    }

    fn find_smaller(&mut self, key: &K) -> Option<HeapRef> {
        let node = unsafe { bst::find_smaller(self.root, &self.cmp, key) };
        self.access(node)
    }

    fn find_greater(&mut self, key: &K) -> Option<HeapRef> {
        let node = unsafe { bst::find_greater(self.root, &self.cmp, key) };
        self.access(node)
    }

    fn predecessor(&mut self, handle: &HeapRef) -> Result<Option<HeapRef>> {
        let node = self.node(handle)?;
        let pred = unsafe { bst::predecessor(node) };
        Ok(self.access(pred))
    }

    fn successor(&mut self, handle: &HeapRef) -> Result<Option<HeapRef>> {
        let node = self.node(handle)?;
        let succ = unsafe { bst::successor(node) };
        Ok(self.access(succ))
    }

    /// Splays the greatest key below `key` and cuts it off with its left subtree
    ///
    /// **Time Complexity**: O(log n) amortized
    fn split_smaller(&mut self, key: &K) -> Result<Self> {
        let low = unsafe { self.cut_smaller(key) };
        trace!("splay split_smaller moved {} nodes", unsafe { size(low) });
        Ok(self.sibling(low))
    }

    /// Splays the smallest key above `key` and cuts it off with its right subtree
    ///
    /// **Time Complexity**: O(log n) amortized
    fn split_greater(&mut self, key: &K) -> Result<Self> {
        let high = unsafe { self.cut_greater(key) };
        trace!("splay split_greater moved {} nodes", unsafe { size(high) });
        Ok(self.sibling(high))
    }

    fn split(&mut self, handle: &HeapRef) -> Result<Self> {
        let node = self.node(handle)?;
        // the pivot is splayed but never moved, its key stays valid
        let key: *const K = unsafe { &(*node.as_ptr()).key };
        self.split_greater(unsafe { &*key })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bst::tests::check_links;

    /// Checks links, order and every subtree size
    fn check_structure<K, V>(tree: &SplayTree<K, V>) {
        unsafe fn check_sizes<K, V>(node: Link<K, V, usize>) -> usize {
            let Some(n) = node else {
                return 0;
            };
            let total = 1 + check_sizes((*n.as_ptr()).left) + check_sizes((*n.as_ptr()).right);
            assert_eq!((*n.as_ptr()).extra, total, "stale subtree size");
            total
        }
        let count = check_links(tree.root, &tree.cmp);
        assert_eq!(unsafe { check_sizes(tree.root) }, count);
        assert_eq!(tree.len(), count);
    }

    fn keys<K: Copy, V>(tree: &SplayTree<K, V>) -> Vec<K> {
        tree.iter().map(|(_, k, _)| *k).collect()
    }

    fn root_key<K: Copy, V>(tree: &SplayTree<K, V>) -> Option<K> {
        tree.root.map(|r| unsafe { (*r.as_ptr()).key })
    }

    #[test]
    fn test_access_splays_to_root() {
        let mut tree: SplayTree<i32> = SplayTree::new();
        for k in 0..20 {
            tree.insert_key(k);
            assert_eq!(root_key(&tree), Some(k));
        }
        check_structure(&tree);

        tree.find(&7);
        assert_eq!(root_key(&tree), Some(7));
        tree.find_or_greater(&100);
        assert_eq!(root_key(&tree), Some(7), "a miss leaves the tree alone");
        tree.find_smaller(&3);
        assert_eq!(root_key(&tree), Some(2));
        tree.find_min().unwrap();
        assert_eq!(root_key(&tree), Some(0));
        check_structure(&tree);
    }

    #[test]
    fn test_remove_keeps_sizes() {
        let mut tree: SplayTree<i32, i32> = SplayTree::new();
        let handles: Vec<_> = (0..50).map(|k| tree.insert((k * 37) % 50, k)).collect();
        for h in handles.iter().step_by(3) {
            tree.remove(h).unwrap();
            check_structure(&tree);
        }
        assert_eq!(tree.len(), 50 - 17);
        for (k, h) in handles.iter().enumerate() {
            if k % 3 != 0 {
                assert_eq!(tree.value(h), Ok(&(k as i32)));
            }
        }
    }

    #[test]
    fn test_split_greater() {
        let mut tree: SplayTree<i32> = SplayTree::new();
        for k in [1, 5, 10, 15, 20] {
            tree.insert_key(k);
        }
        let upper = tree.split_greater(&10).unwrap();
        check_structure(&tree);
        check_structure(&upper);
        assert_eq!(keys(&tree), vec![1, 5, 10]);
        assert_eq!(keys(&upper), vec![15, 20]);
    }

    #[test]
    fn test_split_smaller_and_handles() {
        let mut tree: SplayTree<i32> = SplayTree::new();
        let handles: Vec<_> = (0..10).map(|k| tree.insert_key(k)).collect();
        let mut lower = tree.split_smaller(&4).unwrap();
        check_structure(&lower);
        assert_eq!(keys(&lower), vec![0, 1, 2, 3]);
        assert_eq!(keys(&tree), (4..10).collect::<Vec<_>>());

        // handles follow their elements, and only there
        assert!(lower.contains(&handles[2]));
        assert!(!tree.contains(&handles[2]));
        assert_eq!(tree.remove(&handles[2]), Err(HeapError::ForeignHandle));
        assert_eq!(lower.remove(&handles[2]), Ok((2, ())));

        let empty = tree.split_smaller(&-5).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_split_by_handle_keeps_duplicates() {
        let mut tree: SplayTree<i32> = SplayTree::new();
        for k in [3, 5, 5, 7, 5, 9] {
            tree.insert_key(k);
        }
        let pivot = tree.find(&5).unwrap();
        let upper = tree.split(&pivot).unwrap();
        assert_eq!(keys(&tree), vec![3, 5, 5, 5]);
        assert_eq!(keys(&upper), vec![7, 9]);
        assert!(tree.contains(&pivot));
    }

    #[test]
    fn test_meld_disjoint_ranges() {
        let mut low: SplayTree<i32> = SplayTree::new();
        let mut high: SplayTree<i32> = SplayTree::new();
        for k in 0..5 {
            low.insert_key(k);
            high.insert_key(k + 10);
        }
        high.meld(&mut low).unwrap();
        check_structure(&high);
        assert!(low.is_empty());
        assert_eq!(keys(&high), vec![0, 1, 2, 3, 4, 10, 11, 12, 13, 14]);
    }

    #[test]
    fn test_meld_overlapping_ranges() {
        let mut a: SplayTree<i32> = SplayTree::new();
        let mut b: SplayTree<i32> = SplayTree::new();
        for k in [1, 2, 6] {
            a.insert_key(k);
        }
        let hb: Vec<_> = [0, 3, 4, 5, 9].into_iter().map(|k| b.insert_key(k)).collect();

        a.meld(&mut b).unwrap();
        check_structure(&a);
        assert!(b.is_empty());
        assert_eq!(keys(&a), vec![0, 1, 2, 3, 4, 5, 6, 9]);
        assert!(hb.iter().all(|h| a.contains(h)));
    }

    #[test]
    fn test_meld_with_split_sibling() {
        let mut tree: SplayTree<i32> = SplayTree::new();
        let handles: Vec<_> = (0..8).map(|k| tree.insert_key(k)).collect();
        let mut upper = tree.split_greater(&3).unwrap();
        upper.insert_key(2);
        tree.meld(&mut upper).unwrap();
        check_structure(&tree);
        assert_eq!(keys(&tree), vec![0, 1, 2, 2, 3, 4, 5, 6, 7]);
        assert!(handles.iter().all(|h| tree.contains(h)));
    }

    #[test]
    fn test_deep_handle_lookups_without_siblings() {
        let mut tree: SplayTree<u32> = SplayTree::new();
        // ascending inserts leave the first element at the bottom of a left spine
        let handles: Vec<_> = (0..20_000).map(|k| tree.insert_key(k)).collect();
        assert!(!Owner::is_shared(&tree.owner));
        for _ in 0..20_000 {
            assert_eq!(tree.key(&handles[0]), Ok(&0));
            assert!(tree.contains(&handles[0]));
        }

        // a live sibling brings the root walk back
        let upper = tree.split_greater(&10_000).unwrap();
        assert!(Owner::is_shared(&tree.owner));
        assert!(!tree.contains(&handles[15_000]));
        assert!(upper.contains(&handles[15_000]));
        assert_eq!(tree.key(&handles[15_000]), Err(HeapError::ForeignHandle));

        drop(upper);
        assert!(!Owner::is_shared(&tree.owner));
        assert_eq!(tree.key(&handles[15_000]), Err(HeapError::InvalidHandle));
        assert_eq!(tree.key(&handles[0]), Ok(&0));
    }

    #[test]
    fn test_sibling_count_follows_melds() {
        let mut tree: SplayTree<i32> = SplayTree::new();
        let handles: Vec<_> = (0..10).map(|k| tree.insert_key(k)).collect();
        let mut upper = tree.split_greater(&4).unwrap();
        let mut other: SplayTree<i32> = SplayTree::new();
        let h = other.insert_key(20);

        // the half melded away leaves its sibling alone in the family
        other.meld(&mut upper).unwrap();
        assert!(upper.is_empty());
        assert!(!Owner::is_shared(&upper.owner));
        assert!(Owner::is_shared(&tree.owner));
        assert!(other.contains(&handles[7]));
        assert!(!tree.contains(&handles[7]));
        assert!(!tree.contains(&h));

        tree.meld(&mut other).unwrap();
        assert!(!Owner::is_shared(&tree.owner));
        assert!(handles.iter().all(|h| tree.contains(h)));
        assert!(tree.contains(&h));
        check_structure(&tree);
    }

    #[test]
    fn test_random_operations_keep_sizes() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(17);
        let mut heap = SplayTree::new();
        let mut handles: Vec<HeapRef> = Vec::new();
        for _ in 0..2000 {
            match rng.gen_range(0..8) {
                0..=2 => handles.push(heap.insert(rng.gen_range(0..500), ())),
                3 if !handles.is_empty() => {
                    let h = &handles[rng.gen_range(0..handles.len())];
                    let key = *heap.key(h).unwrap() - rng.gen_range(0..100);
                    heap.decrease_key(h, key).unwrap();
                }
                4 if !handles.is_empty() => {
                    let h = &handles[rng.gen_range(0..handles.len())];
                    let key = *heap.key(h).unwrap() + rng.gen_range(0..100);
                    heap.increase_key(h, key).unwrap();
                }
                5 if !handles.is_empty() => {
                    let h = handles.swap_remove(rng.gen_range(0..handles.len()));
                    heap.remove(&h).unwrap();
                }
                6 => {
                    heap.extract_min().ok();
                    handles.retain(|h| h.is_live());
                }
                7 => {
                    let pivot = rng.gen_range(0..500);
                    let mut upper = heap.split_greater(&pivot).unwrap();
                    check_structure(&upper);
                    heap.meld(&mut upper).unwrap();
                }
                _ => {}
            }
            check_structure(&heap);
            assert_eq!(heap.len(), handles.len());
        }
    }
}
