//! Red-Black Tree implementation
//!
//! A height balanced binary search tree usable as a heap:
//! - O(log n) insert, remove, find_min/find_max and every ordered query
//! - O(log n) decrease_key and increase_key (remove, re-key, reinsert)
//! - O(n) meld into a non-empty tree, O(1) into an empty one
//!
//! The tree keeps the classic colouring rules: the root is black, no red node has a
//! red child, and every root-to-leaf path crosses the same number of black nodes.
//! Together they bound the height by 2·log₂(n + 1).
//!
//! # Subtree summaries
//!
//! Every node can carry a summary of its subtree, chosen by the [`Augment`] type
//! parameter. Summaries are recomputed from the children whenever the shape below
//! a node changes (insertion and removal paths, rotations), which keeps every
//! operation within its bound. [`SubtreeStats`] tracks the size and the minimum
//! and maximum element of each subtree; the default `()` tracks nothing and costs
//! nothing.
//!
//! Splitting still needs more than that, so all split operations report
//! [`HeapError::Unsupported`].

use std::marker::PhantomData;
use std::rc::Rc;

use log::trace;

use crate::bst::{self, InOrder, Link, Miss, NodePtr, Teardown};
use crate::compare::Comparator;
use crate::handle::{HeapRef, Owner};
use crate::traits::{BinarySearchTree, HeapError, ReferenceableHeap, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Red,
    Black,
}

struct Extra<A> {
    color: Color,
    summary: A,
}

type Node<K, V, A> = NodePtr<K, V, Extra<A>>;

/// A summary of a subtree, maintained on every node of a [`RedBlackTree`]
///
/// A summary must depend only on the elements of the subtree and their order,
/// never on its shape, since rotations rebuild summaries from the children.
pub trait Augment<K>: Sized {
    /// Set for summaries that carry no information, skipping all upkeep
    const TRIVIAL: bool = false;

    /// Summary of a subtree holding only the given element
    fn single(handle: &HeapRef, key: &K) -> Self;

    /// Summary of a subtree from its root's own summary and its children's
    fn combine(left: Option<&Self>, root: Self, right: Option<&Self>) -> Self;
}

impl<K> Augment<K> for () {
    const TRIVIAL: bool = true;

    fn single(_: &HeapRef, _: &K) -> Self {}

    fn combine(_: Option<&Self>, _: Self, _: Option<&Self>) -> Self {}
}

/// Size, minimum and maximum of a subtree
#[derive(Debug, Clone)]
pub struct SubtreeStats {
    size: usize,
    min: HeapRef,
    max: HeapRef,
}

impl SubtreeStats {
    /// Number of elements in the subtree, at least one
    pub fn size(&self) -> usize {
        self.size
    }

    /// Smallest element of the subtree
    pub fn min(&self) -> &HeapRef {
        &self.min
    }

    /// Greatest element of the subtree
    pub fn max(&self) -> &HeapRef {
        &self.max
    }
}

impl<K> Augment<K> for SubtreeStats {
    fn single(handle: &HeapRef, _: &K) -> Self {
        SubtreeStats {
            size: 1,
            min: handle.clone(),
            max: handle.clone(),
        }
    }

    fn combine(left: Option<&Self>, root: Self, right: Option<&Self>) -> Self {
        SubtreeStats {
            size: left.map_or(0, |s| s.size) + root.size + right.map_or(0, |s| s.size),
            min: left.map_or(root.min, |s| s.min.clone()),
            max: right.map_or(root.max, |s| s.max.clone()),
        }
    }
}

/// Red-Black Tree
///
/// # Example
///
/// ```rust
/// use referenceable_heaps::red_black::RedBlackTree;
/// use referenceable_heaps::{BinarySearchTree, ReferenceableHeap};
///
/// let mut tree = RedBlackTree::new();
/// for k in [5, 10, 20] {
///     tree.insert(k, k * 100);
/// }
/// let floor = tree.find_or_smaller(&15).unwrap();
/// assert_eq!(tree.key(&floor), Ok(&10));
/// assert!(tree.split_greater(&10).is_err());
/// ```
///
/// With subtree statistics:
///
/// ```rust
/// use referenceable_heaps::red_black::{RedBlackTree, SubtreeStats};
/// use referenceable_heaps::ReferenceableHeap;
///
/// let mut tree: RedBlackTree<i32, (), SubtreeStats> = RedBlackTree::default();
/// let h1 = tree.insert_key(1);
/// let h2 = tree.insert_key(2);
/// let h3 = tree.insert_key(3);
///
/// // 2 ends up at the root, above 1 and 3
/// assert_eq!(tree.subtree_size(&h2), Ok(3));
/// assert_eq!(tree.subtree_min(&h2), Ok(h1.clone()));
/// assert_eq!(tree.subtree_max(&h2), Ok(h3));
/// assert_eq!(tree.subtree_size(&h1), Ok(1));
/// ```
pub struct RedBlackTree<K, V = (), A = ()> {
    root: Link<K, V, Extra<A>>,
    len: usize,
    cmp: Comparator<K>,
    owner: Rc<Owner>,
    _phantom: PhantomData<Box<bst::TreeNode<K, V, Extra<A>>>>,
}

/// In-order iterator over a [`RedBlackTree`]
pub struct Iter<'a, K, V, A = ()> {
    inner: InOrder<'a, K, V, Extra<A>>,
}

impl<'a, K, V, A> Iterator for Iter<'a, K, V, A> {
    type Item = (&'a HeapRef, &'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K: Ord, V> RedBlackTree<K, V> {
    /// Creates an empty tree ordered by the natural order of `K`
    pub fn new() -> Self {
        Self::with_comparator(Comparator::natural())
    }
}

impl<K, V> RedBlackTree<K, V> {
    /// Creates an empty tree ordered by `cmp`
    pub fn with_comparator(cmp: Comparator<K>) -> Self {
        Self::with_augment(cmp)
    }
}

impl<K: Ord, V, A: Augment<K>> Default for RedBlackTree<K, V, A> {
    fn default() -> Self {
        Self::with_augment(Comparator::natural())
    }
}

impl<K, V, A> Drop for RedBlackTree<K, V, A> {
    fn drop(&mut self) {
        let root = self.root.take();
        unsafe { bst::free_tree(root) };
        Owner::leave(&self.owner);
    }
}

unsafe fn color<K, V, A>(node: Link<K, V, Extra<A>>) -> Color {
    match node {
        Some(node) => (*node.as_ptr()).extra.color,
        None => Color::Black,
    }
}

unsafe fn set_color<K, V, A>(node: Node<K, V, A>, color: Color) {
    (*node.as_ptr()).extra.color = color;
}

unsafe fn summary_of<'a, K, V, A>(node: Link<K, V, Extra<A>>) -> Option<&'a A> {
    node.map(|n| &(*n.as_ptr()).extra.summary)
}

/// Rebuilds the summary of `node` from its children
unsafe fn refresh<K, V, A: Augment<K>>(node: Node<K, V, A>) {
    if A::TRIVIAL {
        return;
    }
    let n = node.as_ptr();
    let summary = A::combine(
        summary_of((*n).left),
        A::single(&(*n).handle, &(*n).key),
        summary_of((*n).right),
    );
    (*n).extra.summary = summary;
}

/// Rebuilds the summaries from `node` up to the root
unsafe fn refresh_upwards<K, V, A: Augment<K>>(mut node: Link<K, V, Extra<A>>) {
    if A::TRIVIAL {
        return;
    }
    while let Some(n) = node {
        refresh(n);
        node = (*n.as_ptr()).parent;
    }
}

impl<K, V, A: Augment<K>> RedBlackTree<K, V, A> {
    /// Creates an empty tree ordered by `cmp` whose nodes carry `A` summaries
    pub fn with_augment(cmp: Comparator<K>) -> Self {
        Self {
            root: None,
            len: 0,
            cmp,
            owner: Owner::new(),
            _phantom: PhantomData,
        }
    }

    /// Summary of the subtree currently rooted at the element of `handle`
    ///
    /// **Time Complexity**: O(1)
    pub fn summary(&self, handle: &HeapRef) -> Result<&A> {
        let node = self.node(handle)?;
        Ok(unsafe { &(*node.as_ptr()).extra.summary })
    }

    fn node(&self, handle: &HeapRef) -> Result<Node<K, V, A>> {
        bst::resolve(handle, &self.owner, self.root)
    }

    fn handle_of(node: Link<K, V, Extra<A>>) -> Option<HeapRef> {
        node.map(|node| unsafe { (*node.as_ptr()).handle.clone() })
    }

    unsafe fn rotate_left(&mut self, node: Node<K, V, A>) {
        let Some(child) = (*node.as_ptr()).right else {
            return;
        };
        let grandchild = (*child.as_ptr()).left;

        (*node.as_ptr()).right = grandchild;
        if let Some(grandchild) = grandchild {
            (*grandchild.as_ptr()).parent = Some(node);
        }
        bst::replace_child(&mut self.root, node, Some(child));
        (*child.as_ptr()).left = Some(node);
        (*node.as_ptr()).parent = Some(child);
        refresh(node);
        refresh(child);
    }

    unsafe fn rotate_right(&mut self, node: Node<K, V, A>) {
        let Some(child) = (*node.as_ptr()).left else {
            return;
        };
        let grandchild = (*child.as_ptr()).right;

        (*node.as_ptr()).left = grandchild;
        if let Some(grandchild) = grandchild {
            (*grandchild.as_ptr()).parent = Some(node);
        }
        bst::replace_child(&mut self.root, node, Some(child));
        (*child.as_ptr()).right = Some(node);
        (*node.as_ptr()).parent = Some(child);
        refresh(node);
        refresh(child);
    }

    /// Rotates left if `left`, otherwise right
    unsafe fn rotate(&mut self, node: Node<K, V, A>, left: bool) {
        if left {
            self.rotate_left(node);
        } else {
            self.rotate_right(node);
        }
    }

    /// Inserts a detached node and restores the colouring
    unsafe fn attach(&mut self, node: Node<K, V, A>) {
        match self.root {
            None => {
                set_color(node, Color::Black);
                refresh(node);
                self.root = Some(node);
            }
            Some(root) => {
                bst::insert_leaf(root, &self.cmp, node);
                refresh_upwards(Some(node));
                self.fix_after_insert(node);
            }
        }
        self.len += 1;
    }

    unsafe fn fix_after_insert(&mut self, node: Node<K, V, A>) {
        let mut node = node;
        set_color(node, Color::Red);

        while let Some(mut parent) = (*node.as_ptr()).parent {
            // parent is black, nothing is violated
            if color(Some(parent)) == Color::Black {
                return;
            }
            // red root parent, recolouring it is enough
            let Some(grandparent) = (*parent.as_ptr()).parent else {
                set_color(parent, Color::Black);
                return;
            };

            let parent_is_left = (*grandparent.as_ptr()).left == Some(parent);
            let uncle = if parent_is_left {
                (*grandparent.as_ptr()).right
            } else {
                (*grandparent.as_ptr()).left
            };

            if color(uncle) == Color::Black {
                // inner grandchild, rotate it to the outside first
                if parent_is_left && (*parent.as_ptr()).right == Some(node) {
                    self.rotate_left(parent);
                    parent = node;
                } else if !parent_is_left && (*parent.as_ptr()).left == Some(node) {
                    self.rotate_right(parent);
                    parent = node;
                }

                // outer grandchild
                if parent_is_left {
                    self.rotate_right(grandparent);
                } else {
                    self.rotate_left(grandparent);
                }
                set_color(parent, Color::Black);
                set_color(grandparent, Color::Red);
                return;
            }

            // red uncle: push the blackness down from the grandparent
            set_color(parent, Color::Black);
            if let Some(uncle) = uncle {
                set_color(uncle, Color::Black);
            }
            set_color(grandparent, Color::Red);
            node = grandparent;
        }

        // node climbed to the root
        set_color(node, Color::Black);
    }

    /// Unlinks a node with at most one child
    unsafe fn unlink(&mut self, node: Node<K, V, A>, replacement: Link<K, V, Extra<A>>) {
        let parent = (*node.as_ptr()).parent;
        bst::replace_child(&mut self.root, node, replacement);
        (*node.as_ptr()).parent = None;
        (*node.as_ptr()).left = None;
        (*node.as_ptr()).right = None;
        self.len -= 1;
        refresh_upwards(parent);
    }

    /// Takes an element out of the tree
    ///
    /// An element with two children first trades places with its successor, so the
    /// returned node (which holds the element) may differ from `node`.
    unsafe fn detach(&mut self, node: Node<K, V, A>) -> Node<K, V, A> {
        let mut node = node;
        if let (Some(_), Some(right)) = ((*node.as_ptr()).left, (*node.as_ptr()).right) {
            let successor = bst::min(right);
            bst::swap_payload(node, successor);
            node = successor;
        }

        let child = (*node.as_ptr()).left.or((*node.as_ptr()).right);
        let parent = (*node.as_ptr()).parent;

        // red nodes with a single child do not exist, a red node here is a leaf
        if color(Some(node)) == Color::Red {
            self.unlink(node, None);
            return node;
        }

        // black node with a single (red) child: the child takes its place
        if let Some(child) = child {
            set_color(child, Color::Black);
            self.unlink(node, Some(child));
            return node;
        }

        // black leaf: the parent's subtree on this side becomes one black short
        match parent {
            None => self.unlink(node, None),
            Some(parent) => {
                let left_is_short = (*parent.as_ptr()).left == Some(node);
                self.unlink(node, None);
                self.fix_after_remove(parent, left_is_short);
            }
        }
        node
    }

    unsafe fn fix_after_remove(&mut self, parent: Node<K, V, A>, left_is_short: bool) {
        let mut parent = parent;
        let mut left_is_short = left_is_short;

        loop {
            let far = |sibling: Node<K, V, A>| {
                if left_is_short {
                    ((*sibling.as_ptr()).right, (*sibling.as_ptr()).left)
                } else {
                    ((*sibling.as_ptr()).left, (*sibling.as_ptr()).right)
                }
            };
            let sibling = if left_is_short {
                (*parent.as_ptr()).right
            } else {
                (*parent.as_ptr()).left
            };
            // the short side is one black shorter, so the other side has a node
            let Some(mut sibling) = sibling else {
                return;
            };
            let (mut distant, mut close) = far(sibling);

            // red sibling: rotate it above the parent, making a black node the sibling
            if color(Some(sibling)) == Color::Red {
                self.rotate(parent, left_is_short);
                set_color(parent, Color::Red);
                set_color(sibling, Color::Black);

                let Some(next) = close else {
                    return;
                };
                sibling = next;
                (distant, close) = far(sibling);
            }

            // distant nephew red: one rotation at the parent fixes the black height
            if let Some(d) = distant.filter(|&d| color(Some(d)) == Color::Red) {
                self.rotate(parent, left_is_short);
                set_color(sibling, color(Some(parent)));
                set_color(parent, Color::Black);
                set_color(d, Color::Black);
                return;
            }

            // close nephew red: rotate it to the distant position, then as above
            if let Some(c) = close.filter(|&c| color(Some(c)) == Color::Red) {
                self.rotate(sibling, !left_is_short);
                self.rotate(parent, left_is_short);
                set_color(c, color(Some(parent)));
                set_color(parent, Color::Black);
                set_color(sibling, Color::Black);
                return;
            }

            // sibling and nephews black, red parent absorbs the difference
            if color(Some(parent)) == Color::Red {
                set_color(sibling, Color::Red);
                set_color(parent, Color::Black);
                return;
            }

            // everything black: shorten the sibling side too and move up
            set_color(sibling, Color::Red);
            let Some(grandparent) = (*parent.as_ptr()).parent else {
                return;
            };
            left_is_short = (*grandparent.as_ptr()).left == Some(parent);
            parent = grandparent;
        }
    }
}

impl<K, V> RedBlackTree<K, V, SubtreeStats> {
    /// Number of elements in the subtree rooted at the element of `handle`
    pub fn subtree_size(&self, handle: &HeapRef) -> Result<usize> {
        Ok(self.summary(handle)?.size())
    }

    /// Smallest element in the subtree rooted at the element of `handle`
    pub fn subtree_min(&self, handle: &HeapRef) -> Result<HeapRef> {
        Ok(self.summary(handle)?.min().clone())
    }

    /// Greatest element in the subtree rooted at the element of `handle`
    pub fn subtree_max(&self, handle: &HeapRef) -> Result<HeapRef> {
        Ok(self.summary(handle)?.max().clone())
    }
}

impl<K, V, A: Augment<K>> ReferenceableHeap<K, V> for RedBlackTree<K, V, A> {
    type Iter<'a>
        = Iter<'a, K, V, A>
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
        let (node, handle) = bst::alloc(&self.owner, key, value, |handle, key| Extra {
            color: Color::Red,
            summary: A::single(handle, key),
        });
        unsafe { self.attach(node) };
        handle
    }

    fn find_min(&mut self) -> Result<HeapRef> {
        let root = self.root.ok_or(HeapError::Empty)?;
        Ok(unsafe { (*bst::min(root).as_ptr()).handle.clone() })
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
    /// **Time Complexity**: O(1) if this tree is empty, otherwise O(m log(n + m))
    /// since the nodes of `other` are reinserted one by one (handles are kept).
    fn meld(&mut self, other: &mut Self) -> Result<()> {
        if !self.cmp.same_as(&other.cmp) {
            return Err(HeapError::ComparatorMismatch);
        }
        if other.root.is_none() {
            return Ok(());
        }

        if self.root.is_none() {
            self.root = other.root.take();
            self.len = std::mem::take(&mut other.len);
        } else {
            trace!("red-black meld reinserts {} nodes", other.len);
            for node in Teardown::new(other.root.take()) {
                unsafe { self.attach(node) };
            }
            other.len = 0;
        }

        Owner::hand_over(&mut other.owner, &self.owner);
        Ok(())
    }

    fn clear(&mut self) {
        let root = self.root.take();
        self.len = 0;
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

    fn iter(&self) -> Iter<'_, K, V, A> {
        Iter {
            inner: InOrder::new(self.root, self.len),
        }
    }

    fn find(&mut self, key: &K) -> Option<HeapRef> {
        Self::handle_of(unsafe { bst::find(self.root, &self.cmp, key, Miss::Nothing) })
    }
}

impl<K, V, A: Augment<K>> BinarySearchTree<K, V> for RedBlackTree<K, V, A> {
    fn find_max(&mut self) -> Result<HeapRef> {
        let root = self.root.ok_or(HeapError::Empty)?;
        Ok(unsafe { (*bst::max(root).as_ptr()).handle.clone() })
    }

    fn extract_max(&mut self) -> Result<(K, V)> {
        let root = self.root.ok_or(HeapError::Empty)?;
        unsafe {
            let node = self.detach(bst::max(root));
            Ok(bst::free(node))
        }
    }

    fn find_or_smaller(&mut self, key: &K) -> Option<HeapRef> {
        Self::handle_of(unsafe { bst::find(self.root, &self.cmp, key, Miss::Smaller) })
    }

    fn find_or_greater(&mut self, key: &K) -> Option<HeapRef> {
        Self::handle_of(unsafe { bst::find(self.root, &self.cmp, key, Miss::Greater) })
    }

    fn find_smaller(&mut self, key: &K) -> Option<HeapRef> {
        Self::handle_of(unsafe { bst::find_smaller(self.root, &self.cmp, key) })
    }

    fn find_greater(&mut self, key: &K) -> Option<HeapRef> {
        Self::handle_of(unsafe { bst::find_greater(self.root, &self.cmp, key) })
    }

    fn predecessor(&mut self, handle: &HeapRef) -> Result<Option<HeapRef>> {
        let node = self.node(handle)?;
        Ok(Self::handle_of(unsafe { bst::predecessor(node) }))
    }

    fn successor(&mut self, handle: &HeapRef) -> Result<Option<HeapRef>> {
        let node = self.node(handle)?;
        Ok(Self::handle_of(unsafe { bst::successor(node) }))
    }

    fn split_smaller(&mut self, _key: &K) -> Result<Self> {
        Err(HeapError::Unsupported("red-black tree"))
    }

    fn split_greater(&mut self, _key: &K) -> Result<Self> {
        Err(HeapError::Unsupported("red-black tree"))
    }

    fn split(&mut self, handle: &HeapRef) -> Result<Self> {
        self.node(handle)?;
        Err(HeapError::Unsupported("red-black tree"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bst::tests::check_links;

    /// Checks the colouring rules, returning the black height
    fn check_colors<K, V, A>(tree: &RedBlackTree<K, V, A>) -> usize {
        unsafe fn black_height<K, V, A>(node: Link<K, V, Extra<A>>) -> usize {
            let Some(n) = node else {
                return 1;
            };
            let (left, right) = ((*n.as_ptr()).left, (*n.as_ptr()).right);
            if color(node) == Color::Red {
                assert_eq!(color(left), Color::Black, "red node with red child");
                assert_eq!(color(right), Color::Black, "red node with red child");
            }
            let lh = black_height(left);
            assert_eq!(lh, black_height(right), "unequal black height");
            lh + usize::from(color(node) == Color::Black)
        }

        assert_eq!(check_links(tree.root, &tree.cmp), tree.len);
        unsafe {
            assert_eq!(color(tree.root), Color::Black);
            black_height(tree.root)
        }
    }

    /// Checks every stored size, minimum and maximum against the tree's shape
    fn check_stats<K, V>(tree: &RedBlackTree<K, V, SubtreeStats>) {
        unsafe fn check<K, V>(node: Link<K, V, Extra<SubtreeStats>>) -> usize {
            let Some(n) = node else {
                return 0;
            };
            let size = 1 + check((*n.as_ptr()).left) + check((*n.as_ptr()).right);
            let stats = &(*n.as_ptr()).extra.summary;
            assert_eq!(stats.size(), size, "stale subtree size");
            assert_eq!(stats.min(), &(*bst::min(n).as_ptr()).handle, "stale subtree min");
            assert_eq!(stats.max(), &(*bst::max(n).as_ptr()).handle, "stale subtree max");
            size
        }
        assert_eq!(unsafe { check(tree.root) }, tree.len);
    }

    #[test]
    fn test_basic_operations() {
        let mut tree: RedBlackTree<i32> = RedBlackTree::new();
        for k in [5, 3, 8, 1, 9, 2] {
            tree.insert_key(k);
            check_colors(&tree);
        }
        let keys: Vec<i32> = tree.iter().map(|(_, k, _)| *k).collect();
        assert_eq!(keys, vec![1, 2, 3, 5, 8, 9]);

        assert_eq!(tree.extract_min(), Ok((1, ())));
        assert_eq!(tree.extract_max(), Ok((9, ())));
        check_colors(&tree);
    }

    #[test]
    fn test_height_stays_logarithmic() {
        let mut tree: RedBlackTree<i32> = RedBlackTree::new();
        for k in 0..1023 {
            tree.insert_key(k);
        }
        // at most log₂(n + 1) black nodes plus the leaf level
        assert!(check_colors(&tree) <= 11);
        for k in (0..1023).step_by(3) {
            let h = tree.find(&k).unwrap();
            tree.remove(&h).unwrap();
            check_colors(&tree);
        }
        assert_eq!(tree.len(), 1023 - 341);
    }

    #[test]
    fn test_ordered_queries() {
        let mut tree: RedBlackTree<i32> = RedBlackTree::new();
        let h5 = tree.insert_key(5);
        let h10 = tree.insert_key(10);
        let h20 = tree.insert_key(20);

        assert_eq!(tree.find_or_smaller(&15), Some(h10.clone()));
        assert_eq!(tree.find_or_greater(&15), Some(h20.clone()));
        assert_eq!(tree.find_smaller(&10), Some(h5.clone()));
        assert_eq!(tree.find_greater(&10), Some(h20.clone()));
        assert_eq!(tree.find_or_smaller(&4), None);
        assert_eq!(tree.find_greater(&20), None);
        assert_eq!(tree.predecessor(&h10), Ok(Some(h5.clone())));
        assert_eq!(tree.successor(&h10), Ok(Some(h20.clone())));
        assert_eq!(tree.predecessor(&h5), Ok(None));
        assert_eq!(tree.find_max(), Ok(h20));
    }

    #[test]
    fn test_remove_node_with_two_children_keeps_handles() {
        let mut tree = RedBlackTree::new();
        let handles: Vec<_> = (0..15).map(|k| tree.insert(k, k * 10)).collect();
        let root_key = unsafe { (*tree.root.unwrap().as_ptr()).key };

        assert_eq!(tree.remove(&handles[root_key as usize]), Ok((root_key, root_key * 10)));
        check_colors(&tree);
        for (k, h) in handles.iter().enumerate() {
            if k as i32 != root_key {
                assert_eq!(tree.key(h), Ok(&(k as i32)));
                assert_eq!(tree.value(h), Ok(&(k as i32 * 10)));
            }
        }
    }

    #[test]
    fn test_rekey() {
        let mut tree: RedBlackTree<i32> = RedBlackTree::new();
        let handles: Vec<_> = (0..10).map(|k| tree.insert_key(k * 2)).collect();
        tree.decrease_key(&handles[7], -1).unwrap();
        tree.increase_key(&handles[0], 100).unwrap();
        check_colors(&tree);
        assert_eq!(tree.find_min(), Ok(handles[7].clone()));
        assert_eq!(tree.find_max(), Ok(handles[0].clone()));
        assert_eq!(tree.decrease_key(&handles[7], 0), Err(HeapError::KeyNotDecreased));
    }

    #[test]
    fn test_meld_reinserts() {
        let mut a: RedBlackTree<i32> = RedBlackTree::new();
        let mut b: RedBlackTree<i32> = RedBlackTree::new();
        for k in [1, 2, 6] {
            a.insert_key(k);
        }
        let hb: Vec<_> = [3, 4, 5].into_iter().map(|k| b.insert_key(k)).collect();

        a.meld(&mut b).unwrap();
        check_colors(&a);
        assert!(b.is_empty());
        assert!(hb.iter().all(|h| a.contains(h) && !b.contains(h)));
        let keys: Vec<i32> = a.iter().map(|(_, k, _)| *k).collect();
        assert_eq!(keys, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_splits_unsupported() {
        let mut tree: RedBlackTree<i32> = RedBlackTree::new();
        let h = tree.insert_key(1);
        assert_eq!(tree.split_smaller(&1).err(), Some(HeapError::Unsupported("red-black tree")));
        assert_eq!(tree.split_greater(&1).err(), Some(HeapError::Unsupported("red-black tree")));
        assert_eq!(tree.split(&h).err(), Some(HeapError::Unsupported("red-black tree")));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_random_operations_keep_colors() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(13);
        let mut heap: RedBlackTree<i32, (), SubtreeStats> = RedBlackTree::default();
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
                    let mut other: RedBlackTree<i32, (), SubtreeStats> = RedBlackTree::default();
                    for _ in 0..rng.gen_range(0..20) {
                        handles.push(other.insert(rng.gen_range(0..500), ()));
                    }
                    heap.meld(&mut other).unwrap();
                }
                _ => {}
            }
            check_colors(&heap);
            check_stats(&heap);
            assert_eq!(heap.len(), handles.len());
        }
    }

    #[test]
    fn test_subtree_stats() {
        let mut tree: RedBlackTree<i32, (), SubtreeStats> = RedBlackTree::default();
        let handles: Vec<_> = (0..64).map(|k| tree.insert_key(k)).collect();
        check_stats(&tree);

        let root = unsafe { (*tree.root.unwrap().as_ptr()).handle.clone() };
        assert_eq!(tree.subtree_size(&root), Ok(64));
        assert_eq!(tree.subtree_min(&root), Ok(handles[0].clone()));
        assert_eq!(tree.subtree_max(&root), Ok(handles[63].clone()));

        // removing the extremes moves the root's min and max inwards
        tree.extract_min().unwrap();
        tree.extract_max().unwrap();
        let root = unsafe { (*tree.root.unwrap().as_ptr()).handle.clone() };
        assert_eq!(tree.subtree_size(&root), Ok(62));
        assert_eq!(tree.subtree_min(&root), Ok(handles[1].clone()));
        assert_eq!(tree.subtree_max(&root), Ok(handles[62].clone()));

        // two-child removals swap payloads between nodes
        for h in handles[10..50].iter().step_by(2) {
            tree.remove(h).unwrap();
            check_stats(&tree);
        }
        tree.decrease_key(&handles[51], -5).unwrap();
        tree.increase_key(&handles[11], 500).unwrap();
        check_stats(&tree);
        let root = unsafe { (*tree.root.unwrap().as_ptr()).handle.clone() };
        assert_eq!(tree.subtree_min(&root), Ok(handles[51].clone()));
        assert_eq!(tree.subtree_max(&root), Ok(handles[11].clone()));

        for h in handles.iter().filter(|h| h.is_live()) {
            let size = tree.subtree_size(h).unwrap();
            assert!(size >= 1);
            let min = tree.subtree_min(h).unwrap();
            let max = tree.subtree_max(h).unwrap();
            assert!(tree.key(&min).unwrap() <= tree.key(h).unwrap());
            assert!(tree.key(h).unwrap() <= tree.key(&max).unwrap());
        }
        assert_eq!(tree.subtree_size(&handles[0]), Err(HeapError::InvalidHandle));
    }

    #[test]
    fn test_subtree_stats_after_meld() {
        let mut a: RedBlackTree<i32, (), SubtreeStats> = RedBlackTree::default();
        let mut b: RedBlackTree<i32, (), SubtreeStats> = RedBlackTree::default();
        let low = a.insert_key(-1);
        for k in 0..20 {
            a.insert_key(k * 2);
            b.insert_key(k * 2 + 1);
        }
        let high = b.insert_key(100);
        a.meld(&mut b).unwrap();
        check_colors(&a);
        check_stats(&a);
        let root = unsafe { (*a.root.unwrap().as_ptr()).handle.clone() };
        assert_eq!(a.subtree_size(&root), Ok(42));
        assert_eq!(a.subtree_min(&root), Ok(low));
        assert_eq!(a.subtree_max(&root), Ok(high));
    }
}
