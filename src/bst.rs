//! Shared plumbing for the binary search trees
//!
//! Both trees store elements in nodes with parent, left and right links plus an
//! implementation specific field (the node colour of a red-black tree, the subtree
//! size of a splay tree). This module holds the operations that do not depend on
//! how the tree is balanced:
//!
//! - searches: exact, floor/ceiling and strict neighbours of a key
//! - navigation: extremes of a subtree, in-order predecessor and successor
//! - leaf insertion, payload exchange and teardown
//! - the in-order iterator
//!
//! Equal keys are inserted to the left of existing ones, so duplicates end up
//! adjacent in the in-order sequence.

use std::cmp::Ordering;
use std::marker::PhantomData;
use std::mem;
use std::ptr::NonNull;
use std::rc::Rc;

use crate::compare::Comparator;
use crate::handle::{HeapRef, Owner};
use crate::traits::{HeapError, Result};

pub(crate) struct TreeNode<K, V, X> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) handle: HeapRef,
    pub(crate) parent: Link<K, V, X>,
    pub(crate) left: Link<K, V, X>,
    pub(crate) right: Link<K, V, X>,
    pub(crate) extra: X,
}

pub(crate) type NodePtr<K, V, X> = NonNull<TreeNode<K, V, X>>;
pub(crate) type Link<K, V, X> = Option<NodePtr<K, V, X>>;

/// Allocates a detached node and binds a fresh handle to it
///
/// `extra` builds the balancing field from the new element.
pub(crate) fn alloc<K, V, X>(
    owner: &Rc<Owner>,
    key: K,
    value: V,
    extra: impl FnOnce(&HeapRef, &K) -> X,
) -> (NodePtr<K, V, X>, HeapRef) {
    let handle = HeapRef::new(owner);
    let extra = extra(&handle, &key);
    let node = NonNull::from(Box::leak(Box::new(TreeNode {
        key,
        value,
        handle: handle.clone(),
        parent: None,
        left: None,
        right: None,
        extra,
    })));
    handle.bind(node);
    (node, handle)
}

/// Frees a detached node, invalidating its handle
pub(crate) unsafe fn free<K, V, X>(node: NodePtr<K, V, X>) -> (K, V) {
    let node = Box::from_raw(node.as_ptr());
    node.handle.release();
    (node.key, node.value)
}

/// Frees a whole tree without recursion
pub(crate) unsafe fn free_tree<K, V, X>(root: Link<K, V, X>) {
    let mut stack: Vec<NodePtr<K, V, X>> = root.into_iter().collect();
    while let Some(node) = stack.pop() {
        let boxed = Box::from_raw(node.as_ptr());
        stack.extend(boxed.left);
        stack.extend(boxed.right);
        boxed.handle.release();
    }
}

/// Resolves a handle to a node of the tree rooted at `root`
///
/// O(1) while the tree is the only member of its family. Trees split from one
/// another share an owner, and then the family check is completed by walking up
/// to the root.
pub(crate) fn resolve<K, V, X>(
    handle: &HeapRef,
    owner: &Rc<Owner>,
    root: Link<K, V, X>,
) -> Result<NodePtr<K, V, X>> {
    let node = handle.resolve(owner)?;
    if !Owner::is_shared(owner) {
        return Ok(node);
    }
    if Some(unsafe { root_of(node) }) != root {
        return Err(HeapError::ForeignHandle);
    }
    Ok(node)
}

pub(crate) unsafe fn root_of<K, V, X>(mut node: NodePtr<K, V, X>) -> NodePtr<K, V, X> {
    while let Some(parent) = (*node.as_ptr()).parent {
        node = parent;
    }
    node
}

pub(crate) unsafe fn is_left_child<K, V, X>(node: NodePtr<K, V, X>) -> bool {
    match (*node.as_ptr()).parent {
        Some(parent) => (*parent.as_ptr()).left == Some(node),
        None => false,
    }
}

pub(crate) unsafe fn min<K, V, X>(mut node: NodePtr<K, V, X>) -> NodePtr<K, V, X> {
    while let Some(left) = (*node.as_ptr()).left {
        node = left;
    }
    node
}

pub(crate) unsafe fn max<K, V, X>(mut node: NodePtr<K, V, X>) -> NodePtr<K, V, X> {
    while let Some(right) = (*node.as_ptr()).right {
        node = right;
    }
    node
}

pub(crate) unsafe fn predecessor<K, V, X>(node: NodePtr<K, V, X>) -> Link<K, V, X> {
    if let Some(left) = (*node.as_ptr()).left {
        return Some(max(left));
    }
    let mut node = node;
    while let Some(parent) = (*node.as_ptr()).parent {
        if (*parent.as_ptr()).right == Some(node) {
            return Some(parent);
        }
        node = parent;
    }
    None
}

pub(crate) unsafe fn successor<K, V, X>(node: NodePtr<K, V, X>) -> Link<K, V, X> {
    if let Some(right) = (*node.as_ptr()).right {
        return Some(min(right));
    }
    let mut node = node;
    while let Some(parent) = (*node.as_ptr()).parent {
        if (*parent.as_ptr()).left == Some(node) {
            return Some(parent);
        }
        node = parent;
    }
    None
}

/// What a search returns when the key itself is absent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Miss {
    Nothing,
    Smaller,
    Greater,
}

/// Descends from `root` looking for `key`
pub(crate) unsafe fn find<K, V, X>(
    root: Link<K, V, X>,
    cmp: &Comparator<K>,
    key: &K,
    miss: Miss,
) -> Link<K, V, X> {
    let mut node = root?;
    loop {
        match cmp.compare(key, &(*node.as_ptr()).key) {
            Ordering::Less => match (*node.as_ptr()).left {
                Some(left) => node = left,
                None => {
                    return match miss {
                        Miss::Nothing => None,
                        Miss::Smaller => predecessor(node),
                        Miss::Greater => Some(node),
                    }
                }
            },
            Ordering::Greater => match (*node.as_ptr()).right {
                Some(right) => node = right,
                None => {
                    return match miss {
                        Miss::Nothing => None,
                        Miss::Smaller => Some(node),
                        Miss::Greater => successor(node),
                    }
                }
            },
            Ordering::Equal => return Some(node),
        }
    }
}

/// Greatest element strictly smaller than `key`
pub(crate) unsafe fn find_smaller<K, V, X>(root: Link<K, V, X>, cmp: &Comparator<K>, key: &K) -> Link<K, V, X> {
    let mut node = root?;
    loop {
        if cmp.compare(key, &(*node.as_ptr()).key) != Ordering::Greater {
            match (*node.as_ptr()).left {
                Some(left) => node = left,
                None => return predecessor(node),
            }
        } else {
            match (*node.as_ptr()).right {
                Some(right) => node = right,
                None => return Some(node),
            }
        }
    }
}

/// Smallest element strictly greater than `key`
pub(crate) unsafe fn find_greater<K, V, X>(root: Link<K, V, X>, cmp: &Comparator<K>, key: &K) -> Link<K, V, X> {
    let mut node = root?;
    loop {
        if cmp.compare(key, &(*node.as_ptr()).key) != Ordering::Less {
            match (*node.as_ptr()).right {
                Some(right) => node = right,
                None => return successor(node),
            }
        } else {
            match (*node.as_ptr()).left {
                Some(left) => node = left,
                None => return Some(node),
            }
        }
    }
}

/// Hangs a detached node as a new leaf under `root`; equal keys go left
pub(crate) unsafe fn insert_leaf<K, V, X>(root: NodePtr<K, V, X>, cmp: &Comparator<K>, node: NodePtr<K, V, X>) {
    let mut parent = root;
    loop {
        let slot = if cmp.compare(&(*node.as_ptr()).key, &(*parent.as_ptr()).key) != Ordering::Greater {
            &mut (*parent.as_ptr()).left
        } else {
            &mut (*parent.as_ptr()).right
        };
        match *slot {
            Some(next) => parent = next,
            None => {
                *slot = Some(node);
                (*node.as_ptr()).parent = Some(parent);
                return;
            }
        }
    }
}

/// Points whatever referenced `old` (its parent or the root) at `new`
pub(crate) unsafe fn replace_child<K, V, X>(
    root: &mut Link<K, V, X>,
    old: NodePtr<K, V, X>,
    new: Link<K, V, X>,
) {
    let parent = (*old.as_ptr()).parent;
    match parent {
        Some(p) if (*p.as_ptr()).left == Some(old) => (*p.as_ptr()).left = new,
        Some(p) => (*p.as_ptr()).right = new,
        None => *root = new,
    }
    if let Some(new) = new {
        (*new.as_ptr()).parent = parent;
    }
}

/// Exchanges the elements stored in two nodes, keeping the handles bound
///
/// The links and the balancing field stay with the positions.
pub(crate) unsafe fn swap_payload<K, V, X>(a: NodePtr<K, V, X>, b: NodePtr<K, V, X>) {
    let (x, y) = (&mut *a.as_ptr(), &mut *b.as_ptr());
    mem::swap(&mut x.key, &mut y.key);
    mem::swap(&mut x.value, &mut y.value);
    mem::swap(&mut x.handle, &mut y.handle);
    x.handle.bind(a);
    y.handle.bind(b);
}

/// Detaches the nodes of a tree one by one in post-order
///
/// Every yielded node has no links left; the caller takes ownership of it.
pub(crate) struct Teardown<K, V, X> {
    next: Link<K, V, X>,
}

impl<K, V, X> Teardown<K, V, X> {
    pub(crate) fn new(root: Link<K, V, X>) -> Self {
        Teardown { next: root }
    }
}

impl<K, V, X> Iterator for Teardown<K, V, X> {
    type Item = NodePtr<K, V, X>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut node = self.next?;
        unsafe {
            loop {
                if let Some(left) = (*node.as_ptr()).left {
                    node = left;
                } else if let Some(right) = (*node.as_ptr()).right {
                    node = right;
                } else {
                    break;
                }
            }
            let parent = (*node.as_ptr()).parent.take();
            if let Some(parent) = parent {
                if (*parent.as_ptr()).left == Some(node) {
                    (*parent.as_ptr()).left = None;
                } else {
                    (*parent.as_ptr()).right = None;
                }
            }
            self.next = parent;
        }
        Some(node)
    }
}

/// In-order iterator over a tree
pub(crate) struct InOrder<'a, K, V, X> {
    next: Link<K, V, X>,
    remaining: usize,
    _marker: PhantomData<&'a TreeNode<K, V, X>>,
}

impl<'a, K, V, X> InOrder<'a, K, V, X> {
    pub(crate) fn new(root: Link<K, V, X>, len: usize) -> Self {
        InOrder {
            next: root.map(|root| unsafe { min(root) }),
            remaining: len,
            _marker: PhantomData,
        }
    }
}

impl<'a, K: 'a, V: 'a, X: 'a> Iterator for InOrder<'a, K, V, X> {
    type Item = (&'a HeapRef, &'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        // SAFETY: the iterator borrows the tree immutably for 'a
        let node: &'a TreeNode<K, V, X> = unsafe { &*node.as_ptr() };
        self.next = unsafe { successor(NonNull::from(node)) };
        self.remaining = self.remaining.saturating_sub(1);
        Some((&node.handle, &node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}
