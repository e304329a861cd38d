//! Shared plumbing for heaps stored as child/sibling forests
//!
//! Pairing, Fibonacci and binomial heaps all encode their trees with a
//! "first child" and a "next sibling" link. This module provides the pre-order
//! traversal and the iterative teardown used by all three.

use std::marker::PhantomData;
use std::ptr::NonNull;

use smallvec::SmallVec;

use crate::handle::HeapRef;

pub(crate) type Link<N> = Option<NonNull<N>>;

/// Node of a child/sibling forest
pub(crate) trait ForestNode: Sized {
    type Key;
    type Value;

    fn first_child(&self) -> Link<Self>;
    fn next_sibling(&self) -> Link<Self>;
    fn handle(&self) -> &HeapRef;
    fn key(&self) -> &Self::Key;
    fn value(&self) -> &Self::Value;
}

/// Lazy pre-order traversal of a forest
pub(crate) struct PreOrder<'a, N> {
    stack: SmallVec<[NonNull<N>; 16]>,
    remaining: usize,
    _marker: PhantomData<&'a N>,
}

impl<'a, N: ForestNode> PreOrder<'a, N> {
    /// Traverses the trees rooted at `roots`, in the given order, following the
    /// sibling links of each root as well
    pub(crate) fn new<I>(roots: I, len: usize) -> Self
    where
        I: IntoIterator<Item = NonNull<N>>,
        I::IntoIter: DoubleEndedIterator,
    {
        PreOrder {
            stack: roots.into_iter().rev().collect(),
            remaining: len,
            _marker: PhantomData,
        }
    }
}

impl<'a, N: ForestNode + 'a> Iterator for PreOrder<'a, N> {
    type Item = (&'a HeapRef, &'a N::Key, &'a N::Value);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        // SAFETY: the iterator borrows the heap immutably for 'a, so every node
        // reachable from the roots stays alive and unmodified
        let node: &'a N = unsafe { &*node.as_ptr() };
        if let Some(next) = node.next_sibling() {
            self.stack.push(next);
        }
        if let Some(child) = node.first_child() {
            self.stack.push(child);
        }
        self.remaining = self.remaining.saturating_sub(1);
        Some((node.handle(), node.key(), node.value()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

/// Frees every node of the trees rooted at `roots` (and their siblings),
/// invalidating the handles
///
/// # Safety
/// Every node must have been allocated with `Box` and be owned by the caller; no
/// node may be reachable from anywhere else afterwards.
pub(crate) unsafe fn free_forest<N, I>(roots: I)
where
    N: ForestNode,
    I: IntoIterator<Item = NonNull<N>>,
{
    let mut stack: Vec<NonNull<N>> = roots.into_iter().collect();
    while let Some(node) = stack.pop() {
        let boxed = Box::from_raw(node.as_ptr());
        if let Some(next) = boxed.next_sibling() {
            stack.push(next);
        }
        if let Some(child) = boxed.first_child() {
            stack.push(child);
        }
        boxed.handle().release();
    }
}
