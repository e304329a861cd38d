//! Runtime selection of a heap or tree implementation.
//!
//! Algorithms that are generic over [`ReferenceableHeap`] can be instantiated with
//! any concrete structure. When the choice is only known at runtime (a command
//! line flag, a config file) the builders produce a closed wrapper that forwards
//! to the selected implementation.
//!
//! ## Example
//!
//! ```rust
//! use referenceable_heaps::builder::{HeapBuilder, HeapKind};
//! use referenceable_heaps::ReferenceableHeap;
//!
//! let kind: HeapKind = "fibonacci".parse().unwrap();
//! let mut heap = HeapBuilder::new().kind(kind).build::<u32, &str>();
//! let h = heap.insert(7, "seven");
//! heap.decrease_key(&h, 1).unwrap();
//! assert_eq!(heap.extract_min(), Ok((1, "seven")));
//! ```

use std::fmt;
use std::str::FromStr;

use log::debug;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::binomial::{self, BinomialHeap};
use crate::compare::Comparator;
use crate::fibonacci::{self, FibonacciHeap};
use crate::handle::HeapRef;
use crate::pairing::{self, PairingHeap};
use crate::red_black::{self, RedBlackTree};
use crate::splay::{self, SplayTree};
use crate::traits::{BinarySearchTree, HeapError, ReferenceableHeap, Result};

/// Available heap implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "kebab-case"))]
pub enum HeapKind {
    /// Pairing heap, the default: O(1) insert and meld, fast in practice.
    #[default]
    Pairing,
    /// Fibonacci heap: O(1) amortized decrease_key.
    Fibonacci,
    /// Binomial heap: O(log n) worst case for everything.
    Binomial,
    /// Red-black tree used as a heap.
    RedBlack,
    /// Splay tree used as a heap.
    Splay,
}

/// Available search tree implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "kebab-case"))]
pub enum TreeKind {
    /// Red-black tree: balanced, no splits.
    #[default]
    RedBlack,
    /// Splay tree: self-adjusting, efficient splits and melds.
    Splay,
}

/// Error returned when parsing an unknown implementation name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown implementation name: {0:?}")]
pub struct ParseKindError(String);

impl HeapKind {
    /// Every heap kind, in declaration order.
    pub const ALL: [HeapKind; 5] = [
        HeapKind::Pairing,
        HeapKind::Fibonacci,
        HeapKind::Binomial,
        HeapKind::RedBlack,
        HeapKind::Splay,
    ];

    /// The name used by [`FromStr`] and [`Display`](fmt::Display).
    pub fn as_str(self) -> &'static str {
        match self {
            HeapKind::Pairing => "pairing",
            HeapKind::Fibonacci => "fibonacci",
            HeapKind::Binomial => "binomial",
            HeapKind::RedBlack => "red-black",
            HeapKind::Splay => "splay",
        }
    }
}

impl TreeKind {
    /// The name used by [`FromStr`] and [`Display`](fmt::Display).
    pub fn as_str(self) -> &'static str {
        match self {
            TreeKind::RedBlack => "red-black",
            TreeKind::Splay => "splay",
        }
    }
}

impl fmt::Display for HeapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for TreeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HeapKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        HeapKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ParseKindError(s.to_owned()))
    }
}

impl FromStr for TreeKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "red-black" => Ok(TreeKind::RedBlack),
            "splay" => Ok(TreeKind::Splay),
            _ => Err(ParseKindError(s.to_owned())),
        }
    }
}

impl From<TreeKind> for HeapKind {
    fn from(kind: TreeKind) -> Self {
        match kind {
            TreeKind::RedBlack => HeapKind::RedBlack,
            TreeKind::Splay => HeapKind::Splay,
        }
    }
}

/// Heap of a kind chosen at runtime.
pub struct AnyHeap<K, V = ()> {
    inner: HeapInner<K, V>,
}

enum HeapInner<K, V> {
    Pairing(PairingHeap<K, V>),
    Fibonacci(FibonacciHeap<K, V>),
    Binomial(BinomialHeap<K, V>),
    RedBlack(RedBlackTree<K, V>),
    Splay(SplayTree<K, V>),
}

/// Iterator over an [`AnyHeap`].
pub struct AnyHeapIter<'a, K, V> {
    inner: HeapIterInner<'a, K, V>,
}

enum HeapIterInner<'a, K, V> {
    Pairing(pairing::Iter<'a, K, V>),
    Fibonacci(fibonacci::Iter<'a, K, V>),
    Binomial(binomial::Iter<'a, K, V>),
    RedBlack(red_black::Iter<'a, K, V>),
    Splay(splay::Iter<'a, K, V>),
}

macro_rules! each_heap {
    ($inner:expr, $heap:ident => $body:expr) => {
        match $inner {
            HeapInner::Pairing($heap) => $body,
            HeapInner::Fibonacci($heap) => $body,
            HeapInner::Binomial($heap) => $body,
            HeapInner::RedBlack($heap) => $body,
            HeapInner::Splay($heap) => $body,
        }
    };
}

impl<'a, K, V> Iterator for AnyHeapIter<'a, K, V> {
    type Item = (&'a HeapRef, &'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            HeapIterInner::Pairing(it) => it.next(),
            HeapIterInner::Fibonacci(it) => it.next(),
            HeapIterInner::Binomial(it) => it.next(),
            HeapIterInner::RedBlack(it) => it.next(),
            HeapIterInner::Splay(it) => it.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.inner {
            HeapIterInner::Pairing(it) => it.size_hint(),
            HeapIterInner::Fibonacci(it) => it.size_hint(),
            HeapIterInner::Binomial(it) => it.size_hint(),
            HeapIterInner::RedBlack(it) => it.size_hint(),
            HeapIterInner::Splay(it) => it.size_hint(),
        }
    }
}

impl<K, V> AnyHeap<K, V> {
    /// The implementation behind this heap.
    pub fn kind(&self) -> HeapKind {
        match self.inner {
            HeapInner::Pairing(_) => HeapKind::Pairing,
            HeapInner::Fibonacci(_) => HeapKind::Fibonacci,
            HeapInner::Binomial(_) => HeapKind::Binomial,
            HeapInner::RedBlack(_) => HeapKind::RedBlack,
            HeapInner::Splay(_) => HeapKind::Splay,
        }
    }
}

impl<K, V> fmt::Debug for AnyHeap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyHeap")
            .field("kind", &self.kind())
            .field("len", &self.len())
            .finish()
    }
}

impl<K, V> ReferenceableHeap<K, V> for AnyHeap<K, V> {
    type Iter<'a>
        = AnyHeapIter<'a, K, V>
    where
        Self: 'a,
        K: 'a,
        V: 'a;

    fn comparator(&self) -> &Comparator<K> {
        each_heap!(&self.inner, h => h.comparator())
    }

    fn len(&self) -> usize {
        each_heap!(&self.inner, h => h.len())
    }

    fn insert(&mut self, key: K, value: V) -> HeapRef {
        each_heap!(&mut self.inner, h => h.insert(key, value))
    }

    fn find_min(&mut self) -> Result<HeapRef> {
        each_heap!(&mut self.inner, h => h.find_min())
    }

    fn extract_min(&mut self) -> Result<(K, V)> {
        each_heap!(&mut self.inner, h => h.extract_min())
    }

    fn decrease_key(&mut self, handle: &HeapRef, new_key: K) -> Result<()> {
        each_heap!(&mut self.inner, h => h.decrease_key(handle, new_key))
    }

    fn increase_key(&mut self, handle: &HeapRef, new_key: K) -> Result<()> {
        each_heap!(&mut self.inner, h => h.increase_key(handle, new_key))
    }

    fn remove(&mut self, handle: &HeapRef) -> Result<(K, V)> {
        each_heap!(&mut self.inner, h => h.remove(handle))
    }

    /// Melds two heaps of the same kind.
    ///
    /// # Errors
    /// [`HeapError::ImplementationMismatch`] if the kinds differ.
    fn meld(&mut self, other: &mut Self) -> Result<()> {
        match (&mut self.inner, &mut other.inner) {
            (HeapInner::Pairing(a), HeapInner::Pairing(b)) => a.meld(b),
            (HeapInner::Fibonacci(a), HeapInner::Fibonacci(b)) => a.meld(b),
            (HeapInner::Binomial(a), HeapInner::Binomial(b)) => a.meld(b),
            (HeapInner::RedBlack(a), HeapInner::RedBlack(b)) => a.meld(b),
            (HeapInner::Splay(a), HeapInner::Splay(b)) => a.meld(b),
            _ => Err(HeapError::ImplementationMismatch),
        }
    }

    fn clear(&mut self) {
        each_heap!(&mut self.inner, h => h.clear())
    }

    fn contains(&self, handle: &HeapRef) -> bool {
        each_heap!(&self.inner, h => h.contains(handle))
    }

    fn key(&self, handle: &HeapRef) -> Result<&K> {
        each_heap!(&self.inner, h => h.key(handle))
    }

    fn value(&self, handle: &HeapRef) -> Result<&V> {
        each_heap!(&self.inner, h => h.value(handle))
    }

    fn value_mut(&mut self, handle: &HeapRef) -> Result<&mut V> {
        each_heap!(&mut self.inner, h => h.value_mut(handle))
    }

    fn iter(&self) -> AnyHeapIter<'_, K, V> {
        let inner = match &self.inner {
            HeapInner::Pairing(h) => HeapIterInner::Pairing(h.iter()),
            HeapInner::Fibonacci(h) => HeapIterInner::Fibonacci(h.iter()),
            HeapInner::Binomial(h) => HeapIterInner::Binomial(h.iter()),
            HeapInner::RedBlack(h) => HeapIterInner::RedBlack(h.iter()),
            HeapInner::Splay(h) => HeapIterInner::Splay(h.iter()),
        };
        AnyHeapIter { inner }
    }

    fn find(&mut self, key: &K) -> Option<HeapRef> {
        each_heap!(&mut self.inner, h => h.find(key))
    }
}

/// Builder for heaps of a runtime-selected kind.
#[derive(Debug, Clone, Default)]
pub struct HeapBuilder {
    kind: HeapKind,
}

impl HeapBuilder {
    /// Create a builder for the default kind ([`HeapKind::Pairing`]).
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the implementation.
    pub fn kind(mut self, kind: HeapKind) -> Self {
        self.kind = kind;
        self
    }

    /// Build an empty heap ordered by the natural order of `K`.
    pub fn build<K: Ord, V>(self) -> AnyHeap<K, V> {
        self.build_with(Comparator::natural())
    }

    /// Build an empty heap ordered by `cmp`.
    pub fn build_with<K, V>(self, cmp: Comparator<K>) -> AnyHeap<K, V> {
        debug!("building {} heap", self.kind);
        let inner = match self.kind {
            HeapKind::Pairing => HeapInner::Pairing(PairingHeap::with_comparator(cmp)),
            HeapKind::Fibonacci => HeapInner::Fibonacci(FibonacciHeap::with_comparator(cmp)),
            HeapKind::Binomial => HeapInner::Binomial(BinomialHeap::with_comparator(cmp)),
            HeapKind::RedBlack => HeapInner::RedBlack(RedBlackTree::with_comparator(cmp)),
            HeapKind::Splay => HeapInner::Splay(SplayTree::with_comparator(cmp)),
        };
        AnyHeap { inner }
    }
}

/// Search tree of a kind chosen at runtime.
pub struct AnyTree<K, V = ()> {
    inner: TreeInner<K, V>,
}

enum TreeInner<K, V> {
    RedBlack(RedBlackTree<K, V>),
    Splay(SplayTree<K, V>),
}

/// Iterator over an [`AnyTree`], in key order.
pub struct AnyTreeIter<'a, K, V> {
    inner: TreeIterInner<'a, K, V>,
}

enum TreeIterInner<'a, K, V> {
    RedBlack(red_black::Iter<'a, K, V>),
    Splay(splay::Iter<'a, K, V>),
}

macro_rules! each_tree {
    ($inner:expr, $tree:ident => $body:expr) => {
        match $inner {
            TreeInner::RedBlack($tree) => $body,
            TreeInner::Splay($tree) => $body,
        }
    };
}

impl<'a, K, V> Iterator for AnyTreeIter<'a, K, V> {
    type Item = (&'a HeapRef, &'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            TreeIterInner::RedBlack(it) => it.next(),
            TreeIterInner::Splay(it) => it.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.inner {
            TreeIterInner::RedBlack(it) => it.size_hint(),
            TreeIterInner::Splay(it) => it.size_hint(),
        }
    }
}

impl<K, V> AnyTree<K, V> {
    /// The implementation behind this tree.
    pub fn kind(&self) -> TreeKind {
        match self.inner {
            TreeInner::RedBlack(_) => TreeKind::RedBlack,
            TreeInner::Splay(_) => TreeKind::Splay,
        }
    }
}

impl<K, V> fmt::Debug for AnyTree<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyTree")
            .field("kind", &self.kind())
            .field("len", &self.len())
            .finish()
    }
}

impl<K, V> ReferenceableHeap<K, V> for AnyTree<K, V> {
    type Iter<'a>
        = AnyTreeIter<'a, K, V>
    where
        Self: 'a,
        K: 'a,
        V: 'a;

    fn comparator(&self) -> &Comparator<K> {
        each_tree!(&self.inner, t => t.comparator())
    }

    fn len(&self) -> usize {
        each_tree!(&self.inner, t => t.len())
    }

    fn insert(&mut self, key: K, value: V) -> HeapRef {
        each_tree!(&mut self.inner, t => t.insert(key, value))
    }

    fn find_min(&mut self) -> Result<HeapRef> {
        each_tree!(&mut self.inner, t => t.find_min())
    }

    fn extract_min(&mut self) -> Result<(K, V)> {
        each_tree!(&mut self.inner, t => t.extract_min())
    }

    fn decrease_key(&mut self, handle: &HeapRef, new_key: K) -> Result<()> {
        each_tree!(&mut self.inner, t => t.decrease_key(handle, new_key))
    }

    fn increase_key(&mut self, handle: &HeapRef, new_key: K) -> Result<()> {
        each_tree!(&mut self.inner, t => t.increase_key(handle, new_key))
    }

    fn remove(&mut self, handle: &HeapRef) -> Result<(K, V)> {
        each_tree!(&mut self.inner, t => t.remove(handle))
    }

    /// Melds two trees of the same kind.
    ///
    /// # Errors
    /// [`HeapError::ImplementationMismatch`] if the kinds differ.
    fn meld(&mut self, other: &mut Self) -> Result<()> {
        match (&mut self.inner, &mut other.inner) {
            (TreeInner::RedBlack(a), TreeInner::RedBlack(b)) => a.meld(b),
            (TreeInner::Splay(a), TreeInner::Splay(b)) => a.meld(b),
            _ => Err(HeapError::ImplementationMismatch),
        }
    }

    fn clear(&mut self) {
        each_tree!(&mut self.inner, t => t.clear())
    }

    fn contains(&self, handle: &HeapRef) -> bool {
        each_tree!(&self.inner, t => t.contains(handle))
    }

    fn key(&self, handle: &HeapRef) -> Result<&K> {
        each_tree!(&self.inner, t => t.key(handle))
    }

    fn value(&self, handle: &HeapRef) -> Result<&V> {
        each_tree!(&self.inner, t => t.value(handle))
    }

    fn value_mut(&mut self, handle: &HeapRef) -> Result<&mut V> {
        each_tree!(&mut self.inner, t => t.value_mut(handle))
    }

    fn iter(&self) -> AnyTreeIter<'_, K, V> {
        let inner = match &self.inner {
            TreeInner::RedBlack(t) => TreeIterInner::RedBlack(t.iter()),
            TreeInner::Splay(t) => TreeIterInner::Splay(t.iter()),
        };
        AnyTreeIter { inner }
    }

    fn find(&mut self, key: &K) -> Option<HeapRef> {
        each_tree!(&mut self.inner, t => t.find(key))
    }
}

impl<K, V> BinarySearchTree<K, V> for AnyTree<K, V> {
    fn find_max(&mut self) -> Result<HeapRef> {
        each_tree!(&mut self.inner, t => t.find_max())
    }

    fn extract_max(&mut self) -> Result<(K, V)> {
        each_tree!(&mut self.inner, t => t.extract_max())
    }

    fn find_or_smaller(&mut self, key: &K) -> Option<HeapRef> {
        each_tree!(&mut self.inner, t => t.find_or_smaller(key))
    }

    fn find_or_greater(&mut self, key: &K) -> Option<HeapRef> {
        each_tree!(&mut self.inner, t => t.find_or_greater(key))
    }

    fn find_smaller(&mut self, key: &K) -> Option<HeapRef> {
        each_tree!(&mut self.inner, t => t.find_smaller(key))
    }

    fn find_greater(&mut self, key: &K) -> Option<HeapRef> {
        each_tree!(&mut self.inner, t => t.find_greater(key))
    }

    fn predecessor(&mut self, handle: &HeapRef) -> Result<Option<HeapRef>> {
        each_tree!(&mut self.inner, t => t.predecessor(handle))
    }

    fn successor(&mut self, handle: &HeapRef) -> Result<Option<HeapRef>> {
        each_tree!(&mut self.inner, t => t.successor(handle))
    }

    fn split_smaller(&mut self, key: &K) -> Result<Self> {
        let inner = match &mut self.inner {
            TreeInner::RedBlack(t) => TreeInner::RedBlack(t.split_smaller(key)?),
            TreeInner::Splay(t) => TreeInner::Splay(t.split_smaller(key)?),
        };
        Ok(AnyTree { inner })
    }

    fn split_greater(&mut self, key: &K) -> Result<Self> {
        let inner = match &mut self.inner {
            TreeInner::RedBlack(t) => TreeInner::RedBlack(t.split_greater(key)?),
            TreeInner::Splay(t) => TreeInner::Splay(t.split_greater(key)?),
        };
        Ok(AnyTree { inner })
    }

    fn split(&mut self, handle: &HeapRef) -> Result<Self> {
        let inner = match &mut self.inner {
            TreeInner::RedBlack(t) => TreeInner::RedBlack(t.split(handle)?),
            TreeInner::Splay(t) => TreeInner::Splay(t.split(handle)?),
        };
        Ok(AnyTree { inner })
    }
}

/// Builder for search trees.
///
/// Without an explicit kind, requiring efficient splits or melds selects the
/// splay tree; otherwise the red-black tree is used.
#[derive(Debug, Clone, Default)]
pub struct TreeBuilder {
    kind: Option<TreeKind>,
    splits: bool,
    melds: bool,
}

impl TreeBuilder {
    /// Create a builder with no requirements.
    pub fn new() -> Self {
        Self::default()
    }

    /// Force the implementation, overriding the requirement flags.
    pub fn kind(mut self, kind: TreeKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Require efficient `split_smaller` / `split_greater` / `split`.
    pub fn splits(mut self, required: bool) -> Self {
        self.splits = required;
        self
    }

    /// Require efficient `meld`.
    pub fn melds(mut self, required: bool) -> Self {
        self.melds = required;
        self
    }

    /// The kind [`build`](Self::build) will produce.
    pub fn selected_kind(&self) -> TreeKind {
        self.kind.unwrap_or(if self.splits || self.melds {
            TreeKind::Splay
        } else {
            TreeKind::RedBlack
        })
    }

    /// Build an empty tree ordered by the natural order of `K`.
    pub fn build<K: Ord, V>(self) -> AnyTree<K, V> {
        self.build_with(Comparator::natural())
    }

    /// Build an empty tree ordered by `cmp`.
    pub fn build_with<K, V>(self, cmp: Comparator<K>) -> AnyTree<K, V> {
        let kind = self.selected_kind();
        debug!(
            "building {kind} tree (splits required: {}, melds required: {})",
            self.splits, self.melds
        );
        let inner = match kind {
            TreeKind::RedBlack => TreeInner::RedBlack(RedBlackTree::with_comparator(cmp)),
            TreeKind::Splay => TreeInner::Splay(SplayTree::with_comparator(cmp)),
        };
        AnyTree { inner }
    }
}
