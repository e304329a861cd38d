//! Element handles and structure identity
//!
//! Every inserted element gets a [`HeapRef`]. The handle does not point at the node
//! directly: it shares a small slot with the node, and the structure clears the
//! slot when the element is removed. A handle whose slot is empty is stale and is
//! rejected with [`HeapError::InvalidHandle`] instead of touching freed memory.
//!
//! # Ownership
//!
//! A slot also records the [`Owner`] of its element. Owners form a union-find:
//!
//! - `meld` forwards the donor's owner to the acceptor's owner in O(1), so every
//!   handle of the donor resolves in the acceptor without being visited
//! - a tree produced by `split` keeps its source's owner, so the owner identifies a
//!   *family* of structures with a single node type
//!
//! The representative counts the live structures of its family. While a family
//! has a single member the owner check alone proves membership; only split
//! siblings make the search trees finish the check by walking to their root.
//!
//! Lookups compress the forwarding path, keeping resolution cheap after many melds.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ptr::NonNull;
use std::rc::Rc;

use crate::traits::{HeapError, Result};

/// Identity of a structure family
pub(crate) struct Owner {
    forward: RefCell<Option<Rc<Owner>>>,
    /// Live structures of the family, only meaningful on the representative
    members: Cell<usize>,
}

impl Owner {
    /// Owner of a new family with one member
    pub(crate) fn new() -> Rc<Owner> {
        Rc::new(Owner {
            forward: RefCell::new(None),
            members: Cell::new(1),
        })
    }

    /// Current representative of `owner`, compressing the forwarding path
    pub(crate) fn root(owner: &Rc<Owner>) -> Rc<Owner> {
        let mut root = Rc::clone(owner);
        loop {
            let next = root.forward.borrow().clone();
            match next {
                Some(next) => root = next,
                None => break,
            }
        }

        let mut cur = Rc::clone(owner);
        while !Rc::ptr_eq(&cur, &root) {
            let next = cur.forward.replace(Some(Rc::clone(&root)));
            match next {
                Some(next) => cur = next,
                None => break,
            }
        }
        root
    }

    /// Returns true if both owners belong to the same family
    pub(crate) fn same(a: &Rc<Owner>, b: &Rc<Owner>) -> bool {
        Rc::ptr_eq(a, b) || Rc::ptr_eq(&Owner::root(a), &Owner::root(b))
    }

    /// Makes everything owned by `donor` owned by `acceptor`
    pub(crate) fn forward(donor: &Rc<Owner>, acceptor: &Rc<Owner>) {
        let donor = Owner::root(donor);
        let acceptor = Owner::root(acceptor);
        if !Rc::ptr_eq(&donor, &acceptor) {
            acceptor.members.set(acceptor.members.get() + donor.members.get());
            *donor.forward.borrow_mut() = Some(acceptor);
        }
    }

    /// Meld bookkeeping: the donor's elements join `acceptor`'s family and the
    /// donor structure starts over as a family of its own
    pub(crate) fn hand_over(donor: &mut Rc<Owner>, acceptor: &Rc<Owner>) {
        Owner::forward(donor, acceptor);
        Owner::leave(donor);
        *donor = Owner::new();
    }

    /// Registers one more structure in the family of `owner`
    pub(crate) fn enlist(owner: &Rc<Owner>) -> Rc<Owner> {
        let root = Owner::root(owner);
        root.members.set(root.members.get() + 1);
        Rc::clone(owner)
    }

    /// Unregisters a structure that no longer uses `owner`
    pub(crate) fn leave(owner: &Rc<Owner>) {
        let root = Owner::root(owner);
        root.members.set(root.members.get().saturating_sub(1));
    }

    /// Returns true if more than one live structure belongs to the family
    pub(crate) fn is_shared(owner: &Rc<Owner>) -> bool {
        Owner::root(owner).members.get() > 1
    }
}

impl fmt::Debug for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Owner")
            .field("forwarded", &self.forward.borrow().is_some())
            .field("members", &self.members.get())
            .finish()
    }
}

struct Slot {
    /// Type-erased pointer to the element's node, `None` once removed
    node: Cell<Option<NonNull<()>>>,
    owner: RefCell<Rc<Owner>>,
}

/// Handle to an element of a heap or tree
///
/// Handles are cheap to clone and compare by identity: two handles are equal iff
/// they refer to the same inserted element. A handle stays valid until its element
/// is removed, even across melds and splits; afterwards every operation given the
/// handle fails with [`HeapError::InvalidHandle`].
#[derive(Clone)]
pub struct HeapRef {
    slot: Rc<Slot>,
}

impl HeapRef {
    pub(crate) fn new(owner: &Rc<Owner>) -> Self {
        HeapRef {
            slot: Rc::new(Slot {
                node: Cell::new(None),
                owner: RefCell::new(Rc::clone(owner)),
            }),
        }
    }

    /// Returns true while the element is stored in some structure
    pub fn is_live(&self) -> bool {
        self.slot.node.get().is_some()
    }

    pub(crate) fn bind<N>(&self, node: NonNull<N>) {
        self.slot.node.set(Some(node.cast()));
    }

    pub(crate) fn release(&self) {
        self.slot.node.set(None);
    }

    /// Resolves the handle to a node of the structure family `owner`
    ///
    /// The family check is what makes the cast sound: all structures of a family
    /// share a single node type.
    pub(crate) fn resolve<N>(&self, owner: &Rc<Owner>) -> Result<NonNull<N>> {
        let node = self.slot.node.get().ok_or(HeapError::InvalidHandle)?;
        let mine = Owner::root(&self.slot.owner.borrow());
        if !Owner::same(&mine, owner) {
            return Err(HeapError::ForeignHandle);
        }
        *self.slot.owner.borrow_mut() = mine;
        Ok(node.cast())
    }
}

impl PartialEq for HeapRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.slot, &other.slot)
    }
}

impl Eq for HeapRef {}

impl Hash for HeapRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Rc::as_ptr(&self.slot), state);
    }
}

impl fmt::Debug for HeapRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeapRef")
            .field("id", &Rc::as_ptr(&self.slot))
            .field("live", &self.is_live())
            .finish()
    }
}
