//! Key ordering for heaps and trees
//!
//! Every structure is ordered by a [`Comparator`]: either the natural order of the
//! key type, or an explicit three-way comparison. Two structures can only be melded
//! when their comparators are the same, where "the same" means identity of the
//! comparator instance (clones share it), never a deep comparison of behaviour.

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

enum Order<K> {
    Natural(fn(&K, &K) -> Ordering),
    Custom(Rc<dyn Fn(&K, &K) -> Ordering>),
}

/// Three-way key comparison shared by a structure and everything melded into it
///
/// # Example
///
/// ```rust
/// use referenceable_heaps::Comparator;
/// use std::cmp::Ordering;
///
/// let natural = Comparator::<i32>::natural();
/// assert_eq!(natural.compare(&1, &2), Ordering::Less);
///
/// let reversed = Comparator::new(|a: &i32, b: &i32| b.cmp(a));
/// assert_eq!(reversed.compare(&1, &2), Ordering::Greater);
///
/// assert!(reversed.same_as(&reversed.clone()));
/// assert!(!reversed.same_as(&Comparator::new(|a: &i32, b: &i32| b.cmp(a))));
/// ```
pub struct Comparator<K> {
    order: Order<K>,
}

impl<K> Comparator<K> {
    /// Orders keys by their [`Ord`] implementation
    pub fn natural() -> Self
    where
        K: Ord,
    {
        Self {
            order: Order::Natural(K::cmp),
        }
    }

    /// Orders keys by an explicit comparison function
    pub fn new<F>(cmp: F) -> Self
    where
        F: Fn(&K, &K) -> Ordering + 'static,
    {
        Self {
            order: Order::Custom(Rc::new(cmp)),
        }
    }

    /// Compares two keys
    #[inline]
    pub fn compare(&self, a: &K, b: &K) -> Ordering {
        match &self.order {
            Order::Natural(cmp) => cmp(a, b),
            Order::Custom(cmp) => cmp(a, b),
        }
    }

    /// Returns true if `a` orders strictly before `b`
    #[inline]
    pub fn less(&self, a: &K, b: &K) -> bool {
        self.compare(a, b) == Ordering::Less
    }

    /// Returns true if this is the natural order of `K`
    pub fn is_natural(&self) -> bool {
        matches!(self.order, Order::Natural(_))
    }

    /// Returns true if both comparators are the same ordering instance
    ///
    /// Natural orders are always the same; custom comparators are the same only
    /// if one is a clone of the other.
    pub fn same_as(&self, other: &Self) -> bool {
        match (&self.order, &other.order) {
            (Order::Natural(_), Order::Natural(_)) => true,
            (Order::Custom(a), Order::Custom(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<K> Clone for Comparator<K> {
    fn clone(&self) -> Self {
        let order = match &self.order {
            Order::Natural(cmp) => Order::Natural(*cmp),
            Order::Custom(cmp) => Order::Custom(Rc::clone(cmp)),
        };
        Self { order }
    }
}

impl<K: Ord> Default for Comparator<K> {
    fn default() -> Self {
        Self::natural()
    }
}

impl<K> fmt::Debug for Comparator<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.order {
            Order::Natural(_) => f.write_str("Comparator::Natural"),
            Order::Custom(cmp) => write!(f, "Comparator::Custom({:p})", Rc::as_ptr(cmp)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_order() {
        let cmp = Comparator::<i32>::natural();
        assert_eq!(cmp.compare(&3, &3), Ordering::Equal);
        assert!(cmp.less(&-1, &0));
        assert!(cmp.is_natural());
    }

    #[test]
    fn test_identity_semantics() {
        let a = Comparator::<i32>::new(|x, y| y.cmp(x));
        let b = a.clone();
        let c = Comparator::<i32>::new(|x, y| y.cmp(x));
        assert!(a.same_as(&b));
        assert!(!a.same_as(&c));
        assert!(!a.same_as(&Comparator::natural()));
        assert!(Comparator::<i32>::natural().same_as(&Comparator::default()));
    }
}
