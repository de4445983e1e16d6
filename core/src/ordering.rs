//! Ordering policies for live collections.
//!
//! A policy is a total order over the records of one collection. Policies compose: the packing list for
//! example sorts by `category_order` and breaks ties by `created_at`:
//!
//! ```rust
//! use hearth_core::ordering::{by_key, OrderingPolicy};
//!
//! struct Row { rank: i32, created: u64 }
//! let policy = by_key(|r: &Row| r.rank).then(by_key(|r: &Row| r.created));
//! let (a, b) = (Row { rank: 1, created: 9 }, Row { rank: 1, created: 3 });
//! assert_eq!(policy.compare(&a, &b), std::cmp::Ordering::Greater);
//! ```
//!
//! The local store always breaks remaining ties by record id, so a policy that only orders by a coarse field
//! still yields a deterministic snapshot.

use std::{cmp::Ordering, marker::PhantomData};

use crate::record::Record;

pub trait OrderingPolicy<R>: Send + Sync {
    fn compare(&self, a: &R, b: &R) -> Ordering;

    /// Break ties of this policy with `next`
    fn then<P>(self, next: P) -> Then<Self, P>
    where
        Self: Sized,
        P: OrderingPolicy<R>,
    {
        Then(self, next)
    }

    /// Reverse this policy
    fn reversed(self) -> Descending<Self>
    where Self: Sized {
        Descending(self)
    }
}

impl<R, F> OrderingPolicy<R> for F
where F: Fn(&R, &R) -> Ordering + Send + Sync
{
    fn compare(&self, a: &R, b: &R) -> Ordering { self(a, b) }
}

/// Orders records by a key extracted from each record
pub struct ByKey<R, K, F> {
    key: F,
    _marker: PhantomData<fn(&R) -> K>,
}

pub fn by_key<R, K, F>(key: F) -> ByKey<R, K, F>
where
    K: Ord,
    F: Fn(&R) -> K + Send + Sync,
{
    ByKey { key, _marker: PhantomData }
}

impl<R, K, F> OrderingPolicy<R> for ByKey<R, K, F>
where
    K: Ord,
    F: Fn(&R) -> K + Send + Sync,
{
    fn compare(&self, a: &R, b: &R) -> Ordering { (self.key)(a).cmp(&(self.key)(b)) }
}

/// Reverses the wrapped policy
pub struct Descending<P>(P);

pub fn descending<P>(policy: P) -> Descending<P> { Descending(policy) }

impl<R, P: OrderingPolicy<R>> OrderingPolicy<R> for Descending<P> {
    fn compare(&self, a: &R, b: &R) -> Ordering { self.0.compare(b, a) }
}

/// Applies the second policy when the first one considers two records equal
pub struct Then<A, B>(A, B);

impl<R, A: OrderingPolicy<R>, B: OrderingPolicy<R>> OrderingPolicy<R> for Then<A, B> {
    fn compare(&self, a: &R, b: &R) -> Ordering { self.0.compare(a, b).then_with(|| self.1.compare(a, b)) }
}

/// The order actually used by the local store: the collection policy, then record id.
pub(crate) fn total_order<R: Record>(policy: &dyn OrderingPolicy<R>, a: &R, b: &R) -> Ordering {
    policy.compare(a, b).then_with(|| a.id().cmp(&b.id()))
}
