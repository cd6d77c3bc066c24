//! Cached-measure policy: the monoid `(M, ⊕, e)` threaded through the tree,
//! plus the per-item measure function and the standard instantiations.
//!
//! Grounded on `examples/original_source/chunkedseq/include/algebra.hpp`
//! (the monoid/`has_inverse` split) and `measure.hpp` (the `trivial` /
//! `uniform` / `weight` measure functors and the `combiner` that builds a
//! product measure).

/// An associative combine with identity, optionally invertible.
///
/// `⊕` (`combine`) is **not** required to be commutative — callers must
/// respect left/right order, matching the source library's insistence that
/// combining a front cache with a newly-pushed front item is
/// `µ(x) ⊕ cached`, not the other way around.
///
/// Implementations that cannot support `O(1)` decrement on pop should leave
/// `HAS_INVERSE` at `false`; `inverse` then panics, and callers must instead
/// recompute the cache by folding the chunk from scratch. A measure type
/// picks one strategy and sticks to it — see the source library's own
/// discussion of this tradeoff, which explicitly warns against mixing
/// strategies within one measure.
pub trait Monoid: Clone {
    /// Whether [`Monoid::inverse`] is implemented.
    const HAS_INVERSE: bool = false;

    fn identity() -> Self;
    fn combine(&self, other: &Self) -> Self;

    /// Inverts a value so that `combine(inverse(x), x) == identity()`.
    ///
    /// # Panics
    /// Panics if `HAS_INVERSE` is `false`.
    fn inverse(&self) -> Self {
        panic!("Monoid::inverse called on a monoid without an inverse operator")
    }
}

/// A function from items (or ranges of items) to the cached-measure type.
pub trait Measure<Item> {
    type M: Monoid;

    fn measure(&self, item: &Item) -> Self::M;

    /// Folds a contiguous range of items. The default folds one at a time;
    /// implementations with a cheaper batched form (e.g. `size` just needs
    /// `range.len()`) should override it.
    fn measure_range(&self, items: &[Item]) -> Self::M {
        let mut acc = Self::M::identity();
        for item in items {
            acc = acc.combine(&self.measure(item));
        }
        acc
    }
}

/// The zero-size monoid: carries no information. Used when a sequence needs
/// no cached aggregate beyond raw structure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Trivial;

impl Monoid for Trivial {
    const HAS_INVERSE: bool = true;
    fn identity() -> Self {
        Trivial
    }
    fn combine(&self, _other: &Self) -> Self {
        Trivial
    }
    fn inverse(&self) -> Self {
        Trivial
    }
}

/// Measure that assigns every item the trivial value.
#[derive(Clone, Copy, Debug, Default)]
pub struct TrivialMeasure;

impl<Item> Measure<Item> for TrivialMeasure {
    type M = Trivial;
    fn measure(&self, _item: &Item) -> Trivial {
        Trivial
    }
}

/// Signed-integer-under-addition monoid. Signed so that `inverse` (negation)
/// is exact; this is the `size` and `weight` cached measure's algebra.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Sum(pub i64);

impl Monoid for Sum {
    const HAS_INVERSE: bool = true;
    fn identity() -> Self {
        Sum(0)
    }
    fn combine(&self, other: &Self) -> Self {
        Sum(self.0 + other.0)
    }
    fn inverse(&self) -> Self {
        Sum(-self.0)
    }
}

/// The `size` cached measure: every item counts as 1, so `Sum` at any node
/// equals the number of items in its subtree. Enables O(log n) indexing
/// independent of whatever client measure is also in play (see [`Pair`]).
#[derive(Clone, Copy, Debug, Default)]
pub struct SizeMeasure;

impl<Item> Measure<Item> for SizeMeasure {
    type M = Sum;
    fn measure(&self, _item: &Item) -> Sum {
        Sum(1)
    }
    fn measure_range(&self, items: &[Item]) -> Sum {
        Sum(items.len() as i64)
    }
}

/// The `weight` cached measure: a client-supplied integer-valued function,
/// summed via addition (so it shares `Sum`'s inverse).
#[derive(Clone)]
pub struct Weight<F> {
    f: F,
}

impl<F> Weight<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<Item, F> Measure<Item> for Weight<F>
where
    F: Fn(&Item) -> i64,
{
    type M = Sum;
    fn measure(&self, item: &Item) -> Sum {
        Sum((self.f)(item))
    }
}

/// Product of two monoids, combined pointwise.
///
/// The middle sequence of a deep layer always caches a `Pair<Sum, C>` (size
/// paired with the client measure `C`) so random access stays O(log n)
/// regardless of what `C` is — see `measure.hpp`'s `combiner`.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Pair<A, B>(pub A, pub B);

impl<A: Monoid, B: Monoid> Monoid for Pair<A, B> {
    const HAS_INVERSE: bool = A::HAS_INVERSE && B::HAS_INVERSE;

    fn identity() -> Self {
        Pair(A::identity(), B::identity())
    }
    fn combine(&self, other: &Self) -> Self {
        Pair(self.0.combine(&other.0), self.1.combine(&other.1))
    }
    fn inverse(&self) -> Self {
        Pair(self.0.inverse(), self.1.inverse())
    }
}

/// Pairs a client measure with `size`, producing the combined measure used
/// internally by middle sequences.
#[derive(Clone)]
pub struct WithSize<Inner> {
    pub inner: Inner,
}

impl<Inner> WithSize<Inner> {
    pub fn new(inner: Inner) -> Self {
        Self { inner }
    }
}

impl<Item, Inner> Measure<Item> for WithSize<Inner>
where
    Inner: Measure<Item>,
{
    type M = Pair<Sum, Inner::M>;

    fn measure(&self, item: &Item) -> Self::M {
        Pair(Sum(1), self.inner.measure(item))
    }

    fn measure_range(&self, items: &[Item]) -> Self::M {
        Pair(Sum(items.len() as i64), self.inner.measure_range(items))
    }
}

/// Extracts the `size` component out of a combined `Pair<Sum, _>` measure.
/// Grounds the source library's `size_access` accessor, which lets index
/// search skip whole sections using only the size half of the pair.
pub trait SizeAccess {
    fn size(&self) -> i64;
}

impl<B> SizeAccess for Pair<Sum, B> {
    fn size(&self) -> i64 {
        self.0 .0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum_inverse_round_trips() {
        let a = Sum(7);
        assert_eq!(a.combine(&a.inverse()), Sum::identity());
    }

    #[derive(Clone)]
    struct NoInverseMonoid;

    impl Monoid for NoInverseMonoid {
        fn identity() -> Self {
            NoInverseMonoid
        }
        fn combine(&self, _other: &Self) -> Self {
            NoInverseMonoid
        }
    }

    #[test]
    fn pair_inverse_requires_both_sides() {
        assert!(Pair::<Sum, Sum>::HAS_INVERSE);
        assert!(!Pair::<Sum, NoInverseMonoid>::HAS_INVERSE);
    }

    #[test]
    fn with_size_counts_items() {
        let m = WithSize::new(TrivialMeasure);
        let items = [(); 5];
        let combined: Pair<Sum, Trivial> = m.measure_range(&items);
        assert_eq!(combined.size(), 5);
    }
}
