//! The chunk (component B): a ring buffer plus a cached monoidal measure of
//! its contents plus an optional annotation slot.
//!
//! Grounded on `examples/original_source/chunkedseq/include/chunk.hpp`.
//! Every mutating operation takes the client measure as an argument (`µ`,
//! here `meas: &impl Measure<Item, M = M>`) so the cache can be maintained
//! incrementally; the chunk itself only stores the resulting `M`, not the
//! measure function, because the same `Chunk<Item, M, K>` type is reused at
//! every bootstrapping depth with a *different* measure object even though
//! `M` stays fixed (inner layers measure chunk-pointers by reading their
//! already-cached value, rather than folding client items — see `layer.rs`).

use crate::annotation::Annotation;
use crate::invariants::{debug_assert_cache_matches_fold, debug_assert_chunk_bounded};
use crate::measure::{Measure, Monoid};
use crate::ringbuffer::RingBuffer;

/// A fixed-capacity (`K`) chunk: a ring buffer of items with a cached
/// monoidal measure `M`, refreshed by every mutating operation.
pub struct Chunk<Item, M, const K: usize> {
    items: RingBuffer<Item, K>,
    cached: M,
    annotation: Annotation<M>,
}

impl<Item, M: Monoid, const K: usize> Chunk<Item, M, K> {
    pub fn new() -> Self {
        Self {
            items: RingBuffer::new(),
            cached: M::identity(),
            annotation: Annotation::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.items.is_full()
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        K
    }

    #[inline]
    pub fn cached(&self) -> &M {
        &self.cached
    }

    pub fn annotation(&self) -> &Annotation<M> {
        &self.annotation
    }

    pub fn annotation_mut(&mut self) -> &mut Annotation<M> {
        &mut self.annotation
    }

    pub fn front(&self) -> &Item {
        self.items.front()
    }

    pub fn back(&self) -> &Item {
        self.items.back()
    }

    pub fn get(&self, i: usize) -> &Item {
        self.items.get(i)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    pub fn segments(&self) -> (&[Item], &[Item]) {
        self.items.segments()
    }

    /// Invokes `f` on one or two maximal contiguous slices covering logical
    /// range `[lo, hi)` — the chunk-level half of component G's
    /// `for_each_segment`.
    pub fn for_each_segment(&self, lo: usize, hi: usize, f: impl FnMut(&[Item])) {
        self.items.for_each_segment(lo, hi, f);
    }

    /// Recomputes `cached` from scratch by folding every item in order.
    /// Used after bulk moves, and on every pop when `M` has no inverse.
    pub fn reset_cache(&mut self, meas: &impl Measure<Item, M = M>) {
        let (a, b) = self.items.segments();
        let mut acc = meas.measure_range(a);
        acc = acc.combine(&meas.measure_range(b));
        self.cached = acc;
        debug_assert_chunk_bounded!(self.len(), K);
    }

    pub fn push_front(&mut self, meas: &impl Measure<Item, M = M>, x: Item) {
        let mx = meas.measure(&x);
        self.items.push_front(x);
        self.cached = mx.combine(&self.cached);
    }

    pub fn push_back(&mut self, meas: &impl Measure<Item, M = M>, x: Item) {
        let mx = meas.measure(&x);
        self.items.push_back(x);
        self.cached = self.cached.combine(&mx);
    }

    pub fn pop_front(&mut self, meas: &impl Measure<Item, M = M>) -> Item {
        let x = self.items.pop_front();
        if M::HAS_INVERSE {
            let mx = meas.measure(&x);
            self.cached = mx.inverse().combine(&self.cached);
        } else {
            self.reset_cache(meas);
        }
        x
    }

    pub fn pop_back(&mut self, meas: &impl Measure<Item, M = M>) -> Item {
        let x = self.items.pop_back();
        if M::HAS_INVERSE {
            let mx = meas.measure(&x);
            self.cached = self.cached.combine(&mx.inverse());
        } else {
            self.reset_cache(meas);
        }
        x
    }

    pub fn pushn_back(&mut self, meas: &impl Measure<Item, M = M>, xs: impl IntoIterator<Item = Item>) {
        for x in xs {
            self.push_back(meas, x);
        }
    }

    pub fn popn_back(&mut self, meas: &impl Measure<Item, M = M>, n: usize) -> Vec<Item> {
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(self.pop_back(meas));
        }
        out.reverse();
        out
    }

    pub fn transfer_from_back_to_front(
        &mut self,
        meas: &impl Measure<Item, M = M>,
        target: &mut Self,
        n: usize,
    ) {
        self.items.transfer_from_back_to_front(&mut target.items, n);
        self.reset_cache(meas);
        target.reset_cache(meas);
    }

    pub fn transfer_from_front_to_back(
        &mut self,
        meas: &impl Measure<Item, M = M>,
        target: &mut Self,
        n: usize,
    ) {
        self.items.transfer_from_front_to_back(&mut target.items, n);
        self.reset_cache(meas);
        target.reset_cache(meas);
    }

    /// Moves `other`'s items onto the back of `self`, emptying `other`.
    pub fn concat(&mut self, meas: &impl Measure<Item, M = M>, other: &mut Self) {
        let n = other.len();
        other.transfer_from_front_to_back(meas, self, n);
    }

    /// Splits at one-based position `pos` (`1 <= pos <= len()`): the pivot
    /// is the item currently at zero-based index `pos - 1`. Items strictly
    /// to its right move (in order) into a freshly created chunk; items
    /// strictly to its left stay in `self`. Returns `(pivot, prefix, other)`
    /// where `prefix` is the fold of the items that remain in `self`.
    ///
    /// This single formula subsumes both edge cases the source library
    /// handles separately: `pos == 1` leaves `self` empty after the pivot is
    /// popped (`prefix == identity`), and `pos == len()` leaves `other`
    /// empty (nothing to transfer).
    pub fn split(&mut self, meas: &impl Measure<Item, M = M>, pos: usize) -> (Item, M, Self) {
        assert!(pos >= 1 && pos <= self.len(), "split position out of range");
        let mut other = Self::new();
        let tail_count = self.len() - pos;
        self.transfer_from_back_to_front(meas, &mut other, tail_count);
        let pivot = self.pop_back(meas);
        (pivot, self.cached.clone(), other)
    }

    #[cfg(debug_assertions)]
    pub fn check(&self, meas: &impl Measure<Item, M = M>)
    where
        M: PartialEq,
    {
        let (a, b) = self.items.segments();
        let mut acc = meas.measure_range(a);
        acc = acc.combine(&meas.measure_range(b));
        debug_assert_cache_matches_fold!(self.cached, acc);
        debug_assert_chunk_bounded!(self.len(), K);
    }
}

impl<Item, M: Monoid, const K: usize> Default for Chunk<Item, M, K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::{Sum, WithSize, TrivialMeasure};

    #[test]
    fn push_back_updates_cached_size() {
        let meas = WithSize::new(TrivialMeasure);
        let mut c: Chunk<i32, crate::measure::Pair<Sum, crate::measure::Trivial>, 8> = Chunk::new();
        c.push_back(&meas, 1);
        c.push_back(&meas, 2);
        c.push_back(&meas, 3);
        assert_eq!(c.cached().0, Sum(3));
    }

    #[test]
    fn pop_front_decrements_cached_size_via_inverse() {
        let meas = WithSize::new(TrivialMeasure);
        let mut c: Chunk<i32, crate::measure::Pair<Sum, crate::measure::Trivial>, 8> = Chunk::new();
        for i in 0..4 {
            c.push_back(&meas, i);
        }
        c.pop_front(&meas);
        assert_eq!(c.cached().0, Sum(3));
    }

    #[test]
    fn split_edge_case_pivot_at_first_position() {
        let meas = WithSize::new(TrivialMeasure);
        let mut c: Chunk<i32, crate::measure::Pair<Sum, crate::measure::Trivial>, 8> = Chunk::new();
        for i in 0..4 {
            c.push_back(&meas, i);
        }
        let (pivot, prefix, other) = c.split(&meas, 1);
        assert_eq!(pivot, 0);
        assert_eq!(prefix.0, Sum(0));
        assert!(c.is_empty());
        assert_eq!(other.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn split_edge_case_pivot_at_last_position() {
        let meas = WithSize::new(TrivialMeasure);
        let mut c: Chunk<i32, crate::measure::Pair<Sum, crate::measure::Trivial>, 8> = Chunk::new();
        for i in 0..4 {
            c.push_back(&meas, i);
        }
        let (pivot, prefix, other) = c.split(&meas, 4);
        assert_eq!(pivot, 3);
        assert_eq!(prefix.0, Sum(3));
        assert!(other.is_empty());
        assert_eq!(c.iter().copied().collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn split_interior_position() {
        let meas = WithSize::new(TrivialMeasure);
        let mut c: Chunk<i32, crate::measure::Pair<Sum, crate::measure::Trivial>, 8> = Chunk::new();
        for i in 0..5 {
            c.push_back(&meas, i);
        }
        let (pivot, prefix, other) = c.split(&meas, 3);
        assert_eq!(pivot, 2);
        assert_eq!(prefix.0, Sum(2));
        assert_eq!(c.iter().copied().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(other.iter().copied().collect::<Vec<_>>(), vec![3, 4]);
    }
}
