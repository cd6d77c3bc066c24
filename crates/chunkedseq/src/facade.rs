//! The top-level container (component G): a public, ergonomic API wrapped
//! around a depth-0 [`Layer`], plus the provided instantiations from
//! spec §6 (`Deque`, `Stack`, `Bag`).
//!
//! Grounded on
//! `examples/original_source/chunkedseq/include/chunkedseqbase.hpp` for the
//! method surface (`push_front`/`push_back`/`pop_front`/`pop_back`,
//! `operator[]`, `split`, `concat`, `for_each_segment`) and
//! `chunkedseq.hpp` for the provided type aliases. As noted in
//! `layer.rs`, the source needs a distinct `chunkedseqbase` class only to
//! bottom out its union-based recursion at the top; here it is just a
//! thin wrapper that owns the client [`Measure`] object alongside a
//! [`Layer`], since every `Layer` method takes the measure as an explicit
//! parameter rather than storing it.

use crate::layer::Layer;
use crate::measure::{Measure, Monoid, SizeAccess, Trivial, TrivialMeasure, WithSize};
use crate::search::less_than_by_position;

/// The chunked-sequence container: a double-ended, random-access,
/// splittable/concatenable sequence backed by a bootstrapped tree of
/// fixed-capacity chunks.
pub struct ChunkedSeq<Item, Meas, const K: usize>
where
    Meas: Measure<Item>,
{
    layer: Layer<Item, Meas::M, K>,
    meas: Meas,
}

impl<Item, Meas, const K: usize> ChunkedSeq<Item, Meas, K>
where
    Meas: Measure<Item>,
{
    pub fn new(meas: Meas) -> Self {
        Self {
            layer: Layer::new(),
            meas,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.layer.is_empty()
    }

    pub fn cached(&self) -> Meas::M {
        self.layer.cached()
    }

    pub(crate) fn layer(&self) -> &Layer<Item, Meas::M, K> {
        &self.layer
    }

    pub(crate) fn meas(&self) -> &Meas {
        &self.meas
    }

    pub fn front(&self) -> Option<&Item> {
        if self.layer.is_empty() {
            None
        } else {
            Some(self.layer.front())
        }
    }

    pub fn back(&self) -> Option<&Item> {
        if self.layer.is_empty() {
            None
        } else {
            Some(self.layer.back())
        }
    }

    pub fn push_front(&mut self, x: Item) {
        self.layer.push_front(&self.meas, x);
    }

    pub fn push_back(&mut self, x: Item) {
        self.layer.push_back(&self.meas, x);
    }

    pub fn pop_front(&mut self) -> Option<Item> {
        if self.layer.is_empty() {
            None
        } else {
            Some(self.layer.pop_front(&self.meas))
        }
    }

    pub fn pop_back(&mut self) -> Option<Item> {
        if self.layer.is_empty() {
            None
        } else {
            Some(self.layer.pop_back(&self.meas))
        }
    }

    pub fn pushn_back(&mut self, xs: impl IntoIterator<Item = Item>) {
        for x in xs {
            self.push_back(x);
        }
    }

    pub fn popn_back(&mut self, n: usize) -> Vec<Item> {
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            match self.pop_back() {
                Some(x) => out.push(x),
                None => break,
            }
        }
        out.reverse();
        out
    }

    /// Moves `other`'s items onto the back of `self`. Both sequences must
    /// have been built with the same measure (not enforced structurally,
    /// since the measure is a value, not a type-level fact — mismatched
    /// measures are a caller error, the same way combining two containers
    /// with different comparators would be in other libraries).
    pub fn concat(&mut self, other: &mut Self) {
        self.layer.concat(&self.meas, &mut other.layer);
    }

    /// Exchanges contents with `other` in O(1), the same way
    /// `std::swap` does for the source library's `chunkedseqbase`.
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(&mut self.layer, &mut other.layer);
        std::mem::swap(&mut self.meas, &mut other.meas);
    }

    /// Finds the item at the first position whose running fold under
    /// `pred` holds, without mutating `self` — the read-only counterpart
    /// of [`Self::split_by`], grounding the source's `search_by` (used
    /// e.g. by the ordered-map worked example to locate a key). Returns
    /// `None` if the sequence is empty or `pred` never holds.
    pub fn find_by(&self, pred: &impl Fn(&Meas::M) -> bool, prefix: Meas::M) -> Option<&Item> {
        if self.layer.is_empty() || !pred(&prefix.combine(&self.layer.cached())) {
            return None;
        }
        let (item, _prefix) = self.layer.locate(&self.meas, pred, prefix);
        Some(item)
    }

    /// Splits at the first position whose running fold under `pred` holds
    /// (see `search.rs`), given `prefix` as the fold of everything that
    /// notionally precedes this whole sequence (usually the identity).
    /// Returns `None` if the sequence is empty.
    pub fn split_by(
        &mut self,
        pred: &impl Fn(&Meas::M) -> bool,
        prefix: Meas::M,
    ) -> Option<(Item, Self)>
    where
        Meas: Clone,
    {
        if self.layer.is_empty() {
            return None;
        }
        let (pivot, _prefix, right) = self.layer.split(&self.meas, pred, prefix);
        Some((
            pivot,
            Self {
                layer: right,
                meas: self.meas.clone(),
            },
        ))
    }

}

impl<Item, Meas, const K: usize> ChunkedSeq<Item, Meas, K>
where
    Meas: Measure<Item> + Clone,
    Meas::M: SizeAccess,
{
    pub fn len(&self) -> usize {
        self.cached().size() as usize
    }

    /// `operator[]`: indexes in O(log n) via the size fast path in
    /// `search.rs`, never touching the client measure.
    pub fn get(&self, i: usize) -> Option<&Item> {
        if i >= self.len() {
            return None;
        }
        Some(crate::iter::get_by_index(&self.layer, i as i64))
    }

    /// Splits at item index `i`: `self` keeps items `0..i`, the returned
    /// sequence holds `i..len`. `i == len()` is allowed and yields an
    /// empty right half.
    pub fn split_at(&mut self, i: usize) -> Self {
        if i >= self.len() {
            return Self {
                layer: Layer::new(),
                meas: self.meas.clone(),
            };
        }
        let pred = less_than_by_position::<Meas::M>(i as i64);
        let (pivot, _prefix, mut right) = self.layer.split(&self.meas, &pred, Meas::M::identity());
        right.push_front(&self.meas, pivot);
        Self {
            layer: right,
            meas: self.meas.clone(),
        }
    }

    /// Inserts `x` at index `i`, shifting everything at or after `i` one
    /// position back, in O(log n) via `split_at` + `push_front` + `concat`.
    /// Returns `i`, the index `x` now occupies.
    pub fn insert(&mut self, i: usize, x: Item) -> usize {
        let i = i.min(self.len());
        let mut right = self.split_at(i);
        self.push_back(x);
        self.concat(&mut right);
        i
    }

    /// Removes items `[first, last)`, shifting everything after `last`
    /// forward, in O(log n + items erased). Returns `first`, the index the
    /// next remaining item (if any) now occupies.
    pub fn erase(&mut self, first: usize, last: usize) -> usize {
        let last = last.min(self.len());
        if first >= last {
            return first.min(self.len());
        }
        let mut tail = self.split_at(last);
        let mut middle = self.split_at(first);
        drop(middle.popn_back(last - first));
        debug_assert!(middle.is_empty());
        self.concat(&mut tail);
        first
    }

    pub fn iter(&self) -> crate::iter::Iter<'_, Item, Meas, K> {
        crate::iter::Iter::new(self)
    }

    /// Visits every maximal contiguous run of items with index in
    /// `[lo, hi)`, one `&[Item]` slice at a time — O(n/K) callback
    /// invocations rather than O(n), since each call spans a whole chunk
    /// segment instead of a single item. Delegates to [`Layer::for_each_segment`],
    /// which walks the same five-part routing as `get`/`locate` but clips
    /// each chunk's own ring-buffer segments (`Chunk::for_each_segment`)
    /// to the requested range instead of resolving single positions.
    pub fn for_each_segment(&self, lo: usize, hi: usize, mut f: impl FnMut(&[Item])) {
        let hi = hi.min(self.len());
        if lo >= hi {
            return;
        }
        self.layer.for_each_segment(lo, hi, &mut f);
    }
}

// ============================================================================
// PROVIDED INSTANTIATIONS (spec §6)
// ============================================================================

/// `deque<Item, K=512>`: no client measure, O(1) cached size via
/// [`WithSize`] over the trivial measure.
pub type Deque<Item, const K: usize> = ChunkedSeq<Item, WithSize<TrivialMeasure>, K>;

pub fn new_deque<Item, const K: usize>() -> Deque<Item, K> {
    Deque::new(WithSize::new(TrivialMeasure))
}

/// `deque<Item, K=512, size_cache>`: identical representation to
/// [`Deque`] in this crate — the source library's distinction between a
/// plain deque and a size-cached one collapses here because `WithSize`
/// is always cheap and always present (see `DESIGN.md`, Open Question 1
/// and its neighbors).
pub type SizeCachedDeque<Item, const K: usize> = Deque<Item, K>;

/// `stack<Item, K>`: backed by a growable chain of fixed-capacity `K`
/// chunks rather than the bootstrapped ring-buffer tree — per spec §6,
/// back operations (`push`/`pop`/`top`) are O(1) amortized, while front
/// operations are O(size), allowed but discouraged. Does not need a
/// client measure at all, so it uses [`Chunk`] directly with the
/// trivial monoid rather than going through [`ChunkedSeq`].
pub struct Stack<Item, const K: usize> {
    blocks: Vec<crate::chunk::Chunk<Item, Trivial, K>>,
}

impl<Item, const K: usize> Stack<Item, K> {
    pub fn new() -> Self {
        Self { blocks: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|b| b.is_empty())
    }

    pub fn len(&self) -> usize {
        self.blocks.iter().map(crate::chunk::Chunk::len).sum()
    }

    /// O(1) amortized: appends to the current top block, opening a fresh
    /// one once it fills.
    pub fn push(&mut self, x: Item) {
        if self.blocks.last().map_or(true, crate::chunk::Chunk::is_full) {
            self.blocks.push(crate::chunk::Chunk::new());
        }
        self.blocks.last_mut().unwrap().push_back(&TrivialMeasure, x);
    }

    /// O(1) amortized: pops off the current top block, dropping it once
    /// emptied.
    pub fn pop(&mut self) -> Option<Item> {
        loop {
            let block = self.blocks.last_mut()?;
            if block.is_empty() {
                self.blocks.pop();
                continue;
            }
            return Some(block.pop_back(&TrivialMeasure));
        }
    }

    pub fn top(&self) -> Option<&Item> {
        self.blocks.iter().rev().find(|b| !b.is_empty()).map(|b| b.back())
    }

    /// O(size): drains every item into a flat buffer, pushes `x` at
    /// position zero, and rebuilds the block chain.
    pub fn push_front(&mut self, x: Item) {
        let mut items = self.drain_all();
        items.insert(0, x);
        self.refill(items);
    }

    /// O(size): rebuilds the block chain after removing the very first
    /// item, or returns `None` if empty.
    pub fn pop_front(&mut self) -> Option<Item> {
        let mut items = self.drain_all();
        if items.is_empty() {
            return None;
        }
        let x = items.remove(0);
        self.refill(items);
        Some(x)
    }

    fn drain_all(&mut self) -> Vec<Item> {
        let mut out = Vec::with_capacity(self.len());
        for mut block in std::mem::take(&mut self.blocks) {
            while !block.is_empty() {
                out.push(block.pop_front(&TrivialMeasure));
            }
        }
        out
    }

    fn refill(&mut self, items: Vec<Item>) {
        for x in items {
            self.push(x);
        }
    }
}

impl<Item, const K: usize> Default for Stack<Item, K> {
    fn default() -> Self {
        Self::new()
    }
}

/// `bag<Item, K>`: an unordered variant that treats `push_front` as
/// `push_back` (spec §6) — both route through the facade's
/// `push_back`, so a `Bag` is a thin wrapper over [`Deque`] rather than
/// a distinct engine. `remove` prefers the back (matching `insert`'s
/// push_back, keeping the common insert/remove pattern a pure LIFO pair)
/// and falls back to the front only to drain whatever the (unused here)
/// front end might hold.
pub struct Bag<Item, const K: usize> {
    inner: Deque<Item, K>,
}

impl<Item, const K: usize> Bag<Item, K> {
    pub fn new() -> Self {
        Self {
            inner: new_deque(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn insert(&mut self, x: Item) {
        self.inner.push_back(x);
    }

    pub fn remove(&mut self) -> Option<Item> {
        self.inner.pop_back().or_else(|| self.inner.pop_front())
    }
}

impl<Item, const K: usize> Default for Bag<Item, K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deque_push_pop_both_ends() {
        let mut d: Deque<i32, 4> = new_deque();
        d.push_back(1);
        d.push_back(2);
        d.push_front(0);
        assert_eq!(d.len(), 3);
        assert_eq!(d.pop_front(), Some(0));
        assert_eq!(d.pop_back(), Some(2));
        assert_eq!(d.pop_front(), Some(1));
        assert_eq!(d.pop_front(), None);
    }

    #[test]
    fn deque_index_matches_insertion_order() {
        let mut d: Deque<i32, 4> = new_deque();
        for i in 0..37 {
            d.push_back(i);
        }
        for i in 0..37 {
            assert_eq!(d.get(i as usize), Some(&i));
        }
        assert_eq!(d.get(37), None);
    }

    #[test]
    fn stack_is_lifo() {
        let mut s: Stack<i32, 4> = Stack::new();
        for i in 0..10 {
            s.push(i);
        }
        for i in (0..10).rev() {
            assert_eq!(s.pop(), Some(i));
        }
        assert_eq!(s.pop(), None);
    }

    #[test]
    fn stack_front_operations_still_respect_order() {
        let mut s: Stack<i32, 4> = Stack::new();
        for i in 0..10 {
            s.push(i); // back: 0..10
        }
        s.push_front(-1);
        assert_eq!(s.pop_front(), Some(-1));
        for i in 0..10 {
            assert_eq!(s.pop_front(), Some(i));
        }
        assert_eq!(s.pop_front(), None);
    }

    #[test]
    fn bag_holds_every_inserted_item() {
        let mut b: Bag<i32, 4> = Bag::new();
        for i in 0..50 {
            b.insert(i);
        }
        let mut seen = Vec::new();
        while let Some(x) = b.remove() {
            seen.push(x);
        }
        seen.sort_unstable();
        assert_eq!(seen, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn insert_shifts_later_items_back() {
        let mut d: Deque<i32, 4> = new_deque();
        for i in [0, 1, 3, 4] {
            d.push_back(i);
        }
        let idx = d.insert(2, 2);
        assert_eq!(idx, 2);
        let collected: Vec<i32> = d.iter().copied().collect();
        assert_eq!(collected, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn erase_removes_range_and_shifts_tail_forward() {
        let mut d: Deque<i32, 4> = new_deque();
        for i in 0..10 {
            d.push_back(i);
        }
        d.erase(3, 6);
        let collected: Vec<i32> = d.iter().copied().collect();
        assert_eq!(collected, vec![0, 1, 2, 6, 7, 8, 9]);
    }

    #[test]
    fn swap_exchanges_contents() {
        let mut a: Deque<i32, 4> = new_deque();
        let mut b: Deque<i32, 4> = new_deque();
        for i in 0..5 {
            a.push_back(i);
        }
        for i in 100..103 {
            b.push_back(i);
        }
        a.swap(&mut b);
        assert_eq!(a.len(), 3);
        assert_eq!(b.len(), 5);
        assert_eq!(a.get(0), Some(&100));
        assert_eq!(b.get(0), Some(&0));
    }

    #[test]
    fn find_by_locates_without_mutating() {
        let mut d: Deque<i32, 4> = new_deque();
        for i in 0..25 {
            d.push_back(i);
        }
        let pred = less_than_by_position::<<WithSize<TrivialMeasure> as Measure<i32>>::M>(12);
        assert_eq!(d.find_by(&pred, <WithSize<TrivialMeasure> as Measure<i32>>::M::identity()), Some(&12));
        assert_eq!(d.len(), 25);

        let past_end = less_than_by_position::<<WithSize<TrivialMeasure> as Measure<i32>>::M>(100);
        assert_eq!(
            d.find_by(&past_end, <WithSize<TrivialMeasure> as Measure<i32>>::M::identity()),
            None
        );
    }

    #[test]
    fn split_at_divides_in_order() {
        let mut d: Deque<i32, 4> = new_deque();
        for i in 0..40 {
            d.push_back(i);
        }
        let mut right = d.split_at(17);
        assert_eq!(d.len(), 17);
        assert_eq!(right.len(), 23);
        for i in 0..17 {
            assert_eq!(d.pop_front(), Some(i));
        }
        for i in 17..40 {
            assert_eq!(right.pop_front(), Some(i));
        }
    }
}
