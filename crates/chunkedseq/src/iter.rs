//! Position-indexed iteration (component H, iterator half) — see
//! `search.rs` for the shared predicate-search machinery this builds on.
//!
//! Grounded on
//! `examples/original_source/chunkedseq/include/iterator.hpp`'s
//! `random_access<Chunkedseq, Configuration>` class (its sibling
//! `bidirectional` class is an unimplemented stub in the source —
//! `assert(false); // todo` in every method — so it contributes nothing
//! here). The source's iterator carries a `cur` chunk pointer, a `seg`
//! segment cursor, and a parent-pointer `annotation` cache so that a
//! `+1`/`-1` step usually only touches the current chunk
//! (`chunk_search_by`) and falls back to `chunkedseq_search_by`'s
//! whole-tree search only when a step crosses a chunk boundary.
//!
//! This iterator instead calls [`Layer::locate`] fresh on every `next()`,
//! an O(log n) lookup per step rather than the amortized O(1) the
//! annotation cache buys in the source. `Annotation` (see `annotation.rs`)
//! is carried through `Chunk`/`Layer` regardless, ready for a future
//! finger-cached fast path; this iterator just doesn't consult it yet,
//! documented here rather than silently abandoned.

use crate::facade::ChunkedSeq;
use crate::measure::{Measure, SizeAccess};

/// Forward iterator over a [`ChunkedSeq`], indexing by position.
pub struct Iter<'a, Item, Meas, const K: usize>
where
    Meas: Measure<Item>,
{
    seq: &'a ChunkedSeq<Item, Meas, K>,
    front: i64,
    back: i64,
}

impl<'a, Item, Meas, const K: usize> Iter<'a, Item, Meas, K>
where
    Meas: Measure<Item>,
    Meas::M: SizeAccess,
{
    pub(crate) fn new(seq: &'a ChunkedSeq<Item, Meas, K>) -> Self {
        let len = seq.cached().size();
        Self {
            seq,
            front: 0,
            back: len,
        }
    }
}

impl<'a, Item, Meas, const K: usize> Iterator for Iter<'a, Item, Meas, K>
where
    Meas: Measure<Item> + Clone,
    Meas::M: SizeAccess,
{
    type Item = &'a Item;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let item = self.seq.layer().get_by_index(self.front);
        self.front += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = (self.back - self.front).max(0) as usize;
        (n, Some(n))
    }
}

impl<'a, Item, Meas, const K: usize> DoubleEndedIterator for Iter<'a, Item, Meas, K>
where
    Meas: Measure<Item> + Clone,
    Meas::M: SizeAccess,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        Some(self.seq.layer().get_by_index(self.back))
    }
}

/// `operator[]`: locates the item at absolute position `target` (0-based)
/// via [`crate::layer::Layer::get_by_index`], the real index fast path —
/// it never touches the client measure at all, only cached sizes.
pub fn get_by_index<'a, Item, M, const K: usize>(
    layer: &'a crate::layer::Layer<Item, M, K>,
    target: i64,
) -> &'a Item
where
    M: SizeAccess,
{
    layer.get_by_index(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facade::{new_deque, Deque};

    #[test]
    fn forward_iteration_matches_insertion_order() {
        let mut d: Deque<i32, 4> = new_deque();
        for i in 0..73 {
            d.push_back(i);
        }
        let collected: Vec<i32> = d.iter().copied().collect();
        assert_eq!(collected, (0..73).collect::<Vec<_>>());
    }

    #[test]
    fn reverse_iteration_matches_reversed_order() {
        let mut d: Deque<i32, 4> = new_deque();
        for i in 0..40 {
            d.push_back(i);
        }
        let collected: Vec<i32> = d.iter().rev().copied().collect();
        assert_eq!(collected, (0..40).rev().collect::<Vec<_>>());
    }

    #[test]
    fn meeting_in_the_middle_from_both_ends() {
        let mut d: Deque<i32, 4> = new_deque();
        for i in 0..30 {
            d.push_back(i);
        }
        let mut it = d.iter();
        assert_eq!(it.next(), Some(&0));
        assert_eq!(it.next_back(), Some(&29));
        assert_eq!(it.next(), Some(&1));
        assert_eq!(it.next_back(), Some(&28));
    }
}
