//! Predicate search over cached measures (component H, minus the iterator
//! itself — see `iter.rs`). Drives `split`, `operator[]`, and any
//! client-defined predicate search (e.g. the weighted-split scenario).
//!
//! Grounded on
//! `examples/original_source/chunkedseq/include/itemsearch.hpp`: linear
//! scan within a segment (`search_in_segment`), the one-or-two-segment
//! wraparound handling for a chunk (`search_in_fixed_capacity_queue`), and
//! the index-search fast path (`less_than_by_position`) that skips the
//! client measure entirely when the predicate is "position < i".

use crate::chunk::Chunk;
use crate::measure::{Measure, Monoid, SizeAccess};

/// Outcome of a search: the (one-based) position where the predicate first
/// held, and the measure of every item strictly before that position.
#[derive(Clone, Debug)]
pub struct SearchResult<Position, M> {
    pub position: Position,
    pub prefix: M,
}

/// Scans `items` left to right, combining `prefix` with each item's measure
/// in turn, and stops at the first item for which `pred` holds on the
/// running fold *including* that item. Returns the zero-based index of that
/// item within `items` (or `items.len()` if `pred` never held) along with
/// the prefix measure accumulated strictly before it.
pub fn search_in_segment<Item, M: Monoid>(
    items: &[Item],
    meas: &impl Measure<Item, M = M>,
    mut prefix: M,
    pred: &impl Fn(&M) -> bool,
) -> (usize, M) {
    for (i, item) in items.iter().enumerate() {
        let combined = prefix.combine(&meas.measure(item));
        if pred(&combined) {
            return (i, prefix);
        }
        prefix = combined;
    }
    (items.len(), prefix)
}

/// Searches a whole chunk (one or two segments due to ring wraparound) for
/// the first one-based position whose running fold satisfies `pred`.
pub fn search_in_chunk<Item, M: Monoid, const K: usize>(
    chunk: &Chunk<Item, M, K>,
    meas: &impl Measure<Item, M = M>,
    prefix: M,
    pred: &impl Fn(&M) -> bool,
) -> SearchResult<usize, M> {
    let (first, second) = chunk.segments();
    let (idx, new_prefix) = search_in_segment(first, meas, prefix, pred);
    if idx != first.len() {
        return SearchResult {
            position: idx + 1,
            prefix: new_prefix,
        };
    }
    let (idx2, new_prefix2) = search_in_segment(second, meas, new_prefix, pred);
    SearchResult {
        position: first.len() + idx2 + 1,
        prefix: new_prefix2,
    }
}

/// Index-search fast path: when the predicate is "position < target" (the
/// form used by `operator[]` and `split(i, other)`), the size component of
/// a combined `Pair<Sum, _>` measure tells us exactly which one-based
/// position inside a chunk of `len` items holds the target, without
/// touching the client measure at all — each item always contributes
/// exactly `Sum(1)` to the size half, so the position is pure arithmetic.
///
/// `prefix_size` is the number of items known to precede this chunk.
/// Returns `None` if `target` falls at or beyond `prefix_size + len`
/// (the predicate doesn't fire inside this chunk).
pub fn index_search_in_chunk(prefix_size: i64, len: usize, target: i64) -> Option<usize> {
    let local = target - prefix_size;
    if local < 0 || local >= len as i64 {
        None
    } else {
        Some(local as usize + 1)
    }
}

/// A predicate usable with the index fast path: "is `target` strictly less
/// than the running size?" — `Measure::<_>::M` must expose [`SizeAccess`].
pub fn less_than_by_position<M: SizeAccess>(target: i64) -> impl Fn(&M) -> bool {
    move |m: &M| target < m.size()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::{Pair, Sum, Trivial, TrivialMeasure, WithSize};

    #[test]
    fn search_in_segment_finds_threshold() {
        let meas = WithSize::new(TrivialMeasure);
        let items = [10, 20, 30, 40];
        let pred = less_than_by_position::<Pair<Sum, Trivial>>(2);
        let (idx, prefix) = search_in_segment(&items, &meas, Pair::identity(), &pred);
        assert_eq!(idx, 2);
        assert_eq!(prefix.0, Sum(2));
    }

    #[test]
    fn index_search_fast_path_matches_linear_scan() {
        assert_eq!(index_search_in_chunk(0, 5, 3), Some(4));
        assert_eq!(index_search_in_chunk(5, 5, 3), None);
        assert_eq!(index_search_in_chunk(2, 5, 4), Some(3));
    }
}
