//! Debug assertion macros for the structural invariants of chunks and
//! layers, in the style of the source library's own `debug_assert_*!`
//! macros. Only active in debug builds (`#[cfg(debug_assertions)]`), so
//! there is zero overhead in release builds — release-mode correctness
//! relies instead on the plain `assert!`s at precondition boundaries in
//! `ringbuffer.rs`, `chunk.rs` and `layer.rs`, which are contract
//! violations and must remain fatal even outside debug.

// =============================================================================
// INV-CHUNK-01: Cached measure matches a fresh fold
// =============================================================================

/// Assert that a chunk's cached measure equals a fresh fold of its items.
///
/// **Invariant**: `cached = µ(a₀) ⊕ … ⊕ µ(aₙ₋₁)`
macro_rules! debug_assert_cache_matches_fold {
    ($cached:expr, $refolded:expr) => {
        debug_assert!(
            $cached == $refolded,
            "INV-CHUNK-01 violated: cached measure does not match a fresh fold of the chunk"
        )
    };
}

// =============================================================================
// INV-CHUNK-02: Bounded occupancy
// =============================================================================

/// Assert `0 <= size <= K`.
macro_rules! debug_assert_chunk_bounded {
    ($size:expr, $capacity:expr) => {
        debug_assert!(
            $size <= $capacity,
            "INV-CHUNK-02 violated: chunk size {} exceeds capacity {}",
            $size,
            $capacity
        )
    };
}

// =============================================================================
// INV-LAYER-01: Inner chunks are empty or exactly full
// =============================================================================

/// Assert that an inner chunk (front_inner / back_inner) is either empty or
/// at full capacity — deep-layer invariant 3.
macro_rules! debug_assert_inner_empty_or_full {
    ($len:expr, $capacity:expr) => {
        debug_assert!(
            $len == 0 || $len == $capacity,
            "INV-LAYER-01 violated: inner chunk has {} of {} items (must be empty or full)",
            $len,
            $capacity
        )
    };
}

// =============================================================================
// INV-LAYER-02: Outer non-emptiness
// =============================================================================

/// Assert that a non-empty deep layer has a non-empty front_outer —
/// deep-layer invariant 2.
macro_rules! debug_assert_front_outer_nonempty_when_deep {
    ($front_outer_len:expr) => {
        debug_assert!(
            $front_outer_len > 0,
            "INV-LAYER-02 violated: deep layer has an empty front_outer"
        )
    };
}

// =============================================================================
// INV-LAYER-03: Both outers empty implies middle empty
// =============================================================================

/// Assert invariant 4: if either outer is empty, its inner is empty and
/// middle is empty.
macro_rules! debug_assert_outer_empty_implies_middle_empty {
    ($outer_len:expr, $inner_len:expr, $middle_is_empty:expr) => {
        if $outer_len == 0 {
            debug_assert!(
                $inner_len == 0 && $middle_is_empty,
                "INV-LAYER-03 violated: empty outer but non-empty inner/middle"
            );
        }
    };
}

pub(crate) use debug_assert_cache_matches_fold;
pub(crate) use debug_assert_chunk_bounded;
pub(crate) use debug_assert_front_outer_nonempty_when_deep;
pub(crate) use debug_assert_inner_empty_or_full;
pub(crate) use debug_assert_outer_empty_implies_middle_empty;
