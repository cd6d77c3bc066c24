//! Chunked sequence: a bootstrapped, cache-aware deque
//!
//! A double-ended sequence data structure built out of fixed-capacity
//! chunks, bootstrapped recursively so that push/pop/`operator[]`/split/
//! concat are all O(1) amortized or O(log n) while keeping a single flat
//! representation shallow for small sequences. Every node caches a
//! client-supplied monoidal measure of its contents, so consumers can
//! attach an arbitrary commutative-or-not aggregate (size, weight, a
//! last-key for an ordered map, ...) that stays correct incrementally
//! across every mutation.
//!
//! # Example
//!
//! ```
//! use chunkedseq::{new_deque, Deque};
//!
//! let mut d: Deque<i32, 512> = new_deque();
//! d.push_back(1);
//! d.push_back(2);
//! d.push_front(0);
//! assert_eq!(d.get(0), Some(&0));
//! assert_eq!(d.len(), 3);
//! assert_eq!(d.pop_front(), Some(0));
//! ```
//!
//! # Layout
//!
//! - [`ringbuffer`] (component A) — fixed-capacity double-ended storage.
//! - [`chunk`] (component B) — a ring buffer plus a cached measure.
//! - [`measure`] (component C) — the monoid/measure traits and standard
//!   instantiations (`Trivial`, `Sum`, `Weight`, `Pair`, `WithSize`).
//! - [`annotation`] (component D) — the parent-pointer cache that backs
//!   finger search.
//! - [`layer`] (component E) — the bootstrapped recursive engine.
//! - [`facade`] (component G) — the public container ([`ChunkedSeq`],
//!   [`Deque`], [`Stack`], [`Bag`]).
//! - [`search`] / [`iter`] (component H) — predicate search and
//!   position-indexed iteration.
//!
//! See `crates/chunkedseq-fingertree` for the Hinze–Paterson finger-tree
//! backing (component F), an interchangeable alternative to `layer`'s
//! bootstrapped middle sequence with the same operations and asymptotics.

mod annotation;
mod chunk;
mod facade;
mod invariants;
mod iter;
mod layer;
mod measure;
mod ringbuffer;
mod search;

pub use facade::{new_deque, Bag, ChunkedSeq, Deque, SizeCachedDeque, Stack};
pub use iter::Iter;
pub use measure::{Measure, Monoid, Pair, SizeAccess, Sum, Trivial, TrivialMeasure, Weight, WithSize};
