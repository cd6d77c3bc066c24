//! A Hinze-Paterson 2-3 finger tree (component F): an interchangeable
//! middle-sequence backing for `chunkedseq`'s bootstrapped layer.
//!
//! Grounded on `examples/original_source/chunkedseq/include/ftree.hpp`,
//! which the source library offers as an alternative representation to
//! its own chunk-bootstrapped `ctree` — same amortized O(1) push/pop at
//! both ends, same O(log n) split/concat, different internal shape (a
//! balanced 2-3 tree of nodes rather than a chain of fixed-capacity
//! chunks). See [`node`] for the `Node`/`Digit` building blocks and
//! [`tree`] for the `FingerTree` spine itself and why its self-recursion
//! needs no `ChunkPtr`-style split the way `chunkedseq::layer` does.
//!
//! This crate is not wired into `chunkedseq::ChunkedSeq` as a swappable
//! backing — the source treats `ctree` and `ftree` as two independent,
//! differently-named containers sharing an interface, not one container
//! parameterized over a backing choice, and this port keeps that shape.

mod node;
mod tree;

pub use node::{Digit, Node};
pub use tree::FingerTree;
