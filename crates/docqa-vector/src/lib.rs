//! docqa-vector
//!
//! Exact cosine / inner-product index over chunk embeddings, its on-disk
//! format, and the hot-swap slot used to publish rebuilt indexes.

pub mod index;
pub mod ops;
pub mod persist;
pub mod slot;

pub use index::{IndexEntry, VectorIndex};
pub use slot::IndexSlot;
