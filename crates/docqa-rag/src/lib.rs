//! docqa-rag
//!
//! The query path (retrieve, assemble, generate) and the offline index build.

pub mod answerer;
pub mod assembler;
pub mod build;
pub mod retriever;

pub use answerer::{Answer, Answerer};
pub use assembler::assemble;
pub use build::{build_index, build_index_verbose, read_chunks, write_chunks};
pub use retriever::retrieve;
