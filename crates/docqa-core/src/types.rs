//! Domain types shared by the chunker, index, retriever and assembler.

use serde::{Deserialize, Serialize};
use std::ops::Range;

pub type DocId = String;
pub type Embedding = Vec<f32>;

/// A source document as produced by a `DocumentSource`.
///
/// - `id`: stable identity, unique within a corpus and across runs
/// - `text`: the raw content; never modified after acquisition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub text: String,
}

impl Document {
    pub fn new(id: impl Into<DocId>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into() }
    }
}

/// A contiguous slice of one document, the unit of retrieval.
///
/// - `doc_id`: the parent document
/// - `ordinal`: position of this chunk within the parent (0-based)
/// - `start`/`end`: character (not byte) offsets into the parent text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub doc_id: DocId,
    pub ordinal: usize,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl Chunk {
    /// Globally unique chunk identifier, `<doc_id>:<ordinal>`.
    pub fn id(&self) -> String {
        format!("{}:{}", self.doc_id, self.ordinal)
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.end - self.start
    }
}

/// One ranked retrieval hit. Higher `score` is always better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Result of a retrieval, ordered by descending score.
pub type RetrievalResult = Vec<ScoredChunk>;

/// Similarity metric used to rank index entries.
///
/// `Cosine` normalizes stored and query vectors to unit length and ranks by
/// inner product, so scores lie in `[-1, 1]`. `Dot` ranks by the raw inner
/// product and expects embeddings that are already normalized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Cosine,
    Dot,
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Metric::Cosine => "cosine",
            Metric::Dot => "dot",
        })
    }
}
