//! Exact nearest-neighbour index over chunk embeddings.
//!
//! The index is immutable once built: there is no insert or delete, a new
//! corpus means a new index. Searches take `&self` and can run concurrently.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, info};

use docqa_core::error::{Error, Result};
use docqa_core::types::{Chunk, Embedding, Metric, ScoredChunk};

use crate::ops::{dot, is_finite, normalize};

/// Allowed deviation from unit length for vectors stored under `Metric::Dot`.
pub const UNIT_NORM_TOLERANCE: f32 = 1e-3;

/// Checks one stored vector against the metric's requirements. Under `Dot`
/// every vector must already be unit length (zero vectors from empty text are
/// accepted), otherwise a longer vector could outrank an exact match.
pub(crate) fn check_stored_vector(vector: &[f32], metric: Metric) -> std::result::Result<(), String> {
    if !is_finite(vector) {
        return Err("has non-finite components".into());
    }
    if metric == Metric::Dot {
        let norm = dot(vector, vector).sqrt();
        if norm != 0.0 && (norm - 1.0).abs() > UNIT_NORM_TOLERANCE {
            return Err(format!("has norm {norm}, dot metric needs unit-length vectors"));
        }
    }
    Ok(())
}

/// One stored `(chunk, vector)` pair. For `Metric::Cosine` the vector is kept
/// already normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub vector: Embedding,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    pub(crate) dimension: usize,
    pub(crate) metric: Metric,
    pub(crate) embedder_id: String,
    pub(crate) entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Builds an index from `entries` in the given order; that order breaks
    /// score ties at search time. The dimension is taken from the first entry.
    pub fn build(entries: Vec<(Chunk, Embedding)>, metric: Metric, embedder_id: impl Into<String>) -> Result<Self> {
        let dimension = match entries.first() {
            None => return Err(Error::EmptyIndex),
            Some((_, v)) if v.is_empty() => {
                return Err(Error::InvalidArgument("embeddings must have at least one dimension".into()))
            }
            Some((_, v)) => v.len(),
        };

        let mut stored = Vec::with_capacity(entries.len());
        for (chunk, mut vector) in entries {
            if vector.len() != dimension {
                return Err(Error::DimensionMismatch { expected: dimension, actual: vector.len() });
            }
            if let Err(reason) = check_stored_vector(&vector, metric) {
                return Err(Error::InvalidArgument(format!("embedding for chunk {} {reason}", chunk.id())));
            }
            if metric == Metric::Cosine {
                normalize(&mut vector);
            }
            stored.push(IndexEntry { chunk, vector });
        }

        let index = Self { dimension, metric, embedder_id: embedder_id.into(), entries: stored };
        info!(entries = index.len(), dimension, %metric, embedder = %index.embedder_id, "built vector index");
        Ok(index)
    }

    /// Returns up to `k` entries by descending similarity. Equal scores keep
    /// insertion order. `k` larger than the index returns every entry.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if k == 0 {
            return Err(Error::InvalidArgument("k must be greater than 0".into()));
        }
        if query.len() != self.dimension {
            return Err(Error::DimensionMismatch { expected: self.dimension, actual: query.len() });
        }
        if !is_finite(query) {
            return Err(Error::InvalidArgument("query vector has non-finite components".into()));
        }

        let mut q = query.to_vec();
        if self.metric == Metric::Cosine {
            normalize(&mut q);
        }

        let mut scored: Vec<(usize, f32)> =
            self.entries.par_iter().enumerate().map(|(i, e)| (i, dot(&q, &e.vector))).collect();
        if scored.iter().any(|(_, score)| !score.is_finite()) {
            return Err(Error::InvalidArgument("query magnitude overflows similarity scores".into()));
        }

        let rank = |a: &(usize, f32), b: &(usize, f32)| -> Ordering { b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)) };
        let k = k.min(scored.len());
        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, rank);
            scored.truncate(k);
        }
        scored.sort_unstable_by(rank);

        debug!(k, candidates = self.entries.len(), top = scored.first().map(|s| s.1), "vector search");
        Ok(scored
            .into_iter()
            .map(|(i, score)| ScoredChunk { chunk: self.entries[i].chunk.clone(), score })
            .collect())
    }

    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
    pub fn dimension(&self) -> usize { self.dimension }
    pub fn metric(&self) -> Metric { self.metric }
    pub fn embedder_id(&self) -> &str { &self.embedder_id }
    pub fn entries(&self) -> &[IndexEntry] { &self.entries }
}
