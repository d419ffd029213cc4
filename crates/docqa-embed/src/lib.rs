//! docqa-embed
//!
//! Embedder implementations. `HashEmbedder` is a deterministic, dependency-free
//! feature-hashing model used offline and in tests. With the `local-model`
//! feature, `BertEmbedder` runs a sentence-transformers BERT checkpoint
//! (e.g. all-MiniLM-L6-v2) through candle.

use anyhow::{anyhow, Result};
use std::hash::Hasher;
use twox_hash::XxHash64;

use docqa_core::config::EmbeddingSettings;
use docqa_core::traits::Embedder;

#[cfg(feature = "local-model")]
mod device;
#[cfg(feature = "local-model")]
mod model;
#[cfg(feature = "local-model")]
mod pool;
#[cfg(feature = "local-model")]
mod tokenize;

#[cfg(feature = "local-model")]
pub use model::BertEmbedder;
#[cfg(feature = "local-model")]
pub use pool::masked_mean_l2;

pub const HASH_MODEL: &str = "hash-v1";

/// Signed feature hashing over lowercased word tokens, L2-normalized.
///
/// Texts sharing words land close together, which is enough for offline runs
/// and for exercising the pipeline. Empty or punctuation-only input maps to
/// the zero vector.
pub struct HashEmbedder {
    dim: usize,
    id: String,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim, id: format!("{HASH_MODEL}:d{dim}") }
    }

    fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase())
    }
}

impl Embedder for HashEmbedder {
    fn embedder_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.dim == 0 {
            return Err(anyhow!("embedding dimension must be greater than 0"));
        }
        let mut v = vec![0f32; self.dim];
        for token in Self::tokens(text) {
            let mut hasher = XxHash64::with_seed(0);
            hasher.write(token.as_bytes());
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
            v[idx] += sign;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v { *x /= norm; }
        }
        Ok(v)
    }
}

/// Builds the embedder named by `settings.model`.
///
/// `APP_USE_FAKE_EMBEDDINGS=1` forces the hashing embedder regardless of the
/// configured model, which keeps tests and development runs offline.
pub fn embedder_from_settings(settings: &EmbeddingSettings) -> Result<Box<dyn Embedder>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if use_fake || settings.model == HASH_MODEL {
        tracing::info!(dim = settings.dimension, "using hashing embedder");
        return Ok(Box::new(HashEmbedder::new(settings.dimension)));
    }
    load_local_model(settings)
}

#[cfg(feature = "local-model")]
fn load_local_model(settings: &EmbeddingSettings) -> Result<Box<dyn Embedder>> {
    let dir = model::resolve_model_dir(settings)?;
    Ok(Box::new(BertEmbedder::load(&settings.model, &dir)?))
}

#[cfg(not(feature = "local-model"))]
fn load_local_model(settings: &EmbeddingSettings) -> Result<Box<dyn Embedder>> {
    Err(anyhow!(
        "embedding model '{}' requires building docqa-embed with the `local-model` feature",
        settings.model
    ))
}
