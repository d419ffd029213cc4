use async_trait::async_trait;

use crate::types::{Document, Embedding};

/// Maps text to a fixed-length vector. Must be deterministic for identical
/// `(text, embedder_id)` pairs.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the model (e.g. `hash-v1:d384`).
    fn embedder_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn embed(&self, text: &str) -> anyhow::Result<Embedding>;

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Embedding>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Produces an answer for a fully assembled prompt. Failures are returned
/// as-is; retry policy belongs to the caller.
#[async_trait]
pub trait Generator: Send + Sync {
    fn name(&self) -> &str;
    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Yields the corpus. Identifiers must be stable across runs for an
/// unchanged source so that rebuilds are reproducible.
pub trait DocumentSource {
    fn load(&self) -> crate::error::Result<Vec<Document>>;
}

impl<E: Embedder + ?Sized> Embedder for Box<E> {
    fn embedder_id(&self) -> &str { (**self).embedder_id() }
    fn dim(&self) -> usize { (**self).dim() }
    fn embed(&self, text: &str) -> anyhow::Result<Embedding> { (**self).embed(text) }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Embedding>> { (**self).embed_batch(texts) }
}
