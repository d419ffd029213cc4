use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use docqa_core::config::Settings;
use docqa_core::error::{Error, Result};
use docqa_core::traits::{Embedder, Generator};
use docqa_core::types::RetrievalResult;
use docqa_vector::IndexSlot;

use crate::assembler::{assemble, fitting_prefix};
use crate::retriever::{check_embedder, retrieve};

#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    /// Everything the index returned, best first.
    pub retrieved: RetrievalResult,
    /// How many of `retrieved` made it into the prompt.
    pub used: usize,
}

/// Question → retrieve → assemble → generate.
///
/// Each call searches the index snapshot current at the time of the call, so
/// a concurrent `IndexSlot::replace` never affects a question in flight. The
/// query embedding runs on the blocking pool, so dropping the `answer` future
/// (or a timeout around it) returns control without waiting for the embedder.
pub struct Answerer {
    slot: Arc<IndexSlot>,
    embedder: Arc<dyn Embedder>,
    generator: Box<dyn Generator>,
    top_k: usize,
    max_context_chars: usize,
    stage_timeout: Option<Duration>,
}

impl Answerer {
    pub fn new(
        slot: Arc<IndexSlot>,
        embedder: Box<dyn Embedder>,
        generator: Box<dyn Generator>,
        top_k: usize,
        max_context_chars: usize,
    ) -> Result<Self> {
        if top_k == 0 {
            return Err(Error::Config("top_k must be greater than 0".into()));
        }
        if max_context_chars == 0 {
            return Err(Error::Config("max_context_chars must be greater than 0".into()));
        }
        check_embedder(&slot.current(), embedder.as_ref())?;
        Ok(Self { slot, embedder: Arc::from(embedder), generator, top_k, max_context_chars, stage_timeout: None })
    }

    pub fn from_settings(
        slot: Arc<IndexSlot>,
        embedder: Box<dyn Embedder>,
        generator: Box<dyn Generator>,
        settings: &Settings,
    ) -> Result<Self> {
        Self::new(slot, embedder, generator, settings.retrieval.top_k, settings.generation.max_context_chars)
    }

    /// Bounds retrieval and generation separately. Running out of time while
    /// embedding the question is an `Error::Embedding`, while waiting for the
    /// generator an `Error::Generation`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = Some(timeout);
        self
    }

    pub async fn answer(&self, question: &str) -> Result<Answer> {
        let index = self.slot.current();
        let embedder = Arc::clone(&self.embedder);
        let owned_question = question.to_owned();
        let k = self.top_k;
        let retrieval = async move {
            match tokio::task::spawn_blocking(move || retrieve(&owned_question, &index, embedder.as_ref(), k)).await {
                Ok(result) => result,
                Err(e) => Err(Error::embedding(anyhow::Error::new(e).context("query embedding task failed"))),
            }
        };
        let retrieved = self.bounded(retrieval, "embedding the question", Error::embedding).await?;

        let used = fitting_prefix(&retrieved, self.max_context_chars);
        if used == 0 {
            warn!(retrieved = retrieved.len(), "no retrieved chunk fits the context budget");
        }
        let prompt = assemble(question, &retrieved, self.max_context_chars);

        let started = Instant::now();
        let generation = async { self.generator.generate(&prompt).await.map_err(Error::generation) };
        let text = self.bounded(generation, "generating the answer", Error::generation).await?;
        info!(
            generator = self.generator.name(),
            retrieved = retrieved.len(),
            used,
            elapsed = ?started.elapsed(),
            "generated answer"
        );
        Ok(Answer { text, retrieved, used })
    }

    async fn bounded<T>(
        &self,
        stage: impl Future<Output = Result<T>>,
        what: &str,
        on_timeout: fn(anyhow::Error) -> Error,
    ) -> Result<T> {
        match self.stage_timeout {
            None => stage.await,
            Some(limit) => tokio::time::timeout(limit, stage)
                .await
                .unwrap_or_else(|_| Err(on_timeout(anyhow::anyhow!("timed out after {limit:?} {what}")))),
        }
    }
}
