use tracing::debug;

use docqa_core::error::{Error, Result};
use docqa_core::traits::Embedder;
use docqa_core::types::RetrievalResult;
use docqa_vector::VectorIndex;

/// Embeds `question` and returns the `k` nearest chunks, best first.
///
/// The index result is passed through untouched: no re-ranking, filtering or
/// score threshold. An embedder failure surfaces as `Error::Embedding`.
pub fn retrieve(question: &str, index: &VectorIndex, embedder: &dyn Embedder, k: usize) -> Result<RetrievalResult> {
    if question.trim().is_empty() {
        return Err(Error::InvalidArgument("question must not be empty".into()));
    }
    check_embedder(index, embedder)?;
    let query = embedder.embed(question).map_err(Error::embedding)?;
    let results = index.search(&query, k)?;
    debug!(k, returned = results.len(), "retrieved chunks");
    Ok(results)
}

/// Fails with `Error::Config` when the index was built by a different embedder
/// than the one about to embed queries against it.
pub fn check_embedder(index: &VectorIndex, embedder: &dyn Embedder) -> Result<()> {
    if index.embedder_id() != embedder.embedder_id() {
        return Err(Error::Config(format!(
            "index was built with embedder '{}' but '{}' is configured; rebuild the index",
            index.embedder_id(),
            embedder.embedder_id()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_core::types::{Chunk, Metric};

    struct Fixed(Vec<f32>);

    impl Embedder for Fixed {
        fn embedder_id(&self) -> &str { "fixed" }
        fn dim(&self) -> usize { self.0.len() }
        fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> { Ok(self.0.clone()) }
    }

    struct Broken;

    impl Embedder for Broken {
        fn embedder_id(&self) -> &str { "fixed" }
        fn dim(&self) -> usize { 2 }
        fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> { Err(anyhow::anyhow!("model offline")) }
    }

    fn index() -> VectorIndex {
        let entries = vec![
            (Chunk { doc_id: "a".into(), ordinal: 0, start: 0, end: 5, text: "alpha".into() }, vec![1.0, 0.0]),
            (Chunk { doc_id: "b".into(), ordinal: 0, start: 0, end: 4, text: "beta".into() }, vec![0.0, 1.0]),
        ];
        VectorIndex::build(entries, Metric::Cosine, "fixed").unwrap()
    }

    #[test]
    fn returns_index_order_unchanged() {
        let results = retrieve("which?", &index(), &Fixed(vec![0.2, 0.9]), 2).unwrap();
        let ids: Vec<_> = results.iter().map(|s| s.chunk.doc_id.as_str()).collect();
        assert_eq!(ids, ["b", "a"]);
    }

    #[test]
    fn blank_question_is_rejected() {
        assert!(matches!(retrieve("  \n", &index(), &Fixed(vec![1.0, 0.0]), 2), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn query_dimension_is_checked() {
        let err = retrieve("q", &index(), &Fixed(vec![1.0, 0.0, 0.0]), 2).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 2, actual: 3 }));
    }

    #[test]
    fn embedder_failure_is_wrapped() {
        let err = retrieve("q", &index(), &Broken, 2).unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
        assert!(err.is_external());
    }

    #[test]
    fn foreign_embedder_is_a_config_error() {
        let index = VectorIndex::build(
            vec![(Chunk { doc_id: "a".into(), ordinal: 0, start: 0, end: 1, text: "a".into() }, vec![1.0, 0.0])],
            Metric::Cosine,
            "other",
        )
        .unwrap();
        assert!(matches!(retrieve("q", &index, &Fixed(vec![1.0, 0.0]), 1), Err(Error::Config(_))));
    }
}
