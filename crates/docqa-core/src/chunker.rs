//! Boundary-aware chunking with exact character overlap.
//!
//! Sizes are measured in characters. A chunk ends at the latest paragraph
//! break that fits, else the latest sentence end, else the latest whitespace,
//! else a hard cut at `max_chunk_size`. Chunk `i + 1` begins `overlap`
//! characters before chunk `i` ends, so stripping the first `overlap`
//! characters from every chunk after the first reconstructs the document.

use tracing::debug;

use crate::config::ChunkingSettings;
use crate::error::{Error, Result};
use crate::types::{Chunk, Document};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    max_chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    pub fn new(max_chunk_size: usize, overlap: usize) -> Result<Self> {
        if max_chunk_size == 0 {
            return Err(Error::Config("max_chunk_size must be greater than 0".into()));
        }
        if overlap >= max_chunk_size {
            return Err(Error::Config(format!(
                "overlap ({overlap}) must be smaller than max_chunk_size ({max_chunk_size})"
            )));
        }
        Ok(Self { max_chunk_size, overlap })
    }

    pub fn from_settings(settings: &ChunkingSettings) -> Result<Self> {
        Self::new(settings.max_chunk_size, settings.overlap)
    }

    /// Chunks every document independently, in document order.
    pub fn chunk(&self, documents: &[Document]) -> Vec<Chunk> {
        let chunks: Vec<Chunk> = documents.iter().flat_map(|d| self.chunk_document(d)).collect();
        debug!(documents = documents.len(), chunks = chunks.len(), "chunked corpus");
        chunks
    }

    pub fn chunk_document(&self, document: &Document) -> Vec<Chunk> {
        let chars: Vec<char> = document.text.chars().collect();
        let len = chars.len();
        let mut chunks = Vec::new();
        if len == 0 {
            return chunks;
        }

        let mut start = 0;
        loop {
            let end = if len - start <= self.max_chunk_size { len } else { self.find_end(&chars, start) };
            chunks.push(Chunk {
                doc_id: document.id.clone(),
                ordinal: chunks.len(),
                start,
                end,
                text: chars[start..end].iter().collect(),
            });
            if end == len {
                break;
            }
            start = end - self.overlap;
        }
        chunks
    }

    /// Picks the end of a chunk starting at `start`, given that the rest of
    /// the document does not fit. The result is always in
    /// `start + overlap + 1 ..= start + max_chunk_size`, which guarantees
    /// forward progress.
    fn find_end(&self, chars: &[char], start: usize) -> usize {
        let limit = start + self.max_chunk_size;
        let min_end = start + self.overlap + 1;
        // Natural breaks are only taken when they keep the chunk at least half full.
        let preferred_min = min_end.max(start + self.max_chunk_size / 2);

        let last_break = |from: usize, is_break: &dyn Fn(usize) -> bool| {
            (from..=limit).rev().find(|&p| is_break(p))
        };

        let paragraph = |p: usize| p >= 2 && chars[p - 1] == '\n' && chars[p - 2] == '\n';
        let sentence = |p: usize| {
            p >= 2 && (chars[p - 1] == '\n' || (chars[p - 1].is_whitespace() && matches!(chars[p - 2], '.' | '!' | '?')))
        };
        let word = |p: usize| chars[p - 1].is_whitespace();

        last_break(preferred_min, &paragraph)
            .or_else(|| last_break(preferred_min, &sentence))
            .or_else(|| last_break(min_end, &word))
            .unwrap_or(limit)
    }
}

/// Convenience wrapper: validates parameters and chunks `documents`.
pub fn chunk(documents: &[Document], max_chunk_size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    Ok(Chunker::new(max_chunk_size, overlap)?.chunk(documents))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconstruct(chunks: &[Chunk], overlap: usize) -> String {
        let mut out = String::new();
        for (i, c) in chunks.iter().enumerate() {
            if i == 0 { out.push_str(&c.text); } else { out.extend(c.text.chars().skip(overlap)); }
        }
        out
    }

    #[test]
    fn rejects_invalid_parameters() {
        assert!(matches!(Chunker::new(0, 0), Err(Error::Config(_))));
        assert!(matches!(Chunker::new(10, 10), Err(Error::Config(_))));
        assert!(matches!(Chunker::new(10, 11), Err(Error::Config(_))));
        assert!(Chunker::new(10, 9).is_ok());
    }

    #[test]
    fn sentence_example_splits_in_two_with_overlap() {
        let doc = Document::new("d", "The cat sat on the mat. The dog barked loudly.");
        let chunks = chunk(&[doc], 30, 5).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "The cat sat on the mat. ");
        let tail: String = chunks[0].text.chars().skip(chunks[0].char_len() - 5).collect();
        let head: String = chunks[1].text.chars().take(5).collect();
        assert_eq!(tail, head);
        assert_eq!(chunks[1].text, "mat. The dog barked loudly.");
    }

    #[test]
    fn empty_document_yields_nothing() {
        let chunker = Chunker::new(100, 10).unwrap();
        assert!(chunker.chunk_document(&Document::new("empty", "")).is_empty());
    }

    #[test]
    fn prefers_paragraph_breaks() {
        let text = "First paragraph is here.\n\nSecond one follows. It has two sentences.";
        let chunker = Chunker::new(40, 0).unwrap();
        let chunks = chunker.chunk_document(&Document::new("p", text));
        assert_eq!(chunks[0].text, "First paragraph is here.\n\n");
        assert_eq!(reconstruct(&chunks, 0), text);
    }

    #[test]
    fn hard_cuts_unbroken_text() {
        let text = "x".repeat(25);
        let chunks = Chunker::new(10, 3).unwrap().chunk_document(&Document::new("x", text.clone()));
        assert!(chunks.iter().all(|c| c.char_len() <= 10));
        assert_eq!(chunks[0].range(), 0..10);
        assert_eq!(chunks[1].range(), 7..17);
        assert_eq!(reconstruct(&chunks, 3), text);
    }

    #[test]
    fn offsets_count_characters_not_bytes() {
        let text = "héllo wörld ünïcode façade naïve";
        let chunks = Chunker::new(12, 2).unwrap().chunk_document(&Document::new("u", text));
        for c in &chunks {
            let expected: String = text.chars().skip(c.start).take(c.char_len()).collect();
            assert_eq!(c.text, expected);
        }
        assert_eq!(reconstruct(&chunks, 2), text);
    }

    #[test]
    fn invariants_hold_across_parameter_grid() {
        let text = "Rust is a systems language. It has ownership!\n\nBorrowing rules apply? Yes.\nLifetimes too. \
                    Traits give polymorphism and generics give zero-cost abstraction over many types.";
        let doc = Document::new("grid", text);
        for max in 1..60 {
            for overlap in 0..max {
                let chunks = Chunker::new(max, overlap).unwrap().chunk_document(&doc);
                for (i, c) in chunks.iter().enumerate() {
                    assert!(c.char_len() <= max, "max={max} overlap={overlap}");
                    assert_eq!(c.ordinal, i);
                    if i > 0 {
                        let prev = &chunks[i - 1];
                        assert_eq!(c.start + overlap, prev.end);
                        let tail: String = prev.text.chars().skip(prev.char_len() - overlap).collect();
                        let head: String = c.text.chars().take(overlap).collect();
                        assert_eq!(tail, head);
                    }
                }
                assert_eq!(reconstruct(&chunks, overlap), text, "max={max} overlap={overlap}");
            }
        }
    }

    #[test]
    fn overlap_never_crosses_documents() {
        let docs = vec![Document::new("a", "alpha beta gamma delta"), Document::new("b", "epsilon zeta eta theta")];
        let chunks = chunk(&docs, 10, 4).unwrap();
        let first_b = chunks.iter().position(|c| c.doc_id == "b").unwrap();
        assert_eq!(chunks[first_b].start, 0);
        assert_eq!(chunks[first_b].ordinal, 0);
        assert!(chunks[..first_b].iter().all(|c| c.doc_id == "a"));
    }
}
