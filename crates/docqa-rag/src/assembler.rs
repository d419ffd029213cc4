//! Prompt assembly.
//!
//! The context budget counts characters of chunk text only; section headers
//! and the instruction text are not charged against it. Chunks are taken in
//! rank order and never split: the first chunk that would overflow the budget
//! ends the context, even if a later, shorter chunk would still fit.

use std::fmt::Write;

use docqa_core::types::ScoredChunk;

const ROLE: &str = "You are a careful assistant answering questions about a document collection.";
const GROUNDING: &str = "Answer using only the information in the context below. \
If the context does not contain the answer, say that you do not have enough information. \
Do not invent facts.";
const NO_CONTEXT: &str = "No relevant context was found for this question. \
Reply that you do not have enough information to answer it.";

/// Returns how many of the leading `retrieved` chunks fit in `max_context_chars`.
pub fn fitting_prefix(retrieved: &[ScoredChunk], max_context_chars: usize) -> usize {
    let mut used = 0usize;
    retrieved
        .iter()
        .take_while(|s| {
            used += s.chunk.text.chars().count();
            used <= max_context_chars
        })
        .count()
}

pub fn assemble(question: &str, retrieved: &[ScoredChunk], max_context_chars: usize) -> String {
    let included = &retrieved[..fitting_prefix(retrieved, max_context_chars)];

    let mut prompt = String::new();
    let _ = writeln!(prompt, "{ROLE}");
    let _ = writeln!(prompt, "{GROUNDING}");
    prompt.push('\n');
    prompt.push_str("Context:\n");
    if included.is_empty() {
        let _ = writeln!(prompt, "{NO_CONTEXT}");
    }
    for (i, scored) in included.iter().enumerate() {
        let c = &scored.chunk;
        let _ = writeln!(prompt, "--- Source {} ({} #{}) ---", i + 1, c.doc_id, c.ordinal);
        prompt.push_str(&c.text);
        prompt.push('\n');
    }
    prompt.push('\n');
    let _ = writeln!(prompt, "Question: {}", question.trim());
    prompt.push_str("Answer:");

    tracing::debug!(
        retrieved = retrieved.len(),
        included = included.len(),
        prompt_chars = prompt.chars().count(),
        "assembled prompt"
    );
    prompt
}
