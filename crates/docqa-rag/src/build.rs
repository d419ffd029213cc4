//! Offline build stage: chunks → embeddings → index, plus the chunk artifact
//! that lets chunking and embedding run as separate commands.

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::time::Instant;
use tracing::info;

use docqa_core::error::{Error, Result};
use docqa_core::traits::Embedder;
use docqa_core::types::{Chunk, Metric};
use docqa_vector::VectorIndex;

/// Embeds every chunk and builds the index.
///
/// Embedding runs in parallel but entries keep the order of `chunks`, which
/// is the order that breaks score ties later. The first embedding failure
/// aborts the build; no partial index is returned.
pub fn build_index(chunks: Vec<Chunk>, embedder: &dyn Embedder, metric: Metric) -> Result<VectorIndex> {
    build_index_with_progress(chunks, embedder, metric, ProgressBar::hidden())
}

/// Same as [`build_index`] but reports progress on a terminal bar.
pub fn build_index_verbose(chunks: Vec<Chunk>, embedder: &dyn Embedder, metric: Metric) -> Result<VectorIndex> {
    let pb = ProgressBar::new(chunks.len() as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb.set_message("embedding");
    build_index_with_progress(chunks, embedder, metric, pb)
}

fn build_index_with_progress(
    chunks: Vec<Chunk>,
    embedder: &dyn Embedder,
    metric: Metric,
    pb: ProgressBar,
) -> Result<VectorIndex> {
    if chunks.is_empty() {
        return Err(Error::EmptyIndex);
    }
    let started = Instant::now();
    let vectors: Vec<Vec<f32>> = chunks
        .par_iter()
        .map(|chunk| {
            let v = embedder.embed(&chunk.text);
            pb.inc(1);
            v
        })
        .collect::<anyhow::Result<_>>()
        .map_err(|e| {
            pb.abandon_with_message("embedding failed");
            Error::embedding(e)
        })?;
    pb.finish_with_message("embedded");

    let entries = chunks.into_iter().zip(vectors).collect();
    let index = VectorIndex::build(entries, metric, embedder.embedder_id())?;
    info!(entries = index.len(), elapsed = ?started.elapsed(), "index build finished");
    Ok(index)
}

pub fn write_chunks(path: &Path, chunks: &[Chunk]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, chunks).map_err(|e| Error::Storage(e.to_string()))?;
    writer.flush()?;
    info!(path = %path.display(), chunks = chunks.len(), "wrote chunk artifact");
    Ok(())
}

pub fn read_chunks(path: &Path) -> Result<Vec<Chunk>> {
    let file = File::open(path)
        .map_err(|e| Error::Storage(format!("cannot open chunks file {}: {e}", path.display())))?;
    let chunks: Vec<Chunk> = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| Error::Storage(format!("invalid chunks file {}: {e}", path.display())))?;
    info!(path = %path.display(), chunks = chunks.len(), "read chunk artifact");
    Ok(chunks)
}
