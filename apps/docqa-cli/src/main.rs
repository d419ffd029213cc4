mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use docqa_core::config::{expand_path, Config, Settings};
use docqa_core::source::{load_documents, DirectorySource, JsonRecordsSource};
use docqa_core::{Chunk, Chunker, DocumentSource, Error};
use docqa_embed::embedder_from_settings;
use docqa_generate::GeminiGenerator;
use docqa_rag::{build_index_verbose, read_chunks, retrieve, write_chunks, Answerer};
use docqa_vector::{IndexSlot, VectorIndex};

use cli::{ChunkingArgs, Cli, Commands, SourceArgs};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<Error>() {
                Some(e) => eprintln!("error ({} stage): {err:#}", e.stage()),
                None => eprintln!("error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut settings = Config::load()?.settings()?;
    match cli.command {
        Commands::Chunk { source, chunking, out } => {
            apply_chunking(&mut settings, &chunking)?;
            let chunks = chunk_source(&source, &settings)?;
            let out = out.unwrap_or_else(|| expand_path(&settings.paths.chunks_file));
            write_chunks(&out, &chunks)?;
            println!("Wrote {} chunks to {}", chunks.len(), out.display());
        }
        Commands::Build { source, chunking, chunks, index, metric } => {
            apply_chunking(&mut settings, &chunking)?;
            if let Some(metric) = metric {
                settings.retrieval.metric = metric;
            }
            let chunks = match chunks {
                Some(path) => read_chunks(&path)?,
                None => chunk_source(&source, &settings)?,
            };
            let embedder = embedder_from_settings(&settings.embedding).map_err(Error::embedding)?;
            let built = build_index_verbose(chunks, embedder.as_ref(), settings.retrieval.metric)?;
            let path = index_path(index, &settings);
            built.save(&path)?;
            println!("Indexed {} chunks into {}", built.len(), path.display());
        }
        Commands::Search { question, k, index } => {
            let k = k.unwrap_or(settings.retrieval.top_k);
            let loaded = load_index(index, &settings)?;
            let embedder = embedder_from_settings(&settings.embedding).map_err(Error::embedding)?;
            let results = retrieve(&question, &loaded, embedder.as_ref(), k)?;
            let hits: Vec<_> = results
                .iter()
                .map(|s| {
                    json!({
                        "doc_id": s.chunk.doc_id,
                        "ordinal": s.chunk.ordinal,
                        "range": [s.chunk.start, s.chunk.end],
                        "score": s.score,
                        "text": s.chunk.text,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&hits)?);
        }
        Commands::Query { question, k, index, max_context_chars, show_sources } => {
            if let Some(k) = k {
                settings.retrieval.top_k = k;
            }
            if let Some(max) = max_context_chars {
                settings.generation.max_context_chars = max;
            }
            settings.validate()?;
            let slot = Arc::new(IndexSlot::new(load_index(index, &settings)?));
            let embedder = embedder_from_settings(&settings.embedding).map_err(Error::embedding)?;
            let generator = GeminiGenerator::from_config_or_env(&settings.generation)?;
            let answerer = Answerer::from_settings(slot, embedder, Box::new(generator), &settings)?
                .with_timeout(Duration::from_secs(settings.generation.timeout_secs));

            let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
            let outcome = runtime.block_on(answerer.answer(&question));
            // A timed-out embedding may still be running on the blocking pool.
            runtime.shutdown_background();
            let answer = outcome?;

            println!("{}", answer.text.trim());
            if show_sources {
                println!();
                for (i, s) in answer.retrieved.iter().take(answer.used).enumerate() {
                    println!("[{}] {} #{} (score {:.3})", i + 1, s.chunk.doc_id, s.chunk.ordinal, s.score);
                }
            }
        }
        Commands::Config => {
            let mut shown = settings.clone();
            if shown.generation.api_key.is_some() {
                shown.generation.api_key = Some("***".into());
            }
            println!("{}", serde_json::to_string_pretty(&shown)?);
        }
    }
    Ok(())
}

fn apply_chunking(settings: &mut Settings, args: &ChunkingArgs) -> Result<()> {
    if let Some(max) = args.max_chunk_size {
        settings.chunking.max_chunk_size = max;
    }
    if let Some(overlap) = args.overlap {
        settings.chunking.overlap = overlap;
    }
    settings.validate()?;
    Ok(())
}

fn chunk_source(args: &SourceArgs, settings: &Settings) -> Result<Vec<Chunk>> {
    let source: Box<dyn DocumentSource> = match &args.records {
        Some(path) => Box::new(JsonRecordsSource::new(path)),
        None => {
            let dir = args.data_dir.clone().unwrap_or_else(|| expand_path(&settings.paths.data_dir));
            let mut source = DirectorySource::new(dir);
            if let Some(limit) = args.limit {
                source = source.with_limit(limit);
            }
            Box::new(source)
        }
    };
    let documents = load_documents(source.as_ref())?;
    let chunks = Chunker::from_settings(&settings.chunking)?.chunk(&documents);
    info!(documents = documents.len(), chunks = chunks.len(), "chunked corpus");
    Ok(chunks)
}

fn index_path(flag: Option<PathBuf>, settings: &Settings) -> PathBuf {
    flag.unwrap_or_else(|| expand_path(&settings.paths.index_file))
}

fn load_index(flag: Option<PathBuf>, settings: &Settings) -> Result<VectorIndex> {
    let path = index_path(flag, settings);
    if !path.exists() {
        return Err(Error::Storage(format!("no index at {}; run `docqa build` first", path.display())).into());
    }
    Ok(VectorIndex::load(&path)?)
}
