use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use docqa_core::types::Metric;

#[derive(Parser)]
#[command(name = "docqa")]
#[command(about = "Question answering over a local document collection", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Split documents into chunks and write the chunk file")]
    Chunk {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        chunking: ChunkingArgs,

        #[arg(short, long, help = "Output file (defaults to paths.chunks_file)")]
        out: Option<PathBuf>,
    },

    #[command(about = "Embed chunks and write the vector index")]
    Build {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        chunking: ChunkingArgs,

        #[arg(long, conflicts_with_all = ["data_dir", "records"], help = "Build from a chunk file written by `chunk`")]
        chunks: Option<PathBuf>,

        #[arg(long, help = "Index file (defaults to paths.index_file)")]
        index: Option<PathBuf>,

        #[arg(long, value_parser = parse_metric, help = "cosine or dot")]
        metric: Option<Metric>,
    },

    #[command(about = "Retrieve the nearest chunks and print them as JSON")]
    Search {
        #[arg(help = "The question to search for")]
        question: String,

        #[arg(short, long, help = "Number of chunks (defaults to retrieval.top_k)")]
        k: Option<usize>,

        #[arg(long, help = "Index file (defaults to paths.index_file)")]
        index: Option<PathBuf>,
    },

    #[command(about = "Answer a question from the indexed documents")]
    Query {
        #[arg(help = "The question to answer")]
        question: String,

        #[arg(short, long, help = "Number of chunks (defaults to retrieval.top_k)")]
        k: Option<usize>,

        #[arg(long, help = "Index file (defaults to paths.index_file)")]
        index: Option<PathBuf>,

        #[arg(long, help = "Context budget in characters")]
        max_context_chars: Option<usize>,

        #[arg(long, help = "Print the sources used after the answer")]
        show_sources: bool,
    },

    #[command(about = "Print the effective configuration")]
    Config,
}

#[derive(Args)]
pub struct SourceArgs {
    #[arg(long, help = "Directory of .txt/.md files (defaults to paths.data_dir)")]
    pub data_dir: Option<PathBuf>,

    #[arg(long, conflicts_with = "data_dir", help = "JSON array of records instead of a directory")]
    pub records: Option<PathBuf>,

    #[arg(long, help = "Read at most this many files")]
    pub limit: Option<usize>,
}

#[derive(Args)]
pub struct ChunkingArgs {
    #[arg(long, help = "Maximum chunk size in characters")]
    pub max_chunk_size: Option<usize>,

    #[arg(long, help = "Overlap between consecutive chunks in characters")]
    pub overlap: Option<usize>,
}

fn parse_metric(s: &str) -> Result<Metric, String> {
    match s.to_ascii_lowercase().as_str() {
        "cosine" => Ok(Metric::Cosine),
        "dot" => Ok(Metric::Dot),
        other => Err(format!("unknown metric '{other}', expected cosine or dot")),
    }
}
