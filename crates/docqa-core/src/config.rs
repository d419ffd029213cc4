//! Configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge `docqa.toml` + `docqa.<env>.toml` + `APP_*` env vars
//! over built-in defaults. Every setting has a documented default and a
//! validated range; invalid values fail before any work starts.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::Metric;

pub const MAX_TOP_K: usize = 1000;

/// Layered configuration: `docqa.toml`, then `docqa.<env>.toml`, then `APP_*`
/// environment variables (`__` separates sections, e.g.
/// `APP_CHUNKING__OVERLAP=50`).
pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_from(Path::new("."), &env_name)
    }

    /// Loads the layered files from `dir` for the given environment name.
    pub fn load_from(dir: &Path, env_name: &str) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file(dir.join("docqa.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("docqa.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("docqa.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("docqa.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));
        Ok(Self { figment })
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment: Figment::from(Serialized::defaults(Settings::default())).merge(figment) }
    }

    /// Extracts and validates the typed settings.
    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self.figment.extract().map_err(|e| Error::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub chunking: ChunkingSettings,
    pub embedding: EmbeddingSettings,
    pub retrieval: RetrievalSettings,
    pub generation: GenerationSettings,
    pub paths: PathSettings,
}

/// Sizes are in characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    pub max_chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self { max_chunk_size: 1000, overlap: 200 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// `hash-v1` for the built-in hashing embedder, otherwise a local model name.
    pub model: String,
    pub dimension: usize,
    pub model_dir: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { model: "hash-v1".to_string(), dimension: 384, model_dir: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub metric: Metric,
    pub top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { metric: Metric::Cosine, top_k: 5 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub model: String,
    pub max_context_chars: usize,
    pub timeout_secs: u64,
    pub api_key: Option<String>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self { model: "gemini-2.5-flash".to_string(), max_context_chars: 8000, timeout_secs: 60, api_key: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    pub data_dir: String,
    pub chunks_file: String,
    pub index_file: String,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            data_dir: "data/txt".to_string(),
            chunks_file: "data/chunks.json".to_string(),
            index_file: "data/index.dqix".to_string(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let c = &self.chunking;
        if c.max_chunk_size == 0 {
            return Err(Error::Config("chunking.max_chunk_size must be greater than 0".into()));
        }
        if c.overlap >= c.max_chunk_size {
            return Err(Error::Config(format!(
                "chunking.overlap ({}) must be smaller than chunking.max_chunk_size ({})",
                c.overlap, c.max_chunk_size
            )));
        }
        if self.embedding.model.trim().is_empty() {
            return Err(Error::Config("embedding.model must not be empty".into()));
        }
        if self.embedding.dimension == 0 {
            return Err(Error::Config("embedding.dimension must be greater than 0".into()));
        }
        if !(1..=MAX_TOP_K).contains(&self.retrieval.top_k) {
            return Err(Error::Config(format!("retrieval.top_k must be in 1..={MAX_TOP_K}")));
        }
        if self.generation.max_context_chars == 0 {
            return Err(Error::Config("generation.max_context_chars must be greater than 0".into()));
        }
        if self.generation.timeout_secs == 0 {
            return Err(Error::Config("generation.timeout_secs must be greater than 0".into()));
        }
        Ok(())
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
