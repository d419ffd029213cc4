use thiserror::Error;

/// Boxed cause carried by collaborator failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Cannot build an index from zero entries")]
    EmptyIndex,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Embedding failed: {0}")]
    Embedding(#[source] BoxError),

    #[error("Generation failed: {0}")]
    Generation(#[source] BoxError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Corrupt index file: {0}")]
    CorruptIndex(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Pipeline stage an error belongs to. Remediation differs per stage:
/// configuration mistakes are fixed and rerun, retrieval failures usually
/// mean the index must be rebuilt, generation failures are retried later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Config,
    Retrieval,
    Generation,
    Storage,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Config => "configuration",
            Stage::Retrieval => "retrieval",
            Stage::Generation => "generation",
            Stage::Storage => "storage",
        };
        f.write_str(name)
    }
}

impl Error {
    pub fn stage(&self) -> Stage {
        match self {
            Error::Config(_) => Stage::Config,
            Error::DimensionMismatch { .. }
            | Error::EmptyIndex
            | Error::InvalidArgument(_)
            | Error::Embedding(_) => Stage::Retrieval,
            Error::Generation(_) => Stage::Generation,
            Error::Storage(_) | Error::CorruptIndex(_) | Error::Io(_) => Stage::Storage,
        }
    }

    /// True for failures of an external collaborator that may succeed on retry.
    pub fn is_external(&self) -> bool {
        matches!(self, Error::Embedding(_) | Error::Generation(_))
    }

    pub fn embedding(err: anyhow::Error) -> Self {
        Error::Embedding(err.into())
    }

    pub fn generation(err: anyhow::Error) -> Self {
        Error::Generation(err.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
