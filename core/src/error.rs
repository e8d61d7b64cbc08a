use std::path::PathBuf;
use thiserror::Error;

/// Failure while turning a corpus into a search artifact.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("corpus not found at {}", path.display())]
    CorpusMissing { path: PathBuf },
    #[error("malformed corpus {}: {reason}", path.display())]
    CorpusMalformed { path: PathBuf, reason: String },
    #[error("document id {0:?} appears more than once")]
    DuplicateDocument(String),
    #[error("no tokenizer registered for language {0:?}")]
    UnsupportedLanguage(String),
    #[error("failed to serialize index: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure while fetching or decoding a search artifact.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read index {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to fetch index {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("malformed index: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("index format version {found} is not supported (expected {expected})")]
    UnsupportedFormat { found: u32, expected: u32 },
    #[error("index was built with tokenizer version {found}, this engine uses {expected}")]
    IncompatibleTokenizer { found: u32, expected: u32 },
    #[error("index language {0:?} has no registered tokenizer")]
    UnsupportedLanguage(String),
    #[error("index references document {0:?} missing from docs")]
    DanglingReference(String),
}
