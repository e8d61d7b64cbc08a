use crate::error::LoadError;
use crate::search::IndexHandle;
use crate::tokenizer::LanguageRegistry;
use std::fmt;
use std::path::PathBuf;

/// Where a serialized index comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexSource {
    Path(PathBuf),
    Url(String),
}

impl IndexSource {
    /// `http://` and `https://` locations are URLs, everything else a file path.
    pub fn parse(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            IndexSource::Url(location.to_string())
        } else {
            IndexSource::Path(PathBuf::from(location))
        }
    }
}

impl fmt::Display for IndexSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexSource::Path(path) => write!(f, "{}", path.display()),
            IndexSource::Url(url) => f.write_str(url),
        }
    }
}

pub async fn fetch_bytes(source: &IndexSource) -> Result<Vec<u8>, LoadError> {
    match source {
        IndexSource::Path(path) => tokio::fs::read(path).await.map_err(|source| LoadError::Io { path: path.clone(), source }),
        IndexSource::Url(url) => {
            let fetch_err = |source| LoadError::Fetch { url: url.clone(), source };
            let resp = reqwest::get(url.as_str()).await.map_err(fetch_err)?;
            let resp = resp.error_for_status().map_err(fetch_err)?;
            let bytes = resp.bytes().await.map_err(fetch_err)?;
            Ok(bytes.to_vec())
        }
    }
}

/// Fetch and validate an artifact. No retries.
pub async fn load(source: &IndexSource, registry: &LanguageRegistry) -> Result<IndexHandle, LoadError> {
    let bytes = fetch_bytes(source).await?;
    let handle = IndexHandle::from_slice(&bytes, registry)?;
    tracing::info!(%source, language = handle.language(), num_docs = handle.index().num_docs(), "search index loaded");
    Ok(handle)
}
