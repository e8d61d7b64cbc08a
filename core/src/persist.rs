use crate::error::{BuildError, LoadError};
use crate::index::{Document, SerializedIndex};
use serde::Deserialize;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

const CORPUS_PREFIX: &str = "docs-";
const ARTIFACT_PREFIX: &str = "search-";
const JSON_SUFFIX: &str = ".json";

/// Corpus and artifact locations inside one site directory.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub root: PathBuf,
}

impl ArtifactPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn corpus(&self, lang: &str) -> PathBuf { self.root.join(corpus_file_name(lang)) }
    pub fn artifact(&self, lang: &str) -> PathBuf { self.root.join(artifact_file_name(lang)) }
    fn temp(&self, lang: &str) -> PathBuf { self.root.join(format!(".{}.tmp", artifact_file_name(lang))) }

    /// `(language, path)` of every `search-<lang>.json` directly under the root, sorted by language.
    pub fn artifacts(&self) -> Result<Vec<(String, PathBuf)>, LoadError> {
        let entries = fs::read_dir(&self.root).map_err(|source| LoadError::Io { path: self.root.clone(), source })?;
        let mut found = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let lang = path.file_name().and_then(|n| n.to_str()).and_then(language_of_artifact);
            if let Some(lang) = lang {
                if path.is_file() { found.push((lang.to_string(), path)); }
            }
        }
        found.sort();
        Ok(found)
    }
}

pub fn corpus_file_name(lang: &str) -> String { format!("{CORPUS_PREFIX}{lang}{JSON_SUFFIX}") }

pub fn artifact_file_name(lang: &str) -> String { format!("{ARTIFACT_PREFIX}{lang}{JSON_SUFFIX}") }

/// `docs-es.json` → `es`.
pub fn language_of_corpus(file_name: &str) -> Option<&str> {
    file_name.strip_prefix(CORPUS_PREFIX)?.strip_suffix(JSON_SUFFIX).filter(|l| !l.is_empty())
}

/// `search-es.json` → `es`.
pub fn language_of_artifact(file_name: &str) -> Option<&str> {
    file_name.strip_prefix(ARTIFACT_PREFIX)?.strip_suffix(JSON_SUFFIX).filter(|l| !l.is_empty())
}

/// Destination for a finished artifact.
pub trait IndexSink {
    fn write_index(&mut self, artifact: &SerializedIndex) -> Result<(), BuildError>;
}

impl IndexSink for ArtifactPaths {
    fn write_index(&mut self, artifact: &SerializedIndex) -> Result<(), BuildError> {
        save_artifact(self, artifact).map(|_| ())
    }
}

impl IndexSink for Vec<u8> {
    fn write_index(&mut self, artifact: &SerializedIndex) -> Result<(), BuildError> {
        serde_json::to_writer(&mut *self, artifact)?;
        Ok(())
    }
}

/// Write `search-<lang>.json` atomically (temp + fsync + rename) and return its path.
pub fn save_artifact(paths: &ArtifactPaths, artifact: &SerializedIndex) -> Result<PathBuf, BuildError> {
    let lang = artifact.language();
    fs::create_dir_all(&paths.root).map_err(io_err(&paths.root))?;
    let bytes = serde_json::to_vec(artifact)?;
    let tmp_path = paths.temp(lang);
    let final_path = paths.artifact(lang);
    let written = write_synced(&tmp_path, &bytes)
        .map_err(io_err(&tmp_path))
        .and_then(|()| fs::rename(&tmp_path, &final_path).map_err(io_err(&final_path)));
    if let Err(err) = written {
        remove_temp(&tmp_path);
        return Err(err);
    }
    tracing::info!(path = %final_path.display(), bytes = bytes.len(), "wrote search artifact");
    Ok(final_path)
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut f = File::create(path)?;
    f.write_all(bytes)?;
    f.sync_all()
}

/// Best-effort cleanup of a temp file left by a failed write.
fn remove_temp(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => tracing::warn!(path = %path.display(), error = %err, "could not remove temporary artifact"),
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> BuildError {
    let path = path.to_path_buf();
    move |source| BuildError::Io { path, source }
}

pub fn load_artifact(path: &Path) -> Result<SerializedIndex, LoadError> {
    let f = File::open(path).map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?;
    let artifact = serde_json::from_reader(BufReader::new(f))?;
    Ok(artifact)
}

#[derive(Debug, Deserialize)]
struct CorpusEntry {
    #[serde(default)]
    id: Option<String>,
    title: String,
    #[serde(default)]
    body: String,
    #[serde(default, alias = "loc")]
    url: String,
    #[serde(default)]
    parent: Option<String>,
}

impl CorpusEntry {
    fn into_document(self, id: String) -> Document {
        Document { id, title: self.title, body: self.body, url: self.url, parent: self.parent }
    }
}

/// Read a corpus file in corpus order.
///
/// `.json` files hold either an object keyed by document id or an array of
/// documents carrying `id`; `.jsonl` files hold one document per line.
pub fn load_corpus(path: &Path) -> Result<Vec<Document>, BuildError> {
    if !path.is_file() {
        return Err(BuildError::CorpusMissing { path: path.to_path_buf() });
    }
    let malformed = |reason: String| BuildError::CorpusMalformed { path: path.to_path_buf(), reason };
    let f = File::open(path).map_err(|source| BuildError::Io { path: path.to_path_buf(), source })?;
    let reader = BufReader::new(f);

    let mut docs = Vec::new();
    if path.extension().and_then(|s| s.to_str()) == Some("jsonl") {
        for (lineno, line) in reader.lines().enumerate() {
            let line = line.map_err(|source| BuildError::Io { path: path.to_path_buf(), source })?;
            if line.trim().is_empty() { continue; }
            let entry: CorpusEntry = serde_json::from_str(&line).map_err(|e| malformed(format!("line {}: {e}", lineno + 1)))?;
            let id = entry.id.clone().ok_or_else(|| malformed(format!("line {}: document without id", lineno + 1)))?;
            docs.push(entry.into_document(id));
        }
        return Ok(docs);
    }

    let json: serde_json::Value = serde_json::from_reader(reader).map_err(|e| malformed(e.to_string()))?;
    match json {
        serde_json::Value::Object(map) => {
            for (key, value) in map {
                let entry: CorpusEntry = serde_json::from_value(value).map_err(|e| malformed(format!("{key}: {e}")))?;
                docs.push(entry.into_document(key));
            }
        }
        serde_json::Value::Array(arr) => {
            for (i, value) in arr.into_iter().enumerate() {
                let entry: CorpusEntry = serde_json::from_value(value).map_err(|e| malformed(format!("entry {i}: {e}")))?;
                let id = entry.id.clone().ok_or_else(|| malformed(format!("entry {i}: document without id")))?;
                docs.push(entry.into_document(id));
            }
        }
        _ => return Err(malformed("expected an object or an array of documents".into())),
    }
    Ok(docs)
}
