use crate::error::LoadError;
use crate::index::{DocId, DocMeta, InvertedIndex, SerializedIndex, ARTIFACT_VERSION};
use crate::query::{levenshtein, wildcard_matches, Clause, Presence, Query, TermMatch};
use crate::tokenizer::{LanguageRegistry, Tokenizer, TOKENIZER_VERSION};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMatch {
    #[serde(rename = "ref")]
    pub doc_ref: String,
    pub score: f32,
}

/// A loaded, validated artifact ready for queries.
#[derive(Debug, Clone)]
pub struct IndexHandle {
    tokenizer: Tokenizer,
    index: InvertedIndex,
    docs: BTreeMap<String, DocMeta>,
    built_at: Option<String>,
}

impl IndexHandle {
    /// Validate an artifact and bind it to the tokenizer it was built with.
    pub fn from_artifact(artifact: SerializedIndex, registry: &LanguageRegistry) -> Result<Self, LoadError> {
        if artifact.version != ARTIFACT_VERSION {
            return Err(LoadError::UnsupportedFormat { found: artifact.version, expected: ARTIFACT_VERSION });
        }
        if artifact.tokenizer.version != TOKENIZER_VERSION {
            return Err(LoadError::IncompatibleTokenizer { found: artifact.tokenizer.version, expected: TOKENIZER_VERSION });
        }
        let tokenizer = registry
            .tokenizer(&artifact.tokenizer.language)
            .ok_or_else(|| LoadError::UnsupportedLanguage(artifact.tokenizer.language.clone()))?;
        if let Some(missing) = artifact.dangling_ref() {
            return Err(LoadError::DanglingReference(missing.to_string()));
        }
        let num_docs = artifact.index.num_docs();
        let out_of_range = artifact
            .index
            .terms
            .values()
            .flatten()
            .find(|p| p.doc_id as usize >= num_docs);
        if let Some(posting) = out_of_range {
            return Err(LoadError::DanglingReference(format!("#{}", posting.doc_id)));
        }
        Ok(Self { tokenizer, index: artifact.index, docs: artifact.docs, built_at: artifact.built_at })
    }

    pub fn from_slice(bytes: &[u8], registry: &LanguageRegistry) -> Result<Self, LoadError> {
        let artifact: SerializedIndex = serde_json::from_slice(bytes)?;
        Self::from_artifact(artifact, registry)
    }

    pub fn language(&self) -> &str { self.tokenizer.language() }

    pub fn tokenizer(&self) -> &Tokenizer { &self.tokenizer }

    pub fn index(&self) -> &InvertedIndex { &self.index }

    pub fn docs(&self) -> &BTreeMap<String, DocMeta> { &self.docs }

    pub fn built_at(&self) -> Option<&str> { self.built_at.as_deref() }

    pub fn parse_query(&self, raw: &str) -> Query { Query::parse(raw, &self.tokenizer) }

    /// Ranked matches for `raw`; empty for an empty or whitespace-only query.
    pub fn search(&self, raw: &str) -> Vec<QueryMatch> {
        let query = self.parse_query(raw);
        self.search_query(&query)
    }

    pub fn search_query(&self, query: &Query) -> Vec<QueryMatch> {
        if !query.has_positive_clause() {
            return Vec::new();
        }
        let clauses = query.clauses();
        let required: Vec<usize> = clauses
            .iter()
            .enumerate()
            .filter(|(_, c)| c.presence == Presence::Required)
            .map(|(i, _)| i)
            .collect();

        let mut scores: BTreeMap<DocId, f32> = BTreeMap::new();
        let mut required_hits: HashMap<DocId, HashSet<usize>> = HashMap::new();
        let mut prohibited: HashSet<DocId> = HashSet::new();

        for (ci, clause) in clauses.iter().enumerate() {
            for (term, factor) in self.expand(clause) {
                let Some(postings) = self.index.postings(term) else { continue };
                for p in postings.iter().filter(|p| clause.field.map_or(true, |f| f == p.field)) {
                    match clause.presence {
                        Presence::Prohibited => {
                            prohibited.insert(p.doc_id);
                        }
                        presence => {
                            *scores.entry(p.doc_id).or_insert(0.0) += p.weight * clause.boost * factor;
                            if presence == Presence::Required {
                                required_hits.entry(p.doc_id).or_default().insert(ci);
                            }
                        }
                    }
                }
            }
        }

        let mut ranked: Vec<(DocId, f32)> = scores
            .into_iter()
            .filter(|(doc, _)| !prohibited.contains(doc))
            .filter(|(doc, _)| required_hits.get(doc).map_or(0, HashSet::len) == required.len())
            .collect();
        // stable: equal scores keep ascending doc order
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        tracing::debug!(clauses = clauses.len(), hits = ranked.len(), "search");
        ranked
            .into_iter()
            .filter_map(|(doc, score)| {
                self.index.doc_ref(doc).map(|r| QueryMatch { doc_ref: r.to_string(), score: score.max(0.0) })
            })
            .collect()
    }

    /// Vocabulary terms a clause resolves to, with a score factor each.
    fn expand<'a>(&'a self, clause: &'a Clause) -> Vec<(&'a str, f32)> {
        match clause.matching {
            TermMatch::Exact => {
                if self.index.postings(&clause.term).is_some() { vec![(clause.term.as_str(), 1.0)] } else { Vec::new() }
            }
            TermMatch::Wildcard => {
                let prefix = clause.term.split('*').next().unwrap_or("");
                self.index
                    .terms_with_prefix(prefix)
                    .filter(|t| wildcard_matches(&clause.term, t))
                    .map(|t| (t, 1.0))
                    .collect()
            }
            TermMatch::Fuzzy(max) => {
                let max = max as usize;
                let len = clause.term.chars().count();
                self.index
                    .vocabulary()
                    .filter(|t| t.chars().count().abs_diff(len) <= max)
                    .filter_map(|t| {
                        let d = levenshtein(&clause.term, t);
                        (d <= max).then(|| (t, 1.0 / (1.0 + d as f32)))
                    })
                    .collect()
            }
        }
    }
}

/// Free-function form of [`IndexHandle::search`].
pub fn search(handle: &IndexHandle, raw: &str) -> Vec<QueryMatch> {
    handle.search(raw)
}
