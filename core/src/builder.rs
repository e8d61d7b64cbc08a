use crate::error::BuildError;
use crate::index::{DocId, DocMeta, Document, Field, InvertedIndex, Posting, SerializedIndex, ARTIFACT_VERSION};
use crate::persist::IndexSink;
use crate::tokenizer::{LanguageRegistry, Tokenizer};
use std::collections::{BTreeMap, HashSet};

/// Ranking parameters baked into posting weights at build time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexConfig {
    pub k1: f32,
    pub b: f32,
    pub title_boost: f32,
    pub body_boost: f32,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75, title_boost: 10.0, body_boost: 1.0 }
    }
}

impl IndexConfig {
    pub fn boost(&self, field: Field) -> f32 {
        match field {
            Field::Title => self.title_boost,
            Field::Body => self.body_boost,
        }
    }
}

/// Accumulates documents, then computes BM25 weights in [`IndexBuilder::finish`].
pub struct IndexBuilder {
    tokenizer: Tokenizer,
    config: IndexConfig,
    refs: Vec<String>,
    seen: HashSet<String>,
    docs: BTreeMap<String, DocMeta>,
    postings_raw: BTreeMap<String, Vec<(DocId, Field, u32)>>,
    field_lengths: Vec<[u32; 2]>,
}

impl IndexBuilder {
    pub fn new(tokenizer: Tokenizer, config: IndexConfig) -> Self {
        Self {
            tokenizer,
            config,
            refs: Vec::new(),
            seen: HashSet::new(),
            docs: BTreeMap::new(),
            postings_raw: BTreeMap::new(),
            field_lengths: Vec::new(),
        }
    }

    pub fn for_language(registry: &LanguageRegistry, language: &str, config: IndexConfig) -> Result<Self, BuildError> {
        let tokenizer = registry
            .tokenizer(language)
            .ok_or_else(|| BuildError::UnsupportedLanguage(language.to_string()))?;
        Ok(Self::new(tokenizer, config))
    }

    pub fn len(&self) -> usize { self.refs.len() }

    pub fn is_empty(&self) -> bool { self.refs.is_empty() }

    pub fn add(&mut self, doc: Document) -> Result<DocId, BuildError> {
        if !self.seen.insert(doc.id.clone()) {
            return Err(BuildError::DuplicateDocument(doc.id));
        }
        let doc_id = self.refs.len() as DocId;
        let mut lengths = [0u32; 2];
        for field in Field::ALL {
            let text = match field {
                Field::Title => &doc.title,
                Field::Body => &doc.body,
            };
            let tokens = self.tokenizer.tokenize(text);
            lengths[field.slot()] = tokens.len() as u32;
            let mut tf_counts: BTreeMap<String, u32> = BTreeMap::new();
            for (term, _pos) in tokens {
                *tf_counts.entry(term).or_insert(0) += 1;
            }
            for (term, tf) in tf_counts {
                self.postings_raw.entry(term).or_default().push((doc_id, field, tf));
            }
        }
        self.field_lengths.push(lengths);
        self.docs.insert(doc.id.clone(), DocMeta::from(&doc));
        self.refs.push(doc.id);
        Ok(doc_id)
    }

    pub fn finish(self) -> SerializedIndex {
        let n = self.refs.len() as f32;
        let mut avg_len = [0f32; 2];
        for lengths in &self.field_lengths {
            for (slot, len) in lengths.iter().enumerate() {
                avg_len[slot] += *len as f32;
            }
        }
        for avg in avg_len.iter_mut() {
            *avg = if n > 0.0 { *avg / n } else { 0.0 };
            if *avg == 0.0 { *avg = 1.0; }
        }

        let IndexConfig { k1, b, .. } = self.config;
        let mut terms = BTreeMap::new();
        for (term, plist) in self.postings_raw {
            let mut df = 0u32;
            let mut last_doc = None;
            for (doc_id, _, _) in &plist {
                if last_doc != Some(*doc_id) {
                    df += 1;
                    last_doc = Some(*doc_id);
                }
            }
            let df = df as f32;
            let idf = (1.0 + ((n - df + 0.5) / (df + 0.5)).abs()).ln();
            let postings: Vec<Posting> = plist
                .into_iter()
                .map(|(doc_id, field, tf)| {
                    let len = self.field_lengths[doc_id as usize][field.slot()] as f32;
                    let norm = 1.0 - b + b * len / avg_len[field.slot()];
                    let tf_f = tf as f32;
                    let saturation = tf_f * (k1 + 1.0) / (tf_f + k1 * norm);
                    Posting { doc_id, field, weight: idf * saturation * self.config.boost(field) }
                })
                .collect();
            terms.insert(term, postings);
        }

        let index = InvertedIndex { refs: self.refs, terms };
        tracing::info!(language = self.tokenizer.language(), num_docs = index.num_docs(), num_terms = index.num_terms(), "index built");
        SerializedIndex { version: ARTIFACT_VERSION, tokenizer: self.tokenizer.stamp(), built_at: None, index, docs: self.docs }
    }
}

/// Build an artifact for `language` from `documents` and hand it to `sink`.
pub fn build<I, S>(documents: I, language: &str, registry: &LanguageRegistry, config: IndexConfig, sink: &mut S) -> Result<SerializedIndex, BuildError>
where
    I: IntoIterator<Item = Document>,
    S: IndexSink + ?Sized,
{
    let artifact = build_index(documents, language, registry, config)?;
    sink.write_index(&artifact)?;
    Ok(artifact)
}

/// Build the artifact in memory.
pub fn build_index<I>(documents: I, language: &str, registry: &LanguageRegistry, config: IndexConfig) -> Result<SerializedIndex, BuildError>
where
    I: IntoIterator<Item = Document>,
{
    let mut builder = IndexBuilder::for_language(registry, language, config)?;
    for doc in documents {
        builder.add(doc)?;
    }
    Ok(builder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, title: &str, body: &str) -> Document {
        Document { id: id.into(), title: title.into(), body: body.into(), url: format!("/{id}"), parent: None }
    }

    #[test]
    fn rejects_duplicate_ids() {
        let registry = LanguageRegistry::default();
        let err = build_index(vec![doc("a", "One", ""), doc("a", "Two", "")], "en", &registry, IndexConfig::default()).unwrap_err();
        assert!(matches!(err, BuildError::DuplicateDocument(id) if id == "a"));
    }

    #[test]
    fn rejects_unknown_language() {
        let registry = LanguageRegistry::default();
        let err = build_index(Vec::new(), "xx", &registry, IndexConfig::default()).unwrap_err();
        assert!(matches!(err, BuildError::UnsupportedLanguage(code) if code == "xx"));
    }

    #[test]
    fn title_postings_carry_the_boost() {
        let registry = LanguageRegistry::default();
        let artifact = build_index(vec![doc("a", "slots", "slots")], "en", &registry, IndexConfig::default()).unwrap();
        let postings = artifact.index.postings("slot").unwrap();
        assert_eq!(postings.len(), 2);
        let title = postings.iter().find(|p| p.field == Field::Title).unwrap();
        let body = postings.iter().find(|p| p.field == Field::Body).unwrap();
        assert!((title.weight / body.weight - 10.0).abs() < 1e-4);
    }

    #[test]
    fn refs_follow_insertion_order() {
        let registry = LanguageRegistry::default();
        let artifact = build_index(vec![doc("z", "Zeta", ""), doc("a", "Alpha", "")], "en", &registry, IndexConfig::default()).unwrap();
        assert_eq!(artifact.index.refs, vec!["z".to_string(), "a".to_string()]);
        assert_eq!(artifact.tokenizer.language, "en");
    }
}
