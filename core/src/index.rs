use crate::tokenizer::TokenizerStamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Dense document number, assigned in corpus insertion order.
pub type DocId = u32;

/// Current layout of `search-<lang>.json`.
pub const ARTIFACT_VERSION: u32 = 1;

/// One page of the documentation corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub body: String,
    pub url: String,
    pub parent: Option<String>,
}

/// Stored copy of a document inside the artifact, enough to render a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocMeta {
    pub title: String,
    pub body: String,
    pub loc: String,
    #[serde(default)]
    pub parent: Option<String>,
}

impl From<&Document> for DocMeta {
    fn from(doc: &Document) -> Self {
        Self { title: doc.title.clone(), body: doc.body.clone(), loc: doc.url.clone(), parent: doc.parent.clone() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Title,
    Body,
}

impl Field {
    pub const ALL: [Field; 2] = [Field::Title, Field::Body];

    pub fn name(self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Body => "body",
        }
    }

    pub fn parse(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.name().eq_ignore_ascii_case(name))
    }

    pub(crate) fn slot(self) -> usize {
        match self {
            Field::Title => 0,
            Field::Body => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub field: Field,
    pub weight: f32, // bm25 contribution with the field boost applied
}

/// Term → postings over a flat document table. `refs[doc_id]` is the external id.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvertedIndex {
    pub refs: Vec<String>,
    pub terms: BTreeMap<String, Vec<Posting>>, // postings sorted by (doc_id, field)
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    pub fn num_docs(&self) -> usize { self.refs.len() }

    pub fn num_terms(&self) -> usize { self.terms.len() }

    pub fn postings(&self, term: &str) -> Option<&[Posting]> {
        self.terms.get(term).map(Vec::as_slice)
    }

    pub fn doc_ref(&self, doc_id: DocId) -> Option<&str> {
        self.refs.get(doc_id as usize).map(String::as_str)
    }

    pub fn vocabulary(&self) -> impl Iterator<Item = &str> {
        self.terms.keys().map(String::as_str)
    }

    /// Vocabulary entries starting with `prefix`, in term order.
    pub fn terms_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.terms
            .range::<str, _>((std::ops::Bound::Included(prefix), std::ops::Bound::Unbounded))
            .map(|(t, _)| t.as_str())
            .take_while(move |t| t.starts_with(prefix))
    }
}

/// The on-disk / over-the-wire artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedIndex {
    pub version: u32,
    pub tokenizer: TokenizerStamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub built_at: Option<String>,
    pub index: InvertedIndex,
    pub docs: BTreeMap<String, DocMeta>,
}

impl SerializedIndex {
    pub fn language(&self) -> &str { &self.tokenizer.language }

    /// First ref in `index` without a `docs` entry, if any.
    pub fn dangling_ref(&self) -> Option<&str> {
        self.index.refs.iter().map(String::as_str).find(|r| !self.docs.contains_key(*r))
    }
}
