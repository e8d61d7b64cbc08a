use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use unicode_normalization::UnicodeNormalization;

/// Bumped whenever normalization, word extraction, stop words or stemming
/// change the terms produced for the same input. Artifacts carry it and the
/// query engine refuses artifacts stamped with another value.
pub const TOKENIZER_VERSION: u32 = 1;

pub const DEFAULT_LANGUAGE: &str = "en";

lazy_static! {
    static ref WORD_RE: Regex = Regex::new(r"(?u)[\p{L}\p{N}][\p{L}\p{N}_']*").expect("valid regex");
    static ref ENGLISH: Tokenizer = Tokenizer::new(Arc::new(SnowballLanguage::new("en", Algorithm::English, EN_STOPWORDS)));
}

const EN_STOPWORDS: &[&str] = &[
    "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
    "be","because","been","before","being","below","between","both","but","by",
    "can","can't","cannot","could","couldn't",
    "did","didn't","do","does","doesn't","doing","don't","down","during",
    "each","few","for","from","further",
    "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
    "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
    "let's","me","more","most","mustn't","my","myself",
    "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
    "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
    "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
    "under","until","up","very",
    "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
    "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
];

const ES_STOPWORDS: &[&str] = &[
    "a","al","como","con","de","del","el","en","es","la","las","lo","los","no","o","para","por","que","se","su","sus","un","una","y",
];

const FR_STOPWORDS: &[&str] = &[
    "au","aux","avec","ce","ces","dans","de","des","du","elle","en","et","il","la","le","les","leur","mais","ne","ou","par","pas","pour","qui","sa","se","son","sur","un","une",
];

const DE_STOPWORDS: &[&str] = &[
    "als","am","auch","auf","aus","bei","das","dem","den","der","des","die","ein","eine","einen","einer","es","für","im","in","ist","mit","nicht","oder","sich","sie","und","von","zu",
];

const PT_STOPWORDS: &[&str] = &[
    "a","ao","as","com","da","das","de","do","dos","e","em","na","nas","no","nos","o","os","ou","para","por","que","se","um","uma",
];

const IT_STOPWORDS: &[&str] = &[
    "a","al","che","con","da","del","della","di","e","gli","il","in","la","le","lo","non","per","si","su","un","una",
];

const NL_STOPWORDS: &[&str] = &[
    "de","een","en","het","in","is","met","niet","of","op","te","van","voor","zijn",
];

/// A per-language tokenization strategy. Builder and query engine both reach
/// it through [`Tokenizer`], so the two sides always agree on terms.
pub trait Language: Send + Sync {
    fn code(&self) -> &str;
    fn is_stopword(&self, token: &str) -> bool;
    fn stem<'a>(&self, token: &'a str) -> Cow<'a, str>;
}

/// Snowball stemmer plus a stop-word list.
pub struct SnowballLanguage {
    code: String,
    stemmer: Stemmer,
    stopwords: HashSet<&'static str>,
}

impl SnowballLanguage {
    pub fn new(code: &str, algorithm: Algorithm, stopwords: &[&'static str]) -> Self {
        Self { code: code.to_string(), stemmer: Stemmer::create(algorithm), stopwords: stopwords.iter().copied().collect() }
    }
}

impl Language for SnowballLanguage {
    fn code(&self) -> &str { &self.code }

    fn is_stopword(&self, token: &str) -> bool { self.stopwords.contains(token) }

    fn stem<'a>(&self, token: &'a str) -> Cow<'a, str> { self.stemmer.stem(token) }
}

/// Registry of language strategies keyed by language code.
pub struct LanguageRegistry {
    languages: HashMap<String, Arc<dyn Language>>,
}

impl LanguageRegistry {
    /// An empty registry; most callers want [`LanguageRegistry::default`].
    pub fn empty() -> Self { Self { languages: HashMap::new() } }

    pub fn register(&mut self, language: Arc<dyn Language>) {
        self.languages.insert(language.code().to_lowercase(), language);
    }

    pub fn get(&self, code: &str) -> Option<Arc<dyn Language>> {
        self.languages.get(&code.to_lowercase()).cloned()
    }

    pub fn tokenizer(&self, code: &str) -> Option<Tokenizer> {
        self.get(code).map(Tokenizer::new)
    }

    pub fn supports(&self, code: &str) -> bool { self.languages.contains_key(&code.to_lowercase()) }

    pub fn codes(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.languages.keys().map(String::as_str).collect();
        codes.sort_unstable();
        codes
    }
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        let builtins: [(&str, Algorithm, &[&'static str]); 17] = [
            ("en", Algorithm::English, EN_STOPWORDS),
            ("ar", Algorithm::Arabic, &[]),
            ("da", Algorithm::Danish, &[]),
            ("de", Algorithm::German, DE_STOPWORDS),
            ("el", Algorithm::Greek, &[]),
            ("es", Algorithm::Spanish, ES_STOPWORDS),
            ("fr", Algorithm::French, FR_STOPWORDS),
            ("hu", Algorithm::Hungarian, &[]),
            ("it", Algorithm::Italian, IT_STOPWORDS),
            ("nl", Algorithm::Dutch, NL_STOPWORDS),
            ("no", Algorithm::Norwegian, &[]),
            ("pt", Algorithm::Portuguese, PT_STOPWORDS),
            ("ro", Algorithm::Romanian, &[]),
            ("ru", Algorithm::Russian, &[]),
            ("sv", Algorithm::Swedish, &[]),
            ("ta", Algorithm::Tamil, &[]),
            ("tr", Algorithm::Turkish, &[]),
        ];
        let mut registry = Self::empty();
        for (code, algorithm, stopwords) in builtins {
            registry.register(Arc::new(SnowballLanguage::new(code, algorithm, stopwords)));
        }
        registry
    }
}

impl fmt::Debug for LanguageRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LanguageRegistry").field("languages", &self.codes()).finish()
    }
}

/// Identifies the tokenizer an artifact was built with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizerStamp {
    pub version: u32,
    pub language: String,
}

/// Language-bound tokenizer shared by the index builder and the query engine.
#[derive(Clone)]
pub struct Tokenizer {
    language: Arc<dyn Language>,
}

impl Tokenizer {
    pub fn new(language: Arc<dyn Language>) -> Self { Self { language } }

    pub fn language(&self) -> &str { self.language.code() }

    pub fn stamp(&self) -> TokenizerStamp {
        TokenizerStamp { version: TOKENIZER_VERSION, language: self.language.code().to_string() }
    }

    /// Tokenize text into (term, position) using NFKC normalization, lowercase, stopword removal, and stemming.
    /// Positions count every extracted word, including dropped stop words.
    pub fn tokenize(&self, text: &str) -> Vec<(String, usize)> {
        let normalized = normalize(text);
        let mut tokens = Vec::new();
        for (pos, mat) in WORD_RE.find_iter(&normalized).enumerate() {
            let token = mat.as_str().trim_end_matches('\'');
            if token.is_empty() || self.language.is_stopword(token) { continue; }
            let stem = self.language.stem(token).into_owned();
            tokens.push((stem, pos));
        }
        tokens
    }

    /// Terms only, positions dropped.
    pub fn terms(&self, text: &str) -> Vec<String> {
        self.tokenize(text).into_iter().map(|(t, _)| t).collect()
    }
}

impl fmt::Debug for Tokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tokenizer").field("language", &self.language()).finish()
    }
}

/// NFKC + lowercase; the normalization applied before word extraction and to wildcard patterns.
pub fn normalize(text: &str) -> String {
    text.nfkc().collect::<String>().to_lowercase()
}

/// Tokenize with the default English strategy.
pub fn tokenize(text: &str) -> Vec<(String, usize)> {
    ENGLISH.tokenize(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_tokenize() {
        let t = tokenize("Running, runner's run!");
        assert!(t.iter().any(|(w, _)| w == "run"));
    }

    #[test]
    fn positions_count_stopwords() {
        let t = tokenize("the component renders");
        assert_eq!(t.iter().map(|(_, p)| *p).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn trailing_apostrophe_is_trimmed() {
        let t = tokenize("the users' guide");
        assert_eq!(t[0].0, "user");
    }

    #[test]
    fn registry_is_case_insensitive() {
        let registry = LanguageRegistry::default();
        assert!(registry.supports("ES"));
        assert_eq!(registry.tokenizer("Fr").map(|t| t.language().to_string()), Some("fr".to_string()));
        assert!(registry.get("xx").is_none());
    }
}
