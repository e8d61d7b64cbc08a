//! Query parsing.
//!
//! Whitespace-separated terms, each optionally decorated:
//!
//! - `+term` must match, `-term` must not match
//! - `title:term` / `body:term` restricts the term to one field
//! - `term^2` multiplies the term's contribution
//! - `term~1` also matches vocabulary within that edit distance
//! - `*` anywhere inside a term is a wildcard over the index vocabulary

use crate::index::Field;
use crate::tokenizer::{normalize, Tokenizer};
use lazy_static::lazy_static;
use regex::Regex;

/// Fuzzy distances above this are clamped; they match most of a small vocabulary anyway.
pub const MAX_EDIT_DISTANCE: u8 = 3;

lazy_static! {
    static ref TERM_RE: Regex =
        Regex::new(r"^(?P<presence>[+-])?(?:(?P<field>[A-Za-z]+):)?(?P<term>.*?)(?P<mods>(?:[~^][0-9]+(?:\.[0-9]+)?)*)$").expect("valid regex");
    static ref MOD_RE: Regex = Regex::new(r"([~^])([0-9]+(?:\.[0-9]+)?)").expect("valid regex");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Optional,
    Required,
    Prohibited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermMatch {
    Exact,
    Wildcard,
    Fuzzy(u8),
}

/// One term lookup against the index.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    /// Stemmed term, or a normalized pattern for wildcards.
    pub term: String,
    pub field: Option<Field>,
    pub presence: Presence,
    pub boost: f32,
    pub matching: TermMatch,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    clauses: Vec<Clause>,
    highlight_terms: Vec<String>,
}

/// Collapse whitespace runs to a single space and trim.
pub fn normalize_query(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl Query {
    pub fn parse(raw: &str, tokenizer: &Tokenizer) -> Query {
        let mut query = Query::default();
        for word in normalize_query(raw).split(' ').filter(|w| !w.is_empty()) {
            query.push_word(word, tokenizer);
        }
        query
    }

    fn push_word(&mut self, word: &str, tokenizer: &Tokenizer) {
        let Some(caps) = TERM_RE.captures(word) else { return };
        let presence = match caps.name("presence").map(|m| m.as_str()) {
            Some("+") => Presence::Required,
            Some("-") => Presence::Prohibited,
            _ => Presence::Optional,
        };
        let mut text = caps.name("term").map_or("", |m| m.as_str()).to_string();
        let field = match caps.name("field") {
            Some(m) => match Field::parse(m.as_str()) {
                Some(field) => Some(field),
                None => {
                    text = format!("{}:{}", m.as_str(), text);
                    None
                }
            },
            None => None,
        };

        let mut boost = 1.0f32;
        let mut fuzzy = None;
        for m in MOD_RE.captures_iter(caps.name("mods").map_or("", |m| m.as_str())) {
            let Ok(value) = m[2].parse::<f32>() else { continue };
            match &m[1] {
                "^" => boost = value,
                _ => fuzzy = Some((value as u8).min(MAX_EDIT_DISTANCE)),
            }
        }

        if text.is_empty() { return; }

        if text.contains('*') {
            let pattern = normalize(&text);
            if pattern.chars().all(|c| c == '*') { return; }
            self.clauses.push(Clause { term: pattern, field, presence, boost, matching: TermMatch::Wildcard });
        } else {
            let matching = match fuzzy {
                Some(d) if d > 0 => TermMatch::Fuzzy(d),
                _ => TermMatch::Exact,
            };
            let terms = tokenizer.terms(&text);
            if terms.is_empty() { return; }
            for term in terms {
                self.clauses.push(Clause { term, field, presence, boost, matching });
            }
        }

        if presence != Presence::Prohibited {
            self.highlight_terms.push(text);
        }
    }

    pub fn clauses(&self) -> &[Clause] { &self.clauses }

    /// The user's words stripped of query syntax, for highlighting.
    pub fn highlight_terms(&self) -> &[String] { &self.highlight_terms }

    pub fn is_empty(&self) -> bool { self.clauses.is_empty() }

    /// True when at least one clause can contribute a match.
    pub fn has_positive_clause(&self) -> bool {
        self.clauses.iter().any(|c| c.presence != Presence::Prohibited)
    }
}

/// Glob match where `*` stands for any (possibly empty) run of characters.
pub fn wildcard_matches(pattern: &str, text: &str) -> bool {
    let mut parts = pattern.split('*');
    let first = parts.next().unwrap_or("");
    let Some(mut rest) = text.strip_prefix(first) else { return false };
    let tail: Vec<&str> = parts.collect();
    let Some((last, middle)) = tail.split_last() else { return rest.is_empty() };
    for part in middle {
        if part.is_empty() { continue; }
        match rest.find(part) {
            Some(i) => rest = &rest[i + part.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}

/// Character-level edit distance.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut dp: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut prev = dp[0];
        dp[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let temp = dp[j + 1];
            dp[j + 1] = if ca == *cb { prev } else { 1 + prev.min(dp[j]).min(dp[j + 1]) };
            prev = temp;
        }
    }
    dp[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::LanguageRegistry;

    fn en() -> Tokenizer { LanguageRegistry::default().tokenizer("en").unwrap() }

    #[test]
    fn normalizes_whitespace() {
        assert_eq!(normalize_query("  foo \t\n bar  "), "foo bar");
        assert_eq!(normalize_query("   "), "");
    }

    #[test]
    fn parses_modifiers() {
        let q = Query::parse("+title:Components^2 -slots render~1", &en());
        let c = q.clauses();
        assert_eq!(c.len(), 3);
        assert_eq!(c[0].term, "compon");
        assert_eq!(c[0].field, Some(Field::Title));
        assert_eq!(c[0].presence, Presence::Required);
        assert_eq!(c[0].boost, 2.0);
        assert_eq!(c[1].presence, Presence::Prohibited);
        assert_eq!(c[2].matching, TermMatch::Fuzzy(1));
        assert_eq!(q.highlight_terms(), &["Components".to_string(), "render".to_string()]);
    }

    #[test]
    fn unknown_field_prefix_stays_in_the_term() {
        let q = Query::parse("std:io", &en());
        assert_eq!(q.clauses().iter().map(|c| c.term.as_str()).collect::<Vec<_>>(), vec!["std", "io"]);
        assert!(q.clauses().iter().all(|c| c.field.is_none()));
    }

    #[test]
    fn stopword_only_query_is_empty() {
        assert!(Query::parse("the and of", &en()).is_empty());
        assert!(Query::parse("*", &en()).is_empty());
    }

    #[test]
    fn wildcard_terms_skip_stemming() {
        let q = Query::parse("Runn*", &en());
        assert_eq!(q.clauses()[0].term, "runn*");
        assert_eq!(q.clauses()[0].matching, TermMatch::Wildcard);
        assert_eq!(q.highlight_terms(), &["Runn*".to_string()]);
    }

    #[test]
    fn wildcard_positions() {
        assert!(wildcard_matches("comp*", "compon"));
        assert!(wildcard_matches("*pon", "compon"));
        assert!(wildcard_matches("c*p*n", "compon"));
        assert!(!wildcard_matches("a*a", "a"));
        assert!(!wildcard_matches("x*", "compon"));
    }

    #[test]
    fn edit_distance() {
        assert_eq!(levenshtein("slot", "slot"), 0);
        assert_eq!(levenshtein("slot", "slat"), 1);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
    }
}
