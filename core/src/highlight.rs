//! Result rendering: highlighted, HTML-escaped title and body for one match.
//!
//! Every term is matched against the original text, never against output of an
//! earlier term, so highlights cannot nest. Spans from different terms that
//! overlap resolve to the later term; disjoint spans from all terms are kept.

use crate::index::DocMeta;
use crate::search::QueryMatch;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::Range;

pub const MARK_OPEN: &str = "<mark>";
pub const MARK_CLOSE: &str = "</mark>";
pub const ELLIPSIS: &str = "…";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderableResult {
    pub title: String,
    pub body: String,
    pub url: String,
    pub parent: Option<String>,
    pub score: f32,
}

/// Characters kept around the first body highlight when cropping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnippetWindow {
    pub before: usize,
    pub after: usize,
}

impl Default for SnippetWindow {
    fn default() -> Self { Self { before: 100, after: 200 } }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// `None` renders the whole body.
    pub snippet: Option<SnippetWindow>,
}

/// Case-insensitive pattern for one search term. Literal characters are
/// escaped; `*` matches any run of non-word characters.
pub fn term_pattern(term: &str) -> Result<Regex, regex::Error> {
    let escaped = term.split('*').map(regex::escape).collect::<Vec<_>>().join(r"\W*");
    RegexBuilder::new(&escaped).case_insensitive(true).build()
}

/// Compile every usable term; a term that fails is logged and skipped.
pub fn compile_terms<S: AsRef<str>>(terms: &[S]) -> Vec<Regex> {
    terms
        .iter()
        .map(AsRef::as_ref)
        .filter(|t| !t.trim().is_empty())
        .filter_map(|t| match term_pattern(t) {
            Ok(re) => Some(re),
            Err(err) => {
                tracing::warn!(term = t, error = %err, "skipping highlight term");
                None
            }
        })
        .collect()
}

/// Byte ranges to highlight, sorted and non-overlapping.
pub fn highlight_spans(text: &str, patterns: &[Regex]) -> Vec<Range<usize>> {
    let mut spans: Vec<Range<usize>> = Vec::new();
    for re in patterns {
        for m in re.find_iter(text).filter(|m| !m.as_str().is_empty()) {
            let span = m.range();
            spans.retain(|s| s.end <= span.start || span.end <= s.start);
            spans.push(span);
        }
    }
    spans.sort_by_key(|s| s.start);
    spans
}

/// Escape `text` and wrap `spans` in highlight marks.
fn mark(text: &str, spans: &[Range<usize>]) -> String {
    let mut out = String::with_capacity(text.len() + spans.len() * (MARK_OPEN.len() + MARK_CLOSE.len()));
    let mut pos = 0;
    for span in spans {
        out.push_str(&htmlescape::encode_minimal(&text[pos..span.start]));
        out.push_str(MARK_OPEN);
        out.push_str(&htmlescape::encode_minimal(&text[span.clone()]));
        out.push_str(MARK_CLOSE);
        pos = span.end;
    }
    out.push_str(&htmlescape::encode_minimal(&text[pos..]));
    out
}

pub fn highlight(text: &str, patterns: &[Regex]) -> String {
    mark(text, &highlight_spans(text, patterns))
}

fn snippet(text: &str, patterns: &[Regex], window: SnippetWindow) -> String {
    let spans = highlight_spans(text, patterns);
    let anchor = spans.first().map_or(0, |s| s.start);
    let bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
    let at = bounds.partition_point(|&b| b < anchor);
    let lo = at.saturating_sub(window.before);
    let hi = (at + window.after).min(bounds.len() - 1);
    let (start, end) = (bounds[lo], bounds[hi]);

    let clipped: Vec<Range<usize>> = spans
        .into_iter()
        .filter(|s| s.start < end && s.end > start)
        .map(|s| s.start.max(start) - start..s.end.min(end) - start)
        .collect();
    let mut out = String::new();
    if start > 0 { out.push_str(ELLIPSIS); }
    out.push_str(&mark(&text[start..end], &clipped));
    if end < text.len() { out.push_str(ELLIPSIS); }
    out
}

/// Render one match with the whole body.
pub fn render(m: &QueryMatch, docs: &BTreeMap<String, DocMeta>, terms: &[String]) -> Option<RenderableResult> {
    render_with(m, docs, terms, &RenderOptions::default())
}

/// Render one match. `None` when the match refers to a document not in `docs`.
pub fn render_with(m: &QueryMatch, docs: &BTreeMap<String, DocMeta>, terms: &[String], options: &RenderOptions) -> Option<RenderableResult> {
    let page = docs.get(&m.doc_ref)?;
    let patterns = compile_terms(terms);
    let body = match options.snippet {
        Some(window) => snippet(&page.body, &patterns, window),
        None => highlight(&page.body, &patterns),
    };
    Some(RenderableResult {
        title: highlight(&page.title, &patterns),
        body,
        url: page.loc.clone(),
        parent: page.parent.clone(),
        score: m.score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_matches_non_word_runs() {
        let re = term_pattern("css*js").unwrap();
        assert!(re.is_match("CSS & JS"));
        assert!(re.is_match("cssjs"));
        assert!(!re.is_match("css and js"));
    }

    #[test]
    fn special_characters_are_literal() {
        let re = term_pattern("a.b(c)").unwrap();
        assert!(re.is_match("x a.b(c) y"));
        assert!(!re.is_match("axb(c)"));
    }

    #[test]
    fn later_term_wins_overlaps() {
        let patterns = compile_terms(&["comp", "component"]);
        assert_eq!(highlight("component", &patterns), "<mark>component</mark>");
        let patterns = compile_terms(&["component", "pone"]);
        assert_eq!(highlight("component", &patterns), "com<mark>pone</mark>nt");
    }

    #[test]
    fn snippet_respects_char_boundaries() {
        let text = format!("{}needle{}", "é".repeat(10), "ü".repeat(10));
        let patterns = compile_terms(&["needle"]);
        let out = snippet(&text, &patterns, SnippetWindow { before: 3, after: 9 });
        assert_eq!(out, format!("{ELLIPSIS}ééé<mark>needle</mark>üüü{ELLIPSIS}"));
    }
}
