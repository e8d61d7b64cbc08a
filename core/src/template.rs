use crate::highlight::RenderableResult;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SLOT_RE: Regex = Regex::new(r"\{(URL|PARENT|TITLE|BODY|SCORE)\}").expect("valid regex");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Url,
    Parent,
    Title,
    Body,
    Score,
}

impl Slot {
    fn from_name(name: &str) -> Option<Slot> {
        match name {
            "URL" => Some(Slot::Url),
            "PARENT" => Some(Slot::Parent),
            "TITLE" => Some(Slot::Title),
            "BODY" => Some(Slot::Body),
            "SCORE" => Some(Slot::Score),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Slot(Slot),
}

/// Markup for one search result with `{URL}`, `{PARENT}`, `{TITLE}`, `{BODY}`
/// and `{SCORE}` slots. Parsed once; rendering fills slots in a single pass,
/// so slot names appearing inside result content are left alone.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTemplate {
    segments: Vec<Segment>,
}

impl ResultTemplate {
    pub fn parse(source: &str) -> Self {
        let source = source.trim();
        let mut segments = Vec::new();
        let mut pos = 0;
        for caps in SLOT_RE.captures_iter(source) {
            let (Some(whole), Some(slot)) = (caps.get(0), caps.get(1).and_then(|m| Slot::from_name(m.as_str()))) else { continue };
            if whole.start() > pos {
                segments.push(Segment::Text(source[pos..whole.start()].to_string()));
            }
            segments.push(Segment::Slot(slot));
            pos = whole.end();
        }
        if pos < source.len() {
            segments.push(Segment::Text(source[pos..].to_string()));
        }
        Self { segments }
    }

    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.segments.iter().filter_map(|s| match s {
            Segment::Slot(slot) => Some(*slot),
            Segment::Text(_) => None,
        })
    }

    /// `title` and `body` are inserted as produced by the renderer (already
    /// escaped and marked); `url` and `parent` are attribute-escaped here.
    pub fn render(&self, result: &RenderableResult) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Slot(Slot::Url) => out.push_str(&htmlescape::encode_attribute(&result.url)),
                Segment::Slot(Slot::Parent) => out.push_str(&htmlescape::encode_attribute(result.parent.as_deref().unwrap_or(""))),
                Segment::Slot(Slot::Title) => out.push_str(&result.title),
                Segment::Slot(Slot::Body) => out.push_str(&result.body),
                Segment::Slot(Slot::Score) => out.push_str(&result.score.to_string()),
            }
        }
        out
    }
}

impl Default for ResultTemplate {
    fn default() -> Self {
        Self::parse(r#"<a class="SearchResult" href="{URL}"><small>{PARENT}</small><h3>{TITLE}</h3><p>{BODY}</p></a>"#)
    }
}
