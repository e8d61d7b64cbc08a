//! Search widgets mounted into a page.
//!
//! The page-lifecycle collaborator calls [`PageSession::mount`] with every
//! newly inserted root scope. Each widget instance is wired exactly once no
//! matter how often its scope is mounted. Index fetches are issued as tickets;
//! a ticket that resolves after [`PageSession::navigate`] is dropped.

use crate::error::LoadError;
use crate::highlight::{render_with, RenderOptions};
use crate::loader::{self, IndexSource};
use crate::query::normalize_query;
use crate::search::IndexHandle;
use crate::template::ResultTemplate;
use crate::tokenizer::LanguageRegistry;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WidgetId(pub String);

impl From<&str> for WidgetId {
    fn from(id: &str) -> Self { WidgetId(id.to_string()) }
}

/// One search container found in the page.
#[derive(Debug, Clone)]
pub struct WidgetSpec {
    pub id: WidgetId,
    pub index_url: String,
    pub trigger_key: Option<String>,
    pub template: String,
}

/// The widgets under one inserted root element.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    widgets: Vec<WidgetSpec>,
}

impl Scope {
    pub fn new() -> Self { Self::default() }

    pub fn with(mut self, widget: WidgetSpec) -> Self {
        self.widgets.push(widget);
        self
    }

    pub fn push(&mut self, widget: WidgetSpec) { self.widgets.push(widget); }

    pub fn widgets(&self) -> &[WidgetSpec] { &self.widgets }
}

/// Returned by [`PageSession::mount`]; hand it back to [`PageSession::unmount`].
#[must_use]
#[derive(Debug)]
pub struct Disposer {
    generation: u64,
    ids: Vec<WidgetId>,
}

impl Disposer {
    /// Widgets this mount call wired; re-mounted instances are not included.
    pub fn ids(&self) -> &[WidgetId] { &self.ids }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
    url: String,
}

impl FetchTicket {
    pub fn url(&self) -> &str { &self.url }
}

#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub ticket: FetchTicket,
    pub source: IndexSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyPress {
    pub key: String,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

#[derive(Debug, Clone)]
enum WidgetState {
    Loading,
    Ready(Arc<IndexHandle>),
    Inert,
}

#[derive(Debug)]
struct MountedWidget {
    index_url: String,
    trigger_key: Option<String>,
    template: ResultTemplate,
    state: WidgetState,
}

impl MountedWidget {
    fn handle(&self) -> Option<&IndexHandle> {
        match &self.state {
            WidgetState::Ready(handle) => Some(handle),
            _ => None,
        }
    }
}

/// Search widgets and cached indexes for one page lifetime.
#[derive(Debug)]
pub struct PageSession {
    registry: Arc<LanguageRegistry>,
    options: RenderOptions,
    generation: u64,
    widgets: BTreeMap<WidgetId, MountedWidget>,
    cache: HashMap<String, Arc<IndexHandle>>,
    in_flight: BTreeMap<String, FetchTicket>,
}

impl Default for PageSession {
    fn default() -> Self { Self::new(Arc::new(LanguageRegistry::default()), RenderOptions::default()) }
}

impl PageSession {
    pub fn new(registry: Arc<LanguageRegistry>, options: RenderOptions) -> Self {
        Self { registry, options, generation: 0, widgets: BTreeMap::new(), cache: HashMap::new(), in_flight: BTreeMap::new() }
    }

    /// Wire every not-yet-mounted widget in `root`.
    pub fn mount(&mut self, root: &Scope) -> Disposer {
        let mut ids = Vec::new();
        for found in root.widgets() {
            if self.widgets.contains_key(&found.id) {
                tracing::trace!(widget = %found.id.0, "already mounted");
                continue;
            }
            let state = match self.cache.get(&found.index_url) {
                Some(handle) => WidgetState::Ready(Arc::clone(handle)),
                None => {
                    self.in_flight
                        .entry(found.index_url.clone())
                        .or_insert_with(|| FetchTicket { generation: self.generation, url: found.index_url.clone() });
                    WidgetState::Loading
                }
            };
            let trigger_key = found.trigger_key.as_deref().map(str::to_lowercase).filter(|k| !k.is_empty());
            self.widgets.insert(
                found.id.clone(),
                MountedWidget { index_url: found.index_url.clone(), trigger_key, template: ResultTemplate::parse(&found.template), state },
            );
            ids.push(found.id.clone());
        }
        Disposer { generation: self.generation, ids }
    }

    pub fn unmount(&mut self, disposer: Disposer) {
        if disposer.generation != self.generation { return; }
        for id in disposer.ids {
            self.widgets.remove(&id);
        }
    }

    /// Index fetches the caller should perform, one per distinct URL.
    pub fn pending_fetches(&self) -> Vec<FetchRequest> {
        self.in_flight
            .values()
            .map(|ticket| FetchRequest { ticket: ticket.clone(), source: IndexSource::parse(&ticket.url) })
            .collect()
    }

    /// Deliver a fetch result. Returns `false` when the ticket is stale and the result was discarded.
    pub fn resolve_fetch(&mut self, ticket: FetchTicket, result: Result<IndexHandle, LoadError>) -> bool {
        if ticket.generation != self.generation || self.in_flight.get(&ticket.url) != Some(&ticket) {
            tracing::debug!(url = %ticket.url, "discarding stale index fetch");
            return false;
        }
        self.in_flight.remove(&ticket.url);
        let state = match result {
            Ok(handle) => {
                let handle = Arc::new(handle);
                self.cache.insert(ticket.url.clone(), Arc::clone(&handle));
                WidgetState::Ready(handle)
            }
            Err(err) => {
                tracing::warn!(url = %ticket.url, error = %err, "search index unavailable; widget left inert");
                WidgetState::Inert
            }
        };
        for widget in self.widgets.values_mut().filter(|w| w.index_url == ticket.url) {
            if matches!(widget.state, WidgetState::Loading) {
                widget.state = state.clone();
            }
        }
        true
    }

    /// Perform all pending fetches and deliver their results.
    pub async fn load_pending(&mut self) {
        for request in self.pending_fetches() {
            let result = loader::load(&request.source, &self.registry).await;
            self.resolve_fetch(request.ticket, result);
        }
    }

    /// Leave the page: drop widgets, cached indexes and outstanding tickets.
    pub fn navigate(&mut self) {
        self.generation += 1;
        self.widgets.clear();
        self.cache.clear();
        self.in_flight.clear();
    }

    pub fn is_mounted(&self, id: &WidgetId) -> bool { self.widgets.contains_key(id) }

    pub fn is_ready(&self, id: &WidgetId) -> bool {
        self.widgets.get(id).is_some_and(|w| w.handle().is_some())
    }

    pub fn is_inert(&self, id: &WidgetId) -> bool {
        self.widgets.get(id).is_some_and(|w| matches!(w.state, WidgetState::Inert))
    }

    /// Rendered result markup for the widget's current input value.
    pub fn on_input(&self, id: &WidgetId, value: &str) -> Vec<String> {
        let Some(widget) = self.widgets.get(id) else { return Vec::new() };
        let Some(handle) = widget.handle() else { return Vec::new() };
        let normalized = normalize_query(value);
        if normalized.is_empty() { return Vec::new(); }

        let query = handle.parse_query(&normalized);
        handle
            .search_query(&query)
            .iter()
            .filter_map(|m| render_with(m, handle.docs(), query.highlight_terms(), &self.options))
            .map(|result| widget.template.render(&result))
            .collect()
    }

    /// True when the key press should open the widget: Ctrl or Cmd plus the trigger key, without Shift or Alt.
    pub fn on_key_down(&self, id: &WidgetId, key: &KeyPress) -> bool {
        let Some(widget) = self.widgets.get(id) else { return false };
        let Some(trigger) = widget.trigger_key.as_deref() else { return false };
        if widget.handle().is_none() || key.shift || key.alt { return false; }
        key.key.to_lowercase() == trigger && (key.meta || key.ctrl)
    }
}
