//! Scrollspy: keeps one table-of-contents entry in sync with the visible section.
//!
//! Driven by visibility events from an external observer. Scrolling down, a
//! section leaving the viewport activates the section after it; scrolling up,
//! a section entering the viewport activates itself. Events apply in order
//! with no debouncing.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollDirection {
    #[default]
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityEvent {
    pub section_id: String,
    pub is_intersecting: bool,
    pub scroll_offset: f64,
}

impl VisibilityEvent {
    pub fn new(section_id: impl Into<String>, is_intersecting: bool, scroll_offset: f64) -> Self {
        Self { section_id: section_id.into(), is_intersecting, scroll_offset }
    }
}

/// A change of active section for the DOM adapter to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    pub previous: Option<String>,
    pub current: String,
    /// Indices of navigation links whose `href` fragment is `current`.
    pub links: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollConfig {
    /// How long a link click shields the clicked entry from the next automatic update.
    pub click_grace: Duration,
}

impl Default for ScrollConfig {
    fn default() -> Self { Self { click_grace: Duration::from_millis(150) } }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrollState {
    pub active_section: Option<String>,
    pub direction: ScrollDirection,
    pub last_offset: f64,
}

#[derive(Debug, Clone)]
pub struct ScrollTracker {
    sections: Vec<String>,
    links: Vec<String>,
    config: ScrollConfig,
    active: Option<usize>,
    direction: ScrollDirection,
    last_offset: f64,
    suppress_until: Option<Instant>,
}

impl ScrollTracker {
    /// `sections` in document order; `links` are the navigation hrefs.
    pub fn new(sections: Vec<String>, links: Vec<String>) -> Self {
        Self::with_config(sections, links, ScrollConfig::default())
    }

    pub fn with_config(sections: Vec<String>, links: Vec<String>, config: ScrollConfig) -> Self {
        Self { sections, links, config, active: None, direction: ScrollDirection::Up, last_offset: 0.0, suppress_until: None }
    }

    /// No sections to track; every event is ignored.
    pub fn is_dormant(&self) -> bool { self.sections.is_empty() }

    pub fn active_section(&self) -> Option<&str> {
        self.active.map(|i| self.sections[i].as_str())
    }

    pub fn direction(&self) -> ScrollDirection { self.direction }

    pub fn state(&self) -> ScrollState {
        ScrollState {
            active_section: self.active_section().map(str::to_string),
            direction: self.direction,
            last_offset: self.last_offset,
        }
    }

    /// Apply a batch of events in order, returning each resulting activation.
    pub fn on_visibility<I>(&mut self, events: I, now: Instant) -> Vec<Activation>
    where
        I: IntoIterator<Item = VisibilityEvent>,
    {
        events.into_iter().filter_map(|event| self.observe(&event, now)).collect()
    }

    pub fn observe(&mut self, event: &VisibilityEvent, now: Instant) -> Option<Activation> {
        if self.is_dormant() { return None; }

        self.direction = if event.scroll_offset > self.last_offset { ScrollDirection::Down } else { ScrollDirection::Up };
        self.last_offset = event.scroll_offset;

        let Some(index) = self.sections.iter().position(|s| *s == event.section_id) else {
            tracing::debug!(section = %event.section_id, "visibility event for untracked section");
            return None;
        };
        let target = match (self.direction, event.is_intersecting) {
            (ScrollDirection::Down, false) => (index + 1).min(self.sections.len() - 1),
            (ScrollDirection::Up, true) => index,
            _ => return None,
        };

        if let Some(until) = self.suppress_until.take() {
            if now < until {
                tracing::trace!(section = %self.sections[target], "update suppressed after link click");
                return None;
            }
        }
        self.activate(target)
    }

    /// Force-activate the section named by `href`'s fragment.
    pub fn on_link_click(&mut self, href: &str, now: Instant) -> Option<Activation> {
        let index = self.sections.iter().position(|s| s == fragment(href))?;
        self.suppress_until = Some(now + self.config.click_grace);
        self.activate(index)
    }

    /// Forget all progress, as on navigation to a new page.
    pub fn reset(&mut self) {
        self.active = None;
        self.direction = ScrollDirection::Up;
        self.last_offset = 0.0;
        self.suppress_until = None;
    }

    fn activate(&mut self, index: usize) -> Option<Activation> {
        if self.active == Some(index) { return None; }
        let previous = self.active.replace(index).map(|i| self.sections[i].clone());
        let current = self.sections[index].clone();
        let links = self.links.iter().enumerate().filter(|(_, href)| fragment(href) == current).map(|(i, _)| i).collect();
        Some(Activation { previous, current, links })
    }
}

/// `/guide/#install` → `install`; an href without `#` is taken whole.
fn fragment(href: &str) -> &str {
    href.rsplit_once('#').map_or(href, |(_, f)| f)
}
