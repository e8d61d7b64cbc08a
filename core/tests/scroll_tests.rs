use docsearch_core::scroll::{ScrollConfig, ScrollDirection, ScrollTracker, VisibilityEvent};
use std::time::{Duration, Instant};

fn tracker() -> ScrollTracker {
    let sections = vec!["s1".to_string(), "s2".to_string(), "s3".to_string()];
    let links = vec!["#s1".to_string(), "#s2".to_string(), "#s3".to_string(), "#s2".to_string()];
    ScrollTracker::new(sections, links)
}

#[test]
fn scrolling_down_activates_the_next_section() {
    let mut t = tracker();
    let now = Instant::now();
    let a = t.observe(&VisibilityEvent::new("s2", false, 300.0), now).unwrap();
    assert_eq!(t.direction(), ScrollDirection::Down);
    assert_eq!(a.current, "s3");
    assert_eq!(a.links, vec![2]);
    assert_eq!(t.active_section(), Some("s3"));
}

#[test]
fn scrolling_up_activates_the_entering_section() {
    let mut t = tracker();
    let now = Instant::now();
    t.observe(&VisibilityEvent::new("s2", false, 300.0), now);
    let a = t.observe(&VisibilityEvent::new("s2", true, 120.0), now).unwrap();
    assert_eq!(t.direction(), ScrollDirection::Up);
    assert_eq!(a.previous.as_deref(), Some("s3"));
    assert_eq!(a.current, "s2");
    assert_eq!(a.links, vec![1, 3]);
}

#[test]
fn last_section_stays_active_when_leaving_downwards() {
    let mut t = tracker();
    let now = Instant::now();
    t.observe(&VisibilityEvent::new("s2", false, 100.0), now);
    assert_eq!(t.observe(&VisibilityEvent::new("s3", false, 200.0), now), None);
    assert_eq!(t.active_section(), Some("s3"));
}

#[test]
fn irrelevant_transitions_are_ignored() {
    let mut t = tracker();
    let now = Instant::now();
    // entering while scrolling down, leaving while scrolling up
    assert!(t.observe(&VisibilityEvent::new("s2", true, 50.0), now).is_none());
    assert!(t.observe(&VisibilityEvent::new("s1", false, 10.0), now).is_none());
    assert!(t.observe(&VisibilityEvent::new("nope", true, 5.0), now).is_none());
    assert_eq!(t.active_section(), None);
}

#[test]
fn batch_applies_in_order_last_wins() {
    let mut t = tracker();
    let now = Instant::now();
    let changes = t.on_visibility(
        vec![VisibilityEvent::new("s1", false, 400.0), VisibilityEvent::new("s3", true, 400.0)],
        now,
    );
    // second event sees an unchanged offset, which counts as scrolling up
    assert_eq!(changes.iter().map(|a| a.current.as_str()).collect::<Vec<_>>(), vec!["s2", "s3"]);
    assert_eq!(t.active_section(), Some("s3"));
}

#[test]
fn click_wins_over_an_immediate_intersection() {
    let mut t = tracker();
    let start = Instant::now();
    let a = t.on_link_click("/guide/#s1", start).unwrap();
    assert_eq!(a.current, "s1");

    assert!(t.observe(&VisibilityEvent::new("s1", false, 80.0), start + Duration::from_millis(10)).is_none());
    assert_eq!(t.active_section(), Some("s1"));

    let later = t.observe(&VisibilityEvent::new("s1", false, 160.0), start + Duration::from_millis(20)).unwrap();
    assert_eq!(later.current, "s2");
}

#[test]
fn grace_window_expires() {
    let sections = vec!["s1".to_string(), "s2".to_string()];
    let mut t = ScrollTracker::with_config(sections, Vec::new(), ScrollConfig { click_grace: Duration::from_millis(50) });
    let start = Instant::now();
    t.on_link_click("#s1", start);
    let a = t.observe(&VisibilityEvent::new("s1", false, 10.0), start + Duration::from_millis(60)).unwrap();
    assert_eq!(a.current, "s2");
    assert!(a.links.is_empty());
}

#[test]
fn no_sections_means_dormant() {
    let mut t = ScrollTracker::new(Vec::new(), vec!["#s1".to_string()]);
    assert!(t.is_dormant());
    assert!(t.observe(&VisibilityEvent::new("s1", true, 10.0), Instant::now()).is_none());
    assert!(t.on_link_click("#s1", Instant::now()).is_none());
    assert_eq!(t.state().active_section, None);
}

#[test]
fn reset_clears_session_state() {
    let mut t = tracker();
    t.observe(&VisibilityEvent::new("s1", false, 100.0), Instant::now());
    t.reset();
    let state = t.state();
    assert_eq!(state.active_section, None);
    assert_eq!(state.direction, ScrollDirection::Up);
    assert_eq!(state.last_offset, 0.0);
}

#[test]
fn links_with_a_path_match_on_their_fragment() {
    let sections = vec!["s1".to_string(), "s2".to_string()];
    let links = vec!["/guide/#s1".to_string(), "/guide/#s2".to_string()];
    let mut t = ScrollTracker::new(sections, links);
    let now = Instant::now();

    let a = t.observe(&VisibilityEvent::new("s1", false, 100.0), now).unwrap();
    assert_eq!(a.current, "s2");
    assert_eq!(a.links, vec![1]);

    let a = t.on_link_click("/guide/#s1", now).unwrap();
    assert_eq!(a.current, "s1");
    assert_eq!(a.links, vec![0]);
}
