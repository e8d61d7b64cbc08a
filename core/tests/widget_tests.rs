use docsearch_core::builder::{build_index, IndexConfig};
use docsearch_core::persist::{save_artifact, ArtifactPaths};
use docsearch_core::tokenizer::LanguageRegistry;
use docsearch_core::widget::{KeyPress, PageSession, Scope, WidgetId, WidgetSpec};
use docsearch_core::{Document, IndexHandle, LoadError};
use tempfile::tempdir;

const URL: &str = "/static/search-en.json";

fn handle() -> IndexHandle {
    let docs = vec![
        Document { id: "slots".into(), title: "Slots".into(), body: "Pass content to a component.".into(), url: "/slots/".into(), parent: None },
        Document { id: "api".into(), title: "API".into(), body: "Catalog reference.".into(), url: "/api/".into(), parent: None },
    ];
    let registry = LanguageRegistry::default();
    IndexHandle::from_artifact(build_index(docs, "en", &registry, IndexConfig::default()).unwrap(), &registry).unwrap()
}

fn spec(id: &str) -> WidgetSpec {
    WidgetSpec { id: id.into(), index_url: URL.into(), trigger_key: Some("K".into()), template: "<li>{TITLE}</li>".into() }
}

fn ready_session(scope: &Scope) -> PageSession {
    let mut session = PageSession::default();
    let _disposer = session.mount(scope);
    for req in session.pending_fetches() {
        assert!(session.resolve_fetch(req.ticket, Ok(handle())));
    }
    session
}

#[test]
fn mounting_twice_wires_once() {
    let scope = Scope::new().with(spec("search"));
    let mut session = ready_session(&scope);
    let again = session.mount(&scope);
    assert!(again.ids().is_empty());
    let id = WidgetId::from("search");
    assert!(session.is_ready(&id));
    assert_eq!(session.on_input(&id, "slots"), vec!["<li><mark>Slots</mark></li>".to_string()]);
}

#[test]
fn widgets_sharing_an_index_share_one_fetch() {
    let mut session = PageSession::default();
    let _d = session.mount(&Scope::new().with(spec("a")).with(spec("b")));
    let pending = session.pending_fetches();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].ticket.url(), URL);
}

#[test]
fn later_mounts_reuse_the_cached_index() {
    let mut session = ready_session(&Scope::new().with(spec("a")));
    let d = session.mount(&Scope::new().with(spec("b")));
    assert_eq!(d.ids(), &[WidgetId::from("b")]);
    assert!(session.pending_fetches().is_empty());
    assert!(session.is_ready(&WidgetId::from("b")));
}

#[test]
fn blank_input_renders_nothing() {
    let session = ready_session(&Scope::new().with(spec("s")));
    assert!(session.on_input(&WidgetId::from("s"), "   ").is_empty());
}

#[test]
fn failed_load_leaves_widget_inert() {
    let mut session = PageSession::default();
    let _d = session.mount(&Scope::new().with(spec("s")));
    let req = session.pending_fetches().remove(0);
    let err = LoadError::DanglingReference("x".into());
    assert!(session.resolve_fetch(req.ticket, Err(err)));
    let id = WidgetId::from("s");
    assert!(session.is_inert(&id));
    assert!(!session.is_ready(&id));
    assert!(session.on_input(&id, "slots").is_empty());
}

#[test]
fn fetch_resolving_after_navigation_is_discarded() {
    let mut session = PageSession::default();
    let scope = Scope::new().with(spec("s"));
    let _d = session.mount(&scope);
    let stale = session.pending_fetches().remove(0);
    session.navigate();
    let _d = session.mount(&scope);
    assert!(!session.resolve_fetch(stale.ticket, Ok(handle())));
    assert!(!session.is_ready(&WidgetId::from("s")));

    let fresh = session.pending_fetches().remove(0);
    assert!(session.resolve_fetch(fresh.ticket, Ok(handle())));
    assert!(session.is_ready(&WidgetId::from("s")));
}

#[test]
fn unmount_detaches_only_its_widgets() {
    let mut session = ready_session(&Scope::new().with(spec("a")));
    let d = session.mount(&Scope::new().with(spec("a")).with(spec("b")));
    session.unmount(d);
    assert!(session.is_mounted(&WidgetId::from("a")));
    assert!(!session.is_mounted(&WidgetId::from("b")));
}

#[test]
fn trigger_key_needs_ctrl_or_cmd() {
    let session = ready_session(&Scope::new().with(spec("s")));
    let id = WidgetId::from("s");
    let press = |key: &str, ctrl, meta, shift| KeyPress { key: key.into(), ctrl, meta, shift, alt: false };
    assert!(session.on_key_down(&id, &press("k", true, false, false)));
    assert!(session.on_key_down(&id, &press("K", false, true, false)));
    assert!(!session.on_key_down(&id, &press("k", false, false, false)));
    assert!(!session.on_key_down(&id, &press("k", true, false, true)));
    assert!(!session.on_key_down(&id, &press("j", true, false, false)));
}

#[tokio::test]
async fn load_pending_reads_artifacts_from_disk() {
    let dir = tempdir().unwrap();
    let docs = vec![Document { id: "a".into(), title: "Macros".into(), body: "".into(), url: "/a/".into(), parent: None }];
    let artifact = build_index(docs, "en", &LanguageRegistry::default(), IndexConfig::default()).unwrap();
    let path = save_artifact(&ArtifactPaths::new(dir.path()), &artifact).unwrap();

    let mut session = PageSession::default();
    let url = path.to_string_lossy().to_string();
    let _d = session.mount(&Scope::new().with(WidgetSpec { id: "w".into(), index_url: url, trigger_key: None, template: "{TITLE}".into() }));
    session.load_pending().await;
    let id = WidgetId::from("w");
    assert!(session.is_ready(&id));
    assert_eq!(session.on_input(&id, "macro"), vec!["<mark>Macro</mark>s".to_string()]);
}
