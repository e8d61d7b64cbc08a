use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use docsearch_core::highlight::{render_with, RenderOptions, SnippetWindow};
use docsearch_core::persist::{load_artifact, ArtifactPaths};
use docsearch_core::tokenizer::{LanguageRegistry, DEFAULT_LANGUAGE};
use docsearch_core::IndexHandle;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    #[serde(default = "default_lang")]
    pub lang: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_lang() -> String { DEFAULT_LANGUAGE.to_string() }
fn default_k() -> usize { 10 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub lang: String,
    pub took_ms: u128,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    #[serde(rename = "ref")]
    pub doc_ref: String,
    pub score: f32,
    pub title: String,
    pub url: String,
    pub parent: Option<String>,
    pub snippet: String,
}

/// Startup settings; [`ServerConfig::from_env`] reads `ADMIN_TOKEN` and `CORS_ALLOW_ORIGIN`.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub artifact_dir: PathBuf,
    pub admin_token: Option<String>,
    /// Comma-separated origins; unset or unparsable means any origin.
    pub cors_allow_origin: Option<String>,
}

impl ServerConfig {
    pub fn from_env(artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            artifact_dir: artifact_dir.into(),
            admin_token: std::env::var("ADMIN_TOKEN").ok(),
            cors_allow_origin: std::env::var("CORS_ALLOW_ORIGIN").ok(),
        }
    }
}

type Indexes = HashMap<String, Arc<IndexHandle>>;

#[derive(Clone)]
pub struct AppState {
    pub artifact_dir: PathBuf,
    pub indexes: Arc<RwLock<Indexes>>,
    pub registry: Arc<LanguageRegistry>,
    pub admin_token: Option<String>,
}

/// Load every `search-<lang>.json` in `dir`. Artifacts that fail validation are skipped.
pub fn load_indexes(dir: &Path, registry: &LanguageRegistry) -> Result<Indexes> {
    let paths = ArtifactPaths::new(dir);
    let mut indexes = HashMap::new();
    for (lang, path) in paths.artifacts().with_context(|| format!("scanning {}", dir.display()))? {
        match load_artifact(&path).and_then(|artifact| IndexHandle::from_artifact(artifact, registry)) {
            Ok(handle) => {
                tracing::info!(lang = %lang, num_docs = handle.index().num_docs(), "index loaded");
                indexes.insert(lang, Arc::new(handle));
            }
            Err(err) => tracing::warn!(lang = %lang, path = %path.display(), error = %err, "skipping unusable index"),
        }
    }
    Ok(indexes)
}

pub fn build_app(artifact_dir: String) -> Result<Router> {
    build_app_with(ServerConfig::from_env(artifact_dir))
}

pub fn build_app_with(config: ServerConfig) -> Result<Router> {
    let registry = Arc::new(LanguageRegistry::default());
    let indexes = load_indexes(&config.artifact_dir, &registry)?;
    let app_state = AppState {
        artifact_dir: config.artifact_dir.clone(),
        indexes: Arc::new(RwLock::new(indexes)),
        registry,
        admin_token: config.admin_token.clone(),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/admin/reload", post(reload_handler))
        .nest_service("/static", ServeDir::new(&config.artifact_dir))
        .with_state(app_state)
        .layer(cors_layer(config.cors_allow_origin.as_deref()))
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

fn cors_layer(allow_origin: Option<&str>) -> CorsLayer {
    let any = || CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    let Some(val) = allow_origin else { return any() };
    let origins: Vec<_> = val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
    if origins.is_empty() {
        any()
    } else {
        CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
    }
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let start = std::time::Instant::now();
    let lang = params.lang.to_lowercase();
    let handle = state
        .indexes
        .read()
        .get(&lang)
        .cloned()
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("no index for language {lang}")))?;

    let query = handle.parse_query(&params.q);
    let matches = handle.search_query(&query);
    let total_hits = matches.len();
    let k = params.k.clamp(1, 100);

    let options = RenderOptions { snippet: Some(SnippetWindow::default()) };
    let results = matches
        .iter()
        .take(k)
        .filter_map(|m| {
            let rendered = render_with(m, handle.docs(), query.highlight_terms(), &options)?;
            Some(SearchHit {
                doc_ref: m.doc_ref.clone(),
                score: m.score,
                title: rendered.title,
                url: rendered.url,
                parent: rendered.parent,
                snippet: rendered.body,
            })
        })
        .collect();

    let elapsed = start.elapsed();
    tracing::debug!(lang = %lang, q = %params.q, total_hits, "search served");
    Ok(Json(SearchResponse { query: params.q, lang, took_ms: elapsed.as_millis(), took_s: elapsed.as_secs_f64(), total_hits, results }))
}

/// Re-read the artifact directory and swap in the new indexes.
async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    let indexes = load_indexes(&state.artifact_dir, &state.registry)
        .map_err(|err| (StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}")))?;
    let mut languages: Vec<String> = indexes.keys().cloned().collect();
    languages.sort();
    *state.indexes.write() = indexes;
    tracing::info!(?languages, "indexes reloaded");
    Ok(Json(serde_json::json!({ "languages": languages })))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
