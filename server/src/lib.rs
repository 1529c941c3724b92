use axum::{extract::{Query, State}, http::{HeaderMap, StatusCode}, routing::{get, post}, Json, Router};
use search_core::{IndexStats, InvertedIndex, PageRecord, PageStore};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { 10 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub url: String,
    pub title: String,
    pub snippet: String,
    pub score: f64,
}

#[derive(Deserialize)]
pub struct BatchPage {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

type ApiError = (StatusCode, Json<Value>);

fn api_error(status: StatusCode, message: &str) -> ApiError {
    (status, Json(json!({ "error": message })))
}

#[derive(Clone)]
pub struct AppState {
    pub index: Arc<InvertedIndex>,
    pub store: Option<Arc<dyn PageStore>>,
    pub admin_token: Option<String>,
}

impl AppState {
    /// State over `index`, with the admin token taken from `ADMIN_TOKEN`.
    pub fn new(index: Arc<InvertedIndex>, store: Option<Arc<dyn PageStore>>) -> Self {
        Self { index, store, admin_token: std::env::var("ADMIN_TOKEN").ok().filter(|t| !t.is_empty()) }
    }

    pub fn with_admin_token(mut self, token: impl Into<String>) -> Self {
        self.admin_token = Some(token.into());
        self
    }
}

pub fn build_app(state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/stats", get(stats_handler))
        .route("/index/batch", post(index_batch))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = match params.q {
        Some(q) if !q.trim().is_empty() => q,
        _ => return Err(api_error(StatusCode::BAD_REQUEST, "Missing query parameter 'q'")),
    };
    let start = std::time::Instant::now();
    let hits = state.index.search_scored(&query);
    let total_hits = hits.len();
    let k = params.k.clamp(1, 100);
    let results = hits
        .into_iter()
        .take(k)
        .map(|hit| SearchHit { url: hit.page.url, title: hit.page.title, snippet: hit.page.snippet, score: hit.score })
        .collect();

    let elapsed = start.elapsed();
    tracing::debug!(%query, total_hits, took_s = elapsed.as_secs_f64(), "search");
    Ok(Json(SearchResponse { query, took_s: elapsed.as_secs_f64(), total_hits, results }))
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<IndexStats> {
    Json(state.index.stats())
}

// --- Admin endpoints ---
async fn index_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(pages): Json<Vec<BatchPage>>,
) -> Result<Json<Value>, ApiError> {
    authorize(&state, &headers)?;
    let mut indexed = 0;
    for p in pages {
        if p.url.trim().is_empty() {
            continue;
        }
        let page = PageRecord::new(p.url, p.title, p.content);
        if let Some(store) = &state.store {
            let store = Arc::clone(store);
            let saved = page.clone();
            match tokio::task::spawn_blocking(move || store.save_page(&saved)).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => tracing::warn!(url = %page.url, error = %format!("{err:#}"), "failed to save page"),
                Err(err) => tracing::warn!(url = %page.url, error = %err, "page save task failed"),
            }
        }
        state.index.add(page);
        indexed += 1;
    }
    tracing::info!(indexed, "batch indexed");
    Ok(Json(json!({ "indexed": indexed, "stats": state.index.stats() })))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err(api_error(StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set")),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err(api_error(StatusCode::UNAUTHORIZED, "invalid admin token"))
    }
}
