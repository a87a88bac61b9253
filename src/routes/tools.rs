use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::provider_error;
use crate::{
    cards::{gauges, Card},
    providers::{LibraryCategory, RepoQuery, RepoSort, ResourceSnapshot, DEFAULT_LIMIT},
    snippets,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct TrendingParams {
    pub language: Option<String>,
    pub sort: Option<RepoSort>,
    pub limit: Option<u8>,
}

#[derive(Debug, Deserialize)]
pub struct LibraryParams {
    pub category: Option<LibraryCategory>,
    pub sort: Option<RepoSort>,
    pub limit: Option<u8>,
}

#[derive(Debug, Deserialize)]
pub struct SnippetParams {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub language: String,
}

#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub snapshot: ResourceSnapshot,
    pub gauges: Vec<Card>,
}

pub fn tool_routes() -> Router<AppState> {
    Router::new()
        .route("/tools/trending", get(trending))
        .route("/tools/libraries", get(libraries))
        .route("/tools/metrics", get(metrics))
        .route("/tools/snippets", get(list_snippets))
}

async fn repo_cards(
    state: &AppState,
    query: RepoQuery,
) -> Result<Json<Vec<Card>>, (StatusCode, String)> {
    let repos = state
        .repos
        .fetch_repositories(&query)
        .await
        .map_err(provider_error)?;
    Ok(Json(repos.iter().map(Card::from).collect()))
}

#[instrument(skip(state))]
pub async fn trending(
    State(state): State<AppState>,
    Query(p): Query<TrendingParams>,
) -> Result<Json<Vec<Card>>, (StatusCode, String)> {
    let query = RepoQuery::trending(p.language.as_deref(), p.limit.unwrap_or(DEFAULT_LIMIT))
        .with_sort(p.sort.unwrap_or_default());
    repo_cards(&state, query).await
}

#[instrument(skip(state))]
pub async fn libraries(
    State(state): State<AppState>,
    Query(p): Query<LibraryParams>,
) -> Result<Json<Vec<Card>>, (StatusCode, String)> {
    let query = RepoQuery::popular_libraries(p.category, p.limit.unwrap_or(DEFAULT_LIMIT))
        .with_sort(p.sort.unwrap_or_default());
    repo_cards(&state, query).await
}

/// Latest sampled snapshot; samples on demand until the background sampler has produced one.
#[instrument(skip(state))]
pub async fn metrics(
    State(state): State<AppState>,
) -> Result<Json<MetricsResponse>, (StatusCode, String)> {
    let latest = state.metrics.borrow().clone();
    let snapshot = match latest {
        Some(s) => s,
        None => state
            .metrics_source
            .sample()
            .await
            .map_err(provider_error)?,
    };
    Ok(Json(MetricsResponse {
        gauges: gauges(&snapshot),
        snapshot,
    }))
}

#[instrument(skip_all, fields(q = %p.q, language = %p.language))]
pub async fn list_snippets(Query(p): Query<SnippetParams>) -> Json<Vec<Card>> {
    let hits = snippets::by_language(snippets::search(snippets::catalogue(), &p.q), &p.language);
    Json(hits.into_iter().map(Card::from).collect())
}
