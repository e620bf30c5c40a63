//! HTTP request handlers.

use super::AppState;
use crate::store::{save_snapshot, HistoryResponse};
use crate::validation::normalize_url;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct UrlQuery {
    pub url: String,
}

/// One-shot check; runs on the request path and is not recorded. Dropping
/// the connection drops the future, cancelling the in-flight probe.
pub async fn handle_check(
    State(state): State<AppState>,
    Query(query): Query<UrlQuery>,
) -> impl IntoResponse {
    match normalize_url(&query.url) {
        Ok(url) => Json(state.prober.check(&url).await).into_response(),
        Err(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    }
}

pub async fn handle_list(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.store.list_urls())
}

pub async fn handle_add(
    State(state): State<AppState>,
    Query(query): Query<UrlQuery>,
) -> impl IntoResponse {
    match normalize_url(&query.url) {
        Ok(url) => {
            if state.store.add_url(&url) {
                persist_in_background(&state);
            }
            Json(json!({ "message": "added", "url": url })).into_response()
        }
        Err(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    }
}

pub async fn handle_remove(
    State(state): State<AppState>,
    Query(query): Query<UrlQuery>,
) -> impl IntoResponse {
    match normalize_url(&query.url) {
        Ok(url) => {
            if state.store.remove_url(&url) {
                persist_in_background(&state);
            }
            Json(json!({ "message": "removed", "url": url })).into_response()
        }
        Err(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    }
}

pub async fn handle_history(
    State(state): State<AppState>,
    Query(query): Query<UrlQuery>,
) -> impl IntoResponse {
    let url = match normalize_url(&query.url) {
        Ok(url) => url,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };
    match state.store.history(&url) {
        Some(checks) => Json(HistoryResponse { url, checks }).into_response(),
        None => (StatusCode::NOT_FOUND, "URL not monitored").into_response(),
    }
}

pub async fn handle_health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Registry mutations flush the snapshot off the request path.
fn persist_in_background(state: &AppState) {
    let Some(path) = state.persist_path.clone() else {
        return;
    };
    let snapshot = state.store.snapshot();
    tokio::spawn(async move {
        if let Err(e) = save_snapshot(&path, &snapshot).await {
            tracing::warn!("Snapshot write to {} failed: {}", path, e);
        }
    });
}
