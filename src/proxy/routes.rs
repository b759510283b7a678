use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderValue, StatusCode, Uri, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::AppState;
use super::cache::CacheEntry;

/// Marker header telling clients whether the body came from the cache.
pub const CACHE_HEADER: &str = "x-cache";

const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    fn header_value(self) -> HeaderValue {
        match self {
            Self::Hit => HeaderValue::from_static("HIT"),
            Self::Miss => HeaderValue::from_static("MISS"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LyricsQuery {
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub title: String,
}

pub fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn with_cache_status(mut response: Response, status: CacheStatus) -> Response {
    response
        .headers_mut()
        .insert(CACHE_HEADER, status.header_value());
    response
}

fn entry_response(entry: CacheEntry, status: CacheStatus) -> Response {
    let code = StatusCode::from_u16(entry.status).unwrap_or(StatusCode::OK);
    let content_type = HeaderValue::from_str(&entry.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let mut response = (code, entry.body).into_response();
    response.headers_mut().insert(CONTENT_TYPE, content_type);
    with_cache_status(response, status)
}

/// Store successful responses, then answer with a MISS marker.
fn store_and_respond(
    state: &AppState,
    key: String,
    status: StatusCode,
    content_type: String,
    body: Bytes,
) -> Response {
    let entry = CacheEntry {
        timestamp: state.clock.now(),
        status: status.as_u16(),
        content_type,
        body,
    };
    if status.is_success() {
        debug!("caching {key}");
        state.cache.set(key, entry.clone());
    }
    entry_response(entry, CacheStatus::Miss)
}

pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    let response = Json(json!({ "ok": true, "upstream": state.upstream })).into_response();
    with_cache_status(response, CacheStatus::Miss)
}

pub async fn lyrics(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LyricsQuery>,
) -> Response {
    let key = format!("lyrics:{}:{}", query.artist, query.title);
    if let Some(entry) = state.cache.get(&key) {
        return entry_response(entry, CacheStatus::Hit);
    }

    let source = Arc::clone(&state.lyrics);
    let LyricsQuery { artist, title } = query;
    let joined = tokio::spawn(async move { source.lookup(&artist, &title).await }).await;

    match joined {
        Ok(result) => {
            let body: Value = json!({
                "success": true,
                "data": {
                    "lyrics": result.lyrics,
                    "timedLines": result.timed_lines,
                },
            });
            store_and_respond(
                &state,
                key,
                StatusCode::OK,
                JSON_CONTENT_TYPE.to_string(),
                Bytes::from(body.to_string()),
            )
        }
        Err(e) => {
            warn!("lyrics lookup for {key} failed: {e}");
            let body = json!({
                "success": false,
                "data": { "lyrics": null },
                "error": "Lyrics lookup failed",
                "details": e.to_string(),
            });
            (StatusCode::BAD_GATEWAY, Json(body)).into_response()
        }
    }
}

/// Forward `/api/*` to the catalog, keeping path and query string.
pub async fn passthrough(State(state): State<Arc<AppState>>, uri: Uri) -> Response {
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    let target = format!("{}{}", state.upstream, path_and_query);

    if let Some(entry) = state.cache.get(&target) {
        return entry_response(entry, CacheStatus::Hit);
    }

    match fetch_upstream(&state.http, &target).await {
        Ok((status, content_type, body)) => {
            store_and_respond(&state, target, status, content_type, body)
        }
        Err(e) => {
            warn!("upstream request {target} failed: {e:#}");
            let body = json!({
                "error": "Upstream request failed",
                "details": format!("{e:#}"),
            });
            (StatusCode::BAD_GATEWAY, Json(body)).into_response()
        }
    }
}

async fn fetch_upstream(
    http: &reqwest::Client,
    url: &str,
) -> anyhow::Result<(StatusCode, String, Bytes)> {
    use anyhow::Context;

    let response = http.get(url).send().await.context("send upstream request")?;
    let status = StatusCode::from_u16(response.status().as_u16()).context("upstream status")?;
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(JSON_CONTENT_TYPE)
        .to_string();
    let body = response.bytes().await.context("read upstream body")?;
    Ok((status, content_type, body))
}

pub async fn not_found(uri: Uri) -> Response {
    debug!("no route for {}", uri.path());
    error_response(StatusCode::NOT_FOUND, "Not found")
}
