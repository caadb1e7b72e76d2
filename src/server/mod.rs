//! HTTP daemon/server mode for `zksearch`.
//!
//! This module exposes a small HTTP+JSON API that mirrors the `run_*`
//! entry points in [`crate::search`]:
//!
//! - `POST /v1/index`, `/v1/reindex`, `/v1/deindex`, `/v1/import` –
//!   accept the matching request model and return an `IndexSummary`.
//! - `POST /v1/search` – accepts a `SearchRequest` and returns a
//!   `SearchResult`.
//! - `POST /v1/keywords` – accepts a `KeywordsRequest` and returns a
//!   `KeywordList`.
//! - `POST /v1/store/info` – accepts a `StoreConfig` and returns a
//!   `StoreSummary`.
//! - `GET /v1/health` – simple health check endpoint.
//!
//! Mutating requests are serialized through one lock, so concurrent
//! clients never race on a keyword's last bucket. Searches and
//! introspection run without it.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::models::{
    DeindexRequest, ImportRequest, IndexRequest, IndexSummary, KeywordList, KeywordsRequest,
    ReindexRequest, SearchRequest, SearchResult, StoreConfig, StoreSummary,
};
use crate::search;
use crate::store;

/// Simple health-check response payload.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// JSON error body returned by the API.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Error type used by HTTP handlers to map internal failures into
/// JSON error responses.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        let message = format!("{err:#}");
        if message.starts_with("store not found at ") {
            Self {
                status: StatusCode::NOT_FOUND,
                message,
            }
        } else {
            warn!(error = %message, "request failed");
            ApiError::bad_request(message)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

/// Shared handler state.
#[derive(Clone, Default)]
pub struct AppState {
    write_lock: Arc<Mutex<()>>,
}

/// Build the Axum router for the zksearch HTTP API.
pub fn router() -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/index", post(index))
        .route("/v1/reindex", post(reindex))
        .route("/v1/deindex", post(deindex))
        .route("/v1/import", post(import))
        .route("/v1/search", post(search_items))
        .route("/v1/keywords", post(keywords))
        .route("/v1/store/info", post(store_info))
        .with_state(AppState::default())
}

/// Run the HTTP server bound to the provided socket address.
///
/// This is used by the CLI `zksearch serve` subcommand.
pub async fn run(addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_with_listener(listener).await
}

/// Run the HTTP server using an existing `TcpListener`.
///
/// This is primarily used in tests to bind to an ephemeral port.
pub async fn serve_with_listener(listener: TcpListener) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "zksearch server listening");
    }
    let app = router();
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn index(
    State(state): State<AppState>,
    Json(request): Json<IndexRequest>,
) -> Result<Json<IndexSummary>, ApiError> {
    let _guard = state.write_lock.lock().await;
    let summary = search::run_index(request)?;
    Ok(Json(summary))
}

async fn reindex(
    State(state): State<AppState>,
    Json(request): Json<ReindexRequest>,
) -> Result<Json<IndexSummary>, ApiError> {
    let _guard = state.write_lock.lock().await;
    let summary = search::run_reindex(request)?;
    Ok(Json(summary))
}

async fn deindex(
    State(state): State<AppState>,
    Json(request): Json<DeindexRequest>,
) -> Result<Json<IndexSummary>, ApiError> {
    let _guard = state.write_lock.lock().await;
    let summary = search::run_deindex(request)?;
    Ok(Json(summary))
}

async fn import(
    State(state): State<AppState>,
    Json(request): Json<ImportRequest>,
) -> Result<Json<IndexSummary>, ApiError> {
    let _guard = state.write_lock.lock().await;
    info!(records = request.records.len(), "import request");
    let summary = search::run_import(request)?;
    Ok(Json(summary))
}

async fn search_items(Json(request): Json<SearchRequest>) -> Result<Json<SearchResult>, ApiError> {
    let result = search::run_search(request)?;
    Ok(Json(result))
}

async fn keywords(Json(request): Json<KeywordsRequest>) -> Result<Json<KeywordList>, ApiError> {
    let list = search::list_keywords(request)?;
    Ok(Json(list))
}

async fn store_info(Json(config): Json<StoreConfig>) -> Result<Json<StoreSummary>, ApiError> {
    let summary = store::get_store_info(&config)?;
    Ok(Json(summary))
}
