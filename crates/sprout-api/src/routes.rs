use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sprout_core::db::Database;
use sprout_core::models::SyncConflict;
use sprout_core::{PullResponse, PushResponse, SyncBatch, SyncEngine, Timestamp};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{AppConfig, DatabaseLocation};
use crate::error::AppError;

const DEFAULT_CONFLICT_LIMIT: usize = 50;
const MAX_CONFLICT_LIMIT: usize = 500;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    engine: SyncEngine,
}

impl AppState {
    pub fn from_config(config: Arc<AppConfig>) -> sprout_core::Result<Self> {
        let db = match &config.database {
            DatabaseLocation::File(path) => Database::open(path)?,
            DatabaseLocation::InMemory => Database::open_in_memory()?,
        };
        Ok(Self::new(config, SyncEngine::new(Arc::new(db))))
    }

    pub const fn new(config: Arc<AppConfig>, engine: SyncEngine) -> Self {
        Self { config, engine }
    }
}

pub fn app_router(state: AppState) -> Router {
    let cors = match state.config.cors_allow_origin.clone() {
        Some(origin) => CorsLayer::new().allow_origin(origin),
        None => CorsLayer::new().allow_origin(Any),
    }
    .allow_headers(Any)
    .allow_methods(Any);

    Router::new()
        .route("/healthz", get(healthz))
        .route("/sync", get(pull).post(push))
        .route("/sync/conflicts", get(conflicts))
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
    })
}

#[derive(Debug, Deserialize)]
struct PullQuery {
    since: Option<String>,
}

async fn pull(
    State(state): State<AppState>,
    query: Result<Query<PullQuery>, QueryRejection>,
) -> Result<Json<PullResponse>, AppError> {
    let Query(query) = query?;
    let since = query
        .since
        .as_deref()
        .filter(|value| !value.trim().is_empty())
        .map(Timestamp::parse)
        .transpose()?;

    let engine = state.engine.clone();
    let response = run_blocking(move || engine.pull(since.as_ref())).await??;
    Ok(Json(response))
}

async fn push(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PushResponse>, AppError> {
    let Json(payload) = payload?;
    let batch = SyncBatch::from_value(payload)?;

    let engine = state.engine.clone();
    let report = run_blocking(move || engine.push(&batch)).await?;
    Ok(Json(report.into()))
}

#[derive(Debug, Deserialize)]
struct ConflictsQuery {
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ConflictsResponse {
    conflicts: Vec<SyncConflict>,
}

async fn conflicts(
    State(state): State<AppState>,
    query: Result<Query<ConflictsQuery>, QueryRejection>,
) -> Result<Json<ConflictsResponse>, AppError> {
    let Query(query) = query?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_CONFLICT_LIMIT)
        .clamp(1, MAX_CONFLICT_LIMIT);

    let engine = state.engine.clone();
    let conflicts = run_blocking(move || engine.conflicts(limit)).await??;
    Ok(Json(ConflictsResponse { conflicts }))
}

/// Run a synchronous store call off the async workers
async fn run_blocking<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| AppError::internal(format!("sync task failed: {err}")))
}
