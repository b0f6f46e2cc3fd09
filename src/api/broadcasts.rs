//! Broadcast composition endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{admin::reject, ApiState, ErrorResponse};
use crate::broadcast::compose;
use crate::db::{BroadcastTask, NewBroadcast};

const DEFAULT_LIST_LIMIT: usize = 50;

type ApiResult<T> = Result<T, (StatusCode, Json<ErrorResponse>)>;

#[derive(Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct SendResponse {
    pub reached: u64,
}

/// Broadcast routes, mounted under the admin router
pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/broadcasts", get(list_broadcasts).post(create_broadcast))
        .route("/broadcasts/send", post(send_broadcast))
        .route("/broadcasts/{id}", get(get_broadcast))
}

/// Schedule a broadcast
async fn create_broadcast(
    State(state): State<Arc<ApiState>>,
    Json(new): Json<NewBroadcast>,
) -> ApiResult<(StatusCode, Json<BroadcastTask>)> {
    compose::validate(&new, true).map_err(reject)?;

    let task = state
        .repos
        .broadcasts
        .create(&new, Utc::now())
        .map_err(reject)?;

    tracing::info!(
        task_id = %task.id,
        scope = task.scope.as_str(),
        frequency = task.frequency.as_str(),
        scheduled_at = %task.scheduled_at,
        "broadcast scheduled"
    );
    Ok((StatusCode::CREATED, Json(task)))
}

/// Send a broadcast immediately
async fn send_broadcast(
    State(state): State<Arc<ApiState>>,
    Json(new): Json<NewBroadcast>,
) -> ApiResult<Json<SendResponse>> {
    let reached = state.executor.send_now(&new).await.map_err(reject)?;
    tracing::info!(reached, "immediate broadcast sent");
    Ok(Json(SendResponse { reached }))
}

/// List broadcasts, newest first
async fn list_broadcasts(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<BroadcastTask>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let tasks = state.repos.broadcasts.list(limit).map_err(reject)?;
    Ok(Json(tasks))
}

async fn get_broadcast(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<BroadcastTask>> {
    state
        .repos
        .broadcasts
        .get(&id)
        .map_err(reject)?
        .map(Json)
        .ok_or_else(|| reject(crate::Error::NotFound(format!("broadcast {id}"))))
}
