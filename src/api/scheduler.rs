//! Scheduler trigger
//!
//! An external timer calls `GET /api/cron` to run every due broadcast task.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};

use super::auth::bearer_token;
use super::{error_response, secret_matches, ApiState, ErrorResponse};
use crate::broadcast::RunSummary;

/// Build the scheduler router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/cron", get(run_due))
        .with_state(state)
}

async fn run_due(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
) -> Result<Json<RunSummary>, (StatusCode, Json<ErrorResponse>)> {
    let authorized = state
        .cron_secret
        .as_ref()
        .is_some_and(|secret| secret_matches(secret, bearer_token(&headers)));
    if !authorized {
        tracing::warn!("rejected scheduler trigger: bad or missing secret");
        return Err((
            StatusCode::UNAUTHORIZED,
            error_response("unauthorized", "Unauthorized"),
        ));
    }

    match state.executor.run().await {
        Ok(summary) => Ok(Json(summary)),
        Err(e) => {
            tracing::error!(error = %e, "broadcast run failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                error_response("run_failed", e.to_string()),
            ))
        }
    }
}
