//! Admin API endpoints
//!
//! Everything under `/api/admin` sits behind the bearer API key middleware.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, put},
    Json, Router,
};
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};

use super::{auth::require_api_key, broadcasts, error_response, ApiState, ErrorResponse};
use crate::audience::Scope;
use crate::channels::Button;
use crate::db::{AutomationRule, BotSettings, MatchType, Notification};
use crate::Error;

type ApiResult<T> = Result<T, (StatusCode, Json<ErrorResponse>)>;

// --- Request/Response types ---

#[derive(Deserialize)]
pub struct CreateAutomationRequest {
    pub trigger: String,
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub buttons: Vec<Button>,
    #[serde(default)]
    pub scope: Scope,
    #[serde(default)]
    pub cooldown_secs: u64,
    #[serde(default)]
    pub match_type: MatchType,
    #[serde(default)]
    pub strict_slash: bool,
}

#[derive(Deserialize)]
pub struct SetActiveRequest {
    pub active: bool,
}

#[derive(Deserialize)]
pub struct SetAuthorizedRequest {
    pub authorized: bool,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub leads: u64,
    pub total_messages: u64,
}

/// Map a crate error onto an HTTP status and JSON body
pub(crate) fn reject(e: Error) -> (StatusCode, Json<ErrorResponse>) {
    let (status, code) = match &e {
        Error::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
        Error::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        Error::Upload(_) => (StatusCode::BAD_GATEWAY, "upload_failed"),
        Error::Database(_) | Error::Sqlite(_) => (StatusCode::INTERNAL_SERVER_ERROR, "db_error"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
    };
    if status.is_server_error() {
        tracing::warn!(error = %e, "admin request failed");
    }
    (status, error_response(code, e.to_string()))
}

// --- Handlers ---

async fn create_automation(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<CreateAutomationRequest>,
) -> ApiResult<(StatusCode, Json<AutomationRule>)> {
    let trigger = req.trigger.trim();
    if trigger.is_empty() {
        return Err(reject(Error::Validation("trigger is required".to_string())));
    }
    if req.match_type == MatchType::Regex {
        RegexBuilder::new(trigger)
            .case_insensitive(true)
            .build()
            .map_err(|e| reject(Error::Validation(format!("invalid regex: {e}"))))?;
    }

    let mut rule = AutomationRule::new(trigger, req.response)
        .with_match_type(req.match_type)
        .with_scope(req.scope)
        .with_cooldown(req.cooldown_secs);
    rule.image = req.image.filter(|i| !i.trim().is_empty());
    rule.buttons = req.buttons;
    rule.strict_slash = req.strict_slash;

    state.repos.automations.insert(&rule).map_err(reject)?;
    Ok((StatusCode::CREATED, Json(rule)))
}

async fn set_automation_active(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    Json(req): Json<SetActiveRequest>,
) -> ApiResult<StatusCode> {
    state
        .repos
        .automations
        .set_active(&id, req.active)
        .map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_group_authorized(
    State(state): State<Arc<ApiState>>,
    Path(chat_id): Path<i64>,
    Json(req): Json<SetAuthorizedRequest>,
) -> ApiResult<StatusCode> {
    state
        .repos
        .groups
        .set_authorized(chat_id, req.authorized)
        .map_err(reject)?;
    tracing::info!(chat_id, authorized = req.authorized, "group authorization changed");
    Ok(StatusCode::NO_CONTENT)
}

async fn get_settings(State(state): State<Arc<ApiState>>) -> ApiResult<Json<BotSettings>> {
    state.repos.settings.bot().map(Json).map_err(reject)
}

/// Replace the bot settings document; dispatch sees it on the next update
async fn put_settings(
    State(state): State<Arc<ApiState>>,
    Json(settings): Json<BotSettings>,
) -> ApiResult<StatusCode> {
    state.repos.settings.save_bot(&settings).map_err(reject)?;
    state.dispatcher.settings().invalidate();
    Ok(StatusCode::NO_CONTENT)
}

async fn list_notifications(
    State(state): State<Arc<ApiState>>,
) -> ApiResult<Json<Vec<Notification>>> {
    state.repos.notifications.unread().map(Json).map_err(reject)
}

async fn get_stats(State(state): State<Arc<ApiState>>) -> ApiResult<Json<StatsResponse>> {
    let leads = state.repos.leads.count().map_err(reject)?;
    let total_messages = state.repos.settings.total_messages().map_err(reject)?;
    Ok(Json(StatsResponse {
        leads,
        total_messages,
    }))
}

/// Build admin router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/automations", axum::routing::post(create_automation))
        .route("/automations/{id}/active", put(set_automation_active))
        .route("/groups/{chat_id}/authorization", put(set_group_authorized))
        .route("/settings", get(get_settings).put(put_settings))
        .route("/notifications", get(list_notifications))
        .route("/stats", get(get_stats))
        .merge(broadcasts::routes())
        .layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_unprocessable() {
        let (status, _) = reject(Error::Validation("too many buttons".to_string()));
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn upload_maps_to_bad_gateway() {
        let (status, _) = reject(Error::Upload("rejected".to_string()));
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        let (status, _) = reject(Error::NotFound("broadcast x".to_string()));
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
