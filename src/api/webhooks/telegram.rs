//! Telegram webhook handler

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Serialize;

use crate::api::{secret_matches, ApiState};
use crate::dispatch::update::Update;

/// Header Telegram echoes back from `setWebhook`'s `secret_token`
pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Telegram webhook response
#[derive(Serialize)]
pub struct WebhookResponse {
    pub ok: bool,
}

/// Handle incoming Telegram update
///
/// Without a configured secret every update is rejected. Once the secret
/// checks out the answer is always `200 {"ok":true}`, so Telegram never
/// retries an update we already saw.
pub async fn handle_update(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<WebhookResponse>) {
    let Some(expected) = &state.webhook_secret else {
        tracing::warn!("rejected Telegram update: TELEGRAM_WEBHOOK_SECRET not set");
        return (StatusCode::FORBIDDEN, Json(WebhookResponse { ok: false }));
    };
    let presented = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
    if !secret_matches(expected, presented) {
        tracing::warn!("rejected Telegram update: secret token mismatch");
        return (StatusCode::FORBIDDEN, Json(WebhookResponse { ok: false }));
    }

    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unparseable Telegram update");
            return (StatusCode::OK, Json(WebhookResponse { ok: true }));
        }
    };

    tracing::debug!(update_id = update.update_id, "received Telegram update");
    state.dispatcher.dispatch(update).await;

    (StatusCode::OK, Json(WebhookResponse { ok: true }))
}
