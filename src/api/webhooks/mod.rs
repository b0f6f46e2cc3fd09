//! Webhook endpoints for channel integrations

use std::sync::Arc;

use axum::{routing::post, Router};

use super::ApiState;

pub mod telegram;

/// Build webhooks router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/telegram", post(telegram::handle_update))
        .with_state(state)
}
