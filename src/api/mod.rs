//! HTTP API server for the herald gateway

pub mod admin;
mod auth;
pub mod broadcasts;
pub mod health;
pub mod scheduler;
pub mod webhooks;

use std::sync::Arc;

use axum::Router;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::broadcast::BroadcastExecutor;
use crate::db::Repositories;
use crate::dispatch::Dispatcher;
use crate::Result;

/// Shared state for API handlers
pub struct ApiState {
    pub repos: Repositories,
    pub dispatcher: Arc<Dispatcher>,
    pub executor: Arc<BroadcastExecutor>,
    /// Expected `X-Telegram-Bot-Api-Secret-Token`; `None` rejects every update
    pub webhook_secret: Option<SecretString>,
    /// Bearer key for `/api/admin`; `None` runs it unauthenticated
    pub api_key: Option<SecretString>,
    /// Bearer secret for `/api/cron`; `None` rejects every call
    pub cron_secret: Option<SecretString>,
}

impl std::fmt::Debug for ApiState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiState")
            .field("webhook_secret", &self.webhook_secret.is_some())
            .field("api_key", &self.api_key.is_some())
            .field("cron_secret", &self.cron_secret.is_some())
            .finish_non_exhaustive()
    }
}

/// JSON error body shared by the API handlers
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

pub(crate) fn error_response(code: &'static str, message: impl Into<String>) -> axum::Json<ErrorResponse> {
    axum::Json(ErrorResponse {
        error: ErrorDetail {
            code,
            message: message.into(),
        },
    })
}

/// Whether `presented` equals the configured secret
pub(crate) fn secret_matches(expected: &SecretString, presented: Option<&str>) -> bool {
    presented.is_some_and(|p| p.as_bytes() == expected.expose_secret().as_bytes())
}

/// Build the full router
pub fn router(state: Arc<ApiState>) -> Router {
    if state.api_key.is_none() {
        tracing::warn!("HERALD_API_KEY not set - admin endpoints are unauthenticated");
    }
    if state.webhook_secret.is_none() {
        tracing::warn!("TELEGRAM_WEBHOOK_SECRET not set - webhook rejects every update");
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api/admin", admin::router(state.clone()))
        .nest("/api/webhooks", webhooks::router(state.clone()))
        .merge(scheduler::router(state))
        .merge(health::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// API server
#[derive(Debug)]
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
}

impl ApiServer {
    #[must_use]
    pub fn new(state: ApiState, port: u16) -> Self {
        Self {
            state: Arc::new(state),
            port,
        }
    }

    /// Router for this server's state
    #[must_use]
    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_comparison() {
        let secret = SecretString::from("s3cret".to_string());
        assert!(secret_matches(&secret, Some("s3cret")));
        assert!(!secret_matches(&secret, Some("s3cret ")));
        assert!(!secret_matches(&secret, None));
    }
}
