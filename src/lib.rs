//! Herald Gateway - Telegram bot admin platform
//!
//! This library provides the core functionality for the Herald gateway:
//! - Webhook dispatch (keyword automations, group authorization, lead capture)
//! - AI fallback replies through pluggable completion providers
//! - Scheduled and recurring broadcasts with upload reuse
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │             Telegram  │  External timer  │  Admin   │
//! └────────────────────┬────────────────────────────────┘
//!                      │ HTTP (axum)
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Herald Gateway                       │
//! │   Dispatcher  │  Automations  │  Broadcast Executor  │
//! └──────────┬─────────────────────────────┬────────────┘
//!            │                             │
//! ┌──────────▼──────────┐       ┌──────────▼──────────┐
//! │  SQLite (r2d2 pool) │       │ Telegram / AI APIs  │
//! └─────────────────────┘       └─────────────────────┘
//! ```

pub mod ai;
pub mod api;
pub mod audience;
pub mod automation;
pub mod broadcast;
pub mod cache;
pub mod channels;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;

pub use audience::{ChatKind, Scope};
pub use config::Config;
pub use db::{DbConn, DbPool, Repositories};
pub use dispatch::Dispatcher;
pub use error::{Error, Result};
