//! Database module: leads, groups, automations, broadcasts, history and settings
//!
//! Each collection gets a small repository over a shared `r2d2` pool.

pub mod automation;
pub mod broadcast;
pub mod group;
pub mod history;
pub mod lead;
pub mod notification;
mod schema;
pub mod settings;

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;

use crate::{Error, Result};

pub use automation::{AutomationRepo, AutomationRule, MatchType};
pub use broadcast::{BroadcastRepo, BroadcastTask, Frequency, NewBroadcast, TaskStatus};
pub use group::{Group, GroupRepo};
pub use history::{ChatMessage, ChatRole, HistoryRepo};
pub use lead::{Lead, LeadRepo, LeadUpsert};
pub use notification::{Notification, NotificationRepo};
pub use schema::SCHEMA_VERSION;
pub use settings::{BotSettings, SettingsRepo};

/// Database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// Pooled database connection
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Initialize the database
///
/// # Errors
///
/// Returns error if database cannot be opened or initialized
pub fn init<P: AsRef<Path>>(path: P) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(path)
        .with_init(|c| c.execute_batch("PRAGMA journal_mode = WAL; PRAGMA busy_timeout = 5000;"));
    let pool = Pool::builder()
        .max_size(4)
        .build(manager)
        .map_err(|e| Error::Database(e.to_string()))?;

    // Run migrations on first connection
    let conn = pool.get().map_err(|e| Error::Database(e.to_string()))?;
    schema::init(&conn)?;

    tracing::info!(version = SCHEMA_VERSION, "database initialized");
    Ok(pool)
}

/// Initialize an in-memory database (for testing)
///
/// # Errors
///
/// Returns error if database cannot be initialized
pub fn init_memory() -> Result<DbPool> {
    let manager = SqliteConnectionManager::memory();
    let pool = Pool::builder()
        .max_size(1)
        .build(manager)
        .map_err(|e| Error::Database(e.to_string()))?;

    let conn = pool.get().map_err(|e| Error::Database(e.to_string()))?;
    schema::init(&conn)?;

    Ok(pool)
}

/// All repositories over one pool
#[derive(Debug, Clone)]
pub struct Repositories {
    pub leads: LeadRepo,
    pub groups: GroupRepo,
    pub automations: AutomationRepo,
    pub broadcasts: BroadcastRepo,
    pub history: HistoryRepo,
    pub settings: SettingsRepo,
    pub notifications: NotificationRepo,
}

impl Repositories {
    #[must_use]
    pub fn new(pool: &DbPool) -> Self {
        Self {
            leads: LeadRepo::new(pool.clone()),
            groups: GroupRepo::new(pool.clone()),
            automations: AutomationRepo::new(pool.clone()),
            broadcasts: BroadcastRepo::new(pool.clone()),
            history: HistoryRepo::new(pool.clone()),
            settings: SettingsRepo::new(pool.clone()),
            notifications: NotificationRepo::new(pool.clone()),
        }
    }
}

pub(crate) fn conn(pool: &DbPool) -> Result<DbConn> {
    pool.get().map_err(|e| Error::Database(e.to_string()))
}

/// Fixed-width UTC timestamp; lexicographic order matches time order
pub(crate) fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
