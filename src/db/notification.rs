//! Dashboard notifications

use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::Serialize;
use uuid::Uuid;

use super::{DbPool, conn, format_ts, parse_ts};
use crate::Result;

/// A notification shown to operators
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub message: String,
    pub kind: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Notification repository
#[derive(Debug, Clone)]
pub struct NotificationRepo {
    pool: DbPool,
}

impl NotificationRepo {
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Record an unread notification
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn push(&self, kind: &str, title: &str, message: &str, now: DateTime<Utc>) -> Result<()> {
        let conn = conn(&self.pool)?;
        conn.execute(
            "INSERT INTO notifications (id, title, message, kind, read, created_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5)",
            params![Uuid::new_v4().to_string(), title, message, kind, format_ts(now)],
        )?;
        Ok(())
    }

    /// Unread notifications, newest first
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn unread(&self) -> Result<Vec<Notification>> {
        let conn = conn(&self.pool)?;
        let mut stmt = conn.prepare(
            "SELECT id, title, message, kind, read, created_at FROM notifications
             WHERE read = 0 ORDER BY created_at DESC",
        )?;
        let items = stmt
            .query_map([], |row| {
                Ok(Notification {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    message: row.get(2)?,
                    kind: row.get(3)?,
                    read: row.get(4)?,
                    created_at: parse_ts(&row.get::<_, String>(5)?),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }
}
