//! Lead repository: private chats that have talked to the bot

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};

use super::{DbPool, conn, format_ts, parse_ts};
use crate::Result;

/// A private-chat contact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lead {
    pub chat_id: i64,
    pub first_name: String,
    pub username: String,
    pub first_seen_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile fields refreshed on every private message
#[derive(Debug, Clone, Default)]
pub struct LeadUpsert<'a> {
    pub chat_id: i64,
    pub first_name: Option<&'a str>,
    pub username: Option<&'a str>,
}

/// Lead repository
#[derive(Debug, Clone)]
pub struct LeadRepo {
    pool: DbPool,
}

impl LeadRepo {
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create or refresh a lead
    ///
    /// Returns `true` when the chat had never been seen before.
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn upsert(&self, lead: &LeadUpsert<'_>, now: DateTime<Utc>) -> Result<bool> {
        let conn = conn(&self.pool)?;
        let now = format_ts(now);

        let inserted = conn.execute(
            "INSERT OR IGNORE INTO leads (chat_id, first_name, username, first_seen_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![
                lead.chat_id,
                lead.first_name.unwrap_or_default(),
                lead.username.unwrap_or_default(),
                now
            ],
        )?;

        if inserted == 0 {
            conn.execute(
                "UPDATE leads SET first_name = ?2, username = ?3, updated_at = ?4 WHERE chat_id = ?1",
                params![
                    lead.chat_id,
                    lead.first_name.unwrap_or_default(),
                    lead.username.unwrap_or_default(),
                    now
                ],
            )?;
        }

        Ok(inserted > 0)
    }

    /// Find a lead by chat ID
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn find(&self, chat_id: i64) -> Result<Option<Lead>> {
        let conn = conn(&self.pool)?;
        let lead = conn
            .query_row(
                "SELECT chat_id, first_name, username, first_seen_at, updated_at
                 FROM leads WHERE chat_id = ?1",
                [chat_id],
                |row| {
                    Ok(Lead {
                        chat_id: row.get(0)?,
                        first_name: row.get(1)?,
                        username: row.get(2)?,
                        first_seen_at: parse_ts(&row.get::<_, String>(3)?),
                        updated_at: parse_ts(&row.get::<_, String>(4)?),
                    })
                },
            )
            .optional()?;
        Ok(lead)
    }

    /// All lead chat IDs in first-seen order
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn all_ids(&self) -> Result<Vec<i64>> {
        let conn = conn(&self.pool)?;
        let mut stmt = conn.prepare("SELECT chat_id FROM leads ORDER BY first_seen_at, chat_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    /// Number of leads
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn count(&self) -> Result<u64> {
        let conn = conn(&self.pool)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM leads", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}
