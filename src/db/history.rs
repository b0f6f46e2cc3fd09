//! Per-chat conversation history used as AI context

use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};

use super::{DbPool, conn, format_ts, parse_ts};
use crate::Result;

/// Who authored a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

impl ChatRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }

    fn parse(s: &str) -> Self {
        if s == "user" { Self::User } else { Self::Model }
    }
}

/// One history entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// History repository (append-only)
#[derive(Debug, Clone)]
pub struct HistoryRepo {
    pool: DbPool,
}

impl HistoryRepo {
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Append a message to a chat's history
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn append(&self, chat_id: i64, role: ChatRole, text: &str, now: DateTime<Utc>) -> Result<()> {
        let conn = conn(&self.pool)?;
        conn.execute(
            "INSERT INTO chat_messages (chat_id, role, text, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![chat_id, role.as_str(), text, format_ts(now)],
        )?;
        Ok(())
    }

    /// The last `limit` messages of a chat, oldest first
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn recent(&self, chat_id: i64, limit: usize) -> Result<Vec<ChatMessage>> {
        let conn = conn(&self.pool)?;
        let mut stmt = conn.prepare(
            "SELECT role, text, created_at FROM chat_messages
             WHERE chat_id = ?1 ORDER BY id DESC LIMIT ?2",
        )?;

        let mut messages = stmt
            .query_map(
                params![chat_id, i64::try_from(limit).unwrap_or(i64::MAX)],
                |row| {
                    Ok(ChatMessage {
                        role: ChatRole::parse(&row.get::<_, String>(0)?),
                        text: row.get(1)?,
                        created_at: parse_ts(&row.get::<_, String>(2)?),
                    })
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        messages.reverse();
        Ok(messages)
    }
}
