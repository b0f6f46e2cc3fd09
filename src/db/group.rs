//! Group repository
//!
//! Groups register themselves when the bot is added; an admin must flip
//! `authorized` before the bot answers or broadcasts there.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};

use super::{DbPool, conn, format_ts, parse_ts};
use crate::Result;

/// A group or channel the bot belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub chat_id: i64,
    pub title: String,
    pub authorized: bool,
    pub last_active_at: DateTime<Utc>,
}

/// Group repository
#[derive(Debug, Clone)]
pub struct GroupRepo {
    pool: DbPool,
}

impl GroupRepo {
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Find a group by chat ID
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn get(&self, chat_id: i64) -> Result<Option<Group>> {
        let conn = conn(&self.pool)?;
        let group = conn
            .query_row(
                "SELECT chat_id, title, authorized, last_active_at FROM groups WHERE chat_id = ?1",
                [chat_id],
                |row| {
                    Ok(Group {
                        chat_id: row.get(0)?,
                        title: row.get(1)?,
                        authorized: row.get(2)?,
                        last_active_at: parse_ts(&row.get::<_, String>(3)?),
                    })
                },
            )
            .optional()?;
        Ok(group)
    }

    /// Whether the group exists and is authorized
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn is_authorized(&self, chat_id: i64) -> Result<bool> {
        Ok(self.get(chat_id)?.is_some_and(|g| g.authorized))
    }

    /// Record membership in a group
    ///
    /// New groups start unauthorized. Known groups keep their authorization
    /// and only get a fresh title and activity timestamp.
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn register(&self, chat_id: i64, title: &str, now: DateTime<Utc>) -> Result<()> {
        let conn = conn(&self.pool)?;
        conn.execute(
            "INSERT INTO groups (chat_id, title, authorized, last_active_at) VALUES (?1, ?2, 0, ?3)
             ON CONFLICT(chat_id) DO UPDATE SET title = excluded.title, last_active_at = excluded.last_active_at",
            params![chat_id, title, format_ts(now)],
        )?;
        tracing::debug!(chat_id, title, "group registered");
        Ok(())
    }

    /// Grant or revoke authorization
    ///
    /// # Errors
    ///
    /// Returns error if the group is unknown or the update fails
    pub fn set_authorized(&self, chat_id: i64, authorized: bool) -> Result<()> {
        let conn = conn(&self.pool)?;
        let updated = conn.execute(
            "UPDATE groups SET authorized = ?2 WHERE chat_id = ?1",
            params![chat_id, authorized],
        )?;
        if updated == 0 {
            return Err(crate::Error::NotFound(format!("group {chat_id}")));
        }
        Ok(())
    }

    /// Chat IDs of all authorized groups
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn authorized_ids(&self) -> Result<Vec<i64>> {
        let conn = conn(&self.pool)?;
        let mut stmt =
            conn.prepare("SELECT chat_id FROM groups WHERE authorized = 1 ORDER BY chat_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<i64>, _>>()?;
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory;

    #[test]
    fn new_groups_start_unauthorized() {
        let repo = GroupRepo::new(init_memory().unwrap());
        repo.register(-100, "Team", Utc::now()).unwrap();

        let group = repo.get(-100).unwrap().unwrap();
        assert_eq!(group.title, "Team");
        assert!(!group.authorized);
        assert!(repo.authorized_ids().unwrap().is_empty());
    }

    #[test]
    fn register_keeps_authorization() {
        let repo = GroupRepo::new(init_memory().unwrap());
        repo.register(-100, "Team", Utc::now()).unwrap();
        repo.set_authorized(-100, true).unwrap();
        repo.register(-100, "Renamed", Utc::now()).unwrap();

        let group = repo.get(-100).unwrap().unwrap();
        assert_eq!(group.title, "Renamed");
        assert!(group.authorized);
        assert_eq!(repo.authorized_ids().unwrap(), vec![-100]);
    }

    #[test]
    fn unknown_group_is_not_authorized() {
        let repo = GroupRepo::new(init_memory().unwrap());
        assert!(!repo.is_authorized(-5).unwrap());
        assert!(repo.set_authorized(-5, true).is_err());
    }
}
