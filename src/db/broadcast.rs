//! Scheduled broadcast repository

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::automation::parse_buttons;
use super::{DbPool, conn, format_ts, parse_ts};
use crate::Result;
use crate::audience::Scope;
use crate::channels::Button;

/// Broadcast lifecycle status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
    /// Media upload failed; needs an operator
    Error,
}

impl TaskStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "completed" => Self::Completed,
            "error" => Self::Error,
            _ => Self::Pending,
        }
    }
}

/// How often a broadcast repeats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Once,
    Daily,
    Weekly,
    /// Every `custom_interval_minutes`
    Custom,
}

impl Frequency {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Once => "once",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Custom => "custom",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "daily" => Self::Daily,
            "weekly" => Self::Weekly,
            "custom" => Self::Custom,
            _ => Self::Once,
        }
    }
}

/// A stored broadcast campaign
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BroadcastTask {
    pub id: String,
    pub message: String,
    /// Data URL or remote URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub buttons: Vec<Button>,
    pub scope: Scope,
    pub status: TaskStatus,
    pub frequency: Frequency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_interval_minutes: Option<i64>,
    pub scheduled_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
    pub last_executed_at: Option<DateTime<Utc>>,
    pub targets_reached: u64,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Broadcast as submitted by an operator
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewBroadcast {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub buttons: Vec<Button>,
    #[serde(default)]
    pub scope: Option<Scope>,
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default)]
    pub custom_interval_minutes: Option<i64>,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
}

const COLUMNS: &str = "id, message, image, buttons, scope, status, frequency, custom_interval_minutes,
     scheduled_at, executed_at, last_executed_at, targets_reached, last_error, created_at";

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<BroadcastTask> {
    let reached: i64 = row.get(11)?;
    Ok(BroadcastTask {
        id: row.get(0)?,
        message: row.get(1)?,
        image: row.get(2)?,
        buttons: parse_buttons(&row.get::<_, String>(3)?),
        scope: Scope::parse(&row.get::<_, String>(4)?),
        status: TaskStatus::parse(&row.get::<_, String>(5)?),
        frequency: Frequency::parse(&row.get::<_, String>(6)?),
        custom_interval_minutes: row.get(7)?,
        scheduled_at: parse_ts(&row.get::<_, String>(8)?),
        executed_at: row.get::<_, Option<String>>(9)?.map(|s| parse_ts(&s)),
        last_executed_at: row.get::<_, Option<String>>(10)?.map(|s| parse_ts(&s)),
        targets_reached: u64::try_from(reached).unwrap_or(0),
        last_error: row.get(12)?,
        created_at: parse_ts(&row.get::<_, String>(13)?),
    })
}

fn reached(count: u64) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

/// Broadcast repository
#[derive(Debug, Clone)]
pub struct BroadcastRepo {
    pool: DbPool,
}

impl BroadcastRepo {
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Store a new pending broadcast
    ///
    /// A missing `scheduled_at` means "as soon as possible".
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn create(&self, new: &NewBroadcast, now: DateTime<Utc>) -> Result<BroadcastTask> {
        let task = BroadcastTask {
            id: Uuid::new_v4().to_string(),
            message: new.message.clone(),
            image: new.image.clone(),
            buttons: new.buttons.clone(),
            scope: new.scope.unwrap_or_default(),
            status: TaskStatus::Pending,
            frequency: new.frequency,
            custom_interval_minutes: new.custom_interval_minutes,
            scheduled_at: new.scheduled_at.unwrap_or(now),
            executed_at: None,
            last_executed_at: None,
            targets_reached: 0,
            last_error: None,
            created_at: now,
        };

        let conn = conn(&self.pool)?;
        conn.execute(
            "INSERT INTO scheduled_tasks
                (id, message, image, buttons, scope, status, frequency, custom_interval_minutes,
                 scheduled_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                task.id,
                task.message,
                task.image,
                serde_json::to_string(&task.buttons)?,
                task.scope.as_str(),
                task.status.as_str(),
                task.frequency.as_str(),
                task.custom_interval_minutes,
                format_ts(task.scheduled_at),
                format_ts(task.created_at),
            ],
        )?;

        tracing::info!(task_id = %task.id, frequency = task.frequency.as_str(), "broadcast scheduled");
        Ok(task)
    }

    /// Find a task by ID
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn get(&self, id: &str) -> Result<Option<BroadcastTask>> {
        let conn = conn(&self.pool)?;
        let task = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM scheduled_tasks WHERE id = ?1"),
                [id],
                task_from_row,
            )
            .optional()?;
        Ok(task)
    }

    /// All tasks, newest first
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn list(&self, limit: usize) -> Result<Vec<BroadcastTask>> {
        let conn = conn(&self.pool)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM scheduled_tasks ORDER BY created_at DESC, id LIMIT ?1"
        ))?;
        let tasks = stmt
            .query_map([i64::try_from(limit).unwrap_or(i64::MAX)], task_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    /// Pending tasks whose `scheduled_at` is not after `now`, oldest first
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn due(&self, now: DateTime<Utc>) -> Result<Vec<BroadcastTask>> {
        let conn = conn(&self.pool)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM scheduled_tasks
             WHERE status = 'pending' AND scheduled_at <= ?1
             ORDER BY scheduled_at, id"
        ))?;
        let tasks = stmt
            .query_map([format_ts(now)], task_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    /// Close a one-shot task
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn complete(
        &self,
        id: &str,
        now: DateTime<Utc>,
        targets_reached: u64,
        note: Option<&str>,
    ) -> Result<()> {
        let conn = conn(&self.pool)?;
        conn.execute(
            "UPDATE scheduled_tasks
             SET status = 'completed', executed_at = ?2, targets_reached = ?3, last_error = ?4
             WHERE id = ?1",
            params![id, format_ts(now), reached(targets_reached), note],
        )?;
        Ok(())
    }

    /// Move a recurring task to its next slot; it stays pending
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn reschedule(
        &self,
        id: &str,
        next: DateTime<Utc>,
        now: DateTime<Utc>,
        targets_reached: u64,
        note: Option<&str>,
    ) -> Result<()> {
        let conn = conn(&self.pool)?;
        conn.execute(
            "UPDATE scheduled_tasks
             SET scheduled_at = ?2, last_executed_at = ?3, targets_reached = ?4, last_error = ?5
             WHERE id = ?1",
            params![
                id,
                format_ts(next),
                format_ts(now),
                reached(targets_reached),
                note
            ],
        )?;
        Ok(())
    }

    /// Note an empty audience on a recurring task
    ///
    /// Only `targets_reached` and the note change; the task stays pending at
    /// its current slot and is picked up again on the next run.
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn record_no_targets(&self, id: &str, note: &str) -> Result<()> {
        let conn = conn(&self.pool)?;
        conn.execute(
            "UPDATE scheduled_tasks SET targets_reached = 0, last_error = ?2 WHERE id = ?1",
            params![id, note],
        )?;
        Ok(())
    }

    /// Park a task in `error` with a description for the operator
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn mark_error(&self, id: &str, message: &str) -> Result<()> {
        let conn = conn(&self.pool)?;
        conn.execute(
            "UPDATE scheduled_tasks SET status = 'error', last_error = ?2 WHERE id = ?1",
            params![id, message],
        )?;
        Ok(())
    }
}
