//! Bot settings document and message counters

use chrono::Utc;
use rusqlite::{OptionalExtension, params};
use serde::{Deserialize, Serialize};

use super::{DbPool, conn, format_ts};
use crate::Result;
use crate::audience::Scope;
use crate::channels::Button;

const BOT_CONFIG_KEY: &str = "bot_config";
const TOTAL_MESSAGES_KEY: &str = "total_messages";

/// Dashboard-edited bot persona and behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotSettings {
    pub bot_name: String,
    pub niche: String,
    pub tone: String,
    pub company_mission: String,
    pub target_audience: String,
    pub main_products: String,
    pub do_not_discuss: String,
    /// Free-form knowledge summary handed to the model
    pub ai_summary: String,
    /// Master switch for AI replies
    pub auto_attendance: bool,
    pub ai_scope: Scope,
    pub welcome_message: String,
    pub welcome_image: Option<String>,
    pub welcome_buttons: Vec<Button>,
    /// Sent when every AI provider fails
    pub fallback_reply: Option<String>,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            bot_name: String::new(),
            niche: String::new(),
            tone: String::new(),
            company_mission: String::new(),
            target_audience: String::new(),
            main_products: String::new(),
            do_not_discuss: String::new(),
            ai_summary: String::new(),
            auto_attendance: true,
            ai_scope: Scope::Global,
            welcome_message: String::new(),
            welcome_image: None,
            welcome_buttons: Vec::new(),
            fallback_reply: None,
        }
    }
}

/// Settings repository
#[derive(Debug, Clone)]
pub struct SettingsRepo {
    pool: DbPool,
}

impl SettingsRepo {
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Load the bot settings, or defaults when none were saved
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails or the document is corrupt
    pub fn bot(&self) -> Result<BotSettings> {
        let conn = conn(&self.pool)?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                [BOT_CONFIG_KEY],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(BotSettings::default()),
        }
    }

    /// Replace the bot settings document
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn save_bot(&self, settings: &BotSettings) -> Result<()> {
        let conn = conn(&self.pool)?;
        conn.execute(
            "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![
                BOT_CONFIG_KEY,
                serde_json::to_string(settings)?,
                format_ts(Utc::now())
            ],
        )?;
        Ok(())
    }

    /// Atomically bump the processed-message counter
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn increment_messages(&self) -> Result<()> {
        let conn = conn(&self.pool)?;
        conn.execute(
            "INSERT INTO counters (key, value) VALUES (?1, 1)
             ON CONFLICT(key) DO UPDATE SET value = value + 1",
            [TOTAL_MESSAGES_KEY],
        )?;
        Ok(())
    }

    /// Messages processed so far
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn total_messages(&self) -> Result<u64> {
        let conn = conn(&self.pool)?;
        let value: Option<i64> = conn
            .query_row(
                "SELECT value FROM counters WHERE key = ?1",
                [TOTAL_MESSAGES_KEY],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.and_then(|v| u64::try_from(v).ok()).unwrap_or(0))
    }
}
