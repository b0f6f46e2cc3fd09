//! Automation repository: trigger → canned response rules

use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{DbPool, conn, format_ts, parse_ts};
use crate::{Error, Result};
use crate::audience::Scope;
use crate::channels::Button;

/// How a rule's trigger is compared with incoming text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// Whole input equals the trigger
    #[default]
    Exact,
    /// Trigger appears anywhere in the input
    Keyword,
    /// Trigger is a case-insensitive regular expression
    Regex,
}

impl MatchType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Keyword => "keyword",
            Self::Regex => "regex",
        }
    }

    /// Parse a stored value; unknown values fall back to exact matching
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "keyword" => Self::Keyword,
            "regex" => Self::Regex,
            _ => Self::Exact,
        }
    }
}

/// A configured automation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationRule {
    pub id: String,
    pub trigger: String,
    pub response: String,
    pub image: Option<String>,
    pub buttons: Vec<Button>,
    pub scope: Scope,
    /// Per-user cooldown in seconds; zero disables it
    pub cooldown_secs: u64,
    pub match_type: MatchType,
    /// When set, `/trigger` does not also match `trigger`
    pub strict_slash: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl AutomationRule {
    /// Create an active, global, exact-match rule
    #[must_use]
    pub fn new(trigger: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            trigger: trigger.into(),
            response: response.into(),
            image: None,
            buttons: Vec::new(),
            scope: Scope::Global,
            cooldown_secs: 0,
            match_type: MatchType::Exact,
            strict_slash: false,
            active: true,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub const fn with_match_type(mut self, match_type: MatchType) -> Self {
        self.match_type = match_type;
        self
    }

    #[must_use]
    pub const fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    #[must_use]
    pub const fn with_cooldown(mut self, secs: u64) -> Self {
        self.cooldown_secs = secs;
        self
    }
}

/// Automation repository
#[derive(Debug, Clone)]
pub struct AutomationRepo {
    pool: DbPool,
}

impl AutomationRepo {
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Store a rule
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn insert(&self, rule: &AutomationRule) -> Result<()> {
        let conn = conn(&self.pool)?;
        conn.execute(
            "INSERT INTO automations
                (id, trigger, response, image, buttons, scope, cooldown_secs, match_type,
                 strict_slash, active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                rule.id,
                rule.trigger,
                rule.response,
                rule.image,
                serde_json::to_string(&rule.buttons)?,
                rule.scope.as_str(),
                i64::try_from(rule.cooldown_secs).unwrap_or(i64::MAX),
                rule.match_type.as_str(),
                rule.strict_slash,
                rule.active,
                format_ts(rule.created_at),
            ],
        )?;
        tracing::debug!(id = %rule.id, trigger = %rule.trigger, "automation created");
        Ok(())
    }

    /// Active rules in creation order
    ///
    /// Creation order is what makes "first match wins" deterministic.
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn list_active(&self) -> Result<Vec<AutomationRule>> {
        let conn = conn(&self.pool)?;
        let mut stmt = conn.prepare(
            "SELECT id, trigger, response, image, buttons, scope, cooldown_secs, match_type,
                    strict_slash, active, created_at
             FROM automations WHERE active = 1 ORDER BY created_at, id",
        )?;

        let rules = stmt
            .query_map([], |row| {
                let buttons: String = row.get(4)?;
                let cooldown: i64 = row.get(6)?;
                Ok(AutomationRule {
                    id: row.get(0)?,
                    trigger: row.get(1)?,
                    response: row.get(2)?,
                    image: row.get(3)?,
                    buttons: parse_buttons(&buttons),
                    scope: Scope::parse(&row.get::<_, String>(5)?),
                    cooldown_secs: u64::try_from(cooldown).unwrap_or(0),
                    match_type: MatchType::parse(&row.get::<_, String>(7)?),
                    strict_slash: row.get(8)?,
                    active: row.get(9)?,
                    created_at: parse_ts(&row.get::<_, String>(10)?),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rules)
    }

    /// Enable or disable a rule
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id, or error if database operation fails
    pub fn set_active(&self, id: &str, active: bool) -> Result<()> {
        let conn = conn(&self.pool)?;
        let updated = conn.execute(
            "UPDATE automations SET active = ?2 WHERE id = ?1",
            params![id, active],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("automation {id}")));
        }
        Ok(())
    }
}

/// Decode stored buttons, dropping the column if it is malformed
pub(crate) fn parse_buttons(raw: &str) -> Vec<Button> {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "ignoring malformed buttons column");
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::db::init_memory;

    #[test]
    fn list_active_in_creation_order() {
        let repo = AutomationRepo::new(init_memory().unwrap());
        let now = Utc::now();

        let mut second = AutomationRule::new("price", "Second");
        second.created_at = now + Duration::seconds(1);
        let mut first = AutomationRule::new("price", "First")
            .with_match_type(MatchType::Keyword)
            .with_scope(Scope::Private)
            .with_cooldown(30);
        first.created_at = now;
        first.buttons = vec![Button::url("Shop", "https://example.com")];

        repo.insert(&second).unwrap();
        repo.insert(&first).unwrap();

        let rules = repo.list_active().unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].response, "First");
        assert_eq!(rules[0].match_type, MatchType::Keyword);
        assert_eq!(rules[0].scope, Scope::Private);
        assert_eq!(rules[0].cooldown_secs, 30);
        assert_eq!(rules[0].buttons.len(), 1);
        assert_eq!(rules[1].response, "Second");
    }

    #[test]
    fn inactive_rules_are_hidden() {
        let repo = AutomationRepo::new(init_memory().unwrap());
        let rule = AutomationRule::new("hi", "hello");
        repo.insert(&rule).unwrap();
        repo.set_active(&rule.id, false).unwrap();
        assert!(repo.list_active().unwrap().is_empty());
    }

    #[test]
    fn malformed_buttons_decode_empty() {
        assert!(parse_buttons("not json").is_empty());
    }
}
