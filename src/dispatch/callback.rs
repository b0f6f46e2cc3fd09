//! Inline button presses

use chrono::{DateTime, Utc};

use super::update::CallbackQuery;
use super::{Dispatcher, rule_payload};
use crate::automation::{CooldownTracker, match_rule};
use crate::Result;

impl Dispatcher {
    /// Run the automation behind a button and always acknowledge the press
    pub(super) async fn handle_callback(
        &self,
        callback: &CallbackQuery,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let notice = match self.run_callback(callback, now).await {
            Ok(notice) => notice,
            Err(e) => {
                tracing::warn!(callback_id = %callback.id, error = %e, "callback handling failed");
                None
            }
        };

        if let Err(e) = self
            .transport
            .answer_callback(&callback.id, notice.as_deref())
            .await
        {
            tracing::warn!(callback_id = %callback.id, error = %e, "failed to answer callback");
        }
        Ok(())
    }

    /// Returns the notice to show on the button, if any
    async fn run_callback(
        &self,
        callback: &CallbackQuery,
        now: DateTime<Utc>,
    ) -> Result<Option<String>> {
        let Some(message) = &callback.message else {
            return Ok(None);
        };
        let Some(data) = callback.data.as_deref().filter(|d| !d.trim().is_empty()) else {
            return Ok(None);
        };

        if !self.group_authorized(&message.chat, now)? {
            return Ok(None);
        }

        let rules = self.repos.automations.list_active()?;
        let kind = message.chat.kind();
        let Some(rule) = match_rule(data, &rules).filter(|r| r.scope.admits(kind)) else {
            return Ok(None);
        };

        if rule.cooldown_secs > 0 {
            let key = CooldownTracker::key(callback.from.id, &rule.trigger);
            if !self
                .command_cooldowns
                .try_acquire(&key, rule.cooldown_secs, now)
            {
                let wait = self
                    .command_cooldowns
                    .remaining_secs(&key, rule.cooldown_secs, now)
                    .unwrap_or(rule.cooldown_secs);
                tracing::debug!(user_id = callback.from.id, trigger = %rule.trigger, "callback on cooldown");
                return Ok(Some(format!("Please wait {wait}s...")));
            }
        }

        self.reply(message.chat.id, &rule_payload(rule), None).await;
        Ok(None)
    }
}
