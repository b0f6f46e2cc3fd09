//! Message routing: leads, welcome, automations, AI fallback

use chrono::{DateTime, Utc};

use super::update::Message;
use super::{Dispatcher, best_effort, build_payload, rule_payload};
use crate::ai::AiContext;
use crate::automation::{CooldownTracker, match_rule};
use crate::channels::OutgoingPayload;
use crate::db::{ChatRole, LeadUpsert};
use crate::Result;

/// Sent for `/start` when no welcome message is configured
const DEFAULT_WELCOME: &str = "Welcome! How can I help you today?";

impl Dispatcher {
    pub(super) async fn handle_message(&self, message: &Message, now: DateTime<Utc>) -> Result<()> {
        let chat_id = message.chat.id;
        let kind = message.chat.kind();

        if kind.is_private() {
            self.track_lead(message, now);
        } else if !self.group_authorized(&message.chat, now)? {
            return Ok(());
        }

        let Some(text) = message.text() else {
            return Ok(());
        };

        best_effort("message counter", self.repos.settings.increment_messages());
        best_effort(
            "history append",
            self.repos.history.append(chat_id, ChatRole::User, text, now),
        );

        let settings = self.settings.get();

        if kind.is_private() && text.trim().eq_ignore_ascii_case("/start") {
            let mut welcome = build_payload(
                &settings.welcome_message,
                settings.welcome_image.as_deref(),
                &settings.welcome_buttons,
            );
            if welcome.text.is_none() && welcome.photo.is_none() {
                welcome = OutgoingPayload {
                    text: Some(DEFAULT_WELCOME.to_string()),
                    ..welcome
                };
            }
            self.reply(chat_id, &welcome, None).await;
            return Ok(());
        }

        let rules = self.repos.automations.list_active()?;
        let reply_to = (!kind.is_private()).then_some(message.message_id);
        let user_id = message.sender_id();

        if let Some(rule) = match_rule(text, &rules).filter(|r| r.scope.admits(kind)) {
            if rule.cooldown_secs > 0 {
                let key = CooldownTracker::key(user_id, &rule.trigger);
                if !self
                    .command_cooldowns
                    .try_acquire(&key, rule.cooldown_secs, now)
                {
                    tracing::debug!(chat_id, user_id, trigger = %rule.trigger, "automation on cooldown");
                    return Ok(());
                }
            }

            tracing::debug!(chat_id, rule = %rule.id, "automation matched");
            self.reply(chat_id, &rule_payload(rule), reply_to).await;
            return Ok(());
        }

        if text.starts_with('/') {
            return Ok(());
        }

        let Some(ai) = &self.ai else {
            return Ok(());
        };

        if !settings.ai_scope.admits(kind) {
            tracing::debug!(chat_id, "AI reply outside configured scope");
            return Ok(());
        }

        let key = user_id.to_string();
        if !self
            .ai_cooldowns
            .try_acquire(&key, self.config.ai_cooldown_secs, now)
        {
            tracing::debug!(chat_id, user_id, "AI reply on cooldown");
            return Ok(());
        }

        let history = self
            .repos
            .history
            .recent(chat_id, self.config.history_limit)
            .unwrap_or_else(|e| {
                tracing::warn!(chat_id, error = %e, "failed to load chat history");
                Vec::new()
            });

        let ctx = AiContext {
            settings: &settings,
            history: &history,
            automations: &rules,
        };

        let Some(answer) = ai.ask(text, &ctx).await else {
            return Ok(());
        };

        if self
            .reply(chat_id, &OutgoingPayload::text(answer.as_str()), reply_to)
            .await
        {
            let now = Utc::now();
            best_effort(
                "history append",
                self.repos.history.append(chat_id, ChatRole::User, text, now),
            );
            best_effort(
                "history append",
                self.repos.history.append(chat_id, ChatRole::Model, &answer, now),
            );
        }

        Ok(())
    }

    /// Upsert the lead and announce first contact
    fn track_lead(&self, message: &Message, now: DateTime<Utc>) {
        let from = message.from.as_ref();
        let lead = LeadUpsert {
            chat_id: message.chat.id,
            first_name: from.map(|u| u.first_name.as_str()),
            username: from.and_then(|u| u.username.as_deref()),
        };

        match self.repos.leads.upsert(&lead, now) {
            Ok(true) if message.text().is_some() => {
                let who = from.map_or_else(|| message.chat.id.to_string(), |u| u.display_name());
                best_effort(
                    "lead notification",
                    self.repos.notifications.push(
                        "lead",
                        "New lead",
                        &format!("{who} started a conversation with the bot."),
                        now,
                    ),
                );
                tracing::info!(chat_id = message.chat.id, "new lead");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(chat_id = message.chat.id, error = %e, "lead upsert failed"),
        }
    }
}
