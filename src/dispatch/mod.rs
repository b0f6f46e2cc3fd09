//! Webhook dispatcher
//!
//! Routes one authenticated Telegram update to automations, the AI fallback
//! or group registration. Nothing here fails towards the caller: errors are
//! logged and the update is considered handled.

mod callback;
mod message;
pub mod update;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::ai::AiFallback;
use crate::automation::CooldownTracker;
use crate::broadcast::media::ImageSource;
use crate::cache::SettingsCache;
use crate::channels::{Button, OutgoingPayload, PhotoSource, Transport};
use crate::config::DispatchConfig;
use crate::db::{AutomationRule, Repositories};
use crate::Result;
use update::{Chat, Update};

/// Webhook dispatcher
pub struct Dispatcher {
    repos: Repositories,
    settings: SettingsCache,
    transport: Arc<dyn Transport>,
    ai: Option<AiFallback>,
    command_cooldowns: CooldownTracker,
    ai_cooldowns: CooldownTracker,
    config: DispatchConfig,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        repos: Repositories,
        transport: Arc<dyn Transport>,
        ai: Option<AiFallback>,
        config: DispatchConfig,
    ) -> Self {
        let settings = SettingsCache::new(repos.settings.clone(), config.settings_ttl_secs);
        Self {
            repos,
            settings,
            transport,
            ai,
            command_cooldowns: CooldownTracker::new(),
            ai_cooldowns: CooldownTracker::new(),
            config,
        }
    }

    /// Settings cache shared with the admin surface
    #[must_use]
    pub const fn settings(&self) -> &SettingsCache {
        &self.settings
    }

    /// Handle one update; every failure is logged and swallowed
    pub async fn dispatch(&self, update: Update) {
        let update_id = update.update_id;
        if let Err(e) = self.route(update).await {
            tracing::error!(update_id, error = %e, "failed to process update");
        }
    }

    async fn route(&self, update: Update) -> Result<()> {
        let now = Utc::now();

        // Message, membership and callback parts are independent
        if let Some(message) = &update.message {
            self.handle_message(message, now).await?;
        }

        if let Some(member) = &update.my_chat_member {
            if !member.chat.kind().is_private() {
                self.repos
                    .groups
                    .register(member.chat.id, member.chat.title(), now)?;
                tracing::info!(chat_id = member.chat.id, "bot membership changed, group registered");
            }
        }

        if let Some(callback) = &update.callback_query {
            self.handle_callback(callback, now).await?;
        }

        Ok(())
    }

    /// Whether a non-private chat may be served
    ///
    /// Unknown groups are registered as unauthorized.
    fn group_authorized(&self, chat: &Chat, now: DateTime<Utc>) -> Result<bool> {
        if chat.kind().is_private() {
            return Ok(true);
        }

        match self.repos.groups.get(chat.id)? {
            Some(group) if group.authorized => Ok(true),
            Some(_) => {
                tracing::debug!(chat_id = chat.id, "group not authorized");
                Ok(false)
            }
            None => {
                self.repos.groups.register(chat.id, chat.title(), now)?;
                tracing::info!(chat_id = chat.id, title = chat.title(), "new group registered, awaiting authorization");
                Ok(false)
            }
        }
    }

    /// Send `payload`, logging instead of failing
    async fn reply(&self, chat_id: i64, payload: &OutgoingPayload, reply_to: Option<i64>) -> bool {
        match payload
            .deliver(self.transport.as_ref(), chat_id, reply_to)
            .await
        {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(chat_id, error = %e, "failed to send reply");
                false
            }
        }
    }
}

/// Log a failed side effect that must not interrupt the update
fn best_effort(what: &str, result: Result<()>) {
    if let Err(e) = result {
        tracing::warn!(error = %e, "{what} failed");
    }
}

/// Payload for a stored image reference plus text and buttons
///
/// Inline data URLs are decoded and uploaded with the message.
fn build_payload(
    text: &str,
    image: Option<&str>,
    buttons: &[Button],
) -> OutgoingPayload {
    let text = text.trim();
    let photo = image
        .map(str::trim)
        .filter(|i| !i.is_empty())
        .and_then(|image| match ImageSource::parse(image) {
            ImageSource::Remote(url) => Some(PhotoSource::Reference(url)),
            ImageSource::Inline { mime_type, encoded } => {
                match ImageSource::decode(&encoded) {
                    Ok(bytes) => Some(PhotoSource::Upload { bytes, mime_type }),
                    Err(e) => {
                        tracing::warn!(error = %e, "dropping undecodable reply image");
                        None
                    }
                }
            }
        });

    OutgoingPayload {
        text: (!text.is_empty()).then(|| text.to_string()),
        photo,
        buttons: buttons.to_vec(),
    }
}

fn rule_payload(rule: &AutomationRule) -> OutgoingPayload {
    build_payload(&rule.response, rule.image.as_deref(), &rule.buttons)
}
