//! AI reply for messages no automation handled

use super::{ProviderRegistry, prompt};
use crate::db::{AutomationRule, BotSettings, ChatMessage};

/// Inputs for one AI reply
#[derive(Debug, Clone, Copy)]
pub struct AiContext<'a> {
    pub settings: &'a BotSettings,
    /// Recent turns, oldest first
    pub history: &'a [ChatMessage],
    pub automations: &'a [AutomationRule],
}

/// Asks providers in registry order and never fails
#[derive(Debug, Clone)]
pub struct AiFallback {
    registry: ProviderRegistry,
}

impl AiFallback {
    #[must_use]
    pub const fn new(registry: ProviderRegistry) -> Self {
        Self { registry }
    }

    /// Reply to `prompt`, or `None` for silence
    ///
    /// An empty completion is silence. When every provider errors, the
    /// configured fallback reply is used if there is one.
    pub async fn ask(&self, prompt: &str, ctx: &AiContext<'_>) -> Option<String> {
        let system_prompt = prompt::system_prompt(ctx.settings, ctx.automations);

        for provider in self.registry.providers() {
            match provider
                .complete(&system_prompt, ctx.history, prompt)
                .await
            {
                Ok(reply) => {
                    let reply = reply.trim();
                    return (!reply.is_empty()).then(|| reply.to_string());
                }
                Err(e) => {
                    tracing::warn!(provider = provider.name(), error = %e, "AI completion failed");
                }
            }
        }

        ctx.settings
            .fallback_reply
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
    }
}
