//! Short-lived cache for the bot settings document
//!
//! Every update needs the settings; reading them once per TTL keeps storage
//! off the hot path. Edits become visible within one TTL.

use std::sync::Arc;
use std::time::Duration;

use mini_moka::sync::Cache;

use crate::db::{BotSettings, SettingsRepo};

const SETTINGS_KEY: &str = "bot_config";

/// TTL cache in front of `SettingsRepo`
#[derive(Clone, Debug)]
pub struct SettingsCache {
    repo: SettingsRepo,
    cache: Cache<&'static str, Arc<BotSettings>>,
}

impl SettingsCache {
    /// Create a cache with the given TTL in seconds
    #[must_use]
    pub fn new(repo: SettingsRepo, ttl_secs: u64) -> Self {
        Self {
            repo,
            cache: Cache::builder()
                .max_capacity(1)
                .time_to_live(Duration::from_secs(ttl_secs))
                .build(),
        }
    }

    /// Current settings
    ///
    /// A storage failure yields defaults, which are not cached so the next
    /// update retries the read.
    #[must_use]
    pub fn get(&self) -> Arc<BotSettings> {
        if let Some(settings) = self.cache.get(&SETTINGS_KEY) {
            return settings;
        }

        match self.repo.bot() {
            Ok(settings) => {
                let settings = Arc::new(settings);
                self.cache.insert(SETTINGS_KEY, Arc::clone(&settings));
                settings
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load bot settings, using defaults");
                Arc::new(BotSettings::default())
            }
        }
    }

    /// Drop the cached copy so the next read hits storage
    pub fn invalidate(&self) {
        self.cache.invalidate(&SETTINGS_KEY);
    }
}
