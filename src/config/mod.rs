//! Configuration management for the Herald gateway

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::broadcast::Throttle;
use crate::{Error, Result};
use file::HeraldConfigFile;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 18800;

/// Herald gateway configuration
#[derive(Debug)]
pub struct Config {
    /// Telegram credentials
    pub telegram: TelegramConfig,

    /// HTTP API server configuration
    pub api_server: ApiServerConfig,

    /// SQLite database path
    pub db_path: PathBuf,

    /// Webhook dispatch tuning
    pub dispatch: DispatchConfig,

    /// AI providers
    pub ai: AiConfig,

    /// Broadcast send pacing
    pub throttle: Throttle,
}

/// Default timeout for Bot API calls
pub const DEFAULT_TELEGRAM_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for AI completion calls
pub const DEFAULT_AI_TIMEOUT: Duration = Duration::from_secs(20);

/// Telegram bot credentials
#[derive(Debug)]
pub struct TelegramConfig {
    pub bot_token: Option<SecretString>,
    /// Expected `X-Telegram-Bot-Api-Secret-Token` header; `None` rejects every update
    pub webhook_secret: Option<SecretString>,
    /// Per-request timeout for Bot API calls
    pub request_timeout: Duration,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            webhook_secret: None,
            request_timeout: DEFAULT_TELEGRAM_TIMEOUT,
        }
    }
}

/// HTTP API server configuration
#[derive(Debug)]
pub struct ApiServerConfig {
    pub port: u16,
    /// Bearer key for admin endpoints; `None` runs them unauthenticated
    pub api_key: Option<SecretString>,
    /// Bearer secret for `/api/cron`; `None` rejects every call
    pub cron_secret: Option<SecretString>,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            api_key: None,
            cron_secret: None,
        }
    }
}

/// Webhook dispatch tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    /// How long settings stay cached
    pub settings_ttl_secs: u64,
    /// Per-user gap between AI replies
    pub ai_cooldown_secs: u64,
    /// History entries handed to the model
    pub history_limit: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            settings_ttl_secs: 30,
            ai_cooldown_secs: 10,
            history_limit: 10,
        }
    }
}

/// AI provider keys and models
#[derive(Debug)]
pub struct AiConfig {
    /// Preferred provider name; `None` applies the default priority
    pub provider: Option<String>,
    pub openai_api_key: Option<SecretString>,
    pub openai_model: String,
    pub gemini_api_key: Option<SecretString>,
    pub gemini_model: String,
    /// Per-request timeout for completion calls
    pub request_timeout: Duration,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: None,
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
            gemini_api_key: None,
            gemini_model: "gemini-2.5-flash".to_string(),
            request_timeout: DEFAULT_AI_TIMEOUT,
        }
    }
}

impl Config {
    /// Load configuration (env > toml > default)
    #[must_use]
    pub fn load() -> Self {
        let fc = file::load_config_file();
        Self::resolve(fc, |key| std::env::var(key).ok())
    }

    /// Merge a config file with an environment lookup
    pub fn resolve(fc: HeraldConfigFile, env: impl Fn(&str) -> Option<String>) -> Self {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        let secret = |value: Option<String>| value.map(SecretString::from);

        let telegram = TelegramConfig {
            bot_token: secret(env("TELEGRAM_BOT_TOKEN").or(fc.telegram.bot_token)),
            webhook_secret: secret(env("TELEGRAM_WEBHOOK_SECRET").or(fc.telegram.webhook_secret)),
            request_timeout: parse(env("HERALD_TELEGRAM_TIMEOUT_SECS"))
                .or(fc.telegram.timeout_secs)
                .filter(|secs| *secs > 0)
                .map_or(DEFAULT_TELEGRAM_TIMEOUT, Duration::from_secs),
        };

        let api_server = ApiServerConfig {
            port: parse(env("HERALD_PORT"))
                .or_else(|| parse(env("PORT")))
                .or(fc.server.port)
                .unwrap_or(DEFAULT_PORT),
            api_key: secret(env("HERALD_API_KEY").or(fc.server.api_key)),
            cron_secret: secret(env("CRON_SECRET").or(fc.server.cron_secret)),
        };

        let db_path = env("HERALD_DB_PATH")
            .or(fc.server.db_path)
            .map_or_else(default_db_path, PathBuf::from);

        let defaults = DispatchConfig::default();
        let dispatch = DispatchConfig {
            settings_ttl_secs: parse(env("HERALD_SETTINGS_TTL_SECS"))
                .or(fc.dispatch.settings_ttl_secs)
                .unwrap_or(defaults.settings_ttl_secs),
            ai_cooldown_secs: parse(env("HERALD_AI_COOLDOWN_SECS"))
                .or(fc.dispatch.ai_cooldown_secs)
                .unwrap_or(defaults.ai_cooldown_secs),
            history_limit: parse(env("HERALD_HISTORY_LIMIT"))
                .or(fc.dispatch.history_limit)
                .unwrap_or(defaults.history_limit),
        };

        let ai_defaults = AiConfig::default();
        let ai = AiConfig {
            provider: env("HERALD_AI_PROVIDER")
                .or(fc.ai.provider)
                .map(|p| p.trim().to_lowercase()),
            openai_api_key: secret(env("OPENAI_API_KEY").or(fc.ai.openai_api_key)),
            openai_model: env("HERALD_OPENAI_MODEL")
                .or(fc.ai.openai_model)
                .unwrap_or(ai_defaults.openai_model),
            gemini_api_key: secret(env("GEMINI_API_KEY").or(fc.ai.gemini_api_key)),
            gemini_model: env("HERALD_GEMINI_MODEL")
                .or(fc.ai.gemini_model)
                .unwrap_or(ai_defaults.gemini_model),
            request_timeout: parse(env("HERALD_AI_TIMEOUT_SECS"))
                .or(fc.ai.timeout_secs)
                .filter(|secs| *secs > 0)
                .map_or(DEFAULT_AI_TIMEOUT, Duration::from_secs),
        };

        let throttle_defaults = Throttle::default();
        let throttle = Throttle {
            threshold: parse(env("HERALD_THROTTLE_THRESHOLD"))
                .or(fc.broadcast.throttle_threshold)
                .unwrap_or(throttle_defaults.threshold),
            delay: parse(env("HERALD_THROTTLE_DELAY_MS"))
                .or(fc.broadcast.throttle_delay_ms)
                .map_or(throttle_defaults.delay, Duration::from_millis),
        };

        Self {
            telegram,
            api_server,
            db_path,
            dispatch,
            ai,
            throttle,
        }
    }

    /// Bot token, required by anything that talks to Telegram
    ///
    /// # Errors
    ///
    /// Returns error if `TELEGRAM_BOT_TOKEN` is not configured
    pub fn require_bot_token(&self) -> Result<&SecretString> {
        self.telegram
            .bot_token
            .as_ref()
            .ok_or_else(|| Error::Config("TELEGRAM_BOT_TOKEN is not set".to_string()))
    }
}

fn parse<T: std::str::FromStr>(value: Option<String>) -> Option<T> {
    value.and_then(|s| s.trim().parse().ok())
}

/// Default database location (`~/.local/share/herald/herald.db` on Linux)
fn default_db_path() -> PathBuf {
    let data_dir = directories::BaseDirs::new()
        .map_or_else(|| PathBuf::from("."), |d| d.data_dir().join("herald"));

    // Ensure data dir exists
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::warn!(path = %data_dir.display(), error = %e, "failed to create data directory");
    }

    data_dir.join("herald.db")
}
