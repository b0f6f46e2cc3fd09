//! TOML configuration file loading
//!
//! Supports `~/.config/herald/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct HeraldConfigFile {
    /// Telegram bot credentials
    #[serde(default)]
    pub telegram: TelegramFileConfig,

    /// Server/runtime configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// AI provider configuration
    #[serde(default)]
    pub ai: AiFileConfig,

    /// Webhook dispatch tuning
    #[serde(default)]
    pub dispatch: DispatchFileConfig,

    /// Broadcast send pacing
    #[serde(default)]
    pub broadcast: BroadcastFileConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct TelegramFileConfig {
    pub bot_token: Option<String>,
    pub webhook_secret: Option<String>,
    /// Bot API request timeout in seconds
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// API server port
    pub port: Option<u16>,
    /// Bearer key for admin endpoints
    pub api_key: Option<String>,
    /// Bearer secret for the scheduler trigger
    pub cron_secret: Option<String>,
    /// SQLite database path
    pub db_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AiFileConfig {
    /// Preferred provider ("openai" or "gemini")
    pub provider: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_model: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: Option<String>,
    /// Completion request timeout in seconds
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DispatchFileConfig {
    pub settings_ttl_secs: Option<u64>,
    pub ai_cooldown_secs: Option<u64>,
    pub history_limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BroadcastFileConfig {
    pub throttle_threshold: Option<usize>,
    pub throttle_delay_ms: Option<u64>,
}

/// Load the TOML config file from the standard path
///
/// Returns `HeraldConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> HeraldConfigFile {
    config_file_path().map_or_else(HeraldConfigFile::default, |path| load_from(&path))
}

/// Load a config file from an explicit path, falling back to defaults
pub fn load_from(path: &Path) -> HeraldConfigFile {
    if !path.exists() {
        return HeraldConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                HeraldConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            HeraldConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/herald/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("herald").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[server]\nport = 9000\n\n[ai]\nprovider = \"gemini\"\n\n[dispatch]\nhistory_limit = 4\n",
        )
        .unwrap();

        let fc = load_from(&path);
        assert_eq!(fc.server.port, Some(9000));
        assert_eq!(fc.ai.provider.as_deref(), Some("gemini"));
        assert_eq!(fc.dispatch.history_limit, Some(4));
        assert!(fc.telegram.bot_token.is_none());
    }

    #[test]
    fn invalid_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "server = [").unwrap();
        assert!(load_from(&path).server.port.is_none());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let fc = load_from(Path::new("/nonexistent/herald/config.toml"));
        assert!(fc.ai.provider.is_none());
    }
}
