//! Provider registry with an explicit selection policy
//!
//! Providers are tried in priority order: the configured preference first,
//! then the remaining keyed providers in `PROVIDER_PRIORITY` order.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use super::{CompletionProvider, GeminiProvider, OpenAIProvider};
use crate::config::AiConfig;

/// Default priority among keyed providers
pub const PROVIDER_PRIORITY: &[&str] = &["openai", "gemini"];

/// Keyed providers in the order they should be tried
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn CompletionProvider>>,
}

impl ProviderRegistry {
    /// Build the registry from configured API keys
    #[must_use]
    pub fn from_config(config: &AiConfig) -> Self {
        let mut providers: Vec<Arc<dyn CompletionProvider>> = Vec::new();

        for name in PROVIDER_PRIORITY {
            match *name {
                "openai" => {
                    if let Some(key) = &config.openai_api_key {
                        providers.push(Arc::new(OpenAIProvider::new(
                            SecretString::from(key.expose_secret().to_owned()),
                            config.openai_model.clone(),
                            config.request_timeout,
                        )));
                    }
                }
                "gemini" => {
                    if let Some(key) = &config.gemini_api_key {
                        providers.push(Arc::new(GeminiProvider::new(
                            SecretString::from(key.expose_secret().to_owned()),
                            config.gemini_model.clone(),
                            config.request_timeout,
                        )));
                    }
                }
                _ => {}
            }
        }

        if providers.is_empty() {
            tracing::warn!("no AI provider keys configured, AI replies disabled");
        }

        Self::with_preference(providers, config.provider.as_deref())
    }

    /// Build from ready providers, moving `preferred` to the front
    #[must_use]
    pub fn with_preference(
        mut providers: Vec<Arc<dyn CompletionProvider>>,
        preferred: Option<&str>,
    ) -> Self {
        if let Some(preferred) = preferred {
            match providers.iter().position(|p| p.name() == preferred) {
                Some(index) => {
                    let provider = providers.remove(index);
                    providers.insert(0, provider);
                }
                None => {
                    tracing::warn!(provider = preferred, "preferred AI provider is not configured");
                }
            }
        }
        Self { providers }
    }

    /// Provider used first
    #[must_use]
    pub fn default_provider(&self) -> Option<&Arc<dyn CompletionProvider>> {
        self.providers.first()
    }

    /// All providers in try order
    #[must_use]
    pub fn providers(&self) -> &[Arc<dyn CompletionProvider>] {
        &self.providers
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field(
                "providers",
                &self.providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
