//! AI fallback: persona prompt, completion providers and provider selection

mod fallback;
mod gemini;
mod openai;
pub mod prompt;
mod registry;

use async_trait::async_trait;

pub use fallback::{AiContext, AiFallback};
pub use gemini::GeminiProvider;
pub use openai::OpenAIProvider;
pub use registry::ProviderRegistry;

use crate::Result;
use crate::db::ChatMessage;

/// A chat completion backend
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Short provider name used in config and logs
    fn name(&self) -> &'static str;

    /// Complete `prompt` given a system prompt and prior turns, oldest first
    async fn complete(
        &self,
        system_prompt: &str,
        history: &[ChatMessage],
        prompt: &str,
    ) -> Result<String>;
}
