//! OpenAI chat completions provider

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::CompletionProvider;
use crate::db::{ChatMessage, ChatRole};
use crate::{Error, Result};

const API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI provider
pub struct OpenAIProvider {
    client: Client,
    api_key: SecretString,
    model: String,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider
    #[must_use]
    pub fn new(api_key: SecretString, model: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key,
            model,
        }
    }

    fn request<'a>(
        &'a self,
        system_prompt: &'a str,
        history: &'a [ChatMessage],
        prompt: &'a str,
    ) -> ChatCompletionRequest<'a> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message {
            role: "system",
            content: system_prompt,
        });
        messages.extend(
            history
                .iter()
                .filter(|m| !m.text.is_empty())
                .map(|m| Message {
                    role: match m.role {
                        ChatRole::User => "user",
                        ChatRole::Model => "assistant",
                    },
                    content: &m.text,
                }),
        );
        messages.push(Message {
            role: "user",
            content: prompt,
        });

        ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: 0.7,
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAIProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(
        &self,
        system_prompt: &str,
        history: &[ChatMessage],
        prompt: &str,
    ) -> Result<String> {
        let request = self.request(system_prompt, history, prompt);

        let response = self
            .client
            .post(API_URL)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Ai(format!("OpenAI request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Ai(format!("OpenAI API error: {status} - {body}")));
        }

        let result: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Ai(format!("Failed to parse OpenAI response: {e}")))?;

        result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::Ai("OpenAI returned no choices".to_string()))
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn turn(role: ChatRole, text: &str) -> ChatMessage {
        ChatMessage {
            role,
            text: text.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn request_frames_history_between_system_and_prompt() {
        let provider = OpenAIProvider::new(
            SecretString::from("sk-test".to_string()),
            "gpt-4o-mini".to_string(),
            std::time::Duration::from_secs(5),
        );
        let history = [turn(ChatRole::User, "hi"), turn(ChatRole::Model, "hello!")];
        let request = provider.request("be nice", &history, "price?");

        let json = serde_json::to_value(&request).unwrap();
        let roles: Vec<_> = json["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, ["system", "user", "assistant", "user"]);
        assert_eq!(json["messages"][3]["content"], "price?");
        assert_eq!(json["model"], "gpt-4o-mini");
    }

    #[test]
    fn parses_first_choice() {
        let response: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"10 USD"}}]}"#,
        )
        .unwrap();
        assert_eq!(
            response.choices[0].message.content.as_deref(),
            Some("10 USD")
        );
    }
}
