//! Telegram channel adapter
//!
//! Receives updates through the webhook endpoint and sends via the Bot API

mod api;
mod types;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

pub use api::ALLOWED_UPDATES;

use super::{Button, Delivery, PhotoSource, Transport};
use crate::Result;

/// Telegram channel adapter
#[derive(Clone)]
pub struct TelegramChannel {
    token: String,
    client: Client,
}

impl TelegramChannel {
    /// Create a new Telegram channel adapter
    ///
    /// Every Bot API call is bounded by `timeout`.
    #[must_use]
    pub fn new(token: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            token: token.trim().to_string(),
            client,
        }
    }
}

impl std::fmt::Debug for TelegramChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramChannel").finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for TelegramChannel {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        buttons: &[Button],
        reply_to: Option<i64>,
    ) -> Result<Delivery> {
        self.send_message(chat_id, text, buttons, reply_to).await
    }

    async fn send_photo(
        &self,
        chat_id: i64,
        photo: &PhotoSource,
        caption: Option<&str>,
        buttons: &[Button],
        reply_to: Option<i64>,
    ) -> Result<Delivery> {
        match photo {
            PhotoSource::Upload { bytes, mime_type } => {
                self.upload_photo(chat_id, bytes.clone(), mime_type, caption, buttons, reply_to)
                    .await
            }
            PhotoSource::Reference(reference) => {
                self.send_photo_reference(chat_id, reference, caption, buttons, reply_to)
                    .await
            }
        }
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        self.answer_callback_query(callback_id, text).await
    }
}
