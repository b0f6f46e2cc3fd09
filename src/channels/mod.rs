//! Outbound messaging transport
//!
//! The dispatcher and the broadcast executor only talk to chats through the
//! `Transport` trait. `TelegramChannel` is the production implementation.

mod telegram;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use telegram::{ALLOWED_UPDATES, TelegramChannel};

use crate::{Error, Result};

/// Inline button kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonKind {
    /// Opens `value` as a link
    #[default]
    Url,
    /// Sends `value` back as callback data
    Callback,
}

/// An inline keyboard button attached to a reply or broadcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    #[serde(rename = "type", default)]
    pub kind: ButtonKind,
    /// Link target or callback payload; broadcast buttons store it as `url`
    #[serde(alias = "url")]
    pub value: String,
}

impl Button {
    /// Create a link button
    #[must_use]
    pub fn url(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            kind: ButtonKind::Url,
            value: value.into(),
        }
    }

    /// Create a callback button
    #[must_use]
    pub fn callback(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            kind: ButtonKind::Callback,
            value: value.into(),
        }
    }
}

/// Photo to attach to an outgoing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoSource {
    /// Raw bytes uploaded with the request
    Upload {
        bytes: Vec<u8>,
        mime_type: String,
    },
    /// Remote URL or a file id returned by an earlier upload
    Reference(String),
}

/// Result of a successful send
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Platform message ID
    pub message_id: Option<i64>,
    /// Reusable file id of the largest photo size, when a photo was sent
    pub photo_file_id: Option<String>,
}

/// Trait for the outbound messaging transport
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a text message, optionally with buttons and as a reply
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        buttons: &[Button],
        reply_to: Option<i64>,
    ) -> Result<Delivery>;

    /// Send a photo with an optional caption
    async fn send_photo(
        &self,
        chat_id: i64,
        photo: &PhotoSource,
        caption: Option<&str>,
        buttons: &[Button],
        reply_to: Option<i64>,
    ) -> Result<Delivery>;

    /// Acknowledge a callback query, optionally with a short notice
    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()>;
}

/// Text, photo and buttons to deliver to a single chat
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingPayload {
    pub text: Option<String>,
    pub photo: Option<PhotoSource>,
    pub buttons: Vec<Button>,
}

impl OutgoingPayload {
    /// Create a text-only payload
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Whether there is anything to send
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.photo.is_none() && self.text.as_deref().is_none_or(|t| t.trim().is_empty())
    }

    /// Send this payload to one chat
    ///
    /// A photo carries the text as its caption.
    ///
    /// # Errors
    ///
    /// Returns error if the payload is empty or the transport rejects it
    pub async fn deliver(
        &self,
        transport: &dyn Transport,
        chat_id: i64,
        reply_to: Option<i64>,
    ) -> Result<Delivery> {
        let caption = self.text.as_deref().filter(|t| !t.trim().is_empty());

        if let Some(photo) = &self.photo {
            return transport
                .send_photo(chat_id, photo, caption, &self.buttons, reply_to)
                .await;
        }

        match caption {
            Some(text) => {
                transport
                    .send_text(chat_id, text, &self.buttons, reply_to)
                    .await
            }
            None => Err(Error::Validation("nothing to send".to_string())),
        }
    }
}
