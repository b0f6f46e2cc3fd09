//! Telegram Bot API request/response types

use serde::{Deserialize, Serialize};

use crate::channels::{Button, ButtonKind};

/// Telegram Bot API base URL
pub(crate) const API_BASE: &str = "https://api.telegram.org/bot";

/// Inline keyboard markup for message buttons
#[derive(Debug, Clone, Serialize)]
pub(crate) struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

impl InlineKeyboardMarkup {
    /// One button per row, in order; `None` when there are no buttons
    pub fn from_buttons(buttons: &[Button]) -> Option<Self> {
        if buttons.is_empty() {
            return None;
        }

        let inline_keyboard = buttons
            .iter()
            .map(|b| {
                let (url, callback_data) = match b.kind {
                    ButtonKind::Url => (Some(b.value.clone()), None),
                    ButtonKind::Callback => (None, Some(b.value.clone())),
                };
                vec![InlineKeyboardButton {
                    text: b.label.clone(),
                    callback_data,
                    url,
                }]
            })
            .collect();

        Some(Self { inline_keyboard })
    }
}

/// A button in an inline keyboard row
#[derive(Debug, Clone, Serialize)]
pub(crate) struct InlineKeyboardButton {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Telegram sendMessage request
#[derive(Serialize)]
pub(crate) struct SendMessageRequest<'a> {
    pub chat_id: i64,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_message_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

/// Telegram sendPhoto request (by URL or file id)
#[derive(Serialize)]
pub(crate) struct SendPhotoRequest<'a> {
    pub chat_id: i64,
    pub photo: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_message_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

/// Telegram answerCallbackQuery request
#[derive(Serialize)]
pub(crate) struct AnswerCallbackQueryRequest<'a> {
    pub callback_query_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<&'a str>,
    pub show_alert: bool,
}

/// Telegram setWebhook request
#[derive(Serialize)]
pub(crate) struct SetWebhookRequest<'a> {
    pub url: &'a str,
    pub allowed_updates: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_token: Option<&'a str>,
}

/// Telegram photo size in a sent message
#[derive(Debug, Deserialize)]
pub(crate) struct PhotoSize {
    pub file_id: String,
}

/// Message returned by send* methods
#[derive(Debug, Deserialize)]
pub(crate) struct SentMessage {
    pub message_id: i64,
    #[serde(default)]
    pub photo: Option<Vec<PhotoSize>>,
}

/// Telegram API response wrapper
#[derive(Debug, Deserialize)]
pub(crate) struct TelegramResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyboard_one_button_per_row() {
        let markup = InlineKeyboardMarkup::from_buttons(&[
            Button::url("Site", "https://example.com"),
            Button::callback("Help", "/help"),
        ])
        .unwrap();

        let json = serde_json::to_value(&markup).unwrap();
        assert_eq!(json["inline_keyboard"][0][0]["url"], "https://example.com");
        assert!(json["inline_keyboard"][0][0].get("callback_data").is_none());
        assert_eq!(json["inline_keyboard"][1][0]["callback_data"], "/help");
    }

    #[test]
    fn no_buttons_no_markup() {
        assert!(InlineKeyboardMarkup::from_buttons(&[]).is_none());
    }

    #[test]
    fn sent_photo_message_parses() {
        let body = r#"{"ok":true,"result":{"message_id":7,"photo":[{"file_id":"small"},{"file_id":"large"}]}}"#;
        let parsed: TelegramResponse<SentMessage> = serde_json::from_str(body).unwrap();
        let sent = parsed.result.unwrap();
        assert_eq!(sent.message_id, 7);
        assert_eq!(sent.photo.unwrap().last().unwrap().file_id, "large");
    }
}
