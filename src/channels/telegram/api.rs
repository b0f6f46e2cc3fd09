//! Raw Telegram Bot API calls

use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::types::{
    API_BASE, AnswerCallbackQueryRequest, InlineKeyboardMarkup, SendMessageRequest,
    SendPhotoRequest, SentMessage, SetWebhookRequest, TelegramResponse,
};
use crate::channels::{Button, Delivery};
use crate::{Error, Result};

/// Update kinds the dispatcher understands
pub const ALLOWED_UPDATES: &[&str] = &["message", "callback_query", "my_chat_member"];

impl From<SentMessage> for Delivery {
    fn from(sent: SentMessage) -> Self {
        Self {
            message_id: Some(sent.message_id),
            photo_file_id: sent
                .photo
                .and_then(|sizes| sizes.into_iter().last())
                .map(|size| size.file_id),
        }
    }
}

/// Whether a Bot API failure was caused by malformed HTML entities
fn is_parse_error(description: &str) -> bool {
    description.to_lowercase().contains("can't parse entities")
}

impl super::TelegramChannel {
    fn method_url(&self, method: &str) -> String {
        format!("{API_BASE}{}/{method}", self.token)
    }

    /// POST a JSON body and unwrap the `ok`/`result` envelope
    async fn call<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Channel(format!("Telegram {method} error: {e}")))?;

        Self::unwrap_response(method, response).await
    }

    async fn unwrap_response<T: DeserializeOwned>(
        method: &str,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Channel(format!("Telegram response read error: {e}")))?;

        let parsed: TelegramResponse<T> = serde_json::from_str(&body).map_err(|e| {
            Error::Channel(format!("Telegram {method} parse error ({status}): {e}"))
        })?;

        match parsed.result {
            Some(result) if parsed.ok => Ok(result),
            _ => Err(Error::Channel(format!(
                "Telegram {method} error: {status} - {}",
                parsed.description.unwrap_or_default()
            ))),
        }
    }

    /// Send a text message
    ///
    /// Uses HTML parse mode with a plain-text retry when the markup is rejected.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        buttons: &[Button],
        reply_to: Option<i64>,
    ) -> Result<Delivery> {
        let mut request = SendMessageRequest {
            chat_id,
            text,
            parse_mode: Some("HTML"),
            reply_to_message_id: reply_to,
            reply_markup: InlineKeyboardMarkup::from_buttons(buttons),
        };

        let sent: SentMessage = match self.call("sendMessage", &request).await {
            Ok(sent) => sent,
            Err(Error::Channel(msg)) if is_parse_error(&msg) => {
                tracing::debug!(chat_id, "HTML rejected, retrying as plain text");
                request.parse_mode = None;
                self.call("sendMessage", &request).await?
            }
            Err(e) => return Err(e),
        };

        tracing::debug!(chat_id, "Telegram message sent");
        Ok(sent.into())
    }

    /// Send a photo referenced by URL or previously returned file id
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails
    pub async fn send_photo_reference(
        &self,
        chat_id: i64,
        photo: &str,
        caption: Option<&str>,
        buttons: &[Button],
        reply_to: Option<i64>,
    ) -> Result<Delivery> {
        let request = SendPhotoRequest {
            chat_id,
            photo,
            caption,
            parse_mode: caption.map(|_| "HTML"),
            reply_to_message_id: reply_to,
            reply_markup: InlineKeyboardMarkup::from_buttons(buttons),
        };

        let sent: SentMessage = self.call("sendPhoto", &request).await?;
        Ok(sent.into())
    }

    /// Upload photo bytes with multipart/form-data
    ///
    /// The returned `Delivery` carries the file id Telegram assigned to the
    /// upload, which later sends can reuse.
    ///
    /// # Errors
    ///
    /// Returns error if the upload fails
    pub async fn upload_photo(
        &self,
        chat_id: i64,
        bytes: Vec<u8>,
        mime_type: &str,
        caption: Option<&str>,
        buttons: &[Button],
        reply_to: Option<i64>,
    ) -> Result<Delivery> {
        let part = Part::bytes(bytes)
            .file_name("image.jpg")
            .mime_str(mime_type)
            .map_err(|e| Error::Channel(format!("invalid photo mime type: {e}")))?;

        let mut form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part("photo", part);

        if let Some(caption) = caption {
            form = form
                .text("caption", caption.to_string())
                .text("parse_mode", "HTML");
        }
        if let Some(markup) = InlineKeyboardMarkup::from_buttons(buttons) {
            form = form.text("reply_markup", serde_json::to_string(&markup)?);
        }
        if let Some(reply_to) = reply_to {
            form = form.text("reply_to_message_id", reply_to.to_string());
        }

        let response = self
            .client
            .post(self.method_url("sendPhoto"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Channel(format!("Telegram sendPhoto upload error: {e}")))?;

        let sent: SentMessage = Self::unwrap_response("sendPhoto", response).await?;
        tracing::debug!(chat_id, "Telegram photo uploaded");
        Ok(sent.into())
    }

    /// Answer a callback query to dismiss the loading spinner on the button
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails
    pub async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: Option<&str>,
    ) -> Result<()> {
        let request = AnswerCallbackQueryRequest {
            callback_query_id,
            text,
            show_alert: false,
        };

        let _: bool = self.call("answerCallbackQuery", &request).await?;
        Ok(())
    }

    /// Set webhook URL for receiving updates
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails
    pub async fn set_webhook(&self, url: &str, secret_token: Option<&str>) -> Result<()> {
        let request = SetWebhookRequest {
            url,
            allowed_updates: ALLOWED_UPDATES,
            secret_token,
        };

        let _: bool = self.call("setWebhook", &request).await?;

        tracing::info!(url, "Telegram webhook set");
        Ok(())
    }
}
