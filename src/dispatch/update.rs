//! Inbound Telegram update envelope
//!
//! Only the fields the dispatcher reads are modelled; unknown fields are
//! ignored so new Bot API additions never break parsing.

use serde::Deserialize;

use crate::audience::ChatKind;

/// A webhook update
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
    pub my_chat_member: Option<ChatMemberUpdated>,
}

/// A chat message
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
}

impl Message {
    /// Non-blank message text
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    /// Sender ID, falling back to the chat for anonymous senders
    #[must_use]
    pub fn sender_id(&self) -> i64 {
        self.from.as_ref().map_or(self.chat.id, |u| u.id)
    }
}

/// Chat a message belongs to
#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: Option<String>,
}

impl Chat {
    #[must_use]
    pub fn kind(&self) -> ChatKind {
        ChatKind::from_telegram(&self.kind)
    }

    #[must_use]
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }
}

/// Telegram user
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    pub username: Option<String>,
}

impl User {
    /// `@username` if set, else the first name
    #[must_use]
    pub fn display_name(&self) -> String {
        self.username
            .as_deref()
            .filter(|u| !u.is_empty())
            .map_or_else(|| self.first_name.clone(), |u| format!("@{u}"))
    }
}

/// Inline button press
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    /// Message carrying the keyboard; absent for inline-mode messages
    pub message: Option<Message>,
    pub data: Option<String>,
}

/// Bot membership change in a chat
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMemberUpdated {
    pub chat: Chat,
}
