//! Audience scoping shared by automations, the AI fallback and broadcasts

use serde::{Deserialize, Serialize};

/// Audience filter applied to automations, AI replies and broadcasts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Private chats and authorized groups
    #[default]
    Global,
    /// Private chats only
    Private,
    /// Group and supergroup chats only
    Group,
}

impl Scope {
    /// Storage representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Private => "private",
            Self::Group => "group",
        }
    }

    /// Parse a stored scope; unknown or empty values widen to `Global`
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "private" => Self::Private,
            "group" => Self::Group,
            _ => Self::Global,
        }
    }

    /// Whether a chat of the given kind falls inside this scope
    #[must_use]
    pub const fn admits(self, kind: ChatKind) -> bool {
        match self {
            Self::Global => true,
            Self::Private => kind.is_private(),
            Self::Group => !kind.is_private(),
        }
    }
}

/// Telegram chat type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

impl ChatKind {
    /// Parse Telegram's `chat.type` field
    ///
    /// Unrecognized values are treated as groups so they go through the
    /// authorization gate instead of the lead flow.
    #[must_use]
    pub fn from_telegram(s: &str) -> Self {
        match s {
            "private" => Self::Private,
            "supergroup" => Self::Supergroup,
            "channel" => Self::Channel,
            _ => Self::Group,
        }
    }

    #[must_use]
    pub const fn is_private(self) -> bool {
        matches!(self, Self::Private)
    }
}
