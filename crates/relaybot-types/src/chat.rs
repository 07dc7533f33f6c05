//! Conversation, record, and turn types for relaybot.
//!
//! These types model the persisted dialogue history (`ChatRecord`), the
//! replay form handed to the generative backend (`Turn`), and the identity
//! that scopes one ongoing dialogue (`ConversationKey`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// String identity of one ongoing dialogue.
///
/// A private chat is keyed by the sender's handle; a group or supergroup by
/// its title, falling back to the numeric chat id when the title is empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationKey(String);

impl ConversationKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key for a group chat: its title, or its numeric id when untitled.
    pub fn for_group(title: &str, chat_id: i64) -> Self {
        if title.is_empty() {
            Self(chat_id.to_string())
        } else {
            Self(title.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ConversationKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Which side of the dialogue produced a turn.
///
/// Maps to the `is_user_turn` column of `chat_records`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Model,
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnRole::User => write!(f, "user"),
            TurnRole::Model => write!(f, "model"),
        }
    }
}

impl FromStr for TurnRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(TurnRole::User),
            "model" => Ok(TurnRole::Model),
            other => Err(format!("invalid turn role: '{other}'")),
        }
    }
}

/// One message of a dialogue in the form the backend replays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            text: text.into(),
        }
    }
}

/// Persisted unit of dialogue history.
///
/// Append-only from the session manager's perspective; removed in bulk by
/// the retention sweep. Ordered by `created_at`, ties broken by the
/// time-sortable `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub id: Uuid,
    pub conversation_key: ConversationKey,
    pub is_user_turn: bool,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl ChatRecord {
    /// Build a record stamped with the current time.
    pub fn new(conversation_key: ConversationKey, is_user_turn: bool, text: impl Into<String>) -> Self {
        Self::at(conversation_key, is_user_turn, text, Utc::now())
    }

    /// Build a record with an explicit timestamp.
    pub fn at(
        conversation_key: ConversationKey,
        is_user_turn: bool,
        text: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            conversation_key,
            is_user_turn,
            text: text.into(),
            created_at,
        }
    }

    pub fn role(&self) -> TurnRole {
        if self.is_user_turn {
            TurnRole::User
        } else {
            TurnRole::Model
        }
    }

    /// Convert into the replay form, dropping identity and timestamp.
    pub fn into_turn(self) -> Turn {
        Turn {
            role: self.role(),
            text: self.text,
        }
    }
}

/// An image attached to an inbound message, already downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    /// Declared MIME type, e.g. `image/jpeg`.
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl ImageAttachment {
    pub fn is_empty(&self) -> bool {
        self.data.is_empty() || self.mime_type.is_empty()
    }
}
