//! Transport-neutral inbound message types.
//!
//! The Telegram adapter converts raw updates into [`InboundEvent`]; the core
//! only ever sees this shape.

use serde::{Deserialize, Serialize};

use std::fmt;

use crate::chat::ConversationKey;

/// Kind of chat an inbound message arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

impl ChatKind {
    pub fn is_private(&self) -> bool {
        matches!(self, ChatKind::Private)
    }

    /// Group or supergroup; the chats whose messages feed the history cache.
    pub fn is_group(&self) -> bool {
        matches!(self, ChatKind::Group | ChatKind::Supergroup)
    }
}

impl fmt::Display for ChatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatKind::Private => write!(f, "private"),
            ChatKind::Group => write!(f, "group"),
            ChatKind::Supergroup => write!(f, "supergroup"),
            ChatKind::Channel => write!(f, "channel"),
        }
    }
}

/// Where a reply should go: the chat and the message being answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyTarget {
    pub chat_id: i64,
    pub message_id: i64,
}

/// A single inbound chat message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub chat_id: i64,
    pub chat_kind: Option<ChatKind>,
    /// Group title; empty for private chats and untitled groups.
    pub chat_title: String,
    pub message_id: i64,
    /// Sender handle (username), empty when the sender has none.
    pub sender: String,
    pub text: String,
    /// File id of the largest attached photo size, if any.
    pub photo_file_id: Option<String>,
    /// Usernames mentioned through `mention` entities, without the `@`.
    pub mentions: Vec<String>,
    /// Sender handle of the message this one replies to.
    pub reply_to_sender: Option<String>,
    /// True when the event originated from a callback query.
    pub is_callback: bool,
}

impl InboundEvent {
    pub fn kind(&self) -> ChatKind {
        self.chat_kind.unwrap_or(ChatKind::Private)
    }

    pub fn is_reply(&self) -> bool {
        self.reply_to_sender.is_some()
    }

    /// Whether this message replies to a message authored by `bot_username`.
    pub fn is_reply_to(&self, bot_username: &str) -> bool {
        self.reply_to_sender.as_deref() == Some(bot_username)
    }

    /// Display key of the chat: the group key for groups, else the sender.
    pub fn conversation_key(&self) -> ConversationKey {
        if self.kind().is_group() {
            ConversationKey::for_group(&self.chat_title, self.chat_id)
        } else {
            ConversationKey::new(self.sender.clone())
        }
    }

    pub fn reply_target(&self) -> ReplyTarget {
        ReplyTarget {
            chat_id: self.chat_id,
            message_id: self.message_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group_event(title: &str) -> InboundEvent {
        InboundEvent {
            chat_id: -42,
            chat_kind: Some(ChatKind::Supergroup),
            chat_title: title.to_string(),
            sender: "bob".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_group_conversation_key() {
        assert_eq!(group_event("Alpha").conversation_key().as_str(), "Alpha");
        assert_eq!(group_event("").conversation_key().as_str(), "-42");
    }

    #[test]
    fn test_private_conversation_key_is_sender() {
        let event = InboundEvent {
            chat_kind: Some(ChatKind::Private),
            sender: "alice".to_string(),
            ..Default::default()
        };
        assert_eq!(event.conversation_key().as_str(), "alice");
    }

    #[test]
    fn test_is_reply_to() {
        let event = InboundEvent {
            reply_to_sender: Some("relay_bot".to_string()),
            ..Default::default()
        };
        assert!(event.is_reply());
        assert!(event.is_reply_to("relay_bot"));
        assert!(!event.is_reply_to("someone"));
    }

    #[test]
    fn test_chat_kind_groups() {
        assert!(ChatKind::Group.is_group());
        assert!(ChatKind::Supergroup.is_group());
        assert!(!ChatKind::Channel.is_group());
        assert!(ChatKind::Private.is_private());
    }
}
