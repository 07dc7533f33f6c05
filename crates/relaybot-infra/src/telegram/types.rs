//! Telegram Bot API types.
//!
//! Only the fields relaybot reads are modelled; serde ignores the rest. These
//! are converted into the transport-neutral [`InboundEvent`] before they reach
//! the core.

use serde::{Deserialize, Serialize};

use relaybot_types::event::{ChatKind, InboundEvent};

/// Envelope every Bot API method answers with.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    pub username: Option<String>,
}

impl User {
    /// Username, or the numeric id for users without one.
    pub fn handle(&self) -> String {
        self.username.clone().unwrap_or_else(|| self.id.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: Option<String>,
}

impl Chat {
    pub fn chat_kind(&self) -> Option<ChatKind> {
        match self.kind.as_str() {
            "private" => Some(ChatKind::Private),
            "group" => Some(ChatKind::Group),
            "supergroup" => Some(ChatKind::Supergroup),
            "channel" => Some(ChatKind::Channel),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessageEntity {
    #[serde(rename = "type")]
    pub kind: String,
    /// Offset in UTF-16 code units.
    pub offset: usize,
    /// Length in UTF-16 code units.
    pub length: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
    pub caption: Option<String>,
    #[serde(default)]
    pub entities: Vec<MessageEntity>,
    #[serde(default)]
    pub caption_entities: Vec<MessageEntity>,
    /// Available sizes of an attached photo, smallest first.
    #[serde(default)]
    pub photo: Vec<PhotoSize>,
    pub reply_to_message: Option<Box<Message>>,
}

impl Message {
    /// Text, or the caption for media messages.
    pub fn body(&self) -> (&str, &[MessageEntity]) {
        match (&self.text, &self.caption) {
            (Some(text), _) => (text.as_str(), self.entities.as_slice()),
            (None, Some(caption)) => (caption.as_str(), self.caption_entities.as_slice()),
            (None, None) => ("", &[][..]),
        }
    }

    /// Usernames from `mention` entities, without the leading `@`.
    pub fn mentions(&self) -> Vec<String> {
        let (text, entities) = self.body();
        entities
            .iter()
            .filter(|e| e.kind == "mention")
            .filter_map(|e| entity_text(text, e.offset, e.length))
            .map(|m| m.trim_start_matches('@').to_string())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<Message>,
    pub data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

impl Update {
    /// Convert into an [`InboundEvent`]; `None` for update kinds relaybot
    /// does not handle.
    pub fn into_event(self) -> Option<InboundEvent> {
        if let Some(message) = self.message {
            let sender = message.from.as_ref().map(User::handle).unwrap_or_default();
            return Some(event_from_message(message, sender, false));
        }
        let query = self.callback_query?;
        let message = query.message?;
        Some(event_from_message(message, query.from.handle(), true))
    }
}

fn event_from_message(message: Message, sender: String, is_callback: bool) -> InboundEvent {
    let mentions = message.mentions();
    let text = message.body().0.to_string();
    let reply_to_sender = message
        .reply_to_message
        .as_ref()
        .map(|m| m.from.as_ref().map(User::handle).unwrap_or_default());

    InboundEvent {
        chat_id: message.chat.id,
        chat_kind: message.chat.chat_kind(),
        chat_title: message.chat.title.clone().unwrap_or_default(),
        message_id: message.message_id,
        sender,
        text,
        photo_file_id: message.photo.last().map(|p| p.file_id.clone()),
        mentions,
        reply_to_sender,
        is_callback,
    }
}

/// Slice `text` by a UTF-16 offset and length.
fn entity_text(text: &str, offset: usize, length: usize) -> Option<String> {
    let units: Vec<u16> = text.encode_utf16().collect();
    let slice = units.get(offset..offset.checked_add(length)?)?;
    String::from_utf16(slice).ok()
}

#[derive(Debug, Clone, Deserialize)]
pub struct File {
    pub file_id: String,
    pub file_path: Option<String>,
}

// ---------------------------------------------------------------------------
// Request parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct GetUpdatesParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    pub timeout: u64,
    pub allowed_updates: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplyParameters {
    pub message_id: i64,
    pub allow_sending_without_reply: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendMessageParams<'a> {
    pub chat_id: i64,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<&'static str>,
    pub reply_parameters: ReplyParameters,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendChatActionParams {
    pub chat_id: i64,
    pub action: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct GetFileParams<'a> {
    pub file_id: &'a str,
}
