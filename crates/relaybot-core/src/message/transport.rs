//! ChatTransport trait definition.
//!
//! The outbound half of the chat transport as seen by the core: replying,
//! showing the typing indicator, and fetching attachments. Receiving updates
//! is left to the adapter and the binary's polling loop.

use relaybot_types::chat::ImageAttachment;
use relaybot_types::error::TransportError;
use relaybot_types::event::ReplyTarget;

use std::fmt;

/// Formatting applied to an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Rich formatting (Telegram legacy Markdown).
    Markdown,
    /// No markup; text is delivered verbatim.
    Plain,
}

impl fmt::Display for ParseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseMode::Markdown => write!(f, "markdown"),
            ParseMode::Plain => write!(f, "plain"),
        }
    }
}

/// Trait for chat transports (Telegram, or a recorder in tests).
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait ChatTransport: Send + Sync {
    /// Reply to the message identified by `target`.
    fn reply(
        &self,
        target: ReplyTarget,
        text: &str,
        mode: ParseMode,
    ) -> impl std::future::Future<Output = Result<(), TransportError>> + Send;

    /// Show the "typing..." status in `chat_id`. Expires on its own after a
    /// few seconds, so callers repeat it while work is in progress.
    fn send_typing(
        &self,
        chat_id: i64,
    ) -> impl std::future::Future<Output = Result<(), TransportError>> + Send;

    /// Download an attachment and report its declared MIME type.
    fn download_attachment(
        &self,
        file_id: &str,
    ) -> impl std::future::Future<Output = Result<ImageAttachment, TransportError>> + Send;
}

impl<T: ChatTransport> ChatTransport for std::sync::Arc<T> {
    async fn reply(&self, target: ReplyTarget, text: &str, mode: ParseMode) -> Result<(), TransportError> {
        (**self).reply(target, text, mode).await
    }

    async fn send_typing(&self, chat_id: i64) -> Result<(), TransportError> {
        (**self).send_typing(chat_id).await
    }

    async fn download_attachment(&self, file_id: &str) -> Result<ImageAttachment, TransportError> {
        (**self).download_attachment(file_id).await
    }
}
