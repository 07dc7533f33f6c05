//! Reply delivery with a single formatting fallback.

use relaybot_types::error::TransportError;
use relaybot_types::event::ReplyTarget;
use tracing::{debug, warn};

use super::transport::{ChatTransport, ParseMode};

/// Sends model replies through a [`ChatTransport`].
///
/// Each reply is tried once as Markdown. If the transport rejects it (most
/// often a markup parse error), it is resent once as plain text and that
/// outcome is final.
pub struct ResponseDispatcher<T: ChatTransport> {
    transport: T,
}

impl<T: ChatTransport> ResponseDispatcher<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Deliver `text` as a reply to `target`.
    pub async fn send(&self, target: ReplyTarget, text: &str) -> Result<(), TransportError> {
        let text = format_reply(text);
        match self.transport.reply(target, &text, ParseMode::Markdown).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(
                    chat_id = target.chat_id,
                    error = %e,
                    "Markdown reply rejected, resending as plain text"
                );
                self.transport.reply(target, &text, ParseMode::Plain).await?;
                debug!(chat_id = target.chat_id, "Plain-text reply delivered");
                Ok(())
            }
        }
    }
}

/// Adapt model output to Telegram's legacy Markdown.
///
/// `**bold**` becomes `*bold*` and `* ` list bullets at the start of a line
/// become `• ` so they are not read as unbalanced emphasis.
pub fn format_reply(text: &str) -> String {
    text.replace("**", "*")
        .lines()
        .map(|line| {
            let trimmed = line.trim_start();
            match trimmed.strip_prefix("* ") {
                Some(rest) => {
                    let indent = &line[..line.len() - trimmed.len()];
                    format!("{indent}• {rest}")
                }
                None => line.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingTransport;
    use std::sync::Arc;

    const TARGET: ReplyTarget = ReplyTarget {
        chat_id: 10,
        message_id: 3,
    };

    #[tokio::test]
    async fn markdown_success_sends_once() {
        let transport = Arc::new(RecordingTransport::new());
        let dispatcher = ResponseDispatcher::new(transport.clone());

        dispatcher.send(TARGET, "hello").await.unwrap();

        assert_eq!(transport.attempts(), 1);
        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].mode, ParseMode::Markdown);
        assert_eq!(sent[0].target, TARGET);
    }

    #[tokio::test]
    async fn markdown_failure_falls_back_to_plain_once() {
        let transport = Arc::new(RecordingTransport::new());
        transport.fail_markdown();
        let dispatcher = ResponseDispatcher::new(transport.clone());

        dispatcher.send(TARGET, "a *broken reply").await.unwrap();

        assert_eq!(transport.attempts(), 2);
        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].mode, ParseMode::Plain);
        assert_eq!(sent[0].text, "a *broken reply");
    }

    #[tokio::test]
    async fn second_failure_is_surfaced() {
        let transport = Arc::new(RecordingTransport::new());
        transport.fail_markdown();
        transport.fail_plain();
        let dispatcher = ResponseDispatcher::new(transport.clone());

        let err = dispatcher.send(TARGET, "hi").await.unwrap_err();

        assert!(matches!(err, TransportError::Api { code: 400, .. }));
        assert_eq!(transport.attempts(), 2);
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn format_reply_rewrites_bold_and_bullets() {
        let input = "**Title**\n* one\n  * nested\nplain * star";
        assert_eq!(format_reply(input), "*Title*\n• one\n  • nested\nplain * star");
    }

    #[test]
    fn format_reply_leaves_plain_text_alone() {
        assert_eq!(format_reply("just text"), "just text");
        assert_eq!(format_reply(""), "");
    }
}
