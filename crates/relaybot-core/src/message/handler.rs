//! Inbound message handler.
//!
//! Binds the trigger policy, the group history cache, the session manager and
//! the dispatcher into the per-message flow run by the polling loop.

use std::sync::Arc;
use std::time::Duration;

use relaybot_types::chat::ImageAttachment;
use relaybot_types::config::BotConfig;
use relaybot_types::error::TransportError;
use relaybot_types::event::InboundEvent;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::dispatch::ResponseDispatcher;
use super::transport::{ChatTransport, ParseMode};
use super::trigger::{TriggerContext, TriggerEngine};
use crate::chat::repository::ChatRecordRepository;
use crate::chat::session::{ConversationSessionManager, ExchangeError};
use crate::llm::backend::ChatBackend;

/// How often the typing indicator is refreshed while a reply is pending.
pub const TYPING_INTERVAL: Duration = Duration::from_secs(4);

/// Sent in response to `/help`.
pub const HELP_TEXT: &str = "\
I answer when you:
- message me privately
- reply to one of my messages
- mention me at the start of a message
- start a message with /chat

In groups I read the recent conversation for context before I answer.
Photos are supported; send one with a caption.";

/// Sent when the backend could not produce a reply.
pub const ERROR_REPLY: &str = "Sorry, I could not get an answer from the model. Please try again later.";

/// Errors from [`ChatHandler::handle`].
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Exchange(#[from] ExchangeError),

    #[error("failed to deliver reply: {0}")]
    Delivery(#[from] TransportError),
}

/// Per-bot settings the handler needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct HandlerSettings {
    pub bot_username: String,
    pub command_prefix: String,
    pub trigger_probability: f64,
    pub persona: String,
}

impl HandlerSettings {
    pub fn from_config(config: &BotConfig, bot_username: impl Into<String>) -> Self {
        Self {
            bot_username: bot_username.into(),
            command_prefix: config.command_prefix.clone(),
            trigger_probability: config.trigger_probability,
            persona: config.persona.clone(),
        }
    }
}

/// Decides whether to answer an inbound message and answers it.
pub struct ChatHandler<B: ChatBackend, R: ChatRecordRepository, T: ChatTransport> {
    manager: Arc<ConversationSessionManager<B, R>>,
    trigger: TriggerEngine,
    dispatcher: ResponseDispatcher<Arc<T>>,
    settings: HandlerSettings,
}

impl<B, R, T> ChatHandler<B, R, T>
where
    B: ChatBackend,
    R: ChatRecordRepository,
    T: ChatTransport,
{
    pub fn new(
        manager: Arc<ConversationSessionManager<B, R>>,
        trigger: TriggerEngine,
        transport: Arc<T>,
        settings: HandlerSettings,
    ) -> Self {
        Self {
            manager,
            trigger,
            dispatcher: ResponseDispatcher::new(transport),
            settings,
        }
    }

    pub fn manager(&self) -> &Arc<ConversationSessionManager<B, R>> {
        &self.manager
    }

    pub fn settings(&self) -> &HandlerSettings {
        &self.settings
    }

    fn transport(&self) -> &T {
        self.dispatcher.transport()
    }

    /// Run the trigger policy for `event`. Untriggered group messages are
    /// buffered as a side effect.
    pub fn should_handle(&self, event: &InboundEvent) -> bool {
        let ctx = TriggerContext::from_event(
            event,
            &self.settings.bot_username,
            &self.settings.command_prefix,
            self.settings.trigger_probability,
        );
        self.trigger.decide(&ctx)
    }

    /// Produce and deliver a reply for a triggered `event`.
    pub async fn handle(&self, event: &InboundEvent) -> Result<(), HandlerError> {
        let key = event.conversation_key();
        let target = event.reply_target();
        let mut input = event
            .text
            .strip_prefix(self.settings.command_prefix.as_str())
            .unwrap_or(&event.text)
            .to_string();

        if input == "/help" {
            self.transport()
                .reply(target, HELP_TEXT, ParseMode::Plain)
                .await?;
            return Ok(());
        }

        if event.kind().is_group() {
            let (history, count) = self.trigger.cache().drain_and_format(key.as_str());
            if count > 0 {
                debug!(group = %key, count, "Attaching group history to prompt");
                input = group_prompt(&history, &input, &self.settings.persona);
            }
        }

        let typing = CancellationToken::new();
        let work = async {
            let image = self.fetch_photo(event).await;
            let result = self.manager.exchange(&key, &input, image.as_ref()).await;
            typing.cancel();
            result
        };
        let ((), result) = tokio::join!(self.keep_typing(event.chat_id, &typing), work);

        let reply = match result {
            Ok(reply) => reply,
            Err(e) => {
                error!(key = %key, error = %e, "Exchange failed");
                if let Err(send_err) = self.transport().reply(target, ERROR_REPLY, ParseMode::Plain).await {
                    warn!(key = %key, error = %send_err, "Failed to send error reply");
                }
                return Err(e.into());
            }
        };

        debug!(key = %key, chars = reply.len(), "Sending reply");
        self.dispatcher.send(target, &reply).await?;
        Ok(())
    }

    /// Download the event's photo, if any. Failures downgrade to text-only.
    async fn fetch_photo(&self, event: &InboundEvent) -> Option<ImageAttachment> {
        let file_id = event.photo_file_id.as_deref()?;
        match self.transport().download_attachment(file_id).await {
            Ok(image) if !image.is_empty() => {
                info!(mime_type = %image.mime_type, bytes = image.data.len(), "Downloaded photo");
                Some(image)
            }
            Ok(_) => {
                warn!(file_id, "Downloaded photo is empty, continuing without it");
                None
            }
            Err(e) => {
                warn!(file_id, error = %e, "Photo download failed, continuing without it");
                None
            }
        }
    }

    /// Refresh the typing indicator until `cancel` fires.
    async fn keep_typing(&self, chat_id: i64, cancel: &CancellationToken) {
        let mut ticker = tokio::time::interval(TYPING_INTERVAL);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.transport().send_typing(chat_id).await {
                        debug!(chat_id, error = %e, "Typing indicator failed");
                    }
                }
            }
        }
    }
}

/// Wrap a group message with the recent conversation and the persona line.
pub fn group_prompt(history: &str, message: &str, persona: &str) -> String {
    format!(
        "Conversation history (use as background if relevant): {history}\n\
         Someone in the group sent you a message: {message}\n\
         ({persona})"
    )
}
