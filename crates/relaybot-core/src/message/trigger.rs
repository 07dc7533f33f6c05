//! Reply trigger policy.
//!
//! Decides, per inbound message, whether the bot should answer. Rules are
//! evaluated in precedence order and the first match wins:
//!
//! 1. Private chat: always answer, except that commands (text starting with
//!    `/`) and callback queries are answered only when they are not replies,
//!    and ordinary replies are answered only when they reply to the bot.
//! 2. Reply to one of the bot's own messages.
//! 3. Mention of the bot at the very start of the text.
//! 4. Text starting with the command prefix.
//! 5. A uniform random draw below the configured probability.
//!
//! When nothing matched in a group, the message is buffered in the
//! [`GroupHistoryCache`] so a later reply has context. That is the only side
//! effect; every other rule is pure.

use std::sync::Arc;

use relaybot_types::event::{ChatKind, InboundEvent};
use tracing::trace;

use super::group_cache::GroupHistoryCache;

/// Everything the policy looks at for one message.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerContext {
    pub chat_kind: ChatKind,
    pub text: String,
    /// Text starts with the configured command prefix.
    pub has_command_prefix: bool,
    /// Message replies to one of the bot's own messages.
    pub is_reply_to_bot: bool,
    /// Message replies to any message at all.
    pub is_reply: bool,
    /// Text starts with `@<bot> ` and carries a mention entity.
    pub mentions_bot: bool,
    pub is_callback: bool,
    /// Cache key of the chat (group title or id).
    pub group_key: String,
    pub sender: String,
    /// Trigger probability; clamped to [0, 1] before use.
    pub probability: f64,
}

impl TriggerContext {
    /// Build the context for `event` as seen by the bot `bot_username`.
    pub fn from_event(
        event: &InboundEvent,
        bot_username: &str,
        command_prefix: &str,
        probability: f64,
    ) -> Self {
        let mention = format!("@{bot_username} ");
        let mentions_bot = event.text.starts_with(&mention)
            && event
                .mentions
                .iter()
                .any(|m| m.eq_ignore_ascii_case(bot_username));

        Self {
            chat_kind: event.kind(),
            text: event.text.clone(),
            has_command_prefix: event.text.starts_with(command_prefix),
            is_reply_to_bot: event.is_reply_to(bot_username),
            is_reply: event.is_reply(),
            mentions_bot,
            is_callback: event.is_callback,
            group_key: event.conversation_key().to_string(),
            sender: event.sender.clone(),
            probability,
        }
    }
}

/// Clamp `p` into [0, 1]; NaN counts as 0.
pub fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) }
}

/// Applies the trigger policy and buffers untriggered group messages.
#[derive(Debug, Clone)]
pub struct TriggerEngine {
    cache: Arc<GroupHistoryCache>,
}

impl TriggerEngine {
    pub fn new(cache: Arc<GroupHistoryCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<GroupHistoryCache> {
        &self.cache
    }

    /// Decide with a fresh uniform draw in [0, 1).
    pub fn decide(&self, ctx: &TriggerContext) -> bool {
        self.decide_with_draw(ctx, rand::random::<f64>())
    }

    /// Decide using `draw` as the random value for the probability rule.
    pub fn decide_with_draw(&self, ctx: &TriggerContext, draw: f64) -> bool {
        if ctx.chat_kind.is_private() {
            if ctx.text.starts_with('/') || ctx.is_callback {
                return !ctx.is_reply;
            }
            return !ctx.is_reply || ctx.is_reply_to_bot;
        }
        if ctx.is_reply_to_bot || ctx.mentions_bot || ctx.has_command_prefix {
            return true;
        }
        if draw < clamp_probability(ctx.probability) {
            trace!(group = %ctx.group_key, draw, "Random trigger");
            return true;
        }

        if ctx.chat_kind.is_group() && !ctx.text.is_empty() {
            self.cache.record(&ctx.group_key, &ctx.sender, &ctx.text);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOT: &str = "relay_bot";

    fn engine() -> TriggerEngine {
        TriggerEngine::new(Arc::new(GroupHistoryCache::new(15)))
    }

    fn group_event(text: &str) -> InboundEvent {
        InboundEvent {
            chat_id: -1001,
            chat_kind: Some(ChatKind::Supergroup),
            chat_title: "Alpha".to_string(),
            message_id: 7,
            sender: "bob".to_string(),
            text: text.to_string(),
            ..Default::default()
        }
    }

    fn private_event(text: &str) -> InboundEvent {
        InboundEvent {
            chat_id: 55,
            chat_kind: Some(ChatKind::Private),
            sender: "alice".to_string(),
            text: text.to_string(),
            ..Default::default()
        }
    }

    fn ctx(event: &InboundEvent, p: f64) -> TriggerContext {
        TriggerContext::from_event(event, BOT, "/chat ", p)
    }

    #[test]
    fn command_prefix_triggers_at_zero_probability() {
        let engine = engine();
        let event = group_event("/chat what is rust?");
        assert!(engine.decide(&ctx(&event, 0.0)));
        assert_eq!(engine.cache().len("Alpha"), 0);
    }

    #[test]
    fn private_reply_to_other_user_is_ignored() {
        let engine = engine();
        let mut event = private_event("I agree");
        event.reply_to_sender = Some("carol".to_string());
        assert!(!engine.decide_with_draw(&ctx(&event, 1.0), 0.0));

        event.reply_to_sender = Some(BOT.to_string());
        assert!(engine.decide_with_draw(&ctx(&event, 0.0), 0.99));
    }

    #[test]
    fn private_plain_message_triggers() {
        let engine = engine();
        assert!(engine.decide_with_draw(&ctx(&private_event("hello"), 0.0), 0.99));
    }

    #[test]
    fn private_command_triggers_only_when_not_a_reply() {
        let engine = engine();
        let mut event = private_event("/help");
        assert!(engine.decide_with_draw(&ctx(&event, 0.0), 0.99));

        event.reply_to_sender = Some(BOT.to_string());
        assert!(!engine.decide_with_draw(&ctx(&event, 1.0), 0.0));
    }

    #[test]
    fn private_callback_triggers_only_when_not_a_reply() {
        let engine = engine();
        let mut event = private_event("button");
        event.is_callback = true;
        assert!(engine.decide_with_draw(&ctx(&event, 0.0), 0.99));

        event.reply_to_sender = Some("carol".to_string());
        assert!(!engine.decide_with_draw(&ctx(&event, 0.0), 0.99));
    }

    #[test]
    fn group_reply_to_bot_triggers() {
        let engine = engine();
        let mut event = group_event("thanks");
        event.reply_to_sender = Some(BOT.to_string());
        assert!(engine.decide_with_draw(&ctx(&event, 0.0), 0.99));
        assert_eq!(engine.cache().len("Alpha"), 0);
    }

    #[test]
    fn group_mention_at_start_triggers() {
        let engine = engine();
        let mut event = group_event("@relay_bot what time is it");
        event.mentions = vec![BOT.to_string()];
        assert!(engine.decide_with_draw(&ctx(&event, 0.0), 0.99));
    }

    #[test]
    fn group_mention_elsewhere_does_not_trigger() {
        let engine = engine();
        let mut event = group_event("ask @relay_bot later");
        event.mentions = vec![BOT.to_string()];
        assert!(!engine.decide_with_draw(&ctx(&event, 0.0), 0.99));
        assert_eq!(engine.cache().len("Alpha"), 1);
    }

    #[test]
    fn probability_rule_uses_strict_less_than() {
        let engine = engine();
        let event = group_event("random chatter");
        assert!(engine.decide_with_draw(&ctx(&event, 0.5), 0.49));
        assert!(!engine.decide_with_draw(&ctx(&event, 0.5), 0.5));
    }

    #[test]
    fn probability_is_clamped() {
        assert_eq!(clamp_probability(-0.5), 0.0);
        assert_eq!(clamp_probability(3.0), 1.0);
        assert_eq!(clamp_probability(f64::NAN), 0.0);

        let engine = engine();
        let event = group_event("chatter");
        assert!(engine.decide(&ctx(&event, 7.0)));
        assert!(!engine.decide(&ctx(&event, -1.0)));
    }

    #[test]
    fn untriggered_group_message_is_buffered() {
        let engine = engine();
        assert!(!engine.decide_with_draw(&ctx(&group_event("hi all"), 0.05), 0.9));
        assert_eq!(
            engine.cache().drain_and_format("Alpha"),
            ("bob: hi all".to_string(), 1)
        );
    }

    #[test]
    fn untitled_group_is_buffered_under_chat_id() {
        let engine = engine();
        let mut event = group_event("hi");
        event.chat_title = String::new();
        assert!(!engine.decide_with_draw(&ctx(&event, 0.0), 0.5));
        assert_eq!(engine.cache().len("-1001"), 1);
    }

    #[test]
    fn empty_text_is_never_buffered() {
        let engine = engine();
        assert!(!engine.decide_with_draw(&ctx(&group_event(""), 0.0), 0.5));
        assert_eq!(engine.cache().len("Alpha"), 0);
    }

    #[test]
    fn channel_messages_are_not_buffered() {
        let engine = engine();
        let mut event = group_event("news");
        event.chat_kind = Some(ChatKind::Channel);
        assert!(!engine.decide_with_draw(&ctx(&event, 0.0), 0.5));
        assert_eq!(engine.cache().len("Alpha"), 0);
    }
}
