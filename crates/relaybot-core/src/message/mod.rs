//! Inbound message flow: trigger policy, group context, reply delivery.
//!
//! - `trigger` -- `TriggerEngine` deciding whether a message gets a reply
//! - `group_cache` -- `GroupHistoryCache` of recent untriggered group messages
//! - `dispatch` -- `ResponseDispatcher` with the Markdown to plain fallback
//! - `transport` -- `ChatTransport` port implemented by the infra layer
//! - `handler` -- `ChatHandler` tying the pieces together per message

pub mod dispatch;
pub mod group_cache;
pub mod handler;
pub mod transport;
pub mod trigger;

pub use dispatch::ResponseDispatcher;
pub use group_cache::GroupHistoryCache;
pub use handler::{ChatHandler, HandlerError, HandlerSettings};
pub use transport::{ChatTransport, ParseMode};
pub use trigger::{TriggerContext, TriggerEngine};
