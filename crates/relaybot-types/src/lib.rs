//! Shared domain types for relaybot.
//!
//! Conversation keys, persisted chat records, replay turns, inbound events,
//! configuration and the error enums shared by the port traits.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod event;
