//! Infrastructure layer for relaybot.
//!
//! Contains implementations of the port traits defined in `relaybot-core`:
//! SQLite chat record storage, the Gemini backend, and the Telegram transport,
//! plus the configuration loader.

pub mod config;
pub mod llm;
pub mod sqlite;
pub mod telegram;
