//! Business logic and port trait definitions for relaybot.
//!
//! This crate defines the "ports" (repository, backend and transport traits)
//! that the infrastructure layer implements. It depends only on
//! `relaybot-types` -- never on `relaybot-infra` or any database/IO crate.

pub mod chat;
pub mod llm;
pub mod message;

#[cfg(test)]
pub(crate) mod testing;
