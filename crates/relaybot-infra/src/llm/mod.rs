//! Generative backend implementations.
//!
//! Contains concrete implementations of the [`ChatBackend`] trait defined in
//! `relaybot-core`.
//!
//! [`ChatBackend`]: relaybot_core::llm::backend::ChatBackend

pub mod gemini;
