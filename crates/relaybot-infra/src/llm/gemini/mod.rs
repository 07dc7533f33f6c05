//! Google Gemini backend implementation.
//!
//! This module provides the [`GeminiBackend`] which implements the
//! [`ChatBackend`](relaybot_core::llm::backend::ChatBackend) trait for the
//! Gemini `generateContent` REST API, including inline image parts.

pub mod client;
pub mod types;

pub use client::{GeminiBackend, GeminiSession};
