//! ChatBackend trait definition.
//!
//! This is the abstraction over the generative-text service. A backend hands
//! out an opaque per-conversation `Session` seeded with replayed turns and
//! sends one turn at a time through it.

use relaybot_types::chat::{ImageAttachment, Turn};
use relaybot_types::error::BackendError;

/// Trait for generative backends (Gemini, or a fake in tests).
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
/// Implementations live in relaybot-infra (e.g., `GeminiBackend`).
pub trait ChatBackend: Send + Sync {
    /// Backend-specific conversational state for one conversation key.
    type Session: Send + 'static;

    /// Human-readable backend name (e.g., "gemini").
    fn name(&self) -> &str;

    /// Create a session for `model`, pre-seeded with `history` in order.
    fn create_session(
        &self,
        model: &str,
        history: Vec<Turn>,
    ) -> impl std::future::Future<Output = Result<Self::Session, BackendError>> + Send;

    /// Send one user turn (optionally with an image) and return the model's text.
    ///
    /// A failed call must leave `session` as it was, so the caller can retry.
    fn send_turn(
        &self,
        session: &mut Self::Session,
        text: &str,
        image: Option<&ImageAttachment>,
    ) -> impl std::future::Future<Output = Result<String, BackendError>> + Send;

    /// Stateless single-shot generation outside any conversation.
    fn generate_once(
        &self,
        prompt: &str,
    ) -> impl std::future::Future<Output = Result<String, BackendError>> + Send;
}
