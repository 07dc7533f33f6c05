//! Conversation sessions and their persisted history.
//!
//! - `repository` -- `ChatRecordRepository` port implemented by the infra layer
//! - `session` -- `ConversationSessionManager`, one dialogue per conversation key
//! - `retention` -- periodic purge of expired history

pub mod repository;
pub mod retention;
pub mod session;

pub use repository::ChatRecordRepository;
pub use session::{ConversationSessionManager, ExchangeError, PersistencePolicy, SessionSettings};
