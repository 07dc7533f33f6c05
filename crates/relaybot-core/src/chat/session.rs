//! Conversation session manager.
//!
//! Owns one backend session per [`ConversationKey`], replays persisted
//! history into fresh sessions at startup, persists both turns of every
//! exchange, and retries failed backend sends according to a [`RetryPolicy`].
//!
//! Exchanges on the same key are serialized by a per-key async mutex; the
//! map itself is a `DashMap`, so different keys never contend and no shard
//! lock is held across an await.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use relaybot_types::chat::{ChatRecord, ConversationKey, ImageAttachment, Turn};
use relaybot_types::config::{BotConfig, RetryPolicy};
pub use relaybot_types::config::PersistencePolicy;
use relaybot_types::error::{BackendError, RepositoryError};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::chat::repository::ChatRecordRepository;
use crate::llm::backend::ChatBackend;

/// Settings for a [`ConversationSessionManager`].
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub model: String,
    /// Retention window W: replay horizon and sweep period.
    pub retention: Duration,
    pub retry: RetryPolicy,
    pub attempt_timeout: Option<Duration>,
    pub persistence: PersistencePolicy,
}

impl From<&BotConfig> for SessionSettings {
    fn from(config: &BotConfig) -> Self {
        Self {
            model: config.model.clone(),
            retention: config.retention(),
            retry: config.retry.clone(),
            attempt_timeout: config.attempt_timeout(),
            persistence: config.persistence,
        }
    }
}

/// Errors from [`ConversationSessionManager::exchange`].
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("failed to create backend session: {0}")]
    SessionCreation(#[source] BackendError),

    #[error("backend failed after {attempts} attempts: {last}")]
    AttemptsExhausted { attempts: u32, last: BackendError },

    #[error("failed to persist turn: {0}")]
    Persistence(#[source] RepositoryError),
}

/// Per-key session slot. `None` until the first successful creation.
type SessionSlot<S> = Arc<Mutex<Option<S>>>;

/// Holds one ongoing dialogue per conversation key.
///
/// Generic over the backend and the record repository so the core never
/// depends on relaybot-infra.
pub struct ConversationSessionManager<B: ChatBackend, R: ChatRecordRepository> {
    backend: B,
    repo: R,
    settings: SessionSettings,
    sessions: DashMap<ConversationKey, SessionSlot<B::Session>>,
}

impl<B: ChatBackend, R: ChatRecordRepository> ConversationSessionManager<B, R> {
    pub fn new(backend: B, repo: R, settings: SessionSettings) -> Self {
        Self {
            backend,
            repo,
            settings,
            sessions: DashMap::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Number of keys with a session slot (initialized or pending).
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn has_session(&self, key: &ConversationKey) -> bool {
        self.sessions.contains_key(key)
    }

    /// Replay persisted history into fresh sessions.
    ///
    /// For every known key, reads the records inside the trailing retention
    /// window and seeds a session with them in timestamp order. A key whose
    /// history cannot be read (or whose session cannot be created) is logged
    /// and skipped; it will get an empty session on first use.
    ///
    /// Returns the number of sessions restored.
    pub async fn initialize(&self) -> Result<usize, RepositoryError> {
        let keys = self.repo.list_conversation_keys().await?;
        let end = Utc::now();
        let start = self.window_start(end);
        let mut restored = 0;

        for key in keys {
            let records = match self.repo.read_range(&key, start, end).await {
                Ok(records) => records,
                Err(e) => {
                    warn!(key = %key, error = %e, "Failed to read chat history, skipping");
                    continue;
                }
            };
            if records.is_empty() {
                continue;
            }

            let history: Vec<Turn> = records.into_iter().map(ChatRecord::into_turn).collect();
            let turns = history.len();
            match self.backend.create_session(&self.settings.model, history).await {
                Ok(session) => {
                    self.sessions
                        .insert(key.clone(), Arc::new(Mutex::new(Some(session))));
                    debug!(key = %key, turns, "Session restored");
                    restored += 1;
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Failed to create session from history, skipping");
                }
            }
        }

        info!(restored, backend = self.backend.name(), "Session replay complete");
        Ok(restored)
    }

    /// Send `text` (and an optional image) on the session for `key`.
    ///
    /// Persists the user turn before calling the backend, then keeps calling
    /// the backend while the retry policy allows. The first success is
    /// persisted as the model turn and returned. When every attempt fails no
    /// model turn is written.
    pub async fn exchange(
        &self,
        key: &ConversationKey,
        text: &str,
        image: Option<&ImageAttachment>,
    ) -> Result<String, ExchangeError> {
        let slot = self.slot(key);
        let mut guard = slot.lock().await;
        let session = self
            .ensure_session(key, &mut guard)
            .await
            .map_err(ExchangeError::SessionCreation)?;

        self.persist(ChatRecord::new(key.clone(), true, text)).await?;

        let retry = &self.settings.retry;
        let mut attempt = 1;
        loop {
            let delay = retry.delay_before(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            match self.send_attempt(session, text, image).await {
                Ok(reply) => {
                    debug!(key = %key, attempt, "Backend replied");
                    self.persist_reply(ChatRecord::new(key.clone(), false, reply.as_str()))
                        .await;
                    return Ok(reply);
                }
                Err(e) => {
                    warn!(
                        key = %key,
                        attempt,
                        max_attempts = retry.attempts(),
                        error = %e,
                        "Backend send failed"
                    );
                    if !retry.should_retry(attempt) {
                        return Err(ExchangeError::AttemptsExhausted {
                            attempts: attempt,
                            last: e,
                        });
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// Stateless passthrough for non-conversational prompts.
    pub async fn generate_once(&self, prompt: &str) -> Result<String, BackendError> {
        self.backend.generate_once(prompt).await
    }

    /// Start of the replay window ending at `end`.
    pub(crate) fn window_start(&self, end: DateTime<Utc>) -> DateTime<Utc> {
        let window = TimeDelta::from_std(self.settings.retention).unwrap_or(TimeDelta::MAX);
        end.checked_sub_signed(window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    fn slot(&self, key: &ConversationKey) -> SessionSlot<B::Session> {
        // Clone the Arc out so the shard lock is released before awaiting.
        self.sessions
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .value()
            .clone()
    }

    async fn ensure_session<'a>(
        &self,
        key: &ConversationKey,
        slot: &'a mut Option<B::Session>,
    ) -> Result<&'a mut B::Session, BackendError> {
        match *slot {
            Some(ref mut session) => Ok(session),
            None => {
                let session = self
                    .backend
                    .create_session(&self.settings.model, Vec::new())
                    .await?;
                debug!(key = %key, "Session created");
                Ok(slot.insert(session))
            }
        }
    }

    async fn send_attempt(
        &self,
        session: &mut B::Session,
        text: &str,
        image: Option<&ImageAttachment>,
    ) -> Result<String, BackendError> {
        let send = self.backend.send_turn(session, text, image);
        match self.settings.attempt_timeout {
            Some(limit) => tokio::time::timeout(limit, send)
                .await
                .unwrap_or(Err(BackendError::Timeout(limit))),
            None => send.await,
        }
    }

    /// Write the user turn. Under `Strict` a failure aborts the exchange
    /// before the backend is called.
    async fn persist(&self, record: ChatRecord) -> Result<(), ExchangeError> {
        match self.repo.append(&record).await {
            Ok(()) => Ok(()),
            Err(e) => match self.settings.persistence {
                PersistencePolicy::BestEffort => {
                    warn_unpersisted(&record, &e);
                    Ok(())
                }
                PersistencePolicy::Strict => Err(ExchangeError::Persistence(e)),
            },
        }
    }

    /// Write the model turn. The reply already lives in the session, so a
    /// failure is only logged, whatever the policy.
    async fn persist_reply(&self, record: ChatRecord) {
        if let Err(e) = self.repo.append(&record).await {
            warn_unpersisted(&record, &e);
        }
    }
}

fn warn_unpersisted(record: &ChatRecord, error: &RepositoryError) {
    warn!(
        key = %record.conversation_key,
        role = %record.role(),
        error = %error,
        "Failed to persist chat record"
    );
}
