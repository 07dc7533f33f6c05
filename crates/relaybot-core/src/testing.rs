//! In-memory fakes for the port traits, shared by the unit tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use relaybot_types::chat::{ChatRecord, ConversationKey, ImageAttachment, Turn};
use relaybot_types::error::{BackendError, RepositoryError, TransportError};
use relaybot_types::event::ReplyTarget;

use crate::chat::repository::ChatRecordRepository;
use crate::llm::backend::ChatBackend;
use crate::message::transport::{ChatTransport, ParseMode};

// ---------------------------------------------------------------------------
// FakeBackend
// ---------------------------------------------------------------------------

#[derive(Default)]
struct BackendCounters {
    send_calls: AtomicU32,
    create_calls: AtomicU32,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    seeded: Mutex<Vec<Vec<Turn>>>,
    prompts: Mutex<Vec<String>>,
    images: Mutex<Vec<ImageAttachment>>,
}

/// Backend that answers `reply N` where N counts every send call.
#[derive(Clone, Default)]
pub struct FakeBackend {
    fail_first: u32,
    fail_create: bool,
    delay: Option<Duration>,
    counters: Arc<BackendCounters>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the first `n` send calls.
    pub fn failing_first(mut self, n: u32) -> Self {
        self.fail_first = n;
        self
    }

    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn send_calls(&self) -> u32 {
        self.counters.send_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> u32 {
        self.counters.create_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.counters.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn seeded_histories(&self) -> Vec<Vec<Turn>> {
        self.counters.seeded.lock().unwrap().clone()
    }

    /// Every user text sent, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.counters.prompts.lock().unwrap().clone()
    }

    pub fn images(&self) -> Vec<ImageAttachment> {
        self.counters.images.lock().unwrap().clone()
    }
}

impl ChatBackend for FakeBackend {
    type Session = Vec<Turn>;

    fn name(&self) -> &str {
        "fake"
    }

    async fn create_session(&self, _model: &str, history: Vec<Turn>) -> Result<Vec<Turn>, BackendError> {
        self.counters.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_create {
            return Err(BackendError::Request("simulated create failure".to_string()));
        }
        self.counters.seeded.lock().unwrap().push(history.clone());
        Ok(history)
    }

    async fn send_turn(
        &self,
        session: &mut Vec<Turn>,
        text: &str,
        image: Option<&ImageAttachment>,
    ) -> Result<String, BackendError> {
        let n = self.counters.send_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.prompts.lock().unwrap().push(text.to_string());
        if let Some(image) = image {
            self.counters.images.lock().unwrap().push(image.clone());
        }

        let now = self.counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);

        if n <= self.fail_first {
            return Err(BackendError::Request(format!("simulated failure {n}")));
        }
        let reply = format!("reply {n}");
        session.push(Turn::user(text));
        session.push(Turn::model(reply.as_str()));
        Ok(reply)
    }

    async fn generate_once(&self, prompt: &str) -> Result<String, BackendError> {
        Ok(format!("once: {prompt}"))
    }
}

// ---------------------------------------------------------------------------
// MemoryRepository
// ---------------------------------------------------------------------------

/// Vec-backed record store with switchable failures.
#[derive(Default)]
pub struct MemoryRepository {
    records: Mutex<Vec<ChatRecord>>,
    fail_appends: AtomicBool,
    append_limit: Mutex<Option<usize>>,
    failing_reads: Mutex<HashSet<String>>,
    delete_calls: AtomicU32,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: ChatRecord) {
        self.records.lock().unwrap().push(record);
    }

    /// All records in append order.
    pub fn records(&self) -> Vec<ChatRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Accept `stored` appends, then fail every later one.
    pub fn fail_appends_after(&self, stored: usize) {
        *self.append_limit.lock().unwrap() = Some(stored);
    }

    pub fn fail_reads_for(&self, key: &str) {
        self.failing_reads.lock().unwrap().insert(key.to_string());
    }

    pub fn delete_calls(&self) -> u32 {
        self.delete_calls.load(Ordering::SeqCst)
    }
}

impl ChatRecordRepository for MemoryRepository {
    async fn append(&self, record: &ChatRecord) -> Result<(), RepositoryError> {
        let over_limit = self
            .append_limit
            .lock()
            .unwrap()
            .is_some_and(|limit| self.records.lock().unwrap().len() >= limit);
        if over_limit || self.fail_appends.load(Ordering::SeqCst) {
            return Err(RepositoryError::Query("simulated write failure".to_string()));
        }
        self.insert(record.clone());
        Ok(())
    }

    async fn list_conversation_keys(&self) -> Result<Vec<ConversationKey>, RepositoryError> {
        let mut keys: Vec<ConversationKey> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.conversation_key.clone())
            .collect();
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    async fn read_range(
        &self,
        key: &ConversationKey,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ChatRecord>, RepositoryError> {
        if self.failing_reads.lock().unwrap().contains(key.as_str()) {
            return Err(RepositoryError::Query("simulated read failure".to_string()));
        }
        let mut out: Vec<ChatRecord> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| &r.conversation_key == key && r.created_at >= start && r.created_at <= end)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(out)
    }

    async fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|r| r.created_at >= cutoff);
        Ok((before - records.len()) as u64)
    }
}

// ---------------------------------------------------------------------------
// RecordingTransport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct SentReply {
    pub target: ReplyTarget,
    pub text: String,
    pub mode: ParseMode,
}

/// Transport that records every reply attempt.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<SentReply>>,
    attempts: AtomicU32,
    typing: AtomicU32,
    fail_markdown: AtomicBool,
    fail_plain: AtomicBool,
    attachment: Mutex<Option<ImageAttachment>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_markdown(&self) {
        self.fail_markdown.store(true, Ordering::SeqCst);
    }

    pub fn fail_plain(&self) {
        self.fail_plain.store(true, Ordering::SeqCst);
    }

    pub fn with_attachment(&self, attachment: ImageAttachment) {
        *self.attachment.lock().unwrap() = Some(attachment);
    }

    /// Successfully delivered replies.
    pub fn sent(&self) -> Vec<SentReply> {
        self.sent.lock().unwrap().clone()
    }

    /// Every reply call, successful or not.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn typing_calls(&self) -> u32 {
        self.typing.load(Ordering::SeqCst)
    }
}

impl ChatTransport for RecordingTransport {
    async fn reply(&self, target: ReplyTarget, text: &str, mode: ParseMode) -> Result<(), TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let fail = match mode {
            ParseMode::Markdown => self.fail_markdown.load(Ordering::SeqCst),
            ParseMode::Plain => self.fail_plain.load(Ordering::SeqCst),
        };
        if fail {
            return Err(TransportError::Api {
                code: 400,
                description: format!("simulated {mode} failure"),
            });
        }
        self.sent.lock().unwrap().push(SentReply {
            target,
            text: text.to_string(),
            mode,
        });
        Ok(())
    }

    async fn send_typing(&self, _chat_id: i64) -> Result<(), TransportError> {
        self.typing.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn download_attachment(&self, file_id: &str) -> Result<ImageAttachment, TransportError> {
        self.attachment
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| TransportError::Request(format!("no such file: {file_id}")))
    }
}
