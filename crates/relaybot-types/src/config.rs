//! Configuration types for relaybot.
//!
//! `BotConfig` is the top-level `config.toml` controlling the model, the
//! trigger policy, the group history capacity, history retention and the
//! backend retry policy. Every field has a default.

use serde::{Deserialize, Serialize};

use std::time::Duration;

/// Top-level configuration for a relaybot process.
///
/// Loaded from `~/.relaybot/config.toml`. Secrets (bot token, API key) are
/// never read from this file; they come from the environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotConfig {
    /// Backend model used for every conversation.
    #[serde(default = "default_model")]
    pub model: String,

    /// Probability in [0, 1] that an unaddressed group message triggers a reply.
    #[serde(default = "default_trigger_probability")]
    pub trigger_probability: f64,

    /// Prefix that always triggers a reply (stripped before sending).
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,

    /// Maximum number of buffered group messages per group.
    #[serde(default = "default_group_history_capacity")]
    pub group_history_capacity: usize,

    /// Hours of history kept for replay; also the retention sweep period.
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u64,

    /// Retry policy for backend sends within one exchange.
    #[serde(default)]
    pub retry: RetryPolicy,

    /// What to do when a turn cannot be written to the store.
    #[serde(default)]
    pub persistence: PersistencePolicy,

    /// Hard timeout per backend attempt. `None` waits indefinitely.
    #[serde(default)]
    pub attempt_timeout_secs: Option<u64>,

    /// Long-poll timeout passed to the transport.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,

    /// Persona instruction appended to group-context prompts.
    #[serde(default = "default_persona")]
    pub persona: String,
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_trigger_probability() -> f64 {
    0.05
}

fn default_command_prefix() -> String {
    "/chat ".to_string()
}

fn default_group_history_capacity() -> usize {
    15
}

fn default_retention_hours() -> u64 {
    100
}

fn default_poll_timeout_secs() -> u64 {
    30
}

fn default_persona() -> String {
    "Answer as a knowledgeable and level-headed member of this group.".to_string()
}

impl BotConfig {
    /// Retention window W. Absurdly large hour counts saturate.
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_hours.saturating_mul(3600))
    }

    pub fn attempt_timeout(&self) -> Option<Duration> {
        self.attempt_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            trigger_probability: default_trigger_probability(),
            command_prefix: default_command_prefix(),
            group_history_capacity: default_group_history_capacity(),
            retention_hours: default_retention_hours(),
            retry: RetryPolicy::default(),
            persistence: PersistencePolicy::default(),
            attempt_timeout_secs: None,
            poll_timeout_secs: default_poll_timeout_secs(),
            persona: default_persona(),
        }
    }
}

/// Handling of failed chat record writes during an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistencePolicy {
    /// Log the failure and keep going. The reply still reaches the user;
    /// the turn is simply missing from future replays.
    #[default]
    BestEffort,
    /// Refuse to call the backend when the user turn cannot be recorded.
    ///
    /// Once the backend has answered, the reply is already part of the live
    /// session, so a failed model-turn write is logged and the reply is
    /// still delivered.
    Strict,
}

/// Delay curve applied between backend attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backoff {
    /// Retry immediately.
    None,
    /// Same delay before every retry.
    Fixed { delay_ms: u64 },
    /// `base_ms * 2^(retry - 1)`, capped at `max_ms`.
    Exponential { base_ms: u64, max_ms: u64 },
}

/// How many times one exchange may call the backend, and how long to wait
/// between calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff")]
    pub backoff: Backoff,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff() -> Backoff {
    Backoff::None
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Attempt budget, never below one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Whether another attempt may follow `attempt` (1-based).
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.attempts()
    }

    /// Delay to wait before `attempt` (1-based). The first attempt never waits.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        match self.backoff {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed { delay_ms } => Duration::from_millis(delay_ms),
            Backoff::Exponential { base_ms, max_ms } => {
                let shift = (attempt - 2).min(32);
                let ms = base_ms.saturating_mul(1u64 << shift).min(max_ms);
                Duration::from_millis(ms)
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff: default_backoff(),
        }
    }
}
