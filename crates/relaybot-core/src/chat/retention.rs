//! Periodic purge of expired chat history.
//!
//! The sweep runs with a period equal to the retention window. The cutoff
//! starts at the moment the task starts; each tick deletes every record
//! older than the cutoff and then advances the cutoff to the tick time, so a
//! record survives between one and two windows. Sessions already in memory
//! are untouched; only their persisted backing history goes away.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use relaybot_types::error::RepositoryError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chat::repository::ChatRecordRepository;
use crate::chat::session::ConversationSessionManager;
use crate::llm::backend::ChatBackend;

/// Shortest allowed sweep period.
const MIN_SWEEP_PERIOD: Duration = Duration::from_secs(1);

/// Longest sweep period; keeps timer deadlines representable.
const MAX_SWEEP_PERIOD: Duration = Duration::from_secs(10 * 365 * 24 * 3600);

impl<B, R> ConversationSessionManager<B, R>
where
    B: ChatBackend + 'static,
    R: ChatRecordRepository + 'static,
{
    /// Run one sweep tick: delete records with `created_at < cutoff`.
    pub async fn sweep_once(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let deleted = self.repository().delete_before(cutoff).await?;
        info!(deleted, cutoff = %cutoff, "Retention sweep removed expired chat records");
        Ok(deleted)
    }

    /// Spawn the retention sweep on the current runtime.
    ///
    /// The task stops when `cancel` is cancelled; await the handle to wait
    /// for it to finish.
    pub fn spawn_retention_sweep(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        let period = self
            .settings()
            .retention
            .clamp(MIN_SWEEP_PERIOD, MAX_SWEEP_PERIOD);
        tokio::spawn(async move { manager.run_retention_sweep(period, cancel).await })
    }

    async fn run_retention_sweep(&self, period: Duration, cancel: CancellationToken) {
        let start = tokio::time::Instant::now() + period;
        let mut ticker = tokio::time::interval_at(start, period);
        let mut cutoff = Utc::now();
        debug!(period_secs = period.as_secs(), "Retention sweep started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Retention sweep stopped");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep_once(cutoff).await {
                        warn!(error = %e, cutoff = %cutoff, "Retention sweep failed");
                    }
                    cutoff = Utc::now();
                }
            }
        }
    }
}
