//! Long-polling update loop.
//!
//! Fetches updates from Telegram, runs the trigger policy inline (it is cheap
//! and must see group messages in arrival order), and spawns one task per
//! triggered event. On cancellation the loop stops fetching and waits for the
//! in-flight handlers to finish.

use std::sync::Arc;
use std::time::Duration;

use relaybot_infra::telegram::TelegramClient;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::state::ConcreteChatHandler;

/// Pause after a failed `getUpdates` call.
const RETRY_DELAY: Duration = Duration::from_secs(5);

pub struct UpdatePoller {
    client: Arc<TelegramClient>,
    handler: Arc<ConcreteChatHandler>,
    poll_timeout_secs: u64,
}

impl UpdatePoller {
    pub fn new(client: Arc<TelegramClient>, handler: Arc<ConcreteChatHandler>, poll_timeout_secs: u64) -> Self {
        Self {
            client,
            handler,
            poll_timeout_secs,
        }
    }

    /// Poll until `cancel` fires, then drain in-flight handlers.
    pub async fn run(self, cancel: CancellationToken) {
        let tracker = TaskTracker::new();
        let mut offset: Option<i64> = None;
        info!(timeout_secs = self.poll_timeout_secs, "Polling for updates");

        loop {
            let batch = tokio::select! {
                _ = cancel.cancelled() => break,
                batch = self.client.get_updates(offset, self.poll_timeout_secs) => batch,
            };

            let updates = match batch {
                Ok(updates) => updates,
                Err(e) => {
                    warn!(error = %e, "getUpdates failed, retrying");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(RETRY_DELAY) => continue,
                    }
                }
            };

            for update in updates {
                offset = Some(update.update_id + 1);
                let Some(event) = update.into_event() else {
                    continue;
                };
                if !self.handler.should_handle(&event) {
                    continue;
                }

                debug!(chat_id = event.chat_id, message_id = event.message_id, "Dispatching event");
                let handler = Arc::clone(&self.handler);
                tracker.spawn(async move {
                    if let Err(e) = handler.handle(&event).await {
                        warn!(chat_id = event.chat_id, error = %e, "Handling failed");
                    }
                });
            }
        }

        tracker.close();
        info!(in_flight = tracker.len(), "Polling stopped, waiting for handlers");
        tracker.wait().await;
    }
}
