//! `relaybot run`: wire the adapters and serve until shutdown.

use std::sync::Arc;

use anyhow::Context;
use relaybot_core::chat::session::{ConversationSessionManager, SessionSettings};
use relaybot_core::llm::backend::ChatBackend;
use relaybot_core::message::group_cache::GroupHistoryCache;
use relaybot_core::message::handler::{ChatHandler, HandlerSettings};
use relaybot_core::message::trigger::TriggerEngine;
use relaybot_infra::config::Secrets;
use relaybot_infra::llm::gemini::GeminiBackend;
use relaybot_infra::telegram::TelegramClient;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::poller::UpdatePoller;
use crate::state::{AppState, ConcreteSessionManager};

pub async fn run(state: AppState) -> anyhow::Result<()> {
    let secrets = Secrets::from_env()?;
    let config = &state.config;
    info!(database = %state.database_path().display(), "Starting relaybot");

    let telegram = Arc::new(TelegramClient::new(secrets.telegram_token)?);
    let me = telegram
        .get_me()
        .await
        .context("failed to reach Telegram (getMe)")?;
    let bot_username = me
        .username
        .context("the bot account has no username")?;
    info!(bot = %bot_username, "Connected to Telegram");

    let backend = GeminiBackend::new(secrets.gemini_api_key, config.model.clone())?;
    let manager: Arc<ConcreteSessionManager> = Arc::new(ConversationSessionManager::new(
        backend,
        state.records.clone(),
        SessionSettings::from(config),
    ));
    let restored = manager
        .initialize()
        .await
        .context("failed to replay conversation history")?;
    info!(
        restored,
        backend = manager.backend().name(),
        model = manager.backend().default_model(),
        "Sessions restored"
    );

    let cache = Arc::new(GroupHistoryCache::new(config.group_history_capacity));
    let handler = Arc::new(ChatHandler::new(
        Arc::clone(&manager),
        TriggerEngine::new(cache),
        Arc::clone(&telegram),
        HandlerSettings::from_config(config, bot_username),
    ));

    let cancel = CancellationToken::new();
    let sweep = manager.spawn_retention_sweep(cancel.child_token());
    let poller = UpdatePoller::new(telegram, handler, config.poll_timeout_secs);
    let polling = tokio::spawn(poller.run(cancel.child_token()));

    println!("  relaybot is running. Press Ctrl+C to stop.");
    shutdown_signal().await;

    info!("Shutdown requested");
    cancel.cancel();
    polling.await?;
    sweep.await?;
    println!("\n  Stopped.");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
