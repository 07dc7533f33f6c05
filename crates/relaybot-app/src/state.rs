//! Application state wiring the infra implementations together.
//!
//! The core components are generic over their ports; the aliases here pin
//! them to the concrete SQLite, Gemini and Telegram adapters.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use relaybot_core::chat::session::ConversationSessionManager;
use relaybot_core::message::handler::ChatHandler;
use relaybot_infra::config::{load_bot_config, resolve_data_dir};
use relaybot_infra::llm::gemini::GeminiBackend;
use relaybot_infra::sqlite::pool::{DATABASE_FILE, DatabasePool};
use relaybot_infra::sqlite::record::SqliteChatRecordRepository;
use relaybot_infra::telegram::TelegramClient;
use relaybot_types::config::BotConfig;

/// Record repository shared between the manager and the CLI commands.
pub type SharedRecords = Arc<SqliteChatRecordRepository>;

pub type ConcreteSessionManager = ConversationSessionManager<GeminiBackend, SharedRecords>;

pub type ConcreteChatHandler = ChatHandler<GeminiBackend, SharedRecords, TelegramClient>;

/// Configuration and storage shared by every command that touches the database.
pub struct AppState {
    pub config: BotConfig,
    pub data_dir: PathBuf,
    pub records: SharedRecords,
}

impl AppState {
    /// Resolve the data directory, load config, open the database.
    pub async fn init(data_dir: Option<PathBuf>) -> anyhow::Result<Self> {
        let data_dir = data_dir.unwrap_or_else(resolve_data_dir);

        // Ensure data directory exists
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_bot_config(&data_dir).await;
        let db_pool = DatabasePool::open_in(&data_dir).await?;
        let records = Arc::new(SqliteChatRecordRepository::new(db_pool));

        tracing::debug!(data_dir = %data_dir.display(), "Application state initialized");

        Ok(Self {
            config,
            data_dir,
            records,
        })
    }

    pub fn database_path(&self) -> PathBuf {
        database_file(&self.data_dir)
    }
}

fn database_file(data_dir: &Path) -> PathBuf {
    data_dir.join(DATABASE_FILE)
}
