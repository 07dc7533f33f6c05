//! Configuration loader for relaybot.
//!
//! Reads `config.toml` from the data directory (`~/.relaybot/` in production)
//! and deserializes it into [`BotConfig`]. Falls back to defaults when the
//! file is missing or malformed. Secrets never live in the file; they are
//! read from the environment by [`Secrets::from_env`].

use std::path::{Path, PathBuf};

use relaybot_types::config::BotConfig;
use secrecy::SecretString;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "RELAYBOT_DATA_DIR";

/// Environment variable holding the Telegram bot token.
pub const TELEGRAM_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

/// Environment variable holding the Gemini API key.
pub const GEMINI_KEY_ENV: &str = "GEMINI_API_KEY";

/// Resolve the data directory: `RELAYBOT_DATA_DIR`, else `~/.relaybot`.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".relaybot")
}

/// Load bot configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`BotConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - If the file exists and parses successfully, returns the parsed config.
pub async fn load_bot_config(data_dir: &Path) -> BotConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return BotConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return BotConfig::default();
        }
    };

    match toml::from_str::<BotConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            BotConfig::default()
        }
    }
}

/// Credentials for the external services.
pub struct Secrets {
    pub telegram_token: SecretString,
    pub gemini_api_key: SecretString,
}

/// A required secret is absent from the environment.
#[derive(Debug, thiserror::Error)]
#[error("environment variable {0} is not set")]
pub struct MissingSecret(pub &'static str);

impl Secrets {
    /// Read both secrets from the environment.
    pub fn from_env() -> Result<Self, MissingSecret> {
        Ok(Self {
            telegram_token: read_secret(TELEGRAM_TOKEN_ENV)?,
            gemini_api_key: read_secret(GEMINI_KEY_ENV)?,
        })
    }
}

fn read_secret(var: &'static str) -> Result<SecretString, MissingSecret> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(SecretString::from(value)),
        _ => Err(MissingSecret(var)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaybot_types::config::Backoff;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_bot_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_bot_config(tmp.path()).await;
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.group_history_capacity, 15);
        assert_eq!(config.retention_hours, 100);
    }

    #[tokio::test]
    async fn load_bot_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        tokio::fs::write(
            &config_path,
            r#"
model = "gemini-2.5-pro"
trigger_probability = 0.1
retention_hours = 24

[retry]
max_attempts = 5
backoff = { kind = "fixed", delay_ms = 250 }
"#,
        )
        .await
        .unwrap();

        let config = load_bot_config(tmp.path()).await;
        assert_eq!(config.model, "gemini-2.5-pro");
        assert_eq!(config.trigger_probability, 0.1);
        assert_eq!(config.retention_hours, 24);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.backoff, Backoff::Fixed { delay_ms: 250 });
        // Unspecified fields keep their defaults
        assert_eq!(config.command_prefix, "/chat ");
    }

    #[tokio::test]
    async fn load_bot_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        tokio::fs::write(&config_path, "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_bot_config(tmp.path()).await;
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn resolve_data_dir_ends_with_relaybot_or_env() {
        let dir = resolve_data_dir();
        match std::env::var(DATA_DIR_ENV) {
            Ok(env) => assert_eq!(dir, PathBuf::from(env)),
            Err(_) => assert!(dir.ends_with(".relaybot")),
        }
    }

    #[test]
    fn missing_secret_names_the_variable() {
        let err = read_secret("RELAYBOT_TEST_SURELY_UNSET_VAR").unwrap_err();
        assert_eq!(
            err.to_string(),
            "environment variable RELAYBOT_TEST_SURELY_UNSET_VAR is not set"
        );
    }
}
