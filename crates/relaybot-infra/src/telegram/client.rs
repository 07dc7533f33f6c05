//! TelegramClient -- concrete [`ChatTransport`] implementation for the
//! Telegram Bot API.
//!
//! All methods are JSON POSTs to `/bot<token>/<method>`; file contents are
//! fetched from `/file/bot<token>/<path>`. Updates are received by long
//! polling with `getUpdates`.
//!
//! The bot token is part of every URL, so URLs are never logged.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use relaybot_core::message::transport::{ChatTransport, ParseMode};
use relaybot_types::chat::ImageAttachment;
use relaybot_types::error::TransportError;
use relaybot_types::event::ReplyTarget;

use super::types::{
    ApiResponse, File, GetFileParams, GetUpdatesParams, ReplyParameters, SendChatActionParams,
    SendMessageParams, Update, User,
};

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://api.telegram.org";

/// Slack added on top of the long-poll timeout for the HTTP request itself.
const POLL_GRACE: Duration = Duration::from_secs(10);

/// Telegram Bot API client.
pub struct TelegramClient {
    client: reqwest::Client,
    token: SecretString,
    base_url: String,
}

impl TelegramClient {
    pub fn new(token: SecretString) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| TransportError::Request(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            token,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Override the base URL (useful for testing or a local Bot API server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.base_url, self.token.expose_secret())
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{file_path}", self.base_url, self.token.expose_secret())
    }

    /// Call a Bot API method and unwrap the response envelope.
    async fn call<P, R>(&self, method: &str, params: &P, timeout: Option<Duration>) -> Result<R, TransportError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let mut request = self.client.post(self.method_url(method)).json(params);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            // Strip the URL so the token never ends up in an error message
            .map_err(|e| TransportError::Request(format!("{method}: {}", e.without_url())))?;

        let status = response.status();
        let envelope: ApiResponse<R> = response.json().await.map_err(|e| {
            TransportError::Deserialization(format!("{method}: HTTP {status}: {}", e.without_url()))
        })?;

        match envelope {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse {
                error_code,
                description,
                ..
            } => Err(TransportError::Api {
                code: error_code.unwrap_or_else(|| i64::from(status.as_u16())),
                description: description.unwrap_or_else(|| format!("{method} returned no result")),
            }),
        }
    }

    /// Identity of the bot owning the token.
    pub async fn get_me(&self) -> Result<User, TransportError> {
        self.call("getMe", &serde_json::json!({}), None).await
    }

    /// Long-poll for updates with `update_id >= offset`.
    pub async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<Update>, TransportError> {
        let params = GetUpdatesParams {
            offset,
            timeout: timeout_secs,
            allowed_updates: vec!["message", "callback_query"],
        };
        let timeout = Duration::from_secs(timeout_secs) + POLL_GRACE;
        self.call("getUpdates", &params, Some(timeout)).await
    }
}

impl ChatTransport for TelegramClient {
    async fn reply(&self, target: ReplyTarget, text: &str, mode: ParseMode) -> Result<(), TransportError> {
        let params = SendMessageParams {
            chat_id: target.chat_id,
            text,
            parse_mode: match mode {
                ParseMode::Markdown => Some("Markdown"),
                ParseMode::Plain => None,
            },
            reply_parameters: ReplyParameters {
                message_id: target.message_id,
                allow_sending_without_reply: true,
            },
        };
        let _: serde_json::Value = self.call("sendMessage", &params, None).await?;
        debug!(chat_id = target.chat_id, %mode, "Message sent");
        Ok(())
    }

    async fn send_typing(&self, chat_id: i64) -> Result<(), TransportError> {
        let params = SendChatActionParams {
            chat_id,
            action: "typing",
        };
        let _: bool = self.call("sendChatAction", &params, None).await?;
        Ok(())
    }

    async fn download_attachment(&self, file_id: &str) -> Result<ImageAttachment, TransportError> {
        let file: File = self.call("getFile", &GetFileParams { file_id }, None).await?;
        let file_path = file
            .file_path
            .ok_or_else(|| TransportError::Request(format!("file {} has no download path", file.file_id)))?;

        let response = self
            .client
            .get(self.file_url(&file_path))
            .send()
            .await
            .map_err(|e| TransportError::Request(format!("file download: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Api {
                code: i64::from(status.as_u16()),
                description: format!("file download failed for {file_path}"),
            });
        }

        let header_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let data = response
            .bytes()
            .await
            .map_err(|e| TransportError::Request(format!("file download: {}", e.without_url())))?
            .to_vec();

        let mime_type = sniff_image_type(&data)
            .map(str::to_string)
            .or(header_type)
            .unwrap_or_else(|| "application/octet-stream".to_string());

        Ok(ImageAttachment { mime_type, data })
    }
}

/// Detect common image formats from their magic bytes.
fn sniff_image_type(data: &[u8]) -> Option<&'static str> {
    match data {
        [0xff, 0xd8, 0xff, ..] => Some("image/jpeg"),
        [0x89, b'P', b'N', b'G', ..] => Some("image/png"),
        [b'G', b'I', b'F', b'8', ..] => Some("image/gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        _ => None,
    }
}
