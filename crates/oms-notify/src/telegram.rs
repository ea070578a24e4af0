//! Telegram Bot API notifier.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error};

use crate::error::{NotifyError, NotifyResult};
use crate::notifier::{BoxFuture, Notifier};

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Telegram delivery settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(skip_serializing)]
    pub bot_token: String,
    /// Chat or group id the bot posts to.
    pub chat_id: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

impl TelegramConfig {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            api_base: default_api_base(),
        }
    }
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Posts each notification as a chat message via `sendMessage`.
pub struct TelegramNotifier {
    config: TelegramConfig,
    client: reqwest::Client,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.config.api_base.trim_end_matches('/'),
            self.config.bot_token
        )
    }

    fn payload(&self, text: &str) -> serde_json::Value {
        json!({
            "chat_id": self.config.chat_id,
            "text": text,
        })
    }

    async fn post(&self, text: String) -> NotifyResult<()> {
        debug!(chat_id = %self.config.chat_id, "Sending Telegram message");

        let response = self
            .client
            .post(self.endpoint())
            .json(&self.payload(&text))
            .send()
            .await
            // The request URL carries the bot token.
            .map_err(|e| NotifyError::Http(e.without_url()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        error!(status = status.as_u16(), %body, "Telegram sendMessage failed");
        Err(NotifyError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

impl Notifier for TelegramNotifier {
    fn send(&self, text: String) -> BoxFuture<'_, NotifyResult<()>> {
        Box::pin(self.post(text))
    }
}
