//! Telegram delivery of notifications

use crate::{config::TelegramConfig, ConvertError, Result};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Posts notification messages to a Telegram chat
pub struct TelegramSink {
    client: reqwest::Client,
    endpoint: Option<String>,
    chat_id: i64,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
}

impl TelegramSink {
    /// Create a sink; without a token and chat id it only drains messages
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| ConvertError::Connection(format!("Failed to create HTTP client: {}", e)))?;

        let endpoint = match (&config.bot_token, config.is_enabled()) {
            (Some(token), true) => Some(format!(
                "{}/bot{}/sendMessage",
                config.api_url.trim_end_matches('/'),
                token
            )),
            _ => None,
        };

        Ok(Self {
            client,
            endpoint,
            chat_id: config.chat_id.unwrap_or_default(),
        })
    }

    /// Whether messages are actually delivered
    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Deliver one message
    pub async fn send(&self, text: &str) -> Result<()> {
        let Some(endpoint) = &self.endpoint else {
            return Ok(());
        };

        let response = self
            .client
            .post(endpoint)
            .json(&SendMessage {
                chat_id: self.chat_id,
                text,
            })
            .send()
            .await
            .map_err(|e| ConvertError::Connection(format!("Telegram request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConvertError::Exchange {
                status: status.as_u16(),
                body,
            }
            .into());
        }
        Ok(())
    }

    /// Deliver messages until every notifier handle is dropped
    pub fn spawn(self, mut messages: mpsc::UnboundedReceiver<String>) -> JoinHandle<()> {
        if self.is_enabled() {
            info!("Telegram notifications enabled for chat {}", self.chat_id);
        } else {
            debug!("Telegram notifications disabled");
        }

        tokio::spawn(async move {
            while let Some(message) = messages.recv().await {
                if let Err(e) = self.send(&message).await {
                    warn!("Telegram delivery failed: {}", e);
                }
            }
        })
    }
}
