use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::poller::{poll_updates, UpdateSource};
use super::types::{ApiResponse, GetUpdatesParams, RawUpdate, SendMessageParams};
use crate::bot::Update;
use crate::client::build_http_client;
use crate::config::Config;
use crate::constant::*;
use crate::delivery::{Delivery, OutgoingMessage};
use crate::errors::DeliveryError;
use crate::model::ChatId;

/// Minimal Telegram Bot API client: sends messages and long-polls updates.
pub struct TelegramClient {
    http: reqwest::Client,
    base_url: String,
}

impl TelegramClient {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            http: build_http_client(UPDATES_HTTP_TIMEOUT)?,
            base_url: format!(
                "{}/bot{}",
                config.telegram_api_url, config.telegram_bot_token
            ),
        })
    }

    async fn call<B, T>(&self, method: &'static str, body: &B) -> Result<T, DeliveryError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        // The token is part of the URL, keep it out of error messages.
        let response: ApiResponse<T> = self
            .http
            .post(format!("{}/{}", self.base_url, method))
            .json(body)
            .send()
            .await
            .map_err(|e| DeliveryError::Http(e.without_url()))?
            .json()
            .await
            .map_err(|e| DeliveryError::Http(e.without_url()))?;

        response.into_result(method)
    }

    /// Long-polls `getUpdates` and forwards every update to `updates` until
    /// `token` is cancelled.
    pub async fn poll_updates(
        &self,
        updates: mpsc::Sender<Update>,
        token: CancellationToken,
    ) -> Result<()> {
        poll_updates(self, updates, token, UPDATES_RETRY_DELAY).await
    }
}

#[async_trait]
impl UpdateSource for TelegramClient {
    async fn get_updates(&self, offset: i64) -> Result<Vec<RawUpdate>, DeliveryError> {
        let params = GetUpdatesParams {
            offset,
            timeout: UPDATES_POLL_TIMEOUT,
            allowed_updates: &["message"],
        };
        self.call("getUpdates", &params).await
    }
}

#[async_trait]
impl Delivery for TelegramClient {
    async fn send(&self, chat: ChatId, message: &OutgoingMessage) -> Result<(), DeliveryError> {
        let params = SendMessageParams {
            chat_id: chat.0,
            text: &message.text,
            parse_mode: message.parse_mode,
        };
        let _: serde_json::Value = self.call("sendMessage", &params).await?;
        tracing::debug!("Message sent to {}", chat);
        Ok(())
    }
}
