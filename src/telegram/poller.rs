use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::types::RawUpdate;
use crate::bot::Update;
use crate::errors::{Cancelled, DeliveryError};

#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// Returns the updates with an id of at least `offset`, waiting for new
    /// ones when there are none yet.
    async fn get_updates(&self, offset: i64) -> Result<Vec<RawUpdate>, DeliveryError>;
}

/// Forwards every update from `source` to `updates` until `token` is
/// cancelled. Each batch moves the offset past the highest update id seen so
/// that the server drops acknowledged updates. Polling errors are logged and
/// retried after `retry_delay`.
pub async fn poll_updates<U: UpdateSource + ?Sized>(
    source: &U,
    updates: mpsc::Sender<Update>,
    token: CancellationToken,
    retry_delay: Duration,
) -> Result<()> {
    let mut offset = 0;

    loop {
        let batch = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(Cancelled.into()),
            batch = source.get_updates(offset) => batch,
        };

        match batch {
            Ok(batch) => {
                for raw in batch {
                    offset = offset.max(raw.update_id + 1);
                    if updates.send(raw.into_update()).await.is_err() {
                        bail!("update receiver dropped");
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Failed to get updates: {}", e);
                tokio::select! {
                    _ = token.cancelled() => return Err(Cancelled.into()),
                    _ = tokio::time::sleep(retry_delay) => {}
                }
            }
        }
    }
}
