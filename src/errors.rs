use thiserror::Error;

use crate::model::ArticleId;

/// Returned by a long-running loop when the shared cancellation token fires.
/// Callers treat it as a normal stop, not a failure.
#[derive(Debug, Error)]
#[error("stopped by cancellation")]
pub struct Cancelled;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("article {0} not found")]
    NotFound(ArticleId),

    #[error("failed to encode or decode a store record: {0}")]
    Codec(#[from] bincode::Error),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("failed to send HTTP request: {0}")]
    Http(#[from] reqwest::Error),

    #[error("telegram API rejected the request ({code}): {description}")]
    Api { code: i32, description: String },

    #[error("telegram API returned no result for {0}")]
    EmptyResult(&'static str),
}

/// Failure of one notification cycle.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("failed to fetch undelivered articles: {0}")]
    Fetch(#[source] StoreError),

    #[error("failed to deliver article {id}: {source}")]
    Delivery {
        id: ArticleId,
        #[source]
        source: DeliveryError,
    },

    #[error("article {id} was delivered but could not be marked as posted: {source}")]
    MarkPosted {
        id: ArticleId,
        #[source]
        source: StoreError,
    },

    #[error("cycle for article {0} cancelled before delivery")]
    Cancelled(ArticleId),
}

impl CycleError {
    /// Only a failed mark after a successful send endangers the delivery
    /// ledger; everything else is retried on the next tick.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CycleError::MarkPosted { .. })
    }
}
