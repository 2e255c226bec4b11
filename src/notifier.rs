use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::delivery::{Delivery, OutgoingMessage};
use crate::errors::{Cancelled, CycleError};
use crate::extract::Extractor;
use crate::llm::Summarizer;
use crate::markup::compose_article_message;
use crate::model::{Article, ArticleId, ChatId};
use crate::store::ArticleStore;

/// Posts the freshest undelivered article to the channel on every tick.
pub struct Notifier {
    articles: Arc<dyn ArticleStore>,
    extractor: Extractor,
    summarizer: Arc<dyn Summarizer>,
    delivery: Arc<dyn Delivery>,
    interval: Duration,
    channel: ChatId,
}

impl Notifier {
    pub fn new(
        articles: Arc<dyn ArticleStore>,
        extractor: Extractor,
        summarizer: Arc<dyn Summarizer>,
        delivery: Arc<dyn Delivery>,
        interval: Duration,
        channel: ChatId,
    ) -> Self {
        Self {
            articles,
            extractor,
            summarizer,
            delivery,
            interval,
            channel,
        }
    }

    /// Runs one cycle right away and then one per interval until `token` is
    /// cancelled. A cycle can be interrupted while it prepares the message,
    /// but never between send and mark, so an article that was sent always
    /// gets marked.
    pub async fn run(&self, token: CancellationToken) -> Result<()> {
        let mut timer = tokio::time::interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => return Err(Cancelled.into()),
                _ = timer.tick() => {
                    match self.run_one_cycle(&token).await {
                        Ok(_) => {}
                        Err(CycleError::Cancelled(_)) => return Err(Cancelled.into()),
                        Err(e) if e.is_fatal() => return Err(e.into()),
                        Err(e) => tracing::error!("Notification cycle failed: {}", e),
                    }
                }
            }
        }
    }

    /// Selects, summarizes, sends and marks at most one article. Returns the
    /// id of the delivered article, or `None` when nothing was pending.
    pub async fn run_one_cycle(
        &self,
        token: &CancellationToken,
    ) -> Result<Option<ArticleId>, CycleError> {
        let article = self
            .articles
            .fetch_unposted(1)
            .await
            .map_err(CycleError::Fetch)?
            .into_iter()
            .next();

        let Some(article) = article else {
            tracing::info!("There are no unpublished articles");
            return Ok(None);
        };

        tracing::info!("Preparing article {} '{}'", article.id, article.title);
        let synopsis = tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::info!("Dropping article {} before delivery, shutting down", article.id);
                return Err(CycleError::Cancelled(article.id));
            }
            synopsis = self.synopsis(&article) => synopsis,
        };

        let message = OutgoingMessage::markdown(compose_article_message(&article, &synopsis));
        self.delivery
            .send(self.channel, &message)
            .await
            .map_err(|source| CycleError::Delivery {
                id: article.id,
                source,
            })?;
        tracing::info!("The article '{}' has been sent", article.title);

        self.articles
            .mark_posted(article.id)
            .await
            .map_err(|source| CycleError::MarkPosted {
                id: article.id,
                source,
            })?;

        Ok(Some(article.id))
    }

    /// Summary of the article, or an empty string when extraction or
    /// summarization fails. A bad article must not block the queue.
    async fn synopsis(&self, article: &Article) -> String {
        let text = match self.extractor.extract(article).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("Failed to extract text of article {}: {:#}", article.id, e);
                return String::new();
            }
        };

        if text.trim().is_empty() {
            tracing::warn!("Article {} has no text to summarize", article.id);
            return String::new();
        }

        match self.summarizer.summarize(&text).await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::error!("Failed to summarize article {}: {:#}", article.id, e);
                String::new()
            }
        }
    }
}
