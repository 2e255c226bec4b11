pub mod rss;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::errors::Cancelled;
use crate::model::NewArticle;
use crate::store::ArticleStore;

#[async_trait]
pub trait Feed: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch(&self) -> Result<Vec<NewArticle>>;
}

/// Periodically pulls every feed and stores the articles it has not seen yet.
pub struct FeedFetcher {
    feeds: Vec<Box<dyn Feed>>,
    articles: Arc<dyn ArticleStore>,
    keywords: Vec<String>,
    interval: Duration,
}

impl FeedFetcher {
    pub async fn run(&self, token: CancellationToken) -> Result<()> {
        let mut timer = tokio::time::interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => return Err(Cancelled.into()),
                _ = timer.tick() => {
                    let stored = self.fetch_once().await;
                    tracing::info!("Fetched feeds, {} new articles stored", stored);
                }
            }
        }
    }

    /// Returns the number of newly stored articles. Failing feeds are logged
    /// and skipped.
    pub async fn fetch_once(&self) -> usize {
        let mut stored = 0;

        for feed in self.feeds.iter() {
            let items = match feed.fetch().await {
                Ok(items) => items,
                Err(e) => {
                    tracing::error!("Failed to fetch feed {}: {:#}", feed.name(), e);
                    continue;
                }
            };

            for item in items.into_iter().filter(|item| self.matches_keywords(item)) {
                match self.articles.store_article(item).await {
                    Ok(Some(_)) => stored += 1,
                    Ok(None) => {}
                    Err(e) => {
                        tracing::error!("Failed to store article from {}: {}", feed.name(), e);
                    }
                }
            }
        }

        stored
    }

    fn matches_keywords(&self, item: &NewArticle) -> bool {
        if self.keywords.is_empty() {
            return true;
        }

        let title = item.title.to_lowercase();
        let synopsis = item.synopsis.to_lowercase();
        self.keywords.iter().any(|keyword| {
            let keyword = keyword.to_lowercase();
            title.contains(&keyword) || synopsis.contains(&keyword)
        })
    }
}

pub struct FeedFetcherBuilder {
    feeds: Vec<Box<dyn Feed>>,
    keywords: Vec<String>,
    interval: Duration,
}

impl FeedFetcherBuilder {
    pub fn new(interval: Duration) -> Self {
        Self {
            feeds: vec![],
            keywords: vec![],
            interval,
        }
    }

    pub fn build(self, articles: Arc<dyn ArticleStore>) -> FeedFetcher {
        FeedFetcher {
            feeds: self.feeds,
            articles,
            keywords: self.keywords,
            interval: self.interval,
        }
    }

    pub fn with_feed(mut self, feed: impl Feed + 'static) -> Self {
        self.feeds.push(Box::new(feed));
        self
    }

    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }
}
