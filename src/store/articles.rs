use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{Store, StoreMap, WriteBatch};
use crate::errors::StoreError;
use crate::model::{Article, ArticleId, NewArticle};

#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Returns at most `limit` undelivered articles, most recently published
    /// first.
    async fn fetch_unposted(&self, limit: usize) -> Result<Vec<Article>, StoreError>;

    /// Records the delivery time of an article. Once set it is never moved.
    async fn mark_posted(&self, id: ArticleId) -> Result<(), StoreError>;

    /// Inserts a new article and returns its id, or `None` when an article
    /// with the same link already exists.
    async fn store_article(&self, article: NewArticle) -> Result<Option<ArticleId>, StoreError>;
}

/// Index key ordering undelivered articles newest first: both halves are
/// bitwise-inverted big-endian integers, so ascending byte order is
/// descending `(published_at, id)`.
type UnpostedKey = ([u8; 8], [u8; 8]);

fn unposted_key(article: &Article) -> UnpostedKey {
    // Flipping the sign bit maps i64 onto u64 preserving order.
    let millis = (article.published_at.timestamp_millis() as u64) ^ (1 << 63);
    ((!millis).to_be_bytes(), (!article.id).to_be_bytes())
}

/// [`ArticleStore`] on top of an embedded key-value [`Store`].
pub struct LocalArticleStore<S: Store> {
    articles: StoreMap<ArticleId, Article, S>,
    unposted: StoreMap<UnpostedKey, ArticleId, S>,
    links: StoreMap<String, ArticleId, S>,
    meta: StoreMap<String, u64, S>,
    store: S,
    // Serializes read-modify-write cycles; each one commits a single batch.
    write_lock: Mutex<()>,
}

impl<S: Store> LocalArticleStore<S> {
    const ARTICLES_PREFIX: &'static str = "article/";
    const UNPOSTED_PREFIX: &'static str = "unposted/";
    const LINKS_PREFIX: &'static str = "link/";
    const META_PREFIX: &'static str = "meta/";
    const LAST_ID_KEY: &'static str = "last_article_id";

    pub fn new(store: S) -> Self {
        Self {
            articles: store.open_map(Self::ARTICLES_PREFIX),
            unposted: store.open_map(Self::UNPOSTED_PREFIX),
            links: store.open_map(Self::LINKS_PREFIX),
            meta: store.open_map(Self::META_PREFIX),
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub fn get(&self, id: ArticleId) -> Result<Option<Article>, StoreError> {
        self.articles.get(&id)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>, StoreError> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::Backend("article store lock poisoned".to_string()))
    }

    fn fetch_unposted_sync(&self, limit: usize) -> Result<Vec<Article>, StoreError> {
        let mut result = Vec::with_capacity(limit.min(16));
        for (_, id) in self.unposted.iter()? {
            if result.len() >= limit {
                break;
            }

            match self.articles.get(&id)? {
                Some(article) if !article.is_delivered() => result.push(article),
                Some(_) => tracing::warn!("Article {} is indexed as unposted but delivered", id),
                None => tracing::warn!("Unposted index points to missing article {}", id),
            }
        }

        Ok(result)
    }

    fn mark_posted_sync(&self, id: ArticleId, at: DateTime<Utc>) -> Result<(), StoreError> {
        let _guard = self.lock()?;

        let mut article = self.articles.get(&id)?.ok_or(StoreError::NotFound(id))?;
        if article.is_delivered() {
            tracing::debug!("Article {} is already marked as posted", id);
            return Ok(());
        }

        article.delivered_at = Some(at);
        let mut batch = WriteBatch::new();
        self.articles.insert_in(&mut batch, &id, &article)?;
        self.unposted.remove_in(&mut batch, &unposted_key(&article))?;
        self.store.write(batch)
    }

    fn store_article_sync(&self, new: NewArticle) -> Result<Option<ArticleId>, StoreError> {
        let _guard = self.lock()?;

        if self.links.contains(&new.link)? {
            tracing::debug!("Skipping duplicate article {}", new.link);
            return Ok(None);
        }

        let last_id = self
            .meta
            .get(&Self::LAST_ID_KEY.to_string())?
            .unwrap_or_default();
        let id = last_id + 1;
        let article = new.into_article(id);

        let mut batch = WriteBatch::new();
        self.articles.insert_in(&mut batch, &id, &article)?;
        self.unposted.insert_in(&mut batch, &unposted_key(&article), &id)?;
        self.links.insert_in(&mut batch, &article.link, &id)?;
        self.meta.insert_in(&mut batch, &Self::LAST_ID_KEY.to_string(), &id)?;
        self.store.write(batch)?;

        Ok(Some(id))
    }
}

#[async_trait]
impl<S: Store + 'static> ArticleStore for LocalArticleStore<S> {
    async fn fetch_unposted(&self, limit: usize) -> Result<Vec<Article>, StoreError> {
        self.fetch_unposted_sync(limit)
    }

    async fn mark_posted(&self, id: ArticleId) -> Result<(), StoreError> {
        self.mark_posted_sync(id, Utc::now())
    }

    async fn store_article(&self, article: NewArticle) -> Result<Option<ArticleId>, StoreError> {
        self.store_article_sync(article)
    }
}
