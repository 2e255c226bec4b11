//! Test doubles shared by the unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::delivery::{Delivery, OutgoingMessage};
use crate::errors::{DeliveryError, StoreError};
use crate::llm::Summarizer;
use crate::model::{Article, ArticleId, ChatId, NewArticle};
use crate::store::memory::MemoryStore;
use crate::store::{ArticleStore, LocalArticleStore};

#[derive(Default)]
pub struct RecordingDelivery {
    sent: Mutex<Vec<(ChatId, OutgoingMessage)>>,
    fail: AtomicBool,
}

impl RecordingDelivery {
    pub fn failing() -> Self {
        let delivery = Self::default();
        delivery.set_failing(true);
        delivery
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<(ChatId, OutgoingMessage)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Delivery for RecordingDelivery {
    async fn send(&self, chat: ChatId, message: &OutgoingMessage) -> Result<(), DeliveryError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DeliveryError::Api {
                code: 400,
                description: "Bad Request: chat not found".to_string(),
            });
        }
        self.sent.lock().unwrap().push((chat, message.clone()));
        Ok(())
    }
}

pub enum StubSummarizer {
    Reply(String),
    Fail,
    /// Never answers, like a model stuck behind rate limiting.
    Hang,
}

#[async_trait]
impl Summarizer for StubSummarizer {
    async fn summarize(&self, _text: &str) -> Result<String> {
        match self {
            StubSummarizer::Reply(reply) => Ok(reply.clone()),
            StubSummarizer::Fail => Err(anyhow!("model overloaded")),
            StubSummarizer::Hang => std::future::pending().await,
        }
    }
}

/// In-memory article store that counts `mark_posted` calls and can be told
/// to fail them.
pub struct CountingStore {
    inner: LocalArticleStore<MemoryStore>,
    marks: AtomicUsize,
    fail_marks: AtomicBool,
}

impl CountingStore {
    pub fn new() -> Self {
        Self {
            inner: LocalArticleStore::new(MemoryStore::new()),
            marks: AtomicUsize::new(0),
            fail_marks: AtomicBool::new(false),
        }
    }

    pub fn marks(&self) -> usize {
        self.marks.load(Ordering::SeqCst)
    }

    pub fn set_failing_marks(&self, fail: bool) {
        self.fail_marks.store(fail, Ordering::SeqCst);
    }

    pub fn get(&self, id: ArticleId) -> Article {
        self.inner.get(id).unwrap().expect("article exists")
    }
}

#[async_trait]
impl ArticleStore for CountingStore {
    async fn fetch_unposted(&self, limit: usize) -> Result<Vec<Article>, StoreError> {
        self.inner.fetch_unposted(limit).await
    }

    async fn mark_posted(&self, id: ArticleId) -> Result<(), StoreError> {
        self.marks.fetch_add(1, Ordering::SeqCst);
        if self.fail_marks.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("disk full".to_string()));
        }
        self.inner.mark_posted(id).await
    }

    async fn store_article(&self, article: NewArticle) -> Result<Option<ArticleId>, StoreError> {
        self.inner.store_article(article).await
    }
}
