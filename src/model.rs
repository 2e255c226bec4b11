use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type ArticleId = u64;

/// Telegram chat or channel id that messages are sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(pub i64);

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    pub source_id: u64,
    pub title: String,
    pub link: String,
    /// Synopsis shipped with the feed item. Empty when the feed had none.
    pub synopsis: String,
    pub published_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl Article {
    pub fn is_delivered(&self) -> bool {
        self.delivered_at.is_some()
    }
}

/// An article as produced by ingestion, before the store assigns its id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    pub source_id: u64,
    pub title: String,
    pub link: String,
    pub synopsis: String,
    pub published_at: DateTime<Utc>,
}

impl NewArticle {
    pub(crate) fn into_article(self, id: ArticleId) -> Article {
        Article {
            id,
            source_id: self.source_id,
            title: self.title,
            link: self.link,
            synopsis: self.synopsis,
            published_at: self.published_at,
            delivered_at: None,
        }
    }
}
