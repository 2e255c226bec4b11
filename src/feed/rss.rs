use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::Feed;
use crate::model::NewArticle;

pub struct RssFeed {
    url: String,
    source_id: u64,
    client: reqwest::Client,
}

impl RssFeed {
    pub fn new(url: impl Into<String>, source_id: u64, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            source_id,
            client,
        }
    }
}

#[async_trait]
impl Feed for RssFeed {
    fn name(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> Result<Vec<NewArticle>> {
        let rss = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        parse_channel(&rss, self.source_id, Utc::now())
            .with_context(|| format!("failed to parse feed {}", self.url))
    }
}

/// Maps the items of an RSS document to articles. Items without a title or
/// link are skipped; a missing or malformed `pubDate` falls back to `now`.
pub fn parse_channel(rss: &[u8], source_id: u64, now: DateTime<Utc>) -> Result<Vec<NewArticle>> {
    let channel = rss::Channel::read_from(rss)?;

    let articles = channel
        .items()
        .iter()
        .filter_map(|item| {
            let title = item.title()?.trim();
            let link = item.link()?.trim();
            if title.is_empty() || link.is_empty() {
                return None;
            }

            let published_at = item
                .pub_date()
                .and_then(|date| DateTime::parse_from_rfc2822(date.trim()).ok())
                .map(|date| date.with_timezone(&Utc))
                .unwrap_or(now);

            Some(NewArticle {
                source_id,
                title: title.to_string(),
                link: link.to_string(),
                synopsis: item.description().unwrap_or_default().trim().to_string(),
                published_at,
            })
        })
        .collect();

    Ok(articles)
}
