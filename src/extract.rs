use std::sync::{Arc, OnceLock};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::model::Article;

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Returns the HTML body of the page at `url`.
    async fn fetch(&self, url: &str) -> Result<String>;
}

pub struct HttpPageFetcher {
    client: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }
}

/// Produces the plain text of an article that is handed to the summarizer.
pub struct Extractor {
    pages: Arc<dyn PageFetcher>,
    containers: Vec<Selector>,
    blocks: Selector,
}

impl Extractor {
    /// Main-content candidates, most specific first.
    const CONTAINERS: [&'static str; 3] = ["article", "main, [role=main]", "body"];
    const BLOCKS: &'static str = "p, h1, h2, h3, h4, h5, h6, li, pre, blockquote";
    const BOILERPLATE: [&'static str; 6] = ["nav", "header", "footer", "aside", "script", "style"];

    pub fn new(pages: Arc<dyn PageFetcher>) -> Result<Self> {
        let containers = Self::CONTAINERS
            .iter()
            .map(|s| parse_selector(s))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            pages,
            containers,
            blocks: parse_selector(Self::BLOCKS)?,
        })
    }

    /// Uses the stored synopsis when there is one, otherwise downloads the
    /// article page and extracts its readable text. Feed descriptions are
    /// often HTML, so a synopsis with tags goes through extraction too.
    pub async fn extract(&self, article: &Article) -> Result<String> {
        let text = if has_markup(&article.synopsis) {
            self.readable_text(&article.synopsis)
        } else if !article.synopsis.trim().is_empty() {
            article.synopsis.clone()
        } else {
            let html = self
                .pages
                .fetch(&article.link)
                .await
                .with_context(|| format!("failed to fetch {}", article.link))?;
            self.readable_text(&html)
        };

        Ok(clean_text(&text))
    }

    pub fn readable_text(&self, html: &str) -> String {
        let document = Html::parse_document(html);

        let container = self.containers.iter().find_map(|selector| {
            document
                .select(selector)
                .max_by_key(|element| element.text().map(str::len).sum::<usize>())
        });
        let Some(container) = container else {
            return collapse_whitespace(document.root_element().text());
        };

        let paragraphs: Vec<String> = container
            .select(&self.blocks)
            .filter(|element| !is_boilerplate(element))
            .map(|element| collapse_whitespace(element.text()))
            .filter(|text| !text.is_empty())
            .collect();

        if paragraphs.is_empty() {
            collapse_whitespace(container.text())
        } else {
            paragraphs.join("\n\n")
        }
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| anyhow!("invalid selector {selector:?}: {e}"))
}

fn is_boilerplate(element: &ElementRef<'_>) -> bool {
    element.ancestors().any(|node| {
        node.value()
            .as_element()
            .is_some_and(|e| Extractor::BOILERPLATE.contains(&e.name()))
    })
}

fn collapse_whitespace<'a>(text: impl Iterator<Item = &'a str>) -> String {
    text.flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn has_markup(text: &str) -> bool {
    static TAG: OnceLock<Regex> = OnceLock::new();
    let re = TAG.get_or_init(|| {
        Regex::new(r"</?[a-zA-Z][a-zA-Z0-9]*[^<>]*>").expect("valid regex")
    });
    re.is_match(text)
}

/// Collapses runs of three or more newlines left behind by markup stripping.
pub fn clean_text(text: &str) -> String {
    static REDUNDANT_NEW_LINES: OnceLock<Regex> = OnceLock::new();
    let re = REDUNDANT_NEW_LINES.get_or_init(|| Regex::new(r"\n{3,}").expect("valid regex"));
    re.replace_all(text, "\n").into_owned()
}
