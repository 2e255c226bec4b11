use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};

use crate::constant::*;
use crate::model::ChatId;

#[derive(Debug, Clone)]
pub struct Config {
    // Telegram configuration
    pub telegram_bot_token: String,
    pub telegram_channel_id: ChatId,
    pub telegram_api_url: String,

    // store path
    pub store_path: String,

    // Feeds
    pub feed_urls: Vec<String>,
    pub filter_keywords: Vec<String>,
    pub fetch_interval: Duration,
    pub notification_interval: Duration,

    // OpenAI configuration
    pub openai_key: Option<String>,
    pub openai_api_base: Option<String>,
    pub openai_model: String,
    pub openai_prompt: String,
}

impl Config {
    /// Reads the configuration from the process environment. Call
    /// `dotenv::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let required = |key: &str| var(key).ok_or_else(|| anyhow!("{key} is not set"));

        let telegram_bot_token = required("TELEGRAM_BOT_TOKEN")?;
        let telegram_channel_id = required("TELEGRAM_CHANNEL_ID")?
            .trim()
            .parse()
            .map(ChatId)
            .context("TELEGRAM_CHANNEL_ID must be a valid i64")?;
        let telegram_api_url = var("TELEGRAM_API_URL")
            .unwrap_or_else(|| TELEGRAM_API_URL.into())
            .trim_end_matches('/')
            .to_string();

        let store_path = var("STORE_PATH").unwrap_or_else(|| "store".into());

        let feed_urls = var("FEED_URLS").map(|v| split_list(&v)).unwrap_or_default();
        let filter_keywords = var("FILTER_KEYWORDS")
            .map(|v| split_list(&v))
            .unwrap_or_default();
        let fetch_interval = match var("FETCH_INTERVAL") {
            Some(v) => parse_duration(&v).context("FETCH_INTERVAL must be a valid duration")?,
            None => DEFAULT_FETCH_INTERVAL,
        };
        let notification_interval = match var("NOTIFICATION_INTERVAL") {
            Some(v) => {
                parse_duration(&v).context("NOTIFICATION_INTERVAL must be a valid duration")?
            }
            None => DEFAULT_NOTIFICATION_INTERVAL,
        };

        let openai_key = var("OPENAI_KEY");
        let openai_api_base = var("OPENAI_API_BASE");
        let openai_model = var("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.into());
        let openai_prompt = var("OPENAI_PROMPT").unwrap_or_else(|| DEFAULT_OPENAI_PROMPT.into());

        Ok(Config {
            telegram_bot_token,
            telegram_channel_id,
            telegram_api_url,
            store_path,
            feed_urls,
            filter_keywords,
            fetch_interval,
            notification_interval,
            openai_key,
            openai_api_base,
            openai_model,
            openai_prompt,
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self::from_lookup(|key| match key {
            "TELEGRAM_BOT_TOKEN" => Some("123:test".into()),
            "TELEGRAM_CHANNEL_ID" => Some("-100".into()),
            _ => None,
        })
        .expect("test config is valid")
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parses `90`, `30s`, `10m`, `1h` or combinations such as `1h30m`.
fn parse_duration(value: &str) -> Result<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        if secs == 0 {
            bail!("duration must be positive: {value:?}");
        }
        return Ok(Duration::from_secs(secs));
    }

    let mut total = 0u64;
    let mut digits = String::new();
    for c in value.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }

        let unit = match c {
            's' => 1,
            'm' => 60,
            'h' => 60 * 60,
            _ => bail!("unknown duration unit {c:?} in {value:?}"),
        };
        let amount: u64 = digits
            .parse()
            .with_context(|| format!("invalid amount before {c:?} in {value:?}"))?;
        total = amount
            .checked_mul(unit)
            .and_then(|secs| total.checked_add(secs))
            .ok_or_else(|| anyhow!("duration {value:?} is too long"))?;
        digits.clear();
    }

    if !digits.is_empty() {
        bail!("trailing number without unit in {value:?}");
    }
    if total == 0 {
        bail!("duration must be positive: {value:?}");
    }

    Ok(Duration::from_secs(total))
}
