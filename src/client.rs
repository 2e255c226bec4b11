use std::time::Duration;

use anyhow::{Context, Result};

use crate::constant::USER_AGENT;

/// Builds the reqwest client shared by the feed fetcher and page extractor.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .context("failed to build HTTP client")
}
