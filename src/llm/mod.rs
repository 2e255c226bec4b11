pub mod openai;

use anyhow::Result;
use async_trait::async_trait;

pub use openai::OpenAiSummarizer;

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Condenses article text into a short digest.
    async fn summarize(&self, text: &str) -> Result<String>;
}
