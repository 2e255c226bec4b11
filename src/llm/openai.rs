use anyhow::Result;
use async_openai::{
    config::OpenAIConfig,
    types::{ChatCompletionRequestMessageArgs, CreateChatCompletionRequestArgs, Role},
    Client,
};
use async_trait::async_trait;

use super::Summarizer;
use crate::config::Config;
use crate::constant::{LLM_TIMEOUT, SUMMARY_INPUT_LIMIT};

/// Summarizer backed by the OpenAI chat completion API. Without an API key it
/// is disabled and produces empty digests.
pub struct OpenAiSummarizer {
    client: Option<Client<OpenAIConfig>>,
    model: String,
    prompt: String,
}

impl OpenAiSummarizer {
    /// `http` should carry a request timeout; the default client of
    /// async-openai has none.
    pub fn new(config: &Config, http: reqwest::Client) -> Self {
        let client = config.openai_key.as_ref().map(|key| {
            let mut openai = OpenAIConfig::new().with_api_key(key.clone());
            if let Some(base) = &config.openai_api_base {
                openai = openai.with_api_base(base.clone());
            }
            Client::with_config(openai).with_http_client(http)
        });

        if client.is_none() {
            tracing::warn!("OPENAI_KEY is not set, articles will be posted without a summary");
        }

        Self {
            client,
            model: config.openai_model.clone(),
            prompt: config.openai_prompt.clone(),
        }
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(&self, text: &str) -> Result<String> {
        let Some(client) = &self.client else {
            tracing::debug!("Summarizer disabled, skipping");
            return Ok(String::new());
        };

        let req = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages([
                ChatCompletionRequestMessageArgs::default()
                    .role(Role::System)
                    .content(&self.prompt)
                    .build()?,
                ChatCompletionRequestMessageArgs::default()
                    .role(Role::User)
                    .content(truncate_chars(text, SUMMARY_INPUT_LIMIT))
                    .build()?,
            ])
            .build()?;

        let resp = tokio::time::timeout(LLM_TIMEOUT, client.chat().create(req))
            .await
            .map_err(|_| anyhow::anyhow!("LLM did not answer within {:?}", LLM_TIMEOUT))??;

        let summary = resp
            .choices
            .first()
            .ok_or(anyhow::anyhow!("No response from LLM"))?
            .message
            .content
            .clone()
            .ok_or(anyhow::anyhow!("No content in response from LLM"))?;

        Ok(summary.trim().to_string())
    }
}

fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::build_http_client;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("привет", 3), "при");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 0), "");
    }

    #[tokio::test]
    async fn disabled_summarizer_returns_empty_digest() {
        let config = Config::for_tests();
        let http = build_http_client(LLM_TIMEOUT).unwrap();
        let summarizer = OpenAiSummarizer::new(&config, http);

        assert_eq!(summarizer.summarize("some text").await.unwrap(), "");
    }
}
