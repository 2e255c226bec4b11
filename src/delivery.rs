use async_trait::async_trait;
use serde::Serialize;

use crate::errors::DeliveryError;
use crate::model::ChatId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParseMode {
    MarkdownV2,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub text: String,
    /// `None` sends the text as is, without entity parsing.
    pub parse_mode: Option<ParseMode>,
}

impl OutgoingMessage {
    /// Text already escaped with [`crate::markup::escape_markdown`].
    pub fn markdown(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parse_mode: Some(ParseMode::MarkdownV2),
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parse_mode: None,
        }
    }
}

#[async_trait]
pub trait Delivery: Send + Sync {
    async fn send(&self, chat: ChatId, message: &OutgoingMessage) -> Result<(), DeliveryError>;
}
