use serde::{Deserialize, Serialize};

use crate::bot::{Command, Update};
use crate::delivery::ParseMode;
use crate::errors::DeliveryError;
use crate::model::ChatId;

#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i32>,
}

impl<T> ApiResponse<T> {
    pub fn into_result(self, method: &'static str) -> Result<T, DeliveryError> {
        if !self.ok {
            return Err(DeliveryError::Api {
                code: self.error_code.unwrap_or_default(),
                description: self
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            });
        }
        self.result.ok_or(DeliveryError::EmptyResult(method))
    }
}

#[derive(Debug, Serialize)]
pub struct SendMessageParams<'a> {
    pub chat_id: i64,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
}

#[derive(Debug, Serialize)]
pub struct GetUpdatesParams {
    pub offset: i64,
    pub timeout: u64,
    pub allowed_updates: &'static [&'static str],
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawUpdate {
    pub update_id: i64,
    pub message: Option<RawMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMessage {
    pub chat: RawChat,
    pub text: Option<String>,
    #[serde(default)]
    pub entities: Vec<MessageEntity>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawChat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageEntity {
    #[serde(rename = "type")]
    pub kind: String,
    pub offset: usize,
}

impl RawUpdate {
    pub fn into_update(self) -> Update {
        self.message
            .as_ref()
            .and_then(RawMessage::command)
            .map_or(Update::Ignored, Update::Command)
    }
}

impl RawMessage {
    /// A message is a command when its first entity is a `bot_command`
    /// starting at offset 0, e.g. `/start@news_bot some args`.
    pub fn command(&self) -> Option<Command> {
        let text = self.text.as_deref()?;
        let entity = self.entities.first()?;
        if entity.kind != "bot_command" || entity.offset != 0 {
            return None;
        }

        let (head, args) = match text.split_once(char::is_whitespace) {
            Some((head, args)) => (head, args.trim()),
            None => (text, ""),
        };
        let name = head.strip_prefix('/')?;
        let name = name.split_once('@').map_or(name, |(name, _)| name);
        if name.is_empty() {
            return None;
        }

        Some(Command {
            name: name.to_string(),
            args: args.to_string(),
            chat: ChatId(self.chat.id),
        })
    }
}
