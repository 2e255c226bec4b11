use anyhow::Result;
use async_trait::async_trait;

use super::{Command, CommandHandler};
use crate::delivery::{Delivery, OutgoingMessage};

pub const START_GREETING: &str =
    "Hi! I pick up fresh articles from the configured feeds and post them to the channel with a short summary.";

/// `/start`
pub struct StartHandler;

#[async_trait]
impl CommandHandler for StartHandler {
    async fn handle(&self, delivery: &dyn Delivery, command: &Command) -> Result<()> {
        delivery
            .send(command.chat, &OutgoingMessage::plain(START_GREETING))
            .await?;
        Ok(())
    }
}
