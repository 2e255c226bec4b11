//! # Command dispatcher
//!
//! Routes inbound updates to the handler registered for their command name.
//! Each update is handled one at a time inside a containment boundary: a
//! handler that panics or runs past the time ceiling is logged and the loop
//! moves on to the next update.

pub mod commands;

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::constant::{INTERNAL_ERROR_REPLY, UPDATE_HANDLING_TIMEOUT};
use crate::delivery::{Delivery, OutgoingMessage};
use crate::errors::Cancelled;
use crate::model::ChatId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command name without the leading `/` and bot mention.
    pub name: String,
    pub args: String,
    pub chat: ChatId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    Command(Command),
    /// Anything that is not a command: plain messages, edits, joins.
    Ignored,
}

#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, delivery: &dyn Delivery, command: &Command) -> Result<()>;
}

/// What happened to a single update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ignored,
    Handled,
    Failed,
    Panicked,
}

pub struct Dispatcher {
    delivery: Arc<dyn Delivery>,
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
    timeout: Duration,
}

impl Dispatcher {
    fn new(
        delivery: Arc<dyn Delivery>,
        handlers: HashMap<String, Arc<dyn CommandHandler>>,
        timeout: Duration,
    ) -> Self {
        Self {
            delivery,
            handlers,
            timeout,
        }
    }

    /// Consumes updates until `token` is cancelled, which is reported as
    /// [`Cancelled`]. A closed update channel is an error.
    pub async fn run(
        &self,
        mut updates: mpsc::Receiver<Update>,
        token: CancellationToken,
    ) -> Result<()> {
        tracing::info!("Dispatcher started with commands: {:?}", self.commands());

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => return Err(Cancelled.into()),
                update = updates.recv() => match update {
                    Some(update) => {
                        self.handle_one(update).await;
                    }
                    None => bail!("update stream closed"),
                },
            }
        }
    }

    pub async fn handle_one(&self, update: Update) -> Outcome {
        let Update::Command(command) = update else {
            return Outcome::Ignored;
        };

        let Some(handler) = self.handlers.get(&command.name) else {
            tracing::debug!("No handler registered for /{}", command.name);
            return Outcome::Ignored;
        };

        tracing::info!(
            "Dispatching /{} args='{}' chat={}",
            command.name,
            command.args,
            command.chat
        );

        let guarded =
            AssertUnwindSafe(handler.handle(self.delivery.as_ref(), &command)).catch_unwind();
        let result = match tokio::time::timeout(self.timeout, guarded).await {
            Ok(Ok(result)) => result,
            Ok(Err(panic)) => {
                tracing::error!(
                    "Panic recovered while handling /{}: {}",
                    command.name,
                    panic_message(&*panic)
                );
                return Outcome::Panicked;
            }
            Err(_) => Err(anyhow!("handler did not finish within {:?}", self.timeout)),
        };

        if let Err(e) = result {
            tracing::error!("Failed to handle /{}: {:#}", command.name, e);

            let reply = OutgoingMessage::plain(INTERNAL_ERROR_REPLY);
            if let Err(e) = self.delivery.send(command.chat, &reply).await {
                tracing::error!("Failed to send error reply to {}: {}", command.chat, e);
            }
            return Outcome::Failed;
        }

        Outcome::Handled
    }

    pub fn commands(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

pub struct DispatcherBuilder {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
    timeout: Duration,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            timeout: UPDATE_HANDLING_TIMEOUT,
        }
    }

    pub fn build(self, delivery: Arc<dyn Delivery>) -> Dispatcher {
        Dispatcher::new(delivery, self.handlers, self.timeout)
    }

    pub fn register_handler(
        mut self,
        name: impl Into<String>,
        handler: impl CommandHandler + 'static,
    ) -> Self {
        let name = name.into();
        if self.handlers.insert(name.clone(), Arc::new(handler)).is_some() {
            tracing::warn!("Handler for /{} registered twice, keeping the last one", name);
        }
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::commands::StartHandler;
    use super::*;
    use crate::testing::RecordingDelivery;

    const CHAT: ChatId = ChatId(7);

    fn command(name: &str) -> Update {
        Update::Command(Command {
            name: name.to_string(),
            args: String::new(),
            chat: CHAT,
        })
    }

    struct Boom;

    #[async_trait]
    impl CommandHandler for Boom {
        async fn handle(&self, _: &dyn Delivery, _: &Command) -> Result<()> {
            panic!("boom");
        }
    }

    struct Failing;

    #[async_trait]
    impl CommandHandler for Failing {
        async fn handle(&self, _: &dyn Delivery, _: &Command) -> Result<()> {
            Err(anyhow!("database is down"))
        }
    }

    struct Sleepy;

    #[async_trait]
    impl CommandHandler for Sleepy {
        async fn handle(&self, _: &dyn Delivery, _: &Command) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl CommandHandler for Counting {
        async fn handle(&self, _: &dyn Delivery, _: &Command) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn dispatcher(delivery: Arc<RecordingDelivery>) -> Dispatcher {
        DispatcherBuilder::new()
            .register_handler("boom", Boom)
            .register_handler("fail", Failing)
            .register_handler("start", StartHandler)
            .build(delivery)
    }

    #[tokio::test]
    async fn panic_in_one_handler_does_not_stop_the_next() {
        let delivery = Arc::new(RecordingDelivery::default());
        let dispatcher = dispatcher(delivery.clone());

        assert_eq!(dispatcher.handle_one(command("boom")).await, Outcome::Panicked);
        assert_eq!(dispatcher.handle_one(command("start")).await, Outcome::Handled);

        let sent = delivery.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, CHAT);
    }

    #[tokio::test]
    async fn unknown_command_invokes_nothing() {
        let delivery = Arc::new(RecordingDelivery::default());
        let counter = Counting::default();
        let dispatcher = DispatcherBuilder::new()
            .register_handler("start", counter.clone())
            .build(delivery.clone());

        assert_eq!(dispatcher.handle_one(command("xyz")).await, Outcome::Ignored);
        assert_eq!(dispatcher.handle_one(Update::Ignored).await, Outcome::Ignored);

        assert_eq!(counter.0.load(Ordering::SeqCst), 0);
        assert!(delivery.sent().is_empty());
    }

    #[tokio::test]
    async fn handler_error_sends_generic_reply() {
        let delivery = Arc::new(RecordingDelivery::default());
        let dispatcher = dispatcher(delivery.clone());

        assert_eq!(dispatcher.handle_one(command("fail")).await, Outcome::Failed);
        assert_eq!(
            delivery.sent(),
            vec![(CHAT, OutgoingMessage::plain(INTERNAL_ERROR_REPLY))]
        );
    }

    #[tokio::test]
    async fn failed_error_reply_is_swallowed() {
        let delivery = Arc::new(RecordingDelivery::failing());
        let dispatcher = dispatcher(delivery.clone());

        assert_eq!(dispatcher.handle_one(command("fail")).await, Outcome::Failed);
        assert_eq!(dispatcher.handle_one(command("start")).await, Outcome::Failed);
    }

    #[tokio::test]
    async fn slow_handler_is_cut_off() {
        let delivery = Arc::new(RecordingDelivery::default());
        let dispatcher = DispatcherBuilder::new()
            .register_handler("slow", Sleepy)
            .with_timeout(Duration::from_millis(20))
            .build(delivery.clone());

        assert_eq!(dispatcher.handle_one(command("slow")).await, Outcome::Failed);
        assert_eq!(delivery.sent().len(), 1);
    }

    #[tokio::test]
    async fn run_processes_updates_in_order_until_stream_closes() {
        let delivery = Arc::new(RecordingDelivery::default());
        let counter = Counting::default();
        let dispatcher = DispatcherBuilder::new()
            .register_handler("boom", Boom)
            .register_handler("count", counter.clone())
            .build(delivery);

        let (tx, rx) = mpsc::channel(8);
        for update in [command("count"), command("boom"), Update::Ignored, command("count")] {
            tx.send(update).await.unwrap();
        }
        drop(tx);

        let err = dispatcher.run(rx, CancellationToken::new()).await.unwrap_err();
        assert!(!err.is::<Cancelled>());
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn run_stops_with_cancelled_error() {
        let dispatcher = dispatcher(Arc::new(RecordingDelivery::default()));
        let (_tx, rx) = mpsc::channel(1);
        let token = CancellationToken::new();
        token.cancel();

        let err = dispatcher.run(rx, token).await.unwrap_err();
        assert!(err.is::<Cancelled>());
    }
}
