mod bot;
mod client;
mod config;
mod constant;
mod delivery;
mod errors;
mod extract;
mod feed;
mod llm;
mod markup;
mod model;
mod notifier;
pub mod store;
mod telegram;
#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::bot::commands::StartHandler;
use crate::bot::DispatcherBuilder;
use crate::client::build_http_client;
use crate::config::Config;
use crate::constant::*;
use crate::errors::Cancelled;
use crate::extract::{Extractor, HttpPageFetcher};
use crate::feed::rss::RssFeed;
use crate::feed::FeedFetcherBuilder;
use crate::llm::OpenAiSummarizer;
use crate::notifier::Notifier;
use crate::store::{ArticleStore, LocalArticleStore, LocalStore};
use crate::telegram::TelegramClient;

#[tokio::main]
async fn main() -> Result<()> {
    setup_env_and_tracing();
    install_panic_hook();

    let config = Config::from_env().context("failed to load config")?;

    #[cfg(feature = "rocks")]
    let local_store = LocalStore::open(&config.store_path)?;
    #[cfg(not(feature = "rocks"))]
    let local_store = LocalStore::new();
    let articles: Arc<dyn ArticleStore> = Arc::new(LocalArticleStore::new(local_store));

    let http = build_http_client(HTTP_TIMEOUT)?;
    let telegram = Arc::new(TelegramClient::new(&config)?);

    let mut fetcher = FeedFetcherBuilder::new(config.fetch_interval)
        .with_keywords(config.filter_keywords.clone());
    for (i, url) in config.feed_urls.iter().enumerate() {
        fetcher = fetcher.with_feed(RssFeed::new(url, i as u64 + 1, http.clone()));
    }
    if config.feed_urls.is_empty() {
        tracing::warn!("FEED_URLS is empty, no new articles will be collected");
    }
    let fetcher = fetcher.build(articles.clone());

    let notifier = Notifier::new(
        articles.clone(),
        Extractor::new(Arc::new(HttpPageFetcher::new(http)))?,
        Arc::new(OpenAiSummarizer::new(&config, build_http_client(LLM_TIMEOUT)?)),
        telegram.clone(),
        config.notification_interval,
        config.telegram_channel_id,
    );

    let dispatcher = DispatcherBuilder::new()
        .register_handler("start", StartHandler)
        .build(telegram.clone());

    let token = CancellationToken::new();
    tokio::spawn({
        let token = token.clone();
        async move {
            if let Err(e) = shutdown_signal().await {
                tracing::error!("Error while waiting for shutdown signal: {}", e);
            }
            tracing::info!("Shutdown signal received");
            token.cancel();
        }
    });

    let (updates_tx, updates_rx) = mpsc::channel(UPDATES_BUFFER);

    let fetcher_task = tokio::spawn({
        let token = token.clone();
        async move { report("Fetcher", fetcher.run(token)).await }
    });
    let notifier_task = tokio::spawn({
        let token = token.clone();
        async move { report("Notifier", notifier.run(token)).await }
    });
    let poller_task = tokio::spawn({
        let token = token.clone();
        let telegram = telegram.clone();
        async move { report("Update poller", telegram.poll_updates(updates_tx, token)).await }
    });

    report("Dispatcher", dispatcher.run(updates_rx, token.clone())).await;

    // Whatever ended the dispatcher, take the rest down with it.
    token.cancel();
    for task in [fetcher_task, notifier_task, poller_task] {
        if let Err(e) = task.await {
            tracing::error!("Task failed to join: {}", e);
        }
    }

    Ok(())
}

/// Awaits a long-running loop and logs how it ended.
async fn report(name: &str, run: impl Future<Output = Result<()>>) {
    match run.await {
        Ok(()) => tracing::info!("{} finished", name),
        Err(e) if e.is::<Cancelled>() => tracing::info!("{} stopped", name),
        Err(e) => tracing::error!("{} failed: {:#}", name, e),
    }
}

pub fn setup_env_and_tracing() {
    dotenv::dotenv().ok();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Routes panics through tracing together with a backtrace of the panic site.
fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::force_capture();
        tracing::error!("{}\n{}", info, backtrace);
    }));
}

async fn shutdown_signal() -> Result<()> {
    let ctrl_c = async { tokio::signal::ctrl_c().await.context("failed to install Ctrl+C handler") };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .context("failed to install SIGTERM handler")?
            .recv()
            .await;
        Ok::<(), anyhow::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<()>>();

    tokio::select! {
        res = ctrl_c => res,
        res = terminate => res,
    }
}
