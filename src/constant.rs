use std::time::Duration;

pub const USER_AGENT: &str = concat!("newsfeed-bot/", env!("CARGO_PKG_VERSION"));

pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";
/// Long-poll window passed to `getUpdates`, in seconds.
pub const UPDATES_POLL_TIMEOUT: u64 = 60;
/// The HTTP timeout for `getUpdates` has to outlive the long-poll window.
pub const UPDATES_HTTP_TIMEOUT: Duration = Duration::from_secs(UPDATES_POLL_TIMEOUT + 30);
pub const UPDATES_RETRY_DELAY: Duration = Duration::from_secs(3);
pub const UPDATES_BUFFER: usize = 100;

/// Upper bound on handling a single inbound update.
pub const UPDATE_HANDLING_TIMEOUT: Duration = Duration::from_secs(5 * 60);

pub const DEFAULT_FETCH_INTERVAL: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_NOTIFICATION_INTERVAL: Duration = Duration::from_secs(60);

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_OPENAI_PROMPT: &str = "You are a news editor. Summarize the article below in two or three \
sentences of plain text, in the language the article is written in. Do not use markdown.";
/// Ceiling on one chat completion request, retries included.
pub const LLM_TIMEOUT: Duration = Duration::from_secs(2 * 60);
/// Characters of article text sent to the summarizer.
pub const SUMMARY_INPUT_LIMIT: usize = 12_000;

pub const INTERNAL_ERROR_REPLY: &str = "internal error";
