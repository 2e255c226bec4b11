mod client;
pub mod poller;
pub mod types;

pub use client::TelegramClient;
