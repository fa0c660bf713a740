//! Telegram channel access
//!
//! The protocol internals stay behind the `ChannelClient` trait; the
//! shipped implementation reads the public web preview pages, which is
//! enough for public channels and keeps the core independent of any
//! particular protocol library.

pub mod export;
mod preview;

pub use export::{ExportChannel, parse_export};
pub use preview::PreviewClient;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelegramError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Channel fetch returned status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Channel fetch timed out for {0}")]
    Timeout(String),

    #[error("Not a channel URL: {0}")]
    InvalidChannel(String),

    #[error("Malformed data export: {0}")]
    Export(String),
}

/// A message as fetched from a channel, before persistence
#[derive(Debug, Clone)]
pub struct ChannelMessage {
    pub channel_id: String,
    pub message_id: String,
    pub posted_at: DateTime<Utc>,
    pub text: String,
}

/// Source of channel messages over a bounded time window
#[async_trait]
pub trait ChannelClient: Send + Sync {
    async fn fetch_channel_messages(
        &self,
        url: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ChannelMessage>, TelegramError>;
}
