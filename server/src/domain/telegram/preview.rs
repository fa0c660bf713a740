//! Web preview channel client
//!
//! Public channels mirror their recent history on t.me/s/<slug> pages.
//! The markup is stable enough to read with a handful of patterns: one
//! block per message carrying a `data-post` id, a `datetime` attribute,
//! and a text div.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;

use super::{ChannelClient, ChannelMessage, TelegramError};
use crate::core::constants::CHANNEL_FETCH_TIMEOUT_SECS;
use crate::utils::url::channel_slug;

const DEFAULT_BASE_URL: &str = "https://t.me";

static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"datetime="([^"]+)""#).expect("valid datetime regex"));

static TEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)class="tgme_widget_message_text[^"]*"[^>]*>(.*?)</div>"#)
        .expect("valid text regex")
});

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));

pub struct PreviewClient {
    client: reqwest::Client,
    base_url: String,
}

impl Default for PreviewClient {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Base URL override, used by tests to point at a local stub
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ChannelClient for PreviewClient {
    async fn fetch_channel_messages(
        &self,
        url: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ChannelMessage>, TelegramError> {
        let slug = channel_slug(url)
            .ok_or_else(|| TelegramError::InvalidChannel(url.to_string()))?
            .to_string();

        let response = self
            .client
            .get(format!("{}/s/{}", self.base_url, slug))
            .timeout(Duration::from_secs(CHANNEL_FETCH_TIMEOUT_SECS))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TelegramError::Timeout(url.to_string())
                } else {
                    TelegramError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TelegramError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let html = response.text().await?;
        let mut messages = parse_preview_page(&slug, &html);
        messages.retain(|m| m.posted_at >= since && m.posted_at <= until);
        Ok(messages)
    }
}

/// Parse message blocks out of a preview page
fn parse_preview_page(slug: &str, html: &str) -> Vec<ChannelMessage> {
    let mut messages = Vec::new();

    for block in html.split("data-post=\"").skip(1) {
        let Some((post, rest)) = block.split_once('"') else {
            continue;
        };
        let Some(message_id) = post.rsplit('/').next().filter(|id| !id.is_empty()) else {
            continue;
        };

        let Some(posted_at) = TIME_RE
            .captures(rest)
            .and_then(|c| DateTime::parse_from_rfc3339(&c[1]).ok())
            .map(|dt| dt.with_timezone(&Utc))
        else {
            continue;
        };

        let text = TEXT_RE
            .captures(rest)
            .map(|c| html_to_text(&c[1]))
            .unwrap_or_default();

        messages.push(ChannelMessage {
            channel_id: slug.to_string(),
            message_id: message_id.to_string(),
            posted_at,
            text,
        });
    }

    messages.sort_by(|a, b| a.posted_at.cmp(&b.posted_at));
    messages
}

/// Flatten message markup into plain text
fn html_to_text(html: &str) -> String {
    let text = html.replace("<br>", "\n").replace("<br/>", "\n");
    let text = TAG_RE.replace_all(&text, "");
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .trim()
        .to_string()
}
