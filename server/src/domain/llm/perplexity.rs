//! Link reader adapter
//!
//! Uses a search-grounded chat-completions API to turn a URL into a short
//! description of the page behind it.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{LinkReader, LlmError};
use crate::core::constants::LINK_RESOLVE_TIMEOUT_SECS;

const DEFAULT_BASE_URL: &str = "https://api.perplexity.ai";
const DEFAULT_MODEL: &str = "sonar";

const SYSTEM_PROMPT: &str =
    "You summarize web pages. Answer with 2-3 plain sentences describing the \
     content behind the URL the user gives you. No preamble, no markdown.";

pub struct PerplexityClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl PerplexityClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Base URL override, used by tests to point at a local stub
    pub fn with_base_url(api_key: Option<String>, base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

#[async_trait]
impl LinkReader for PerplexityClient {
    async fn describe(&self, url: &str) -> Result<String, LlmError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(LlmError::MissingApiKey("PERPLEXITY_API_KEY"))?;

        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": url }
            ]
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(key)
            .timeout(Duration::from_secs(LINK_RESOLVE_TIMEOUT_SECS))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = response.json().await?;
        let content = payload
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| LlmError::Schema("response carries no message content".to_string()))?;

        Ok(content.trim().to_string())
    }
}
