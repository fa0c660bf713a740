//! Gemini structured-output adapter
//!
//! Calls the generateContent REST API with a response schema so the model
//! is forced to answer in JSON. The JSON text still gets parsed and
//! re-validated by callers; the schema only narrows what the model emits.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{LlmError, StructuredModel};
use crate::core::constants::LLM_TIMEOUT_SECS;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl GeminiClient {
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

    fn api_key(&self) -> Result<&str, LlmError> {
        self.api_key
            .as_deref()
            .ok_or(LlmError::MissingApiKey("GEMINI_API_KEY"))
    }
}

#[async_trait]
impl StructuredModel for GeminiClient {
    async fn generate(&self, prompt: &str, schema: &Value) -> Result<Value, LlmError> {
        let key = self.api_key()?;
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": schema,
                "temperature": 0.2
            }
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", key)
            .timeout(Duration::from_secs(LLM_TIMEOUT_SECS))
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
        let text = payload
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .ok_or_else(|| LlmError::Schema("response carries no text part".to_string()))?;

        serde_json::from_str(text)
            .map_err(|e| LlmError::Schema(format!("response text is not valid JSON: {e}")))
    }
}
