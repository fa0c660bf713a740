//! Model clients
//!
//! Two opaque external services sit behind traits here: a
//! structured-output model that answers prompts with schema-conforming
//! JSON, and a link reader that turns a URL into a short description.
//! Both are treated as fallible external services; their output is
//! advisory and validated at the boundary by callers.

mod gemini;
mod perplexity;

pub use gemini::GeminiClient;
pub use perplexity::PerplexityClient;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request timed out")]
    Timeout,

    #[error("Response did not match the expected shape: {0}")]
    Schema(String),

    #[error("Missing API key: {0}")]
    MissingApiKey(&'static str),
}

impl LlmError {
    /// Whether a retry could plausibly succeed
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Http(_) | LlmError::Timeout => true,
            LlmError::Status { status, .. } => *status >= 500 || *status == 429,
            LlmError::Schema(_) | LlmError::MissingApiKey(_) => false,
        }
    }
}

/// A model that answers a prompt with JSON conforming to a caller-supplied
/// schema
#[async_trait]
pub trait StructuredModel: Send + Sync {
    async fn generate(&self, prompt: &str, schema: &Value) -> Result<Value, LlmError>;
}

/// A service that produces a short text description of a URL's content
#[async_trait]
pub trait LinkReader: Send + Sync {
    async fn describe(&self, url: &str) -> Result<String, LlmError>;
}
