//! AI orchestration
//!
//! Three services share the pattern: one structured model call, strict
//! validation of the parsed response, one retry, then a hard failure.
//! Transient upstream failures and schema violations are distinct error
//! kinds so the HTTP layer can map them to 503 and 502 respectively.

mod clusterer;
mod insights;
pub mod schema;
mod summarizer;
pub mod types;

pub use clusterer::Clusterer;
pub use insights::InsightsGenerator;
pub use summarizer::{SummaryOutcome, Summarizer};
pub use types::{ChannelGroup, Insight, Period, Resource, Stance, TopicSummary};

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::core::constants::LLM_RETRY_BASE_DELAY_MS;
use crate::data::sqlite::SqliteError;
use crate::domain::llm::{LlmError, StructuredModel};

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Storage error: {0}")]
    Data(#[from] SqliteError),

    #[error("Model unavailable: {0}")]
    Upstream(LlmError),

    #[error("Model returned non-conforming output: {0}")]
    Schema(String),

    #[error("Analysis timed out")]
    Timeout,
}

/// Call the model and validate its output, retrying once.
///
/// A transient upstream failure gets one retry with backoff before
/// surfacing as `Upstream`; a response that parses but fails validation
/// gets one fresh attempt before surfacing as `Schema`.
pub(crate) async fn generate_validated<T>(
    model: &Arc<dyn StructuredModel>,
    permits: &Arc<Semaphore>,
    prompt: &str,
    schema: &Value,
    validate: impl Fn(Value) -> Result<T, String>,
) -> Result<T, AnalysisError> {
    let mut schema_failure = None;

    for attempt in 0..2u32 {
        let outcome = {
            let _permit = permits.acquire().await.expect("semaphore never closed");
            model.generate(prompt, schema).await
        };

        match outcome {
            Ok(value) => match validate(value) {
                Ok(out) => return Ok(out),
                Err(reason) => {
                    tracing::warn!(attempt, reason, "Model response failed validation");
                    schema_failure = Some(reason);
                }
            },
            Err(LlmError::Schema(reason)) => {
                tracing::warn!(attempt, reason, "Model response unparseable");
                schema_failure = Some(reason);
            }
            Err(e) if e.is_transient() && attempt == 0 => {
                tracing::warn!(attempt, error = %e, "Transient model failure, retrying");
                tokio::time::sleep(Duration::from_millis(LLM_RETRY_BASE_DELAY_MS)).await;
            }
            Err(e) => return Err(AnalysisError::Upstream(e)),
        }
    }

    Err(AnalysisError::Schema(
        schema_failure.unwrap_or_else(|| "model kept failing".to_string()),
    ))
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Scripted model stub shared by the analysis service tests

    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::Value;

    use crate::domain::llm::{LlmError, StructuredModel};

    /// Returns each scripted response in turn; repeats the last forever
    pub struct ScriptedModel {
        responses: Mutex<VecDeque<Result<Value, LlmError>>>,
        pub calls: AtomicUsize,
    }

    impl ScriptedModel {
        pub fn new(responses: Vec<Result<Value, LlmError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StructuredModel for ScriptedModel {
        async fn generate(&self, _prompt: &str, _schema: &Value) -> Result<Value, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                responses.pop_front().unwrap()
            } else {
                match responses.front() {
                    Some(Ok(v)) => Ok(v.clone()),
                    Some(Err(e)) => Err(clone_error(e)),
                    None => Err(LlmError::Schema("no scripted response".to_string())),
                }
            }
        }
    }

    fn clone_error(e: &LlmError) -> LlmError {
        match e {
            LlmError::Status { status, body } => LlmError::Status {
                status: *status,
                body: body.clone(),
            },
            LlmError::Timeout => LlmError::Timeout,
            LlmError::Schema(s) => LlmError::Schema(s.clone()),
            LlmError::MissingApiKey(k) => LlmError::MissingApiKey(k),
            LlmError::Http(_) => LlmError::Timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::ScriptedModel;
    use super::*;
    use serde_json::json;

    fn permits() -> Arc<Semaphore> {
        Arc::new(Semaphore::new(2))
    }

    fn accept(value: Value) -> Result<Value, String> {
        Ok(value)
    }

    #[tokio::test]
    async fn test_first_attempt_success() {
        let model: Arc<dyn StructuredModel> =
            Arc::new(ScriptedModel::new(vec![Ok(json!({"ok": true}))]));
        let out = generate_validated(&model, &permits(), "p", &json!({}), accept)
            .await
            .unwrap();
        assert_eq!(out, json!({"ok": true}));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_retried_once_then_success() {
        let scripted = Arc::new(ScriptedModel::new(vec![
            Err(LlmError::Timeout),
            Ok(json!({"ok": true})),
        ]));
        let model: Arc<dyn StructuredModel> = scripted.clone();

        let out = generate_validated(&model, &permits(), "p", &json!({}), accept)
            .await
            .unwrap();
        assert_eq!(out, json!({"ok": true}));
        assert_eq!(scripted.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_transient_failure_is_upstream() {
        let model: Arc<dyn StructuredModel> =
            Arc::new(ScriptedModel::new(vec![Err(LlmError::Timeout)]));
        let err = generate_validated(&model, &permits(), "p", &json!({}), accept)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_validation_failure_retried_then_schema_error() {
        let scripted = Arc::new(ScriptedModel::new(vec![Ok(json!({"bad": 1}))]));
        let model: Arc<dyn StructuredModel> = scripted.clone();

        let err = generate_validated(&model, &permits(), "p", &json!({}), |_| {
            Err::<(), _>("nope".to_string())
        })
        .await
        .unwrap_err();

        assert!(matches!(err, AnalysisError::Schema(reason) if reason == "nope"));
        assert_eq!(scripted.call_count(), 2);
    }

    #[tokio::test]
    async fn test_non_transient_upstream_fails_immediately() {
        let scripted = Arc::new(ScriptedModel::new(vec![Err(LlmError::Status {
            status: 400,
            body: "bad request".to_string(),
        })]));
        let model: Arc<dyn StructuredModel> = scripted.clone();

        let err = generate_validated(&model, &permits(), "p", &json!({}), accept)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Upstream(_)));
        assert_eq!(scripted.call_count(), 1);
    }
}
