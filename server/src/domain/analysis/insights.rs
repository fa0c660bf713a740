//! Insight generation
//!
//! One structured model call per topic. The stance enum and list-field
//! invariants are enforced on the parsed response; the persisted record
//! overwrites any prior insight for the same topic label.

use std::sync::Arc;

use serde_json::Value;
use sqlx::SqlitePool;
use tokio::sync::Semaphore;

use super::schema::insight_schema;
use super::types::{Insight, TopicSummary};
use super::{AnalysisError, generate_validated};
use crate::data::sqlite::repositories::summary;
use crate::domain::llm::StructuredModel;

pub struct InsightsGenerator {
    pool: SqlitePool,
    model: Arc<dyn StructuredModel>,
    permits: Arc<Semaphore>,
}

impl InsightsGenerator {
    pub fn new(pool: SqlitePool, model: Arc<dyn StructuredModel>, permits: Arc<Semaphore>) -> Self {
        Self {
            pool,
            model,
            permits,
        }
    }

    /// Produce the insight record for one topic and return the topic with
    /// the record attached. Safe to call repeatedly; the latest record
    /// wins.
    pub async fn generate(&self, topic: &TopicSummary) -> Result<TopicSummary, AnalysisError> {
        let prompt = build_prompt(topic);
        let schema = insight_schema();

        let insight =
            generate_validated(&self.model, &self.permits, &prompt, &schema, validate_insight)
                .await?;

        let record = serde_json::to_string(&insight)
            .map_err(|e| AnalysisError::Schema(format!("unserializable insight: {e}")))?;
        summary::save_insight(&self.pool, &topic.topic, &record).await?;

        tracing::info!(topic = %topic.topic, stance = ?insight.stance, "Insight generated");

        let mut out = topic.clone();
        out.insights = Some(insight);
        Ok(out)
    }
}

fn build_prompt(topic: &TopicSummary) -> String {
    format!(
        "You produce a cautious analytical read of a news topic for an \
         investor audience. The output is advisory, never a recommendation.\n\n\
         Topic: {}\nMetatopic: {}\nImportance: {}/10\nSummary: {}\n\n\
         Give an analysis summary, an overall stance, the rationale for \
         long/short/neutral readings where applicable, concrete risks and \
         watchouts, key questions the reader should answer for themselves, \
         instrument classes that would express a long or short view, and \
         useful resources with URLs. Omit any field that does not apply.",
        topic.topic, topic.metatopic, topic.importance, topic.summary
    )
}

fn validate_insight(value: Value) -> Result<Insight, String> {
    let mut insight: Insight =
        serde_json::from_value(value).map_err(|e| format!("unexpected shape: {e}"))?;

    if insight.analysis_summary.trim().is_empty() {
        return Err("empty analysis_summary".to_string());
    }

    insight.normalize();
    Ok(insight)
}
