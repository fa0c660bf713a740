//! Topic summarization
//!
//! Loads the message window, builds one prompt carrying message texts and
//! their resolved-link summaries, and asks the structured model for a
//! ranked topic list. Member message ids are validated against the loaded
//! window; importance outside [1,10] is a schema violation.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use sqlx::SqlitePool;
use tokio::sync::Semaphore;

use super::schema::topics_schema;
use super::types::{Period, TopicSummary};
use super::{AnalysisError, generate_validated};
use crate::core::constants::{MAX_TOPICS, MESSAGE_TRUNCATE_CHARS, SUMMARIZE_DEADLINE_SECS};
use crate::data::sqlite::repositories::{message, message::Message, summary};
use crate::domain::llm::StructuredModel;
use crate::utils::string::truncate_chars;

/// Result of a summarization request
#[derive(Debug, PartialEq)]
pub struct SummaryOutcome {
    pub topics: Vec<TopicSummary>,
    pub no_messages_found: bool,
}

pub struct Summarizer {
    pool: SqlitePool,
    model: Arc<dyn StructuredModel>,
    permits: Arc<Semaphore>,
    deadline: Duration,
}

impl Summarizer {
    pub fn new(pool: SqlitePool, model: Arc<dyn StructuredModel>, permits: Arc<Semaphore>) -> Self {
        Self {
            pool,
            model,
            permits,
            deadline: Duration::from_secs(SUMMARIZE_DEADLINE_SECS),
        }
    }

    #[cfg(test)]
    fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Summarize the message window into at most `MAX_TOPICS` topics.
    ///
    /// An empty window short-circuits without a model call. An empty
    /// `sources` slice means all known sources.
    pub async fn summarize(
        &self,
        period: Period,
        sources: &[String],
    ) -> Result<SummaryOutcome, AnalysisError> {
        let until = Utc::now();
        let since = until - period.duration();

        let messages =
            message::in_window(&self.pool, sources, since.timestamp(), until.timestamp()).await?;
        if messages.is_empty() {
            return Ok(SummaryOutcome {
                topics: Vec::new(),
                no_messages_found: true,
            });
        }

        let valid_ids: HashSet<i64> = messages.iter().map(|m| m.id).collect();
        let prompt = build_prompt(&messages);
        let schema = topics_schema();

        let generated = tokio::time::timeout(
            self.deadline,
            generate_validated(&self.model, &self.permits, &prompt, &schema, |value| {
                validate_topics(value, &valid_ids)
            }),
        )
        .await
        .map_err(|_| AnalysisError::Timeout)??;

        let mut topics = generated;
        let mut consumed: Vec<i64> = Vec::new();
        for topic in &mut topics {
            let id = summary::save_topic(
                &self.pool,
                &topic.topic,
                &topic.metatopic,
                topic.importance as i64,
                &topic.message_ids,
            )
            .await?;
            topic.id = Some(id);
            consumed.extend(&topic.message_ids);
        }

        consumed.sort_unstable();
        consumed.dedup();
        message::mark_processed(&self.pool, &consumed).await?;

        tracing::info!(
            topics = topics.len(),
            messages = messages.len(),
            "Summarization finished"
        );
        Ok(SummaryOutcome {
            topics,
            no_messages_found: false,
        })
    }
}

/// Assemble the summarization prompt over the loaded window
fn build_prompt(messages: &[Message]) -> String {
    let mut prompt = String::from(
        "You analyze message-channel content. Group the messages below into \
         salient topics. For each topic give a short label, a broader \
         metatopic, an importance from 1 (minor) to 10 (critical), a 2-4 \
         sentence summary, and the ids of the member messages. Use only the \
         ids that appear below.\n\nMessages:\n",
    );

    for msg in messages {
        prompt.push_str(&format!(
            "\n[id={}] {}\n{}\n",
            msg.id,
            msg.source_url,
            truncate_chars(&msg.text, MESSAGE_TRUNCATE_CHARS)
        ));

        if let Some(links) = &msg.resolved_links {
            if let Ok(map) = serde_json::from_str::<serde_json::Map<String, Value>>(links) {
                for (url, summary) in map {
                    if let Some(text) = summary.as_str() {
                        prompt.push_str(&format!("  linked page {url}: {text}\n"));
                    }
                }
            }
        }
    }

    prompt
}

#[derive(Deserialize)]
struct TopicsPayload {
    topics: Vec<TopicSummary>,
}

/// Validate a model response against the loaded window.
///
/// Importance out of range rejects the response; unknown member ids are
/// filtered out and topics left with no members are dropped.
fn validate_topics(value: Value, valid_ids: &HashSet<i64>) -> Result<Vec<TopicSummary>, String> {
    let payload: TopicsPayload =
        serde_json::from_value(value).map_err(|e| format!("unexpected shape: {e}"))?;

    let mut topics = payload.topics;
    topics.truncate(MAX_TOPICS);

    for topic in &topics {
        if !(1..=10).contains(&topic.importance) {
            return Err(format!(
                "importance {} out of range for topic {:?}",
                topic.importance, topic.topic
            ));
        }
    }

    for topic in &mut topics {
        topic.message_ids.retain(|id| valid_ids.contains(id));
    }
    topics.retain(|t| !t.message_ids.is_empty());

    Ok(topics)
}
