//! Channel clustering
//!
//! Groups an imported channel list into labeled topics with one
//! structured model call. The response must be a partition of the input:
//! unknown ids are dropped, a missing or doubly-assigned id rejects the
//! response. Coarse progress is emitted on the caller's request id.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Semaphore;

use super::schema::clusters_schema;
use super::types::ChannelGroup;
use super::{AnalysisError, generate_validated};
use crate::domain::llm::StructuredModel;
use crate::domain::progress::{ProgressBus, ProgressEvent};
use crate::domain::telegram::ExportChannel;

pub struct Clusterer {
    model: Arc<dyn StructuredModel>,
    permits: Arc<Semaphore>,
    progress: Arc<ProgressBus>,
}

impl Clusterer {
    pub fn new(
        model: Arc<dyn StructuredModel>,
        permits: Arc<Semaphore>,
        progress: Arc<ProgressBus>,
    ) -> Self {
        Self {
            model,
            permits,
            progress,
        }
    }

    /// Partition the channels into named topic groups.
    ///
    /// Every input channel appears in exactly one returned group. The
    /// caller's request id receives coarse progress and a terminal event.
    pub async fn cluster(
        &self,
        channels: &[ExportChannel],
        request_id: &str,
    ) -> Result<Vec<ChannelGroup>, AnalysisError> {
        let total = channels.len() as u64;
        self.progress.emit(
            request_id,
            ProgressEvent::new(0, total, "Analyzing channels"),
        );

        let prompt = build_prompt(channels);
        let schema = clusters_schema();

        let result = generate_validated(&self.model, &self.permits, &prompt, &schema, |value| {
            validate_clusters(value, channels)
        })
        .await;

        match result {
            Ok(groups) => {
                self.progress.emit(
                    request_id,
                    ProgressEvent::new(total, total, "Processing AI response"),
                );
                self.progress.complete(request_id);
                tracing::info!(
                    channels = channels.len(),
                    groups = groups.len(),
                    "Clustering finished"
                );
                Ok(groups)
            }
            Err(e) => {
                self.progress.fail(request_id, &e.to_string());
                Err(e)
            }
        }
    }
}

fn build_prompt(channels: &[ExportChannel]) -> String {
    let mut prompt = String::from(
        "Group the following channels into a small set of thematic topics. \
         Every channel id must appear in exactly one group. For each group \
         give a short topic label, the ISO-639-1 code of the dominant \
         language of the channel names, and the member channel ids.\n\n\
         Channels:\n",
    );

    for channel in channels {
        prompt.push_str(&format!("- id={} name={:?}", channel.id, channel.name));
        if let Some(url) = &channel.url {
            prompt.push_str(&format!(" url={url}"));
        }
        prompt.push('\n');
    }

    prompt
}

#[derive(Deserialize)]
struct ClustersPayload {
    topics: Vec<ClusterEntry>,
}

#[derive(Deserialize)]
struct ClusterEntry {
    topic: String,
    language: String,
    channel_ids: Vec<String>,
}

/// Check the response is a partition of the input channel set
fn validate_clusters(
    value: Value,
    channels: &[ExportChannel],
) -> Result<Vec<ChannelGroup>, String> {
    let payload: ClustersPayload =
        serde_json::from_value(value).map_err(|e| format!("unexpected shape: {e}"))?;

    let by_id: HashMap<&str, &ExportChannel> =
        channels.iter().map(|c| (c.id.as_str(), c)).collect();

    let mut seen: HashSet<&str> = HashSet::new();
    let mut groups = Vec::new();

    for entry in &payload.topics {
        let language = entry.language.trim().to_ascii_lowercase();
        if language.len() != 2 || !language.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(format!(
                "language {:?} is not an ISO-639-1 code",
                entry.language
            ));
        }

        let mut members = Vec::new();
        for id in &entry.channel_ids {
            let Some(channel) = by_id.get(id.as_str()) else {
                tracing::debug!(id, "Unknown channel id in cluster response, dropped");
                continue;
            };
            if !seen.insert(channel.id.as_str()) {
                return Err(format!("channel {id} assigned to more than one group"));
            }
            members.push((*channel).clone());
        }

        if !members.is_empty() {
            groups.push(ChannelGroup {
                topic: entry.topic.clone(),
                language,
                channels: members,
            });
        }
    }

    if seen.len() != channels.len() {
        let missing: Vec<&str> = channels
            .iter()
            .map(|c| c.id.as_str())
            .filter(|id| !seen.contains(id))
            .collect();
        return Err(format!("channels not assigned to any group: {missing:?}"));
    }

    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::domain::analysis::test_support::ScriptedModel;
    use crate::domain::progress::COMPLETE_MESSAGE;

    fn channels() -> Vec<ExportChannel> {
        vec![
            ExportChannel {
                id: "a".into(),
                name: "Alice".into(),
                url: None,
                last_message_date: None,
                left: None,
            },
            ExportChannel {
                id: "b".into(),
                name: "Bob".into(),
                url: None,
                last_message_date: None,
                left: None,
            },
        ]
    }

    fn clusterer(model: Arc<ScriptedModel>, progress: Arc<ProgressBus>) -> Clusterer {
        Clusterer::new(model, Arc::new(Semaphore::new(2)), progress)
    }

    #[tokio::test]
    async fn test_partition_preserves_all_channels() {
        let response = json!({
            "topics": [{ "topic": "T1", "language": "en", "channel_ids": ["a", "b"] }]
        });
        let progress = Arc::new(ProgressBus::new());
        let clusterer = clusterer(
            Arc::new(ScriptedModel::new(vec![Ok(response)])),
            Arc::clone(&progress),
        );

        let groups = clusterer.cluster(&channels(), "r1").await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].topic, "T1");
        assert_eq!(groups[0].language, "en");
        assert_eq!(groups[0].channels.len(), 2);
        assert_eq!(groups[0].channels[0].name, "Alice");

        // Coarse progress then terminal
        let mut sub = progress.subscribe("r1").unwrap();
        assert_eq!(sub.next().await.unwrap().current_channel, "Analyzing channels");
        assert_eq!(
            sub.next().await.unwrap().current_channel,
            "Processing AI response"
        );
        assert_eq!(sub.next().await.unwrap().current_channel, COMPLETE_MESSAGE);
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn test_missing_channel_rejected_then_schema_error() {
        let response = json!({
            "topics": [{ "topic": "T1", "language": "en", "channel_ids": ["a"] }]
        });
        let scripted = Arc::new(ScriptedModel::new(vec![Ok(response)]));
        let progress = Arc::new(ProgressBus::new());
        let clusterer = clusterer(scripted.clone(), Arc::clone(&progress));

        let err = clusterer.cluster(&channels(), "r1").await.unwrap_err();
        assert!(matches!(err, AnalysisError::Schema(_)));
        assert_eq!(scripted.call_count(), 2);

        // Terminal error rides the stream
        let mut sub = progress.subscribe("r1").unwrap();
        let mut last = None;
        while let Some(event) = sub.next().await {
            last = Some(event);
        }
        assert!(last.unwrap().error.is_some());
    }

    #[tokio::test]
    async fn test_unknown_ids_dropped_duplicates_rejected() {
        let unknown = json!({
            "topics": [
                { "topic": "T1", "language": "en", "channel_ids": ["a", "ghost"] },
                { "topic": "T2", "language": "en", "channel_ids": ["b"] }
            ]
        });
        let progress = Arc::new(ProgressBus::new());
        let clusterer = clusterer(
            Arc::new(ScriptedModel::new(vec![Ok(unknown)])),
            Arc::clone(&progress),
        );
        let groups = clusterer.cluster(&channels(), "r1").await.unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].channels.len(), 1);

        let duplicated = json!({
            "topics": [
                { "topic": "T1", "language": "en", "channel_ids": ["a", "b"] },
                { "topic": "T2", "language": "en", "channel_ids": ["a"] }
            ]
        });
        let clusterer = clusterer2(duplicated, Arc::new(ProgressBus::new()));
        let err = clusterer.cluster(&channels(), "r2").await.unwrap_err();
        assert!(matches!(err, AnalysisError::Schema(_)));
    }

    fn clusterer2(response: Value, progress: Arc<ProgressBus>) -> Clusterer {
        Clusterer::new(
            Arc::new(ScriptedModel::new(vec![Ok(response)])),
            Arc::new(Semaphore::new(2)),
            progress,
        )
    }

    #[tokio::test]
    async fn test_bad_language_code_rejected() {
        let response = json!({
            "topics": [{ "topic": "T1", "language": "english", "channel_ids": ["a", "b"] }]
        });
        let clusterer = clusterer2(response, Arc::new(ProgressBus::new()));
        let err = clusterer.cluster(&channels(), "r1").await.unwrap_err();
        assert!(matches!(err, AnalysisError::Schema(_)));
    }
}
