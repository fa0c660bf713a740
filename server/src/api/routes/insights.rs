//! Insight generation endpoint

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use super::ApiState;
use crate::api::types::ApiError;
use crate::core::constants::MAX_INSIGHT_TOPICS;
use crate::domain::analysis::TopicSummary;

#[derive(Deserialize)]
pub struct InsightsRequest {
    pub topics: Vec<TopicSummary>,
}

#[derive(Serialize)]
pub struct InsightsResponse {
    pub topics: Vec<TopicSummary>,
}

/// Generate insight records for the submitted topics.
///
/// Topics are processed in order; regenerating for a topic label replaces
/// its stored insight.
pub async fn generate_insights(
    State(state): State<ApiState>,
    Json(request): Json<InsightsRequest>,
) -> Result<Json<InsightsResponse>, ApiError> {
    if request.topics.is_empty() {
        return Err(ApiError::bad_request("NO_TOPICS", "topics must not be empty"));
    }
    if request.topics.len() > MAX_INSIGHT_TOPICS {
        return Err(ApiError::bad_request(
            "TOO_MANY_TOPICS",
            format!("At most {MAX_INSIGHT_TOPICS} topics per request"),
        ));
    }
    if request.topics.iter().any(|t| t.topic.trim().is_empty()) {
        return Err(ApiError::bad_request("EMPTY_TOPIC", "topic label must not be empty"));
    }

    let mut topics = Vec::with_capacity(request.topics.len());
    for topic in &request.topics {
        let enriched = state
            .insights
            .generate(topic)
            .await
            .map_err(ApiError::from_analysis)?;
        topics.push(enriched);
    }

    Ok(Json(InsightsResponse { topics }))
}
