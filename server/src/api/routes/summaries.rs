//! Topic summarization endpoint

use axum::Json;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::http::header::HeaderValue;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ApiState;
use crate::api::types::ApiError;
use crate::core::constants::MAX_SOURCES_PER_REQUEST;
use crate::domain::analysis::{Period, TopicSummary};
use crate::utils::string::parse_csv_param;
use crate::utils::url::canonicalize;

#[derive(Deserialize)]
pub struct SummariesQuery {
    pub period: Option<String>,
    pub sources: Option<String>,
}

#[derive(Serialize)]
pub struct SummariesResponse {
    pub topics: Vec<TopicSummary>,
    #[serde(rename = "noMessagesFound", skip_serializing_if = "std::ops::Not::not")]
    pub no_messages_found: bool,
}

/// Summarize the message window for a period and source set.
///
/// An absent or empty source list means all known sources. The response
/// carries an `X-Request-ID` header correlating the request in logs.
pub async fn get_summaries(
    State(state): State<ApiState>,
    Query(query): Query<SummariesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let period: Period = query
        .period
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("MISSING_PERIOD", "period is required"))?
        .parse()
        .map_err(|e: String| ApiError::bad_request("INVALID_PERIOD", e))?;

    let mut sources = Vec::new();
    for raw in parse_csv_param(query.sources.as_deref().unwrap_or_default()) {
        let url = canonicalize(&raw)
            .map_err(|e| ApiError::bad_request("INVALID_SOURCE_URL", e))?;
        sources.push(url);
    }
    if sources.len() > MAX_SOURCES_PER_REQUEST {
        return Err(ApiError::bad_request(
            "TOO_MANY_SOURCES",
            format!("At most {MAX_SOURCES_PER_REQUEST} sources per request"),
        ));
    }

    let request_id = Uuid::new_v4().to_string();
    tracing::info!(request_id, ?period, sources = sources.len(), "Summarization requested");

    let outcome = state
        .summarizer
        .summarize(period, &sources)
        .await
        .map_err(ApiError::from_analysis)?;

    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        headers.insert("X-Request-ID", value);
    }

    Ok((
        headers,
        Json(SummariesResponse {
            topics: outcome.topics,
            no_messages_found: outcome.no_messages_found,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_messages_flag_omitted_when_false() {
        let response = SummariesResponse {
            topics: vec![],
            no_messages_found: false,
        };
        assert_eq!(serde_json::to_string(&response).unwrap(), r#"{"topics":[]}"#);

        let response = SummariesResponse {
            topics: vec![],
            no_messages_found: true,
        };
        assert_eq!(
            serde_json::to_string(&response).unwrap(),
            r#"{"topics":[],"noMessagesFound":true}"#
        );
    }
}
