//! SSE bridge for job progress
//!
//! One `data:` line per progress event, a `: ping` comment on the
//! keepalive interval so intermediaries keep the connection open, and EOF
//! after the stream's terminal event. A subscriber arriving mid-job (or
//! within the grace period after it) replays the retained buffer first.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde::Deserialize;

use super::ApiState;
use crate::api::types::ApiError;
use crate::core::constants::PROGRESS_KEEPALIVE_SECS;

#[derive(Deserialize)]
pub struct ProgressQuery {
    #[serde(rename = "requestId")]
    pub request_id: String,
}

/// Stream progress events for a request id
pub async fn channel_progress(
    State(state): State<ApiState>,
    Query(query): Query<ProgressQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let mut subscription = state.progress.subscribe(&query.request_id).ok_or_else(|| {
        ApiError::not_found(
            "UNKNOWN_REQUEST_ID",
            format!("No progress stream for request id {}", query.request_id),
        )
    })?;

    let request_id = query.request_id;
    let stream = async_stream::stream! {
        while let Some(event) = subscription.next().await {
            match Event::default().json_data(&event) {
                Ok(sse_event) => yield Ok(sse_event),
                Err(e) => {
                    tracing::error!(request_id, error = %e, "Failed to encode progress event");
                }
            }
        }
        tracing::debug!(request_id, "Progress stream closed");
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(PROGRESS_KEEPALIVE_SECS))
            .text("ping"),
    ))
}
