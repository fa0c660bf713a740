//! Channel import, clustering, and saving endpoints

use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::HeaderMap;
use axum::http::header::HeaderValue;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ApiState;
use crate::api::types::ApiError;
use crate::core::constants::MAX_CHANNELS_PER_REQUEST;
use crate::domain::analysis::{ChannelGroup, Period};
use crate::domain::ingest::IngestJob;
use crate::domain::telegram::{ExportChannel, parse_export};

#[derive(Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub channels: Vec<ExportChannel>,
}

/// Parse an uploaded Telegram data export into its channel list
pub async fn upload_export(mut multipart: Multipart) -> Result<Json<UploadResponse>, ApiError> {
    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request("BAD_MULTIPART", e.to_string()))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request("BAD_MULTIPART", e.to_string()))?;
            file = Some(bytes);
            break;
        }
    }

    let bytes = file.ok_or_else(|| {
        ApiError::bad_request("MISSING_FILE", "multipart field 'file' is required")
    })?;

    let channels =
        parse_export(&bytes).map_err(|e| ApiError::bad_request("BAD_EXPORT", e.to_string()))?;

    tracing::info!(channels = channels.len(), "Telegram export parsed");
    Ok(Json(UploadResponse {
        success: true,
        channels,
    }))
}

#[derive(Deserialize)]
pub struct ClusterRequest {
    pub channels: Vec<ExportChannel>,
    #[serde(default)]
    pub simplified_fetching: bool,
}

#[derive(Serialize)]
pub struct ClusterResponse {
    pub success: bool,
    pub topics: Vec<ChannelGroup>,
}

/// Cluster a channel list into labeled topic groups.
///
/// Clustering is metadata-only; message ingestion happens through
/// `save-telegram-channels`. Progress is streamed on the request id taken
/// from the `X-Request-ID` header.
pub async fn cluster_channels(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(request): Json<ClusterRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_channel_count(&request.channels)?;
    if request.simplified_fetching {
        tracing::debug!("simplified_fetching requested; clustering stays metadata-only");
    }

    let request_id = request_id_from(&headers);
    tracing::info!(request_id, channels = request.channels.len(), "Clustering requested");

    let topics = state
        .clusterer
        .cluster(&request.channels, &request_id)
        .await
        .map_err(ApiError::from_analysis)?;

    Ok((
        request_id_header(&request_id),
        Json(ClusterResponse {
            success: true,
            topics,
        }),
    ))
}

#[derive(Deserialize)]
pub struct SaveChannelsRequest {
    pub channels: Vec<ExportChannel>,
    pub period: String,
}

#[derive(Serialize)]
pub struct SaveChannelsResponse {
    pub success: bool,
    pub count: usize,
}

/// Upsert the channels as sources and ingest their window.
///
/// Per-channel progress is observable over SSE on the request id while
/// the call runs; the response reports the saved-source count.
pub async fn save_channels(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(request): Json<SaveChannelsRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_channel_count(&request.channels)?;
    let period: Period = request
        .period
        .parse()
        .map_err(|e: String| ApiError::bad_request("INVALID_PERIOD", e))?;

    let sources: Vec<String> = request.channels.iter().map(channel_url).collect();

    let until = Utc::now();
    let request_id = request_id_from(&headers);
    tracing::info!(request_id, channels = sources.len(), "Channel save requested");

    let report = state
        .ingestor
        .run(IngestJob {
            sources,
            since: until - period.duration(),
            until,
            request_id: request_id.clone(),
        })
        .await
        .map_err(ApiError::from_ingest)?;

    Ok((
        request_id_header(&request_id),
        Json(SaveChannelsResponse {
            success: true,
            count: report.sources,
        }),
    ))
}

fn validate_channel_count(channels: &[ExportChannel]) -> Result<(), ApiError> {
    if channels.is_empty() {
        return Err(ApiError::bad_request("NO_CHANNELS", "channels must not be empty"));
    }
    if channels.len() > MAX_CHANNELS_PER_REQUEST {
        return Err(ApiError::bad_request(
            "TOO_MANY_CHANNELS",
            format!("At most {MAX_CHANNELS_PER_REQUEST} channels per request"),
        ));
    }
    Ok(())
}

/// The channel's explicit URL, or its public address derived from the id
fn channel_url(channel: &ExportChannel) -> String {
    channel
        .url
        .clone()
        .unwrap_or_else(|| format!("https://t.me/{}", channel.id))
}

fn request_id_from(headers: &HeaderMap) -> String {
    headers
        .get("X-Request-ID")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn request_id_header(request_id: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(request_id) {
        headers.insert("X-Request-ID", value);
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_url_prefers_explicit() {
        let channel = ExportChannel {
            id: "foo".into(),
            name: "Foo".into(),
            url: Some("https://t.me/foo".into()),
            last_message_date: None,
            left: None,
        };
        assert_eq!(channel_url(&channel), "https://t.me/foo");

        let bare = ExportChannel {
            id: "bar".into(),
            name: "Bar".into(),
            url: None,
            last_message_date: None,
            left: None,
        };
        assert_eq!(channel_url(&bare), "https://t.me/bar");
    }

    #[test]
    fn test_request_id_fallback_is_generated() {
        let headers = HeaderMap::new();
        let id = request_id_from(&headers);
        assert!(!id.is_empty());

        let mut headers = HeaderMap::new();
        headers.insert("X-Request-ID", HeaderValue::from_static("r42"));
        assert_eq!(request_id_from(&headers), "r42");
    }
}
