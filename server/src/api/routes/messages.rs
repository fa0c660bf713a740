//! Single message lookup endpoint

use axum::Json;
use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ApiState;
use crate::api::types::ApiError;
use crate::data::sqlite::repositories::message;

#[derive(Serialize)]
pub struct MessageResponse {
    pub source: String,
    pub date: String,
    pub content: String,
}

/// Fetch one stored message by id
pub async fn get_message(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let found = message::get(&state.pool, id)
        .await
        .map_err(ApiError::from_sqlite)?
        .ok_or_else(|| ApiError::not_found("MESSAGE_NOT_FOUND", format!("No message {id}")))?;

    let date = DateTime::<Utc>::from_timestamp(found.posted_at, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default();

    Ok(Json(MessageResponse {
        source: found.source_url,
        date,
        content: found.text,
    }))
}
