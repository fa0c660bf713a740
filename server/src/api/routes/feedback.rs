//! Feedback and email subscription endpoints

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use super::ApiState;
use crate::api::types::ApiError;
use crate::data::sqlite::repositories::{feedback, subscriber};

#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Deserialize)]
pub struct FeedbackRequest {
    pub email: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Store a feedback entry
pub async fn submit_feedback(
    State(state): State<ApiState>,
    Json(request): Json<FeedbackRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    validate_email(&request.email)?;
    if request.message.trim().is_empty() {
        return Err(ApiError::bad_request("EMPTY_MESSAGE", "message must not be empty"));
    }
    if !matches!(request.kind.as_str(), "feedback" | "question" | "bug") {
        return Err(ApiError::bad_request(
            "INVALID_TYPE",
            "type must be one of: feedback, question, bug",
        ));
    }

    feedback::insert(&state.pool, &request.email, &request.message, &request.kind)
        .await
        .map_err(ApiError::from_sqlite)?;

    Ok(Json(SuccessResponse { success: true }))
}

#[derive(Deserialize)]
pub struct SubscribeRequest {
    pub email: String,
    pub source: Option<String>,
}

/// Subscribe an email address; duplicates are not an error
pub async fn subscribe(
    State(state): State<ApiState>,
    Json(request): Json<SubscribeRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    validate_email(&request.email)?;

    let created = subscriber::upsert(&state.pool, &request.email, request.source.as_deref())
        .await
        .map_err(ApiError::from_sqlite)?;
    if !created {
        tracing::debug!(email = %request.email, "Already subscribed");
    }

    Ok(Json(SuccessResponse { success: true }))
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    let trimmed = email.trim();
    if trimmed.len() < 3 || !trimmed.contains('@') {
        return Err(ApiError::bad_request("INVALID_EMAIL", "email is not valid"));
    }
    Ok(())
}
