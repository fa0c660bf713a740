//! Shared API types
//!
//! Common error handling used across all endpoints. Errors serialize as
//! `{"error": <type>, "code": <CODE>, "message": <detail>}`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::data::sqlite::SqliteError;
use crate::domain::analysis::AnalysisError;
use crate::domain::ingest::IngestError;

/// Standard API error response
#[derive(Debug)]
pub enum ApiError {
    BadRequest { code: String, message: String },
    NotFound { code: String, message: String },
    BadGateway { message: String },
    ServiceUnavailable { message: String },
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::BadGateway {
            message: message.into(),
        }
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn from_sqlite(e: SqliteError) -> Self {
        tracing::error!(error = %e, "SQLite error");
        Self::internal("Database operation failed")
    }

    pub fn from_ingest(e: IngestError) -> Self {
        match e {
            IngestError::Data(inner) => Self::from_sqlite(inner),
        }
    }

    /// Map analysis failures onto the upstream-aware status codes:
    /// transient upstream trouble is 503, a non-conforming model response
    /// after retry is 502.
    pub fn from_analysis(e: AnalysisError) -> Self {
        match e {
            AnalysisError::Data(inner) => Self::from_sqlite(inner),
            AnalysisError::Upstream(inner) => {
                tracing::warn!(error = %inner, "Upstream model failure");
                Self::service_unavailable("Model unavailable, try again later")
            }
            AnalysisError::Schema(reason) => {
                tracing::warn!(reason, "Model returned non-conforming output");
                Self::bad_gateway("Model returned an unusable response")
            }
            AnalysisError::Timeout => Self::service_unavailable("Analysis timed out"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, code, message) = match self {
            Self::BadRequest { code, message } => {
                (StatusCode::BAD_REQUEST, "bad_request", code, message)
            }
            Self::NotFound { code, message } => (StatusCode::NOT_FOUND, "not_found", code, message),
            Self::BadGateway { message } => (
                StatusCode::BAD_GATEWAY,
                "bad_gateway",
                "UPSTREAM_SCHEMA".to_string(),
                message,
            ),
            Self::ServiceUnavailable { message } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                "UPSTREAM_UNAVAILABLE".to_string(),
                message,
            ),
            Self::Internal { message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "INTERNAL".to_string(),
                message,
            ),
        };
        (
            status,
            Json(serde_json::json!({
                "error": error_type,
                "code": code,
                "message": message
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::LlmError;

    #[test]
    fn test_analysis_error_mapping() {
        let schema = ApiError::from_analysis(AnalysisError::Schema("bad".into()));
        assert!(matches!(schema, ApiError::BadGateway { .. }));

        let upstream = ApiError::from_analysis(AnalysisError::Upstream(LlmError::Timeout));
        assert!(matches!(upstream, ApiError::ServiceUnavailable { .. }));

        let timeout = ApiError::from_analysis(AnalysisError::Timeout);
        assert!(matches!(timeout, ApiError::ServiceUnavailable { .. }));
    }

    #[test]
    fn test_status_codes() {
        let response = ApiError::bad_request("BAD_PERIOD", "nope").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ApiError::not_found("MESSAGE_NOT_FOUND", "nope").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = ApiError::bad_gateway("nope").into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let response = ApiError::service_unavailable("nope").into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
