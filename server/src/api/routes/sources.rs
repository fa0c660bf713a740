//! Sources listing endpoint

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use super::ApiState;
use crate::api::types::ApiError;
use crate::data::sqlite::repositories::source;

#[derive(Serialize)]
pub struct SourceEntry {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub source_type: String,
}

#[derive(Serialize)]
pub struct SourcesResponse {
    pub sources: BTreeMap<String, Vec<SourceEntry>>,
}

/// List all known sources grouped by category
pub async fn list_sources(
    State(state): State<ApiState>,
) -> Result<Json<SourcesResponse>, ApiError> {
    let grouped = source::list_by_category(&state.pool)
        .await
        .map_err(ApiError::from_sqlite)?;

    let sources = grouped
        .into_iter()
        .map(|(category, sources)| {
            let entries = sources
                .into_iter()
                .map(|s| SourceEntry {
                    id: s.id,
                    url: s.url,
                    name: s.name,
                    source_type: s.kind,
                })
                .collect();
            (category, entries)
        })
        .collect();

    Ok(Json(SourcesResponse { sources }))
}
