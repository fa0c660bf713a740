//! API routes

pub mod channels;
pub mod feedback;
pub mod health;
pub mod insights;
pub mod messages;
pub mod progress;
pub mod sources;
pub mod summaries;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use sqlx::SqlitePool;

use crate::domain::analysis::{Clusterer, InsightsGenerator, Summarizer};
use crate::domain::ingest::ChannelIngestor;
use crate::domain::progress::ProgressBus;

/// Shared state for all API endpoints
#[derive(Clone)]
pub struct ApiState {
    pub pool: SqlitePool,
    pub ingestor: Arc<ChannelIngestor>,
    pub summarizer: Arc<Summarizer>,
    pub clusterer: Arc<Clusterer>,
    pub insights: Arc<InsightsGenerator>,
    pub progress: Arc<ProgressBus>,
}

/// Build the API router
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/sources", get(sources::list_sources))
        .route("/summaries", get(summaries::get_summaries))
        .route("/insights", post(insights::generate_insights))
        .route("/message/{id}", get(messages::get_message))
        .route("/upload-telegram-export", post(channels::upload_export))
        .route("/cluster-channels", post(channels::cluster_channels))
        .route("/save-telegram-channels", post(channels::save_channels))
        .route("/channel-progress", get(progress::channel_progress))
        .route("/feedback", post(feedback::submit_feedback))
        .route("/subscribe", post(feedback::subscribe))
        .with_state(state)
}
