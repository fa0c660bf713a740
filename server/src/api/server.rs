//! API server initialization

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::routes::{self, ApiState};
use crate::app::CoreApp;

pub struct ApiServer {
    app: CoreApp,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        Self { app }
    }

    /// Serve until shutdown; returns the CoreApp for graceful teardown
    pub async fn start(self) -> Result<CoreApp> {
        let Self { app } = self;

        let shutdown = app.shutdown.clone();
        let addr = SocketAddr::new(app.config.server.host.parse()?, app.config.server.port);

        let state = ApiState {
            pool: app.database.pool().clone(),
            ingestor: Arc::clone(&app.ingestor),
            summarizer: Arc::clone(&app.summarizer),
            clusterer: Arc::clone(&app.clusterer),
            insights: Arc::clone(&app.insights),
            progress: Arc::clone(&app.progress),
        };

        let router = routes::router(state)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive());

        let listener = TcpListener::bind(addr).await?;
        tracing::info!(%addr, "API server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        Ok(app)
    }
}
