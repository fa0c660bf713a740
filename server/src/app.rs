//! Core application

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Semaphore;

use crate::api::ApiServer;
use crate::core::cli;
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG, LLM_CONCURRENCY};
use crate::core::shutdown::ShutdownService;
use crate::data::sqlite::SqliteService;
use crate::domain::analysis::{Clusterer, InsightsGenerator, Summarizer};
use crate::domain::ingest::ChannelIngestor;
use crate::domain::links::LinkResolver;
use crate::domain::llm::{GeminiClient, LinkReader, PerplexityClient, StructuredModel};
use crate::domain::progress::ProgressBus;
use crate::domain::telegram::{ChannelClient, PreviewClient};

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub database: Arc<SqliteService>,
    pub progress: Arc<ProgressBus>,
    pub ingestor: Arc<ChannelIngestor>,
    pub summarizer: Arc<Summarizer>,
    pub clusterer: Arc<Clusterer>,
    pub insights: Arc<InsightsGenerator>,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let cli = cli::parse();
        let app = Self::init(&cli).await?;
        Self::start_server(app).await
    }

    async fn init(cli: &cli::Cli) -> Result<Self> {
        let config = AppConfig::load(cli)?;
        tracing::info!(
            environment = %config.environment,
            db = %config.db_path.display(),
            "Configuration loaded"
        );

        if config.telegram.bot_enabled {
            tracing::warn!("Telegram bot integration is not part of this build; ignoring");
        }
        if !config.telegram.has_protocol_credentials() {
            tracing::debug!("No MTProto credentials configured; using web preview fetcher");
        }

        let database = Arc::new(
            SqliteService::init(&config.db_path)
                .await
                .context("Failed to initialize database")?,
        );
        let pool = database.pool().clone();

        let progress = Arc::new(ProgressBus::new());
        let llm_permits = Arc::new(Semaphore::new(LLM_CONCURRENCY));

        let structured: Arc<dyn StructuredModel> =
            Arc::new(GeminiClient::new(config.llm.gemini_api_key.clone()));
        let link_reader: Arc<dyn LinkReader> =
            Arc::new(PerplexityClient::new(config.llm.perplexity_api_key.clone()));
        let channel_client: Arc<dyn ChannelClient> = Arc::new(PreviewClient::new());

        let resolver = Arc::new(LinkResolver::new(pool.clone(), link_reader));
        let ingestor = Arc::new(ChannelIngestor::new(
            pool.clone(),
            channel_client,
            resolver,
            Arc::clone(&progress),
        ));
        let summarizer = Arc::new(Summarizer::new(
            pool.clone(),
            Arc::clone(&structured),
            Arc::clone(&llm_permits),
        ));
        let clusterer = Arc::new(Clusterer::new(
            Arc::clone(&structured),
            Arc::clone(&llm_permits),
            Arc::clone(&progress),
        ));
        let insights = Arc::new(InsightsGenerator::new(
            pool,
            structured,
            llm_permits,
        ));

        let shutdown = ShutdownService::new(Arc::clone(&database));

        Ok(Self {
            shutdown,
            config,
            database,
            progress,
            ingestor,
            summarizer,
            clusterer,
            insights,
        })
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start_server(app: Self) -> Result<()> {
        app.shutdown.install_signal_handlers();

        let app = ApiServer::new(app).start().await?;

        app.shutdown.shutdown().await;
        Ok(())
    }
}
