use std::fmt;
use std::path::PathBuf;

use anyhow::{Result, bail};

use super::cli::Cli;
use super::constants::{
    DB_FILENAME_DEVELOPMENT, DB_FILENAME_PRODUCTION, DEFAULT_HOST, DEFAULT_PORT,
};

// =============================================================================
// Environment Enum
// =============================================================================

/// Deployment environment; selects the database file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => bail!("Unknown environment: {other} (expected development or production)"),
        }
    }

    pub fn db_filename(&self) -> &'static str {
        match self {
            Environment::Development => DB_FILENAME_DEVELOPMENT,
            Environment::Production => DB_FILENAME_PRODUCTION,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

// =============================================================================
// Config Sections
// =============================================================================

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub api_id: Option<String>,
    pub api_hash: Option<String>,
    pub bot_token: Option<String>,
    pub bot_enabled: bool,
}

impl TelegramConfig {
    /// Whether MTProto credentials are configured
    pub fn has_protocol_credentials(&self) -> bool {
        self.api_id.is_some() && self.api_hash.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub gemini_api_key: Option<String>,
    pub perplexity_api_key: Option<String>,
}

/// Application configuration assembled from CLI flags and environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub telegram: TelegramConfig,
    pub llm: LlmConfig,
    /// Resolved database file path
    pub db_path: PathBuf,
}

impl AppConfig {
    /// Build the configuration from parsed CLI arguments.
    ///
    /// Model API keys are intentionally not required here; their absence
    /// only fails the analysis endpoints that need them.
    pub fn load(cli: &Cli) -> Result<Self> {
        let environment = match &cli.env {
            Some(s) => Environment::parse(s)?,
            None => Environment::default(),
        };

        let db_path = cli
            .db_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(environment.db_filename()));

        let server = ServerConfig {
            host: cli.host.clone().unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: cli.port.unwrap_or(DEFAULT_PORT),
        };

        let telegram = TelegramConfig {
            api_id: cli.telegram_api_id.clone(),
            api_hash: cli.telegram_api_hash.clone(),
            bot_token: cli.telegram_bot_token.clone(),
            bot_enabled: cli.enable_telegram_bot && cli.telegram_bot_token.is_some(),
        };

        let llm = LlmConfig {
            gemini_api_key: cli.gemini_api_key.clone(),
            perplexity_api_key: cli.perplexity_api_key.clone(),
        };

        Ok(Self {
            environment,
            server,
            telegram,
            llm,
            db_path,
        })
    }
}
