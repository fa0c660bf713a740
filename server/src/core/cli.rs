use std::path::PathBuf;

use clap::Parser;

use super::constants::{
    ENV_DB_PATH, ENV_ENABLE_TELEGRAM_BOT, ENV_ENVIRONMENT, ENV_GEMINI_API_KEY, ENV_HOST,
    ENV_PERPLEXITY_API_KEY, ENV_PORT, ENV_TELEGRAM_API_HASH, ENV_TELEGRAM_API_ID,
    ENV_TELEGRAM_BOT_TOKEN,
};

#[derive(Parser)]
#[command(name = "streamsift")]
#[command(version, about = "Channel ingestion and analysis server", long_about = None)]
pub struct Cli {
    /// Server host address
    #[arg(long, short = 'H', env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', env = ENV_PORT)]
    pub port: Option<u16>,

    /// Environment (development or production); selects the database file
    #[arg(long, env = ENV_ENVIRONMENT)]
    pub env: Option<String>,

    /// Override the database file path
    #[arg(long, env = ENV_DB_PATH)]
    pub db_path: Option<PathBuf>,

    /// Telegram MTProto application id
    #[arg(long, env = ENV_TELEGRAM_API_ID, hide_env_values = true)]
    pub telegram_api_id: Option<String>,

    /// Telegram MTProto application hash
    #[arg(long, env = ENV_TELEGRAM_API_HASH, hide_env_values = true)]
    pub telegram_api_hash: Option<String>,

    /// Telegram bot token
    #[arg(long, env = ENV_TELEGRAM_BOT_TOKEN, hide_env_values = true)]
    pub telegram_bot_token: Option<String>,

    /// Enable the Telegram bot integration
    #[arg(long, env = ENV_ENABLE_TELEGRAM_BOT)]
    pub enable_telegram_bot: bool,

    /// API key for the structured-output model
    #[arg(long, env = ENV_GEMINI_API_KEY, hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// API key for the link-resolver model
    #[arg(long, env = ENV_PERPLEXITY_API_KEY, hide_env_values = true)]
    pub perplexity_api_key: Option<String>,
}

/// Parse command-line arguments
pub fn parse() -> Cli {
    Cli::parse()
}
