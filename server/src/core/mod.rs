//! Core application infrastructure

pub mod cli;
pub mod config;
pub mod constants;
pub mod shutdown;

pub use crate::app::CoreApp;
pub use cli::Cli;
pub use config::{AppConfig, Environment, LlmConfig, ServerConfig, TelegramConfig};
pub use shutdown::ShutdownService;
