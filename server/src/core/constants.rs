// =============================================================================
// Application Identity
// =============================================================================

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "streamsift";

// =============================================================================
// Environment Variables
// =============================================================================

/// Environment selector (`development` or `production`)
pub const ENV_ENVIRONMENT: &str = "ENV";

/// Environment variable for server host
pub const ENV_HOST: &str = "STREAMSIFT_HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "STREAMSIFT_PORT";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "STREAMSIFT_LOG";

/// Environment variable to override the database file path
pub const ENV_DB_PATH: &str = "STREAMSIFT_DB_PATH";

/// Telegram MTProto application id
pub const ENV_TELEGRAM_API_ID: &str = "TELEGRAM_API_ID";

/// Telegram MTProto application hash
pub const ENV_TELEGRAM_API_HASH: &str = "TELEGRAM_API_HASH";

/// Telegram bot token
pub const ENV_TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";

/// Whether the Telegram bot integration should be enabled
pub const ENV_ENABLE_TELEGRAM_BOT: &str = "ENABLE_TELEGRAM_BOT";

/// API key for the structured-output model
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";

/// API key for the link-resolver model
pub const ENV_PERPLEXITY_API_KEY: &str = "PERPLEXITY_API_KEY";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 8300;

// =============================================================================
// Database
// =============================================================================

/// Database file for production
pub const DB_FILENAME_PRODUCTION: &str = "sources.db";

/// Database file for development
pub const DB_FILENAME_DEVELOPMENT: &str = "sources_dev.db";

/// SQLite busy timeout in seconds
pub const SQLITE_BUSY_TIMEOUT_SECS: u64 = 5;

/// SQLite connection pool size
pub const SQLITE_MAX_CONNECTIONS: u32 = 5;

// =============================================================================
// Progress Bus
// =============================================================================

/// Retained events per request id; the oldest is dropped on overflow
pub const PROGRESS_QUEUE_CAPACITY: usize = 256;

/// SSE keepalive comment interval
pub const PROGRESS_KEEPALIVE_SECS: u64 = 15;

/// How long a finished progress queue stays around for late subscribers
pub const PROGRESS_GRACE_SECS: u64 = 30;

/// Minimum interval between progress emits for a single source
pub const PROGRESS_MIN_EMIT_INTERVAL_SECS: u64 = 1;

// =============================================================================
// Concurrency Bounds
// =============================================================================

/// Channel fetches in flight
pub const CHANNEL_FETCH_CONCURRENCY: usize = 4;

/// Link resolutions in flight
pub const LINK_RESOLVE_CONCURRENCY: usize = 8;

/// Structured model calls in flight
pub const LLM_CONCURRENCY: usize = 2;

// =============================================================================
// External Call Timeouts
// =============================================================================

/// Per-call timeout for structured model requests
pub const LLM_TIMEOUT_SECS: u64 = 60;

/// Per-call timeout for link resolution requests
pub const LINK_RESOLVE_TIMEOUT_SECS: u64 = 30;

/// Per-call timeout for channel fetches
pub const CHANNEL_FETCH_TIMEOUT_SECS: u64 = 120;

/// Overall wall-clock cap for a summarization request
pub const SUMMARIZE_DEADLINE_SECS: u64 = 300;

// =============================================================================
// Analysis Limits
// =============================================================================

/// Failed resolutions allowed per URL before it stops being retried
pub const LINK_ATTEMPT_CAP: u32 = 3;

/// In-memory link summary cache size
pub const LINK_CACHE_MAX_ENTRIES: u64 = 4_096;

/// Maximum topics returned by a summarization
pub const MAX_TOPICS: usize = 20;

/// Message text truncation for summarization prompts, in characters
pub const MESSAGE_TRUNCATE_CHARS: usize = 4_000;

/// Maximum sources accepted per request
pub const MAX_SOURCES_PER_REQUEST: usize = 50;

/// Maximum channels accepted for clustering or saving
pub const MAX_CHANNELS_PER_REQUEST: usize = 500;

/// Maximum topics accepted by the insights endpoint
pub const MAX_INSIGHT_TOPICS: usize = 5;

/// Retry backoff base delay for transient model failures, in milliseconds
pub const LLM_RETRY_BASE_DELAY_MS: u64 = 500;

// =============================================================================
// Shutdown
// =============================================================================

/// How long to wait for background tasks during shutdown
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 10;
