//! SQLite schema definitions
//!
//! Initial schema with all tables. All timestamps are unix seconds.

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Complete schema SQL
pub const SCHEMA: &str = r#"
-- =============================================================================
-- Infrastructure: Schema version tracking
-- =============================================================================
CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    version INTEGER NOT NULL,
    applied_at INTEGER NOT NULL,
    description TEXT
);

-- =============================================================================
-- 1. Sources (URL-addressable message channels; rows accumulate, never deleted)
-- =============================================================================
CREATE TABLE IF NOT EXISTS sources (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    kind TEXT NOT NULL DEFAULT 'telegram',
    category TEXT NOT NULL DEFAULT 'Uncategorized',
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sources_category ON sources(category);

-- =============================================================================
-- 2. Messages (at most one row per (kind, channel_id, message_id))
-- =============================================================================
CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    kind TEXT NOT NULL,
    channel_id TEXT NOT NULL,
    message_id TEXT NOT NULL,
    source_url TEXT NOT NULL,
    posted_at INTEGER NOT NULL,
    text TEXT NOT NULL DEFAULT '',
    resolved_links TEXT,
    processed INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    UNIQUE(kind, channel_id, message_id)
);

CREATE INDEX IF NOT EXISTS idx_messages_source_posted ON messages(source_url, posted_at);
CREATE INDEX IF NOT EXISTS idx_messages_posted ON messages(posted_at);

-- =============================================================================
-- 3. Link summaries (one row per distinct URL; refresh overwrites)
-- =============================================================================
CREATE TABLE IF NOT EXISTS link_summaries (
    url TEXT PRIMARY KEY,
    summary TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

-- =============================================================================
-- 4. Topic summaries (append-only log of past analyses)
-- =============================================================================
CREATE TABLE IF NOT EXISTS topic_summaries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    topic TEXT NOT NULL,
    metatopic TEXT NOT NULL,
    importance INTEGER NOT NULL CHECK(importance BETWEEN 1 AND 10),
    message_ids TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_topic_summaries_created ON topic_summaries(created_at);

-- =============================================================================
-- 5. Insights (latest analysis per topic label; overwrite on regenerate)
-- =============================================================================
CREATE TABLE IF NOT EXISTS insights (
    topic TEXT PRIMARY KEY,
    record TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

-- =============================================================================
-- 6. Feedback
-- =============================================================================
CREATE TABLE IF NOT EXISTS feedback (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL,
    message TEXT NOT NULL,
    kind TEXT NOT NULL CHECK(kind IN ('feedback', 'question', 'bug')),
    created_at INTEGER NOT NULL
);

-- =============================================================================
-- 7. Subscribers (duplicate email is an upsert, not an error)
-- =============================================================================
CREATE TABLE IF NOT EXISTS subscribers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    source TEXT,
    created_at INTEGER NOT NULL
);
"#;
