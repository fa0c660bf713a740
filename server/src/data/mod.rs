//! Data storage layer
//!
//! A single SQLite database holds all persisted state: sources, fetched
//! messages, per-URL link summaries, generated topic summaries and
//! insights, plus the auxiliary feedback/subscriber records.

pub mod sqlite;

pub use sqlite::{SqliteError, SqliteService};
