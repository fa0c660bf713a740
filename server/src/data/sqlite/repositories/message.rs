//! Message repository for SQLite operations

use sqlx::{QueryBuilder, SqlitePool};

use crate::data::sqlite::SqliteError;

/// A timestamped text payload fetched from a source
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Message {
    pub id: i64,
    pub kind: String,
    pub channel_id: String,
    pub message_id: String,
    pub source_url: String,
    /// Source-originated timestamp, not insertion time
    pub posted_at: i64,
    pub text: String,
    /// JSON object mapping outbound URL to its summary, filled after resolution
    pub resolved_links: Option<String>,
    pub processed: bool,
    pub created_at: i64,
}

/// Record a message if its (kind, channel_id, message_id) tuple is new.
///
/// Returns the new row id, or `None` when the message was already stored.
pub async fn record(
    pool: &SqlitePool,
    kind: &str,
    channel_id: &str,
    message_id: &str,
    source_url: &str,
    posted_at: i64,
    text: &str,
) -> Result<Option<i64>, SqliteError> {
    let now = chrono::Utc::now().timestamp();

    let id: Option<i64> = sqlx::query_scalar(
        r#"
        INSERT INTO messages (kind, channel_id, message_id, source_url, posted_at, text, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(kind, channel_id, message_id) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(kind)
    .bind(channel_id)
    .bind(message_id)
    .bind(source_url)
    .bind(posted_at)
    .bind(text)
    .bind(now)
    .fetch_optional(pool)
    .await?;

    Ok(id)
}

/// Attach the resolved outbound-link map (JSON text) to a message
pub async fn attach_resolved_links(
    pool: &SqlitePool,
    id: i64,
    json: &str,
) -> Result<(), SqliteError> {
    sqlx::query("UPDATE messages SET resolved_links = ? WHERE id = ?")
        .bind(json)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Fetch messages in a time window, ordered by posted_at ascending.
///
/// An empty `source_urls` slice selects messages from all sources.
pub async fn in_window(
    pool: &SqlitePool,
    source_urls: &[String],
    since: i64,
    until: i64,
) -> Result<Vec<Message>, SqliteError> {
    let mut builder = QueryBuilder::new(
        "SELECT id, kind, channel_id, message_id, source_url, posted_at, text, \
         resolved_links, processed, created_at \
         FROM messages WHERE posted_at >= ",
    );
    builder.push_bind(since);
    builder.push(" AND posted_at <= ");
    builder.push_bind(until);

    if !source_urls.is_empty() {
        builder.push(" AND source_url IN (");
        let mut separated = builder.separated(", ");
        for url in source_urls {
            separated.push_bind(url);
        }
        separated.push_unseparated(")");
    }

    builder.push(" ORDER BY posted_at ASC");

    let messages = builder.build_query_as().fetch_all(pool).await?;
    Ok(messages)
}

/// Fetch a single message by id
pub async fn get(pool: &SqlitePool, id: i64) -> Result<Option<Message>, SqliteError> {
    let message = sqlx::query_as(
        r#"
        SELECT id, kind, channel_id, message_id, source_url, posted_at, text,
               resolved_links, processed, created_at
        FROM messages
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(message)
}

/// Flip the advisory processed flag for consumed messages
pub async fn mark_processed(pool: &SqlitePool, ids: &[i64]) -> Result<(), SqliteError> {
    if ids.is_empty() {
        return Ok(());
    }

    let mut builder = QueryBuilder::new("UPDATE messages SET processed = 1 WHERE id IN (");
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(")");

    builder.build().execute(pool).await?;
    Ok(())
}
