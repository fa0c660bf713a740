//! Feedback repository for SQLite operations

use sqlx::SqlitePool;

use crate::data::sqlite::SqliteError;

/// Store a feedback entry; returns the new row id
pub async fn insert(
    pool: &SqlitePool,
    email: &str,
    message: &str,
    kind: &str,
) -> Result<i64, SqliteError> {
    let now = chrono::Utc::now().timestamp();

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO feedback (email, message, kind, created_at)
        VALUES (?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(email)
    .bind(message)
    .bind(kind)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(id)
}
