//! Link summary repository for SQLite operations

use sqlx::SqlitePool;

use crate::data::sqlite::SqliteError;

/// Fetch the cached summary for a URL
pub async fn get(pool: &SqlitePool, url: &str) -> Result<Option<String>, SqliteError> {
    let summary = sqlx::query_scalar("SELECT summary FROM link_summaries WHERE url = ?")
        .bind(url)
        .fetch_optional(pool)
        .await?;
    Ok(summary)
}

/// Store or refresh the summary for a URL.
///
/// One row per distinct URL; refresh overwrites the summary and advances
/// updated_at while keeping created_at.
pub async fn put(pool: &SqlitePool, url: &str, summary: &str) -> Result<(), SqliteError> {
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        r#"
        INSERT INTO link_summaries (url, summary, created_at, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(url) DO UPDATE SET summary = excluded.summary, updated_at = excluded.updated_at
        "#,
    )
    .bind(url)
    .bind(summary)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::test_pool;

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let pool = test_pool().await;
        assert!(get(&pool, "https://ex.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let pool = test_pool().await;
        put(&pool, "https://ex.com", "a summary").await.unwrap();
        assert_eq!(
            get(&pool, "https://ex.com").await.unwrap().as_deref(),
            Some("a summary")
        );
    }

    #[tokio::test]
    async fn test_refresh_overwrites_single_row() {
        let pool = test_pool().await;
        put(&pool, "https://ex.com", "old").await.unwrap();
        put(&pool, "https://ex.com", "new").await.unwrap();

        assert_eq!(
            get(&pool, "https://ex.com").await.unwrap().as_deref(),
            Some("new")
        );
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM link_summaries")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
