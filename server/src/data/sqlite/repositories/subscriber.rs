//! Subscriber repository for SQLite operations

use sqlx::SqlitePool;

use crate::data::sqlite::SqliteError;

/// Add a subscriber (idempotent on email).
///
/// Returns true if created, false if the email was already subscribed.
pub async fn upsert(
    pool: &SqlitePool,
    email: &str,
    source: Option<&str>,
) -> Result<bool, SqliteError> {
    let now = chrono::Utc::now().timestamp();

    let result = sqlx::query(
        r#"
        INSERT INTO subscribers (email, source, created_at)
        VALUES (?, ?, ?)
        ON CONFLICT(email) DO NOTHING
        "#,
    )
    .bind(email)
    .bind(source)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::test_pool;

    #[tokio::test]
    async fn test_duplicate_email_keeps_single_row() {
        let pool = test_pool().await;

        assert!(upsert(&pool, "x@y.z", None).await.unwrap());
        assert!(!upsert(&pool, "x@y.z", Some("landing")).await.unwrap());

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM subscribers")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
