//! Topic summary and insight repositories for SQLite operations

use sqlx::SqlitePool;

use crate::data::sqlite::SqliteError;

/// Persist a topic summary; returns the new row id.
///
/// Topic summaries are an append-only log of past analyses.
pub async fn save_topic(
    pool: &SqlitePool,
    topic: &str,
    metatopic: &str,
    importance: i64,
    message_ids: &[i64],
) -> Result<i64, SqliteError> {
    let now = chrono::Utc::now().timestamp();
    let ids_json = serde_json::to_string(message_ids).unwrap_or_else(|_| "[]".to_string());

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO topic_summaries (topic, metatopic, importance, message_ids, created_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(topic)
    .bind(metatopic)
    .bind(importance)
    .bind(ids_json)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Persist an insight record (JSON text), keyed by topic label.
///
/// Regenerating insights for the same topic overwrites the prior record.
pub async fn save_insight(
    pool: &SqlitePool,
    topic: &str,
    record_json: &str,
) -> Result<(), SqliteError> {
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        r#"
        INSERT INTO insights (topic, record, created_at, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(topic) DO UPDATE SET record = excluded.record, updated_at = excluded.updated_at
        "#,
    )
    .bind(topic)
    .bind(record_json)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}

/// Fetch the latest insight record for a topic
pub async fn get_insight(pool: &SqlitePool, topic: &str) -> Result<Option<String>, SqliteError> {
    let record = sqlx::query_scalar("SELECT record FROM insights WHERE topic = ?")
        .bind(topic)
        .fetch_optional(pool)
        .await?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::test_pool;

    #[tokio::test]
    async fn test_save_topic_appends() {
        let pool = test_pool().await;

        let a = save_topic(&pool, "Rates", "Macro", 8, &[1, 2]).await.unwrap();
        let b = save_topic(&pool, "Rates", "Macro", 7, &[3]).await.unwrap();
        assert_ne!(a, b);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM topic_summaries")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 2);

        let ids_json: String =
            sqlx::query_scalar("SELECT message_ids FROM topic_summaries WHERE id = ?")
                .bind(a)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(ids_json, "[1,2]");
    }

    #[tokio::test]
    async fn test_save_insight_overwrites_by_topic() {
        let pool = test_pool().await;

        save_insight(&pool, "Rates", r#"{"stance":"long"}"#).await.unwrap();
        save_insight(&pool, "Rates", r#"{"stance":"short"}"#).await.unwrap();

        assert_eq!(
            get_insight(&pool, "Rates").await.unwrap().as_deref(),
            Some(r#"{"stance":"short"}"#)
        );
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM insights")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_get_insight_missing_returns_none() {
        let pool = test_pool().await;
        assert!(get_insight(&pool, "Nope").await.unwrap().is_none());
    }
}
