//! Source repository for SQLite operations

use std::collections::BTreeMap;

use serde::Serialize;
use sqlx::SqlitePool;

use crate::data::sqlite::SqliteError;

/// A URL-addressable message channel
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Source {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub kind: String,
    pub category: String,
    pub created_at: i64,
}

/// Insert or update a source, keyed by canonical URL (idempotent).
///
/// Repeated upserts keep a single row; name and category reflect the most
/// recent call. Sources are never deleted.
pub async fn upsert(
    pool: &SqlitePool,
    url: &str,
    name: &str,
    kind: &str,
    category: &str,
) -> Result<Source, SqliteError> {
    let now = chrono::Utc::now().timestamp();

    let source = sqlx::query_as(
        r#"
        INSERT INTO sources (url, name, kind, category, created_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(url) DO UPDATE SET name = excluded.name, category = excluded.category
        RETURNING id, url, name, kind, category, created_at
        "#,
    )
    .bind(url)
    .bind(name)
    .bind(kind)
    .bind(category)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(source)
}

/// List all sources grouped by category
pub async fn list_by_category(
    pool: &SqlitePool,
) -> Result<BTreeMap<String, Vec<Source>>, SqliteError> {
    let sources: Vec<Source> = sqlx::query_as(
        r#"
        SELECT id, url, name, kind, category, created_at
        FROM sources
        ORDER BY category, name
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut grouped: BTreeMap<String, Vec<Source>> = BTreeMap::new();
    for source in sources {
        grouped.entry(source.category.clone()).or_default().push(source);
    }
    Ok(grouped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::test_pool;

    #[tokio::test]
    async fn test_upsert_is_idempotent_on_url() {
        let pool = test_pool().await;

        let first = upsert(&pool, "https://t.me/foo", "foo", "telegram", "News")
            .await
            .unwrap();
        let second = upsert(&pool, "https://t.me/foo", "foo renamed", "telegram", "Tech")
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "foo renamed");
        assert_eq!(second.category, "Tech");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sources")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_list_by_category_groups_sources() {
        let pool = test_pool().await;

        upsert(&pool, "https://t.me/a", "a", "telegram", "News")
            .await
            .unwrap();
        upsert(&pool, "https://t.me/b", "b", "telegram", "News")
            .await
            .unwrap();
        upsert(&pool, "https://t.me/c", "c", "telegram", "Uncategorized")
            .await
            .unwrap();

        let grouped = list_by_category(&pool).await.unwrap();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["News"].len(), 2);
        assert_eq!(grouped["Uncategorized"].len(), 1);
    }
}
