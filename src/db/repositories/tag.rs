//! Tag repository
//!
//! Tags are created by the question repository inside the ask transaction;
//! this repository only reads them.

use crate::db::{Backend, DynDatabasePool};
use crate::models::{Tag, TagWithCount};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Get tag by its exact name
    async fn get_by_name(&self, name: &str) -> Result<Option<Tag>>;

    /// The `limit` most used tags, ties broken by id
    async fn top_with_counts(&self, limit: i64) -> Result<Vec<TagWithCount>>;
}

pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn get_by_name(&self, name: &str) -> Result<Option<Tag>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_tag_by_name_sqlite(pool, name).await,
            Backend::Mysql(pool) => get_tag_by_name_mysql(pool, name).await,
        }
    }

    async fn top_with_counts(&self, limit: i64) -> Result<Vec<TagWithCount>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => top_tags_sqlite(pool, limit).await,
            Backend::Mysql(pool) => top_tags_mysql(pool, limit).await,
        }
    }
}

const TOP_TAGS_SQL: &str = r#"
    SELECT t.id, t.name, COUNT(qt.question_id) AS question_count
    FROM tags t
    LEFT JOIN question_tags qt ON qt.tag_id = t.id
    GROUP BY t.id, t.name
    ORDER BY question_count DESC, t.id ASC
    LIMIT ?
"#;

// ============================================================================
// SQLite implementations
// ============================================================================

async fn get_tag_by_name_sqlite(pool: &SqlitePool, name: &str) -> Result<Option<Tag>> {
    let row = sqlx::query("SELECT id, name FROM tags WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by name")?;

    Ok(row.map(|row| Tag {
        id: row.get("id"),
        name: row.get("name"),
    }))
}

async fn top_tags_sqlite(pool: &SqlitePool, limit: i64) -> Result<Vec<TagWithCount>> {
    let rows = sqlx::query(TOP_TAGS_SQL)
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to get tags with counts")?;

    Ok(rows
        .iter()
        .map(|row| {
            TagWithCount::new(
                Tag {
                    id: row.get("id"),
                    name: row.get("name"),
                },
                row.get("question_count"),
            )
        })
        .collect())
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn get_tag_by_name_mysql(pool: &MySqlPool, name: &str) -> Result<Option<Tag>> {
    let row = sqlx::query("SELECT id, name FROM tags WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by name")?;

    Ok(row.map(|row| Tag {
        id: row.get("id"),
        name: row.get("name"),
    }))
}

async fn top_tags_mysql(pool: &MySqlPool, limit: i64) -> Result<Vec<TagWithCount>> {
    let rows = sqlx::query(TOP_TAGS_SQL)
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to get tags with counts")?;

    Ok(rows
        .iter()
        .map(|row| {
            TagWithCount::new(
                Tag {
                    id: row.get("id"),
                    name: row.get("name"),
                },
                row.get("question_count"),
            )
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{seed_profile, seed_question, setup_pool};

    #[tokio::test]
    async fn test_get_by_name() {
        let pool = setup_pool().await;
        let (_, author) = seed_profile(&pool, "asker").await;
        seed_question(&pool, author, "Q", &["rust"]).await;
        let repo = SqlxTagRepository::new(pool.clone());

        let tag = repo
            .get_by_name("rust")
            .await
            .expect("Failed to get tag")
            .expect("Tag not found");

        assert_eq!(tag.name, "rust");
        assert!(repo.get_by_name("nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_top_with_counts_orders_by_usage_then_id() {
        let pool = setup_pool().await;
        let (_, author) = seed_profile(&pool, "asker").await;
        // Tag ids: python=1, rust=2, go=3, sql=4
        seed_question(&pool, author, "Q1", &["python", "rust"]).await;
        seed_question(&pool, author, "Q2", &["go", "rust"]).await;
        seed_question(&pool, author, "Q3", &["sql", "go"]).await;
        seed_question(&pool, author, "Q4", &["rust"]).await;
        let repo = SqlxTagRepository::new(pool.clone());

        let top = repo.top_with_counts(3).await.expect("Failed to get top tags");

        let summary: Vec<(&str, i64)> = top
            .iter()
            .map(|t| (t.tag.name.as_str(), t.question_count))
            .collect();
        assert_eq!(summary, vec![("rust", 3), ("go", 2), ("python", 1)]);
    }
}
