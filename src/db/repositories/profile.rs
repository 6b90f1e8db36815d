//! Profile repository
//!
//! Also home of the author row mappers shared by the question and comment
//! repositories: every query that joins an author selects
//! `author_id, author_username, author_email, author_avatar, author_rating`.

use crate::db::{Backend, DynDatabasePool};
use crate::models::{Author, Profile};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Profile repository trait
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Get the profile belonging to a user
    async fn get_by_user_id(&self, user_id: i64) -> Result<Option<Profile>>;

    /// The `limit` highest-rated profiles, ties broken by id
    async fn top_by_rating(&self, limit: i64) -> Result<Vec<Author>>;
}

pub struct SqlxProfileRepository {
    pool: DynDatabasePool,
}

impl SqlxProfileRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ProfileRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ProfileRepository for SqlxProfileRepository {
    async fn get_by_user_id(&self, user_id: i64) -> Result<Option<Profile>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_profile_by_user_sqlite(pool, user_id).await,
            Backend::Mysql(pool) => get_profile_by_user_mysql(pool, user_id).await,
        }
    }

    async fn top_by_rating(&self, limit: i64) -> Result<Vec<Author>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => top_profiles_sqlite(pool, limit).await,
            Backend::Mysql(pool) => top_profiles_mysql(pool, limit).await,
        }
    }
}

const TOP_PROFILES_SQL: &str = r#"
    SELECT p.id AS author_id, u.username AS author_username, u.email AS author_email,
           p.avatar AS author_avatar, p.rating AS author_rating
    FROM profiles p
    JOIN users u ON u.id = p.user_id
    ORDER BY p.rating DESC, p.id ASC
    LIMIT ?
"#;

// ============================================================================
// SQLite implementations
// ============================================================================

async fn get_profile_by_user_sqlite(pool: &SqlitePool, user_id: i64) -> Result<Option<Profile>> {
    let row = sqlx::query(
        "SELECT id, user_id, avatar, rating, created_at FROM profiles WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("Failed to get profile by user")?;

    Ok(row.map(|row| Profile {
        id: row.get("id"),
        user_id: row.get("user_id"),
        avatar: row.get("avatar"),
        rating: row.get("rating"),
        created_at: row.get("created_at"),
    }))
}

async fn top_profiles_sqlite(pool: &SqlitePool, limit: i64) -> Result<Vec<Author>> {
    let rows = sqlx::query(TOP_PROFILES_SQL)
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to list top profiles")?;

    Ok(rows.iter().map(author_from_sqlite_row).collect())
}

pub(crate) fn author_from_sqlite_row(row: &sqlx::sqlite::SqliteRow) -> Author {
    let avatar: Option<String> = row.get("author_avatar");
    let email: String = row.get("author_email");
    Author::new(
        row.get("author_id"),
        row.get("author_username"),
        avatar.as_deref(),
        &email,
        row.get("author_rating"),
    )
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn get_profile_by_user_mysql(pool: &MySqlPool, user_id: i64) -> Result<Option<Profile>> {
    let row = sqlx::query(
        "SELECT id, user_id, avatar, rating, created_at FROM profiles WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("Failed to get profile by user")?;

    Ok(row.map(|row| Profile {
        id: row.get("id"),
        user_id: row.get("user_id"),
        avatar: row.get("avatar"),
        rating: row.get("rating"),
        created_at: row.get("created_at"),
    }))
}

async fn top_profiles_mysql(pool: &MySqlPool, limit: i64) -> Result<Vec<Author>> {
    let rows = sqlx::query(TOP_PROFILES_SQL)
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to list top profiles")?;

    Ok(rows.iter().map(author_from_mysql_row).collect())
}

pub(crate) fn author_from_mysql_row(row: &sqlx::mysql::MySqlRow) -> Author {
    let avatar: Option<String> = row.get("author_avatar");
    let email: String = row.get("author_email");
    Author::new(
        row.get("author_id"),
        row.get("author_username"),
        avatar.as_deref(),
        &email,
        row.get("author_rating"),
    )
}
