//! Comment repository

use crate::db::{Backend, DynDatabasePool};
use crate::models::{Comment, CommentView, CreateCommentInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

use super::profile::{author_from_mysql_row, author_from_sqlite_row};

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Create a new comment
    async fn create(&self, input: &CreateCommentInput) -> Result<Comment>;

    /// Get a comment by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Count comments on a question
    async fn count_by_question(&self, question_id: i64) -> Result<i64>;

    /// Comments on a question, most liked first, then oldest first
    async fn list_by_question(
        &self,
        question_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<CommentView>>;

    /// Record a like from `profile_id`. Returns false if it was already recorded.
    async fn like(&self, comment_id: i64, profile_id: i64) -> Result<bool>;
}

pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, input: &CreateCommentInput) -> Result<Comment> {
        let now = Utc::now();
        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(INSERT_COMMENT_SQL)
                .bind(input.question_id)
                .bind(input.author_id)
                .bind(&input.content)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create comment")?
                .last_insert_rowid(),
            Backend::Mysql(pool) => sqlx::query(INSERT_COMMENT_SQL)
                .bind(input.question_id)
                .bind(input.author_id)
                .bind(&input.content)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create comment")?
                .last_insert_id() as i64,
        };

        Ok(Comment {
            id,
            question_id: input.question_id,
            author_id: input.author_id,
            content: input.content.clone(),
            like_count: 0,
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_comment_sqlite(pool, id).await,
            Backend::Mysql(pool) => get_comment_mysql(pool, id).await,
        }
    }

    async fn count_by_question(&self, question_id: i64) -> Result<i64> {
        let sql = "SELECT COUNT(*) AS count FROM comments WHERE question_id = ?";
        let count = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(question_id)
                .fetch_one(pool)
                .await
                .context("Failed to count comments")?
                .get::<i64, _>("count"),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(question_id)
                .fetch_one(pool)
                .await
                .context("Failed to count comments")?
                .get::<i64, _>("count"),
        };
        Ok(count)
    }

    async fn list_by_question(
        &self,
        question_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<CommentView>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => list_comments_sqlite(pool, question_id, offset, limit).await,
            Backend::Mysql(pool) => list_comments_mysql(pool, question_id, offset, limit).await,
        }
    }

    async fn like(&self, comment_id: i64, profile_id: i64) -> Result<bool> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => like_comment_sqlite(pool, comment_id, profile_id).await,
            Backend::Mysql(pool) => like_comment_mysql(pool, comment_id, profile_id).await,
        }
    }
}

const INSERT_COMMENT_SQL: &str = r#"
    INSERT INTO comments (question_id, author_id, content, like_count, created_at)
    VALUES (?, ?, ?, 0, ?)
"#;

const SELECT_COMMENT_SQL: &str = r#"
    SELECT id, question_id, author_id, content, like_count, created_at
    FROM comments
    WHERE id = ?
"#;

const LIST_COMMENTS_SQL: &str = r#"
    SELECT c.id, c.question_id, c.author_id, c.content, c.like_count, c.created_at,
           u.username AS author_username, u.email AS author_email,
           p.avatar AS author_avatar, p.rating AS author_rating
    FROM comments c
    JOIN profiles p ON p.id = c.author_id
    JOIN users u ON u.id = p.user_id
    WHERE c.question_id = ?
    ORDER BY c.like_count DESC, c.created_at ASC, c.id ASC
    LIMIT ? OFFSET ?
"#;

// ============================================================================
// SQLite implementations
// ============================================================================

async fn get_comment_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Comment>> {
    let row = sqlx::query(SELECT_COMMENT_SQL)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get comment")?;

    Ok(row.as_ref().map(row_to_comment_sqlite))
}

async fn list_comments_sqlite(
    pool: &SqlitePool,
    question_id: i64,
    offset: i64,
    limit: i64,
) -> Result<Vec<CommentView>> {
    let rows = sqlx::query(LIST_COMMENTS_SQL)
        .bind(question_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list comments")?;

    Ok(rows
        .iter()
        .map(|row| CommentView {
            comment: row_to_comment_sqlite(row),
            author: author_from_sqlite_row(row),
        })
        .collect())
}

async fn like_comment_sqlite(pool: &SqlitePool, comment_id: i64, profile_id: i64) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let inserted = sqlx::query(
        "INSERT OR IGNORE INTO comment_likes (comment_id, profile_id, created_at) VALUES (?, ?, ?)",
    )
    .bind(comment_id)
    .bind(profile_id)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await
    .context("Failed to record comment like")?
    .rows_affected();

    if inserted == 0 {
        tx.rollback().await.context("Failed to roll back like")?;
        return Ok(false);
    }

    sqlx::query("UPDATE comments SET like_count = like_count + 1 WHERE id = ?")
        .bind(comment_id)
        .execute(&mut *tx)
        .await
        .context("Failed to update comment likes")?;

    sqlx::query(
        "UPDATE profiles SET rating = rating + 1 WHERE id = (SELECT author_id FROM comments WHERE id = ?)",
    )
    .bind(comment_id)
    .execute(&mut *tx)
    .await
    .context("Failed to update author rating")?;

    tx.commit().await.context("Failed to commit like")?;
    Ok(true)
}

fn row_to_comment_sqlite(row: &sqlx::sqlite::SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        question_id: row.get("question_id"),
        author_id: row.get("author_id"),
        content: row.get("content"),
        like_count: row.get("like_count"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn get_comment_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Comment>> {
    let row = sqlx::query(SELECT_COMMENT_SQL)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get comment")?;

    Ok(row.as_ref().map(row_to_comment_mysql))
}

async fn list_comments_mysql(
    pool: &MySqlPool,
    question_id: i64,
    offset: i64,
    limit: i64,
) -> Result<Vec<CommentView>> {
    let rows = sqlx::query(LIST_COMMENTS_SQL)
        .bind(question_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list comments")?;

    Ok(rows
        .iter()
        .map(|row| CommentView {
            comment: row_to_comment_mysql(row),
            author: author_from_mysql_row(row),
        })
        .collect())
}

async fn like_comment_mysql(pool: &MySqlPool, comment_id: i64, profile_id: i64) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let inserted = sqlx::query(
        "INSERT IGNORE INTO comment_likes (comment_id, profile_id, created_at) VALUES (?, ?, ?)",
    )
    .bind(comment_id)
    .bind(profile_id)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await
    .context("Failed to record comment like")?
    .rows_affected();

    if inserted == 0 {
        tx.rollback().await.context("Failed to roll back like")?;
        return Ok(false);
    }

    sqlx::query("UPDATE comments SET like_count = like_count + 1 WHERE id = ?")
        .bind(comment_id)
        .execute(&mut *tx)
        .await
        .context("Failed to update comment likes")?;

    sqlx::query(
        "UPDATE profiles p JOIN comments c ON c.author_id = p.id SET p.rating = p.rating + 1 WHERE c.id = ?",
    )
    .bind(comment_id)
    .execute(&mut *tx)
    .await
    .context("Failed to update author rating")?;

    tx.commit().await.context("Failed to commit like")?;
    Ok(true)
}

fn row_to_comment_mysql(row: &sqlx::mysql::MySqlRow) -> Comment {
    Comment {
        id: row.get("id"),
        question_id: row.get("question_id"),
        author_id: row.get("author_id"),
        content: row.get("content"),
        like_count: row.get("like_count"),
        created_at: row.get("created_at"),
    }
}
