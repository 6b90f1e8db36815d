//! Session repository

use crate::db::{Backend, DynDatabasePool};
use crate::models::Session;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{
    mysql::{MySqlArguments, MySqlRow},
    query::Query,
    sqlite::{SqliteArguments, SqliteRow},
    MySql, Row, Sqlite,
};
use std::sync::Arc;

/// Storage for login sessions
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Store a freshly issued session
    async fn create(&self, session: &Session) -> Result<Session>;

    /// Look a session up by its token
    async fn get_by_id(&self, id: &str) -> Result<Option<Session>>;

    async fn delete(&self, id: &str) -> Result<()>;

    /// Remove sessions past `expires_at`; returns how many were removed
    async fn delete_expired(&self) -> Result<u64>;
}

pub struct SqlxSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxSessionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

// Both dialects accept the same statements here.
const INSERT_SESSION_SQL: &str =
    "INSERT INTO sessions (id, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)";
const SELECT_SESSION_SQL: &str =
    "SELECT id, user_id, expires_at, created_at FROM sessions WHERE id = ?";
const DELETE_SESSION_SQL: &str = "DELETE FROM sessions WHERE id = ?";
const DELETE_EXPIRED_SQL: &str = "DELETE FROM sessions WHERE expires_at < ?";

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: &Session) -> Result<Session> {
        let result = match self.pool.backend() {
            Backend::Sqlite(pool) => bind_session_sqlite(sqlx::query(INSERT_SESSION_SQL), session)
                .execute(pool)
                .await
                .map(|_| ()),
            Backend::Mysql(pool) => bind_session_mysql(sqlx::query(INSERT_SESSION_SQL), session)
                .execute(pool)
                .await
                .map(|_| ()),
        };
        result.context("Failed to create session")?;

        Ok(session.clone())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Session>> {
        let session = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(SELECT_SESSION_SQL)
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("Failed to get session by ID")?
                .map(|row| session_from_sqlite_row(&row)),
            Backend::Mysql(pool) => sqlx::query(SELECT_SESSION_SQL)
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("Failed to get session by ID")?
                .map(|row| session_from_mysql_row(&row)),
        };
        Ok(session)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let result = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(DELETE_SESSION_SQL).bind(id).execute(pool).await.map(|_| ()),
            Backend::Mysql(pool) => sqlx::query(DELETE_SESSION_SQL).bind(id).execute(pool).await.map(|_| ()),
        };
        result.context("Failed to delete session")
    }

    async fn delete_expired(&self) -> Result<u64> {
        let now = Utc::now();
        let removed = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(DELETE_EXPIRED_SQL)
                .bind(now)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
            Backend::Mysql(pool) => sqlx::query(DELETE_EXPIRED_SQL)
                .bind(now)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
        }
        .context("Failed to delete expired sessions")?;

        if removed > 0 {
            tracing::debug!(removed, "Deleted expired sessions");
        }
        Ok(removed)
    }
}

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;
type MysqlQuery<'q> = Query<'q, MySql, MySqlArguments>;

fn bind_session_sqlite<'q>(query: SqliteQuery<'q>, session: &'q Session) -> SqliteQuery<'q> {
    query
        .bind(&session.id)
        .bind(session.user_id)
        .bind(session.expires_at)
        .bind(session.created_at)
}

fn bind_session_mysql<'q>(query: MysqlQuery<'q>, session: &'q Session) -> MysqlQuery<'q> {
    query
        .bind(&session.id)
        .bind(session.user_id)
        .bind(session.expires_at)
        .bind(session.created_at)
}

fn session_from_sqlite_row(row: &SqliteRow) -> Session {
    Session {
        id: row.get("id"),
        user_id: row.get("user_id"),
        expires_at: row.get("expires_at"),
        created_at: row.get("created_at"),
    }
}

fn session_from_mysql_row(row: &MySqlRow) -> Session {
    Session {
        id: row.get("id"),
        user_id: row.get("user_id"),
        expires_at: row.get("expires_at"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{seed_profile, setup_pool};
    use chrono::Duration;

    async fn setup_test_repo() -> (DynDatabasePool, SqlxSessionRepository, i64) {
        let pool = setup_pool().await;
        let (user_id, _) = seed_profile(&pool, "sessionuser").await;
        let repo = SqlxSessionRepository::new(pool.clone());
        (pool, repo, user_id)
    }

    #[tokio::test]
    async fn test_create_and_get_session() {
        let (_pool, repo, user_id) = setup_test_repo().await;
        let session = Session::new(user_id, 7);

        repo.create(&session).await.expect("Failed to create session");
        let found = repo
            .get_by_id(&session.id)
            .await
            .expect("Failed to get session")
            .expect("Session not found");

        assert_eq!(found.id, session.id);
        assert_eq!(found.user_id, user_id);
        assert!(!found.is_expired());
    }

    #[tokio::test]
    async fn test_get_session_not_found() {
        let (_pool, repo, _) = setup_test_repo().await;
        let found = repo.get_by_id("missing").await.expect("Failed to get session");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_session_requires_existing_user() {
        let (_pool, repo, _) = setup_test_repo().await;
        assert!(repo.create(&Session::new(999, 7)).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_session() {
        let (_pool, repo, user_id) = setup_test_repo().await;
        let session = Session::new(user_id, 7);
        repo.create(&session).await.unwrap();

        repo.delete(&session.id).await.expect("Failed to delete session");

        assert!(repo.get_by_id(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_expired_sessions() {
        let (_pool, repo, user_id) = setup_test_repo().await;
        let live = Session::new(user_id, 7);
        let mut stale = Session::new(user_id, 7);
        stale.expires_at = Utc::now() - Duration::hours(1);
        repo.create(&live).await.unwrap();
        repo.create(&stale).await.unwrap();

        let removed = repo.delete_expired().await.expect("Failed to delete expired");

        assert_eq!(removed, 1);
        assert!(repo.get_by_id(&live.id).await.unwrap().is_some());
        assert!(repo.get_by_id(&stale.id).await.unwrap().is_none());
    }
}
