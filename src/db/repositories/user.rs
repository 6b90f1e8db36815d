//! User repository
//!
//! Accounts are always created together with their profile, and settings
//! changes touch the user row, the profile row and (on a password change)
//! the user's sessions in one transaction.

use crate::db::{Backend, DynDatabasePool};
use crate::models::{CreateUserInput, Profile, SettingsChange, User};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a user and its profile atomically
    async fn create(&self, input: &CreateUserInput) -> Result<(User, Profile)>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by username
    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Apply a settings change atomically
    async fn apply_settings(&self, user_id: i64, change: &SettingsChange) -> Result<User>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, input: &CreateUserInput) -> Result<(User, Profile)> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => create_user_sqlite(pool, input).await,
            Backend::Mysql(pool) => create_user_mysql(pool, input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_user_by_id_sqlite(pool, id).await,
            Backend::Mysql(pool) => get_user_by_id_mysql(pool, id).await,
        }
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_user_by_username_sqlite(pool, username).await,
            Backend::Mysql(pool) => get_user_by_username_mysql(pool, username).await,
        }
    }

    async fn apply_settings(&self, user_id: i64, change: &SettingsChange) -> Result<User> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => apply_settings_sqlite(pool, user_id, change).await,
            Backend::Mysql(pool) => apply_settings_mysql(pool, user_id, change).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, input: &CreateUserInput) -> Result<(User, Profile)> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let user_id = sqlx::query(
        r#"
        INSERT INTO users (username, email, password_hash, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.username)
    .bind(&input.email)
    .bind(&input.password_hash)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to create user")?
    .last_insert_rowid();

    let profile_id = sqlx::query(
        "INSERT INTO profiles (user_id, avatar, rating, created_at) VALUES (?, ?, 0, ?)",
    )
    .bind(user_id)
    .bind(&input.avatar)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to create profile")?
    .last_insert_rowid();

    tx.commit().await.context("Failed to commit user creation")?;

    Ok(new_account(input, user_id, profile_id, now))
}

async fn get_user_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT id, username, email, password_hash, created_at, updated_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by ID")?;

    Ok(row.as_ref().map(row_to_user_sqlite))
}

async fn get_user_by_username_sqlite(pool: &SqlitePool, username: &str) -> Result<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT id, username, email, password_hash, created_at, updated_at
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by username")?;

    Ok(row.as_ref().map(row_to_user_sqlite))
}

async fn apply_settings_sqlite(
    pool: &SqlitePool,
    user_id: i64,
    change: &SettingsChange,
) -> Result<User> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query(
        r#"
        UPDATE users
        SET email = COALESCE(?, email),
            password_hash = COALESCE(?, password_hash),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&change.email)
    .bind(&change.password_hash)
    .bind(Utc::now())
    .bind(user_id)
    .execute(&mut *tx)
    .await
    .context("Failed to update user")?;

    sqlx::query("UPDATE profiles SET avatar = ? WHERE user_id = ?")
        .bind(&change.avatar)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .context("Failed to update avatar")?;

    if change.password_hash.is_some() {
        sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .context("Failed to revoke sessions")?;
    }

    let row = sqlx::query(
        r#"
        SELECT id, username, email, password_hash, created_at, updated_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await
    .context("Failed to reload user")?
    .ok_or_else(|| anyhow::anyhow!("User not found after update"))?;

    tx.commit().await.context("Failed to commit settings")?;

    Ok(row_to_user_sqlite(&row))
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, input: &CreateUserInput) -> Result<(User, Profile)> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let user_id = sqlx::query(
        r#"
        INSERT INTO users (username, email, password_hash, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.username)
    .bind(&input.email)
    .bind(&input.password_hash)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to create user")?
    .last_insert_id() as i64;

    let profile_id = sqlx::query(
        "INSERT INTO profiles (user_id, avatar, rating, created_at) VALUES (?, ?, 0, ?)",
    )
    .bind(user_id)
    .bind(&input.avatar)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to create profile")?
    .last_insert_id() as i64;

    tx.commit().await.context("Failed to commit user creation")?;

    Ok(new_account(input, user_id, profile_id, now))
}

async fn get_user_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT id, username, email, password_hash, created_at, updated_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by ID")?;

    Ok(row.as_ref().map(row_to_user_mysql))
}

async fn get_user_by_username_mysql(pool: &MySqlPool, username: &str) -> Result<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT id, username, email, password_hash, created_at, updated_at
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by username")?;

    Ok(row.as_ref().map(row_to_user_mysql))
}

async fn apply_settings_mysql(
    pool: &MySqlPool,
    user_id: i64,
    change: &SettingsChange,
) -> Result<User> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query(
        r#"
        UPDATE users
        SET email = COALESCE(?, email),
            password_hash = COALESCE(?, password_hash),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&change.email)
    .bind(&change.password_hash)
    .bind(Utc::now())
    .bind(user_id)
    .execute(&mut *tx)
    .await
    .context("Failed to update user")?;

    sqlx::query("UPDATE profiles SET avatar = ? WHERE user_id = ?")
        .bind(&change.avatar)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .context("Failed to update avatar")?;

    if change.password_hash.is_some() {
        sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .context("Failed to revoke sessions")?;
    }

    let row = sqlx::query(
        r#"
        SELECT id, username, email, password_hash, created_at, updated_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await
    .context("Failed to reload user")?
    .ok_or_else(|| anyhow::anyhow!("User not found after update"))?;

    tx.commit().await.context("Failed to commit settings")?;

    Ok(row_to_user_mysql(&row))
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn new_account(
    input: &CreateUserInput,
    user_id: i64,
    profile_id: i64,
    now: chrono::DateTime<Utc>,
) -> (User, Profile) {
    let user = User {
        id: user_id,
        username: input.username.clone(),
        email: input.email.clone(),
        password_hash: input.password_hash.clone(),
        created_at: now,
        updated_at: now,
    };
    let profile = Profile {
        id: profile_id,
        user_id,
        avatar: input.avatar.clone(),
        rating: 0,
        created_at: now,
    };
    (user, profile)
}
