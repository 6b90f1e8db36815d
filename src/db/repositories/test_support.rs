//! Fixtures shared by the repository tests

use super::{QuestionRepository, SqlxQuestionRepository, SqlxUserRepository, UserRepository};
use crate::db::{create_test_pool, migrations::run_migrations, DynDatabasePool};
use crate::models::{CreateQuestionInput, CreateUserInput};
use chrono::{Duration, Utc};

/// In-memory database with every migration applied
pub(crate) async fn setup_pool() -> DynDatabasePool {
    let pool = create_test_pool()
        .await
        .expect("Failed to create test pool");
    run_migrations(&pool).await.expect("Failed to run migrations");
    pool
}

/// Create a user and return `(user_id, profile_id)`
pub(crate) async fn seed_profile(pool: &DynDatabasePool, username: &str) -> (i64, i64) {
    let repo = SqlxUserRepository::new(pool.clone());
    let (user, profile) = repo
        .create(&CreateUserInput {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password_hash: "hash".to_string(),
            avatar: None,
        })
        .await
        .expect("Failed to seed user");
    (user.id, profile.id)
}

pub(crate) async fn set_rating(pool: &DynDatabasePool, profile_id: i64, rating: i64) {
    let sqlite = pool.as_sqlite().expect("sqlite pool");
    sqlx::query("UPDATE profiles SET rating = ? WHERE id = ?")
        .bind(rating)
        .bind(profile_id)
        .execute(sqlite)
        .await
        .expect("Failed to set rating");
}

pub(crate) async fn insert_session(pool: &DynDatabasePool, token: &str, user_id: i64) {
    let sqlite = pool.as_sqlite().expect("sqlite pool");
    let now = Utc::now();
    sqlx::query("INSERT INTO sessions (id, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)")
        .bind(token)
        .bind(user_id)
        .bind(now + Duration::days(1))
        .bind(now)
        .execute(sqlite)
        .await
        .expect("Failed to insert session");
}

/// Ask a question, creating tags in the order given
pub(crate) async fn seed_question(
    pool: &DynDatabasePool,
    author_id: i64,
    title: &str,
    tags: &[&str],
) -> i64 {
    let repo = SqlxQuestionRepository::new(pool.clone());
    repo.create(&CreateQuestionInput {
        author_id,
        title: title.to_string(),
        content: format!("{} content", title),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    })
    .await
    .expect("Failed to seed question")
    .id
}
