//! Question repository
//!
//! Listing queries return [`QuestionCard`]s: the question joined with its
//! author, its comment count and its tags. Tags are loaded with one extra
//! query per page.

use crate::db::{Backend, DynDatabasePool};
use crate::models::{CreateQuestionInput, Question, QuestionCard, Tag};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySql, MySqlPool, QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::HashMap;
use std::sync::Arc;

use super::profile::{author_from_mysql_row, author_from_sqlite_row};

/// Question repository trait
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Create a question, getting or creating its tags, in one transaction
    async fn create(&self, input: &CreateQuestionInput) -> Result<Question>;

    /// Get a single question card
    async fn get_card(&self, id: i64) -> Result<Option<QuestionCard>>;

    /// Count all questions
    async fn count(&self) -> Result<i64>;

    /// Newest first
    async fn list_newest(&self, offset: i64, limit: i64) -> Result<Vec<QuestionCard>>;

    /// Highest rated first
    async fn list_top(&self, offset: i64, limit: i64) -> Result<Vec<QuestionCard>>;

    /// Count questions carrying a tag
    async fn count_by_tag(&self, tag_id: i64) -> Result<i64>;

    /// Questions carrying a tag, newest first
    async fn list_by_tag(&self, tag_id: i64, offset: i64, limit: i64) -> Result<Vec<QuestionCard>>;

    /// Record a like from `profile_id`. Returns false if it was already recorded.
    async fn like(&self, question_id: i64, profile_id: i64) -> Result<bool>;
}

pub struct SqlxQuestionRepository {
    pool: DynDatabasePool,
}

impl SqlxQuestionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn QuestionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl QuestionRepository for SqlxQuestionRepository {
    async fn create(&self, input: &CreateQuestionInput) -> Result<Question> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => create_question_sqlite(pool, input).await,
            Backend::Mysql(pool) => create_question_mysql(pool, input).await,
        }
    }

    async fn get_card(&self, id: i64) -> Result<Option<QuestionCard>> {
        let sql = card_query("WHERE q.id = ?", "q.id");
        let cards = match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(&sql)
                    .bind(id)
                    .bind(1i64)
                    .bind(0i64)
                    .fetch_all(pool)
                    .await
                    .context("Failed to get question")?;
                cards_sqlite(pool, &rows).await?
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(&sql)
                    .bind(id)
                    .bind(1i64)
                    .bind(0i64)
                    .fetch_all(pool)
                    .await
                    .context("Failed to get question")?;
                cards_mysql(pool, &rows).await?
            }
        };
        Ok(cards.into_iter().next())
    }

    async fn count(&self) -> Result<i64> {
        let sql = "SELECT COUNT(*) AS count FROM questions";
        let row = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .fetch_one(pool)
                .await
                .context("Failed to count questions")?
                .get::<i64, _>("count"),
            Backend::Mysql(pool) => sqlx::query(sql)
                .fetch_one(pool)
                .await
                .context("Failed to count questions")?
                .get::<i64, _>("count"),
        };
        Ok(row)
    }

    async fn list_newest(&self, offset: i64, limit: i64) -> Result<Vec<QuestionCard>> {
        let sql = card_query("", "q.created_at DESC, q.id DESC");
        match self.pool.backend() {
            Backend::Sqlite(pool) => list_cards_sqlite(pool, &sql, None, offset, limit).await,
            Backend::Mysql(pool) => list_cards_mysql(pool, &sql, None, offset, limit).await,
        }
    }

    async fn list_top(&self, offset: i64, limit: i64) -> Result<Vec<QuestionCard>> {
        let sql = card_query("", "q.rating DESC, q.created_at DESC, q.id DESC");
        match self.pool.backend() {
            Backend::Sqlite(pool) => list_cards_sqlite(pool, &sql, None, offset, limit).await,
            Backend::Mysql(pool) => list_cards_mysql(pool, &sql, None, offset, limit).await,
        }
    }

    async fn count_by_tag(&self, tag_id: i64) -> Result<i64> {
        let sql = "SELECT COUNT(*) AS count FROM question_tags WHERE tag_id = ?";
        let count = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(tag_id)
                .fetch_one(pool)
                .await
                .context("Failed to count questions by tag")?
                .get::<i64, _>("count"),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(tag_id)
                .fetch_one(pool)
                .await
                .context("Failed to count questions by tag")?
                .get::<i64, _>("count"),
        };
        Ok(count)
    }

    async fn list_by_tag(&self, tag_id: i64, offset: i64, limit: i64) -> Result<Vec<QuestionCard>> {
        let sql = card_query(
            "JOIN question_tags qt ON qt.question_id = q.id WHERE qt.tag_id = ?",
            "q.created_at DESC, q.id DESC",
        );
        match self.pool.backend() {
            Backend::Sqlite(pool) => list_cards_sqlite(pool, &sql, Some(tag_id), offset, limit).await,
            Backend::Mysql(pool) => list_cards_mysql(pool, &sql, Some(tag_id), offset, limit).await,
        }
    }

    async fn like(&self, question_id: i64, profile_id: i64) -> Result<bool> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => like_question_sqlite(pool, question_id, profile_id).await,
            Backend::Mysql(pool) => like_question_mysql(pool, question_id, profile_id).await,
        }
    }
}

/// Card SELECT with a filter clause, ordering and `LIMIT ? OFFSET ?`
fn card_query(filter: &str, order: &str) -> String {
    format!(
        r#"
        SELECT q.id, q.title, q.content, q.author_id, q.rating, q.created_at,
               u.username AS author_username, u.email AS author_email,
               p.avatar AS author_avatar, p.rating AS author_rating,
               (SELECT COUNT(*) FROM comments c WHERE c.question_id = q.id) AS comment_count
        FROM questions q
        JOIN profiles p ON p.id = q.author_id
        JOIN users u ON u.id = p.user_id
        {}
        ORDER BY {}
        LIMIT ? OFFSET ?
        "#,
        filter, order
    )
}

const TAGS_FOR_QUESTIONS_SQL: &str = r#"
    SELECT qt.question_id, t.id, t.name
    FROM question_tags qt
    JOIN tags t ON t.id = qt.tag_id
    WHERE qt.question_id IN ("#;

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_question_sqlite(pool: &SqlitePool, input: &CreateQuestionInput) -> Result<Question> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let id = sqlx::query(
        r#"
        INSERT INTO questions (title, content, author_id, rating, created_at)
        VALUES (?, ?, ?, 0, ?)
        "#,
    )
    .bind(&input.title)
    .bind(&input.content)
    .bind(input.author_id)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to create question")?
    .last_insert_rowid();

    for name in &input.tags {
        let existing = sqlx::query("SELECT id FROM tags WHERE name = ?")
            .bind(name)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to look up tag")?;
        let tag_id: i64 = match existing {
            Some(row) => row.get("id"),
            None => sqlx::query("INSERT INTO tags (name) VALUES (?)")
                .bind(name)
                .execute(&mut *tx)
                .await
                .context("Failed to create tag")?
                .last_insert_rowid(),
        };

        sqlx::query("INSERT OR IGNORE INTO question_tags (question_id, tag_id) VALUES (?, ?)")
            .bind(id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .context("Failed to tag question")?;
    }

    tx.commit().await.context("Failed to commit question")?;

    Ok(new_question(input, id, now))
}

async fn list_cards_sqlite(
    pool: &SqlitePool,
    sql: &str,
    filter: Option<i64>,
    offset: i64,
    limit: i64,
) -> Result<Vec<QuestionCard>> {
    let mut query = sqlx::query(sql);
    if let Some(value) = filter {
        query = query.bind(value);
    }
    let rows = query
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list questions")?;

    cards_sqlite(pool, &rows).await
}

async fn cards_sqlite(pool: &SqlitePool, rows: &[sqlx::sqlite::SqliteRow]) -> Result<Vec<QuestionCard>> {
    let ids: Vec<i64> = rows.iter().map(|row| row.get("id")).collect();
    let mut tags = tags_for_questions_sqlite(pool, &ids).await?;

    Ok(rows
        .iter()
        .map(|row| {
            let question = Question {
                id: row.get("id"),
                title: row.get("title"),
                content: row.get("content"),
                author_id: row.get("author_id"),
                rating: row.get("rating"),
                created_at: row.get("created_at"),
            };
            QuestionCard {
                tags: tags.remove(&question.id).unwrap_or_default(),
                author: author_from_sqlite_row(row),
                comment_count: row.get("comment_count"),
                question,
            }
        })
        .collect())
}

async fn tags_for_questions_sqlite(pool: &SqlitePool, ids: &[i64]) -> Result<HashMap<i64, Vec<Tag>>> {
    let mut tags: HashMap<i64, Vec<Tag>> = HashMap::new();
    if ids.is_empty() {
        return Ok(tags);
    }

    let mut builder = QueryBuilder::<Sqlite>::new(TAGS_FOR_QUESTIONS_SQL);
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(") ORDER BY t.name ASC");

    let rows = builder
        .build()
        .fetch_all(pool)
        .await
        .context("Failed to load question tags")?;

    for row in rows {
        tags.entry(row.get("question_id")).or_default().push(Tag {
            id: row.get("id"),
            name: row.get("name"),
        });
    }
    Ok(tags)
}

async fn like_question_sqlite(pool: &SqlitePool, question_id: i64, profile_id: i64) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let inserted = sqlx::query(
        "INSERT OR IGNORE INTO question_likes (question_id, profile_id, created_at) VALUES (?, ?, ?)",
    )
    .bind(question_id)
    .bind(profile_id)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await
    .context("Failed to record question like")?
    .rows_affected();

    if inserted == 0 {
        tx.rollback().await.context("Failed to roll back like")?;
        return Ok(false);
    }

    sqlx::query("UPDATE questions SET rating = rating + 1 WHERE id = ?")
        .bind(question_id)
        .execute(&mut *tx)
        .await
        .context("Failed to update question rating")?;

    sqlx::query(
        "UPDATE profiles SET rating = rating + 1 WHERE id = (SELECT author_id FROM questions WHERE id = ?)",
    )
    .bind(question_id)
    .execute(&mut *tx)
    .await
    .context("Failed to update author rating")?;

    tx.commit().await.context("Failed to commit like")?;
    Ok(true)
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_question_mysql(pool: &MySqlPool, input: &CreateQuestionInput) -> Result<Question> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let id = sqlx::query(
        r#"
        INSERT INTO questions (title, content, author_id, rating, created_at)
        VALUES (?, ?, ?, 0, ?)
        "#,
    )
    .bind(&input.title)
    .bind(&input.content)
    .bind(input.author_id)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to create question")?
    .last_insert_id() as i64;

    for name in &input.tags {
        let existing = sqlx::query("SELECT id FROM tags WHERE name = ?")
            .bind(name)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to look up tag")?;
        let tag_id: i64 = match existing {
            Some(row) => row.get("id"),
            None => sqlx::query("INSERT INTO tags (name) VALUES (?)")
                .bind(name)
                .execute(&mut *tx)
                .await
                .context("Failed to create tag")?
                .last_insert_id() as i64,
        };

        sqlx::query("INSERT IGNORE INTO question_tags (question_id, tag_id) VALUES (?, ?)")
            .bind(id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .context("Failed to tag question")?;
    }

    tx.commit().await.context("Failed to commit question")?;

    Ok(new_question(input, id, now))
}

async fn list_cards_mysql(
    pool: &MySqlPool,
    sql: &str,
    filter: Option<i64>,
    offset: i64,
    limit: i64,
) -> Result<Vec<QuestionCard>> {
    let mut query = sqlx::query(sql);
    if let Some(value) = filter {
        query = query.bind(value);
    }
    let rows = query
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list questions")?;

    cards_mysql(pool, &rows).await
}

async fn cards_mysql(pool: &MySqlPool, rows: &[sqlx::mysql::MySqlRow]) -> Result<Vec<QuestionCard>> {
    let ids: Vec<i64> = rows.iter().map(|row| row.get("id")).collect();
    let mut tags = tags_for_questions_mysql(pool, &ids).await?;

    Ok(rows
        .iter()
        .map(|row| {
            let question = Question {
                id: row.get("id"),
                title: row.get("title"),
                content: row.get("content"),
                author_id: row.get("author_id"),
                rating: row.get("rating"),
                created_at: row.get("created_at"),
            };
            QuestionCard {
                tags: tags.remove(&question.id).unwrap_or_default(),
                author: author_from_mysql_row(row),
                comment_count: row.get("comment_count"),
                question,
            }
        })
        .collect())
}

async fn tags_for_questions_mysql(pool: &MySqlPool, ids: &[i64]) -> Result<HashMap<i64, Vec<Tag>>> {
    let mut tags: HashMap<i64, Vec<Tag>> = HashMap::new();
    if ids.is_empty() {
        return Ok(tags);
    }

    let mut builder = QueryBuilder::<MySql>::new(TAGS_FOR_QUESTIONS_SQL);
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(") ORDER BY t.name ASC");

    let rows = builder
        .build()
        .fetch_all(pool)
        .await
        .context("Failed to load question tags")?;

    for row in rows {
        tags.entry(row.get("question_id")).or_default().push(Tag {
            id: row.get("id"),
            name: row.get("name"),
        });
    }
    Ok(tags)
}

async fn like_question_mysql(pool: &MySqlPool, question_id: i64, profile_id: i64) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let inserted = sqlx::query(
        "INSERT IGNORE INTO question_likes (question_id, profile_id, created_at) VALUES (?, ?, ?)",
    )
    .bind(question_id)
    .bind(profile_id)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await
    .context("Failed to record question like")?
    .rows_affected();

    if inserted == 0 {
        tx.rollback().await.context("Failed to roll back like")?;
        return Ok(false);
    }

    sqlx::query("UPDATE questions SET rating = rating + 1 WHERE id = ?")
        .bind(question_id)
        .execute(&mut *tx)
        .await
        .context("Failed to update question rating")?;

    // MySQL cannot read the updated table in a subquery of the same UPDATE
    sqlx::query(
        "UPDATE profiles p JOIN questions q ON q.author_id = p.id SET p.rating = p.rating + 1 WHERE q.id = ?",
    )
    .bind(question_id)
    .execute(&mut *tx)
    .await
    .context("Failed to update author rating")?;

    tx.commit().await.context("Failed to commit like")?;
    Ok(true)
}

fn new_question(input: &CreateQuestionInput, id: i64, now: chrono::DateTime<Utc>) -> Question {
    Question {
        id,
        title: input.title.clone(),
        content: input.content.clone(),
        author_id: input.author_id,
        rating: 0,
        created_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{seed_profile, seed_question, setup_pool};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxQuestionRepository, i64) {
        let pool = setup_pool().await;
        let (_, profile_id) = seed_profile(&pool, "asker").await;
        let repo = SqlxQuestionRepository::new(pool.clone());
        (pool, repo, profile_id)
    }

    fn input(author_id: i64, title: &str, tags: &[&str]) -> CreateQuestionInput {
        CreateQuestionInput {
            author_id,
            title: title.to_string(),
            content: format!("Body of {}", title),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_create_question_with_tags() {
        let (_pool, repo, author) = setup_test_repo().await;

        let question = repo
            .create(&input(author, "How do lifetimes work?", &["rust", "borrowck"]))
            .await
            .expect("Failed to create question");
        let card = repo
            .get_card(question.id)
            .await
            .expect("Failed to get question")
            .expect("Question not found");

        assert_eq!(card.question.title, "How do lifetimes work?");
        assert_eq!(card.author.username, "asker");
        assert_eq!(card.comment_count, 0);
        let names: Vec<&str> = card.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["borrowck", "rust"]);
    }

    #[tokio::test]
    async fn test_existing_tags_are_reused() {
        let (pool, repo, author) = setup_test_repo().await;
        repo.create(&input(author, "First", &["rust"])).await.unwrap();
        repo.create(&input(author, "Second", &["rust", "async"])).await.unwrap();

        let sqlite = pool.as_sqlite().unwrap();
        let count: i64 = sqlx::query("SELECT COUNT(*) AS count FROM tags")
            .fetch_one(sqlite)
            .await
            .unwrap()
            .get("count");
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_failed_create_leaves_no_tags() {
        let (pool, repo, _) = setup_test_repo().await;

        // Unknown author violates the foreign key before any tag is written
        let result = repo.create(&input(999, "Orphan", &["lonely"])).await;

        assert!(result.is_err());
        let sqlite = pool.as_sqlite().unwrap();
        let count: i64 = sqlx::query("SELECT COUNT(*) AS count FROM tags")
            .fetch_one(sqlite)
            .await
            .unwrap()
            .get("count");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_get_card_not_found() {
        let (_pool, repo, _) = setup_test_repo().await;
        assert!(repo.get_card(12345).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_newest_orders_by_creation_desc() {
        let (pool, repo, author) = setup_test_repo().await;
        for title in ["one", "two", "three"] {
            seed_question(&pool, author, title, &[]).await;
        }

        let first_page = repo.list_newest(0, 2).await.expect("Failed to list");
        let second_page = repo.list_newest(2, 2).await.expect("Failed to list");

        let titles: Vec<&str> = first_page.iter().map(|c| c.question.title.as_str()).collect();
        assert_eq!(titles, vec!["three", "two"]);
        assert_eq!(second_page.len(), 1);
        assert_eq!(second_page[0].question.title, "one");
        assert_eq!(repo.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_list_top_orders_by_rating() {
        let (pool, repo, author) = setup_test_repo().await;
        let (_, fan_a) = seed_profile(&pool, "fan_a").await;
        let (_, fan_b) = seed_profile(&pool, "fan_b").await;
        let cold = seed_question(&pool, author, "cold", &[]).await;
        let warm = seed_question(&pool, author, "warm", &[]).await;
        let hot = seed_question(&pool, author, "hot", &[]).await;
        let _ = cold;
        repo.like(hot, fan_a).await.unwrap();
        repo.like(hot, fan_b).await.unwrap();
        repo.like(warm, fan_a).await.unwrap();

        let top = repo.list_top(0, 10).await.expect("Failed to list");

        let titles: Vec<&str> = top.iter().map(|c| c.question.title.as_str()).collect();
        assert_eq!(titles, vec!["hot", "warm", "cold"]);
        assert_eq!(top[0].question.rating, 2);
    }

    #[tokio::test]
    async fn test_like_is_counted_once_and_rewards_author() {
        let (pool, repo, author) = setup_test_repo().await;
        let (_, fan) = seed_profile(&pool, "fan").await;
        let question = seed_question(&pool, author, "liked", &[]).await;

        assert!(repo.like(question, fan).await.unwrap());
        assert!(!repo.like(question, fan).await.unwrap());

        let card = repo.get_card(question).await.unwrap().unwrap();
        assert_eq!(card.question.rating, 1);
        assert_eq!(card.author.rating, 1);
    }

    #[tokio::test]
    async fn test_list_by_tag() {
        let (pool, repo, author) = setup_test_repo().await;
        seed_question(&pool, author, "rust one", &["rust"]).await;
        seed_question(&pool, author, "python", &["python"]).await;
        seed_question(&pool, author, "rust two", &["rust", "async"]).await;
        let rust = crate::db::repositories::SqlxTagRepository::new(pool.clone());
        let rust = crate::db::repositories::TagRepository::get_by_name(&rust, "rust")
            .await
            .unwrap()
            .unwrap();

        let cards = repo.list_by_tag(rust.id, 0, 10).await.expect("Failed to list");

        let titles: Vec<&str> = cards.iter().map(|c| c.question.title.as_str()).collect();
        assert_eq!(titles, vec!["rust two", "rust one"]);
        assert_eq!(cards[0].tags.len(), 2);
        assert_eq!(repo.count_by_tag(rust.id).await.unwrap(), 2);
    }
}
