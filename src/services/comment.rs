//! Comment service
//!
//! Comments are the answers shown under a question, most liked first.

use crate::db::repositories::{CommentRepository, QuestionRepository};
use crate::models::{Comment, CommentView, CreateCommentInput, CurrentUser, Page, PageWindow};
use crate::services::forms::{self, CommentForm, FormErrors};
use anyhow::Context;
use std::sync::Arc;

/// Error types for comment service operations
#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    #[error("Invalid form: {0:?}")]
    Form(FormErrors),

    #[error("Question not found: {0}")]
    QuestionNotFound(i64),

    #[error("Comment not found: {0}")]
    CommentNotFound(i64),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<FormErrors> for CommentServiceError {
    fn from(errors: FormErrors) -> Self {
        CommentServiceError::Form(errors)
    }
}

pub struct CommentService {
    comment_repo: Arc<dyn CommentRepository>,
    question_repo: Arc<dyn QuestionRepository>,
    per_page: i64,
}

impl CommentService {
    pub fn new(
        comment_repo: Arc<dyn CommentRepository>,
        question_repo: Arc<dyn QuestionRepository>,
        per_page: i64,
    ) -> Self {
        Self {
            comment_repo,
            question_repo,
            per_page,
        }
    }

    /// One page of a question's comments
    pub async fn comments_for_question(
        &self,
        question_id: i64,
        page: Option<&str>,
    ) -> Result<Page<CommentView>, CommentServiceError> {
        let total = self
            .comment_repo
            .count_by_question(question_id)
            .await
            .context("Failed to count comments")?;
        let window = PageWindow::resolve(page, total, self.per_page);
        let items = self
            .comment_repo
            .list_by_question(question_id, window.offset(), window.limit())
            .await
            .context("Failed to list comments")?;
        Ok(Page::new(items, window, total))
    }

    /// Page number of the last comment page; a new comment with no likes lands there
    pub async fn last_page(&self, question_id: i64) -> Result<i64, CommentServiceError> {
        let total = self
            .comment_repo
            .count_by_question(question_id)
            .await
            .context("Failed to count comments")?;
        Ok(PageWindow::resolve(None, total, self.per_page).num_pages)
    }

    /// Validate and store a comment by `author` on `question_id`
    pub async fn create(
        &self,
        author: &CurrentUser,
        question_id: i64,
        form: &CommentForm,
    ) -> Result<Comment, CommentServiceError> {
        if self
            .question_repo
            .get_card(question_id)
            .await
            .context("Failed to get question")?
            .is_none()
        {
            return Err(CommentServiceError::QuestionNotFound(question_id));
        }

        let content = forms::validate_comment(form)?;
        let comment = self
            .comment_repo
            .create(&CreateCommentInput {
                question_id,
                author_id: author.profile_id,
                content,
            })
            .await
            .context("Failed to create comment")?;

        tracing::debug!(comment_id = comment.id, question_id, "Comment created");
        Ok(comment)
    }

    /// Like a comment once per profile.
    ///
    /// Returns the comment so the caller can go back to its question.
    pub async fn like(&self, comment_id: i64, profile_id: i64) -> Result<Comment, CommentServiceError> {
        let comment = self
            .comment_repo
            .get_by_id(comment_id)
            .await
            .context("Failed to get comment")?
            .ok_or(CommentServiceError::CommentNotFound(comment_id))?;

        self.comment_repo
            .like(comment_id, profile_id)
            .await
            .context("Failed to like comment")?;
        Ok(comment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{seed_profile, seed_question, setup_pool};
    use crate::db::repositories::{SqlxCommentRepository, SqlxQuestionRepository};
    use crate::db::DynDatabasePool;
    use crate::models::User;

    struct Fixture {
        pool: DynDatabasePool,
        service: CommentService,
        author: CurrentUser,
        question_id: i64,
    }

    async fn setup(per_page: i64) -> Fixture {
        let pool = setup_pool().await;
        let (_, asker) = seed_profile(&pool, "asker").await;
        let (user_id, profile_id) = seed_profile(&pool, "answerer").await;
        let question_id = seed_question(&pool, asker, "Question", &["meta"]).await;
        let now = chrono::Utc::now();
        let user = User {
            id: user_id,
            username: "answerer".to_string(),
            email: "answerer@example.com".to_string(),
            password_hash: "hash".to_string(),
            created_at: now,
            updated_at: now,
        };
        Fixture {
            service: CommentService::new(
                SqlxCommentRepository::boxed(pool.clone()),
                SqlxQuestionRepository::boxed(pool.clone()),
                per_page,
            ),
            pool,
            author: CurrentUser::new(&user, profile_id, None),
            question_id,
        }
    }

    fn form(content: &str) -> CommentForm {
        CommentForm {
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_comment_is_listed() {
        let f = setup(30).await;

        let comment = f
            .service
            .create(&f.author, f.question_id, &form("Try this."))
            .await
            .expect("Failed to comment");
        let page = f.service.comments_for_question(f.question_id, None).await.unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].comment.id, comment.id);
        assert_eq!(page.items[0].author.username, "answerer");
    }

    #[tokio::test]
    async fn test_create_rejects_long_content() {
        let f = setup(30).await;

        let result = f
            .service
            .create(&f.author, f.question_id, &form(&"x".repeat(256)))
            .await;

        assert!(matches!(result, Err(CommentServiceError::Form(_))));
        assert_eq!(f.service.comments_for_question(f.question_id, None).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_create_on_missing_question() {
        let f = setup(30).await;
        let result = f.service.create(&f.author, 999, &form("hello")).await;
        assert!(matches!(result, Err(CommentServiceError::QuestionNotFound(999))));
    }

    #[tokio::test]
    async fn test_liked_comment_moves_to_top() {
        let f = setup(30).await;
        let (_, fan) = seed_profile(&f.pool, "fan").await;
        f.service.create(&f.author, f.question_id, &form("early")).await.unwrap();
        let late = f.service.create(&f.author, f.question_id, &form("late")).await.unwrap();

        let liked = f.service.like(late.id, fan).await.expect("Failed to like");
        f.service.like(late.id, fan).await.expect("Repeated like is a no-op");

        assert_eq!(liked.question_id, f.question_id);
        let page = f.service.comments_for_question(f.question_id, None).await.unwrap();
        let contents: Vec<&str> = page.items.iter().map(|c| c.comment.content.as_str()).collect();
        assert_eq!(contents, vec!["late", "early"]);
        assert_eq!(page.items[0].comment.like_count, 1);
    }

    #[tokio::test]
    async fn test_like_missing_comment() {
        let f = setup(30).await;
        let result = f.service.like(5, f.author.profile_id).await;
        assert!(matches!(result, Err(CommentServiceError::CommentNotFound(5))));
    }

    #[tokio::test]
    async fn test_comment_pages() {
        let f = setup(2).await;
        for i in 0..3 {
            f.service
                .create(&f.author, f.question_id, &form(&format!("c{}", i)))
                .await
                .unwrap();
        }

        let second = f.service.comments_for_question(f.question_id, Some("2")).await.unwrap();

        assert_eq!(second.num_pages, 2);
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].comment.content, "c2");
        assert_eq!(f.service.last_page(f.question_id).await.unwrap(), 2);
    }
}
