//! Question service
//!
//! The three question listings (newest, hot, by tag), the question page,
//! asking and liking.

use crate::db::repositories::{QuestionRepository, TagRepository};
use crate::models::{CreateQuestionInput, CurrentUser, Page, PageWindow, Question, QuestionCard};
use crate::services::forms::{self, AskForm, FormErrors};
use anyhow::Context;
use std::sync::Arc;

/// Error types for question service operations
#[derive(Debug, thiserror::Error)]
pub enum QuestionServiceError {
    #[error("Invalid form: {0:?}")]
    Form(FormErrors),

    #[error("Question not found: {0}")]
    NotFound(i64),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<FormErrors> for QuestionServiceError {
    fn from(errors: FormErrors) -> Self {
        QuestionServiceError::Form(errors)
    }
}

pub struct QuestionService {
    question_repo: Arc<dyn QuestionRepository>,
    tag_repo: Arc<dyn TagRepository>,
    per_page: i64,
}

impl QuestionService {
    pub fn new(
        question_repo: Arc<dyn QuestionRepository>,
        tag_repo: Arc<dyn TagRepository>,
        per_page: i64,
    ) -> Self {
        Self {
            question_repo,
            tag_repo,
            per_page,
        }
    }

    /// Newest questions first
    pub async fn new_questions(&self, page: Option<&str>) -> Result<Page<QuestionCard>, QuestionServiceError> {
        let total = self.question_repo.count().await.context("Failed to count questions")?;
        let window = PageWindow::resolve(page, total, self.per_page);
        let items = self
            .question_repo
            .list_newest(window.offset(), window.limit())
            .await
            .context("Failed to list new questions")?;
        Ok(Page::new(items, window, total))
    }

    /// Highest rated questions first
    pub async fn top_questions(&self, page: Option<&str>) -> Result<Page<QuestionCard>, QuestionServiceError> {
        let total = self.question_repo.count().await.context("Failed to count questions")?;
        let window = PageWindow::resolve(page, total, self.per_page);
        let items = self
            .question_repo
            .list_top(window.offset(), window.limit())
            .await
            .context("Failed to list top questions")?;
        Ok(Page::new(items, window, total))
    }

    /// Questions carrying `tag_name`, newest first.
    ///
    /// An unknown tag is an empty page, not an error.
    pub async fn questions_by_tag(
        &self,
        tag_name: &str,
        page: Option<&str>,
    ) -> Result<Page<QuestionCard>, QuestionServiceError> {
        let Some(tag) = self
            .tag_repo
            .get_by_name(tag_name)
            .await
            .context("Failed to get tag")?
        else {
            return Ok(Page::empty(self.per_page));
        };

        let total = self
            .question_repo
            .count_by_tag(tag.id)
            .await
            .context("Failed to count tagged questions")?;
        let window = PageWindow::resolve(page, total, self.per_page);
        let items = self
            .question_repo
            .list_by_tag(tag.id, window.offset(), window.limit())
            .await
            .context("Failed to list tagged questions")?;
        Ok(Page::new(items, window, total))
    }

    pub async fn get(&self, id: i64) -> Result<Option<QuestionCard>, QuestionServiceError> {
        let card = self
            .question_repo
            .get_card(id)
            .await
            .context("Failed to get question")?;
        Ok(card)
    }

    /// Validate the ask form and store the question with its tags
    pub async fn ask(&self, author: &CurrentUser, form: &AskForm) -> Result<Question, QuestionServiceError> {
        let cleaned = forms::validate_ask(form)?;

        let question = self
            .question_repo
            .create(&CreateQuestionInput {
                author_id: author.profile_id,
                title: cleaned.title,
                content: cleaned.content,
                tags: cleaned.tags,
            })
            .await
            .context("Failed to create question")?;

        tracing::info!(question_id = question.id, author_id = author.profile_id, "Question asked");
        Ok(question)
    }

    /// Like a question once per profile. Returns whether the like was new.
    pub async fn like(&self, question_id: i64, profile_id: i64) -> Result<bool, QuestionServiceError> {
        if self.get(question_id).await?.is_none() {
            return Err(QuestionServiceError::NotFound(question_id));
        }
        let liked = self
            .question_repo
            .like(question_id, profile_id)
            .await
            .context("Failed to like question")?;
        Ok(liked)
    }
}
