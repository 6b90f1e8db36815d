//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Author;

/// Comment (answer) on a question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub question_id: i64,
    /// Profile ID of the author
    pub author_id: i64,
    pub content: String,
    pub like_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Comment with its author, as listed on the question page
#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub author: Author,
}

/// Validated input for a new comment
#[derive(Debug, Clone)]
pub struct CreateCommentInput {
    pub question_id: i64,
    pub author_id: i64,
    pub content: String,
}
