//! Question model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Author, Tag};

/// Question entity. Only `rating` changes after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub title: String,
    pub content: String,
    /// Profile ID of the author
    pub author_id: i64,
    /// Aggregate like score, orders the hot listing
    pub rating: i64,
    pub created_at: DateTime<Utc>,
}

/// Question as shown in listings and on the question page
#[derive(Debug, Clone, Serialize)]
pub struct QuestionCard {
    #[serde(flatten)]
    pub question: Question,
    pub author: Author,
    /// Tags ordered by name
    pub tags: Vec<Tag>,
    pub comment_count: i64,
}

/// Validated input for a new question
#[derive(Debug, Clone, PartialEq)]
pub struct CreateQuestionInput {
    pub author_id: i64,
    pub title: String,
    pub content: String,
    /// Trimmed, distinct tag names
    pub tags: Vec<String>,
}
