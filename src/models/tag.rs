//! Tag model

use serde::{Deserialize, Serialize};

/// Tag, created on first use when a question is asked
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub id: i64,
    /// Unique name
    pub name: String,
}

/// Tag with the number of questions referencing it, for the sidebar
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TagWithCount {
    #[serde(flatten)]
    pub tag: Tag,
    pub question_count: i64,
}

impl TagWithCount {
    pub fn new(tag: Tag, question_count: i64) -> Self {
        Self {
            tag,
            question_count,
        }
    }
}
