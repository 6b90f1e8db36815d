//! Tag service

use crate::db::repositories::TagRepository;
use crate::models::{Tag, TagWithCount};
use anyhow::{Context, Result};
use std::sync::Arc;

/// Tag service for the sidebar and tag pages
pub struct TagService {
    tag_repo: Arc<dyn TagRepository>,
}

impl TagService {
    pub fn new(tag_repo: Arc<dyn TagRepository>) -> Self {
        Self { tag_repo }
    }

    /// The `limit` most used tags
    pub async fn top_tags(&self, limit: i64) -> Result<Vec<TagWithCount>> {
        self.tag_repo
            .top_with_counts(limit)
            .await
            .context("Failed to get top tags")
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Option<Tag>> {
        self.tag_repo
            .get_by_name(name.trim())
            .await
            .context("Failed to get tag by name")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{seed_profile, seed_question, setup_pool};
    use crate::db::repositories::SqlxTagRepository;

    #[tokio::test]
    async fn test_top_tags_and_lookup() {
        let pool = setup_pool().await;
        let (_, author) = seed_profile(&pool, "asker").await;
        seed_question(&pool, author, "a", &["rust", "sql"]).await;
        seed_question(&pool, author, "b", &["rust"]).await;
        let service = TagService::new(SqlxTagRepository::boxed(pool.clone()));

        let top = service.top_tags(1).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].tag.name, "rust");
        assert_eq!(top[0].question_count, 2);

        assert!(service.get_by_name(" sql ").await.unwrap().is_some());
        assert!(service.get_by_name("go").await.unwrap().is_none());
    }
}
