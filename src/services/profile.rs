//! Profile service

use crate::db::repositories::ProfileRepository;
use crate::models::Author;
use anyhow::{Context, Result};
use std::sync::Arc;

pub struct ProfileService {
    profile_repo: Arc<dyn ProfileRepository>,
}

impl ProfileService {
    pub fn new(profile_repo: Arc<dyn ProfileRepository>) -> Self {
        Self { profile_repo }
    }

    /// The `limit` highest rated members, for the sidebar
    pub async fn top_users(&self, limit: i64) -> Result<Vec<Author>> {
        self.profile_repo
            .top_by_rating(limit)
            .await
            .context("Failed to get top users")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{seed_profile, set_rating, setup_pool};
    use crate::db::repositories::SqlxProfileRepository;

    #[tokio::test]
    async fn test_top_users() {
        let pool = setup_pool().await;
        let (_, quiet) = seed_profile(&pool, "quiet").await;
        let (_, helpful) = seed_profile(&pool, "helpful").await;
        set_rating(&pool, quiet, 2).await;
        set_rating(&pool, helpful, 40).await;
        let service = ProfileService::new(SqlxProfileRepository::boxed(pool.clone()));

        let top = service.top_users(10).await.unwrap();

        let names: Vec<&str> = top.iter().map(|a| a.username.as_str()).collect();
        assert_eq!(names, vec!["helpful", "quiet"]);
    }
}
