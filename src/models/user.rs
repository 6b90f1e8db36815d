//! User model
//!
//! Login credentials. The public forum identity (avatar, rating) lives in
//! [`Profile`](super::Profile).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::avatar_url;

/// User account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Username (unique)
    pub username: String,
    /// Email address
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an account together with its profile.
///
/// The password must already be hashed.
#[derive(Debug, Clone)]
pub struct CreateUserInput {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub avatar: Option<String>,
}

/// Accepted changes from the settings form
#[derive(Debug, Clone, Default)]
pub struct SettingsChange {
    /// New email, if one was entered
    pub email: Option<String>,
    /// Avatar reference to store; `None` removes the current one
    pub avatar: Option<String>,
    /// Hash of the new password; revokes every session of the user when set
    pub password_hash: Option<String>,
}

/// The signed-in user as seen by handlers and templates
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub user_id: i64,
    pub profile_id: i64,
    pub username: String,
    pub email: String,
    pub avatar: Option<String>,
    pub avatar_url: String,
}

impl CurrentUser {
    pub fn new(user: &User, profile_id: i64, avatar: Option<String>) -> Self {
        Self {
            user_id: user.id,
            profile_id,
            username: user.username.clone(),
            email: user.email.clone(),
            avatar_url: avatar_url(avatar.as_deref(), &user.email),
            avatar,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        let now = Utc::now();
        User {
            id: 3,
            username: "alice".to_string(),
            email: "Alice@Example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let json = serde_json::to_string(&user()).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_current_user_uses_stored_avatar() {
        let current = CurrentUser::new(&user(), 9, Some("/static/avatars/a.png".to_string()));
        assert_eq!(current.profile_id, 9);
        assert_eq!(current.avatar_url, "/static/avatars/a.png");
    }

    #[test]
    fn test_current_user_falls_back_to_gravatar() {
        let current = CurrentUser::new(&user(), 9, None);
        assert!(current.avatar_url.starts_with("https://www.gravatar.com/avatar/"));
    }
}
