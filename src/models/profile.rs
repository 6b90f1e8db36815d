//! Profile model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Public forum identity of a user account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: i64,
    pub user_id: i64,
    /// Avatar reference (URL or path), if the user set one
    pub avatar: Option<String>,
    /// Reputation, raised when the user's questions and comments are liked
    pub rating: i64,
    pub created_at: DateTime<Utc>,
}

/// Author summary shown next to questions and comments and in the sidebar
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Author {
    /// Profile ID
    pub id: i64,
    pub username: String,
    pub avatar_url: String,
    pub rating: i64,
}

impl Author {
    pub fn new(id: i64, username: String, avatar: Option<&str>, email: &str, rating: i64) -> Self {
        Self {
            id,
            username,
            avatar_url: avatar_url(avatar, email),
            rating,
        }
    }
}

/// Stored avatar, or a Gravatar derived from the email
pub fn avatar_url(avatar: Option<&str>, email: &str) -> String {
    match avatar.map(str::trim) {
        Some(a) if !a.is_empty() => a.to_string(),
        _ if !email.trim().is_empty() => {
            let hash = format!("{:x}", md5::compute(email.trim().to_lowercase()));
            format!("https://www.gravatar.com/avatar/{}?d=identicon&s=80", hash)
        }
        _ => "https://www.gravatar.com/avatar/?d=identicon&s=80".to_string(),
    }
}
