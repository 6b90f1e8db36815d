//! User service
//!
//! Accounts, sessions and the settings page:
//! - registration creates the user and its profile and signs the user in
//! - login checks credentials and issues a session token
//! - a password change revokes every existing session and issues a new one

use crate::db::repositories::{ProfileRepository, SessionRepository, UserRepository};
use crate::models::{CreateUserInput, CurrentUser, Profile, Session, SettingsChange, User};
use crate::services::forms::{
    self, FormErrors, LoginForm, SettingsForm, SignupForm, OLD_PASSWORD_INCORRECT,
    USERNAME_TAKEN, WRONG_CREDENTIALS,
};
use crate::services::password::{hash_password, verify_password};
use anyhow::{Context, Result};
use std::sync::Arc;

/// Default session lifetime in days
const DEFAULT_SESSION_TTL_DAYS: i64 = 7;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// The submitted form was rejected
    #[error("Invalid form: {0:?}")]
    Form(FormErrors),

    /// A session token resolved to an account that no longer exists
    #[error("User not found")]
    UserNotFound,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<FormErrors> for UserServiceError {
    fn from(errors: FormErrors) -> Self {
        UserServiceError::Form(errors)
    }
}

/// Result of a successful settings update
#[derive(Debug)]
pub struct SettingsOutcome {
    pub user: CurrentUser,
    /// Replacement session, issued when the password changed
    pub session: Option<Session>,
}

/// User service for accounts and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    profile_repo: Arc<dyn ProfileRepository>,
    session_ttl_days: i64,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        profile_repo: Arc<dyn ProfileRepository>,
    ) -> Self {
        Self::with_session_ttl(user_repo, session_repo, profile_repo, DEFAULT_SESSION_TTL_DAYS)
    }

    pub fn with_session_ttl(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        profile_repo: Arc<dyn ProfileRepository>,
        session_ttl_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            profile_repo,
            session_ttl_days,
        }
    }

    pub fn session_ttl_days(&self) -> i64 {
        self.session_ttl_days
    }

    /// Register an account and sign it in.
    ///
    /// Nothing is written unless every field validates and the username is
    /// free.
    pub async fn register(&self, form: &SignupForm) -> Result<Session, UserServiceError> {
        let cleaned = forms::validate_signup(form)?;

        if self
            .user_repo
            .get_by_username(&cleaned.username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(FormErrors::single("username", USERNAME_TAKEN).into());
        }

        let password_hash = hash_password(&cleaned.password).context("Failed to hash password")?;
        // A concurrent signup can claim the name after the check above
        let (user, _profile) = match self
            .user_repo
            .create(&CreateUserInput {
                username: cleaned.username,
                email: cleaned.email,
                password_hash,
                avatar: cleaned.avatar,
            })
            .await
        {
            Ok(created) => created,
            Err(e) if is_unique_violation(&e) => {
                return Err(FormErrors::single("username", USERNAME_TAKEN).into());
            }
            Err(e) => return Err(e.context("Failed to create user").into()),
        };

        tracing::info!(user_id = user.id, username = %user.username, "User registered");

        Ok(self.create_session(user.id).await?)
    }

    /// Check credentials and issue a session.
    ///
    /// Unknown usernames and wrong passwords produce the same error.
    pub async fn login(&self, form: &LoginForm) -> Result<Session, UserServiceError> {
        let cleaned = forms::validate_login(form)?;

        let user = self
            .user_repo
            .get_by_username(&cleaned.username)
            .await
            .context("Failed to get user by username")?;

        let Some(user) = user else {
            return Err(FormErrors::single("password", WRONG_CREDENTIALS).into());
        };

        let valid = verify_password(&cleaned.password, &user.password_hash)
            .context("Failed to verify password")?;
        if !valid {
            tracing::debug!(user_id = user.id, "Rejected login with wrong password");
            return Err(FormErrors::single("password", WRONG_CREDENTIALS).into());
        }

        Ok(self.create_session(user.id).await?)
    }

    /// Revoke a session
    pub async fn logout(&self, token: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(token)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Resolve a session token to the signed-in user.
    ///
    /// Missing, expired and orphaned sessions all yield `None`; an expired
    /// session is deleted on the way.
    pub async fn validate_session(&self, token: &str) -> Result<Option<CurrentUser>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(session) => session,
            None => return Ok(None),
        };

        if session.is_expired() {
            if let Err(e) = self.session_repo.delete(token).await {
                tracing::warn!("Failed to delete expired session: {:#}", e);
            }
            return Ok(None);
        }

        let Some(user) = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?
        else {
            return Ok(None);
        };

        Ok(Some(self.current_user(&user).await?))
    }

    /// Apply the settings form for `current`.
    ///
    /// The current password must verify before anything is written. With a
    /// new password every session of the user is revoked and a fresh one is
    /// returned for the caller.
    pub async fn update_settings(
        &self,
        current: &CurrentUser,
        form: &SettingsForm,
    ) -> Result<SettingsOutcome, UserServiceError> {
        let cleaned = forms::validate_settings(form);

        let user = self
            .user_repo
            .get_by_id(current.user_id)
            .await
            .context("Failed to get user")?
            .ok_or(UserServiceError::UserNotFound)?;

        // Report a wrong current password together with any shape errors
        let mut errors = match &cleaned {
            Ok(_) => FormErrors::new(),
            Err(errors) => errors.clone(),
        };
        if !form.password.is_empty()
            && !verify_password(&form.password, &user.password_hash)
                .context("Failed to verify password")?
        {
            errors.add("password", OLD_PASSWORD_INCORRECT);
        }
        let cleaned = match cleaned {
            Ok(cleaned) if errors.is_empty() => cleaned,
            _ => return Err(errors.into()),
        };

        let password_hash = match &cleaned.new_password {
            Some(password) => Some(hash_password(password).context("Failed to hash password")?),
            None => None,
        };
        let rotate = password_hash.is_some();

        let updated = self
            .user_repo
            .apply_settings(
                user.id,
                &SettingsChange {
                    email: cleaned.email,
                    avatar: cleaned.avatar,
                    password_hash,
                },
            )
            .await
            .context("Failed to update settings")?;

        let session = if rotate {
            tracing::info!(user_id = user.id, "Password changed, sessions revoked");
            Some(self.create_session(user.id).await?)
        } else {
            None
        };

        Ok(SettingsOutcome {
            user: self.current_user(&updated).await?,
            session,
        })
    }

    /// Delete expired sessions, returning how many were removed
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;
        Ok(count)
    }

    pub async fn get_profile(&self, user_id: i64) -> Result<Option<Profile>, UserServiceError> {
        let profile = self
            .profile_repo
            .get_by_user_id(user_id)
            .await
            .context("Failed to get profile")?;
        Ok(profile)
    }

    // ========================================================================
    // Private helper methods
    // ========================================================================

    async fn create_session(&self, user_id: i64) -> Result<Session> {
        let session = Session::new(user_id, self.session_ttl_days);
        self.session_repo
            .create(&session)
            .await
            .context("Failed to create session")
    }

    async fn current_user(&self, user: &User) -> Result<CurrentUser, UserServiceError> {
        let profile = self
            .get_profile(user.id)
            .await?
            .ok_or(UserServiceError::UserNotFound)?;
        Ok(CurrentUser::new(user, profile.id, profile.avatar))
    }
}

fn is_unique_violation(error: &anyhow::Error) -> bool {
    matches!(
        error.downcast_ref::<sqlx::Error>(),
        Some(sqlx::Error::Database(db)) if db.is_unique_violation()
    )
}
