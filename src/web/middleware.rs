//! Web middleware
//!
//! Contains middleware for:
//! - Session resolution (cookie to [`AuthenticatedUser`] extension)
//! - Login enforcement (redirect to the login page)
//! - Error page rendering

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
};
use std::convert::Infallible;
use std::sync::Arc;

use crate::config::Config;
use crate::db::repositories::{
    SqlxCommentRepository, SqlxProfileRepository, SqlxQuestionRepository, SqlxSessionRepository,
    SqlxTagRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::CurrentUser;
use crate::services::{CommentService, ProfileService, QuestionService, TagService, UserService};
use crate::theme::TemplateEngine;

use super::error::ErrorPage;

/// Cookie carrying the session token
pub const SESSION_COOKIE: &str = "session";

/// Settings the handlers need besides the services
#[derive(Debug, Clone)]
pub struct WebSettings {
    pub secure_cookie: bool,
    pub sidebar_tags: i64,
    pub sidebar_users: i64,
}

impl WebSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            secure_cookie: config.session.secure_cookie,
            sidebar_tags: config.pagination.sidebar_tags,
            sidebar_users: config.pagination.sidebar_users,
        }
    }
}

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub question_service: Arc<QuestionService>,
    pub comment_service: Arc<CommentService>,
    pub tag_service: Arc<TagService>,
    pub profile_service: Arc<ProfileService>,
    pub templates: Arc<TemplateEngine>,
    pub settings: Arc<WebSettings>,
}

impl AppState {
    /// Wire repositories and services over `pool`
    pub fn new(pool: DynDatabasePool, config: &Config, templates: TemplateEngine) -> Self {
        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let session_repo = SqlxSessionRepository::boxed(pool.clone());
        let profile_repo = SqlxProfileRepository::boxed(pool.clone());
        let question_repo = SqlxQuestionRepository::boxed(pool.clone());
        let tag_repo = SqlxTagRepository::boxed(pool.clone());
        let comment_repo = SqlxCommentRepository::boxed(pool);

        Self {
            user_service: Arc::new(UserService::with_session_ttl(
                user_repo,
                session_repo,
                profile_repo.clone(),
                config.session.ttl_days,
            )),
            question_service: Arc::new(QuestionService::new(
                question_repo.clone(),
                tag_repo.clone(),
                config.pagination.questions_per_page,
            )),
            comment_service: Arc::new(CommentService::new(
                comment_repo,
                question_repo,
                config.pagination.comments_per_page,
            )),
            tag_service: Arc::new(TagService::new(tag_repo)),
            profile_service: Arc::new(ProfileService::new(profile_repo)),
            templates: Arc::new(templates),
            settings: Arc::new(WebSettings::from_config(config)),
        }
    }
}

/// The signed-in user, put into request extensions by [`resolve_session`]
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub CurrentUser);

/// Signed-in user if there is one; never rejects
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<CurrentUser>);

impl<S: Send + Sync> FromRequestParts<S> for MaybeUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(
            parts
                .extensions
                .get::<AuthenticatedUser>()
                .map(|user| user.0.clone()),
        ))
    }
}

/// Extract session token from the cookie header
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|cookie| cookie.trim().strip_prefix("session="))
        .find(|token| !token.is_empty())
        .map(str::to_string)
}

/// Session middleware
///
/// Resolves the session cookie for every request. A missing or stale
/// session leaves the request anonymous.
pub async fn resolve_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = session_token(request.headers()) {
        match state.user_service.validate_session(&token).await {
            Ok(Some(user)) => {
                request.extensions_mut().insert(AuthenticatedUser(user));
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Session validation failed: {}", e),
        }
    }
    next.run(request).await
}

/// Authentication middleware
///
/// Anonymous requests are sent to the login page with the original path in
/// `continue`.
pub async fn require_auth(request: Request, next: Next) -> Response {
    if request.extensions().get::<AuthenticatedUser>().is_some() {
        return next.run(request).await;
    }

    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());
    Redirect::to(&login_url(&target)).into_response()
}

/// `/login/?continue=<target>`
pub fn login_url(target: &str) -> String {
    format!("/login/?continue={}", urlencoding::encode(target))
}

/// Error page middleware
///
/// Replaces the body of responses produced by
/// [`PageError`](super::PageError) with the `error.html` template.
pub async fn render_error_pages(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let current_user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|user| user.0.clone());
    let response = next.run(request).await;

    let Some(page) = response.extensions().get::<ErrorPage>().cloned() else {
        return response;
    };

    let mut context = tera::Context::new();
    context.insert("status", &page.status.as_u16());
    context.insert("message", &page.message);
    context.insert("current_user", &current_user);
    context.insert("sidebar_tags", &Vec::<()>::new());
    context.insert("sidebar_users", &Vec::<()>::new());

    match state.templates.render("error.html", &context) {
        Ok(html) => {
            let (mut parts, _) = response.into_parts();
            parts.headers.remove(header::CONTENT_LENGTH);
            Response::from_parts(parts, Html(html).into_response().into_body())
        }
        Err(e) => {
            tracing::warn!("Failed to render error page: {:#}", e);
            response
        }
    }
}

/// 404 for unmatched routes
pub async fn not_found() -> Response {
    super::PageError::not_found("The page you are looking for does not exist.").into_response()
}
