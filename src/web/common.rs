//! Shared handler helpers
//!
//! Page context, rendering, session cookies and redirect targets.

use axum::{
    http::header,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tera::Context;

use crate::models::{CurrentUser, Session};

use super::error::PageError;
use super::middleware::{AppState, SESSION_COOKIE};

/// `?page=` on list pages, kept raw so bad values fall back to page 1
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// `?continue=` on the login page
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ContinueQuery {
    #[serde(rename = "continue")]
    pub continue_to: Option<String>,
}

/// Context every page starts from: the signed-in user and the sidebar
pub async fn base_context(state: &AppState, user: Option<&CurrentUser>) -> Result<Context, PageError> {
    let (tags, users) = futures::try_join!(
        state.tag_service.top_tags(state.settings.sidebar_tags),
        state.profile_service.top_users(state.settings.sidebar_users),
    )?;

    let mut context = Context::new();
    context.insert("current_user", &user);
    context.insert("sidebar_tags", &tags);
    context.insert("sidebar_users", &users);
    Ok(context)
}

/// Render a template into an HTML response
pub fn render(state: &AppState, template: &str, context: &Context) -> Result<Html<String>, PageError> {
    Ok(Html(state.templates.render(template, context)?))
}

/// `Set-Cookie` value that stores `session`
pub fn session_cookie(state: &AppState, session: &Session) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        session.id,
        session.max_age_seconds()
    );
    if state.settings.secure_cookie {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes the session cookie
pub fn clear_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// Redirect (303) that also sets the session cookie
pub fn redirect_with_session(state: &AppState, session: &Session, location: &str) -> Response {
    (
        [(header::SET_COOKIE, session_cookie(state, session))],
        Redirect::to(location),
    )
        .into_response()
}

/// Local redirect target from `continue`, or `/`.
///
/// Only paths on this site are accepted: `//host` and `/\host` are treated
/// by browsers as other origins.
pub fn safe_continue(raw: Option<&str>) -> String {
    match raw {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.starts_with("/\\")
                && !path.chars().any(char::is_control) =>
        {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}
