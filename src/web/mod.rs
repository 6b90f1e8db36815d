//! Web layer - server-rendered pages and routing
//!
//! This module contains every HTML endpoint of the forum:
//! - Question listings (new, hot, by tag)
//! - Question pages with comments and likes
//! - Asking questions
//! - Signup, login, logout and profile settings
//! - Static assets and error pages

pub mod auth;
pub mod common;
pub mod error;
pub mod middleware;
pub mod questions;
pub mod settings;
pub mod tags;

#[cfg(test)]
mod tests;

use std::path::Path;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, services::ServeDir, trace::TraceLayer};

pub use error::{parse_id, ErrorPage, PageError};
pub use middleware::{AppState, AuthenticatedUser, MaybeUser, WebSettings, SESSION_COOKIE};

/// Pages that redirect anonymous visitors to the login page
fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/ask/", get(questions::ask_form).post(questions::ask_submit))
        .route("/question/{id}/like", post(questions::like_question))
        .route("/comment/{id}/like", post(questions::like_comment))
        .route("/settings/", get(settings::settings_form).post(settings::update_settings))
        .route_layer(axum_middleware::from_fn(middleware::require_auth))
}

/// Pages open to everyone
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(questions::index))
        .route("/hot", get(questions::hot))
        .route("/tag/{name}", get(tags::tag_page))
        // Reading is public, commenting needs a login
        .route(
            "/question/{id}",
            get(questions::question_detail).merge(
                post(questions::post_comment)
                    .route_layer(axum_middleware::from_fn(middleware::require_auth)),
            ),
        )
        .route("/signup/", get(auth::signup_form).post(auth::signup))
        .route("/login/", get(auth::login_form).post(auth::login))
        .route("/logout/", get(auth::logout))
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, static_path: &Path) -> Router {
    Router::new()
        .merge(public_routes())
        .merge(protected_routes())
        .nest_service("/static", ServeDir::new(static_path))
        .fallback(middleware::not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::render_error_pages,
        ))
        // Session lookup runs first so every page knows the visitor
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::resolve_session,
        ))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
