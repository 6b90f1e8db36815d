//! Account pages
//!
//! - GET/POST /signup/   registration, signs the new user in
//! - GET/POST /login/    login, then back to `continue`
//! - GET      /logout/   revoke the session

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Redirect, Response},
    Form,
};

use crate::models::CurrentUser;
use crate::services::forms::{FormErrors, LoginForm, SignupForm};
use crate::services::UserServiceError;

use super::common::{
    base_context, clear_session_cookie, redirect_with_session, render, safe_continue, ContinueQuery,
};
use super::error::PageError;
use super::middleware::{session_token, AppState, MaybeUser};

/// GET /signup/
pub async fn signup_form(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
) -> Result<Response, PageError> {
    signup_page(&state, user.as_ref(), &SignupForm::default(), &FormErrors::new()).await
}

/// POST /signup/
pub async fn signup(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Form(form): Form<SignupForm>,
) -> Result<Response, PageError> {
    match state.user_service.register(&form).await {
        Ok(session) => Ok(redirect_with_session(&state, &session, "/")),
        Err(UserServiceError::Form(errors)) => signup_page(&state, user.as_ref(), &form, &errors).await,
        Err(e) => Err(e.into()),
    }
}

async fn signup_page(
    state: &AppState,
    user: Option<&CurrentUser>,
    form: &SignupForm,
    errors: &FormErrors,
) -> Result<Response, PageError> {
    let mut context = base_context(state, user).await?;
    context.insert("form", form);
    context.insert("errors", errors);
    Ok(render(state, "signup.html", &context)?.into_response())
}

/// GET /login/
pub async fn login_form(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<ContinueQuery>,
) -> Result<Response, PageError> {
    login_page(&state, user.as_ref(), &query, &LoginForm::default(), &FormErrors::new()).await
}

/// POST /login/
pub async fn login(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<ContinueQuery>,
    Form(form): Form<LoginForm>,
) -> Result<Response, PageError> {
    match state.user_service.login(&form).await {
        Ok(session) => {
            let target = safe_continue(query.continue_to.as_deref());
            Ok(redirect_with_session(&state, &session, &target))
        }
        Err(UserServiceError::Form(errors)) => {
            login_page(&state, user.as_ref(), &query, &form, &errors).await
        }
        Err(e) => Err(e.into()),
    }
}

async fn login_page(
    state: &AppState,
    user: Option<&CurrentUser>,
    query: &ContinueQuery,
    form: &LoginForm,
    errors: &FormErrors,
) -> Result<Response, PageError> {
    let mut context = base_context(state, user).await?;
    context.insert("form", form);
    context.insert("errors", errors);
    context.insert("continue_to", &safe_continue(query.continue_to.as_deref()));
    Ok(render(state, "login.html", &context)?.into_response())
}

/// GET /logout/
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, PageError> {
    if let Some(token) = session_token(&headers) {
        state.user_service.logout(&token).await?;
    }
    Ok((
        [(header::SET_COOKIE, clear_session_cookie())],
        Redirect::to("/login/"),
    )
        .into_response())
}
