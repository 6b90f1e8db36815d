//! Profile settings page

use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
    Extension, Form,
};

use crate::models::CurrentUser;
use crate::services::forms::{FormErrors, SettingsForm};
use crate::services::UserServiceError;

use super::common::{base_context, redirect_with_session, render};
use super::error::PageError;
use super::middleware::{AppState, AuthenticatedUser};

/// GET /settings/ - form prefilled with the stored email and avatar
pub async fn settings_form(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
) -> Result<Response, PageError> {
    let form = SettingsForm {
        email: user.email.clone(),
        avatar: user.avatar.clone().unwrap_or_default(),
        ..SettingsForm::default()
    };
    settings_page(&state, &user, &form, &FormErrors::new()).await
}

/// POST /settings/
///
/// A password change replaces the session cookie, since every older
/// session of the user has just been revoked.
pub async fn update_settings(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    Form(form): Form<SettingsForm>,
) -> Result<Response, PageError> {
    match state.user_service.update_settings(&user, &form).await {
        Ok(outcome) => match outcome.session {
            Some(session) => Ok(redirect_with_session(&state, &session, "/settings/")),
            None => Ok(Redirect::to("/settings/").into_response()),
        },
        Err(UserServiceError::Form(errors)) => settings_page(&state, &user, &form, &errors).await,
        Err(e) => Err(e.into()),
    }
}

async fn settings_page(
    state: &AppState,
    user: &CurrentUser,
    form: &SettingsForm,
    errors: &FormErrors,
) -> Result<Response, PageError> {
    let mut context = base_context(state, Some(user)).await?;
    context.insert("form", form);
    context.insert("errors", errors);
    Ok(render(state, "settings.html", &context)?.into_response())
}
