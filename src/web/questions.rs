//! Question pages
//!
//! - GET  /                      newest questions
//! - GET  /hot                   top rated questions
//! - GET  /question/{id}         question with its comments
//! - POST /question/{id}         add a comment (login required)
//! - POST /question/{id}/like    like the question (login required)
//! - POST /comment/{id}/like     like a comment (login required)
//! - GET  /ask/, POST /ask/      ask a question (login required)

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    Extension, Form,
};

use crate::models::{CurrentUser, Page, QuestionCard};
use crate::services::forms::{AskForm, CommentForm, FormErrors};
use crate::services::{CommentServiceError, QuestionServiceError};

use super::common::{base_context, render, PageQuery};
use super::error::{parse_id, PageError};
use super::middleware::{AppState, AuthenticatedUser, MaybeUser};

/// GET / - newest questions
pub async fn index(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<PageQuery>,
) -> Result<Response, PageError> {
    let page = state.question_service.new_questions(query.page.as_deref()).await?;
    listing_page(&state, user.as_ref(), "new", "New questions", None, page).await
}

/// GET /hot - top rated questions
pub async fn hot(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<PageQuery>,
) -> Result<Response, PageError> {
    let page = state.question_service.top_questions(query.page.as_deref()).await?;
    listing_page(&state, user.as_ref(), "hot", "Hot questions", None, page).await
}

/// Render `index.html` for one of the question listings
pub(super) async fn listing_page(
    state: &AppState,
    user: Option<&CurrentUser>,
    listing: &str,
    heading: &str,
    tag_name: Option<&str>,
    page: Page<QuestionCard>,
) -> Result<Response, PageError> {
    let mut context = base_context(state, user).await?;
    context.insert("listing", listing);
    context.insert("heading", heading);
    context.insert("tag_name", &tag_name);
    context.insert("page", &page);
    Ok(render(state, "index.html", &context)?.into_response())
}

/// GET /question/{id}
pub async fn question_detail(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(raw_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Response, PageError> {
    let id = parse_id(&raw_id)?;
    question_page(&state, user.as_ref(), id, query.page.as_deref(), &CommentForm::default(), &FormErrors::new()).await
}

async fn question_page(
    state: &AppState,
    user: Option<&CurrentUser>,
    id: i64,
    page: Option<&str>,
    form: &CommentForm,
    errors: &FormErrors,
) -> Result<Response, PageError> {
    let question = state
        .question_service
        .get(id)
        .await?
        .ok_or_else(|| PageError::not_found(format!("Question {} does not exist.", id)))?;
    let comments = state.comment_service.comments_for_question(id, page).await?;

    let mut context = base_context(state, user).await?;
    context.insert("question", &question);
    context.insert("page", &comments);
    context.insert("form", form);
    context.insert("errors", errors);
    Ok(render(state, "question.html", &context)?.into_response())
}

/// POST /question/{id} - add a comment
pub async fn post_comment(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    Path(raw_id): Path<String>,
    Form(form): Form<CommentForm>,
) -> Result<Response, PageError> {
    let question_id = parse_id(&raw_id)?;

    match state.comment_service.create(&user, question_id, &form).await {
        Ok(comment) => {
            let last_page = state.comment_service.last_page(question_id).await?;
            let location = format!("/question/{}?page={}#comment-{}", question_id, last_page, comment.id);
            Ok(Redirect::to(&location).into_response())
        }
        Err(CommentServiceError::Form(errors)) => {
            question_page(&state, Some(&user), question_id, None, &form, &errors).await
        }
        Err(e) => Err(e.into()),
    }
}

/// POST /question/{id}/like
pub async fn like_question(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    Path(raw_id): Path<String>,
) -> Result<Response, PageError> {
    let question_id = parse_id(&raw_id)?;
    state.question_service.like(question_id, user.profile_id).await?;
    Ok(Redirect::to(&format!("/question/{}", question_id)).into_response())
}

/// POST /comment/{id}/like
pub async fn like_comment(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    Path(raw_id): Path<String>,
) -> Result<Response, PageError> {
    let comment_id = parse_id(&raw_id)?;
    let comment = state.comment_service.like(comment_id, user.profile_id).await?;
    let location = format!("/question/{}#comment-{}", comment.question_id, comment.id);
    Ok(Redirect::to(&location).into_response())
}

/// GET /ask/
pub async fn ask_form(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
) -> Result<Response, PageError> {
    ask_page(&state, &user, &AskForm::default(), &FormErrors::new()).await
}

/// POST /ask/
pub async fn ask_submit(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    Form(form): Form<AskForm>,
) -> Result<Response, PageError> {
    match state.question_service.ask(&user, &form).await {
        Ok(question) => Ok(Redirect::to(&format!("/question/{}", question.id)).into_response()),
        Err(QuestionServiceError::Form(errors)) => ask_page(&state, &user, &form, &errors).await,
        Err(e) => Err(e.into()),
    }
}

async fn ask_page(
    state: &AppState,
    user: &CurrentUser,
    form: &AskForm,
    errors: &FormErrors,
) -> Result<Response, PageError> {
    let mut context = base_context(state, Some(user)).await?;
    context.insert("form", form);
    context.insert("errors", errors);
    Ok(render(state, "ask.html", &context)?.into_response())
}
