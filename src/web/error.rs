//! Page errors
//!
//! Handlers return [`PageError`] for anything that is not a form problem.
//! The response carries an [`ErrorPage`] extension so the error page
//! middleware can render `error.html` in place of the plain body.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::services::{CommentServiceError, QuestionServiceError, UserServiceError};
use crate::theme::simple_error_page;

#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Marker left on error responses for the error page middleware
#[derive(Debug, Clone)]
pub struct ErrorPage {
    pub status: StatusCode,
    pub message: String,
}

impl PageError {
    pub fn not_found(message: impl Into<String>) -> Self {
        PageError::NotFound(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        PageError::BadRequest(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            PageError::BadRequest(_) => StatusCode::BAD_REQUEST,
            PageError::NotFound(_) => StatusCode::NOT_FOUND,
            PageError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text shown to the visitor; internal details stay in the log
    pub fn public_message(&self) -> String {
        match self {
            PageError::BadRequest(message) | PageError::NotFound(message) => message.clone(),
            PageError::Internal(_) => "Something went wrong on our side.".to_string(),
        }
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        if let PageError::Internal(ref e) = self {
            tracing::error!("{:#}", e);
        }

        let status = self.status();
        let message = self.public_message();
        let mut response = (status, Html(simple_error_page(status.as_u16(), &message))).into_response();
        response.extensions_mut().insert(ErrorPage { status, message });
        response
    }
}

impl From<QuestionServiceError> for PageError {
    fn from(err: QuestionServiceError) -> Self {
        match err {
            QuestionServiceError::NotFound(id) => PageError::NotFound(format!("Question {} does not exist.", id)),
            QuestionServiceError::Form(errors) => PageError::BadRequest(format!("Invalid input: {:?}", errors)),
            QuestionServiceError::Internal(e) => PageError::Internal(e),
        }
    }
}

impl From<CommentServiceError> for PageError {
    fn from(err: CommentServiceError) -> Self {
        match err {
            CommentServiceError::QuestionNotFound(id) => {
                PageError::NotFound(format!("Question {} does not exist.", id))
            }
            CommentServiceError::CommentNotFound(id) => {
                PageError::NotFound(format!("Comment {} does not exist.", id))
            }
            CommentServiceError::Form(errors) => PageError::BadRequest(format!("Invalid input: {:?}", errors)),
            CommentServiceError::Internal(e) => PageError::Internal(e),
        }
    }
}

impl From<UserServiceError> for PageError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::UserNotFound => PageError::NotFound("User does not exist.".to_string()),
            UserServiceError::Form(errors) => PageError::BadRequest(format!("Invalid input: {:?}", errors)),
            UserServiceError::Internal(e) => PageError::Internal(e),
        }
    }
}

/// Parse an id taken from the URL path
pub fn parse_id(raw: &str) -> Result<i64, PageError> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| PageError::bad_request(format!("\"{}\" is not a valid id.", raw)))
}
