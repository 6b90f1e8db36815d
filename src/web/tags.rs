//! Tag pages

use axum::{
    extract::{Path, Query, State},
    response::Response,
};

use super::common::PageQuery;
use super::error::PageError;
use super::middleware::{AppState, MaybeUser};
use super::questions::listing_page;

/// GET /tag/{name} - questions carrying a tag, newest first.
///
/// An unknown tag renders an empty listing.
pub async fn tag_page(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(name): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Response, PageError> {
    let page = state
        .question_service
        .questions_by_tag(&name, query.page.as_deref())
        .await?;
    let heading = format!("Tag: {}", name);
    listing_page(&state, user.as_ref(), "tag", &heading, Some(&name), page).await
}
