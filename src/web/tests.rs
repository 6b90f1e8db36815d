//! End-to-end tests for the page router

use std::path::{Path, PathBuf};

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use tower::ServiceExt;

use super::*;
use crate::config::Config;
use crate::db::repositories::test_support::{seed_profile, seed_question, setup_pool};
use crate::db::DynDatabasePool;
use crate::theme::TemplateEngine;

fn asset_dir(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(name)
}

async fn setup_app() -> (DynDatabasePool, Router) {
    let pool = setup_pool().await;
    let templates = TemplateEngine::new(&asset_dir("templates")).expect("Failed to load templates");
    let state = AppState::new(pool.clone(), &Config::default(), templates);
    (pool, build_router(state, &asset_dir("static")))
}

async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> Response {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post_form(app: &Router, uri: &str, body: &str, cookie: Option<&str>) -> Response {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    app.clone()
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// `session=<token>` from the response's `Set-Cookie`
fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

/// Sign up `username` with password `secret` and return the session cookie
async fn sign_up(app: &Router, username: &str) -> String {
    let body = format!(
        "username={0}&email={0}%40example.com&password=secret&password_check=secret&avatar=",
        username
    );
    let response = post_form(app, "/signup/", &body, None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    session_cookie(&response).expect("signup sets the session cookie")
}

async fn count_users(pool: &DynDatabasePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool.as_sqlite().unwrap())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_index_lists_questions() {
    let (pool, app) = setup_app().await;
    let (_, author) = seed_profile(&pool, "asker").await;
    seed_question(&pool, author, "How do lifetimes work?", &["rust"]).await;

    let response = get(&app, "/", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("How do lifetimes work?"));
    assert!(html.contains("href=\"/tag/rust\""));
    assert!(html.contains("Log in"));
}

#[tokio::test]
async fn test_hot_and_bad_page_values() {
    let (pool, app) = setup_app().await;
    let (_, author) = seed_profile(&pool, "asker").await;
    seed_question(&pool, author, "Only question", &[]).await;

    for uri in ["/hot", "/hot?page=abc", "/?page=-3", "/?page=999"] {
        let response = get(&app, uri, None).await;
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        assert!(body_text(response).await.contains("Only question"), "{}", uri);
    }
}

#[tokio::test]
async fn test_huge_page_number_shows_last_page() {
    let (pool, app) = setup_app().await;
    let (_, author) = seed_profile(&pool, "asker").await;
    for n in 0..25 {
        seed_question(&pool, author, &format!("Question {}", n), &[]).await;
    }

    let response = get(&app, "/?page=99999999999999999999", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("<span class=\"current\">2</span>"));
    assert!(!html.contains("<span class=\"current\">1</span>"));
}

#[tokio::test]
async fn test_unknown_tag_is_an_empty_page() {
    let (_pool, app) = setup_app().await;

    let response = get(&app, "/tag/nothing", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("No questions tagged nothing yet."));
}

#[tokio::test]
async fn test_tag_page_lists_tagged_questions() {
    let (pool, app) = setup_app().await;
    let (_, author) = seed_profile(&pool, "asker").await;
    seed_question(&pool, author, "Tagged one", &["async"]).await;
    seed_question(&pool, author, "Untagged one", &[]).await;

    let html = body_text(get(&app, "/tag/async", None).await).await;

    assert!(html.contains("Tagged one"));
    assert!(!html.contains("Untagged one"));
}

#[tokio::test]
async fn test_question_errors_render_error_page() {
    let (_pool, app) = setup_app().await;

    let bad = get(&app, "/question/abc", None).await;
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(bad).await.contains("class=\"error-page\""));

    let missing = get(&app, "/question/999", None).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert!(body_text(missing).await.contains("Question 999 does not exist."));

    let unknown = get(&app, "/no/such/page", None).await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    assert!(body_text(unknown).await.contains("class=\"error-page\""));
}

#[tokio::test]
async fn test_anonymous_writes_redirect_to_login() {
    let (pool, app) = setup_app().await;
    let (_, author) = seed_profile(&pool, "asker").await;
    let id = seed_question(&pool, author, "Question", &[]).await;

    let comment = post_form(&app, &format!("/question/{}", id), "content=hi", None).await;
    assert_eq!(comment.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&comment), format!("/login/?continue=%2Fquestion%2F{}", id));

    let ask = get(&app, "/ask/", None).await;
    assert_eq!(ask.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&ask), "/login/?continue=%2Fask%2F");

    let settings = get(&app, "/settings/", None).await;
    assert_eq!(location(&settings), "/login/?continue=%2Fsettings%2F");
}

#[tokio::test]
async fn test_signup_signs_the_user_in() {
    let (_pool, app) = setup_app().await;
    let cookie = sign_up(&app, "alice").await;

    let html = body_text(get(&app, "/", Some(&cookie)).await).await;

    assert!(html.contains("alice"));
    assert!(html.contains("Log out"));
}

#[tokio::test]
async fn test_signup_password_mismatch_creates_nothing() {
    let (pool, app) = setup_app().await;

    let response = post_form(
        &app,
        "/signup/",
        "username=bob&email=bob%40example.com&password=secret&password_check=other",
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    let html = body_text(response).await;
    assert!(html.contains("class=\"errors\""));
    assert!(html.contains("value=\"bob\""));
    assert_eq!(count_users(&pool).await, 0);
}

#[tokio::test]
async fn test_duplicate_username_is_rejected() {
    let (pool, app) = setup_app().await;
    sign_up(&app, "alice").await;

    let response = post_form(
        &app,
        "/signup/",
        "username=alice&email=other%40example.com&password=secret&password_check=secret",
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("A user with that username already exists."));
    assert_eq!(count_users(&pool).await, 1);
}

#[tokio::test]
async fn test_login_follows_continue() {
    let (_pool, app) = setup_app().await;
    sign_up(&app, "alice").await;

    let response = post_form(&app, "/login/?continue=%2Fask%2F", "username=alice&password=secret", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/ask/");
    let cookie = session_cookie(&response).unwrap();
    assert_eq!(get(&app, "/ask/", Some(&cookie)).await.status(), StatusCode::OK);

    let offsite = post_form(
        &app,
        "/login/?continue=https%3A%2F%2Fevil.example%2F",
        "username=alice&password=secret",
        None,
    )
    .await;
    assert_eq!(location(&offsite), "/");
}

#[tokio::test]
async fn test_login_wrong_password() {
    let (_pool, app) = setup_app().await;
    sign_up(&app, "alice").await;

    let response = post_form(&app, "/login/", "username=alice&password=wrong", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    assert!(body_text(response).await.contains("Wrong password or username"));
}

#[tokio::test]
async fn test_logout_revokes_the_session() {
    let (_pool, app) = setup_app().await;
    let cookie = sign_up(&app, "alice").await;

    let response = get(&app, "/logout/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login/");
    assert_eq!(session_cookie(&response).as_deref(), Some("session="));

    let after = get(&app, "/settings/", Some(&cookie)).await;
    assert_eq!(after.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_ask_and_comment() {
    let (_pool, app) = setup_app().await;
    let cookie = sign_up(&app, "alice").await;

    let asked = post_form(
        &app,
        "/ask/",
        "title=Borrowing&content=Why+does+this+not+compile%3F&tags=rust%2C+borrowck",
        Some(&cookie),
    )
    .await;
    assert_eq!(asked.status(), StatusCode::SEE_OTHER);
    let question_url = location(&asked).to_string();
    assert!(question_url.starts_with("/question/"));

    let commented = post_form(&app, &question_url, "content=Add+a+lifetime", Some(&cookie)).await;
    assert_eq!(commented.status(), StatusCode::SEE_OTHER);
    assert!(location(&commented).starts_with(&format!("{}?page=1#comment-", question_url)));

    let html = body_text(get(&app, &question_url, None).await).await;
    assert!(html.contains("Why does this not compile?"));
    assert!(html.contains("Add a lifetime"));
    assert!(html.contains("href=\"/tag/borrowck\""));
}

#[tokio::test]
async fn test_tag_with_slash_links_to_its_page() {
    let (_pool, app) = setup_app().await;
    let cookie = sign_up(&app, "alice").await;

    let asked = post_form(&app, "/ask/", "title=Pointers&content=Raw+or+smart%3F&tags=c%2Fc%2B%2B", Some(&cookie)).await;
    assert_eq!(asked.status(), StatusCode::SEE_OTHER);
    let question_url = location(&asked).to_string();

    let html = body_text(get(&app, &question_url, None).await).await;
    let start = html.find("href=\"/tag/").expect("tag link") + "href=\"".len();
    let end = start + html[start..].find('"').expect("closing quote");
    let tag_url = &html[start..end];
    assert_eq!(tag_url, "/tag/c%2Fc%2B%2B");

    let response = get(&app, tag_url, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Pointers"));
}

#[tokio::test]
async fn test_invalid_ask_rerenders_form() {
    let (pool, app) = setup_app().await;
    let cookie = sign_up(&app, "alice").await;

    let response = post_form(&app, "/ask/", "title=Tags&content=Body&tags=a%2Cb%2Cc%2Cd", Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("More than three tags have been entered!"));
    let questions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions")
        .fetch_one(pool.as_sqlite().unwrap())
        .await
        .unwrap();
    assert_eq!(questions, 0);
}

#[tokio::test]
async fn test_like_question_once() {
    let (pool, app) = setup_app().await;
    let (_, author) = seed_profile(&pool, "asker").await;
    let id = seed_question(&pool, author, "Likeable", &[]).await;
    let cookie = sign_up(&app, "fan").await;

    for _ in 0..2 {
        let response = post_form(&app, &format!("/question/{}/like", id), "", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), format!("/question/{}", id));
    }

    let rating: i64 = sqlx::query_scalar("SELECT rating FROM questions WHERE id = ?")
        .bind(id)
        .fetch_one(pool.as_sqlite().unwrap())
        .await
        .unwrap();
    assert_eq!(rating, 1);

    let missing = post_form(&app, "/question/999/like", "", Some(&cookie)).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_settings_password_change_rotates_session() {
    let (_pool, app) = setup_app().await;
    let old_cookie = sign_up(&app, "alice").await;

    let form = get(&app, "/settings/", Some(&old_cookie)).await;
    assert_eq!(form.status(), StatusCode::OK);
    assert!(body_text(form).await.contains("value=\"alice@example.com\""));

    let response = post_form(
        &app,
        "/settings/",
        "email=alice%40example.org&avatar=&password=secret&new_password=better&password_check=better",
        Some(&old_cookie),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/settings/");
    let new_cookie = session_cookie(&response).expect("password change issues a new session");
    assert_ne!(new_cookie, old_cookie);

    assert_eq!(get(&app, "/settings/", Some(&old_cookie)).await.status(), StatusCode::SEE_OTHER);
    let page = get(&app, "/settings/", Some(&new_cookie)).await;
    assert_eq!(page.status(), StatusCode::OK);
    assert!(body_text(page).await.contains("value=\"alice@example.org\""));

    let login = post_form(&app, "/login/", "username=alice&password=better", None).await;
    assert_eq!(login.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_settings_wrong_current_password() {
    let (_pool, app) = setup_app().await;
    let cookie = sign_up(&app, "alice").await;

    let response = post_form(
        &app,
        "/settings/",
        "email=&avatar=&password=nope&new_password=&password_check=",
        Some(&cookie),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    assert!(body_text(response).await.contains("The old password is incorrect!"));
}

#[tokio::test]
async fn test_static_files_are_served() {
    let (_pool, app) = setup_app().await;

    let response = get(&app, "/static/style.css", None).await;

    assert_eq!(response.status(), StatusCode::OK);
}
