//! Tests for the template engine

use super::*;
use std::fs;
use tempfile::TempDir;
use tera::Context as TeraContext;

/// Helper to create a template directory with a base layout and two pages
fn create_test_templates(dir: &Path) {
    fs::create_dir_all(dir.join("partials")).unwrap();

    fs::write(
        dir.join("base.html"),
        r#"<html><body>{% block content %}{% endblock content %}</body></html>"#,
    )
    .unwrap();
    fs::write(
        dir.join("index.html"),
        r#"{% extends "base.html" %}{% block content %}<h1>{{ heading }}</h1>{% include "partials/footer.html" %}{% endblock content %}"#,
    )
    .unwrap();
    fs::write(dir.join("partials/footer.html"), "<footer>bye</footer>").unwrap();
    fs::write(
        dir.join("error.html"),
        r#"{% extends "base.html" %}{% block content %}<p>{{ status }}: {{ message }}</p>{% endblock content %}"#,
    )
    .unwrap();
    fs::write(dir.join("notes.txt"), "not a template").unwrap();
}

#[test]
fn test_engine_loads_nested_templates() {
    let temp_dir = TempDir::new().unwrap();
    create_test_templates(temp_dir.path());

    let engine = TemplateEngine::new(temp_dir.path()).unwrap();

    let footer = engine.render("partials/footer.html", &TeraContext::new()).unwrap();
    assert_eq!(footer, "<footer>bye</footer>");
    assert!(engine.render("notes.txt", &TeraContext::new()).is_err());
}

#[test]
fn test_missing_directory_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let result = TemplateEngine::new(&temp_dir.path().join("missing"));
    assert!(result.is_err());
}

#[test]
fn test_render_with_inheritance_and_escaping() {
    let temp_dir = TempDir::new().unwrap();
    create_test_templates(temp_dir.path());
    let engine = TemplateEngine::new(temp_dir.path()).unwrap();

    let mut context = TeraContext::new();
    context.insert("heading", "<b>Questions</b>");
    let html = engine.render("index.html", &context).unwrap();

    assert!(html.starts_with("<html><body>"));
    assert!(html.contains("&lt;b&gt;Questions"));
    assert!(!html.contains("<b>"));
    assert!(html.contains("<footer>bye</footer>"));
}

#[test]
fn test_render_unknown_template_fails() {
    let temp_dir = TempDir::new().unwrap();
    create_test_templates(temp_dir.path());
    let engine = TemplateEngine::new(temp_dir.path()).unwrap();

    let err = engine.render("missing.html", &TeraContext::new()).unwrap_err();
    assert!(err.to_string().contains("missing.html"));
}

#[test]
fn test_invalid_template_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("broken.html"), "{% if %}").unwrap();

    let result = TemplateEngine::new(temp_dir.path());
    assert!(result.is_err());
}

#[test]
fn test_simple_error_page_escapes_message() {
    let html = simple_error_page(404, "<script>alert('x')</script>");
    assert!(html.contains("Error 404"));
    assert!(html.contains("&lt;script&gt;alert(&#x27;x&#x27;)"));
    assert!(!html.contains("<script>"));
}

#[test]
fn test_shipped_templates_load() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("templates");
    let engine = TemplateEngine::new(&path).unwrap();

    let mut context = TeraContext::new();
    context.insert("status", &404);
    context.insert("message", "Page not found");
    context.insert("current_user", &Option::<()>::None);
    context.insert("sidebar_tags", &Vec::<()>::new());
    context.insert("sidebar_users", &Vec::<()>::new());

    let html = engine.render("error.html", &context).unwrap();
    assert!(html.contains("<h1>404</h1>"));
    assert!(html.contains("Page not found"));
}
