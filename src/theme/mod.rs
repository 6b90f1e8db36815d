//! Template engine
//!
//! Loads every `*.html` file under the configured directory into a single
//! Tera instance. Template names are paths relative to that directory with
//! forward slashes (`partials/pagination.html`). `.html` templates are
//! autoescaped.

use anyhow::{Context, Result};
use std::error::Error as StdError;
use std::fs;
use std::path::Path;
use tera::{Context as TeraContext, Tera};

mod error;

pub use error::ThemeError;

/// Template engine for rendering pages
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Load all templates under `templates_path`
    pub fn new(templates_path: &Path) -> Result<Self> {
        if !templates_path.is_dir() {
            return Err(ThemeError::NotFound(templates_path.to_path_buf()).into());
        }

        let tera = load_templates(templates_path)?;
        tracing::debug!(
            "Loaded {} templates from {:?}",
            tera.get_template_names().count(),
            templates_path
        );

        Ok(Self { tera })
    }

    /// Render a template with context
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String> {
        self.tera.render(template, context).map_err(|e| {
            let mut error_msg = format!("Failed to render '{}': {}", template, e);
            let mut source = e.source();
            while let Some(s) = source {
                error_msg.push_str(&format!("\n  Caused by: {}", s));
                source = s.source();
            }
            ThemeError::TemplateError(error_msg).into()
        })
    }
}

/// Bare HTML page used when no template can be rendered
pub fn simple_error_page(status: u16, message: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><title>Error {status}</title></head>\
         <body><h1>Error {status}</h1><p>{}</p><p><a href=\"/\">Back to questions</a></p></body></html>",
        tera::escape_html(message),
    )
}

fn load_templates(templates_path: &Path) -> Result<Tera> {
    let mut templates: Vec<(String, String)> = Vec::new();
    collect_templates_from_dir(templates_path, templates_path, &mut templates)?;

    // Added in one batch so `extends` and `import` resolve regardless of order
    let mut tera = Tera::default();
    tera.add_raw_templates(templates)
        .map_err(|e| ThemeError::TemplateError(format!("Failed to load templates: {}", e)))?;

    Ok(tera)
}

fn collect_templates_from_dir(
    base_path: &Path,
    current_path: &Path,
    templates: &mut Vec<(String, String)>,
) -> Result<()> {
    for entry in fs::read_dir(current_path)
        .with_context(|| format!("Failed to read template directory: {:?}", current_path))?
    {
        let path = entry?.path();

        if path.is_dir() {
            collect_templates_from_dir(base_path, &path, templates)?;
        } else if path.extension().map_or(false, |ext| ext == "html") {
            let relative_path = path
                .strip_prefix(base_path)
                .map_err(|_| ThemeError::TemplateError("Failed to get relative path".to_string()))?;
            let template_name = relative_path.to_string_lossy().replace('\\', "/");

            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read template: {:?}", path))?;

            templates.push((template_name, content));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests;
