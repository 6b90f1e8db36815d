//! Template engine error types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ThemeError {
    /// Template directory does not exist
    #[error("Template directory not found: {0}")]
    NotFound(PathBuf),

    /// Template parsing or rendering error
    #[error("Template error: {0}")]
    TemplateError(String),
}
