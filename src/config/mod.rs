//! Configuration management
//!
//! Configuration for the AskMe forum is loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Template and static asset locations
    #[serde(default)]
    pub theme: ThemeConfig,
    /// Session cookie settings
    #[serde(default)]
    pub session: SessionConfig,
    /// Page sizes for the listing pages
    #[serde(default)]
    pub pagination: PaginationConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/askme.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

/// Where templates and static assets live on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeConfig {
    /// Directory holding the Tera templates
    #[serde(default = "default_templates_path")]
    pub path: PathBuf,
    /// Directory served under `/static`
    #[serde(default = "default_static_path")]
    pub static_path: PathBuf,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            path: default_templates_path(),
            static_path: default_static_path(),
        }
    }
}

fn default_templates_path() -> PathBuf {
    PathBuf::from("templates")
}

fn default_static_path() -> PathBuf {
    PathBuf::from("static")
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session lifetime in days
    #[serde(default = "default_ttl_days")]
    pub ttl_days: i64,
    /// Mark the session cookie `Secure`
    #[serde(default)]
    pub secure_cookie: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_days: default_ttl_days(),
            secure_cookie: false,
        }
    }
}

fn default_ttl_days() -> i64 {
    7
}

/// Page sizes used by the listing pages and the sidebar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Questions per page on the index, hot and tag pages
    #[serde(default = "default_questions_per_page")]
    pub questions_per_page: i64,
    /// Comments per page on the question page
    #[serde(default = "default_comments_per_page")]
    pub comments_per_page: i64,
    /// Number of tags shown in the sidebar
    #[serde(default = "default_sidebar_size")]
    pub sidebar_tags: i64,
    /// Number of users shown in the sidebar
    #[serde(default = "default_sidebar_size")]
    pub sidebar_users: i64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            questions_per_page: default_questions_per_page(),
            comments_per_page: default_comments_per_page(),
            sidebar_tags: default_sidebar_size(),
            sidebar_users: default_sidebar_size(),
        }
    }
}

fn default_questions_per_page() -> i64 {
    20
}

fn default_comments_per_page() -> i64 {
    30
}

fn default_sidebar_size() -> i64 {
    10
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - ASKME_SERVER_HOST
    /// - ASKME_SERVER_PORT
    /// - ASKME_DATABASE_DRIVER
    /// - ASKME_DATABASE_URL
    /// - ASKME_TEMPLATES_PATH
    /// - ASKME_STATIC_PATH
    /// - ASKME_SESSION_TTL_DAYS
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Reject values the listing pages cannot work with
    fn validate(&self) -> Result<(), ConfigError> {
        let sizes = [
            ("questions_per_page", self.pagination.questions_per_page),
            ("comments_per_page", self.pagination.comments_per_page),
            ("sidebar_tags", self.pagination.sidebar_tags),
            ("sidebar_users", self.pagination.sidebar_users),
        ];
        for (name, value) in sizes {
            if value < 1 {
                return Err(ConfigError::ValidationError(format!(
                    "pagination.{} must be at least 1, got {}",
                    name, value
                )));
            }
        }
        if self.session.ttl_days < 1 {
            return Err(ConfigError::ValidationError(format!(
                "session.ttl_days must be at least 1, got {}",
                self.session.ttl_days
            )));
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("ASKME_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("ASKME_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }

        if let Ok(driver) = std::env::var("ASKME_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(url) = std::env::var("ASKME_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(path) = std::env::var("ASKME_TEMPLATES_PATH") {
            self.theme.path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("ASKME_STATIC_PATH") {
            self.theme.static_path = PathBuf::from(path);
        }

        if let Ok(days) = std::env::var("ASKME_SESSION_TTL_DAYS") {
            if let Ok(days) = days.parse::<i64>() {
                self.session.ttl_days = days;
            }
        }
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared by every test that touches ASKME_* environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
