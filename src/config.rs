use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use reqwest::Url;

use crate::error::AppError;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub db_max_connections: u32,
    pub sync_concurrency: usize,
    pub upcoming_default_limit: i64,
    /// Remote planner API to read assignments and milestones from. When unset
    /// they are read from the local database.
    pub source_api: Option<SourceApiConfig>,
}

#[derive(Clone)]
pub struct SourceApiConfig {
    pub url: Url,
    pub token: String,
}

impl fmt::Debug for SourceApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceApiConfig")
            .field("url", &self.url.as_str())
            .finish_non_exhaustive()
    }
}

impl SourceApiConfig {
    /// Reads `SOURCE_API_URL` and `SOURCE_API_TOKEN`. `None` when no URL is
    /// set; a URL without a token is an error.
    pub fn from_env() -> Result<Option<Self>, AppError> {
        let Ok(raw) = env::var("SOURCE_API_URL") else {
            return Ok(None);
        };
        let token = env::var("SOURCE_API_TOKEN")
            .map_err(|_| AppError::Config("SOURCE_API_TOKEN is not set".to_string()))?;
        Self::new(&raw, token).map(Some)
    }

    pub fn new(url: &str, token: impl Into<String>) -> Result<Self, AppError> {
        let url = Url::parse(url.trim())
            .map_err(|e| AppError::Config(format!("SOURCE_API_URL is invalid: {}", e)))?;
        if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::Config(format!("SOURCE_API_URL is not an http(s) base URL: {}", url)));
        }

        let token = token.into();
        if token.trim().is_empty() {
            return Err(AppError::Config("SOURCE_API_TOKEN must not be empty".to_string()));
        }
        Ok(Self { url, token })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://planner.db?mode=rwc".to_string(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            db_max_connections: 5,
            sync_concurrency: 4,
            upcoming_default_limit: 20,
            source_api: None,
        }
    }
}

impl AppConfig {
    /// Reads settings from the environment (call `dotenvy::dotenv()` first to
    /// pick up a `.env` file). Unset variables fall back to the defaults.
    pub fn new_from_env() -> Result<Self, AppError> {
        let defaults = Self::default();

        let config = Self {
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            bind_addr: parse_var("BIND_ADDR", defaults.bind_addr)?,
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            sync_concurrency: parse_var("SYNC_CONCURRENCY", defaults.sync_concurrency)?,
            upcoming_default_limit: parse_var("UPCOMING_DEFAULT_LIMIT", defaults.upcoming_default_limit)?,
            source_api: SourceApiConfig::from_env()?,
        };

        if config.db_max_connections == 0 {
            return Err(AppError::Config("DB_MAX_CONNECTIONS must be at least 1".to_string()));
        }
        if config.sync_concurrency == 0 {
            return Err(AppError::Config("SYNC_CONCURRENCY must be at least 1".to_string()));
        }
        if config.upcoming_default_limit < 1 {
            return Err(AppError::Config("UPCOMING_DEFAULT_LIMIT must be at least 1".to_string()));
        }

        Ok(config)
    }
}

fn parse_var<T: FromStr>(key: &str, default: T) -> Result<T, AppError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} has an invalid value: {:?}", key, raw))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_api_needs_an_http_base_and_a_token() {
        let api = SourceApiConfig::new(" https://planner.example/api/ ", "secret").unwrap();
        assert_eq!(api.url.as_str(), "https://planner.example/api/");
        assert!(!format!("{:?}", api).contains("secret"));

        assert!(matches!(SourceApiConfig::new("not a url", "secret"), Err(AppError::Config(_))));
        assert!(matches!(SourceApiConfig::new("mailto:a@b.c", "secret"), Err(AppError::Config(_))));
        assert!(matches!(SourceApiConfig::new("https://planner.example", " "), Err(AppError::Config(_))));
    }
}
