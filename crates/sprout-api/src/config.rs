use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use axum::http::HeaderValue;
use thiserror::Error;

const DEFAULT_MAX_BODY_BYTES: usize = 4 * 1024 * 1024;
const MIN_MAX_BODY_BYTES: usize = 1024;
const MAX_MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Where the server keeps its records
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    File(PathBuf),
    InMemory,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database: DatabaseLocation,
    pub max_body_bytes: usize,
    /// `None` allows any origin
    pub cors_allow_origin: Option<HeaderValue>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, "SPROUT_API_BIND_ADDR", "127.0.0.1:8080");

        let database = match value_or_default(&lookup, "SPROUT_DATABASE_PATH", "sprout.db") {
            path if path == ":memory:" => DatabaseLocation::InMemory,
            path => DatabaseLocation::File(PathBuf::from(path)),
        };

        let default_body = DEFAULT_MAX_BODY_BYTES.to_string();
        let max_body_bytes = value_or_default(&lookup, "SPROUT_MAX_BODY_BYTES", &default_body)
            .parse::<usize>()
            .map_err(|_| {
                ConfigError::Invalid(format!(
                    "SPROUT_MAX_BODY_BYTES must be an integer in [{MIN_MAX_BODY_BYTES}, {MAX_MAX_BODY_BYTES}]"
                ))
            })?;
        if !(MIN_MAX_BODY_BYTES..=MAX_MAX_BODY_BYTES).contains(&max_body_bytes) {
            return Err(ConfigError::Invalid(format!(
                "SPROUT_MAX_BODY_BYTES must be in [{MIN_MAX_BODY_BYTES}, {MAX_MAX_BODY_BYTES}]"
            )));
        }

        let cors_allow_origin = optional_trimmed(&lookup, "SPROUT_CORS_ALLOW_ORIGIN")
            .map(|value| parse_origin(trim_trailing(&value)))
            .transpose()?;

        Ok(Self {
            bind_addr,
            database,
            max_body_bytes,
            cors_allow_origin,
        })
    }
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn parse_origin(origin: &str) -> Result<HeaderValue, ConfigError> {
    if !is_http_url(origin) {
        return Err(ConfigError::Invalid(
            "SPROUT_CORS_ALLOW_ORIGIN must start with http:// or https://".to_string(),
        ));
    }
    HeaderValue::from_str(origin).map_err(|_| {
        ConfigError::Invalid("SPROUT_CORS_ALLOW_ORIGIN is not a valid header value".to_string())
    })
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn trim_trailing(value: &str) -> &str {
    value.trim_end_matches('/')
}
