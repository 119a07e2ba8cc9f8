//! Host configuration parsed from environment variables.
//!
//! Required:
//! - `DATABASE_URL`
//! - `AUTH_URL`, `AUTH_API_KEY`, `AUTH_EMAIL`, `AUTH_PASSWORD`
//!
//! Optional:
//! - `DB_MAX_CONNECTIONS`: default 5
//! - `TOMBSTONE_TTL_MS`: default 30000
//! - `NOTICE_DURATION_MS`: default 3000
//! - `SESSION_QUEUE_CAPACITY`: default 1024

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::str::FromStr;

use scene::consts::{DEFAULT_NOTICE_DURATION_MS, DEFAULT_TOMBSTONE_TTL_MS};

pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_SESSION_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

impl ConfigError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Missing(_) => "E_CONFIG_MISSING",
            Self::Invalid { .. } => "E_CONFIG_INVALID",
        }
    }
}

/// Identity provider endpoint and the account the headless session signs in as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub url: String,
    pub api_key: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub auth: AuthConfig,
    pub tombstone_ttl_ms: i64,
    pub notice_duration_ms: i64,
    pub session_queue_capacity: usize,
}

impl AppConfig {
    /// Build config from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a required variable is missing or a
    /// numeric variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let auth = AuthConfig {
            url: required("AUTH_URL")?.trim_end_matches('/').to_string(),
            api_key: required("AUTH_API_KEY")?,
            email: required("AUTH_EMAIL")?,
            password: required("AUTH_PASSWORD")?,
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            db_max_connections: env_parse(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?,
            auth,
            tombstone_ttl_ms: env_parse(&lookup, "TOMBSTONE_TTL_MS", DEFAULT_TOMBSTONE_TTL_MS)?,
            notice_duration_ms: env_parse(&lookup, "NOTICE_DURATION_MS", DEFAULT_NOTICE_DURATION_MS)?,
            session_queue_capacity: env_parse(&lookup, "SESSION_QUEUE_CAPACITY", DEFAULT_SESSION_QUEUE_CAPACITY)?,
        })
    }
}

fn env_parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}
