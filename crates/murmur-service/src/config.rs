use std::time::Duration;

use crate::error::{Result, ServiceError};

pub const DATABASE_URL_VAR: &str = "MURMUR_DATABASE_URL";
pub const CODE_TTL_VAR: &str = "MURMUR_CODE_TTL_SECS";
pub const MESSAGE_LIMIT_VAR: &str = "MURMUR_MESSAGE_LIMIT";
pub const SEARCH_LIMIT_VAR: &str = "MURMUR_SEARCH_LIMIT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// SQLite URL. `None` means the default file in the platform data directory.
    pub database_url: Option<String>,
    pub code_ttl: Duration,
    pub message_limit: i64,
    pub search_limit: i64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            code_ttl: Duration::from_secs(5 * 60),
            message_limit: 100,
            search_limit: 20,
        }
    }
}

impl ServiceConfig {
    pub fn in_memory() -> Self {
        Self {
            database_url: Some(murmur_db::MEMORY_URL.into()),
            ..Self::default()
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup(DATABASE_URL_VAR).filter(|v| !v.trim().is_empty()) {
            config.database_url = Some(url.trim().to_string());
        }
        if let Some(secs) = parse_positive(&lookup, CODE_TTL_VAR)? {
            config.code_ttl = Duration::from_secs(secs as u64);
        }
        if let Some(limit) = parse_positive(&lookup, MESSAGE_LIMIT_VAR)? {
            config.message_limit = limit;
        }
        if let Some(limit) = parse_positive(&lookup, SEARCH_LIMIT_VAR)? {
            config.search_limit = limit;
        }

        Ok(config)
    }

    pub(crate) fn code_ttl_millis(&self) -> i64 {
        self.code_ttl.as_millis() as i64
    }
}

fn parse_positive(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<i64>> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    match raw.trim().parse::<i64>() {
        Ok(value) if value > 0 => Ok(Some(value)),
        _ => Err(ServiceError::Config(format!("{key} must be a positive integer, got {raw:?}"))),
    }
}
