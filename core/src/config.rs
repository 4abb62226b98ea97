use std::env;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://mlcasim-api.edwardnafornita.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_AGE_SECONDS: u64 = 300;

pub const BASE_URL_ENV: &str = "MLCASIM_API_URL";
pub const TIMEOUT_ENV: &str = "MLCASIM_TIMEOUT_SECS";
pub const MAX_AGE_ENV: &str = "MLCASIM_MAX_AGE_SECONDS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub base_url: String,
    pub timeout: Duration,
    // Forwarded to run-attack; the service reuses a generated payload younger than this.
    pub max_age_seconds: Option<u64>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_age_seconds: Some(DEFAULT_MAX_AGE_SECONDS),
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup(BASE_URL_ENV)
            .map(|raw| normalize_base_url(&raw))
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout = lookup(TIMEOUT_ENV)
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let max_age_seconds = lookup(MAX_AGE_ENV)
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_MAX_AGE_SECONDS);

        Self {
            base_url,
            timeout: Duration::from_secs(timeout),
            max_age_seconds: Some(max_age_seconds),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        let normalized = normalize_base_url(base_url);
        if !normalized.is_empty() {
            self.base_url = normalized;
        }
        self
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed.strip_suffix('/').unwrap_or(trimmed).to_string()
}
