//! Process-wide immutable configuration snapshot.
//!
//! Loaded once from the environment (optionally seeded by a `.env` file) and
//! validated at startup. Never re-read after that; every component receives
//! an `Arc<Config>` rather than consulting the environment itself.

use anyhow::{bail, Result};
use std::env;
use std::time::Duration;

/// Which [`crate::fetcher::Fetcher`] strategy the scheduler should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    Aerodrome,
    Search,
    Authenticated,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub version: String,

    pub database_path: String,

    pub notam_api_url: String,
    pub notam_api_key: String,

    pub airports: Vec<String>,
    pub search_terms: Vec<String>,

    pub update_interval: Duration,

    pub min_request_delay: f64,
    pub max_request_delay: f64,

    pub drone_keywords: Vec<String>,

    pub closure_score: i32,
    pub drone_score: i32,
    pub restriction_score: i32,

    pub ntfy_url: Option<String>,
    pub ntfy_digest_interval: Duration,
    pub ntfy_min_score: i32,
    pub ntfy_max_digest_items: usize,

    pub purge_expired_after_days: i64,
    pub purge_cancelled_after_days: i64,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_csv(key: &str, default: &str) -> Vec<String> {
    env_or(key, default)
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Builds a configuration snapshot from the process environment.
    pub fn from_env() -> Result<Self> {
        let config = Config {
            log_level: env_or("LOG_LEVEL", "INFO"),
            version: env_or("VERSION", "v0.0.0"),
            database_path: env_or("DATABASE_PATH", "./data/notam.db"),
            notam_api_url: env_or(
                "NOTAM_API_URL",
                "https://notams.aim.faa.gov/notamSearch/search",
            ),
            notam_api_key: env_or("NOTAM_API_KEY", ""),
            airports: env_csv("AIRPORTS", ""),
            search_terms: env_csv("SEARCH_TERMS", ""),
            update_interval: Duration::from_secs(env_parse("UPDATE_INTERVAL_SECONDS", 3600)),
            min_request_delay: env_parse("MIN_REQUEST_DELAY", 2.0),
            max_request_delay: env_parse("MAX_REQUEST_DELAY", 5.0),
            drone_keywords: env_csv("DRONE_KEYWORDS", "drone,UAS,unmanned,RPAS")
                .into_iter()
                .map(|k| k.to_lowercase())
                .collect(),
            closure_score: env_parse("CLOSURE_SCORE", 50),
            drone_score: env_parse("DRONE_SCORE", 30),
            restriction_score: env_parse("RESTRICTION_SCORE", 20),
            ntfy_url: env::var("NTFY_URL").ok().filter(|s| !s.is_empty()),
            ntfy_digest_interval: Duration::from_secs(env_parse("NTFY_DIGEST_INTERVAL", 3600)),
            ntfy_min_score: env_parse("NTFY_MIN_SCORE", 80),
            ntfy_max_digest_items: env_parse("NTFY_MAX_DIGEST_ITEMS", 10),
            purge_expired_after_days: env_parse("PURGE_EXPIRED_AFTER_DAYS", 30),
            purge_cancelled_after_days: env_parse("PURGE_CANCELLED_AFTER_DAYS", 7),
        };

        config.validate()?;
        Ok(config)
    }

    /// Resolves the fetcher mode precedence: explicit env override, else
    /// `NOTAM_API_KEY` set → Authenticated, else `SEARCH_TERMS` non-empty →
    /// Search, else Aerodrome.
    pub fn fetch_mode(&self) -> FetchMode {
        match env::var("NOTAM_MODE").ok().as_deref() {
            Some("aerodrome") => return FetchMode::Aerodrome,
            Some("search") => return FetchMode::Search,
            Some("authenticated") => return FetchMode::Authenticated,
            _ => {}
        }
        if !self.notam_api_key.is_empty() {
            FetchMode::Authenticated
        } else if !self.search_terms.is_empty() {
            FetchMode::Search
        } else {
            FetchMode::Aerodrome
        }
    }

    fn validate(&self) -> Result<()> {
        if self.airports.is_empty() && self.search_terms.is_empty() {
            bail!("at least one of AIRPORTS or SEARCH_TERMS must be configured");
        }
        if self.notam_api_url.is_empty() {
            bail!("NOTAM_API_URL configuration is required");
        }
        if self.version == "v0.0.0" {
            bail!("VERSION must be set to a non-default value");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        unsafe {
            for key in [
                "AIRPORTS",
                "SEARCH_TERMS",
                "NOTAM_API_URL",
                "VERSION",
                "NOTAM_API_KEY",
                "NOTAM_MODE",
            ] {
                env::remove_var(key);
            }
        }
    }

    #[test]
    #[serial]
    fn rejects_default_version() {
        clear_env();
        unsafe {
            env::set_var("AIRPORTS", "EGLL");
        }
        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("VERSION"));
    }

    #[test]
    #[serial]
    fn rejects_empty_targets() {
        clear_env();
        unsafe {
            env::set_var("VERSION", "v1.2.3");
        }
        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("AIRPORTS"));
    }

    #[test]
    #[serial]
    fn mode_precedence_prefers_authenticated_key() {
        clear_env();
        unsafe {
            env::set_var("AIRPORTS", "EGLL");
            env::set_var("VERSION", "v1.2.3");
            env::set_var("NOTAM_API_KEY", "secret");
            env::set_var("SEARCH_TERMS", "drone");
        }
        let config = Config::from_env().unwrap();
        assert_eq!(config.fetch_mode(), FetchMode::Authenticated);
        unsafe {
            env::remove_var("NOTAM_API_KEY");
            env::remove_var("SEARCH_TERMS");
            env::remove_var("AIRPORTS");
            env::remove_var("VERSION");
        }
    }
}
