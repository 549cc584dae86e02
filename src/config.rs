// src/config.rs
//! Process configuration from environment variables (after `.env` is loaded).

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::engine::EngineSettings;
use crate::enrich::summarizer::SummarizerConfig;
use crate::ingest::providers::ProviderSettings;

const MIN_REFRESH_SECS: u64 = 600;
const MAX_REFRESH_SECS: u64 = 3600;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub refresh_interval: Duration,
    pub cache_capacity: usize,
    pub retention_days: i64,
    pub sweep_interval: Duration,
    pub provider_timeout: Duration,
    pub static_dir: PathBuf,
    pub youtube_api_key: Option<String>,
    pub summarizer_url: Option<String>,
    pub summarizer_api_key: Option<String>,
    pub summarizer_mock: bool,
    /// Behind a reverse proxy: key voters on the forwarded client address.
    pub trust_proxy: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("trends.db"),
            refresh_interval: Duration::from_secs(1800),
            cache_capacity: 2000,
            retention_days: 7,
            sweep_interval: Duration::from_secs(3600),
            provider_timeout: Duration::from_secs(10),
            static_dir: PathBuf::from("static"),
            youtube_api_key: None,
            summarizer_url: None,
            summarizer_api_key: None,
            summarizer_mock: false,
            trust_proxy: false,
        }
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Parse `key` as a number, falling back to `default` (with a warning) on garbage.
fn num<T: std::str::FromStr>(key: &str, default: T) -> T {
    match var(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "invalid number in environment; using default");
            default
        }),
        None => default,
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        let refresh_secs = num("TRENDS_REFRESH_INTERVAL_SECS", d.refresh_interval.as_secs())
            .clamp(MIN_REFRESH_SECS, MAX_REFRESH_SECS);

        Self {
            db_path: var("TRENDS_DB_PATH").map(PathBuf::from).unwrap_or(d.db_path),
            refresh_interval: Duration::from_secs(refresh_secs),
            cache_capacity: num("TRENDS_CACHE_CAPACITY", d.cache_capacity).max(1),
            retention_days: num("TRENDS_RETENTION_DAYS", d.retention_days).max(1),
            sweep_interval: Duration::from_secs(
                num("TRENDS_SWEEP_INTERVAL_SECS", d.sweep_interval.as_secs()).max(60),
            ),
            provider_timeout: Duration::from_secs(
                num("TRENDS_PROVIDER_TIMEOUT_SECS", d.provider_timeout.as_secs()).max(1),
            ),
            static_dir: var("TRENDS_STATIC_DIR").map(PathBuf::from).unwrap_or(d.static_dir),
            youtube_api_key: var("YOUTUBE_API_KEY"),
            summarizer_url: var("SUMMARIZER_URL"),
            summarizer_api_key: var("SUMMARIZER_API_KEY"),
            summarizer_mock: var("SUMMARIZER_TEST_MODE").is_some_and(|v| v == "mock"),
            trust_proxy: var("TRENDS_TRUST_PROXY")
                .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true")),
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            capacity: self.cache_capacity,
            provider_timeout: self.provider_timeout,
            refresh_interval: self.refresh_interval,
            retention: chrono::Duration::days(self.retention_days),
        }
    }

    pub fn provider_settings(&self) -> ProviderSettings {
        ProviderSettings {
            youtube_api_key: self.youtube_api_key.clone(),
        }
    }

    pub fn summarizer_config(&self) -> SummarizerConfig {
        SummarizerConfig {
            url: self.summarizer_url.clone(),
            api_key: self.summarizer_api_key.clone(),
            test_mode_mock: self.summarizer_mock,
            timeout: self.provider_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYS: &[&str] = &[
        "TRENDS_DB_PATH",
        "TRENDS_REFRESH_INTERVAL_SECS",
        "TRENDS_CACHE_CAPACITY",
        "TRENDS_RETENTION_DAYS",
        "YOUTUBE_API_KEY",
        "SUMMARIZER_TEST_MODE",
        "TRENDS_TRUST_PROXY",
    ];

    fn clear() {
        for k in KEYS {
            env::remove_var(k);
        }
    }

    #[serial_test::serial]
    #[test]
    fn defaults_without_env() {
        clear();
        let cfg = AppConfig::from_env();
        assert_eq!(cfg.db_path, PathBuf::from("trends.db"));
        assert_eq!(cfg.refresh_interval, Duration::from_secs(1800));
        assert_eq!(cfg.cache_capacity, 2000);
        assert_eq!(cfg.engine_settings().retention, chrono::Duration::days(7));
        assert!(cfg.youtube_api_key.is_none());
        assert!(!cfg.summarizer_mock);
        assert!(!cfg.trust_proxy);
    }

    #[serial_test::serial]
    #[test]
    fn env_overrides_and_clamps() {
        clear();
        env::set_var("TRENDS_REFRESH_INTERVAL_SECS", "60");
        env::set_var("TRENDS_CACHE_CAPACITY", "oops");
        env::set_var("YOUTUBE_API_KEY", "  ");
        env::set_var("SUMMARIZER_TEST_MODE", "mock");
        env::set_var("TRENDS_TRUST_PROXY", "TRUE");
        let cfg = AppConfig::from_env();
        assert_eq!(cfg.refresh_interval, Duration::from_secs(600));
        assert_eq!(cfg.cache_capacity, 2000);
        assert!(cfg.youtube_api_key.is_none());
        assert!(cfg.summarizer_mock);
        assert!(cfg.trust_proxy);

        env::set_var("TRENDS_REFRESH_INTERVAL_SECS", "99999");
        assert_eq!(AppConfig::from_env().refresh_interval, Duration::from_secs(3600));
        clear();
    }
}
