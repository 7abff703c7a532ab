//! Configuration settings structure
//!
//! Defines the main settings structure and loading logic for the integration client.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration settings for the integration client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Upstream platform configuration
    pub upstream: UpstreamSettings,
    /// Retry and timeout policy defaults
    pub retry: RetrySettings,
    /// Response cache configuration
    pub cache: CacheSettings,
    /// Logging configuration
    pub logging: LoggingSettings,
}

/// Whether requests reach the upstream platform
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Real network calls
    #[default]
    Live,
    /// Deterministic fixtures, no network
    Mock,
}

impl std::str::FromStr for Mode {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "live" => Ok(Self::Live),
            "mock" => Ok(Self::Mock),
            other => Err(crate::Error::config(format!("Invalid mode: {}", other))),
        }
    }
}

/// Upstream platform configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpstreamSettings {
    /// Base URL of the platform, also used for `origin`/`referer`
    pub base_url: String,
    /// User agent sent with every request
    pub user_agent: String,
    /// Live or mock mode
    pub mode: Mode,
}

/// Retry and timeout policy defaults, overridable per call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrySettings {
    /// Per-attempt deadline in milliseconds
    pub timeout_ms: u64,
    /// Retries for read calls
    pub max_retries: u32,
    /// Retries for state-changing calls
    pub write_max_retries: u32,
    /// Base backoff in milliseconds, doubled per retry
    pub base_delay_ms: u64,
}

/// Response cache configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheSettings {
    /// Sticker catalog TTL in seconds
    pub sticker_ttl_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level
    pub level: String,
    /// Enable verbose logging
    pub verbose: bool,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            base_url: "https://chat.example.com".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36"
                .to_string(),
            mode: Mode::Live,
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_retries: 3,
            write_max_retries: 1,
            base_delay_ms: 1_000,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            sticker_ttl_secs: 30 * 60,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            verbose: false,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            upstream: UpstreamSettings::default(),
            retry: RetrySettings::default(),
            cache: CacheSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl RetrySettings {
    /// Per-attempt deadline
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Base backoff delay
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

impl CacheSettings {
    /// Sticker catalog TTL
    pub fn sticker_ttl(&self) -> Duration {
        Duration::from_secs(self.sticker_ttl_secs)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> crate::Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| crate::Error::Config(format!("Invalid {}: {}", name, e)))
}

impl Settings {
    /// Create new settings with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from environment variables
    pub fn from_env() -> crate::Result<Self> {
        Self::default().merge_with_env()
    }

    /// Load settings from a TOML file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            crate::Error::Config(format!("Invalid config file {}: {}", path.display(), e))
        })
    }

    /// Override fields with `CHATLINK_*` environment variables
    pub fn merge_with_env(mut self) -> crate::Result<Self> {
        if let Ok(base_url) = std::env::var("CHATLINK_BASE_URL") {
            self.upstream.base_url = base_url;
        }

        if let Ok(user_agent) = std::env::var("CHATLINK_USER_AGENT") {
            self.upstream.user_agent = user_agent;
        }

        if let Ok(mode) = std::env::var("CHATLINK_MODE") {
            self.upstream.mode = mode.parse()?;
        }

        if let Ok(timeout) = std::env::var("CHATLINK_TIMEOUT_MS") {
            self.retry.timeout_ms = parse_env("timeout", &timeout)?;
        }

        if let Ok(retries) = std::env::var("CHATLINK_MAX_RETRIES") {
            self.retry.max_retries = parse_env("max retries", &retries)?;
        }

        if let Ok(delay) = std::env::var("CHATLINK_BASE_DELAY_MS") {
            self.retry.base_delay_ms = parse_env("base delay", &delay)?;
        }

        if let Ok(retries) = std::env::var("CHATLINK_WRITE_MAX_RETRIES") {
            self.retry.write_max_retries = parse_env("write max retries", &retries)?;
        }

        if let Ok(ttl) = std::env::var("CHATLINK_STICKER_TTL_SECS") {
            self.cache.sticker_ttl_secs = parse_env("sticker TTL", &ttl)?;
        }

        if let Ok(level) = std::env::var("CHATLINK_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(verbose) = std::env::var("CHATLINK_VERBOSE") {
            self.logging.verbose = parse_env("verbose flag", &verbose)?;
        }

        Ok(self)
    }

    /// Reject settings the client cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        let url = url::Url::parse(&self.upstream.base_url).map_err(|e| {
            crate::Error::Config(format!(
                "Invalid base URL {}: {}",
                self.upstream.base_url, e
            ))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(crate::Error::config(format!(
                "Base URL must be http or https, got {}",
                url.scheme()
            )));
        }

        if self.upstream.user_agent.trim().is_empty() {
            return Err(crate::Error::config("User agent must not be empty"));
        }

        if self.retry.timeout_ms == 0 {
            return Err(crate::Error::config("Timeout must be greater than zero"));
        }

        if self.cache.sticker_ttl_secs == 0 {
            return Err(crate::Error::config("Sticker TTL must be greater than zero"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.retry.timeout_ms, 10_000);
        assert_eq!(settings.retry.max_retries, 3);
        assert_eq!(settings.retry.write_max_retries, 1);
        assert_eq!(settings.retry.base_delay(), Duration::from_secs(1));
        assert_eq!(settings.cache.sticker_ttl(), Duration::from_secs(1800));
        assert_eq!(settings.upstream.mode, Mode::Live);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("mock".parse::<Mode>().unwrap(), Mode::Mock);
        assert_eq!(" LIVE ".parse::<Mode>().unwrap(), Mode::Live);
        assert!("replay".parse::<Mode>().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_base_url() {
        let mut settings = Settings::default();
        settings.upstream.base_url = "not a url".to_string();
        assert!(matches!(settings.validate(), Err(crate::Error::Config(_))));

        settings.upstream.base_url = "ftp://example.com".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut settings = Settings::default();
        settings.retry.timeout_ms = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_partial_toml() {
        let settings: Settings = toml::from_str(
            r#"
[retry]
max_retries = 5
"#,
        )
        .unwrap();
        assert_eq!(settings.retry.max_retries, 5);
        assert_eq!(settings.retry.timeout_ms, 10_000);
        assert_eq!(settings.upstream.base_url, "https://chat.example.com");
    }
}
