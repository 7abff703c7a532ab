//! Configuration loading utilities
//!
//! Provides helper functions for loading configuration from various sources
//! with proper error handling and validation.

use crate::{Result, config::Settings};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Directory name under the platform config directory
const CONFIG_DIR_NAME: &str = "chatlink";

/// Configuration loader with multiple source support
#[derive(Debug)]
pub struct ConfigLoader {
    /// Default settings
    defaults: Settings,
}

impl ConfigLoader {
    /// Create new configuration loader
    pub fn new() -> Self {
        Self {
            defaults: Settings::default(),
        }
    }

    /// Load configuration with precedence order:
    /// 1. Environment variables (highest priority)
    /// 2. Configuration file (explicit path, else the default location if present)
    /// 3. Default values (lowest priority)
    ///
    /// Command line flags are applied by the caller on top of the result.
    pub fn load(&self, config_file: Option<&Path>) -> Result<Settings> {
        let mut settings = self.defaults.clone();

        let path = config_file
            .map(Path::to_path_buf)
            .or_else(|| default_config_path().filter(|p| p.exists()));

        if let Some(path) = path {
            if path.exists() {
                info!("Loading configuration from file: {:?}", path);
                settings = Settings::from_file(&path)?;
            } else {
                warn!("Configuration file not found: {:?}, using defaults", path);
            }
        }

        debug!("Applying environment variable overrides");
        settings = settings.merge_with_env()?;

        settings.validate()?;

        debug!("Final configuration: {:?}", settings);

        Ok(settings)
    }

    /// Load configuration from environment only
    pub fn from_env_only(&self) -> Result<Settings> {
        let settings = self.defaults.clone().merge_with_env()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Get default configuration
    pub fn defaults(&self) -> &Settings {
        &self.defaults
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Default config file location, e.g. `~/.config/chatlink/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[upstream]
base_url = "https://staging.chat.example.com"
mode = "mock"

[retry]
max_retries = 5
base_delay_ms = 250
        "#
        )
        .unwrap();

        let loader = ConfigLoader::new();
        let settings = Settings::from_file(temp_file.path()).unwrap();
        settings.validate().unwrap();

        assert_eq!(settings.upstream.base_url, "https://staging.chat.example.com");
        assert_eq!(settings.upstream.mode, Mode::Mock);
        assert_eq!(settings.retry.max_retries, 5);
        assert_eq!(settings.retry.base_delay_ms, 250);
        assert_eq!(settings.retry.timeout_ms, loader.defaults().retry.timeout_ms);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[retry]\nmax_retries = \"many\"").unwrap();

        let err = Settings::from_file(temp_file.path()).unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }

    #[test]
    fn test_env_var_override() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[retry]\nmax_retries = 5\ntimeout_ms = 2000").unwrap();

        unsafe {
            std::env::set_var("CHATLINK_MAX_RETRIES", "7");
            std::env::set_var("CHATLINK_MODE", "mock");
            std::env::set_var("CHATLINK_WRITE_MAX_RETRIES", "0");
            std::env::set_var("CHATLINK_STICKER_TTL_SECS", "60");
            std::env::set_var("CHATLINK_VERBOSE", "true");
        }

        let loader = ConfigLoader::new();
        let settings = loader.load(Some(temp_file.path()));

        unsafe {
            std::env::remove_var("CHATLINK_MAX_RETRIES");
            std::env::remove_var("CHATLINK_MODE");
            std::env::remove_var("CHATLINK_WRITE_MAX_RETRIES");
            std::env::remove_var("CHATLINK_STICKER_TTL_SECS");
            std::env::remove_var("CHATLINK_VERBOSE");
        }

        let settings = settings.unwrap();
        assert_eq!(settings.retry.max_retries, 7);
        assert_eq!(settings.retry.timeout_ms, 2000);
        assert_eq!(settings.upstream.mode, Mode::Mock);
        assert_eq!(settings.retry.write_max_retries, 0);
        assert_eq!(settings.cache.sticker_ttl_secs, 60);
        assert!(settings.logging.verbose);
    }

    #[test]
    fn test_default_config_path_shape() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("chatlink/config.toml"));
        }
    }
}
