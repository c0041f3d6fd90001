//! Configuration Management Module
//!
//! Layered client configuration:
//! 1. Built-in defaults
//! 2. TOML file (explicit path, or `<config_dir>/askdb/config.toml` if present)
//! 3. `ASKDB_*` environment variables
//! 4. Command-line overrides

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Environment variable prefix (`ASKDB_BASE_URL`, ...)
pub const ENV_PREFIX: &str = "ASKDB";

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// Root URL of the natural-language-to-SQL service
    pub base_url: String,
    /// Per-request timeout
    pub request_timeout_secs: u64,
    /// Wait between a successful connect and the first schema fetch
    pub settle_delay_ms: u64,
    /// Wait between a structural statement and the automatic schema refresh
    pub refresh_delay_ms: u64,
    /// Log file (defaults to `askdb.log` in the temp dir)
    pub log_file: Option<PathBuf>,
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            request_timeout_secs: 30,
            settle_delay_ms: 500,
            refresh_delay_ms: 1500,
            log_file: None,
            log_level: "info".to_string(),
        }
    }
}

/// Values supplied on the command line; `None` leaves the layer below alone
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl ClientConfig {
    /// Load configuration from all layers
    ///
    /// An explicit `path` must exist; the default location is optional.
    pub fn load(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        let defaults = ClientConfig::default();
        let mut builder = config::Config::builder()
            .set_default("base_url", defaults.base_url.clone())?
            .set_default("request_timeout_secs", defaults.request_timeout_secs)?
            .set_default("settle_delay_ms", defaults.settle_delay_ms)?
            .set_default("refresh_delay_ms", defaults.refresh_delay_ms)?
            .set_default("log_level", defaults.log_level.clone())?;

        match path {
            Some(explicit) => {
                debug!(path = %explicit.display(), "loading config file");
                builder = builder.add_source(config::File::from(explicit).required(true));
            }
            None => {
                if let Some(default_path) = Self::default_path().filter(|p| p.exists()) {
                    debug!(path = %default_path.display(), "loading default config file");
                    builder = builder.add_source(config::File::from(default_path).required(false));
                }
            }
        }

        let mut loaded: ClientConfig = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        if let Some(ref base_url) = overrides.base_url {
            loaded.base_url = base_url.clone();
        }
        if let Some(ref log_file) = overrides.log_file {
            loaded.log_file = Some(log_file.clone());
        }

        loaded.validate()?;
        Ok(loaded)
    }

    /// `<config_dir>/askdb/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("askdb").join("config.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.base_url.trim();
        if url.is_empty() {
            return Err(anyhow!("base_url must not be empty"));
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(anyhow!(
                "base_url must start with http:// or https:// (got '{}')",
                url
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("request_timeout_secs must be greater than 0"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn refresh_delay(&self) -> Duration {
        Duration::from_millis(self.refresh_delay_ms)
    }

    /// Resolved log file path
    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("askdb.log"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.settle_delay(), Duration::from_millis(500));
        assert_eq!(config.refresh_delay(), Duration::from_millis(1500));
    }

    #[test]
    fn test_load_from_file_with_overrides() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"base_url = "http://db-service:9000"
request_timeout_secs = 5
refresh_delay_ms = 2000
"#
        )
        .unwrap();

        let config = ClientConfig::load(Some(file.path()), &ConfigOverrides::default()).unwrap();
        assert_eq!(config.base_url, "http://db-service:9000");
        assert_eq!(config.request_timeout_secs, 5);
        assert_eq!(config.refresh_delay_ms, 2000);
        // Untouched keys keep their defaults
        assert_eq!(config.settle_delay_ms, 500);

        let overrides = ConfigOverrides {
            base_url: Some("https://elsewhere".to_string()),
            log_file: Some(PathBuf::from("/tmp/custom.log")),
        };
        let config = ClientConfig::load(Some(file.path()), &overrides).unwrap();
        assert_eq!(config.base_url, "https://elsewhere");
        assert_eq!(config.log_path(), PathBuf::from("/tmp/custom.log"));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(ClientConfig::load(Some(&missing), &ConfigOverrides::default()).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = ClientConfig {
            base_url: "localhost:8000".to_string(),
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ClientConfig {
            request_timeout_secs: 0,
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
