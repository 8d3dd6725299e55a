//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.dealwizard.toml` files.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".dealwizard.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Remote endpoints.
    #[serde(default)]
    pub api: ApiConfig,

    /// Status polling settings.
    #[serde(default)]
    pub polling: PollingConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Where the selected strategy and goal are remembered.
    #[serde(default = "default_settings_path")]
    pub settings_path: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            settings_path: default_settings_path(),
        }
    }
}

fn default_settings_path() -> PathBuf {
    PathBuf::from(".dealwizard").join("settings.toml")
}

/// Remote endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Webhook that accepts new analysis requests.
    #[serde(default = "default_webhook_url")]
    pub webhook_url: String,

    /// Status endpoint; `{job_id}` is replaced with the job id.
    #[serde(default = "default_status_url")]
    pub status_url: String,

    /// Report page; `{job_id}` is replaced with the report reference.
    #[serde(default = "default_report_url")]
    pub report_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            webhook_url: default_webhook_url(),
            status_url: default_status_url(),
            report_url: default_report_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_webhook_url() -> String {
    "https://api.dealwizard.app/webhook/production".to_string()
}

fn default_status_url() -> String {
    "https://deal-wizard-home.bubbleapps.io/api/1.1/obj/properties/{job_id}".to_string()
}

fn default_report_url() -> String {
    "https://deal-wizard-home.bubbleapps.io/new_product_page/{job_id}".to_string()
}

fn default_timeout() -> u64 {
    10
}

/// Status polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Delay between status checks in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Number of status checks before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_interval_ms() -> u64 {
    5000
}

fn default_max_attempts() -> u32 {
    60 // 5 minutes at the default interval
}

impl PollingConfig {
    /// Interval as a `Duration`.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl ApiConfig {
    /// Per-request timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref url) = args.webhook_url {
            self.api.webhook_url = url.clone();
        }
        if let Some(ref url) = args.status_url {
            self.api.status_url = url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.api.timeout_seconds = timeout;
        }
        if let Some(interval) = args.interval_ms {
            self.polling.interval_ms = interval;
        }
        if let Some(attempts) = args.max_attempts {
            self.polling.max_attempts = attempts;
        }
        if let Some(ref path) = args.settings {
            self.general.settings_path = path.clone();
        }
    }

    /// Check values that a config file could set out of range.
    ///
    /// Run after [`merge_with_args`](Self::merge_with_args) so file and
    /// CLI values get the same treatment.
    pub fn validate(&self) -> Result<()> {
        if !self.api.webhook_url.starts_with("http://")
            && !self.api.webhook_url.starts_with("https://")
        {
            bail!("Webhook URL must start with 'http://' or 'https://'");
        }
        if !self.api.status_url.contains("{job_id}") {
            bail!("Status URL must contain a {{job_id}} placeholder");
        }
        if self.api.timeout_seconds == 0 {
            bail!("Timeout must be at least 1 second");
        }
        if self.polling.interval_ms == 0 {
            bail!("Interval must be at least 1 millisecond");
        }
        if self.polling.max_attempts == 0 {
            bail!("Max attempts must be at least 1");
        }
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.polling.interval_ms, 5000);
        assert_eq!(config.polling.max_attempts, 60);
        assert_eq!(config.api.timeout_seconds, 10);
        assert!(config.api.status_url.contains("{job_id}"));
        assert!(config.api.report_url.contains("{job_id}"));
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
settings_path = "/tmp/dw/settings.toml"

[api]
webhook_url = "https://hooks.example.com/analyze"
timeout_seconds = 3

[polling]
interval_ms = 250
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(
            config.general.settings_path,
            PathBuf::from("/tmp/dw/settings.toml")
        );
        assert_eq!(config.api.webhook_url, "https://hooks.example.com/analyze");
        assert_eq!(config.api.timeout(), Duration::from_secs(3));
        assert_eq!(config.polling.interval(), Duration::from_millis(250));
        // Unset fields keep their defaults
        assert_eq!(config.polling.max_attempts, 60);
        assert_eq!(config.api.status_url, default_status_url());
    }

    #[test]
    fn test_validate_rejects_zero_values_from_file() {
        assert!(Config::default().validate().is_ok());

        for content in [
            "[api]\ntimeout_seconds = 0\n",
            "[polling]\ninterval_ms = 0\n",
            "[polling]\nmax_attempts = 0\n",
            "[api]\nstatus_url = \"https://x.example/status\"\n",
            "[api]\nwebhook_url = \"ftp://x.example/hook\"\n",
        ] {
            let config: Config = toml::from_str(content).unwrap();
            assert!(config.validate().is_err(), "accepted: {}", content);
        }
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[polling]\nmax_attempts = 5\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.polling.max_attempts, 5);

        std::fs::write(&path, "[polling\n").unwrap();
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[api]"));
        assert!(toml_str.contains("[polling]"));
    }
}
