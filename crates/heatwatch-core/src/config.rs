use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;

/// Environment variable holding the weather provider API key.
pub const API_KEY_ENV: &str = "API_KEY";
/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "HEATWATCH_CONFIG";
/// Environment variable holding the Gmail access token for alert mail.
pub const GMAIL_TOKEN_ENV: &str = "HEATWATCH_GMAIL_TOKEN";

const SECONDS_PER_DAY: u64 = 86_400;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Join all errors into a single line
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Location names passed verbatim to the weather provider
    pub locations: Vec<String>,

    /// Alert threshold in °C; readings strictly above it count as a breach
    pub temperature_threshold: f64,

    /// Consecutive breaches required to fire one alert
    pub alert_trigger_count: u32,

    /// Poll interval shared by the aggregation and alert ticks
    pub poll_interval_secs: u64,

    /// Readings per day-key before a rollup is finalized.
    /// Derived from the poll interval when unset.
    #[serde(default)]
    pub samples_per_day: Option<u32>,

    /// Days an unfinished bucket is kept behind the newest day seen
    #[serde(default = "default_retain_days")]
    pub retain_days: u32,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub notify: NotifyConfig,
}

fn default_retain_days() -> u32 {
    2
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// OpenWeatherMap API root
    #[serde(default = "default_provider_base_url")]
    pub base_url: String,

    /// API key; the `API_KEY` environment variable takes precedence
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_retry_delay_ms")]
    pub initial_retry_delay_ms: u64,

    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,
}

fn default_provider_base_url() -> String {
    "http://api.openweathermap.org".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    2
}

fn default_initial_retry_delay_ms() -> u64 {
    200
}

fn default_max_retry_delay_ms() -> u64 {
    2000
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_provider_base_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            initial_retry_delay_ms: default_initial_retry_delay_ms(),
            max_retry_delay_ms: default_max_retry_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database file for daily rollups
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("heatwatch")
        .join("weather_data.db")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// Alert delivery channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotifierKind {
    /// Write alerts to the log only
    #[default]
    Log,
    /// Send alert mail through the Gmail API
    Gmail,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default)]
    pub kind: NotifierKind,

    /// Sender address for alert mail
    #[serde(default)]
    pub from: Option<String>,

    /// Recipient address for alert mail
    #[serde(default)]
    pub to: Option<String>,

    /// Gmail OAuth access token; `HEATWATCH_GMAIL_TOKEN` takes precedence
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locations: ["Delhi", "Mumbai", "Chennai", "Bangalore", "Kolkata", "Hyderabad"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            temperature_threshold: 35.0,
            alert_trigger_count: 2,
            poll_interval_secs: 30,
            samples_per_day: None,
            retain_days: default_retain_days(),
            provider: ProviderConfig::default(),
            store: StoreConfig::default(),
            notify: NotifyConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from `$HEATWATCH_CONFIG` or the default path.
    ///
    /// A missing file yields the defaults. Environment overrides are applied
    /// on top either way.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = match std::env::var(CONFIG_PATH_ENV) {
            Ok(p) if !p.is_empty() => PathBuf::from(p),
            _ => Self::default_config_path()?,
        };

        let mut config = if config_path.exists() {
            Self::load_from(&config_path)?
        } else {
            tracing::warn!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            Self::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a configuration file without applying environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::NotFound(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Overlay secrets from the environment. `lookup` is `std::env::var` in
    /// production and a map in tests.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.is_empty()) {
            self.provider.api_key = Some(key);
        }
        if let Some(token) = lookup(GMAIL_TOKEN_ENV).filter(|t| !t.is_empty()) {
            self.notify.token = Some(token);
        }
    }

    /// Load configuration and validate it
    ///
    /// Warnings are logged; any error is returned as `ConfigError::Invalid`.
    pub fn load_validated() -> Result<(Self, ValidationResult), ConfigError> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()));
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Readings per day-key needed to finalize a rollup.
    ///
    /// Uses the explicit setting when present, otherwise the number of polls
    /// that fit in one day, never less than one.
    pub fn samples_per_day(&self) -> u32 {
        if let Some(n) = self.samples_per_day {
            return n.max(1);
        }
        if self.poll_interval_secs == 0 {
            return 1;
        }
        let per_day = SECONDS_PER_DAY.div_ceil(self.poll_interval_secs);
        u32::try_from(per_day).unwrap_or(u32::MAX).max(1)
    }

    /// The provider API key, or the fatal startup error when it is absent.
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.provider
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                ConfigError::MissingSetting(format!(
                    "provider.api_key (or {} environment variable)",
                    API_KEY_ENV
                ))
            })
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.locations.is_empty() {
            result.add_error("locations", "At least one location is required");
        }
        let mut seen = std::collections::HashSet::new();
        for location in &self.locations {
            if location.trim().is_empty() {
                result.add_error("locations", "Location names must not be blank");
            } else if !seen.insert(location.as_str()) {
                result.add_error("locations", format!("Duplicate location: {}", location));
            }
        }

        if !self.temperature_threshold.is_finite() {
            result.add_error("temperature_threshold", "Threshold must be a finite number");
        }

        if self.alert_trigger_count == 0 {
            result.add_error("alert_trigger_count", "Trigger count must be at least 1");
        }

        if self.poll_interval_secs == 0 {
            result.add_error("poll_interval_secs", "Poll interval must be greater than 0");
        } else if self.poll_interval_secs > SECONDS_PER_DAY {
            result.add_warning(
                "poll_interval_secs",
                "Poll interval is more than 24 hours",
            );
        }

        match self.samples_per_day {
            Some(0) => {
                result.add_error("samples_per_day", "Samples per day must be at least 1");
            }
            Some(n) if self.poll_interval_secs > 0 => {
                let fit = SECONDS_PER_DAY.div_ceil(self.poll_interval_secs);
                if u64::from(n) > fit {
                    result.add_warning(
                        "samples_per_day",
                        format!(
                            "Only {} polls fit in a day at this interval; rollups may never finalize",
                            fit
                        ),
                    );
                }
            }
            _ => {}
        }

        self.validate_url(&self.provider.base_url, "provider.base_url", &mut result);

        if self.provider.timeout_secs == 0 {
            result.add_error("provider.timeout_secs", "Timeout must be greater than 0");
        }

        if self.api_key().is_err() {
            result.add_error(
                "provider.api_key",
                format!("API key not set (set {} in the environment)", API_KEY_ENV),
            );
        }

        if self.notify.kind == NotifierKind::Gmail {
            if self.notify.from.as_deref().map_or(true, str::is_empty) {
                result.add_error("notify.from", "Sender address required for gmail notifier");
            }
            if self.notify.to.as_deref().map_or(true, str::is_empty) {
                result.add_error("notify.to", "Recipient address required for gmail notifier");
            }
            if self.notify.token.as_deref().map_or(true, str::is_empty) {
                result.add_error(
                    "notify.token",
                    format!("Gmail token not set (set {})", GMAIL_TOKEN_ENV),
                );
            }
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }
                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ConfigError::NotFound("platform config directory".to_string()))?
            .join("heatwatch");

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use std::collections::HashMap;

    fn configured() -> Config {
        let mut config = Config::default();
        config.provider.api_key = Some("test-key".to_string());
        config
    }

    #[test]
    fn test_default_config_needs_api_key() {
        let result = Config::default().validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "provider.api_key"));
    }

    #[test]
    fn test_configured_default_is_valid() {
        let result = configured().validate();
        assert!(result.is_valid(), "Config should be valid: {:?}", result.errors);
    }

    #[test]
    fn test_env_overrides_api_key() {
        let mut config = Config::default();
        let env: HashMap<&str, &str> = [(API_KEY_ENV, "from-env")].into_iter().collect();
        config.apply_env_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.api_key().unwrap(), "from-env");
    }

    #[test]
    fn test_empty_env_does_not_clear_file_key() {
        let mut config = configured();
        config.apply_env_overrides(|_| Some(String::new()));
        assert_eq!(config.api_key().unwrap(), "test-key");
    }

    #[test]
    fn test_missing_api_key_is_missing_setting() {
        let config = Config::default();
        assert!(matches!(config.api_key(), Err(ConfigError::MissingSetting(_))));
    }

    #[test]
    fn test_zero_trigger_count() {
        let mut config = configured();
        config.alert_trigger_count = 0;
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "alert_trigger_count"));
    }

    #[test]
    fn test_zero_poll_interval() {
        let mut config = configured();
        config.poll_interval_secs = 0;
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "poll_interval_secs"));
    }

    #[test]
    fn test_nan_threshold() {
        let mut config = configured();
        config.temperature_threshold = f64::NAN;
        assert!(!config.validate().is_valid());
    }

    #[test]
    fn test_duplicate_and_blank_locations() {
        let mut config = configured();
        config.locations = vec!["Delhi".into(), "Delhi".into(), " ".into()];
        let result = config.validate();
        assert_eq!(
            result.errors.iter().filter(|e| e.field == "locations").count(),
            2
        );
    }

    #[test]
    fn test_invalid_base_url_scheme() {
        let mut config = configured();
        config.provider.base_url = "ftp://api.example.com".to_string();
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_gmail_notifier_requires_addresses() {
        let mut config = configured();
        config.notify.kind = NotifierKind::Gmail;
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "notify.from"));
        assert!(result.errors.iter().any(|e| e.field == "notify.to"));
        assert!(result.errors.iter().any(|e| e.field == "notify.token"));
    }

    #[test]
    fn test_samples_per_day_derived_from_interval() {
        let mut config = configured();
        config.poll_interval_secs = 30;
        assert_eq!(config.samples_per_day(), 2880);
        config.poll_interval_secs = 7 * 3600;
        assert_eq!(config.samples_per_day(), 4);
        config.poll_interval_secs = 2 * SECONDS_PER_DAY;
        assert_eq!(config.samples_per_day(), 1);
    }

    #[test]
    fn test_samples_per_day_explicit() {
        let mut config = configured();
        config.samples_per_day = Some(4);
        assert_eq!(config.samples_per_day(), 4);
        assert!(config.validate().is_valid());
    }

    #[test]
    fn test_samples_per_day_unreachable_is_warning() {
        let mut config = configured();
        config.poll_interval_secs = 3600;
        config.samples_per_day = Some(48);
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "samples_per_day"));
    }

    #[test]
    fn test_from_toml_minimal() {
        let config = Config::from_toml(
            r#"
            locations = ["Delhi", "Chennai"]
            temperature_threshold = 35.0
            alert_trigger_count = 2
            poll_interval_secs = 60

            [provider]
            api_key = "abc"
            "#,
        )
        .unwrap();

        assert_eq!(config.locations, vec!["Delhi", "Chennai"]);
        assert_eq!(config.poll_interval(), Duration::from_secs(60));
        assert_eq!(config.retain_days, 2);
        assert_eq!(config.notify.kind, NotifierKind::Log);
        assert_eq!(config.provider.base_url, "http://api.openweathermap.org");
        assert!(config.validate().is_valid());
    }

    #[test]
    fn test_from_toml_missing_required_field() {
        let err = Config::from_toml("locations = [\"Delhi\"]").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            locations = ["Kolkata"]
            temperature_threshold = 30.5
            alert_trigger_count = 3
            poll_interval_secs = 120

            [notify]
            kind = "gmail"
            from = "alerts@example.com"
            to = "ops@example.com"
            "#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.alert_trigger_count, 3);
        assert_eq!(config.notify.kind, NotifierKind::Gmail);
        assert_eq!(config.notify.to.as_deref(), Some("ops@example.com"));
    }

    #[test]
    fn test_load_from_missing_file() {
        let err = Config::load_from(Path::new("/nonexistent/heatwatch.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }
}
