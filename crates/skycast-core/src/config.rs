use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

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

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    pub config_dir: PathBuf,

    /// Forecast provider settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Location search settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Local persistence settings
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Temperature unit preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    /// Let the provider pick (Celsius for Open-Meteo)
    #[default]
    Auto,
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    /// Value for the provider's `temperature_unit` parameter, if one should be sent.
    pub fn query_value(self) -> Option<&'static str> {
        match self {
            TemperatureUnit::Auto => None,
            TemperatureUnit::Celsius => Some("celsius"),
            TemperatureUnit::Fahrenheit => Some("fahrenheit"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Forecast endpoint
    #[serde(default = "default_forecast_url")]
    pub forecast_url: String,

    /// Temperature unit preference
    #[serde(default)]
    pub temperature_unit: TemperatureUnit,

    /// Forecast horizon in days
    #[serde(default = "default_forecast_days")]
    pub forecast_days: u8,

    /// Cached snapshots younger than this are served without a network call
    #[serde(default = "default_freshness_minutes")]
    pub freshness_minutes: u32,

    /// HTTP timeout for provider requests
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_forecast_url() -> String {
    "https://api.open-meteo.com/v1/forecast".to_string()
}

fn default_forecast_days() -> u8 {
    7
}

fn default_freshness_minutes() -> u32 {
    30
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            forecast_url: default_forecast_url(),
            temperature_unit: TemperatureUnit::Auto,
            forecast_days: default_forecast_days(),
            freshness_minutes: default_freshness_minutes(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Geocoding endpoint
    #[serde(default = "default_geocoding_url")]
    pub geocoding_url: String,

    /// Quiet period after the last keystroke before a search runs
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Shorter (trimmed) queries never reach the provider
    #[serde(default = "default_min_query_len")]
    pub min_query_len: usize,

    /// Maximum number of candidates requested from the provider
    #[serde(default = "default_result_limit")]
    pub result_limit: u8,

    /// Language for place names
    #[serde(default = "default_language")]
    pub language: String,

    /// HTTP timeout for geocoding requests
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_geocoding_url() -> String {
    "https://geocoding-api.open-meteo.com/v1/search".to_string()
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_min_query_len() -> usize {
    2
}

fn default_result_limit() -> u8 {
    8
}

fn default_language() -> String {
    "en".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            geocoding_url: default_geocoding_url(),
            debounce_ms: default_debounce_ms(),
            min_query_len: default_min_query_len(),
            result_limit: default_result_limit(),
            language: default_language(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite file holding saved locations and cached snapshots,
    /// relative to `config_dir` unless absolute
    #[serde(default = "default_database_file")]
    pub database_file: String,
}

fn default_database_file() -> String {
    "skycast.db".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_file: default_database_file(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("skycast");

        Self {
            config_dir,
            weather: WeatherConfig::default(),
            search: SearchConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, writing defaults there if missing
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(config_path)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    ///
    /// Returns a ValidationResult containing any errors or warnings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.weather.forecast_url, "weather.forecast_url", &mut result);
        self.validate_url(&self.search.geocoding_url, "search.geocoding_url", &mut result);

        if self.weather.forecast_days == 0 || self.weather.forecast_days > 16 {
            result.add_error(
                "weather.forecast_days",
                "Forecast horizon must be between 1 and 16 days",
            );
        } else if self.weather.forecast_days < 7 {
            result.add_warning(
                "weather.forecast_days",
                "Daily view expects 7 days of forecast",
            );
        }

        if self.weather.freshness_minutes == 0 {
            result.add_warning(
                "weather.freshness_minutes",
                "Cache freshness disabled (0 minutes); every view refetches",
            );
        } else if self.weather.freshness_minutes > 1440 {
            result.add_warning(
                "weather.freshness_minutes",
                "Cached weather is served for more than 24 hours",
            );
        }

        if self.weather.request_timeout_secs == 0 {
            result.add_error("weather.request_timeout_secs", "Timeout must be greater than 0");
        }

        if self.search.request_timeout_secs == 0 {
            result.add_error("search.request_timeout_secs", "Timeout must be greater than 0");
        }

        if self.search.result_limit == 0 {
            result.add_error("search.result_limit", "Result limit must be greater than 0");
        }

        if self.search.debounce_ms > 5000 {
            result.add_warning(
                "search.debounce_ms",
                "Search debounce is unusually long (>5s)",
            );
        }

        if self.search.language.trim().is_empty() {
            result.add_error("search.language", "Language must not be empty");
        }

        if self.storage.database_file.trim().is_empty() {
            result.add_error("storage.database_file", "Database file must not be empty");
        }

        result
    }

    /// Validate a URL field
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

                if url.port() == Some(0) {
                    result.add_error(field_name, "Port cannot be 0");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Resolved location of the SQLite database
    pub fn database_path(&self) -> PathBuf {
        let file = PathBuf::from(&self.storage.database_file);
        if file.is_absolute() {
            file
        } else {
            self.config_dir.join(file)
        }
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(config_path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ConfigError::NotFound("platform config directory".to_string()))?
            .join("skycast");

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_valid_default_config() {
        let config = Config::default();
        let result = config.validate();
        assert!(result.is_valid(), "Default config should be valid: {:?}", result.errors);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_invalid_url() {
        let mut config = Config::default();
        config.weather.forecast_url = "not-a-url".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "weather.forecast_url"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = Config::default();
        config.search.geocoding_url = "ftp://localhost:8080/search".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_forecast_days_out_of_range() {
        let mut config = Config::default();
        config.weather.forecast_days = 0;
        assert!(!config.validate().is_valid());

        config.weather.forecast_days = 17;
        assert!(!config.validate().is_valid());

        config.weather.forecast_days = 3;
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "weather.forecast_days"));
    }

    #[test]
    fn test_zero_freshness_is_warning() {
        let mut config = Config::default();
        config.weather.freshness_minutes = 0;
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "weather.freshness_minutes"));
    }

    #[test]
    fn test_zero_result_limit_is_error() {
        let mut config = Config::default();
        config.search.result_limit = 0;
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "search.result_limit"));
    }

    #[test]
    fn test_zero_search_timeout_is_error() {
        let mut config = Config::default();
        config.search.request_timeout_secs = 0;
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "search.request_timeout_secs"));
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

    #[test]
    fn test_load_from_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.weather.freshness_minutes, 30);
        assert_eq!(config.search.debounce_ms, 500);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "config_dir = \"/tmp/skycast\"\n\n[weather]\ntemperature_unit = \"fahrenheit\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.weather.temperature_unit, TemperatureUnit::Fahrenheit);
        assert_eq!(config.weather.forecast_days, 7);
        assert_eq!(config.search.result_limit, 8);
        assert_eq!(config.search.request_timeout_secs, 10);
        assert_eq!(config.database_path(), PathBuf::from("/tmp/skycast/skycast.db"));
    }

    #[test]
    fn test_unparseable_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[weather\nforecast_days = ").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_save_to_then_load_from() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.search.debounce_ms = 250;
        config.weather.temperature_unit = TemperatureUnit::Celsius;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.search.debounce_ms, 250);
        assert_eq!(loaded.weather.temperature_unit, TemperatureUnit::Celsius);
    }

    #[test]
    fn test_temperature_unit_query_value() {
        assert_eq!(TemperatureUnit::Auto.query_value(), None);
        assert_eq!(TemperatureUnit::Fahrenheit.query_value(), Some("fahrenheit"));
    }
}
