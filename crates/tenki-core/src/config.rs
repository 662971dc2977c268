use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::{AppError, ConfigError};

/// Placeholder substituted with the area code in [`FeedConfig::forecast_url`].
pub const AREA_CODE_PLACEHOLDER: &str = "{code}";

const DEFAULT_AREA_URL: &str = "https://www.jma.go.jp/bosai/common/const/area.json";
const DEFAULT_FORECAST_URL: &str =
    "https://www.jma.go.jp/bosai/forecast/data/forecast/{code}.json";

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
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the snapshot database
    pub data_dir: PathBuf,

    /// Upstream forecast feed
    #[serde(default)]
    pub feed: FeedConfig,

    /// Local snapshot storage
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// URL of the area catalog document
    #[serde(default = "default_area_url")]
    pub area_url: String,

    /// URL template of the per-area forecast document; `{code}` is replaced
    /// by the area code
    #[serde(default = "default_forecast_url")]
    pub forecast_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent header sent to the feed
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_area_url() -> String {
    DEFAULT_AREA_URL.to_string()
}

fn default_forecast_url() -> String {
    DEFAULT_FORECAST_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("tenki/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            area_url: default_area_url(),
            forecast_url: default_forecast_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl FeedConfig {
    /// Forecast document URL for one area.
    pub fn forecast_url_for(&self, area_code: &str) -> String {
        self.forecast_url.replace(AREA_CODE_PLACEHOLDER, area_code)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database file name, relative to `data_dir` unless absolute
    #[serde(default = "default_database_file")]
    pub database_file: PathBuf,

    /// How long a connection waits on a locked database, in milliseconds
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_database_file() -> PathBuf {
    PathBuf::from("weather.db")
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_file: default_database_file(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tenki");

        Self {
            data_dir,
            feed: FeedConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if it doesn't exist
    pub fn load() -> Result<Self, AppError> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path, creating a default file if missing
    pub fn load_from(config_path: &Path) -> Result<Self, AppError> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(config_path)?;

        let config: Config = toml::from_str(&contents).map_err(|e| {
            ConfigError::ParseError(format!("{}: {}", config_path.display(), e))
        })?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Warnings are logged; validation errors fail the load.
    pub fn load_validated(
        config_path: Option<&Path>,
    ) -> Result<(Self, ValidationResult), AppError> {
        let config = match config_path {
            Some(path) => Self::load_from(path)?,
            None => Self::load()?,
        };
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
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.feed.area_url, "feed.area_url", &mut result);

        let probe = self.feed.forecast_url_for("000000");
        self.validate_url(&probe, "feed.forecast_url", &mut result);
        if !self.feed.forecast_url.contains(AREA_CODE_PLACEHOLDER) {
            result.add_error(
                "feed.forecast_url",
                format!("URL template must contain {}", AREA_CODE_PLACEHOLDER),
            );
        }

        if self.feed.timeout_secs == 0 {
            result.add_error("feed.timeout_secs", "Timeout must be greater than 0");
        } else if self.feed.timeout_secs > 120 {
            result.add_warning(
                "feed.timeout_secs",
                "Timeout is unusually long (>120 seconds)",
            );
        }

        if self.store.database_file.as_os_str().is_empty() {
            result.add_error("store.database_file", "Database file name is empty");
        }

        if self.data_dir.exists() && !self.data_dir.is_dir() {
            result.add_error(
                "data_dir",
                format!("Path is not a directory: {}", self.data_dir.display()),
            );
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
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Full path of the snapshot database
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.store.database_file)
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, config_path: &Path) -> Result<(), AppError> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))?;

        std::fs::write(config_path, contents)?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ConfigError::NotFound("no platform config directory".to_string()))?
            .join("tenki");

        Ok(config_dir.join("config.toml"))
    }
}
