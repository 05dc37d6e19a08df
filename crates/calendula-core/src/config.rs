use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Environment variable that overrides `weather.api_key`.
pub const API_KEY_ENV: &str = "OWM_API_KEY";

/// Default OpenWeatherMap API host.
pub const DEFAULT_API_BASE_URL: &str = "https://api.openweathermap.org";

const APP_DIR: &str = "calendula";
const CONFIG_FILE: &str = "config.toml";

/// One problem found by [`Config::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Errors block startup; warnings are only logged.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigIssue>,
    pub warnings: Vec<ConfigIssue>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(ConfigIssue {
            field,
            message: message.into(),
        });
    }

    fn warn(&mut self, field: &'static str, message: impl Into<String>) {
        self.warnings.push(ConfigIssue {
            field,
            message: message.into(),
        });
    }

    /// All errors joined with "; ".
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Contents of `config.toml`. Every section may be omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub weather: WeatherConfig,

    #[serde(default)]
    pub calendar: CalendarConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// OpenWeatherMap API key. Absent means offline previews only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base_url: default_api_base_url(),
        }
    }
}

impl WeatherConfig {
    /// The credential to use, if one is really configured.
    ///
    /// `OWM_API_KEY` wins over the file. Blank values and `YOUR_` placeholders
    /// count as absent.
    pub fn effective_api_key(&self) -> Option<String> {
        let from_env = std::env::var(API_KEY_ENV).ok();
        usable_key(from_env.as_deref()).or_else(|| usable_key(self.api_key.as_deref()))
    }
}

fn usable_key(key: Option<&str>) -> Option<String> {
    let key = key?.trim();
    if key.is_empty() || key.starts_with("YOUR_") {
        None
    } else {
        Some(key.to_string())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// First day of the week, 0 = Sunday .. 6 = Saturday
    #[serde(default)]
    pub week_start: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the local key-value database
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl StorageConfig {
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("calendula.db")
    }
}

impl Config {
    /// `<config dir>/calendula/config.toml`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(base.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load the user's config file, writing defaults on first run.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config at {}, writing defaults", path.display());
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Load and validate. Warnings are logged; errors fail the load.
    pub fn load_validated() -> Result<Self, ConfigError> {
        Self::load()?.into_validated()
    }

    pub fn into_validated(self) -> Result<Self, ConfigError> {
        let validation = self.validate();
        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()));
        }
        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }
        Ok(self)
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if let Err(message) = check_http_url(&self.weather.api_base_url) {
            result.error("weather.api_base_url", message);
        }

        if self.weather.effective_api_key().is_none() {
            result.warn(
                "weather.api_key",
                format!("not set; city search is disabled and forecasts are previews (set {})", API_KEY_ENV),
            );
        }

        if self.calendar.week_start > 6 {
            result.error(
                "calendar.week_start",
                format!("expected 0 (Sunday) to 6 (Saturday), got {}", self.calendar.week_start),
            );
        }

        let data_dir = &self.storage.data_dir;
        if data_dir.exists() && !data_dir.is_dir() {
            result.error(
                "storage.data_dir",
                format!("{} exists and is not a directory", data_dir.display()),
            );
        }

        result
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents).map_err(io_err)
    }
}

fn check_http_url(value: &str) -> Result<(), String> {
    let url = Url::parse(value).map_err(|e| format!("invalid URL: {}", e))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("scheme must be http or https, got {}", url.scheme()));
    }
    if url.host().is_none() {
        return Err("URL has no host".to_string());
    }
    Ok(())
}
