//! Configuration management for `GeoWeather`
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::GeoWeatherError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure for the `GeoWeather` application
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeoWeatherConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Reverse geocoding upstream
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    /// Weather upstream
    #[serde(default)]
    pub weather: WeatherConfig,
    /// Client-side settings used by `lookup`
    #[serde(default)]
    pub client: ClientConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// Directory served for every non-API path
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

/// Reverse geocoding (Nominatim) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    #[serde(default = "default_geocoding_base_url")]
    pub base_url: String,
    /// Nominatim rejects requests without an identifying User-Agent
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_upstream_timeout")]
    pub timeout_seconds: u32,
}

/// Weather upstream settings. Base URL and token are trusted server-side
/// configuration and never reach the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    #[serde(default = "default_upstream_timeout")]
    pub timeout_seconds: u32,
}

/// Settings for the client that talks to the proxy endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_client_server_url")]
    pub server_url: String,
    #[serde(default = "default_client_timeout")]
    pub timeout_seconds: u32,
    /// Run the place-name and weather lookups at the same time
    #[serde(default)]
    pub concurrent_lookups: bool,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    3000
}

fn default_static_dir() -> String {
    "frontend/dist".to_string()
}

fn default_geocoding_base_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_user_agent() -> String {
    format!("GeoWeather/{}", env!("CARGO_PKG_VERSION"))
}

fn default_upstream_timeout() -> u32 {
    10
}

fn default_client_server_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_client_timeout() -> u32 {
    15
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            static_dir: default_static_dir(),
        }
    }
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            base_url: default_geocoding_base_url(),
            user_agent: default_user_agent(),
            timeout_seconds: default_upstream_timeout(),
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            timeout_seconds: default_upstream_timeout(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_client_server_url(),
            timeout_seconds: default_client_timeout(),
            concurrent_lookups: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl GeoWeatherConfig {
    /// Load configuration from `config_path` (or the default location) and
    /// environment variables
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // Add environment variable overrides with GEOWEATHER_ prefix
        builder = builder.add_source(
            Environment::with_prefix("GEOWEATHER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: GeoWeatherConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_env_aliases(|name| std::env::var(name).ok());
        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("geoweather").join("config.toml"))
    }

    /// Fill the weather upstream from `WEATHER_API_URL` / `WEATHER_API_AUTH`
    /// when neither the file nor `GEOWEATHER_WEATHER__*` set it.
    pub fn apply_env_aliases(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.weather.base_url.is_none() {
            self.weather.base_url = lookup("WEATHER_API_URL");
        }
        if self.weather.api_key.is_none() {
            self.weather.api_key = lookup("WEATHER_API_AUTH");
        }
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.server.host.is_empty() {
            self.server.host = default_server_host();
        }
        if self.server.static_dir.is_empty() {
            self.server.static_dir = default_static_dir();
        }
        if self.geocoding.base_url.is_empty() {
            self.geocoding.base_url = default_geocoding_base_url();
        }
        if self.geocoding.user_agent.is_empty() {
            self.geocoding.user_agent = default_user_agent();
        }
        if self.geocoding.timeout_seconds == 0 {
            self.geocoding.timeout_seconds = default_upstream_timeout();
        }
        if self.weather.timeout_seconds == 0 {
            self.weather.timeout_seconds = default_upstream_timeout();
        }
        if self.client.server_url.is_empty() {
            self.client.server_url = default_client_server_url();
        }
        if self.client.timeout_seconds == 0 {
            self.client.timeout_seconds = default_client_timeout();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate what `serve` needs on top of [`Self::validate`]
    pub fn validate_for_server(&self) -> Result<()> {
        self.validate()?;

        if self.weather.base_url.as_deref().is_none_or(str::is_empty) {
            return Err(GeoWeatherError::config(
                "Weather upstream URL is not configured. Set weather.base_url or WEATHER_API_URL.",
            )
            .into());
        }

        if self.weather.api_key.as_deref().is_none_or(str::is_empty) {
            return Err(GeoWeatherError::config(
                "Weather upstream token is not configured. Set weather.api_key or WEATHER_API_AUTH.",
            )
            .into());
        }

        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.geocoding.timeout_seconds > 300 || self.weather.timeout_seconds > 300 {
            return Err(
                GeoWeatherError::config("Upstream timeout cannot exceed 300 seconds").into(),
            );
        }

        if self.client.timeout_seconds > 300 {
            return Err(GeoWeatherError::config("Client timeout cannot exceed 300 seconds").into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(GeoWeatherError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(GeoWeatherError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        let urls = [
            ("Geocoding base URL", Some(self.geocoding.base_url.as_str())),
            ("Weather base URL", self.weather.base_url.as_deref()),
            ("Client server URL", Some(self.client.server_url.as_str())),
        ];
        for (name, url) in urls {
            if let Some(url) = url {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(GeoWeatherError::config(format!(
                        "{name} must be a valid HTTP or HTTPS URL"
                    ))
                    .into());
                }
            }
        }

        Ok(())
    }
}
