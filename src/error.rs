//! Error types and handling for `GeoWeather`

use thiserror::Error;

/// Main error type for the `GeoWeather` application
#[derive(Error, Debug)]
pub enum GeoWeatherError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A third-party service (geocoder, weather API) could not be used
    #[error("Upstream error: {message}")]
    Upstream { message: String },
}

impl GeoWeatherError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new upstream error
    pub fn upstream<S: Into<String>>(message: S) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }
}

/// Which remote lookup failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupService {
    LocationName,
    Weather,
}

impl std::fmt::Display for LookupService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupService::LocationName => write!(f, "location name"),
            LookupService::Weather => write!(f, "weather"),
        }
    }
}

/// A remote resolver call did not produce a usable answer.
///
/// Covers transport failures, non-success statuses, malformed bodies and
/// error payloads reported by the service. Single attempt, never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{service} lookup failed: {reason}")]
pub struct LookupFailed {
    pub service: LookupService,
    pub reason: String,
}

impl LookupFailed {
    pub fn new<S: Into<String>>(service: LookupService, reason: S) -> Self {
        Self {
            service,
            reason: reason.into(),
        }
    }
}
