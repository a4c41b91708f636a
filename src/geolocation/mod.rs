//! Device geolocation
//!
//! `GeolocationProvider` asks a `LocationSource` for the current position with
//! fixed options and classifies platform failures into `LocateError`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::models::Coordinates;

pub mod sources;

pub use sources::{CachingSource, StaticLocationSource};

/// Platform error code for a denied permission prompt
pub const PERMISSION_DENIED: u16 = 1;
/// Platform error code when no fix could be obtained
pub const POSITION_UNAVAILABLE: u16 = 2;
/// Platform error code when the fix took longer than the timeout
pub const TIMEOUT: u16 = 3;

/// Options passed to the location source on every request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionOptions {
    pub enable_high_accuracy: bool,
    /// Upper bound for obtaining a fix
    pub timeout: Duration,
    /// A previously obtained fix this young may be returned instead of a new reading
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: false,
            timeout: Duration::from_secs(10),
            maximum_age: Duration::from_secs(30),
        }
    }
}

/// A position fix reported by a location source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub coordinates: Coordinates,
    /// When the fix was taken
    pub captured_at: Instant,
}

impl Position {
    #[must_use]
    pub fn now(coordinates: Coordinates) -> Self {
        Self {
            coordinates,
            captured_at: Instant::now(),
        }
    }
}

/// Raw failure from a location source: a platform code plus its message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionError {
    pub code: u16,
    pub message: String,
}

impl PositionError {
    pub fn new<S: Into<String>>(code: u16, message: S) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Capability that yields the device position
#[async_trait]
pub trait LocationSource: Send + Sync {
    async fn current_position(&self, options: &PositionOptions)
    -> Result<Position, PositionError>;
}

/// Classified geolocation failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocateError {
    #[error("Geolocation is not supported on this device")]
    Unsupported,

    #[error("Permission denied. Please enable location access in your settings.")]
    PermissionDenied,

    #[error("Position unavailable. Unable to retrieve your location.")]
    PositionUnavailable,

    #[error("Request timeout. Please try again.")]
    Timeout,

    /// `message` is whatever the source reported, possibly empty
    #[error("An unknown error occurred while retrieving your location.")]
    Unknown { code: u16, message: String },
}

impl LocateError {
    /// Map a platform error code
    #[must_use]
    pub fn from_code(code: u16) -> Self {
        match code {
            PERMISSION_DENIED => LocateError::PermissionDenied,
            POSITION_UNAVAILABLE => LocateError::PositionUnavailable,
            TIMEOUT => LocateError::Timeout,
            code => LocateError::Unknown {
                code,
                message: String::new(),
            },
        }
    }

    /// Platform code for this error; `Unsupported` has none and reports 0
    #[must_use]
    pub fn code(&self) -> u16 {
        match self {
            LocateError::Unsupported => 0,
            LocateError::PermissionDenied => PERMISSION_DENIED,
            LocateError::PositionUnavailable => POSITION_UNAVAILABLE,
            LocateError::Timeout => TIMEOUT,
            LocateError::Unknown { code, .. } => *code,
        }
    }
}

impl From<PositionError> for LocateError {
    fn from(error: PositionError) -> Self {
        match LocateError::from_code(error.code) {
            LocateError::Unknown { code, .. } => LocateError::Unknown {
                code,
                message: error.message,
            },
            known => known,
        }
    }
}

/// Single-shot access to the device location
#[derive(Clone)]
pub struct GeolocationProvider {
    source: Option<Arc<dyn LocationSource>>,
    options: PositionOptions,
}

impl GeolocationProvider {
    /// Provider backed by the given source
    pub fn new<S: LocationSource + 'static>(source: S) -> Self {
        Self {
            source: Some(Arc::new(source)),
            options: PositionOptions::default(),
        }
    }

    /// Provider for an environment without any location capability
    #[must_use]
    pub fn unsupported() -> Self {
        Self {
            source: None,
            options: PositionOptions::default(),
        }
    }

    #[must_use]
    pub fn options(&self) -> &PositionOptions {
        &self.options
    }

    /// Read the current coordinates. One request, no retry.
    #[instrument(name = "locate", skip(self))]
    pub async fn locate(&self) -> Result<Coordinates, LocateError> {
        let Some(source) = &self.source else {
            warn!("No location source available");
            return Err(LocateError::Unsupported);
        };

        match source.current_position(&self.options).await {
            Ok(position) => {
                debug!(
                    "Located at ({:.4}, {:.4})",
                    position.coordinates.latitude, position.coordinates.longitude
                );
                Ok(position.coordinates)
            }
            Err(error) => {
                warn!(code = error.code, "Location source failed: {}", error.message);
                Err(error.into())
            }
        }
    }
}
