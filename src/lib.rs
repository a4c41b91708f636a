//! `GeoWeather` - current weather for wherever you are
//!
//! This library provides device geolocation, reverse geocoding and weather
//! lookups, the orchestration that ties them together for a UI, and the
//! HTTP proxy endpoints the lookups are served from.

pub mod api;
pub mod config;
pub mod error;
pub mod geolocation;
pub mod models;
pub mod orchestrator;
pub mod render;
pub mod resolvers;
pub mod telemetry;
pub mod web;

// Re-export core types for public API
pub use config::GeoWeatherConfig;
pub use error::{GeoWeatherError, LookupFailed, LookupService};
pub use geolocation::{GeolocationProvider, LocateError, LocationSource};
pub use models::{Coordinates, PlaceName, WeatherReading};
pub use orchestrator::{CycleOutcome, ErrorKind, FetchState, LookupMode, WeatherDataOrchestrator};
pub use resolvers::{LocationNameResolver, ProxyClient, WeatherResolver};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, GeoWeatherError>;
