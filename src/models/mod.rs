//! Data models for the GeoWeather application
//!
//! This module contains the domain models organized by concern:
//! - Location: Coordinates and the resolved place name
//! - Weather: Current weather reading

pub mod location;
pub mod weather;

// Re-export all public types for convenient access
pub use location::{Coordinates, PlaceName};
pub use weather::WeatherReading;
