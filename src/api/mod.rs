//! Proxy endpoints
//!
//! `GET /reverse-geocode` and `GET /weather` validate the coordinate query,
//! forward to the configured upstream and reduce every upstream failure to a
//! generic message. Upstream details are only logged.

use std::sync::Arc;

use anyhow::Result;
use axum::{
    Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use thiserror::Error;
use tracing::{debug, error};

use crate::config::GeoWeatherConfig;
use crate::models::{PlaceName, WeatherReading};

pub mod nominatim;
pub mod weather_upstream;

pub use nominatim::NominatimClient;
pub use weather_upstream::WeatherUpstreamClient;

pub const LOCATION_NAME_UNAVAILABLE: &str = "Unable to determine your location name";
pub const WEATHER_UNAVAILABLE: &str = "Unable to fetch weather data";

/// Request failures as seen by the caller
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Missing latitude or longitude parameters")]
    MissingCoordinates,

    #[error("Invalid latitude or longitude values")]
    InvalidCoordinates,

    #[error("{0}")]
    Upstream(&'static str),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingCoordinates | ApiError::InvalidCoordinates => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}

/// Query string as decoded key/value pairs, repeats included
type QueryPairs = std::result::Result<Query<Vec<(String, String)>>, QueryRejection>;

/// Raw `latitude` / `longitude` query parameters
#[derive(Debug, Default)]
pub struct CoordinateQuery {
    pub latitude: Option<String>,
    pub longitude: Option<String>,
}

impl CoordinateQuery {
    /// First occurrence of each parameter wins
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "latitude" => &mut query.latitude,
                "longitude" => &mut query.longitude,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        query
    }

    fn extract(pairs: QueryPairs) -> std::result::Result<(f64, f64), ApiError> {
        let Query(pairs) = pairs.map_err(|e| {
            debug!("Unreadable query string: {}", e);
            ApiError::MissingCoordinates
        })?;
        Self::from_pairs(pairs).parse()
    }

    /// Absent or empty → `MissingCoordinates`; not a finite float → `InvalidCoordinates`
    pub fn parse(&self) -> std::result::Result<(f64, f64), ApiError> {
        let present = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());
        let (Some(latitude), Some(longitude)) = (present(&self.latitude), present(&self.longitude))
        else {
            return Err(ApiError::MissingCoordinates);
        };

        let number = |value: &str| {
            value
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|parsed| parsed.is_finite())
        };
        match (number(&latitude), number(&longitude)) {
            (Some(latitude), Some(longitude)) => Ok((latitude, longitude)),
            _ => Err(ApiError::InvalidCoordinates),
        }
    }
}

/// Shared upstream clients
#[derive(Clone)]
pub struct ApiState {
    geocoder: Arc<NominatimClient>,
    weather: Arc<WeatherUpstreamClient>,
}

impl ApiState {
    pub fn new(geocoder: NominatimClient, weather: WeatherUpstreamClient) -> Self {
        Self {
            geocoder: Arc::new(geocoder),
            weather: Arc::new(weather),
        }
    }

    pub fn from_config(config: &GeoWeatherConfig) -> Result<Self> {
        Ok(Self::new(
            NominatimClient::from_config(&config.geocoding)?,
            WeatherUpstreamClient::from_config(&config.weather)?,
        ))
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/reverse-geocode", get(reverse_geocode))
        .route("/weather", get(current_weather))
        .with_state(state)
}

async fn reverse_geocode(
    State(state): State<ApiState>,
    query: QueryPairs,
) -> std::result::Result<Json<PlaceName>, ApiError> {
    let (latitude, longitude) = CoordinateQuery::extract(query)?;

    let place = state
        .geocoder
        .reverse(latitude, longitude)
        .await
        .map_err(|e| {
            error!("Reverse geocoding error: {}", e);
            ApiError::Upstream(LOCATION_NAME_UNAVAILABLE)
        })?;

    Ok(Json(place))
}

async fn current_weather(
    State(state): State<ApiState>,
    query: QueryPairs,
) -> std::result::Result<Json<WeatherReading>, ApiError> {
    let (latitude, longitude) = CoordinateQuery::extract(query)?;

    let reading = state
        .weather
        .current(latitude, longitude)
        .await
        .map_err(|e| {
            error!("Weather API error: {}", e);
            ApiError::Upstream(WEATHER_UNAVAILABLE)
        })?;

    Ok(Json(reading))
}
