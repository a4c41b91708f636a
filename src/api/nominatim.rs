//! Reverse geocoding via Nominatim (OpenStreetMap)

use std::time::{Duration, Instant};

use anyhow::Context;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::GeoWeatherError;
use crate::config::GeocodingConfig;
use crate::models::PlaceName;

const UNKNOWN: &str = "Unknown";

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    address: Option<NominatimAddress>,
}

#[derive(Debug, Default, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    country: Option<String>,
}

impl NominatimAddress {
    /// City, else town, else village; empty values count as missing
    fn into_place_name(self) -> PlaceName {
        let present = |value: Option<String>| value.filter(|v| !v.is_empty());
        let city = present(self.city)
            .or_else(|| present(self.town))
            .or_else(|| present(self.village))
            .unwrap_or_else(|| UNKNOWN.to_string());
        let country = present(self.country).unwrap_or_else(|| UNKNOWN.to_string());
        PlaceName { city, country }
    }
}

/// Client for the Nominatim `/reverse` endpoint
#[derive(Debug, Clone)]
pub struct NominatimClient {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimClient {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .with_context(|| "Failed to create geocoding HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &GeocodingConfig) -> anyhow::Result<Self> {
        Self::new(
            &config.base_url,
            &config.user_agent,
            Duration::from_secs(config.timeout_seconds.into()),
        )
    }

    /// Look up the city and country for a coordinate pair
    #[instrument(skip(self))]
    pub async fn reverse(&self, latitude: f64, longitude: f64) -> crate::Result<PlaceName> {
        let start_time = Instant::now();
        let url = format!(
            "{}/reverse?format=json&lat={}&lon={}",
            self.base_url, latitude, longitude
        );
        debug!("Nominatim request URL: {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            GeoWeatherError::upstream(format!("Nominatim request failed: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeoWeatherError::upstream(format!(
                "Nominatim responded with status {status}"
            )));
        }

        let body: NominatimResponse = response.json().await.map_err(|e| {
            GeoWeatherError::upstream(format!("Failed to parse Nominatim response: {e}"))
        })?;

        let place = body.address.unwrap_or_default().into_place_name();
        debug!(
            "Reverse geocoded to {} in {:.3}s",
            place,
            start_time.elapsed().as_secs_f64()
        );
        Ok(place)
    }
}
