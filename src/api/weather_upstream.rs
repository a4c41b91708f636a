//! Current conditions from the configured weather service

use std::time::{Duration, Instant};

use anyhow::Context;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::GeoWeatherError;
use crate::config::WeatherConfig;
use crate::models::WeatherReading;

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    temperature: f64,
    humidity: f64,
}

/// Client for `{base_url}/current/{lat}/{lon}?code={api_key}`
#[derive(Clone)]
pub struct WeatherUpstreamClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for WeatherUpstreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherUpstreamClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl WeatherUpstreamClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .with_context(|| "Failed to create weather HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn from_config(config: &WeatherConfig) -> anyhow::Result<Self> {
        let base_url = config.base_url.as_deref().ok_or_else(|| {
            GeoWeatherError::config("Weather upstream URL is not configured")
        })?;
        let api_key = config.api_key.as_deref().ok_or_else(|| {
            GeoWeatherError::config("Weather upstream token is not configured")
        })?;

        Self::new(
            base_url,
            api_key,
            Duration::from_secs(config.timeout_seconds.into()),
        )
    }

    /// Current temperature and humidity for a coordinate pair
    #[instrument(skip(self))]
    pub async fn current(&self, latitude: f64, longitude: f64) -> crate::Result<WeatherReading> {
        let start_time = Instant::now();
        let url = format!(
            "{}/current/{}/{}?code={}",
            self.base_url,
            latitude,
            longitude,
            urlencoding::encode(&self.api_key)
        );

        let response = self.client.get(&url).send().await.map_err(|e| {
            // reqwest includes the URL, which carries the token
            GeoWeatherError::upstream(format!(
                "Weather request failed: {}",
                e.without_url()
            ))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeoWeatherError::upstream(format!(
                "Weather API responded with status {status}"
            )));
        }

        let body: CurrentResponse = response.json().await.map_err(|e| {
            GeoWeatherError::upstream(format!(
                "Failed to parse weather response: {}",
                e.without_url()
            ))
        })?;

        let elapsed = start_time.elapsed();
        if elapsed.as_secs() > 5 {
            warn!("Slow weather API response: {:.3}s", elapsed.as_secs_f64());
        }
        debug!(
            "Weather: {:.1}°C, {:.0}% in {:.3}s",
            body.temperature,
            body.humidity,
            elapsed.as_secs_f64()
        );

        Ok(WeatherReading::new(body.temperature, body.humidity))
    }
}
