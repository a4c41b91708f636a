//! Client-side resolvers for place names and weather
//!
//! Both lookups go through the proxy endpoints served by [`crate::web`];
//! `ProxyClient` implements the two resolver traits against a server base URL.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::config::ClientConfig;
use crate::error::{LookupFailed, LookupService};
use crate::models::{PlaceName, WeatherReading};

/// Resolves coordinates to a city/country pair
#[async_trait]
pub trait LocationNameResolver: Send + Sync {
    async fn resolve(&self, latitude: f64, longitude: f64) -> Result<PlaceName, LookupFailed>;
}

/// Resolves coordinates to current temperature and humidity
#[async_trait]
pub trait WeatherResolver: Send + Sync {
    async fn resolve(&self, latitude: f64, longitude: f64)
    -> Result<WeatherReading, LookupFailed>;
}

/// Proxy replies are either the payload or `{"error": "..."}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProxyReply<T> {
    Failure { error: String },
    Success(T),
}

/// HTTP client for the `/api/reverse-geocode` and `/api/weather` endpoints
#[derive(Debug, Clone)]
pub struct ProxyClient {
    client: reqwest::Client,
    base_url: String,
}

impl ProxyClient {
    /// Create a client for the server at `base_url`
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .with_context(|| "Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> anyhow::Result<Self> {
        Self::new(
            &config.server_url,
            Duration::from_secs(config.timeout_seconds.into()),
        )
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn get_json<T: DeserializeOwned>(
        &self,
        service: LookupService,
        endpoint: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<T, LookupFailed> {
        let url = format!(
            "{}/api/{}?latitude={}&longitude={}",
            self.base_url, endpoint, latitude, longitude
        );
        debug!("Requesting {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            warn!("Request to {} failed: {}", endpoint, e);
            LookupFailed::new(service, e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("{} responded with HTTP {}", endpoint, status);
            return Err(LookupFailed::new(service, format!("HTTP {status}")));
        }

        let reply: ProxyReply<T> = response.json().await.map_err(|e| {
            warn!("Malformed {} response: {}", endpoint, e);
            LookupFailed::new(service, format!("malformed response: {e}"))
        })?;

        match reply {
            ProxyReply::Success(payload) => Ok(payload),
            ProxyReply::Failure { error } => {
                warn!("{} reported an error: {}", endpoint, error);
                Err(LookupFailed::new(service, error))
            }
        }
    }
}

#[async_trait]
impl LocationNameResolver for ProxyClient {
    async fn resolve(&self, latitude: f64, longitude: f64) -> Result<PlaceName, LookupFailed> {
        self.get_json(
            LookupService::LocationName,
            "reverse-geocode",
            latitude,
            longitude,
        )
        .await
    }
}

#[async_trait]
impl WeatherResolver for ProxyClient {
    async fn resolve(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<WeatherReading, LookupFailed> {
        self.get_json(LookupService::Weather, "weather", latitude, longitude)
            .await
    }
}
