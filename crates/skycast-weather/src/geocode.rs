//! Forward geocoding: free-text place names or postal codes to candidate locations.
//! Uses the Open-Meteo geocoding API - free, no API key required.

use reqwest::Client;
use skycast_core::{NetworkError, ReqwestErrorExt, SearchConfig};
use std::time::Duration;
use tracing::instrument;
use url::Url;

use crate::normalize::{normalize_geocode_results, RawGeocodeResponse, SearchQuery};
use crate::types::{Location, WeatherError, WeatherResult};

#[derive(Debug, Clone)]
pub struct GeocodingClient {
    client: Client,
    geocoding_url: String,
    result_limit: u8,
    language: String,
}

impl GeocodingClient {
    pub fn from_config(config: &SearchConfig) -> WeatherResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| WeatherError::Network(e.into_network_error()))?;

        Ok(Self {
            client,
            geocoding_url: config.geocoding_url.clone(),
            result_limit: config.result_limit,
            language: config.language.clone(),
        })
    }

    /// Search request URL for a classified query
    pub fn search_request_url(&self, query: &SearchQuery) -> WeatherResult<Url> {
        let (key, value) = query.param();
        let count = self.result_limit.to_string();
        let params = [
            (key, value),
            ("count", count.as_str()),
            ("language", self.language.as_str()),
            ("format", "json"),
        ];

        Url::parse_with_params(&self.geocoding_url, params)
            .map_err(|e| WeatherError::Network(NetworkError::InvalidRequest(e.to_string())))
    }

    /// Resolve a query to candidate locations. No matches is `Ok(vec![])`.
    #[instrument(skip(self), level = "info")]
    pub async fn search(&self, query: &SearchQuery) -> WeatherResult<Vec<Location>> {
        let url = self.search_request_url(query)?;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::debug!("Geocoding returned status {}", status);
            return Err(WeatherError::Provider {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let raw: RawGeocodeResponse = serde_json::from_str(&body)
            .map_err(|e| WeatherError::malformed(format!("geocoding body: {}", e)))?;

        let locations = normalize_geocode_results(raw);
        tracing::debug!("Geocoding matched {} locations", locations.len());
        Ok(locations)
    }
}
