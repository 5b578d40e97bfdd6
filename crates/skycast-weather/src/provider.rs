//! Open-Meteo forecast client.

use reqwest::Client;
use skycast_core::{NetworkError, ReqwestErrorExt, TemperatureUnit, WeatherConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;
use url::Url;

use crate::normalize::{normalize_weather, RawForecast};
use crate::types::{Location, WeatherError, WeatherResult, WeatherSnapshot};

const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,apparent_temperature,precipitation,weather_code,surface_pressure,wind_speed_10m,wind_direction_10m,uv_index";
const HOURLY_FIELDS: &str = "temperature_2m,precipitation_probability,precipitation,weather_code,wind_speed_10m,relative_humidity_2m";
const DAILY_FIELDS: &str = "weather_code,temperature_2m_max,temperature_2m_min,sunrise,sunset,precipitation_sum,precipitation_probability_max,uv_index_max";

#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Arc<Client>,
    forecast_url: String,
    unit: TemperatureUnit,
    forecast_days: u8,
}

impl WeatherProvider {
    pub fn from_config(config: &WeatherConfig) -> WeatherResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| WeatherError::Network(e.into_network_error()))?;

        Ok(Self {
            client: Arc::new(client),
            forecast_url: config.forecast_url.clone(),
            unit: config.temperature_unit,
            forecast_days: config.forecast_days,
        })
    }

    /// Forecast request URL for a location
    pub fn forecast_request_url(&self, location: &Location) -> WeatherResult<Url> {
        let latitude = location.latitude.to_string();
        let longitude = location.longitude.to_string();
        let forecast_days = self.forecast_days.to_string();

        let mut params: Vec<(&str, &str)> = vec![
            ("latitude", latitude.as_str()),
            ("longitude", longitude.as_str()),
            ("current", CURRENT_FIELDS),
            ("hourly", HOURLY_FIELDS),
            ("daily", DAILY_FIELDS),
            ("timezone", "auto"),
            ("forecast_days", forecast_days.as_str()),
        ];
        if let Some(unit) = self.unit.query_value() {
            params.push(("temperature_unit", unit));
        }

        Url::parse_with_params(&self.forecast_url, params).map_err(|e| {
            WeatherError::Network(NetworkError::InvalidRequest(e.to_string()))
        })
    }

    /// Fetch and normalize the forecast for a location.
    #[instrument(skip(self, location), fields(location = %location.name), level = "info")]
    pub async fn fetch_forecast(&self, location: &Location) -> WeatherResult<WeatherSnapshot> {
        let url = self.forecast_request_url(location)?;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Forecast provider returned status {}", status);
            return Err(WeatherError::Provider {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let raw: RawForecast = serde_json::from_str(&body)
            .map_err(|e| WeatherError::malformed(format!("forecast body: {}", e)))?;

        let snapshot = normalize_weather(raw, location)?;
        tracing::info!(
            "Fetched forecast: {} days, {} hours",
            snapshot.daily.len(),
            snapshot.hourly.len()
        );
        Ok(snapshot)
    }
}
