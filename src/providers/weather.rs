//! OpenWeatherMap forecast client

use super::types::{ProviderError, WeatherSource, build_client, map_http_status, map_send_error};
use crate::config::{Coordinates, ProviderConfig};
use async_trait::async_trait;
use std::time::{Duration, Instant};

/// Forecast source backed by OpenWeatherMap `/forecast`
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl OpenWeatherClient {
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let timeout = Duration::from_secs(config.timeout);
        Ok(Self {
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key(),
            timeout,
            client: build_client(timeout)?,
        })
    }

    #[cfg(test)]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherClient {
    async fn forecast(&self, coords: Coordinates) -> Result<serde_json::Value, ProviderError> {
        let Some(ref key) = self.api_key else {
            return Err(ProviderError::unavailable("weather API key not configured"));
        };

        let start = Instant::now();
        let response = self
            .client
            .get(format!("{}/forecast", self.base_url))
            .query(&[
                ("lat", coords.lat.to_string()),
                ("lon", coords.lon.to_string()),
                ("appid", key.clone()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await
            .map_err(|e| map_send_error(e, start.elapsed()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_http_status(status, &body, self.timeout));
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::parse(format!("failed to parse forecast: {}", e)))
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// The first forecast entry, reduced to what the prompt needs
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSummary {
    pub temperature: f64,
    pub description: String,
    pub humidity: f64,
}

impl WeatherSummary {
    /// Extract from a raw forecast (`list[0].main` and `list[0].weather[0]`)
    pub fn from_forecast(forecast: &serde_json::Value) -> Option<Self> {
        let first = forecast.get("list")?.get(0)?;
        let main = first.get("main")?;
        Some(Self {
            temperature: main.get("temp")?.as_f64()?,
            humidity: main.get("humidity")?.as_f64()?,
            description: first
                .get("weather")?
                .get(0)?
                .get("description")?
                .as_str()?
                .to_string(),
        })
    }

    /// Description of the first forecast entry, if any
    pub fn first_description(forecast: &serde_json::Value) -> Option<String> {
        forecast
            .pointer("/list/0/weather/0/description")
            .and_then(|d| d.as_str())
            .map(str::to_string)
    }

    pub fn prompt_line(&self) -> String {
        format!(
            "Temperature: {}°C, Condition: {}, Humidity: {}%",
            self.temperature, self.description, self.humidity
        )
    }
}
