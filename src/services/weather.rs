//! Weather service (OpenWeather)

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::{Error, Result};

/// Request timeout for weather lookups
const WEATHER_TIMEOUT: Duration = Duration::from_secs(10);

/// Current-weather report for a city
#[derive(Debug, Clone)]
pub struct WeatherReport {
    /// Localized condition description (e.g. "leichter Regen")
    pub description: String,
    /// Temperature in degrees Celsius, rounded
    pub temperature_celsius: i32,
}

/// Weather collaborator
#[async_trait]
pub trait WeatherService: Send + Sync {
    /// Fetch the current weather for a city
    async fn current(&self, city: &str) -> Result<WeatherReport>;
}

/// OpenWeather current-weather client
pub struct OpenWeather {
    client: reqwest::Client,
    api_key: String,
    language: String,
}

#[derive(Deserialize)]
struct OwmResponse {
    weather: Vec<OwmCondition>,
    main: OwmMain,
}

#[derive(Deserialize)]
struct OwmCondition {
    description: String,
}

#[derive(Deserialize)]
struct OwmMain {
    temp: f64,
}

impl OpenWeather {
    /// Create a new OpenWeather client
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty
    pub fn new(api_key: String, language: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("OpenWeather API key required".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(WEATHER_TIMEOUT)
                .build()
                .map_err(Error::Http)?,
            api_key,
            language,
        })
    }
}

#[async_trait]
impl WeatherService for OpenWeather {
    async fn current(&self, city: &str) -> Result<WeatherReport> {
        let response = self
            .client
            .get("https://api.openweathermap.org/data/2.5/weather")
            .query(&[
                ("q", city),
                ("appid", &self.api_key),
                ("units", "metric"),
                ("lang", &self.language),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, city, body = %body, "weather API error");
            return Err(Error::Weather(format!("weather API error {status}")));
        }

        let result: OwmResponse = response.json().await?;
        let description = result
            .weather
            .into_iter()
            .next()
            .map(|c| c.description)
            .ok_or_else(|| Error::Weather("missing condition in response".to_string()))?;

        #[allow(clippy::cast_possible_truncation)]
        let temperature_celsius = result.main.temp.round() as i32;

        Ok(WeatherReport {
            description,
            temperature_celsius,
        })
    }
}
