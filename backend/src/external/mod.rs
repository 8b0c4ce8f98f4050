//! External API integrations

pub mod classifier;
pub mod nasa_power;
pub mod open_meteo;
pub mod synthetic;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use shared::{CurrentConditions, GpsCoordinates, WeatherDay};

use crate::config::WeatherConfig;
use crate::error::{AppError, AppResult};

pub use classifier::{ImageClassifier, RemoteImageClassifier};
pub use nasa_power::NasaPowerClient;
pub use open_meteo::OpenMeteoClient;
pub use synthetic::SyntheticWeatherGenerator;

/// A source of observed weather
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Daily history ending at the provider's most recent complete day, oldest first
    async fn fetch_history(&self, coords: GpsCoordinates, days: u32) -> AppResult<Vec<WeatherDay>>;

    async fn fetch_current(&self, coords: GpsCoordinates) -> AppResult<CurrentConditions>;
}

/// Build the configured providers in priority order; unknown names are skipped
pub fn build_providers(config: &WeatherConfig) -> AppResult<Vec<Arc<dyn WeatherProvider>>> {
    let client = http_client(config.timeout())?;
    let mut providers: Vec<Arc<dyn WeatherProvider>> = Vec::new();

    for name in &config.providers {
        match name.as_str() {
            nasa_power::PROVIDER_NAME => providers.push(Arc::new(NasaPowerClient::new(
                client.clone(),
                config.nasa_power_url.clone(),
            ))),
            open_meteo::PROVIDER_NAME => providers.push(Arc::new(OpenMeteoClient::new(
                client.clone(),
                config.open_meteo_archive_url.clone(),
                config.open_meteo_forecast_url.clone(),
            ))),
            other => tracing::warn!(provider = %other, "Ignoring unknown weather provider"),
        }
    }

    Ok(providers)
}

pub(crate) fn http_client(timeout: Duration) -> AppResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))
}

/// Map a transport error onto the upstream error kinds
pub(crate) fn upstream_error(provider: &str, e: reqwest::Error) -> AppError {
    if e.is_timeout() {
        AppError::UpstreamTimeout(provider.to_string())
    } else {
        AppError::UpstreamProvider(format!("{}: {}", provider, e))
    }
}

/// Send a GET and decode the JSON body, reporting non-2xx statuses as provider errors
pub(crate) async fn get_json<T: serde::de::DeserializeOwned>(
    provider: &str,
    request: reqwest::RequestBuilder,
) -> AppResult<T> {
    let response = request.send().await.map_err(|e| upstream_error(provider, e))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::UpstreamProvider(format!(
            "{} returned {}: {}",
            provider, status, body
        )));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::UpstreamProvider(format!("{}: failed to parse response: {}", provider, e)))
}
