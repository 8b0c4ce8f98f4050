//! NASA POWER daily point API client
//!
//! Returns exactly the ten model parameters. POWER reports pressure in kPa and
//! shortwave irradiance in kWh/m²/day; both are converted to the units the
//! forecasting core expects (hPa, W/m²). The fill value -999 marks a missing
//! reading.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use shared::{CurrentConditions, GpsCoordinates, WeatherDay, WeatherParameter};

use super::{get_json, WeatherProvider};
use crate::error::{AppError, AppResult};

pub const PROVIDER_NAME: &str = "nasa_power";

/// POWER publishes daily values with a lag of a few days
const PUBLICATION_LAG_DAYS: i64 = 3;

const FILL_VALUE: f64 = -999.0;

#[derive(Clone)]
pub struct NasaPowerClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct PowerResponse {
    properties: PowerProperties,
}

#[derive(Debug, Deserialize)]
struct PowerProperties {
    /// Parameter name -> (YYYYMMDD -> value)
    parameter: HashMap<String, BTreeMap<String, f64>>,
}

impl NasaPowerClient {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    fn parameter_list() -> String {
        WeatherParameter::ALL
            .iter()
            .map(|p| p.key())
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[async_trait]
impl WeatherProvider for NasaPowerClient {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn fetch_history(&self, coords: GpsCoordinates, days: u32) -> AppResult<Vec<WeatherDay>> {
        let end = Utc::now().date_naive() - Duration::days(PUBLICATION_LAG_DAYS);
        let start = end - Duration::days(i64::from(days.max(1)) - 1);

        let request = self.client.get(&self.base_url).query(&[
            ("parameters", Self::parameter_list()),
            ("community", "AG".to_string()),
            ("latitude", coords.latitude.to_string()),
            ("longitude", coords.longitude.to_string()),
            ("start", start.format("%Y%m%d").to_string()),
            ("end", end.format("%Y%m%d").to_string()),
            ("format", "JSON".to_string()),
        ]);

        let response: PowerResponse = get_json(PROVIDER_NAME, request).await?;
        let history = days_from_parameters(&response.properties.parameter, start, end);

        tracing::debug!(
            provider = PROVIDER_NAME,
            days = history.len(),
            %start,
            %end,
            "Fetched weather history"
        );

        Ok(history)
    }

    async fn fetch_current(&self, _coords: GpsCoordinates) -> AppResult<CurrentConditions> {
        Err(AppError::UpstreamProvider(format!(
            "{}: current conditions are not published",
            PROVIDER_NAME
        )))
    }
}

/// One `WeatherDay` per calendar date in `[start, end]`, oldest first
fn days_from_parameters(
    parameters: &HashMap<String, BTreeMap<String, f64>>,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<WeatherDay> {
    start
        .iter_days()
        .take_while(|date| *date <= end)
        .map(|date| {
            let key = date.format("%Y%m%d").to_string();
            let mut day = WeatherDay {
                date: Some(date),
                ..Default::default()
            };
            for parameter in WeatherParameter::ALL {
                let raw = parameters
                    .get(parameter.key())
                    .and_then(|series| series.get(&key))
                    .copied()
                    .filter(|v| *v != FILL_VALUE);
                day.set(parameter, raw.map(|v| to_model_units(parameter, v)));
            }
            day
        })
        .collect()
}

fn to_model_units(parameter: WeatherParameter, value: f64) -> f64 {
    match parameter {
        // kPa -> hPa
        WeatherParameter::Pressure => value * 10.0,
        // kWh/m²/day -> mean W/m²
        WeatherParameter::SolarIrradiance => value * 1000.0 / 24.0,
        _ => value,
    }
}
