//! Open-Meteo archive and forecast API client
//!
//! Daily archive aggregates are mapped onto the model parameters. Wind speed
//! is requested in m/s; the shortwave radiation sum (MJ/m²) is converted to a
//! mean irradiance in W/m². The archive has no UV series, so that parameter is
//! left missing.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use shared::{CurrentConditions, GpsCoordinates, WeatherDay, WeatherParameter};

use super::{get_json, WeatherProvider};
use crate::error::AppResult;

pub const PROVIDER_NAME: &str = "open_meteo";

/// The archive trails real time by several days
const ARCHIVE_LAG_DAYS: i64 = 5;

const DAILY_FIELDS: &str = "temperature_2m_mean,temperature_2m_min,temperature_2m_max,\
relative_humidity_2m_mean,wind_speed_10m_mean,wind_direction_10m_dominant,\
surface_pressure_mean,precipitation_sum,shortwave_radiation_sum";

const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,wind_speed_10m,surface_pressure";

#[derive(Clone)]
pub struct OpenMeteoClient {
    client: Client,
    archive_url: String,
    forecast_url: String,
}

#[derive(Debug, Deserialize)]
struct ArchiveResponse {
    daily: ArchiveDaily,
}

#[derive(Debug, Default, Deserialize)]
struct ArchiveDaily {
    time: Vec<NaiveDate>,
    #[serde(default)]
    temperature_2m_mean: Vec<Option<f64>>,
    #[serde(default)]
    temperature_2m_min: Vec<Option<f64>>,
    #[serde(default)]
    temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    relative_humidity_2m_mean: Vec<Option<f64>>,
    #[serde(default)]
    wind_speed_10m_mean: Vec<Option<f64>>,
    #[serde(default)]
    wind_direction_10m_dominant: Vec<Option<f64>>,
    #[serde(default)]
    surface_pressure_mean: Vec<Option<f64>>,
    #[serde(default)]
    precipitation_sum: Vec<Option<f64>>,
    #[serde(default)]
    shortwave_radiation_sum: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: CurrentBlock,
}

#[derive(Debug, Deserialize)]
struct CurrentBlock {
    time: String,
    temperature_2m: f64,
    #[serde(default)]
    relative_humidity_2m: Option<f64>,
    #[serde(default)]
    wind_speed_10m: Option<f64>,
    #[serde(default)]
    surface_pressure: Option<f64>,
}

impl OpenMeteoClient {
    pub fn new(client: Client, archive_url: String, forecast_url: String) -> Self {
        Self {
            client,
            archive_url,
            forecast_url,
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoClient {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn fetch_history(&self, coords: GpsCoordinates, days: u32) -> AppResult<Vec<WeatherDay>> {
        let end = Utc::now().date_naive() - Duration::days(ARCHIVE_LAG_DAYS);
        let start = end - Duration::days(i64::from(days.max(1)) - 1);

        let request = self.client.get(&self.archive_url).query(&[
            ("latitude", coords.latitude.to_string()),
            ("longitude", coords.longitude.to_string()),
            ("start_date", start.to_string()),
            ("end_date", end.to_string()),
            ("daily", DAILY_FIELDS.to_string()),
            ("wind_speed_unit", "ms".to_string()),
            ("timezone", "UTC".to_string()),
        ]);

        let response: ArchiveResponse = get_json(PROVIDER_NAME, request).await?;
        let history = response.daily.into_days();

        tracing::debug!(provider = PROVIDER_NAME, days = history.len(), "Fetched weather history");
        Ok(history)
    }

    async fn fetch_current(&self, coords: GpsCoordinates) -> AppResult<CurrentConditions> {
        let request = self.client.get(&self.forecast_url).query(&[
            ("latitude", coords.latitude.to_string()),
            ("longitude", coords.longitude.to_string()),
            ("current", CURRENT_FIELDS.to_string()),
            ("wind_speed_unit", "ms".to_string()),
            ("timezone", "UTC".to_string()),
        ]);

        let response: ForecastResponse = get_json(PROVIDER_NAME, request).await?;
        Ok(response.current.into_conditions())
    }
}

impl ArchiveDaily {
    fn into_days(self) -> Vec<WeatherDay> {
        let at = |series: &[Option<f64>], i: usize| series.get(i).copied().flatten();

        self.time
            .iter()
            .enumerate()
            .map(|(i, date)| {
                let mut day = WeatherDay {
                    date: Some(*date),
                    ..Default::default()
                };
                day.set(WeatherParameter::Temperature, at(&self.temperature_2m_mean, i));
                day.set(WeatherParameter::TemperatureMin, at(&self.temperature_2m_min, i));
                day.set(WeatherParameter::TemperatureMax, at(&self.temperature_2m_max, i));
                day.set(WeatherParameter::Humidity, at(&self.relative_humidity_2m_mean, i));
                day.set(WeatherParameter::WindSpeed, at(&self.wind_speed_10m_mean, i));
                day.set(WeatherParameter::WindDirection, at(&self.wind_direction_10m_dominant, i));
                day.set(WeatherParameter::Pressure, at(&self.surface_pressure_mean, i));
                day.set(WeatherParameter::Precipitation, at(&self.precipitation_sum, i));
                // MJ/m² per day -> mean W/m²
                day.set(
                    WeatherParameter::SolarIrradiance,
                    at(&self.shortwave_radiation_sum, i).map(|mj| mj * 1.0e6 / 86_400.0),
                );
                day
            })
            .collect()
    }
}

impl CurrentBlock {
    fn into_conditions(self) -> CurrentConditions {
        let observed_at = NaiveDateTime::parse_from_str(&self.time, "%Y-%m-%dT%H:%M")
            .map(|t| DateTime::<Utc>::from_naive_utc_and_offset(t, Utc))
            .unwrap_or_else(|_| Utc::now());

        CurrentConditions {
            temperature: self.temperature_2m,
            humidity: WeatherParameter::Humidity.resolve(self.relative_humidity_2m),
            wind_speed: WeatherParameter::WindSpeed.resolve(self.wind_speed_10m),
            pressure: WeatherParameter::Pressure.resolve(self.surface_pressure),
            observed_at,
            source: PROVIDER_NAME.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_mapping() {
        let body = serde_json::json!({
            "daily": {
                "time": ["2024-03-01", "2024-03-02"],
                "temperature_2m_mean": [29.1, null],
                "temperature_2m_min": [24.0, 23.5],
                "temperature_2m_max": [34.2, 33.0],
                "relative_humidity_2m_mean": [70.0, 72.0],
                "wind_speed_10m_mean": [2.5, 3.0],
                "wind_direction_10m_dominant": [180.0, 200.0],
                "surface_pressure_mean": [1008.0, 1009.5],
                "precipitation_sum": [0.0, 4.2],
                "shortwave_radiation_sum": [21.6, 17.28]
            }
        });
        let response: ArchiveResponse = serde_json::from_value(body).unwrap();
        let days = response.daily.into_days();

        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(days[0].t2m, Some(29.1));
        assert_eq!(days[1].t2m, None);
        assert_eq!(days[1].ps, Some(1009.5));
        assert!((days[0].allsky_sfc_sw_dwn.unwrap() - 250.0).abs() < 1e-9);
        assert_eq!(days[0].allsky_sfc_uva, None);
    }

    #[test]
    fn test_current_mapping() {
        let block = CurrentBlock {
            time: "2024-03-01T12:00".to_string(),
            temperature_2m: 31.4,
            relative_humidity_2m: Some(64.0),
            wind_speed_10m: None,
            surface_pressure: Some(1007.2),
        };
        let conditions = block.into_conditions();

        assert_eq!(conditions.temperature, 31.4);
        assert_eq!(conditions.wind_speed, WeatherParameter::WindSpeed.default_value());
        assert_eq!(conditions.source, PROVIDER_NAME);
        assert!(!conditions.is_synthetic());
        assert_eq!(conditions.observed_at.to_rfc3339(), "2024-03-01T12:00:00+00:00");
    }
}
