//! Forecast request and response models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::weather::WeatherDay;
use crate::types::{ModelStatus, TrendLabel};

/// Number of forecast days produced per request
pub const FORECAST_DAYS: usize = 7;

/// Named-field forecast request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub data: Vec<WeatherDay>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_temp: Option<f64>,
}

/// Array-form forecast request; each row holds the ten features in model order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrayForecastRequest {
    pub data: Vec<Vec<f64>>,
}

/// One forecast day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub day: u32,
    pub date: NaiveDate,
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub pressure: f64,
    pub day_name: String,
}

/// Minimum and maximum forecast temperatures
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempRange {
    pub min: f64,
    pub max: f64,
}

/// Summary statistics over the forecast week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSummary {
    pub next_day_temperature: f64,
    pub week_avg_temperature: f64,
    pub trend: TrendLabel,
    pub temp_range: TempRange,
}

/// Averages of the auxiliary parameters over the forecast week
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdditionalParameters {
    pub avg_humidity: f64,
    pub avg_wind_speed: f64,
    pub avg_pressure: f64,
}

/// Seven forecast days plus summary statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub predictions: Vec<ForecastDay>,
    pub summary: ForecastSummary,
    pub additional_parameters: AdditionalParameters,
}

/// Wire response for both forecast endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResponse {
    #[serde(flatten)]
    pub forecast: ForecastResult,
    pub unit: String,
    pub model_status: ModelStatus,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
    pub data_points_used: usize,
}

/// One batch item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItem {
    pub id: serde_json::Value,
    #[serde(default)]
    pub data: Vec<WeatherDay>,
}

/// Batch request of independent next-day predictions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    pub batches: Vec<BatchItem>,
}

/// Outcome for a single batch item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItemResult {
    pub id: serde_json::Value,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted_temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchItemResult {
    pub fn succeeded(id: serde_json::Value, temperature: f64) -> Self {
        Self {
            id,
            success: true,
            predicted_temperature: Some(temperature),
            error: None,
        }
    }

    pub fn failed(id: serde_json::Value, error: impl Into<String>) -> Self {
        Self {
            id,
            success: false,
            predicted_temperature: None,
            error: Some(error.into()),
        }
    }
}

/// Wire response for the batch endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResponse {
    pub success: bool,
    pub results: Vec<BatchItemResult>,
    pub timestamp: DateTime<Utc>,
}
