//! Summary statistics over a synthesized week

use crate::models::{AdditionalParameters, ForecastDay, ForecastResult, ForecastSummary, TempRange};
use crate::types::TrendLabel;

pub struct ResponseAssembler;

impl ResponseAssembler {
    /// Build the forecast result; the trend label uses the raw (unclamped) trend
    pub fn assemble(days: Vec<ForecastDay>, raw_trend: f64) -> ForecastResult {
        let temps: Vec<f64> = days.iter().map(|d| d.temperature).collect();

        let summary = ForecastSummary {
            next_day_temperature: temps.first().copied().unwrap_or_default(),
            week_avg_temperature: mean(&temps),
            trend: TrendLabel::classify(raw_trend),
            temp_range: TempRange {
                min: temps.iter().copied().fold(f64::INFINITY, f64::min),
                max: temps.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            },
        };

        let additional_parameters = AdditionalParameters {
            avg_humidity: mean(&days.iter().map(|d| d.humidity).collect::<Vec<_>>()),
            avg_wind_speed: mean(&days.iter().map(|d| d.wind_speed).collect::<Vec<_>>()),
            avg_pressure: mean(&days.iter().map(|d| d.pressure).collect::<Vec<_>>()),
        };

        ForecastResult {
            predictions: days,
            summary,
            additional_parameters,
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
