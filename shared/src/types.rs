//! Common types used across the platform

use serde::{Deserialize, Serialize};

/// GPS coordinates
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GpsCoordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsCoordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Whether the trained sequence model produced the forecast
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ModelStatus {
    Loaded,
    Fallback,
}

impl ModelStatus {
    /// Confidence reported alongside a forecast
    pub fn confidence(&self) -> f64 {
        match self {
            ModelStatus::Loaded => 0.85,
            ModelStatus::Fallback => 0.5,
        }
    }
}

/// Direction of the recent temperature trend
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TrendLabel {
    Increasing,
    Decreasing,
    Stable,
}

impl TrendLabel {
    /// Classify a raw day-over-day trend in °C/day
    pub fn classify(trend: f64) -> Self {
        if trend > 0.2 {
            TrendLabel::Increasing
        } else if trend < -0.2 {
            TrendLabel::Decreasing
        } else {
            TrendLabel::Stable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_by_status() {
        assert_eq!(ModelStatus::Loaded.confidence(), 0.85);
        assert_eq!(ModelStatus::Fallback.confidence(), 0.5);
    }

    #[test]
    fn test_trend_classification_thresholds() {
        assert_eq!(TrendLabel::classify(0.21), TrendLabel::Increasing);
        assert_eq!(TrendLabel::classify(0.2), TrendLabel::Stable);
        assert_eq!(TrendLabel::classify(-0.2), TrendLabel::Stable);
        assert_eq!(TrendLabel::classify(-0.5), TrendLabel::Decreasing);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ModelStatus::Fallback).unwrap(), "\"fallback\"");
        assert_eq!(serde_json::to_string(&TrendLabel::Stable).unwrap(), "\"stable\"");
    }
}
