//! Feature extraction from a history window

use ndarray::{Array2, Axis};

use crate::models::{HistoryWindow, WeatherParameter, FEATURE_COUNT, WINDOW_DAYS};

/// The sequence model was trained on surface pressure divided by 100
pub const PRESSURE_DIVISOR: f64 = 100.0;

/// A (14 × 10) matrix of raw model features, one row per day
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTensor {
    pub values: Array2<f64>,
}

/// A feature tensor after scaling into model input space
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledTensor {
    pub values: Array2<f64>,
}

impl ScaledTensor {
    /// Model input shape `[batch, timesteps, features]`
    pub fn shape(&self) -> [usize; 3] {
        let (timesteps, features) = self.values.dim();
        [1, timesteps, features]
    }

    /// One `(features, 1)` column per day, oldest first
    pub fn timesteps(&self) -> Vec<Array2<f64>> {
        self.values
            .axis_iter(Axis(0))
            .map(|day| day.to_owned().insert_axis(Axis(1)))
            .collect()
    }
}

/// Converts observed days into model features
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Build the feature tensor; values were clamped when the window was built
    pub fn extract(window: &HistoryWindow) -> FeatureTensor {
        let days = window.days();
        let pressure = WeatherParameter::Pressure.index();

        let values = Array2::from_shape_fn((WINDOW_DAYS, FEATURE_COUNT), |(day, col)| {
            let value = days[day].values[col];
            if col == pressure {
                value / PRESSURE_DIVISOR
            } else {
                value
            }
        });

        FeatureTensor { values }
    }
}
