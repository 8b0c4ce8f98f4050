//! Recovery of a physical temperature from the model's scaled output
//!
//! The cascade never fails: every malformed scaler state or implausible
//! intermediate value resolves through the fallback affine formula.

use crate::forecast::scaler::FittedScaler;
use crate::models::WeatherParameter;

/// Lower bound of the fallback clamp
pub const FALLBACK_MIN: f64 = 22.0;
/// Upper bound of the fallback clamp
pub const FALLBACK_MAX: f64 = 38.0;

/// Scaled values beyond this magnitude are assumed to be unscaled already
const UNSCALED_THRESHOLD: f64 = 10.0;

/// Temperature column range outside which a min-max fit is implausible
const MIN_PLAUSIBLE_RANGE: f64 = 1.0;
const MAX_PLAUSIBLE_RANGE: f64 = 100.0;

/// Recovered temperatures outside this window are rejected
const MIN_PLAUSIBLE_TEMP: f64 = -50.0;
const MAX_PLAUSIBLE_TEMP: f64 = 100.0;

/// Which branch of the cascade produced the temperature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InversePath {
    AlreadyUnscaled,
    MinMax,
    Standard,
    FallbackAffine,
}

/// Fixed heuristic used whenever scaler metadata is missing or implausible
pub fn fallback_affine(scaled: f64) -> f64 {
    let value = scaled * 25.0 + 25.0;
    if value.is_nan() {
        return (FALLBACK_MIN + FALLBACK_MAX) / 2.0;
    }
    value.clamp(FALLBACK_MIN, FALLBACK_MAX)
}

/// Inverse-transforms the temperature column of a scaler
pub struct InverseTransformer<'a> {
    scaler: &'a FittedScaler,
}

impl<'a> InverseTransformer<'a> {
    pub fn new(scaler: &'a FittedScaler) -> Self {
        Self { scaler }
    }

    /// Physical temperature for a scaled prediction
    pub fn temperature(&self, scaled: f64) -> f64 {
        self.temperature_with_path(scaled).0
    }

    /// Physical temperature plus the cascade branch that produced it
    pub fn temperature_with_path(&self, scaled: f64) -> (f64, InversePath) {
        if scaled.is_nan() {
            return self.fallback(scaled, "prediction is NaN");
        }

        if scaled.abs() > UNSCALED_THRESHOLD {
            return (
                scaled.clamp(FALLBACK_MIN, FALLBACK_MAX),
                InversePath::AlreadyUnscaled,
            );
        }

        let column = WeatherParameter::Temperature.index();
        match self.scaler {
            FittedScaler::MinMax { data_min, data_max } => {
                let (min, max) = (data_min[column], data_max[column]);
                let range = max - min;
                if !(MIN_PLAUSIBLE_RANGE..=MAX_PLAUSIBLE_RANGE).contains(&range) {
                    return self.fallback(scaled, "implausible min-max range");
                }
                self.checked(scaled * range + min, scaled, InversePath::MinMax)
            }
            FittedScaler::Standard { mean, scale } => self.checked(
                scaled * scale[column] + mean[column],
                scaled,
                InversePath::Standard,
            ),
            FittedScaler::NoScaler => self.fallback(scaled, "no fitted scaler"),
            FittedScaler::Unrecognized => self.fallback(scaled, "unrecognized scaler"),
        }
    }

    fn checked(&self, original: f64, scaled: f64, path: InversePath) -> (f64, InversePath) {
        if !original.is_finite()
            || original > MAX_PLAUSIBLE_TEMP
            || original < MIN_PLAUSIBLE_TEMP
        {
            return self.fallback(scaled, "implausible inverse-transformed temperature");
        }
        (original, path)
    }

    fn fallback(&self, scaled: f64, reason: &str) -> (f64, InversePath) {
        tracing::debug!(scaled, reason, "Using fallback affine inverse transform");
        (fallback_affine(scaled), InversePath::FallbackAffine)
    }
}
