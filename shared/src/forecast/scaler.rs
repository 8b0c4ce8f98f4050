//! Fitted feature scaler
//!
//! The scaler is fitted at training time and persisted as a tagged JSON
//! artifact. A missing artifact is not an error: the forward transform becomes
//! the identity and the inverse transform uses the fallback affine formula.

use std::path::Path;

use ndarray::Axis;
use serde::{Deserialize, Serialize};

use crate::forecast::extractor::{FeatureTensor, ScaledTensor};
use crate::models::FEATURE_COUNT;

/// Persisted scaler parameters as written by the training job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScalerArtifact {
    MinMax {
        data_min: Vec<f64>,
        data_max: Vec<f64>,
    },
    Standard {
        mean: Vec<f64>,
        scale: Vec<f64>,
    },
}

/// Process-lifetime scaler state, one variant per recognised artifact shape
#[derive(Debug, Clone, PartialEq)]
pub enum FittedScaler {
    /// No artifact was found
    NoScaler,
    MinMax {
        data_min: [f64; FEATURE_COUNT],
        data_max: [f64; FEATURE_COUNT],
    },
    Standard {
        mean: [f64; FEATURE_COUNT],
        scale: [f64; FEATURE_COUNT],
    },
    /// An artifact exists but its shape is not understood
    Unrecognized,
}

impl FittedScaler {
    /// Load the scaler artifact, degrading to `NoScaler`/`Unrecognized` instead of failing
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Scaler artifact not available, using heuristic range");
                return FittedScaler::NoScaler;
            }
        };

        let scaler = Self::from_json(&content);
        match &scaler {
            FittedScaler::Unrecognized => {
                tracing::warn!(path = %path.display(), "Scaler artifact has an unrecognized shape")
            }
            other => tracing::info!(path = %path.display(), kind = other.kind(), "Loaded feature scaler"),
        }
        scaler
    }

    /// Interpret a JSON scaler artifact
    pub fn from_json(content: &str) -> Self {
        match serde_json::from_str::<ScalerArtifact>(content) {
            Ok(artifact) => Self::from_artifact(artifact),
            Err(_) => FittedScaler::Unrecognized,
        }
    }

    pub fn from_artifact(artifact: ScalerArtifact) -> Self {
        match artifact {
            ScalerArtifact::MinMax { data_min, data_max } => {
                match (to_columns(&data_min), to_columns(&data_max)) {
                    (Some(data_min), Some(data_max)) => FittedScaler::MinMax { data_min, data_max },
                    _ => FittedScaler::Unrecognized,
                }
            }
            ScalerArtifact::Standard { mean, scale } => {
                match (to_columns(&mean), to_columns(&scale)) {
                    (Some(mean), Some(scale)) => FittedScaler::Standard { mean, scale },
                    _ => FittedScaler::Unrecognized,
                }
            }
        }
    }

    /// Short name for logs and the model info endpoint
    pub fn kind(&self) -> &'static str {
        match self {
            FittedScaler::NoScaler => "none",
            FittedScaler::MinMax { .. } => "min_max",
            FittedScaler::Standard { .. } => "standard",
            FittedScaler::Unrecognized => "unrecognized",
        }
    }

    /// Apply the fitted per-column transform
    pub fn transform(&self, tensor: &FeatureTensor) -> ScaledTensor {
        let mut values = tensor.values.clone();
        match self {
            FittedScaler::MinMax { data_min, data_max } => {
                for (col, mut column) in values.axis_iter_mut(Axis(1)).enumerate() {
                    let width = non_zero(data_max[col] - data_min[col]);
                    column.mapv_inplace(|v| (v - data_min[col]) / width);
                }
            }
            FittedScaler::Standard { mean, scale } => {
                for (col, mut column) in values.axis_iter_mut(Axis(1)).enumerate() {
                    let width = non_zero(scale[col]);
                    column.mapv_inplace(|v| (v - mean[col]) / width);
                }
            }
            FittedScaler::NoScaler | FittedScaler::Unrecognized => {}
        }
        ScaledTensor { values }
    }
}

/// Zero-width columns are passed through unscaled
fn non_zero(width: f64) -> f64 {
    if width == 0.0 {
        1.0
    } else {
        width
    }
}

fn to_columns(values: &[f64]) -> Option<[f64; FEATURE_COUNT]> {
    if values.iter().any(|v| !v.is_finite()) {
        return None;
    }
    values.try_into().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WINDOW_DAYS;
    use ndarray::Array2;

    fn tensor(value: f64) -> FeatureTensor {
        FeatureTensor {
            values: Array2::from_elem((WINDOW_DAYS, FEATURE_COUNT), value),
        }
    }

    #[test]
    fn test_min_max_transform() {
        let scaler = FittedScaler::MinMax {
            data_min: [10.0; FEATURE_COUNT],
            data_max: [30.0; FEATURE_COUNT],
        };
        let scaled = scaler.transform(&tensor(25.0));
        assert_eq!(scaled.values[[3, 0]], 0.75);
    }

    #[test]
    fn test_standard_transform() {
        let scaler = FittedScaler::Standard {
            mean: [20.0; FEATURE_COUNT],
            scale: [4.0; FEATURE_COUNT],
        };
        let scaled = scaler.transform(&tensor(28.0));
        assert_eq!(scaled.values[[0, 9]], 2.0);
    }

    #[test]
    fn test_zero_width_column_does_not_divide_by_zero() {
        let scaler = FittedScaler::MinMax {
            data_min: [5.0; FEATURE_COUNT],
            data_max: [5.0; FEATURE_COUNT],
        };
        let scaled = scaler.transform(&tensor(7.0));
        assert_eq!(scaled.values[[0, 0]], 2.0);
    }

    #[test]
    fn test_missing_scaler_is_identity() {
        let scaled = FittedScaler::NoScaler.transform(&tensor(12.5));
        assert_eq!(scaled.values, tensor(12.5).values);
    }

    #[test]
    fn test_from_json_variants() {
        let min_max = r#"{"kind":"min_max","data_min":[0,0,0,0,0,0,0,0,0,0],"data_max":[40,40,40,100,30,360,11,200,1000,15]}"#;
        assert_eq!(FittedScaler::from_json(min_max).kind(), "min_max");

        let standard = r#"{"kind":"standard","mean":[1,1,1,1,1,1,1,1,1,1],"scale":[2,2,2,2,2,2,2,2,2,2]}"#;
        assert_eq!(FittedScaler::from_json(standard).kind(), "standard");

        let short = r#"{"kind":"min_max","data_min":[0,0],"data_max":[1,1]}"#;
        assert_eq!(FittedScaler::from_json(short), FittedScaler::Unrecognized);

        let robust = r#"{"kind":"robust","center":[0]}"#;
        assert_eq!(FittedScaler::from_json(robust), FittedScaler::Unrecognized);
    }

    #[test]
    fn test_load_missing_file() {
        let scaler = FittedScaler::load("/definitely/not/here/scaler.json");
        assert_eq!(scaler, FittedScaler::NoScaler);
    }
}
