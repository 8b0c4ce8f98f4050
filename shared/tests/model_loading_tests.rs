//! Artifact loading tests
//!
//! Model and scaler artifacts written to a temporary directory and loaded
//! through the process-wide handle.

use std::fs;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_lstm::models::lstm_network::LSTMNetwork;
use rust_lstm::persistence::ModelPersistence;
use shared::forecast::{
    Activation, FittedScaler, ForecastModelArtifact, LoadStrategy, ModelHandle, ModelLoader,
    ReadoutArtifact,
};
use shared::{ForecastRequest, ModelStatus, WeatherDay, FEATURE_COUNT, WINDOW_DAYS};

const HIDDEN: usize = 8;

/// Network with a zeroed readout, so the scaled prediction is exactly `bias`
fn json_model(activation: &str, bias: f64) -> String {
    let network = LSTMNetwork::new(FEATURE_COUNT, HIDDEN, 2);
    let mut artifact = ForecastModelArtifact::new(
        &network,
        Some(ReadoutArtifact {
            weights: vec![0.0; HIDDEN],
            bias,
            activation: activation.to_string(),
        }),
    );
    artifact.metrics = Some(serde_json::json!(["mae", "custom_rmse"]));
    serde_json::to_string(&artifact).unwrap()
}

fn binary_model(path: &std::path::Path, input_size: usize) {
    let network = LSTMNetwork::new(input_size, HIDDEN, 1);
    let saved = ModelPersistence::create_saved_model(&network, "flame-lstm".to_string(), 20, Some(0.04), None);
    ModelPersistence::save_to_binary(&saved, path).unwrap();
}

fn min_max_scaler() -> String {
    serde_json::json!({
        "kind": "min_max",
        "data_min": [10.0, 5.0, 15.0, 20.0, 0.0, 0.0, 9.5, 0.0, 0.0, 0.0],
        "data_max": [40.0, 35.0, 45.0, 100.0, 20.0, 360.0, 10.5, 300.0, 1200.0, 15.0]
    })
    .to_string()
}

fn request() -> ForecastRequest {
    ForecastRequest {
        data: (0..WINDOW_DAYS)
            .map(|_| WeatherDay {
                t2m: Some(25.0),
                ..Default::default()
            })
            .collect(),
        current_temp: Some(25.0),
    }
}

#[test]
fn test_handle_loads_json_model_and_scaler() {
    let dir = tempfile::tempdir().unwrap();
    let model_path = dir.path().join("lstm.json");
    let scaler_path = dir.path().join("scaler.json");
    fs::write(&model_path, json_model("linear", 0.5)).unwrap();
    fs::write(&scaler_path, min_max_scaler()).unwrap();

    let handle = ModelHandle::new(&model_path, &scaler_path, ModelLoader::default());
    assert_eq!(handle.status(), ModelStatus::Loaded);
    assert_eq!(handle.strategy(), Some(LoadStrategy::SkipMetricValidation));
    assert_eq!(handle.scaler().kind(), "min_max");

    // Scaled 0.5 over the [10, 40] temperature column
    let prediction = handle
        .predictor()
        .predict_next_day(&shared::HistoryWindow::from_days(&request().data).unwrap());
    assert_eq!(prediction.temperature, 25.0);
    assert_eq!(prediction.status, ModelStatus::Loaded);
}

#[test]
fn test_custom_activation_loads_through_second_strategy() {
    let dir = tempfile::tempdir().unwrap();
    let model_path = dir.path().join("lstm.json");
    fs::write(&model_path, json_model("gelu", 0.0)).unwrap();

    let loader = ModelLoader::default().with_custom_activations(vec![Activation::Gelu]);
    let handle = ModelHandle::new(&model_path, dir.path().join("missing.json"), loader);

    assert_eq!(handle.strategy(), Some(LoadStrategy::CustomObjects));
    assert_eq!(handle.scaler(), &FittedScaler::NoScaler);
}

#[test]
fn test_binary_saved_model_uses_default_strategy() {
    let dir = tempfile::tempdir().unwrap();
    let model_path = dir.path().join("lstm.bin");
    binary_model(&model_path, FEATURE_COUNT);

    let handle = ModelHandle::new(&model_path, dir.path().join("scaler.json"), ModelLoader::default());
    assert_eq!(handle.strategy(), Some(LoadStrategy::Default));

    let forecast = handle
        .predictor()
        .forecast(&request(), &mut StdRng::seed_from_u64(8))
        .unwrap();
    assert_eq!(forecast.model_status, ModelStatus::Loaded);
    // Fallback affine lands in [22, 38]; anchored 0.1/0.9 on 25
    let day1 = forecast.result.predictions[0].temperature;
    assert!((24.7..=26.3).contains(&day1), "day 1 was {}", day1);
}

#[test]
fn test_binary_model_for_other_features_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let model_path = dir.path().join("lstm.bin");
    binary_model(&model_path, 6);

    let handle = ModelHandle::new(&model_path, dir.path().join("scaler.json"), ModelLoader::default());
    assert_eq!(handle.status(), ModelStatus::Fallback);
}

#[test]
fn test_corrupt_model_degrades_to_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let model_path = dir.path().join("lstm.json");
    fs::write(&model_path, "{\"weights\": oops").unwrap();

    let handle = ModelHandle::new(&model_path, dir.path().join("scaler.json"), ModelLoader::default());
    assert_eq!(handle.status(), ModelStatus::Fallback);

    let forecast = handle
        .predictor()
        .forecast(&request(), &mut StdRng::seed_from_u64(8))
        .unwrap();
    assert_eq!(forecast.model_status, ModelStatus::Fallback);
}

#[test]
fn test_unrecognized_scaler_file() {
    let dir = tempfile::tempdir().unwrap();
    let scaler_path = dir.path().join("scaler.json");
    fs::write(&scaler_path, r#"{"center": [1, 2, 3]}"#).unwrap();

    assert_eq!(FittedScaler::load(&scaler_path), FittedScaler::Unrecognized);
}
