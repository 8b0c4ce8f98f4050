//! Model introspection handler

use axum::{extract::State, Json};
use serde::Serialize;
use shared::{ModelStatus, WeatherParameter, FORECAST_DAYS, WINDOW_DAYS};

use crate::AppState;

#[derive(Serialize)]
pub struct ModelInfoResponse {
    pub model_status: ModelStatus,
    pub confidence: f64,
    pub load_strategy: Option<String>,
    pub model: Option<String>,
    pub scaler: String,
    pub features: Vec<&'static str>,
    pub window_days: usize,
    pub forecast_days: usize,
}

/// Which artifacts are loaded and how the model reads its input
pub async fn model_info(State(state): State<AppState>) -> Json<ModelInfoResponse> {
    let models = &state.models;
    let status = models.status();

    Json(ModelInfoResponse {
        model_status: status,
        confidence: status.confidence(),
        load_strategy: models.strategy().map(|s| s.to_string()),
        model: models.model().map(|m| m.model.describe()),
        scaler: models.scaler().kind().to_string(),
        features: WeatherParameter::ALL.iter().map(|p| p.key()).collect(),
        window_days: WINDOW_DAYS,
        forecast_days: FORECAST_DAYS,
    })
}
