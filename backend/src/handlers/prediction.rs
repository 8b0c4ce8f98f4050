//! Temperature forecasting handlers

use axum::{extract::State, Json};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{ArrayForecastRequest, BatchRequest, BatchResponse, ForecastRequest, ForecastResponse};

use super::ApiJson;
use crate::error::{AppError, AppResult};
use crate::AppState;

/// Jitter source: fixed when a seed is configured, entropy otherwise
pub(crate) fn forecast_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Run CPU-bound inference off the async executor
pub(crate) async fn run_blocking<T, F>(task: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| AppError::Internal(format!("Prediction task failed: {}", e)))?
}

/// Seven-day forecast from named-field history
pub async fn predict(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ForecastRequest>,
) -> AppResult<Json<ForecastResponse>> {
    let models = state.models.clone();
    let seed = state.config.models.random_seed;

    let forecast = run_blocking(move || {
        let mut rng = forecast_rng(seed);
        Ok(models.predictor().forecast(&request, &mut rng)?)
    })
    .await?;

    tracing::info!(
        model_status = ?forecast.model_status,
        next_day = forecast.result.summary.next_day_temperature,
        "Forecast generated"
    );

    Ok(Json(forecast.into_response(Utc::now())))
}

/// Seven-day forecast from array-form history
pub async fn predict_lstm(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ArrayForecastRequest>,
) -> AppResult<Json<ForecastResponse>> {
    let models = state.models.clone();
    let seed = state.config.models.random_seed;

    let forecast = run_blocking(move || {
        let mut rng = forecast_rng(seed);
        Ok(models.predictor().forecast_lstm(&request, &mut rng)?)
    })
    .await?;

    tracing::info!(
        model_status = ?forecast.model_status,
        data_points_used = forecast.data_points_used,
        "Array forecast generated"
    );

    Ok(Json(forecast.into_response(Utc::now())))
}

/// Independent next-day predictions per batch item
pub async fn predict_batch(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<BatchRequest>,
) -> AppResult<Json<BatchResponse>> {
    let models = state.models.clone();

    let results = run_blocking(move || Ok(models.predictor().predict_batch(&request.batches)?)).await?;

    let failed = results.iter().filter(|r| !r.success).count();
    tracing::info!(items = results.len(), failed, "Batch prediction completed");

    Ok(Json(BatchResponse {
        success: true,
        results,
        timestamp: Utc::now(),
    }))
}
