//! Weather data and live forecast handlers

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{
    CurrentConditions, ForecastRequest, ForecastResponse, GpsCoordinates, WeatherDay, WINDOW_DAYS,
};

use super::prediction::{forecast_rng, run_blocking};
use super::ApiQuery;
use crate::error::{AppError, AppResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LocationQuery {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub lat: f64,
    pub lon: f64,
    pub days: Option<u32>,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub location: GpsCoordinates,
    pub source: String,
    pub days: usize,
    pub data: Vec<WeatherDay>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct CurrentResponse {
    pub success: bool,
    pub location: GpsCoordinates,
    pub current: CurrentConditions,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct LiveForecastResponse {
    #[serde(flatten)]
    pub forecast: ForecastResponse,
    pub location: GpsCoordinates,
    pub history_source: String,
    pub current_source: String,
}

fn coordinates(lat: f64, lon: f64) -> AppResult<GpsCoordinates> {
    let coords = GpsCoordinates::new(lat, lon);
    shared::validate_coordinates(&coords)
        .map_err(|e| AppError::bad_request("Invalid coordinates", e))?;
    Ok(coords)
}

/// Daily history from the configured providers (never synthesised)
pub async fn weather_history(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<HistoryQuery>,
) -> AppResult<Json<HistoryResponse>> {
    let coords = coordinates(query.lat, query.lon)?;
    let days = query.days.unwrap_or(WINDOW_DAYS as u32);
    shared::validate_history_days(days).map_err(|e| AppError::bad_request("Invalid days", e))?;

    let fetch = state.weather.history(coords, days).await?;

    Ok(Json(HistoryResponse {
        success: true,
        location: coords,
        source: fetch.source.to_string(),
        days: fetch.days.len(),
        data: fetch.days,
        timestamp: Utc::now(),
    }))
}

/// Current conditions, generated when no provider answers
pub async fn weather_current(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<LocationQuery>,
) -> AppResult<Json<CurrentResponse>> {
    let coords = coordinates(query.lat, query.lon)?;
    let current = state.weather.current(coords).await;

    Ok(Json(CurrentResponse {
        success: true,
        location: coords,
        current,
        timestamp: Utc::now(),
    }))
}

/// Forecast from fetched history, anchored on live current temperature
pub async fn forecast(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<LocationQuery>,
) -> AppResult<Json<LiveForecastResponse>> {
    let coords = coordinates(query.lat, query.lon)?;

    let history = state.weather.history(coords, WINDOW_DAYS as u32).await?;
    let current = state.weather.current(coords).await;

    // Generated readings must not steer the anchor
    let current_temp = (!current.is_synthetic()).then_some(current.temperature);

    let request = ForecastRequest {
        data: history.days,
        current_temp,
    };
    let models = state.models.clone();
    let seed = state.config.models.random_seed;

    let forecast = run_blocking(move || {
        let mut rng = forecast_rng(seed);
        Ok(models.predictor().forecast(&request, &mut rng)?)
    })
    .await?;

    tracing::info!(
        latitude = coords.latitude,
        longitude = coords.longitude,
        history_source = history.source,
        current_source = %current.source,
        "Live forecast generated"
    );

    Ok(Json(LiveForecastResponse {
        forecast: forecast.into_response(Utc::now()),
        location: coords,
        history_source: history.source.to_string(),
        current_source: current.source,
    }))
}
