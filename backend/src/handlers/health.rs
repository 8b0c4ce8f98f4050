//! Health check handlers

use axum::{extract::State, Json};
use serde::Serialize;
use shared::ModelStatus;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub model_status: ModelStatus,
    pub scaler: String,
    pub database: String,
}

/// Root endpoint
pub async fn root() -> &'static str {
    "Flame Prophet API v1.0"
}

/// Health check endpoint handler
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_status = match state.users.ping().await {
        Ok(()) => "connected".to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            "disconnected".to_string()
        }
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model_status: state.models.status(),
        scaler: state.models.scaler().kind().to_string(),
        database: db_status,
    })
}
