//! Route definitions for the Flame Prophet API

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Forecasting (public)
        .route("/predict", post(handlers::predict))
        .route("/predict/lstm", post(handlers::predict_lstm))
        .route("/predict/batch", post(handlers::predict_batch))
        .route("/model/info", get(handlers::model_info))
        // Live weather
        .route("/forecast", get(handlers::forecast))
        .nest("/weather", weather_routes())
        // Image classification
        .route("/classify", post(handlers::classify))
        // Authentication
        .nest("/auth", auth_routes(state))
}

/// Weather data routes
fn weather_routes() -> Router<AppState> {
    Router::new()
        .route("/history", get(handlers::weather_history))
        .route("/current", get(handlers::weather_current))
}

/// Authentication routes
fn auth_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
        .route("/google/login", get(handlers::google_login))
        .route("/google/callback", get(handlers::google_callback))
        .merge(protected_auth_routes(state))
}

/// Authentication routes that need a bearer token
fn protected_auth_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/logout", post(handlers::logout))
        .route("/profile", get(handlers::profile))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
