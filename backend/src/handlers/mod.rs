//! HTTP handlers

pub mod auth;
pub mod classify;
pub mod health;
pub mod model_info;
pub mod prediction;
pub mod weather;

use axum::extract::FromRequest;
use axum::extract::FromRequestParts;

use crate::error::AppError;

pub use auth::{google_callback, google_login, login, logout, profile, refresh, register};
pub use classify::classify;
pub use health::{health_check, root};
pub use model_info::model_info;
pub use prediction::{predict, predict_batch, predict_lstm};
pub use weather::{forecast, weather_current, weather_history};

/// JSON body whose rejections are answered with a 400 `{error, message}`
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query string whose rejections are answered with a 400 `{error, message}`
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);
