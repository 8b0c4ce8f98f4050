//! Authentication handlers

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ApiJson;
use crate::error::{AppError, AppResult};
use crate::middleware::{ClientAddr, CurrentUser};
use crate::services::auth::RegisterInput;
use crate::services::{GoogleOAuthService, RateLimitedAction};
use crate::AppState;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub username: Option<String>,
    pub full_name: Option<String>,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user_id: String,
    pub email_verification_required: bool,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize)]
pub struct LoginUser {
    pub id: String,
    pub email: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: LoginUser,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct ProfileBody {
    pub username: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub preferences: Option<serde_json::Value>,
}

#[derive(Serialize)]
pub struct ProfileUser {
    pub id: Uuid,
    pub email: String,
    pub email_verified: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub profile: ProfileBody,
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub user: ProfileUser,
}

/// Present and non-blank
fn required(field: Option<String>) -> Option<String> {
    field.filter(|v| !v.trim().is_empty())
}

/// Register endpoint handler
pub async fn register(
    State(state): State<AppState>,
    ClientAddr(client): ClientAddr,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    let (Some(email), Some(password), Some(username)) = (
        required(body.email),
        required(body.password),
        required(body.username),
    ) else {
        return Err(AppError::MissingFields("Missing required fields".to_string()));
    };

    if !state.rate_limiter.check(&client, RateLimitedAction::Register) {
        return Err(AppError::RateLimited(
            "Too many registration attempts. Please try again later.".to_string(),
        ));
    }

    let user_id = state
        .auth_service()
        .register(RegisterInput {
            email,
            password,
            username,
            full_name: body.full_name,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully.".to_string(),
            user_id: user_id.to_string(),
            email_verification_required: false,
        }),
    ))
}

/// Login endpoint handler
pub async fn login(
    State(state): State<AppState>,
    ClientAddr(client): ClientAddr,
    ApiJson(body): ApiJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let (Some(email), Some(password)) = (required(body.email), required(body.password)) else {
        return Err(AppError::MissingFields("Missing email or password".to_string()));
    };

    if !state.rate_limiter.check(&client, RateLimitedAction::Login) {
        return Err(AppError::RateLimited(
            "Too many login attempts. Please try again later.".to_string(),
        ));
    }

    let outcome = state.auth_service().login(&email, &password, &client).await?;

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        access_token: outcome.access_token,
        refresh_token: outcome.refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: outcome.expires_in,
        user: LoginUser {
            id: outcome.user_id.to_string(),
            email: outcome.email,
        },
    }))
}

/// Refresh token endpoint handler
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RefreshRequest>,
) -> AppResult<Json<RefreshResponse>> {
    let Some(refresh_token) = required(body.refresh_token) else {
        return Err(AppError::MissingFields("Missing refresh token".to_string()));
    };

    let auth = state.auth_service();
    let access_token = auth.refresh(&refresh_token).await?;

    Ok(Json(RefreshResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: auth.access_token_expiry(),
    }))
}

/// Logout endpoint handler
pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<MessageResponse>> {
    state.auth_service().logout(user.user_id).await?;

    Ok(Json(MessageResponse {
        message: "Logged out successfully".to_string(),
    }))
}

/// Profile endpoint handler
pub async fn profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<ProfileResponse>> {
    let (user, profile) = state.auth_service().profile(user.user_id).await?;

    Ok(Json(ProfileResponse {
        user: ProfileUser {
            id: user.id,
            email: user.email,
            email_verified: user.email_verified,
            is_active: user.is_active,
            created_at: user.created_at,
            profile: ProfileBody {
                username: profile.username,
                full_name: profile.full_name,
                avatar_url: profile.avatar_url,
                bio: profile.bio,
                location: profile.location,
                website: profile.website,
                preferences: profile.preferences,
            },
        },
    }))
}

/// Redirect to the Google consent screen
pub async fn google_login(State(state): State<AppState>) -> AppResult<Response> {
    let service = GoogleOAuthService::from_config(&state.config.oauth)
        .ok_or_else(|| AppError::Configuration("Google OAuth not configured".to_string()))?;

    let url = service.get_authorization_url(&GoogleOAuthService::new_state())?;
    Ok(Redirect::to(&url).into_response())
}

/// Google callback; the code exchange is disabled
pub async fn google_callback() -> AppError {
    AppError::ServiceUnavailable("OAuth temporarily disabled".to_string())
}
