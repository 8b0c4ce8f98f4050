//! Authentication service for user registration, login, and token management

use std::sync::Arc;

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use shared::{Profile, Session, SessionStatus, User};

use crate::config::JwtConfig;
use crate::error::{AppError, AppResult};
use crate::services::UserStore;

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    jwt_secret: String,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
    bcrypt_cost: u32,
}

/// Input for registering a new account
#[derive(Debug, Deserialize)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub username: String,
    pub full_name: Option<String>,
}

/// Kind of JWT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,
    pub exp: i64,
    pub iat: i64,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Unique token id so two logins in the same second get distinct tokens
    pub jti: String,
}

/// Tokens issued at login
#[derive(Debug)]
pub struct LoginOutcome {
    pub user_id: Uuid,
    pub email: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(users: Arc<dyn UserStore>, jwt: &JwtConfig) -> Self {
        Self {
            users,
            jwt_secret: jwt.secret.clone(),
            access_token_expiry: jwt.access_token_expiry,
            refresh_token_expiry: jwt.refresh_token_expiry,
            bcrypt_cost: DEFAULT_COST,
        }
    }

    /// Override the bcrypt work factor
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    pub fn access_token_expiry(&self) -> i64 {
        self.access_token_expiry
    }

    /// Register a new account with its profile
    pub async fn register(&self, input: RegisterInput) -> AppResult<Uuid> {
        let email = input.email.trim().to_string();
        let username = input.username.trim().to_string();

        shared::validate_email(&email).map_err(|e| AppError::bad_request("Invalid email", e))?;
        shared::validate_password(&input.password)
            .map_err(|e| AppError::bad_request("Invalid password", e))?;
        shared::validate_username(&username)
            .map_err(|e| AppError::bad_request("Invalid username", e))?;

        if self.users.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }
        if self.users.username_taken(&username).await? {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }

        let password_hash = self.hash_password(input.password).await?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email,
            password_hash,
            email_verified: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let profile = Profile {
            username,
            full_name: input.full_name.unwrap_or_default(),
            ..Default::default()
        };

        self.users.create_user(&user, &profile).await?;
        tracing::info!(user_id = %user.id, "Registered new user");

        Ok(user.id)
    }

    /// Authenticate user with email and password
    pub async fn login(&self, email: &str, password: &str, ip_address: &str) -> AppResult<LoginOutcome> {
        let user = self
            .users
            .find_user_by_email(email.trim())
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

        if !user.is_active {
            return Err(AppError::Forbidden("Account is deactivated".to_string()));
        }

        if !self.verify_password(password.to_string(), user.password_hash.clone()).await? {
            return Err(AppError::Unauthorized("Invalid credentials".to_string()));
        }

        let access_token = self.issue_token(user.id, TokenType::Access)?;
        let refresh_token = self.issue_token(user.id, TokenType::Refresh)?;

        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4(),
            user_id: user.id,
            session_token: Uuid::new_v4().to_string(),
            refresh_token_hash: Self::hash_token(&refresh_token),
            ip_address: ip_address.to_string(),
            expires_at: now + Duration::seconds(self.refresh_token_expiry),
            status: SessionStatus::Active,
            revoked_at: None,
        };
        self.users.create_session(&session).await?;
        self.users.touch_last_seen(user.id, now).await?;

        tracing::info!(user_id = %user.id, "User logged in");

        Ok(LoginOutcome {
            user_id: user.id,
            email: user.email,
            access_token,
            refresh_token,
            expires_in: self.access_token_expiry,
        })
    }

    /// Issue a new access token for a refresh token held by an active session
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<String> {
        let claims = self.decode_claims(refresh_token).map_err(|kind| match kind {
            ErrorKind::ExpiredSignature => AppError::Unauthorized("Refresh token expired".to_string()),
            _ => AppError::Unauthorized("Invalid refresh token".to_string()),
        })?;

        if claims.token_type != TokenType::Refresh {
            return Err(AppError::Unauthorized("Invalid refresh token".to_string()));
        }

        let user_id = Uuid::parse_str(&claims.user_id)
            .map_err(|_| AppError::Unauthorized("Invalid refresh token".to_string()))?;

        if !self
            .users
            .has_active_session(user_id, &Self::hash_token(refresh_token))
            .await?
        {
            return Err(AppError::Unauthorized("Invalid refresh token".to_string()));
        }

        self.issue_token(user_id, TokenType::Access)
    }

    /// Revoke every active session of the user
    pub async fn logout(&self, user_id: Uuid) -> AppResult<u64> {
        let revoked = self.users.revoke_sessions(user_id, Utc::now()).await?;
        tracing::info!(user_id = %user_id, revoked, "User logged out");
        Ok(revoked)
    }

    /// User record and profile (empty when the profile row is missing)
    pub async fn profile(&self, user_id: Uuid) -> AppResult<(User, Profile)> {
        let user = self
            .users
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        let profile = self.users.find_profile(user_id).await?.unwrap_or_default();
        Ok((user, profile))
    }

    /// Validate an access token and return its user id
    pub fn validate_access_token(&self, token: &str) -> AppResult<Uuid> {
        let claims = self.decode_claims(token).map_err(|kind| match kind {
            ErrorKind::ExpiredSignature => AppError::Unauthorized("Token expired".to_string()),
            _ => AppError::Unauthorized("Invalid token".to_string()),
        })?;

        if claims.token_type != TokenType::Access {
            return Err(AppError::Unauthorized("Invalid token".to_string()));
        }

        Uuid::parse_str(&claims.user_id).map_err(|_| AppError::Unauthorized("Invalid token".to_string()))
    }

    /// Create a signed HS256 token
    pub fn issue_token(&self, user_id: Uuid, token_type: TokenType) -> AppResult<String> {
        let lifetime = match token_type {
            TokenType::Access => self.access_token_expiry,
            TokenType::Refresh => self.refresh_token_expiry,
        };
        let now = Utc::now();
        self.encode_claims(&Claims {
            user_id: user_id.to_string(),
            exp: (now + Duration::seconds(lifetime)).timestamp(),
            iat: now.timestamp(),
            token_type,
            jti: Uuid::new_v4().to_string(),
        })
    }

    fn encode_claims(&self, claims: &Claims) -> AppResult<String> {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    fn decode_claims(&self, token: &str) -> Result<Claims, ErrorKind> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| e.into_kind())
    }

    async fn hash_password(&self, password: String) -> AppResult<String> {
        let cost = self.bcrypt_cost;
        tokio::task::spawn_blocking(move || hash(password, cost))
            .await
            .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
    }

    async fn verify_password(&self, password: String, password_hash: String) -> AppResult<bool> {
        tokio::task::spawn_blocking(move || verify(password, &password_hash))
            .await
            .map_err(|e| AppError::Internal(format!("Password verification task failed: {}", e)))?
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
    }

    /// Hash a token for storage
    fn hash_token(token: &str) -> String {
        format!("{:x}", Sha256::digest(token.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MemoryUserStore;

    fn service() -> AuthService {
        let jwt = JwtConfig {
            secret: "test-secret".to_string(),
            access_token_expiry: 14400,
            refresh_token_expiry: 2_592_000,
        };
        AuthService::new(Arc::new(MemoryUserStore::new()), &jwt).with_bcrypt_cost(4)
    }

    fn input(email: &str, username: &str) -> RegisterInput {
        RegisterInput {
            email: email.to_string(),
            password: "correct horse".to_string(),
            username: username.to_string(),
            full_name: Some("Test User".to_string()),
        }
    }

    #[tokio::test]
    async fn test_register_login_refresh_logout() {
        let auth = service();
        let user_id = auth.register(input("ana@example.com", "ana")).await.unwrap();

        let login = auth.login("ana@example.com", "correct horse", "127.0.0.1").await.unwrap();
        assert_eq!(login.user_id, user_id);
        assert_eq!(auth.validate_access_token(&login.access_token).unwrap(), user_id);

        let access = auth.refresh(&login.refresh_token).await.unwrap();
        assert_eq!(auth.validate_access_token(&access).unwrap(), user_id);

        assert_eq!(auth.logout(user_id).await.unwrap(), 1);
        let err = auth.refresh(&login.refresh_token).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid refresh token");
    }

    #[tokio::test]
    async fn test_new_accounts_are_unverified() {
        let auth = service();
        let user_id = auth.register(input("ana@example.com", "ana")).await.unwrap();
        let (user, profile) = auth.profile(user_id).await.unwrap();
        assert!(!user.email_verified);
        assert!(user.is_active);
        assert_eq!(profile.full_name, "Test User");
    }

    #[tokio::test]
    async fn test_duplicates_are_conflicts() {
        let auth = service();
        auth.register(input("ana@example.com", "ana")).await.unwrap();

        let email = auth.register(input("ana@example.com", "other")).await.unwrap_err();
        assert_eq!(email.to_string(), "Email already registered");

        let username = auth.register(input("bo@example.com", "ana")).await.unwrap_err();
        assert_eq!(username.to_string(), "Username already taken");
    }

    #[tokio::test]
    async fn test_bad_password_is_invalid_credentials() {
        let auth = service();
        auth.register(input("ana@example.com", "ana")).await.unwrap();
        let err = auth.login("ana@example.com", "wrong password", "ip").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == "Invalid credentials"));
    }

    #[test]
    fn test_access_token_rejected_as_refresh_and_vice_versa() {
        let auth = service();
        let user_id = Uuid::new_v4();
        let refresh = auth.issue_token(user_id, TokenType::Refresh).unwrap();
        assert_eq!(
            auth.validate_access_token(&refresh).unwrap_err().to_string(),
            "Invalid token"
        );
    }

    #[test]
    fn test_expired_token_message() {
        let auth = service();
        let past = Utc::now() - Duration::hours(2);
        let token = auth
            .encode_claims(&Claims {
                user_id: Uuid::new_v4().to_string(),
                exp: past.timestamp(),
                iat: (past - Duration::hours(1)).timestamp(),
                token_type: TokenType::Access,
                jti: Uuid::new_v4().to_string(),
            })
            .unwrap();
        assert_eq!(
            auth.validate_access_token(&token).unwrap_err().to_string(),
            "Token expired"
        );
    }

    #[test]
    fn test_token_hash_is_stable_hex() {
        let hash = AuthService::hash_token("abc");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, AuthService::hash_token("abc"));
    }
}
