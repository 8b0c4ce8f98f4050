//! Google OAuth login redirection

use reqwest::Url;
use uuid::Uuid;

use crate::config::OAuthConfig;
use crate::error::{AppError, AppResult};

const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Builds Google authorization redirects
#[derive(Clone)]
pub struct GoogleOAuthService {
    client_id: String,
    redirect_uri: String,
}

impl GoogleOAuthService {
    pub fn new(client_id: String, redirect_uri: String) -> Self {
        Self {
            client_id,
            redirect_uri,
        }
    }

    /// Service from config; `None` when no client id is set
    pub fn from_config(config: &OAuthConfig) -> Option<Self> {
        let client_id = config.google_client_id.clone().filter(|id| !id.is_empty())?;
        Some(Self::new(client_id, config.google_redirect_uri.clone()))
    }

    /// Generate the Google OAuth authorization URL
    pub fn get_authorization_url(&self, state: &str) -> AppResult<String> {
        let url = Url::parse_with_params(
            GOOGLE_AUTHORIZE_URL,
            &[
                ("response_type", "code"),
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("scope", "openid email profile"),
                ("state", state),
            ],
        )
        .map_err(|e| AppError::Configuration(format!("Invalid OAuth URL: {}", e)))?;

        Ok(url.into())
    }

    /// Random anti-forgery state value
    pub fn new_state() -> String {
        Uuid::new_v4().simple().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_url_encodes_params() {
        let service = GoogleOAuthService::new(
            "client-123".to_string(),
            "http://localhost:3000/auth/callback".to_string(),
        );
        let url = service.get_authorization_url("abc").unwrap();

        assert!(url.starts_with(GOOGLE_AUTHORIZE_URL));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fauth%2Fcallback"));
        assert!(url.contains("state=abc"));
    }

    #[test]
    fn test_missing_client_id_disables_oauth() {
        let config = OAuthConfig {
            google_client_id: None,
            google_redirect_uri: "http://localhost:3000/auth/callback".to_string(),
        };
        assert!(GoogleOAuthService::from_config(&config).is_none());

        let empty = OAuthConfig {
            google_client_id: Some(String::new()),
            ..config
        };
        assert!(GoogleOAuthService::from_config(&empty).is_none());
    }
}
