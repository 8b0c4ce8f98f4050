//! Wildfire image classifier client
//!
//! The forward pass runs on a remote model-serving endpoint. The image is sent
//! base64-encoded and the endpoint answers with a single wildfire score.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::ClassifierConfig;
use crate::error::{AppError, AppResult};

/// Produces a wildfire score in [0, 1] for an image
#[async_trait]
pub trait ImageClassifier: Send + Sync {
    async fn classify(&self, image: &[u8]) -> AppResult<f64>;
}

/// Client for the remote classifier
#[derive(Clone)]
pub struct RemoteImageClassifier {
    api_endpoint: String,
    api_key: Option<String>,
    http_client: Client,
}

#[derive(Debug, Serialize)]
struct ClassifyRequest {
    image_base64: String,
}

#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    score: f64,
}

impl RemoteImageClassifier {
    pub fn new(api_endpoint: String, api_key: Option<String>, http_client: Client) -> Self {
        Self {
            api_endpoint,
            api_key,
            http_client,
        }
    }

    /// Client from config; `None` when no endpoint is configured
    pub fn from_config(config: &ClassifierConfig) -> AppResult<Option<Self>> {
        let Some(endpoint) = config.endpoint.clone().filter(|e| !e.is_empty()) else {
            return Ok(None);
        };
        let http_client = super::http_client(std::time::Duration::from_secs(config.timeout_secs))?;
        Ok(Some(Self::new(endpoint, config.api_key.clone(), http_client)))
    }
}

#[async_trait]
impl ImageClassifier for RemoteImageClassifier {
    async fn classify(&self, image: &[u8]) -> AppResult<f64> {
        let mut request = self
            .http_client
            .post(&self.api_endpoint)
            .header("Content-Type", "application/json")
            .json(&ClassifyRequest {
                image_base64: STANDARD.encode(image),
            });
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::ClassificationFailed(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ClassificationFailed(format!(
                "API returned {}: {}",
                status, body
            )));
        }

        let result: ClassifyResponse = response
            .json()
            .await
            .map_err(|e| AppError::ClassificationFailed(format!("Failed to parse response: {}", e)))?;

        if !result.score.is_finite() {
            return Err(AppError::ClassificationFailed(format!(
                "non-finite score {}",
                result.score
            )));
        }

        Ok(result.score)
    }
}
