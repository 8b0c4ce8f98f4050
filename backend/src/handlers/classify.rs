//! Wildfire image classification handler

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::AppState;

const ALLOWED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

#[derive(Debug, Serialize, PartialEq)]
pub struct ClassificationResponse {
    pub is_wildfire: bool,
    pub confidence: f64,
    pub classification: String,
}

impl ClassificationResponse {
    pub fn from_score(score: f64, threshold: f64) -> Self {
        let is_wildfire = score >= threshold;
        Self {
            is_wildfire,
            confidence: score,
            classification: if is_wildfire { "wildfire" } else { "no_wildfire" }.to_string(),
        }
    }
}

fn has_allowed_extension(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn no_image() -> AppError {
    AppError::bad_request("No image file provided", "Please upload a satellite image file")
}

/// Classify an uploaded image as wildfire or not
pub async fn classify(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<ClassificationResponse>> {
    let classifier = state
        .classifier
        .clone()
        .ok_or_else(|| AppError::ModelNotLoaded("CNN model is not available".to_string()))?;

    let mut multipart = multipart.map_err(|_| no_image())?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request("Invalid upload", e.to_string()))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::bad_request("Invalid upload", e.to_string()))?;
        upload = Some((filename, bytes));
        break;
    }

    let (filename, bytes) = upload.ok_or_else(no_image)?;

    if filename.is_empty() {
        return Err(AppError::bad_request("No file selected", "Please select an image file"));
    }
    if !has_allowed_extension(&filename) {
        return Err(AppError::bad_request(
            "Invalid file type",
            "Please upload PNG, JPG, or JPEG only",
        ));
    }

    let score = classifier.classify(&bytes).await?;
    let response = ClassificationResponse::from_score(score, state.config.classifier.threshold);

    tracing::info!(
        filename = %filename,
        score,
        classification = %response.classification,
        "Image classified"
    );

    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_check() {
        assert!(has_allowed_extension("fire.PNG"));
        assert!(has_allowed_extension("scene.tile.jpeg"));
        assert!(!has_allowed_extension("fire.gif"));
        assert!(!has_allowed_extension("noextension"));
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let at = ClassificationResponse::from_score(0.5, 0.5);
        assert!(at.is_wildfire);
        assert_eq!(at.classification, "wildfire");

        let below = ClassificationResponse::from_score(0.49, 0.5);
        assert!(!below.is_wildfire);
        assert_eq!(below.classification, "no_wildfire");
    }
}
