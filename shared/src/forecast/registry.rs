//! Process-wide model and scaler handle
//!
//! Both artifacts are loaded at most once. Concurrent first callers block on
//! the same initialisation instead of loading twice.

use std::path::PathBuf;
use std::sync::OnceLock;

use crate::forecast::model::{LoadStrategy, LoadedModel, ModelLoader};
use crate::forecast::pipeline::PredictionService;
use crate::forecast::scaler::FittedScaler;
use crate::types::ModelStatus;

pub struct ModelHandle {
    model_path: Option<PathBuf>,
    scaler_path: Option<PathBuf>,
    loader: ModelLoader,
    model: OnceLock<Option<LoadedModel>>,
    scaler: OnceLock<FittedScaler>,
}

impl ModelHandle {
    /// Lazily load artifacts from the given paths on first use
    pub fn new(model_path: impl Into<PathBuf>, scaler_path: impl Into<PathBuf>, loader: ModelLoader) -> Self {
        Self {
            model_path: Some(model_path.into()),
            scaler_path: Some(scaler_path.into()),
            loader,
            model: OnceLock::new(),
            scaler: OnceLock::new(),
        }
    }

    /// Handle with artifacts already in memory
    pub fn preloaded(model: Option<LoadedModel>, scaler: FittedScaler) -> Self {
        Self {
            model_path: None,
            scaler_path: None,
            loader: ModelLoader::default(),
            model: OnceLock::from(model),
            scaler: OnceLock::from(scaler),
        }
    }

    /// The loaded model, or `None` when every load strategy failed
    pub fn model(&self) -> Option<&LoadedModel> {
        self.model
            .get_or_init(|| {
                let path = self.model_path.as_ref()?;
                match self.loader.load(path) {
                    Ok(loaded) => Some(loaded),
                    Err(e) => {
                        tracing::warn!(error = %e, "Sequence model unavailable, forecasts will use fallback");
                        None
                    }
                }
            })
            .as_ref()
    }

    pub fn scaler(&self) -> &FittedScaler {
        self.scaler.get_or_init(|| match &self.scaler_path {
            Some(path) => FittedScaler::load(path),
            None => FittedScaler::NoScaler,
        })
    }

    /// Force both artifacts to load
    pub fn warm_up(&self) {
        let _ = self.model();
        let _ = self.scaler();
    }

    pub fn status(&self) -> ModelStatus {
        if self.model().is_some() {
            ModelStatus::Loaded
        } else {
            ModelStatus::Fallback
        }
    }

    pub fn strategy(&self) -> Option<LoadStrategy> {
        self.model().map(|m| m.strategy)
    }

    pub fn predictor(&self) -> PredictionService<'_> {
        PredictionService::new(self.model().map(|m| &*m.model), self.scaler())
    }
}
