//! End-to-end prediction: window → features → scaler → model → inverse → synthesis

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;

use crate::error::{ForecastError, PipelineResult};
use crate::forecast::assembler::ResponseAssembler;
use crate::forecast::extractor::FeatureExtractor;
use crate::forecast::inverse::InverseTransformer;
use crate::forecast::model::SequenceModel;
use crate::forecast::scaler::FittedScaler;
use crate::forecast::synthesizer::{ForecastSynthesizer, SynthesisInput};
use crate::models::{
    ArrayForecastRequest, BatchItem, BatchItemResult, ForecastRequest, ForecastResponse,
    ForecastResult, HistoryWindow, WeatherParameter,
};
use crate::types::ModelStatus;

/// Days averaged when the model cannot produce a prediction
const FALLBACK_MEAN_DAYS: usize = 3;

/// Next-day temperature and whether the model produced it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NextDayPrediction {
    pub temperature: f64,
    pub status: ModelStatus,
}

/// A completed seven-day forecast before wire serialisation
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineForecast {
    pub result: ForecastResult,
    pub model_status: ModelStatus,
    pub data_points_used: usize,
}

impl PipelineForecast {
    pub fn into_response(self, timestamp: DateTime<Utc>) -> ForecastResponse {
        ForecastResponse {
            forecast: self.result,
            unit: "celsius".to_string(),
            confidence: self.model_status.confidence(),
            model_status: self.model_status,
            timestamp,
            data_points_used: self.data_points_used,
        }
    }
}

/// Stateless prediction service over a borrowed model and scaler
#[derive(Clone, Copy)]
pub struct PredictionService<'a> {
    model: Option<&'a dyn SequenceModel>,
    scaler: &'a FittedScaler,
}

impl<'a> PredictionService<'a> {
    pub fn new(model: Option<&'a dyn SequenceModel>, scaler: &'a FittedScaler) -> Self {
        Self { model, scaler }
    }

    /// Predict tomorrow's temperature, falling back to the recent mean
    pub fn predict_next_day(&self, window: &HistoryWindow) -> NextDayPrediction {
        match self.model_temperature(window) {
            Ok(temperature) => NextDayPrediction {
                temperature,
                status: ModelStatus::Loaded,
            },
            Err(e) => {
                tracing::warn!(error = %e, "Model prediction unavailable, using recent mean temperature");
                NextDayPrediction {
                    temperature: recent_mean_temperature(window),
                    status: ModelStatus::Fallback,
                }
            }
        }
    }

    fn model_temperature(&self, window: &HistoryWindow) -> PipelineResult<f64> {
        let model = self
            .model
            .ok_or_else(|| ForecastError::ModelUnavailable("no sequence model loaded".to_string()))?;

        let features = FeatureExtractor::extract(window);
        let scaled = self.scaler.transform(&features);
        let prediction = model.predict(&scaled)?;
        if !prediction.is_finite() {
            return Err(ForecastError::ModelFailure(format!(
                "non-finite prediction {}",
                prediction
            )));
        }

        Ok(InverseTransformer::new(self.scaler).temperature(prediction))
    }

    /// Seven-day forecast for the named-field request
    pub fn forecast<R: Rng + ?Sized>(
        &self,
        request: &ForecastRequest,
        rng: &mut R,
    ) -> PipelineResult<PipelineForecast> {
        let window = HistoryWindow::from_days(&request.data)?;
        let anchor = request
            .current_temp
            .filter(|t| t.is_finite())
            .unwrap_or_else(|| window.last_temperature());
        Ok(self.run(&window, anchor, &ForecastSynthesizer::standard(), rng))
    }

    /// Seven-day forecast for the array-form request, anchored on the last day
    pub fn forecast_lstm<R: Rng + ?Sized>(
        &self,
        request: &ArrayForecastRequest,
        rng: &mut R,
    ) -> PipelineResult<PipelineForecast> {
        let window = HistoryWindow::from_rows(&request.data)?;
        let anchor = window.last_temperature();
        Ok(self.run(&window, anchor, &ForecastSynthesizer::lstm(), rng))
    }

    fn run<R: Rng + ?Sized>(
        &self,
        window: &HistoryWindow,
        anchor: f64,
        synthesizer: &ForecastSynthesizer,
        rng: &mut R,
    ) -> PipelineForecast {
        let next_day = self.predict_next_day(window);
        tracing::debug!(
            variant = synthesizer.params().name,
            model_temp = next_day.temperature,
            anchor,
            "Synthesizing forecast"
        );

        let week = synthesizer.synthesize(
            SynthesisInput {
                raw_model_temp: next_day.temperature,
                anchor_temp: anchor,
                window,
                start_date: start_date(window),
            },
            rng,
        );

        PipelineForecast {
            result: ResponseAssembler::assemble(week.days, week.trend.raw),
            model_status: next_day.status,
            data_points_used: window.len(),
        }
    }

    /// Independent next-day predictions; a failing item never aborts the batch
    pub fn predict_batch(&self, items: &[BatchItem]) -> PipelineResult<Vec<BatchItemResult>> {
        if items.is_empty() {
            return Err(ForecastError::InvalidInput("No batches provided".to_string()));
        }

        Ok(items
            .iter()
            .map(|item| match HistoryWindow::from_days(&item.data) {
                Ok(window) => {
                    let prediction = self.predict_next_day(&window);
                    BatchItemResult::succeeded(item.id.clone(), prediction.temperature)
                }
                Err(e) => BatchItemResult::failed(item.id.clone(), e.to_string()),
            })
            .collect())
    }
}

/// Mean of the last three observed temperatures
pub fn recent_mean_temperature(window: &HistoryWindow) -> f64 {
    let recent = window.recent(FALLBACK_MEAN_DAYS);
    if recent.is_empty() {
        return WeatherParameter::Temperature.default_value();
    }
    recent
        .iter()
        .map(|d| d.value(WeatherParameter::Temperature))
        .sum::<f64>()
        / recent.len() as f64
}

/// Forecast day 1 follows the last dated observation, or today when undated
fn start_date(window: &HistoryWindow) -> NaiveDate {
    window.last_date().unwrap_or_else(|| Utc::now().date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::extractor::ScaledTensor;
    use crate::models::{WeatherDay, WINDOW_DAYS};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct FixedModel(f64);

    impl SequenceModel for FixedModel {
        fn predict(&self, _input: &ScaledTensor) -> PipelineResult<f64> {
            Ok(self.0)
        }

        fn describe(&self) -> String {
            "fixed".to_string()
        }
    }

    struct BrokenModel;

    impl SequenceModel for BrokenModel {
        fn predict(&self, _input: &ScaledTensor) -> PipelineResult<f64> {
            Err(ForecastError::ModelFailure("tensor shape".to_string()))
        }

        fn describe(&self) -> String {
            "broken".to_string()
        }
    }

    fn days(n: usize) -> Vec<WeatherDay> {
        (0..n)
            .map(|i| WeatherDay {
                t2m: Some(20.0 + i as f64),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_model_prediction_is_inverse_transformed() {
        let model = FixedModel(0.2);
        let scaler = FittedScaler::NoScaler;
        let service = PredictionService::new(Some(&model), &scaler);
        let window = HistoryWindow::from_days(&days(WINDOW_DAYS)).unwrap();

        let prediction = service.predict_next_day(&window);
        assert_eq!(prediction.status, ModelStatus::Loaded);
        assert_eq!(prediction.temperature, 30.0);
    }

    #[test]
    fn test_missing_model_uses_recent_mean() {
        let scaler = FittedScaler::NoScaler;
        let service = PredictionService::new(None, &scaler);
        let window = HistoryWindow::from_days(&days(WINDOW_DAYS)).unwrap();

        let prediction = service.predict_next_day(&window);
        assert_eq!(prediction.status, ModelStatus::Fallback);
        assert_eq!(prediction.temperature, 32.0);
    }

    #[test]
    fn test_failing_model_uses_recent_mean() {
        let model = BrokenModel;
        let scaler = FittedScaler::NoScaler;
        let service = PredictionService::new(Some(&model), &scaler);
        let window = HistoryWindow::from_days(&days(WINDOW_DAYS)).unwrap();
        assert_eq!(service.predict_next_day(&window).status, ModelStatus::Fallback);
    }

    #[test]
    fn test_forecast_rejects_short_window() {
        let scaler = FittedScaler::NoScaler;
        let service = PredictionService::new(None, &scaler);
        let request = ForecastRequest {
            data: days(10),
            current_temp: None,
        };
        let err = service.forecast(&request, &mut StdRng::seed_from_u64(0)).unwrap_err();
        assert_eq!(err, ForecastError::ShapeMismatch { expected: 14, actual: 10 });
    }

    #[test]
    fn test_forecast_response_fields() {
        let model = FixedModel(0.2);
        let scaler = FittedScaler::NoScaler;
        let service = PredictionService::new(Some(&model), &scaler);
        let request = ForecastRequest {
            data: days(WINDOW_DAYS),
            current_temp: Some(30.0),
        };
        let forecast = service.forecast(&request, &mut StdRng::seed_from_u64(5)).unwrap();
        assert_eq!(forecast.data_points_used, 14);
        assert_eq!(forecast.result.predictions.len(), 7);
        assert!((forecast.result.predictions[0].temperature - 30.0).abs() < 1e-9);

        let response = forecast.into_response(Utc::now());
        assert_eq!(response.unit, "celsius");
        assert_eq!(response.confidence, 0.85);
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("predictions").is_some());
        assert_eq!(json["model_status"], "loaded");
    }

    #[test]
    fn test_lstm_forecast_uses_last_fourteen_rows() {
        let scaler = FittedScaler::NoScaler;
        let service = PredictionService::new(None, &scaler);
        let rows: Vec<Vec<f64>> = (0..20)
            .map(|i| vec![25.0 + (i % 2) as f64, 20.0, 30.0, 70.0, 3.0, 180.0, 1010.0, 0.0, 200.0, 5.0])
            .collect();
        let forecast = service
            .forecast_lstm(&ArrayForecastRequest { data: rows }, &mut StdRng::seed_from_u64(2))
            .unwrap();
        assert_eq!(forecast.model_status, ModelStatus::Fallback);
        for day in &forecast.result.predictions {
            assert!((22.0..=38.0).contains(&day.temperature));
        }
    }

    #[test]
    fn test_empty_batch_is_rejected() {
        let scaler = FittedScaler::NoScaler;
        let service = PredictionService::new(None, &scaler);
        assert!(service.predict_batch(&[]).unwrap_err().is_input_error());
    }
}
