//! Trained sequence model and its loader strategies
//!
//! The model is a `rust-lstm` network run over the scaled window one day at a
//! time, followed by a linear readout of the final hidden state. Artifacts are
//! tried against an ordered list of load strategies; the first one that
//! succeeds wins.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use ndarray::Array2;
use rust_lstm::layers::linear::LinearLayer;
use rust_lstm::models::lstm_network::LSTMNetwork;
use rust_lstm::persistence::{ModelMetadata, SavedModel, SerializableLSTMNetwork};
use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, PipelineResult};
use crate::forecast::extractor::ScaledTensor;
use crate::models::FEATURE_COUNT;

/// A trained model producing one scaled temperature per window
pub trait SequenceModel: Send + Sync {
    fn predict(&self, input: &ScaledTensor) -> PipelineResult<f64>;

    /// Human-readable description for the model info endpoint
    fn describe(&self) -> String;
}

/// Output activation of the readout layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Linear,
    Tanh,
    Sigmoid,
    Relu,
    // Activations that require an explicit custom-object registration
    Swish,
    Gelu,
    LeakyRelu,
    Softplus,
}

impl Activation {
    /// Activations every artifact may use without registration
    pub const BUILT_IN: [Activation; 4] = [
        Activation::Linear,
        Activation::Tanh,
        Activation::Sigmoid,
        Activation::Relu,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "linear" | "identity" => Some(Activation::Linear),
            "tanh" => Some(Activation::Tanh),
            "sigmoid" => Some(Activation::Sigmoid),
            "relu" => Some(Activation::Relu),
            "swish" | "silu" => Some(Activation::Swish),
            "gelu" => Some(Activation::Gelu),
            "leaky_relu" => Some(Activation::LeakyRelu),
            "softplus" => Some(Activation::Softplus),
            _ => None,
        }
    }

    pub fn is_built_in(&self) -> bool {
        Self::BUILT_IN.contains(self)
    }

    pub fn apply(&self, x: f64) -> f64 {
        match self {
            Activation::Linear => x,
            Activation::Tanh => x.tanh(),
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::Relu => x.max(0.0),
            Activation::Swish => x / (1.0 + (-x).exp()),
            Activation::Gelu => {
                let c = (2.0 / std::f64::consts::PI).sqrt();
                0.5 * x * (1.0 + (c * (x + 0.044715 * x.powi(3))).tanh())
            }
            Activation::LeakyRelu => {
                if x >= 0.0 {
                    x
                } else {
                    0.01 * x
                }
            }
            Activation::Softplus => x.exp().ln_1p(),
        }
    }
}

/// Stacked LSTM over the window with a readout of the last hidden state
///
/// Without a readout layer the first hidden unit is the prediction, which is
/// how networks trained with `LSTMTrainer` alone are read.
#[derive(Clone)]
pub struct LstmForecastModel {
    network: LSTMNetwork,
    readout: Option<LinearLayer>,
    activation: Activation,
}

impl LstmForecastModel {
    /// Wrap a network; shapes must already match the feature layout
    pub fn new(mut network: LSTMNetwork, readout: Option<LinearLayer>, activation: Activation) -> Self {
        network.eval();
        Self {
            network,
            readout,
            activation,
        }
    }
}

impl SequenceModel for LstmForecastModel {
    fn predict(&self, input: &ScaledTensor) -> PipelineResult<f64> {
        let [_, _, features] = input.shape();
        if features != self.network.input_size {
            return Err(ForecastError::ModelFailure(format!(
                "model expects {} features, got {}",
                self.network.input_size, features
            )));
        }

        // `forward` needs `&mut self`; each call runs on its own copy
        let mut network = self.network.clone();
        let mut hx = Array2::zeros((network.hidden_size, 1));
        let mut cx = Array2::zeros((network.hidden_size, 1));
        for step in input.timesteps() {
            let (hy, cy) = network.forward(&step, &hx, &cx);
            hx = hy;
            cx = cy;
        }

        let raw = match &self.readout {
            Some(layer) => layer.clone().forward(&hx)[[0, 0]],
            None => hx[[0, 0]],
        };
        let output = self.activation.apply(raw);
        if !output.is_finite() {
            return Err(ForecastError::ModelFailure(format!(
                "non-finite model output: {}",
                output
            )));
        }
        Ok(output)
    }

    fn describe(&self) -> String {
        format!(
            "lstm layers={} hidden={} readout={} activation={:?}",
            self.network.num_layers,
            self.network.hidden_size,
            if self.readout.is_some() { "linear" } else { "hidden[0]" },
            self.activation
        )
    }
}

/// Dense readout from the final hidden state to one value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadoutArtifact {
    /// One weight per hidden unit
    pub weights: Vec<f64>,
    pub bias: f64,
    #[serde(default = "default_activation")]
    pub activation: String,
}

fn default_activation() -> String {
    "linear".to_string()
}

/// JSON model artifact: a saved `rust-lstm` network plus an optional readout
#[derive(Serialize, Deserialize)]
pub struct ForecastModelArtifact {
    pub network: SerializableLSTMNetwork,
    /// Training metadata written by `ModelPersistence`; never needed for inference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readout: Option<ReadoutArtifact>,
    /// Metrics compiled in at training time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<serde_json::Value>,
}

impl ForecastModelArtifact {
    pub fn new(network: &LSTMNetwork, readout: Option<ReadoutArtifact>) -> Self {
        Self {
            network: network.into(),
            metadata: None,
            readout,
            metrics: None,
        }
    }
}

/// One way of interpreting a model artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStrategy {
    /// JSON artifact, metadata and metrics ignored, built-in activations only
    SkipMetricValidation,
    /// JSON artifact with the readout activation resolved from the custom-object table
    CustomObjects,
    /// Binary `rust-lstm` saved model with checked metadata, read from the first hidden unit
    Default,
}

impl LoadStrategy {
    pub const ORDERED: [LoadStrategy; 3] = [
        LoadStrategy::SkipMetricValidation,
        LoadStrategy::CustomObjects,
        LoadStrategy::Default,
    ];
}

impl fmt::Display for LoadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadStrategy::SkipMetricValidation => "skip_metric_validation",
            LoadStrategy::CustomObjects => "custom_objects",
            LoadStrategy::Default => "default",
        };
        write!(f, "{}", name)
    }
}

/// A successfully loaded model and the strategy that loaded it
#[derive(Clone)]
pub struct LoadedModel {
    pub model: Arc<dyn SequenceModel>,
    pub strategy: LoadStrategy,
}

impl fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModel")
            .field("model", &self.model.describe())
            .field("strategy", &self.strategy)
            .finish()
    }
}

/// Tries load strategies in order against a model artifact
#[derive(Debug, Clone)]
pub struct ModelLoader {
    strategies: Vec<LoadStrategy>,
    custom_activations: Vec<Activation>,
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self {
            strategies: LoadStrategy::ORDERED.to_vec(),
            custom_activations: Vec::new(),
        }
    }
}

impl ModelLoader {
    pub fn new(strategies: Vec<LoadStrategy>) -> Self {
        Self {
            strategies,
            custom_activations: Vec::new(),
        }
    }

    /// Register activations available to the custom-object strategy
    pub fn with_custom_activations(mut self, activations: Vec<Activation>) -> Self {
        self.custom_activations = activations;
        self
    }

    /// Read and load an artifact from disk
    pub fn load(&self, path: impl AsRef<Path>) -> PipelineResult<LoadedModel> {
        let path = path.as_ref();
        let content = std::fs::read(path).map_err(|e| ForecastError::ArtifactLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        self.load_from_bytes(&content).map_err(|reason| ForecastError::ArtifactLoad {
            path: path.display().to_string(),
            reason,
        })
    }

    pub fn load_from_str(&self, content: &str) -> Result<LoadedModel, String> {
        self.load_from_bytes(content.as_bytes())
    }

    /// Try each strategy in order; the error lists why every strategy failed
    pub fn load_from_bytes(&self, content: &[u8]) -> Result<LoadedModel, String> {
        let mut failures = Vec::with_capacity(self.strategies.len());

        for strategy in &self.strategies {
            match self.try_strategy(*strategy, content) {
                Ok(model) => {
                    tracing::info!(strategy = %strategy, model = %model.describe(), "Loaded sequence model");
                    return Ok(LoadedModel {
                        model: Arc::new(model),
                        strategy: *strategy,
                    });
                }
                Err(reason) => {
                    tracing::debug!(strategy = %strategy, reason = %reason, "Model load strategy failed");
                    failures.push(format!("{}: {}", strategy, reason));
                }
            }
        }

        if failures.is_empty() {
            return Err("no load strategies configured".to_string());
        }
        Err(failures.join("; "))
    }

    fn try_strategy(&self, strategy: LoadStrategy, content: &[u8]) -> Result<LstmForecastModel, String> {
        match strategy {
            LoadStrategy::SkipMetricValidation => {
                let artifact = parse_json(content)?;
                let activation = readout_activation(&artifact, |a| a.is_built_in())?;
                build_from_json(artifact, activation)
            }
            LoadStrategy::CustomObjects => {
                let artifact = parse_json(content)?;
                let activation = readout_activation(&artifact, |a| {
                    a.is_built_in() || self.custom_activations.contains(a)
                })?;
                build_from_json(artifact, activation)
            }
            LoadStrategy::Default => {
                let saved: SavedModel = bincode::deserialize(content)
                    .map_err(|e| format!("invalid binary artifact: {}", e))?;
                check_metadata(&saved.metadata)?;
                let network = restore_network(saved.network)?;
                Ok(LstmForecastModel::new(network, None, Activation::Linear))
            }
        }
    }
}

fn parse_json(content: &[u8]) -> Result<ForecastModelArtifact, String> {
    serde_json::from_slice(content).map_err(|e| format!("invalid JSON artifact: {}", e))
}

fn readout_activation(
    artifact: &ForecastModelArtifact,
    allowed: impl Fn(&Activation) -> bool,
) -> Result<Activation, String> {
    let name = match &artifact.readout {
        Some(readout) => readout.activation.as_str(),
        None => return Ok(Activation::Linear),
    };
    match Activation::from_name(name) {
        Some(activation) if allowed(&activation) => Ok(activation),
        Some(_) => Err(format!("activation '{}' is not registered", name)),
        None => Err(format!("unknown activation '{}'", name)),
    }
}

fn build_from_json(
    artifact: ForecastModelArtifact,
    activation: Activation,
) -> Result<LstmForecastModel, String> {
    let network = restore_network(artifact.network)?;
    let readout = artifact
        .readout
        .map(|r| build_readout(&r, network.hidden_size))
        .transpose()?;
    Ok(LstmForecastModel::new(network, readout, activation))
}

fn check_metadata(metadata: &ModelMetadata) -> Result<(), String> {
    if metadata.input_size != FEATURE_COUNT {
        return Err(format!(
            "metadata input size {} does not match {} features",
            metadata.input_size, FEATURE_COUNT
        ));
    }
    if metadata.final_loss.map_or(false, |loss| !loss.is_finite()) {
        return Err("metadata reports a non-finite training loss".to_string());
    }
    Ok(())
}

/// Rebuild the network and check every cell against the feature layout
fn restore_network(saved: SerializableLSTMNetwork) -> Result<LSTMNetwork, String> {
    // rust-lstm panics when an array's data does not fill its declared shape
    let network = panic::catch_unwind(AssertUnwindSafe(|| -> LSTMNetwork { saved.into() }))
        .map_err(|_| "network arrays do not match their declared shapes".to_string())?;

    if network.input_size != FEATURE_COUNT {
        return Err(format!(
            "network input size {} does not match {} features",
            network.input_size, FEATURE_COUNT
        ));
    }
    let cells = network.get_cells();
    if cells.is_empty() || cells.len() != network.num_layers {
        return Err(format!(
            "expected {} layers, found {} cells",
            network.num_layers,
            cells.len()
        ));
    }

    let hidden = network.hidden_size;
    for (i, cell) in cells.iter().enumerate() {
        let inputs = if i == 0 { network.input_size } else { hidden };
        let shapes_match = cell.hidden_size == hidden
            && cell.w_ih.dim() == (4 * hidden, inputs)
            && cell.w_hh.dim() == (4 * hidden, hidden)
            && cell.b_ih.dim() == (4 * hidden, 1)
            && cell.b_hh.dim() == (4 * hidden, 1);
        if !shapes_match {
            return Err(format!("layer {} weights do not match hidden size {}", i, hidden));
        }
        let finite = [&cell.w_ih, &cell.w_hh, &cell.b_ih, &cell.b_hh]
            .iter()
            .all(|a| a.iter().all(|v| v.is_finite()));
        if !finite {
            return Err(format!("layer {} contains non-finite parameters", i));
        }
    }

    Ok(network)
}

fn build_readout(readout: &ReadoutArtifact, hidden: usize) -> Result<LinearLayer, String> {
    if readout.weights.len() != hidden {
        return Err(format!(
            "readout has {} weights for {} hidden units",
            readout.weights.len(),
            hidden
        ));
    }
    if !readout.bias.is_finite() || readout.weights.iter().any(|w| !w.is_finite()) {
        return Err("readout contains non-finite parameters".to_string());
    }
    let weight = Array2::from_shape_vec((1, hidden), readout.weights.clone())
        .map_err(|e| format!("invalid readout weights: {}", e))?;
    Ok(LinearLayer::from_weights(weight, Array2::from_elem((1, 1), readout.bias)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WINDOW_DAYS;
    use rust_lstm::persistence::ModelPersistence;

    const HIDDEN: usize = 4;

    fn json_artifact(activation: &str, bias: f64) -> String {
        let network = LSTMNetwork::new(FEATURE_COUNT, HIDDEN, 1);
        let mut artifact = ForecastModelArtifact::new(
            &network,
            Some(ReadoutArtifact {
                weights: vec![0.0; HIDDEN],
                bias,
                activation: activation.to_string(),
            }),
        );
        artifact.metrics = Some(serde_json::json!({"mae": "custom_mae_fn"}));
        serde_json::to_string(&artifact).unwrap()
    }

    fn ones() -> ScaledTensor {
        ScaledTensor {
            values: Array2::ones((WINDOW_DAYS, FEATURE_COUNT)),
        }
    }

    #[test]
    fn test_first_strategy_loads_builtin_activation() {
        let loaded = ModelLoader::default()
            .load_from_str(&json_artifact("linear", 0.5))
            .unwrap();
        assert_eq!(loaded.strategy, LoadStrategy::SkipMetricValidation);
        assert!((loaded.model.predict(&ones()).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_saved_model_json_loads_without_readout() {
        let network = LSTMNetwork::new(FEATURE_COUNT, HIDDEN, 2);
        let saved = ModelPersistence::create_saved_model(
            &network,
            "flame-lstm".to_string(),
            50,
            Some(0.02),
            None,
        );
        let content = serde_json::to_string(&saved).unwrap();

        let loaded = ModelLoader::default().load_from_str(&content).unwrap();
        assert_eq!(loaded.strategy, LoadStrategy::SkipMetricValidation);
        // Read straight from a tanh-bounded hidden unit
        let prediction = loaded.model.predict(&ones()).unwrap();
        assert!(prediction.abs() < 1.0);
    }

    #[test]
    fn test_custom_activation_needs_registration() {
        let content = json_artifact("swish", 0.0);
        assert!(ModelLoader::default().load_from_str(&content).is_err());

        let loader = ModelLoader::default().with_custom_activations(vec![Activation::Swish]);
        let loaded = loader.load_from_str(&content).unwrap();
        assert_eq!(loaded.strategy, LoadStrategy::CustomObjects);
    }

    #[test]
    fn test_binary_saved_model_uses_default_strategy() {
        let network = LSTMNetwork::new(FEATURE_COUNT, HIDDEN, 1);
        let saved = ModelPersistence::create_saved_model(&network, "flame-lstm".into(), 10, None, None);
        let bytes = bincode::serialize(&saved).unwrap();

        let loaded = ModelLoader::default().load_from_bytes(&bytes).unwrap();
        assert_eq!(loaded.strategy, LoadStrategy::Default);
        assert!(loaded.model.predict(&ones()).unwrap().is_finite());
    }

    #[test]
    fn test_all_strategies_failing_reports_each() {
        let err = ModelLoader::default().load_from_str("not a model").unwrap_err();
        assert!(err.contains("skip_metric_validation"));
        assert!(err.contains("custom_objects"));
        assert!(err.contains("default"));
    }

    #[test]
    fn test_wrong_feature_count_is_rejected() {
        let network = LSTMNetwork::new(6, HIDDEN, 1);
        let content = serde_json::to_string(&ForecastModelArtifact::new(&network, None)).unwrap();
        let err = ModelLoader::default().load_from_str(&content).unwrap_err();
        assert!(err.contains("network input size 6"));
    }

    #[test]
    fn test_readout_width_must_match_hidden_size() {
        let network = LSTMNetwork::new(FEATURE_COUNT, HIDDEN, 1);
        let readout = ReadoutArtifact {
            weights: vec![0.1; HIDDEN + 1],
            bias: 0.0,
            activation: "linear".to_string(),
        };
        let content = serde_json::to_string(&ForecastModelArtifact::new(&network, Some(readout))).unwrap();
        assert!(ModelLoader::default().load_from_str(&content).is_err());
    }

    #[test]
    fn test_truncated_arrays_fail_instead_of_panicking() {
        let network = LSTMNetwork::new(FEATURE_COUNT, HIDDEN, 1);
        let mut value = serde_json::to_value(ForecastModelArtifact::new(&network, None)).unwrap();
        value["network"]["cells"][0]["w_ih"]["data"] = serde_json::json!([0.1, 0.2]);

        let err = ModelLoader::default().load_from_str(&value.to_string()).unwrap_err();
        assert!(err.contains("declared shapes"));
    }

    #[test]
    fn test_non_finite_output_is_model_failure() {
        let network = LSTMNetwork::new(FEATURE_COUNT, HIDDEN, 1);
        let readout = LinearLayer::from_weights(
            Array2::zeros((1, HIDDEN)),
            Array2::from_elem((1, 1), f64::MAX),
        );
        let model = LstmForecastModel::new(network, Some(readout), Activation::Softplus);
        let err = model.predict(&ones()).unwrap_err();
        assert!(matches!(err, ForecastError::ModelFailure(_)));
    }

    #[test]
    fn test_activation_names() {
        assert_eq!(Activation::from_name("SiLU"), Some(Activation::Swish));
        assert_eq!(Activation::from_name("mystery"), None);
        assert!(Activation::Relu.is_built_in());
        assert!(!Activation::Gelu.is_built_in());
    }
}
