//! Temperature forecasting core

pub mod assembler;
pub mod extractor;
pub mod inverse;
pub mod model;
pub mod pipeline;
pub mod registry;
pub mod scaler;
pub mod synthesizer;

pub use assembler::ResponseAssembler;
pub use extractor::{FeatureExtractor, FeatureTensor, ScaledTensor};
pub use inverse::{fallback_affine, InversePath, InverseTransformer};
pub use model::{
    Activation, ForecastModelArtifact, LoadStrategy, LoadedModel, LstmForecastModel, ModelLoader,
    ReadoutArtifact, SequenceModel,
};
pub use pipeline::{NextDayPrediction, PipelineForecast, PredictionService};
pub use registry::ModelHandle;
pub use scaler::{FittedScaler, ScalerArtifact};
pub use synthesizer::{ForecastSynthesizer, SynthesisInput, SynthesisParams, TrendEstimate};
