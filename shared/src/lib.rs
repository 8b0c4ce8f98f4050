//! Shared types and forecasting core for the Flame Prophet platform
//!
//! This crate holds the weather/forecast models, request validation and the
//! temperature forecasting pipeline used by the backend.

pub mod error;
pub mod forecast;
pub mod models;
pub mod types;
pub mod validation;

pub use error::*;
pub use models::*;
pub use types::*;
pub use validation::*;

/// Source label for generated (non-observed) current conditions
pub const SYNTHETIC_SOURCE: &str = "synthetic";
