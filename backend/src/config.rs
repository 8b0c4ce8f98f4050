//! Configuration management for the Flame Prophet backend
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with FLAME_ prefix (e.g. FLAME__SERVER__PORT)

use std::time::Duration;

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::forecast::{Activation, ModelLoader};

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    pub server: ServerConfig,

    pub database: DatabaseConfig,

    pub jwt: JwtConfig,

    /// Forecasting model artifacts
    pub models: ModelsConfig,

    /// Remote wildfire image classifier
    pub classifier: ClassifierConfig,

    /// Historical and current weather providers
    pub weather: WeatherConfig,

    pub rate_limit: RateLimitConfig,

    pub logging: LoggingConfig,

    pub oauth: OAuthConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Whole-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Origins allowed by CORS
    pub cors_origins: Vec<String>,

    /// Key rate limits on `X-Forwarded-For`; only safe behind a trusted proxy
    pub trust_forwarded_for: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Apply pending migrations on startup
    pub run_migrations: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for signing JWT tokens
    pub secret: String,

    /// Access token expiration in seconds
    pub access_token_expiry: i64,

    /// Refresh token expiration in seconds
    pub refresh_token_expiry: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelsConfig {
    /// Sequence model artifact
    pub lstm_path: String,

    /// Fitted scaler artifact
    pub scaler_path: String,

    /// Activation names registered for the custom-object load strategy
    pub custom_activations: Vec<String>,

    /// Fixed seed for forecast jitter; entropy-seeded when absent
    pub random_seed: Option<u64>,
}

impl ModelsConfig {
    /// Loader with the configured custom activations; unknown names are skipped
    pub fn loader(&self) -> ModelLoader {
        let activations = self
            .custom_activations
            .iter()
            .filter_map(|name| {
                let activation = Activation::from_name(name);
                if activation.is_none() {
                    tracing::warn!(activation = %name, "Ignoring unknown custom activation");
                }
                activation
            })
            .collect();
        ModelLoader::default().with_custom_activations(activations)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClassifierConfig {
    /// Model-serving predict endpoint; classification is disabled when absent
    pub endpoint: Option<String>,

    pub api_key: Option<String>,

    /// Scores at or above this are classified as wildfire
    pub threshold: f64,

    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WeatherConfig {
    /// Provider names in priority order ("nasa_power", "open_meteo")
    pub providers: Vec<String>,

    pub nasa_power_url: String,

    pub open_meteo_archive_url: String,

    pub open_meteo_forecast_url: String,

    /// Per-request timeout for provider calls
    pub timeout_secs: u64,
}

impl WeatherConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    pub login_attempts: usize,
    pub login_window_minutes: u64,
    pub register_attempts: usize,
    pub register_window_minutes: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// "pretty" or "json"
    pub format: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OAuthConfig {
    pub google_client_id: Option<String>,
    pub google_redirect_uri: String,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("FLAME_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = Self::builder(&environment)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (FLAME_ prefix)
            .add_source(
                Environment::with_prefix("FLAME")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .with_list_parse_key("weather.providers")
                    .with_list_parse_key("models.custom_activations")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Configuration from built-in defaults only
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::builder("test")?.build()?.try_deserialize()
    }

    fn builder(
        environment: &str,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        config::Config::builder()
            .set_default("environment", environment)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000)?
            .set_default("server.request_timeout_secs", 30)?
            .set_default("server.trust_forwarded_for", false)?
            .set_default(
                "server.cors_origins",
                vec![
                    "http://localhost:3000",
                    "http://127.0.0.1:3000",
                    "https://localhost:3000",
                ],
            )?
            .set_default("database.url", "postgres://localhost/flame_prophet")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.run_migrations", environment == "development")?
            .set_default("jwt.secret", "development-secret-key")?
            // 240 minutes
            .set_default("jwt.access_token_expiry", 14400)?
            // 30 days
            .set_default("jwt.refresh_token_expiry", 2_592_000)?
            .set_default("models.lstm_path", "models/lstm_model.json")?
            .set_default("models.scaler_path", "models/scaler.json")?
            .set_default("models.custom_activations", Vec::<String>::new())?
            .set_default("classifier.threshold", 0.5)?
            .set_default("classifier.timeout_secs", 60)?
            .set_default("weather.providers", vec!["nasa_power", "open_meteo"])?
            .set_default(
                "weather.nasa_power_url",
                "https://power.larc.nasa.gov/api/temporal/daily/point",
            )?
            .set_default(
                "weather.open_meteo_archive_url",
                "https://archive-api.open-meteo.com/v1/archive",
            )?
            .set_default(
                "weather.open_meteo_forecast_url",
                "https://api.open-meteo.com/v1/forecast",
            )?
            .set_default("weather.timeout_secs", 20)?
            .set_default("rate_limit.login_attempts", 5)?
            .set_default("rate_limit.login_window_minutes", 15)?
            .set_default("rate_limit.register_attempts", 3)?
            .set_default("rate_limit.register_window_minutes", 60)?
            .set_default("logging.format", "pretty")?
            .set_default(
                "oauth.google_redirect_uri",
                "http://localhost:3000/auth/callback",
            )
    }
}
