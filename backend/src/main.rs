//! Flame Prophet - Backend Server
//!
//! Seven-day temperature forecasting from fourteen days of weather history,
//! with live weather providers, wildfire image classification and user
//! accounts.

use axum::{extract::DefaultBodyLimit, http::HeaderValue, routing::get, Router};
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shared::forecast::ModelHandle;

mod config;
mod error;
mod external;
mod handlers;
mod middleware;
mod routes;
mod services;

pub use config::Config;

use external::{ImageClassifier, RemoteImageClassifier, SyntheticWeatherGenerator};
use services::{AuthService, PgUserStore, RateLimiter, UserStore, WeatherProviderChain};

/// Uploads (classifier images) are capped at 16 MB
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

const DEFAULT_LOG_FILTER: &str = "fp_server=debug,shared=info,tower_http=debug,sqlx=warn";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub users: Arc<dyn UserStore>,
    pub models: Arc<ModelHandle>,
    pub weather: Arc<WeatherProviderChain>,
    pub classifier: Option<Arc<dyn ImageClassifier>>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn auth_service(&self) -> AuthService {
        AuthService::new(self.users.clone(), &self.config.jwt)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::load()?;

    init_tracing(&config.logging.format);

    tracing::info!("Starting Flame Prophet Server");
    tracing::info!("Environment: {}", config.environment);

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database.url)
        .await?;

    tracing::info!("Database connection established");

    if config.database.run_migrations {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&db_pool).await?;
        tracing::info!("Migrations completed");
    }

    // Load model artifacts once, off the async runtime
    let models = Arc::new(ModelHandle::new(
        &config.models.lstm_path,
        &config.models.scaler_path,
        config.models.loader(),
    ));
    {
        let models = models.clone();
        tokio::task::spawn_blocking(move || models.warm_up()).await?;
    }
    tracing::info!(
        model_status = ?models.status(),
        scaler = models.scaler().kind(),
        "Forecasting artifacts ready"
    );

    let providers = external::build_providers(&config.weather)?;
    let weather = WeatherProviderChain::new(
        providers,
        SyntheticWeatherGenerator::new(),
        config.weather.timeout(),
    );
    tracing::info!(providers = ?weather.provider_names(), "Weather providers configured");

    let classifier = RemoteImageClassifier::from_config(&config.classifier)?
        .map(|c| Arc::new(c) as Arc<dyn ImageClassifier>);
    if classifier.is_none() {
        tracing::warn!("No classifier endpoint configured; /api/classify will report model not loaded");
    }

    // Create application state
    let state = AppState {
        users: Arc::new(PgUserStore::new(db_pool)),
        models,
        weather: Arc::new(weather),
        classifier,
        rate_limiter: Arc::new(RateLimiter::new(&config.rate_limit)),
        config: Arc::new(config.clone()),
    };

    // Build application
    let app = create_app(state);

    // Start server
    let listener = tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}

fn init_tracing(format: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    if format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Create the application router with all routes and middleware
fn create_app(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .server
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any);

    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .nest("/api", routes::api_routes(state.clone()))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TimeoutLayer::new(timeout))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
