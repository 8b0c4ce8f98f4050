//! Business logic services for the Flame Prophet backend

pub mod auth;
pub mod oauth;
pub mod rate_limit;
pub mod user_store;
pub mod weather;

pub use auth::AuthService;
pub use oauth::GoogleOAuthService;
pub use rate_limit::{RateLimitedAction, RateLimiter};
pub use user_store::{MemoryUserStore, PgUserStore, UserStore};
pub use weather::{HistoryFetch, WeatherProviderChain};
