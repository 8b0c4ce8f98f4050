//! Domain models for the Flame Prophet platform

mod forecast;
mod user;
mod weather;

pub use forecast::*;
pub use user::*;
pub use weather::*;
