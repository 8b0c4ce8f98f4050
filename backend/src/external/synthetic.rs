//! Generated current conditions, used when no provider answers
//!
//! Only current conditions are ever generated. History is never synthesised.

use std::sync::Mutex;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{CurrentConditions, GpsCoordinates, WeatherParameter, SYNTHETIC_SOURCE};

pub struct SyntheticWeatherGenerator {
    rng: Mutex<StdRng>,
}

impl Default for SyntheticWeatherGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticWeatherGenerator {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Plausible conditions for the latitude: warmer near the equator
    pub fn generate(&self, coords: GpsCoordinates) -> CurrentConditions {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let base_temperature = 30.0 - coords.latitude.abs() * 0.4;
        let temperature = WeatherParameter::Temperature
            .resolve(Some(base_temperature + rng.gen_range(-2.0..2.0)));

        CurrentConditions {
            temperature,
            humidity: rng.gen_range(55.0..85.0),
            wind_speed: rng.gen_range(1.0..6.0),
            pressure: rng.gen_range(1005.0..1018.0),
            observed_at: Utc::now(),
            source: SYNTHETIC_SOURCE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_conditions_are_marked_and_bounded() {
        let generator = SyntheticWeatherGenerator::seeded(7);
        for lat in [-80.0, -15.0, 0.0, 13.7, 65.0] {
            let conditions = generator.generate(GpsCoordinates::new(lat, 100.5));
            assert!(conditions.is_synthetic());
            assert!((-50.0..=60.0).contains(&conditions.temperature));
            assert!((55.0..85.0).contains(&conditions.humidity));
            assert!((1005.0..1018.0).contains(&conditions.pressure));
        }
    }

    #[test]
    fn test_seeded_generators_agree() {
        let coords = GpsCoordinates::new(13.75, 100.5);
        let a = SyntheticWeatherGenerator::seeded(42).generate(coords);
        let b = SyntheticWeatherGenerator::seeded(42).generate(coords);
        assert_eq!(a.temperature, b.temperature);
        assert_eq!(a.humidity, b.humidity);
    }
}
