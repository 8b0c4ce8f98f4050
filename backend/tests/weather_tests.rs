//! Property-based tests for weather query validation and parameter handling

use proptest::prelude::*;
use shared::{
    validate_coordinates, validate_history_days, GpsCoordinates, WeatherParameter,
    MAX_HISTORY_DAYS,
};

// ============================================================================
// Test Strategies
// ============================================================================

fn latitude_strategy() -> impl Strategy<Value = f64> {
    -90.0f64..=90.0
}

fn longitude_strategy() -> impl Strategy<Value = f64> {
    -180.0f64..=180.0
}

fn parameter_strategy() -> impl Strategy<Value = WeatherParameter> {
    prop::sample::select(WeatherParameter::ALL.to_vec())
}

// ============================================================================
// Property Tests: Location and Range Checks
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Every point on the globe is accepted
    #[test]
    fn test_coordinates_on_globe_accepted(
        lat in latitude_strategy(),
        lon in longitude_strategy(),
    ) {
        prop_assert!(validate_coordinates(&GpsCoordinates::new(lat, lon)).is_ok());
    }

    /// Latitudes beyond the poles are rejected
    #[test]
    fn test_latitude_out_of_range_rejected(
        lat in prop_oneof![-1000.0f64..-90.001, 90.001f64..1000.0],
        lon in longitude_strategy(),
    ) {
        prop_assert_eq!(
            validate_coordinates(&GpsCoordinates::new(lat, lon)),
            Err("Latitude must be between -90 and 90")
        );
    }

    /// Longitudes past the antimeridian are rejected
    #[test]
    fn test_longitude_out_of_range_rejected(
        lat in latitude_strategy(),
        lon in prop_oneof![-1000.0f64..-180.001, 180.001f64..1000.0],
    ) {
        prop_assert_eq!(
            validate_coordinates(&GpsCoordinates::new(lat, lon)),
            Err("Longitude must be between -180 and 180")
        );
    }

    /// History windows are accepted exactly within 1..=60 days
    #[test]
    fn test_history_days_bounds(days in 0u32..200) {
        let result = validate_history_days(days);
        prop_assert_eq!(result.is_ok(), days >= 1 && days <= MAX_HISTORY_DAYS);
    }

    /// Resolved values always land inside the parameter's plausible range
    #[test]
    fn test_resolve_stays_in_range(
        param in parameter_strategy(),
        value in prop::option::of(-1.0e6f64..1.0e6),
    ) {
        let (min, max) = param.range();
        let resolved = param.resolve(value);
        prop_assert!(resolved >= min && resolved <= max);
    }

    /// In-range values pass through untouched
    #[test]
    fn test_resolve_keeps_in_range_values(param in parameter_strategy(), t in 0.0f64..=1.0) {
        let (min, max) = param.range();
        let value = min + (max - min) * t;
        prop_assert_eq!(param.resolve(Some(value)), value);
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_non_finite_coordinates_rejected() {
        assert_eq!(
            validate_coordinates(&GpsCoordinates::new(f64::NAN, 100.0)),
            Err("Coordinates must be finite numbers")
        );
        assert!(validate_coordinates(&GpsCoordinates::new(13.0, f64::INFINITY)).is_err());
    }

    #[test]
    fn test_missing_values_use_defaults() {
        for param in WeatherParameter::ALL {
            assert_eq!(param.resolve(None), param.default_value());
            assert_eq!(param.resolve(Some(f64::NAN)), param.default_value());
        }
    }

    #[test]
    fn test_parameter_keys_are_unique() {
        let mut keys: Vec<&str> = WeatherParameter::ALL.iter().map(|p| p.key()).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), WeatherParameter::ALL.len());
    }
}
