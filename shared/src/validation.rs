//! Validation utilities for Flame Prophet
//!
//! Request-level checks shared by the backend and the forecasting core.

use crate::types::GpsCoordinates;

/// Longest history a provider query may request
pub const MAX_HISTORY_DAYS: u32 = 60;

// ============================================================================
// Location Validations
// ============================================================================

/// Validate latitude/longitude are on the globe
pub fn validate_coordinates(coords: &GpsCoordinates) -> Result<(), &'static str> {
    if !coords.latitude.is_finite() || !coords.longitude.is_finite() {
        return Err("Coordinates must be finite numbers");
    }
    if !(-90.0..=90.0).contains(&coords.latitude) {
        return Err("Latitude must be between -90 and 90");
    }
    if !(-180.0..=180.0).contains(&coords.longitude) {
        return Err("Longitude must be between -180 and 180");
    }
    Ok(())
}

/// Validate the number of history days requested from a provider
pub fn validate_history_days(days: u32) -> Result<(), &'static str> {
    if days == 0 || days > MAX_HISTORY_DAYS {
        return Err("Days must be between 1 and 60");
    }
    Ok(())
}

// ============================================================================
// Account Validations
// ============================================================================

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.contains('@') && email.contains('.') && email.len() >= 5 {
        Ok(())
    } else {
        Err("Invalid email format")
    }
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters");
    }
    Ok(())
}

/// Validate username (3-30 characters, alphanumeric, underscore or dot)
pub fn validate_username(username: &str) -> Result<(), &'static str> {
    if username.len() < 3 {
        return Err("Username must be at least 3 characters");
    }
    if username.len() > 30 {
        return Err("Username must be at most 30 characters");
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    {
        return Err("Username may only contain letters, digits, '_' and '.'");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_on_globe() {
        assert!(validate_coordinates(&GpsCoordinates::new(13.7563, 100.5018)).is_ok());
        assert!(validate_coordinates(&GpsCoordinates::new(-90.0, 180.0)).is_ok());
        assert!(validate_coordinates(&GpsCoordinates::new(91.0, 0.0)).is_err());
        assert!(validate_coordinates(&GpsCoordinates::new(0.0, -180.5)).is_err());
        assert!(validate_coordinates(&GpsCoordinates::new(f64::NAN, 0.0)).is_err());
    }

    #[test]
    fn test_history_days_bounds() {
        assert!(validate_history_days(14).is_ok());
        assert!(validate_history_days(0).is_err());
        assert!(validate_history_days(61).is_err());
    }

    #[test]
    fn test_email_validation() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("a@b").is_err());
    }

    #[test]
    fn test_password_validation() {
        assert!(validate_password("password123").is_ok());
        assert!(validate_password("short").is_err());
    }

    #[test]
    fn test_username_validation() {
        assert!(validate_username("fire_watch.01").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"x".repeat(31)).is_err());
    }
}
