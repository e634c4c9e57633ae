//! Coordinate validation and grid normalization.
//!
//! Readings are keyed by coordinates rounded to two decimal places (cells of
//! roughly 1.1 km) so GPS jitter inside a field never changes the result.

use crate::errors::AppError;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::fmt;

/// Decimal places kept by [`GeoPoint::normalize`].
pub const GRID_DECIMALS: usize = 2;

/// A validated latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    lat: f64,
    lng: f64,
}

impl GeoPoint {
    /// Validates raw degrees.
    ///
    /// # Errors
    ///
    /// `AppError::InvalidCoordinate` for NaN/infinite values, latitude outside
    /// [-90, 90] or longitude outside [-180, 180].
    pub fn new(lat: f64, lng: f64) -> Result<Self, AppError> {
        if !lat.is_finite() || !lng.is_finite() {
            return Err(AppError::InvalidCoordinate(format!(
                "latitude and longitude must be finite numbers (got {}, {})",
                lat, lng
            )));
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(AppError::InvalidCoordinate(format!(
                "latitude {} is outside [-90, 90]",
                lat
            )));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(AppError::InvalidCoordinate(format!(
                "longitude {} is outside [-180, 180]",
                lng
            )));
        }
        Ok(Self { lat, lng })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }

    /// Snaps the point to the reading grid.
    pub fn normalize(&self) -> NormalizedCoordinate {
        NormalizedCoordinate {
            lat: round_to(self.lat, GRID_DECIMALS),
            lng: round_to(self.lng, GRID_DECIMALS),
        }
    }
}

/// A coordinate snapped to the two-decimal reading grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalizedCoordinate {
    pub lat: f64,
    pub lng: f64,
}

impl NormalizedCoordinate {
    /// Stable textual key for caches, e.g. `"25.70,88.65"`.
    pub fn cache_key(&self) -> String {
        format!(
            "{:.*},{:.*}",
            GRID_DECIMALS, self.lat, GRID_DECIMALS, self.lng
        )
    }
}

impl fmt::Display for NormalizedCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.*}, {:.*}",
            GRID_DECIMALS, self.lat, GRID_DECIMALS, self.lng
        )
    }
}

/// Rounds to a fixed number of decimals, half away from zero, on the exact
/// binary value (25.125 becomes 25.13, 6.849 becomes 6.8). The result is the
/// closest `f64` to the rounded decimal.
pub fn round_to(value: f64, decimals: usize) -> f64 {
    let Some(exact) = Decimal::from_f64_retain(value) else {
        return value;
    };

    exact
        .round_dp_with_strategy(decimals as u32, RoundingStrategy::MidpointAwayFromZero)
        .to_string()
        .parse()
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_rounds_to_grid() {
        let point = GeoPoint::new(25.6955, 88.6524).unwrap();
        let normalized = point.normalize();
        assert_eq!(normalized.lat, 25.70);
        assert_eq!(normalized.lng, 88.65);
        assert_eq!(normalized.cache_key(), "25.70,88.65");
    }

    #[test]
    fn test_jitter_inside_cell_is_absorbed() {
        let a = GeoPoint::new(25.695470, 88.652380).unwrap().normalize();
        let b = GeoPoint::new(25.698100, 88.649900).unwrap().normalize();
        assert_eq!(a, b);
    }

    #[test]
    fn test_negative_coordinates() {
        let normalized = GeoPoint::new(-33.8688, -151.2093).unwrap().normalize();
        assert_eq!(normalized.lat, -33.87);
        assert_eq!(normalized.lng, -151.21);
    }

    #[test]
    fn test_rejects_invalid_coordinates() {
        assert!(matches!(
            GeoPoint::new(f64::NAN, 10.0),
            Err(AppError::InvalidCoordinate(_))
        ));
        assert!(matches!(
            GeoPoint::new(10.0, f64::INFINITY),
            Err(AppError::InvalidCoordinate(_))
        ));
        assert!(GeoPoint::new(90.5, 0.0).is_err());
        assert!(GeoPoint::new(0.0, -180.01).is_err());
        assert!(GeoPoint::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(6.849, 1), 6.8);
        assert_eq!(round_to(2.3456, 2), 2.35);
        assert_eq!(round_to(42.0, 1), 42.0);
    }

    #[test]
    fn test_round_to_ties_go_away_from_zero() {
        assert_eq!(round_to(6.25, 1), 6.3);
        assert_eq!(round_to(-6.25, 1), -6.3);
        assert_eq!(round_to(0.125, 2), 0.13);
        // 1.005 is stored as 1.00499999999999989..., not a tie
        assert_eq!(round_to(1.005, 2), 1.0);
        assert!(round_to(f64::NAN, 2).is_nan());
    }

    #[test]
    fn test_normalize_halfway_point_rounds_up_in_magnitude() {
        let normalized = GeoPoint::new(25.125, 88.625).unwrap().normalize();
        assert_eq!(normalized.lat, 25.13);
        assert_eq!(normalized.lng, 88.63);
        assert_eq!(normalized.cache_key(), "25.13,88.63");

        let southern = GeoPoint::new(-25.125, -88.625).unwrap().normalize();
        assert_eq!(southern.lat, -25.13);
        assert_eq!(southern.lng, -88.63);
    }
}
