//! Geographic primitives.
//!
//! Positions, coordinate validation, great-circle distance and the
//! directions link handed to external navigation apps.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Mean earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Base of the Google Maps directions deep link.
const DIRECTIONS_BASE_URL: &str = "https://www.google.com/maps/dir/?api=1&destination=";

/// A single position fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Radius of the 68% confidence circle, in meters.
    pub accuracy_meters: f64,
}

impl Position {
    /// Create a position, rejecting out-of-range coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCoordinates`] if either coordinate is
    /// non-finite or outside its range.
    pub fn new(latitude: f64, longitude: f64, accuracy_meters: f64) -> Result<Self> {
        validate_coordinates(latitude, longitude)?;
        Ok(Self {
            latitude,
            longitude,
            accuracy_meters,
        })
    }

    /// Distance to another position in meters.
    #[must_use]
    pub fn distance_to(&self, latitude: f64, longitude: f64) -> f64 {
        distance_meters(self.latitude, self.longitude, latitude, longitude)
    }
}

/// Check that a coordinate pair is finite and within range.
///
/// # Errors
///
/// Returns [`Error::InvalidCoordinates`] if latitude is outside [-90, 90],
/// longitude is outside [-180, 180], or either is NaN or infinite.
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<()> {
    let valid = latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude);

    if valid {
        Ok(())
    } else {
        Err(Error::InvalidCoordinates {
            latitude,
            longitude,
        })
    }
}

/// Great-circle distance between two points, in meters (haversine).
#[must_use]
pub fn distance_meters(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Format a distance for display: whole meters below 1 km, otherwise km
/// with one decimal.
#[must_use]
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{}m", meters.round())
    } else {
        format!("{:.1}km", meters / 1000.0)
    }
}

/// Deep link asking a navigation app for directions to the given point.
#[must_use]
pub fn directions_url(latitude: f64, longitude: f64) -> String {
    format!("{DIRECTIONS_BASE_URL}{latitude},{longitude}")
}
