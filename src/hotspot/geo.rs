//! Geographic coordinates and great-circle distance.

use crate::constants::geo::{EARTH_RADIUS_KM, KM_TO_MILES, LATITUDE_RANGE, LONGITUDE_RANGE};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A validated latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a point, rejecting non-finite or out-of-range coordinates.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !latitude.is_finite() || !LATITUDE_RANGE.contains(&latitude) {
            return Err(Error::InvalidLatitude { value: latitude });
        }
        if !longitude.is_finite() || !LONGITUDE_RANGE.contains(&longitude) {
            return Err(Error::InvalidLongitude { value: longitude });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Build from an optional pair; both or neither must be given.
    pub fn from_optional(latitude: Option<f64>, longitude: Option<f64>) -> Result<Option<Self>> {
        match (latitude, longitude) {
            (Some(lat), Some(lon)) => Self::new(lat, lon).map(Some),
            (None, None) => Ok(None),
            _ => Err(Error::InvalidInput {
                message: "latitude and longitude must be given together".to_string(),
            }),
        }
    }
}

/// Haversine distance in kilometers.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let d_phi = (b.latitude - a.latitude).to_radians();
    let d_lambda = (b.longitude - a.longitude).to_radians();

    let h = (d_lambda / 2.0)
        .sin()
        .powi(2)
        .mul_add(phi1.cos() * phi2.cos(), (d_phi / 2.0).sin().powi(2));
    // Rounding can push h just past 1 for antipodal points
    let c = 2.0 * h.clamp(0.0, 1.0).sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Haversine distance in statute miles.
pub fn haversine_miles(a: GeoPoint, b: GeoPoint) -> f64 {
    haversine_km(a, b) * KM_TO_MILES
}
