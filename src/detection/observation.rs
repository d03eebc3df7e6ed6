//! Observation records handed to the store.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// One species seen at one place and time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Species name.
    pub species: String,
    /// Recording latitude.
    pub latitude: f64,
    /// Recording longitude.
    pub longitude: f64,
    /// Capture time in the configured fixed offset.
    pub timestamp: DateTime<FixedOffset>,
}

impl Observation {
    /// Build an observation, normalizing `captured_at` to `offset`.
    pub fn new(
        species: impl Into<String>,
        latitude: f64,
        longitude: f64,
        captured_at: DateTime<Utc>,
        offset: FixedOffset,
    ) -> Self {
        Self {
            species: species.into(),
            latitude,
            longitude,
            timestamp: captured_at.with_timezone(&offset),
        }
    }
}
