//! Hotspot ranking by distance and reliability.

use crate::error::{Error, Result};
use crate::hotspot::{GeoPoint, haversine_miles};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A precomputed location where a species is reliably found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotspot {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Findability score in [0, 1].
    pub reliability_score: f64,
    /// Distance to the user, set when ranking with a location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_miles: Option<f64>,
}

impl Hotspot {
    /// Create an undecorated hotspot.
    pub const fn new(latitude: f64, longitude: f64, reliability_score: f64) -> Self {
        Self {
            latitude,
            longitude,
            reliability_score,
            distance_miles: None,
        }
    }

    fn point(&self) -> GeoPoint {
        GeoPoint {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// Ranked candidates, best first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedHotspots {
    /// Top-ranked hotspot.
    pub best: Hotspot,
    /// Every candidate in rank order, `best` included.
    pub ranked: Vec<Hotspot>,
}

/// Rank hotspot candidates.
///
/// With a user location each candidate is decorated with its distance and
/// candidates are ordered nearest first, ties going to the higher score.
/// Without one they are ordered by score, highest first.
pub fn rank(candidates: Vec<Hotspot>, user: Option<GeoPoint>) -> Result<RankedHotspots> {
    let mut ranked = candidates;

    match user {
        Some(user) => {
            for hotspot in &mut ranked {
                hotspot.distance_miles = Some(haversine_miles(user, hotspot.point()));
            }
            ranked.sort_by(by_distance_then_score);
        }
        None => ranked.sort_by(by_score_desc),
    }

    let best = ranked.first().cloned().ok_or(Error::NoHotspotCandidates)?;
    Ok(RankedHotspots { best, ranked })
}

fn by_score_desc(a: &Hotspot, b: &Hotspot) -> Ordering {
    b.reliability_score.total_cmp(&a.reliability_score)
}

fn by_distance_then_score(a: &Hotspot, b: &Hotspot) -> Ordering {
    let da = a.distance_miles.unwrap_or(f64::INFINITY);
    let db = b.distance_miles.unwrap_or(f64::INFINITY);
    da.total_cmp(&db).then_with(|| by_score_desc(a, b))
}
