//! Hotspot lookup and ranking.

mod geo;
mod ranker;
mod store;

pub use geo::{GeoPoint, haversine_km, haversine_miles};
pub use ranker::{Hotspot, RankedHotspots, rank};
pub use store::{HotspotStore, HotspotTable, JsonHotspotStore, validate_month};
