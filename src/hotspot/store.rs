//! Hotspot store collaborator.

use crate::error::{Error, Result};
use crate::hotspot::Hotspot;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Species -> month (1-12) -> candidate hotspots.
pub type HotspotTable = BTreeMap<String, BTreeMap<u32, Vec<Hotspot>>>;

/// Source of precomputed hotspots.
pub trait HotspotStore: Send + Sync {
    /// Candidates for `species` in `month`.
    ///
    /// Fails with [`Error::InvalidMonth`] outside 1-12 and with
    /// [`Error::HotspotsNotFound`] when nothing is recorded.
    fn get(&self, species: &str, month: u32) -> Result<Vec<Hotspot>>;
}

/// Check a month number.
pub fn validate_month(month: u32) -> Result<u32> {
    if (1..=12).contains(&month) {
        Ok(month)
    } else {
        Err(Error::InvalidMonth { value: month })
    }
}

/// Hotspots loaded from a JSON file shaped like
/// `{"American Robin": {"4": [{"latitude": .., "longitude": .., "reliability_score": ..}]}}`.
#[derive(Debug, Clone, Default)]
pub struct JsonHotspotStore {
    table: HotspotTable,
}

impl JsonHotspotStore {
    /// Wrap an in-memory table.
    pub const fn new(table: HotspotTable) -> Self {
        Self { table }
    }

    /// Load a table from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let load_err = |source: Box<dyn std::error::Error + Send + Sync>| Error::HotspotStoreLoad {
            path: path.to_path_buf(),
            source,
        };

        let contents = std::fs::read_to_string(path).map_err(|e| load_err(Box::new(e)))?;
        let table: HotspotTable =
            serde_json::from_str(&contents).map_err(|e| load_err(Box::new(e)))?;

        debug!(
            "Loaded hotspots for {} species from {}",
            table.len(),
            path.display()
        );
        Ok(Self { table })
    }
}

impl HotspotStore for JsonHotspotStore {
    fn get(&self, species: &str, month: u32) -> Result<Vec<Hotspot>> {
        let month = validate_month(month)?;
        self.table
            .get(species)
            .and_then(|months| months.get(&month))
            .filter(|hotspots| !hotspots.is_empty())
            .cloned()
            .ok_or_else(|| Error::HotspotsNotFound {
                species: species.to_string(),
                month,
            })
    }
}
