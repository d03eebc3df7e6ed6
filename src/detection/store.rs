//! Observation store collaborator.

use crate::detection::Observation;
use crate::error::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Destination for observations.
pub trait ObservationStore: Send + Sync {
    /// Persist one observation.
    fn add(&self, observation: &Observation) -> Result<()>;
}

/// Appends observations as JSON lines to a local file.
pub struct JsonlObservationStore {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlObservationStore {
    /// Open (or create) the file for appending.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ObservationStore for JsonlObservationStore {
    fn add(&self, observation: &Observation) -> Result<()> {
        let write_err = |reason: String| Error::ObservationWrite {
            species: observation.species.clone(),
            reason,
        };

        let mut line = serde_json::to_string(observation).map_err(|e| write_err(e.to_string()))?;
        line.push('\n');

        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.write_all(line.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|e| write_err(e.to_string()))
    }
}

/// Keeps observations in memory.
#[derive(Debug, Default)]
pub struct MemoryObservationStore {
    observations: Mutex<Vec<Observation>>,
}

impl MemoryObservationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything stored so far.
    pub fn observations(&self) -> Vec<Observation> {
        self.observations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ObservationStore for MemoryObservationStore {
    fn add(&self, observation: &Observation) -> Result<()> {
        self.observations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observation.clone());
        Ok(())
    }
}
