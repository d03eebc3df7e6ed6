//! Boundary facade tying the gate, orchestrator, supervisor and ranker together.

use crate::audio::AudioClip;
use crate::config::Config;
use crate::detection::{DetectionOrchestrator, ObservationStore, PendingWrites};
use crate::error::{Error, Result};
use crate::gate::{NoiseFloorGate, NoiseFloorState};
use crate::hotspot::{GeoPoint, Hotspot, HotspotStore, rank, validate_month};
use crate::inference::Classifier;
use crate::supervisor::{DetectionStatus, DetectionSupervisor};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// External collaborators the service talks to.
pub struct Collaborators {
    /// Species classifier.
    pub classifier: Arc<dyn Classifier>,
    /// Destination for observations.
    pub observations: Arc<dyn ObservationStore>,
    /// Source of precomputed hotspots.
    pub hotspots: Arc<dyn HotspotStore>,
}

/// What the caller is told about an ingested clip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestResponse {
    /// The clip was quieter than the noise floor and was not classified.
    pub below_threshold: bool,
    /// Distinct species detected, sorted.
    pub species: Vec<String>,
}

/// Result of ingesting one clip.
#[derive(Debug)]
pub struct IngestOutcome {
    /// Response for the caller.
    pub response: IngestResponse,
    /// Observation writes still in flight.
    pub persistence: PendingWrites,
}

/// Owns every piece of process-wide state: calibration, the detector handle
/// and the collaborators.
pub struct RobinService {
    gate: Arc<NoiseFloorGate>,
    orchestrator: DetectionOrchestrator,
    supervisor: DetectionSupervisor,
    hotspots: Arc<dyn HotspotStore>,
}

impl RobinService {
    /// Build the service from configuration.
    pub fn new(config: &Config, collaborators: Collaborators) -> Result<Self> {
        let gate = NoiseFloorGate::from_config(&config.gate)?
            .with_temp_dir(config.storage.temp_dir.clone());
        let orchestrator = DetectionOrchestrator::new(
            collaborators.classifier,
            collaborators.observations,
            &config.detection,
        )?;

        Ok(Self {
            gate: Arc::new(gate),
            orchestrator,
            supervisor: DetectionSupervisor::new(config.supervisor.clone()),
            hotspots: collaborators.hotspots,
        })
    }

    /// Gate a clip and, if it is loud enough, classify it and record
    /// observations.
    ///
    /// Missing coordinates default to 0.0.
    pub async fn ingest(
        &self,
        clip: AudioClip,
        latitude: Option<f64>,
        longitude: Option<f64>,
        captured_at: DateTime<Utc>,
    ) -> Result<IngestOutcome> {
        let location = GeoPoint::new(latitude.unwrap_or(0.0), longitude.unwrap_or(0.0))?;

        let gate = Arc::clone(&self.gate);
        let gated = tokio::task::spawn_blocking(move || gate.evaluate(&clip))
            .await
            .map_err(|e| Error::TaskJoin {
                reason: e.to_string(),
            })??;

        let Some(samples) = gated.samples else {
            debug!(
                "Clip below noise floor ({:.3e} < {:.3e})",
                gated.observed_power, gated.threshold
            );
            return Ok(IngestOutcome {
                response: IngestResponse {
                    below_threshold: true,
                    species: Vec::new(),
                },
                persistence: PendingWrites::none(),
            });
        };

        let outcome = self
            .orchestrator
            .process(samples, location.latitude, location.longitude, captured_at)
            .await?;

        Ok(IngestOutcome {
            response: IngestResponse {
                below_threshold: false,
                species: outcome.species,
            },
            persistence: outcome.persistence,
        })
    }

    /// Current noise floor calibration.
    pub fn gate_state(&self) -> NoiseFloorState {
        self.gate.state()
    }

    /// Start the background detector.
    pub async fn start_detection(&self) -> Result<DetectionStatus> {
        self.supervisor.start().await
    }

    /// Stop the background detector.
    pub async fn stop_detection(&self) -> Result<()> {
        self.supervisor.stop().await
    }

    /// Background detector state.
    pub async fn detection_status(&self) -> DetectionStatus {
        self.supervisor.status().await
    }

    /// Best place to find `species` in `month`, optionally relative to `user`.
    pub fn best_hotspot(
        &self,
        species: &str,
        month: u32,
        user: Option<GeoPoint>,
    ) -> Result<Hotspot> {
        best_hotspot(self.hotspots.as_ref(), species, month, user)
    }
}

/// Look up candidates in `store` and return the top-ranked one.
pub fn best_hotspot(
    store: &dyn HotspotStore,
    species: &str,
    month: u32,
    user: Option<GeoPoint>,
) -> Result<Hotspot> {
    let month = validate_month(month)?;
    let candidates = store.get(species, month)?;
    let ranked = rank(candidates, user)?;
    info!(
        "Best hotspot for '{species}' in month {month}: ({:.4}, {:.4}) score {:.2}",
        ranked.best.latitude, ranked.best.longitude, ranked.best.reliability_score
    );
    Ok(ranked.best)
}
