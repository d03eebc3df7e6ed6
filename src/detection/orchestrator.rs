//! Classifier invocation, species deduplication and observation emission.

use crate::audio::PcmClip;
use crate::config::DetectionConfig;
use crate::constants::detection::MIN_CONFIDENCE;
use crate::detection::{Observation, ObservationStore};
use crate::error::{Error, Result};
use crate::inference::{Classifier, Detection};
use chrono::{DateTime, FixedOffset, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Runs inference on clips that passed the noise gate.
pub struct DetectionOrchestrator {
    classifier: Arc<dyn Classifier>,
    store: Arc<dyn ObservationStore>,
    inference_timeout: Duration,
    offset: FixedOffset,
}

impl DetectionOrchestrator {
    /// Create an orchestrator from the `[detection]` config section.
    pub fn new(
        classifier: Arc<dyn Classifier>,
        store: Arc<dyn ObservationStore>,
        config: &DetectionConfig,
    ) -> Result<Self> {
        let offset = FixedOffset::east_opt(config.utc_offset_minutes * 60).ok_or_else(|| {
            Error::ConfigValidation {
                message: format!(
                    "detection.utc_offset_minutes out of range: {}",
                    config.utc_offset_minutes
                ),
            }
        })?;

        Ok(Self {
            classifier,
            store,
            inference_timeout: Duration::from_secs(config.inference_timeout_secs),
            offset,
        })
    }

    /// Classify `samples` and emit one observation per distinct species.
    ///
    /// The classifier runs once on the blocking pool under the configured
    /// deadline. A classifier failure or timeout fails the whole call; store
    /// writes are started in the background and reported via
    /// [`DetectionOutcome::persistence`].
    pub async fn process(
        &self,
        samples: PcmClip,
        latitude: f64,
        longitude: f64,
        captured_at: DateTime<Utc>,
    ) -> Result<DetectionOutcome> {
        let date = captured_at.with_timezone(&self.offset).date_naive();
        let detections = self.classify(samples, latitude, longitude, date).await?;

        let species = distinct_species(&detections, MIN_CONFIDENCE);
        info!(
            "Detected {} species from {} raw detections",
            species.len(),
            detections.len()
        );

        let writes = species
            .iter()
            .map(|name| {
                let observation =
                    Observation::new(name.clone(), latitude, longitude, captured_at, self.offset);
                (name.clone(), self.submit(observation))
            })
            .collect();

        Ok(DetectionOutcome {
            species,
            persistence: PendingWrites { writes },
        })
    }

    async fn classify(
        &self,
        samples: PcmClip,
        latitude: f64,
        longitude: f64,
        date: chrono::NaiveDate,
    ) -> Result<Vec<Detection>> {
        let classifier = Arc::clone(&self.classifier);
        let task = tokio::task::spawn_blocking(move || {
            classifier.analyze(&samples, latitude, longitude, date, MIN_CONFIDENCE)
        });

        // A timed-out blocking task cannot be interrupted; its result is discarded
        match tokio::time::timeout(self.inference_timeout, task).await {
            Ok(Ok(result)) => result,
            // A panicking classifier is a classifier failure
            Ok(Err(e)) => Err(Error::Inference {
                reason: format!("classifier task failed: {e}"),
            }),
            Err(_) => Err(Error::InferenceTimeout {
                secs: self.inference_timeout.as_secs(),
            }),
        }
    }

    fn submit(&self, observation: Observation) -> JoinHandle<Result<()>> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || {
            let result = store.add(&observation);
            match &result {
                Ok(()) => debug!("Stored observation: {}", observation.species),
                Err(e) => warn!("Failed to store observation: {e}"),
            }
            result
        })
    }
}

/// Species whose detections reach `min_confidence`, deduplicated and sorted.
pub fn distinct_species(detections: &[Detection], min_confidence: f32) -> Vec<String> {
    detections
        .iter()
        .filter(|d| d.confidence >= min_confidence)
        .map(|d| d.species.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Result of classifying one clip.
#[derive(Debug)]
pub struct DetectionOutcome {
    /// Distinct species, sorted.
    pub species: Vec<String>,
    /// In-flight observation writes.
    pub persistence: PendingWrites,
}

/// Observation writes started for one clip.
///
/// Dropping this leaves the writes running unobserved; awaiting
/// [`PendingWrites::wait`] collects one result per species.
#[derive(Debug)]
pub struct PendingWrites {
    writes: Vec<(String, JoinHandle<Result<()>>)>,
}

impl PendingWrites {
    /// No writes at all, for clips that never reached the classifier.
    pub fn none() -> Self {
        Self { writes: Vec::new() }
    }

    /// Number of writes issued.
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    /// Whether no writes were issued.
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Wait for every write to finish.
    pub async fn wait(self) -> PersistenceReport {
        let mut outcomes = Vec::with_capacity(self.writes.len());
        for (species, handle) in self.writes {
            let result = handle.await.unwrap_or_else(|e| {
                Err(Error::TaskJoin {
                    reason: e.to_string(),
                })
            });
            outcomes.push(WriteOutcome { species, result });
        }
        PersistenceReport { outcomes }
    }
}

/// Result of one observation write.
#[derive(Debug)]
pub struct WriteOutcome {
    /// Species the observation was for.
    pub species: String,
    /// Store result.
    pub result: Result<()>,
}

/// Results of every write issued for a clip.
#[derive(Debug)]
pub struct PersistenceReport {
    /// One entry per species, in submission order.
    pub outcomes: Vec<WriteOutcome>,
}

impl PersistenceReport {
    /// Whether every write succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    /// Writes that failed.
    pub fn failures(&self) -> impl Iterator<Item = &WriteOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }
}
