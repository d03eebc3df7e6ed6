//! Acoustic classifier boundary.
//!
//! The orchestrator only depends on [`Classifier`]; [`BirdNetClassifier`] is
//! the production implementation on top of `birdnet-onnx`.

mod birdnet;
mod range_filter;

pub use birdnet::BirdNetClassifier;
pub use range_filter::RangeFilter;

use crate::audio::PcmClip;
use crate::error::Result;
use chrono::NaiveDate;

/// One species the classifier believes is present in a clip.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Species name as reported to users.
    pub species: String,
    /// Classifier confidence in [0, 1].
    pub confidence: f32,
}

impl Detection {
    /// Create a detection.
    pub fn new(species: impl Into<String>, confidence: f32) -> Self {
        Self {
            species: species.into(),
            confidence,
        }
    }
}

/// Species classifier collaborator.
///
/// Implementations are synchronous and may take seconds; callers run them on
/// a blocking thread.
pub trait Classifier: Send + Sync {
    /// Detect species in `samples`, recorded at the given place and date.
    ///
    /// Detections below `min_confidence` may be returned; callers filter.
    fn analyze(
        &self,
        samples: &PcmClip,
        latitude: f64,
        longitude: f64,
        date: NaiveDate,
        min_confidence: f32,
    ) -> Result<Vec<Detection>>;
}
