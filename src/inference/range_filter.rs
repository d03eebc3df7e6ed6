//! Location/season filter around the birdnet-onnx meta model.

use crate::error::{Error, Result};
use birdnet_onnx::{LocationScore, Prediction, RangeFilter as BirdnetRangeFilter};
use chrono::{Datelike, NaiveDate};
use std::path::Path;
use tracing::debug;

/// Drops species that are implausible at a location and time of year.
pub struct RangeFilter {
    inner: BirdnetRangeFilter,
}

impl RangeFilter {
    /// Build a range filter for the classifier's label set.
    pub fn from_config(
        meta_model_path: &Path,
        classifier_labels: &[String],
        threshold: f32,
    ) -> Result<Self> {
        let inner = BirdnetRangeFilter::builder()
            .model_path(meta_model_path.to_string_lossy().to_string())
            .from_classifier_labels(classifier_labels)
            .threshold(threshold)
            .build()
            .map_err(|e| Error::RangeFilterBuild {
                reason: e.to_string(),
            })?;

        Ok(Self { inner })
    }

    /// Meta model score for every species at (`latitude`, `longitude`) on
    /// `date`.
    pub fn location_scores(
        &self,
        latitude: f64,
        longitude: f64,
        date: NaiveDate,
    ) -> Result<Vec<LocationScore>> {
        #[allow(clippy::cast_possible_truncation)]
        self.inner
            .predict(latitude as f32, longitude as f32, date.month(), date.day())
            .map_err(|e| Error::RangeFilterPredict {
                reason: e.to_string(),
            })
    }

    /// Keep only predictions whose species is plausible under
    /// `location_scores`.
    pub fn apply(
        &self,
        predictions: &[Prediction],
        location_scores: &[LocationScore],
    ) -> Vec<Prediction> {
        let kept = self
            .inner
            .filter_predictions(predictions, location_scores, false);
        if kept.len() != predictions.len() {
            debug!(
                "Range filter: {} predictions before, {} after",
                predictions.len(),
                kept.len()
            );
        }
        kept
    }
}
