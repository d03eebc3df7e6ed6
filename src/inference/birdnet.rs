//! `BirdNET` classifier backend on birdnet-onnx.

use crate::audio::{PcmClip, resample};
use crate::config::{InferenceDevice, ModelConfig};
use crate::constants::confidence;
use crate::error::{Error, Result};
use crate::inference::{Classifier, Detection, RangeFilter};
use birdnet_onnx::{
    Classifier as OnnxClassifier, ClassifierBuilder, ExecutionProviderInfo, InferenceOptions,
    Prediction, available_execution_providers, ort_execution_providers,
};
use chrono::NaiveDate;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// `BirdNET` (or compatible ONNX) model plus optional range filter.
pub struct BirdNetClassifier {
    inner: OnnxClassifier,
    range_filter: Option<RangeFilter>,
}

impl BirdNetClassifier {
    /// Load the model described by the `[model]` config section.
    pub fn from_config(model: &ModelConfig) -> Result<Self> {
        let model_path = required_path(model.path.as_ref(), "model.path")?;
        let labels_path = required_path(model.labels.as_ref(), "model.labels")?;

        let builder = ClassifierBuilder::new()
            .model_path(model_path.to_string_lossy().to_string())
            .labels_path(labels_path.to_string_lossy().to_string())
            .top_k(model.top_k)
            .min_confidence(confidence::MIN);

        let builder = select_device(builder, model.device);

        let inner = builder.build().map_err(|e| Error::ClassifierBuild {
            reason: e.to_string(),
        })?;

        info!(
            "Loaded model: {:?}, sample_rate: {}, segment_duration: {}s",
            inner.config().model_type,
            inner.config().sample_rate,
            inner.config().segment_duration,
        );

        let range_filter = model
            .meta_model
            .as_ref()
            .map(|meta| RangeFilter::from_config(meta, inner.labels(), model.range_threshold))
            .transpose()?;

        if range_filter.is_some() {
            info!("Range filter enabled (threshold {:.3})", model.range_threshold);
        }

        Ok(Self {
            inner,
            range_filter,
        })
    }

    /// Split samples into zero-padded model-length segments.
    fn segments(&self, samples: &[f32]) -> Vec<Vec<f32>> {
        let segment_len = self.inner.config().sample_count.max(1);
        samples
            .chunks(segment_len)
            .map(|chunk| {
                let mut segment = chunk.to_vec();
                segment.resize(segment_len, 0.0);
                segment
            })
            .collect()
    }
}

impl Classifier for BirdNetClassifier {
    fn analyze(
        &self,
        samples: &PcmClip,
        latitude: f64,
        longitude: f64,
        date: NaiveDate,
        min_confidence: f32,
    ) -> Result<Vec<Detection>> {
        let model_rate = self.inner.config().sample_rate;
        let audio = resample(samples.to_normalized(), samples.sample_rate, model_rate)?;
        let options = InferenceOptions::default();

        let range_filter = self.range_filter.as_ref();
        let site_filter = || {
            range_filter
                .map(|filter| {
                    filter
                        .location_scores(latitude, longitude, date)
                        .map(|scores| {
                            move |predictions: &[Prediction]| filter.apply(predictions, &scores)
                        })
                })
                .transpose()
        };
        let predict = |segment: &[f32]| {
            self.inner
                .predict(segment, &options)
                .map(|result| result.predictions)
                .map_err(|e| Error::Inference {
                    reason: e.to_string(),
                })
        };

        let detections =
            detect_segments(&self.segments(&audio), min_confidence, site_filter, predict)?;

        debug!(
            "Classifier: {} detections at or above {:.2}",
            detections.len(),
            min_confidence
        );
        Ok(detections)
    }
}

/// Classify every segment and keep predictions at or above `min_confidence`.
///
/// Location and date are fixed for a clip, so `site_filter` is built once,
/// before the first segment.
fn detect_segments<F>(
    segments: &[Vec<f32>],
    min_confidence: f32,
    site_filter: impl FnOnce() -> Result<Option<F>>,
    mut predict: impl FnMut(&[f32]) -> Result<Vec<Prediction>>,
) -> Result<Vec<Detection>>
where
    F: Fn(&[Prediction]) -> Vec<Prediction>,
{
    let site_filter = site_filter()?;

    let mut detections = Vec::new();
    for segment in segments {
        let predictions = predict(segment)?;
        let predictions = match &site_filter {
            Some(filter) => filter(&predictions),
            None => predictions,
        };

        detections.extend(
            predictions
                .into_iter()
                .filter(|p| p.confidence >= min_confidence)
                .map(|p| Detection::new(common_name(&p.species), p.confidence)),
        );
    }
    Ok(detections)
}

fn required_path(path: Option<&PathBuf>, key: &str) -> Result<PathBuf> {
    let path = path.ok_or_else(|| Error::ConfigValidation {
        message: format!("{key} is not set"),
    })?;
    if !path.exists() {
        return Err(Error::ConfigValidation {
            message: format!("{key} does not exist: {}", path.display()),
        });
    }
    Ok(path.clone())
}

/// `BirdNET` labels are `Scientific name_Common name`; users see the common name.
fn common_name(label: &str) -> &str {
    label.split_once('_').map_or(label, |(_, common)| common)
}

/// GPU providers tried in order when a GPU is wanted.
const GPU_PRIORITY: [(ExecutionProviderInfo, &str); 4] = [
    (ExecutionProviderInfo::TensorRt, "TensorRT"),
    (ExecutionProviderInfo::Cuda, "CUDA"),
    (ExecutionProviderInfo::DirectMl, "DirectML"),
    (ExecutionProviderInfo::CoreMl, "CoreML"),
];

fn select_device(builder: ClassifierBuilder, device: InferenceDevice) -> ClassifierBuilder {
    use ort_execution_providers::{
        CUDAExecutionProvider, CoreMLExecutionProvider, DirectMLExecutionProvider,
    };

    if device == InferenceDevice::Cpu {
        info!("Requested device: CPU");
        return builder;
    }

    let available = available_execution_providers();
    let Some(&(provider, name)) = GPU_PRIORITY.iter().find(|(p, _)| available.contains(p)) else {
        if device == InferenceDevice::Gpu {
            warn!("GPU requested but no GPU providers available, using CPU");
        } else {
            info!("No GPU providers available, using CPU");
        }
        return builder;
    };

    info!("Using {} execution provider", name);
    match provider {
        ExecutionProviderInfo::TensorRt => builder.with_tensorrt(),
        ExecutionProviderInfo::Cuda => builder.execution_provider(CUDAExecutionProvider::default()),
        ExecutionProviderInfo::DirectMl => {
            builder.execution_provider(DirectMLExecutionProvider::default())
        }
        ExecutionProviderInfo::CoreMl => {
            builder.execution_provider(CoreMLExecutionProvider::default())
        }
        _ => builder,
    }
}
