//! Configuration type definitions.

use crate::constants::{detection, gate, supervisor};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Noise floor gate settings.
    pub gate: GateConfig,

    /// Detection orchestration settings.
    pub detection: DetectionConfig,

    /// Classifier model settings.
    pub model: ModelConfig,

    /// Background detection process settings.
    pub supervisor: SupervisorConfig,

    /// Collaborator storage locations.
    pub storage: StorageConfig,
}

/// Noise floor gate settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Threshold the gate starts from before calibration.
    pub initial_threshold: f64,

    /// EMA smoothing factor, strictly between 0 and 1.
    pub alpha: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            initial_threshold: gate::DEFAULT_INITIAL_THRESHOLD,
            alpha: gate::DEFAULT_ALPHA,
        }
    }
}

/// Detection orchestration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Inference deadline in seconds.
    pub inference_timeout_secs: u64,

    /// Fixed UTC offset observations are stamped in. It does not follow
    /// daylight saving time.
    pub utc_offset_minutes: i32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            inference_timeout_secs: detection::DEFAULT_INFERENCE_TIMEOUT_SECS,
            utc_offset_minutes: 0,
        }
    }
}

/// Classifier model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the ONNX model file.
    pub path: Option<PathBuf>,

    /// Path to the labels file.
    pub labels: Option<PathBuf>,

    /// Optional location meta model used to filter unlikely species.
    pub meta_model: Option<PathBuf>,

    /// Range filter threshold.
    pub range_threshold: f32,

    /// Top predictions requested per segment.
    pub top_k: usize,

    /// Inference device.
    pub device: InferenceDevice,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: None,
            labels: None,
            meta_model: None,
            range_threshold: detection::DEFAULT_RANGE_THRESHOLD,
            top_k: detection::DEFAULT_TOP_K,
            device: InferenceDevice::default(),
        }
    }
}

/// Inference device configuration.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InferenceDevice {
    /// Use a GPU provider when one is available, else CPU.
    #[default]
    Auto,
    /// Prefer a GPU provider, warn on CPU fallback.
    Gpu,
    /// Force CPU inference.
    Cpu,
}

/// Background detection process settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Detector program to spawn.
    pub program: String,

    /// Arguments passed to the detector.
    pub args: Vec<String>,

    /// Working directory for the detector.
    pub working_dir: Option<PathBuf>,

    /// Seconds between SIGTERM and SIGKILL on stop.
    pub grace_period_secs: u64,

    /// Restarts allowed after an unexpected exit (0 disables restarts).
    pub max_restarts: u32,

    /// First restart delay; doubles per consecutive restart.
    pub restart_backoff_ms: u64,

    /// Restart delay ceiling.
    pub restart_backoff_max_ms: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            program: supervisor::DEFAULT_PROGRAM.to_string(),
            args: supervisor::DEFAULT_ARGS
                .iter()
                .map(ToString::to_string)
                .collect(),
            working_dir: None,
            grace_period_secs: supervisor::DEFAULT_GRACE_PERIOD_SECS,
            max_restarts: 0,
            restart_backoff_ms: supervisor::DEFAULT_RESTART_BACKOFF_MS,
            restart_backoff_max_ms: supervisor::DEFAULT_RESTART_BACKOFF_MAX_MS,
        }
    }
}

/// Collaborator storage locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON-lines file observations are appended to.
    pub observations: PathBuf,

    /// JSON file holding precomputed hotspots.
    pub hotspots: PathBuf,

    /// Directory for temporary clip artifacts (system temp dir if unset).
    pub temp_dir: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            observations: PathBuf::from("observations.jsonl"),
            hotspots: PathBuf::from("hotspots.json"),
            temp_dir: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_config_default_values() {
        let gate = GateConfig::default();
        assert_eq!(gate.alpha, 0.9);
        assert_eq!(gate.initial_threshold, 1.0e10);
    }

    #[test]
    fn test_detection_config_defaults() {
        let detection = DetectionConfig::default();
        assert_eq!(detection.inference_timeout_secs, 120);
        assert_eq!(detection.utc_offset_minutes, 0);
    }

    #[test]
    fn test_supervisor_default_runs_detect_script() {
        let supervisor = SupervisorConfig::default();
        assert_eq!(supervisor.program, "python");
        assert_eq!(supervisor.args, vec!["detect_birds.py".to_string()]);
        assert_eq!(supervisor.max_restarts, 0);
    }

    #[test]
    fn test_device_deserializes_lowercase() {
        let config: ModelConfig = toml::from_str("device = \"cpu\"").unwrap_or_default();
        assert_eq!(config.device, InferenceDevice::Cpu);
    }
}
