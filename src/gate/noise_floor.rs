//! Adaptive noise floor gate.

use crate::audio::{AudioClip, PcmClip, decode_clip};
use crate::config::GateConfig;
use crate::error::{Error, Result};
use crate::gate::peak_power;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Calibration state shared by every request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseFloorState {
    threshold: f64,
    alpha: f64,
}

impl NoiseFloorState {
    /// Create a state, rejecting `alpha` outside (0, 1) or a non-positive threshold.
    pub fn new(threshold: f64, alpha: f64) -> Result<Self> {
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(Error::ConfigValidation {
                message: format!("noise floor alpha must be strictly between 0 and 1, got {alpha}"),
            });
        }
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(Error::ConfigValidation {
                message: format!("noise floor threshold must be positive, got {threshold}"),
            });
        }
        Ok(Self { threshold, alpha })
    }

    /// Current power threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// EMA smoothing factor.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Compare `observed` against the threshold.
    ///
    /// Below threshold the threshold moves toward `observed` by the EMA rule
    /// and the clip is rejected. At or above it the clip passes and the
    /// threshold is left untouched, so real vocalizations never raise the
    /// floor.
    fn observe(&mut self, observed: f64) -> bool {
        if observed < self.threshold {
            self.threshold = self.alpha.mul_add(self.threshold, (1.0 - self.alpha) * observed);
            false
        } else {
            true
        }
    }
}

/// Outcome of gating one clip.
#[derive(Debug, Clone)]
pub struct GateResult {
    /// Whether the clip warrants inference.
    pub passed: bool,
    /// Peak spectral power of the clip.
    pub observed_power: f64,
    /// Threshold after evaluation.
    pub threshold: f64,
    /// Decoded samples, kept only when the clip passed.
    pub samples: Option<PcmClip>,
}

/// Decides whether a clip is loud enough to be worth classifying.
#[derive(Debug)]
pub struct NoiseFloorGate {
    state: Mutex<NoiseFloorState>,
    temp_dir: Option<PathBuf>,
}

impl NoiseFloorGate {
    /// Create a gate starting from `initial_threshold`.
    pub fn new(initial_threshold: f64, alpha: f64) -> Result<Self> {
        Ok(Self {
            state: Mutex::new(NoiseFloorState::new(initial_threshold, alpha)?),
            temp_dir: None,
        })
    }

    /// Create a gate from the `[gate]` config section.
    pub fn from_config(config: &GateConfig) -> Result<Self> {
        Self::new(config.initial_threshold, config.alpha)
    }

    /// Stage uploaded clips in `dir` instead of the system temp directory.
    #[must_use]
    pub fn with_temp_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.temp_dir = dir;
        self
    }

    /// Snapshot of the current calibration.
    pub fn state(&self) -> NoiseFloorState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Decode `clip` and gate it.
    ///
    /// Decoding failures are validation errors; the staged artifact is gone by
    /// the time this returns either way.
    pub fn evaluate(&self, clip: &AudioClip) -> Result<GateResult> {
        let pcm = decode_clip(clip, self.temp_dir.as_deref())?;
        self.evaluate_pcm(pcm)
    }

    /// Gate already-decoded samples.
    pub fn evaluate_pcm(&self, pcm: PcmClip) -> Result<GateResult> {
        // Spectral analysis runs outside the lock; only the compare-and-update is serialized
        let observed = peak_power(&pcm.samples)?;
        let (passed, threshold) = self.observe(observed);

        debug!(
            "Noise gate: observed={:.3e} threshold={:.3e} passed={}",
            observed, threshold, passed
        );

        Ok(GateResult {
            passed,
            observed_power: observed,
            threshold,
            samples: passed.then_some(pcm),
        })
    }

    /// Apply one power observation; returns `(passed, threshold_after)`.
    pub fn observe(&self, observed: f64) -> (bool, f64) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let passed = state.observe(observed);
        (passed, state.threshold)
    }
}
