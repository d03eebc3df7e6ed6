//! Application-wide constants.
//!
//! All magic numbers and strings are defined here to ensure consistency
//! and make changes easy to track.

/// Application name used for config directories and user-facing messages.
pub const APP_NAME: &str = "robin";

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV: &str = "ROBIN_CONFIG";

/// Sample rate every clip is normalized to before analysis.
pub const TARGET_SAMPLE_RATE: u32 = 48_000;

/// Prefix for temporary clip artifacts.
pub const CLIP_ARTIFACT_PREFIX: &str = "robin-clip-";

/// Noise floor gate defaults.
pub mod gate {
    /// Initial peak-power threshold before any calibration.
    ///
    /// Power is measured on the raw 16-bit sample scale, so a 3 s clip of
    /// quiet ambient noise typically peaks around 1e8..1e9.
    pub const DEFAULT_INITIAL_THRESHOLD: f64 = 1.0e10;

    /// Default EMA smoothing factor (weight kept on the old threshold).
    pub const DEFAULT_ALPHA: f64 = 0.9;
}

/// Detection defaults.
pub mod detection {
    /// Minimum classifier confidence for a detection to count.
    pub const MIN_CONFIDENCE: f32 = 0.25;

    /// Default inference deadline in seconds.
    pub const DEFAULT_INFERENCE_TIMEOUT_SECS: u64 = 120;

    /// Default number of top predictions requested per segment.
    pub const DEFAULT_TOP_K: usize = 10;

    /// Default range filter threshold for the location meta model.
    pub const DEFAULT_RANGE_THRESHOLD: f32 = 0.01;

    /// Largest accepted UTC offset, in minutes.
    pub const MAX_UTC_OFFSET_MINUTES: i32 = 24 * 60;
}

/// Detection process supervisor defaults.
pub mod supervisor {
    /// Default detector program.
    pub const DEFAULT_PROGRAM: &str = "python";

    /// Default detector arguments.
    pub const DEFAULT_ARGS: &[&str] = &["detect_birds.py"];

    /// Seconds to wait after SIGTERM before escalating to SIGKILL.
    pub const DEFAULT_GRACE_PERIOD_SECS: u64 = 5;

    /// Initial restart backoff in milliseconds.
    pub const DEFAULT_RESTART_BACKOFF_MS: u64 = 1_000;

    /// Restart backoff ceiling in milliseconds.
    pub const DEFAULT_RESTART_BACKOFF_MAX_MS: u64 = 30_000;
}

/// Geographic constants.
pub mod geo {
    /// Mean Earth radius used by the Haversine formula.
    pub const EARTH_RADIUS_KM: f64 = 6371.0;

    /// Kilometers to statute miles.
    pub const KM_TO_MILES: f64 = 0.621_371;

    /// Valid latitude range.
    pub const LATITUDE_RANGE: std::ops::RangeInclusive<f64> = -90.0..=90.0;

    /// Valid longitude range.
    pub const LONGITUDE_RANGE: std::ops::RangeInclusive<f64> = -180.0..=180.0;
}

/// Confidence value bounds.
pub mod confidence {
    /// Minimum valid confidence value.
    pub const MIN: f32 = 0.0;
    /// Maximum valid confidence value.
    pub const MAX: f32 = 1.0;
}
