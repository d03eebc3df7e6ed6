//! Error types for robin.

/// Result type alias for robin operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classification of an [`Error`], used by the boundary layer to pick a
/// response (reject, report missing, report conflict, report upstream failure).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed input, including undecodable audio.
    Validation,
    /// Unknown species/month or an empty hotspot set.
    NotFound,
    /// Detection process start/stop requested in the wrong state.
    ProcessState,
    /// Classifier or store failure.
    ExternalService,
    /// Local I/O or configuration failure.
    Internal,
}

/// Top-level error type for robin.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration directory could not be determined.
    #[error("could not determine configuration directory for this platform")]
    ConfigDirNotFound,

    /// Failed to read configuration file.
    #[error("failed to read config file '{path}'")]
    ConfigRead {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("failed to parse config file '{path}'")]
    ConfigParse {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// Failed to write configuration file.
    #[error("failed to write config file '{path}'")]
    ConfigWrite {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize configuration.
    #[error("failed to serialize config")]
    ConfigSerialize {
        /// Underlying serialization error.
        #[source]
        source: toml::ser::Error,
    },

    /// Request input was missing or malformed.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Description of the problem.
        message: String,
    },

    /// Unsupported audio container format.
    #[error("unsupported audio format: {format}")]
    UnsupportedAudioFormat {
        /// The unsupported format.
        format: String,
    },

    /// Failed to stage the uploaded clip on disk.
    #[error("failed to stage audio clip in '{dir}'")]
    ClipStage {
        /// Directory the temporary artifact was created in.
        dir: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to open audio data.
    #[error("failed to open audio file '{path}'")]
    AudioOpen {
        /// Path to the audio file.
        path: std::path::PathBuf,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to decode audio.
    #[error("failed to decode audio from '{path}'")]
    AudioDecode {
        /// Path to the audio file.
        path: std::path::PathBuf,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// No audio tracks found.
    #[error("no audio tracks found in '{path}'")]
    NoAudioTracks {
        /// Path to the audio file.
        path: std::path::PathBuf,
    },

    /// The clip decoded to zero samples.
    #[error("audio clip contains no samples")]
    EmptyClip,

    /// Failed to resample audio.
    #[error("failed to resample audio: {reason}")]
    Resample {
        /// Description of the resampling failure.
        reason: String,
    },

    /// Spectral analysis failed.
    #[error("spectral analysis failed: {reason}")]
    Spectrum {
        /// Description of the failure.
        reason: String,
    },

    /// Failed to initialize ONNX runtime.
    #[error("failed to initialize ONNX runtime: {reason}")]
    RuntimeInitialization {
        /// Description of the initialization failure.
        reason: String,
    },

    /// Failed to build classifier.
    #[error("failed to build classifier: {reason}")]
    ClassifierBuild {
        /// Description of the build failure.
        reason: String,
    },

    /// Inference failed.
    #[error("inference failed: {reason}")]
    Inference {
        /// Description of the inference failure.
        reason: String,
    },

    /// Inference did not finish within the configured deadline.
    #[error("inference timed out after {secs}s")]
    InferenceTimeout {
        /// Deadline that elapsed, in seconds.
        secs: u64,
    },

    /// Failed to build range filter.
    #[error("failed to build range filter: {reason}")]
    RangeFilterBuild {
        /// Description of the build failure.
        reason: String,
    },

    /// Failed to predict location scores.
    #[error("failed to predict location scores: {reason}")]
    RangeFilterPredict {
        /// Description of the prediction failure.
        reason: String,
    },

    /// Observation store rejected a write.
    #[error("observation store write failed for '{species}': {reason}")]
    ObservationWrite {
        /// Species the observation was for.
        species: String,
        /// Description of the failure.
        reason: String,
    },

    /// Failed to read the hotspot store.
    #[error("failed to load hotspot store '{path}'")]
    HotspotStoreLoad {
        /// Path to the hotspot file.
        path: std::path::PathBuf,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// No hotspots recorded for the species in the month.
    #[error("no hotspots found for '{species}' in month {month}")]
    HotspotsNotFound {
        /// Species key that was queried.
        species: String,
        /// Month (1-12) that was queried.
        month: u32,
    },

    /// Ranking was requested over an empty candidate set.
    #[error("no hotspot candidates to rank")]
    NoHotspotCandidates,

    /// Invalid month value.
    #[error("invalid month: {value} (must be 1 to 12)")]
    InvalidMonth {
        /// Invalid month value.
        value: u32,
    },

    /// Invalid latitude value.
    #[error("invalid latitude: {value} (must be -90.0 to 90.0)")]
    InvalidLatitude {
        /// Invalid latitude value.
        value: f64,
    },

    /// Invalid longitude value.
    #[error("invalid longitude: {value} (must be -180.0 to 180.0)")]
    InvalidLongitude {
        /// Invalid longitude value.
        value: f64,
    },

    /// Detection process is already running.
    #[error("detection is already running (pid {pid})")]
    AlreadyRunning {
        /// Pid of the running detector.
        pid: u32,
    },

    /// Detection process is not running.
    #[error("detection is not running")]
    NotRunning,

    /// Failed to spawn the detector program.
    #[error("failed to start detector '{program}'")]
    DetectorSpawn {
        /// Program that was spawned.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to terminate the detector process tree.
    #[error("failed to stop detector (pid {pid})")]
    DetectorTerminate {
        /// Pid of the detector.
        pid: u32,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Internal error.
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },

    /// Background task failed to complete.
    #[error("background task failed: {reason}")]
    TaskJoin {
        /// Description of the join failure.
        reason: String,
    },
}

impl Error {
    /// Classify this error for the boundary layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. }
            | Self::UnsupportedAudioFormat { .. }
            | Self::AudioOpen { .. }
            | Self::AudioDecode { .. }
            | Self::NoAudioTracks { .. }
            | Self::EmptyClip
            | Self::Resample { .. }
            | Self::InvalidMonth { .. }
            | Self::InvalidLatitude { .. }
            | Self::InvalidLongitude { .. } => ErrorKind::Validation,
            Self::HotspotsNotFound { .. } | Self::NoHotspotCandidates => ErrorKind::NotFound,
            Self::AlreadyRunning { .. } | Self::NotRunning => ErrorKind::ProcessState,
            Self::Inference { .. }
            | Self::InferenceTimeout { .. }
            | Self::RangeFilterPredict { .. }
            | Self::ObservationWrite { .. }
            | Self::HotspotStoreLoad { .. } => ErrorKind::ExternalService,
            _ => ErrorKind::Internal,
        }
    }
}
