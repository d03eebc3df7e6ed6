//! Clip staging, decoding and normalization.

pub mod artifact;
mod clip;
mod decode;
mod resample;

pub use artifact::{ClipArtifact, cleanup_all_artifacts};
pub use clip::{AudioClip, AudioFormat, PcmClip};
pub use decode::{DecodedAudio, decode_audio_file, decode_clip};
pub use resample::resample;
