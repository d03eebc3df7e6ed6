//! Uploaded clip and decoded PCM types.

use crate::error::{Error, Result};

/// Container formats accepted for uploaded clips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioFormat {
    /// RIFF/WAVE (PCM or float).
    Wav,
    /// Free Lossless Audio Codec.
    Flac,
    /// MPEG-1 Layer III.
    Mp3,
    /// AAC in an MP4/M4A container or ADTS stream.
    Aac,
}

impl AudioFormat {
    /// File extension used as the decoder probe hint.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Flac => "flac",
            Self::Mp3 => "mp3",
            Self::Aac => "m4a",
        }
    }

    /// Infer the format from a file path's extension.
    pub fn from_path(path: &std::path::Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| Error::UnsupportedAudioFormat {
                format: path.display().to_string(),
            })?;
        ext.parse()
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for AudioFormat {
    type Err = Error;

    /// Accepts bare extensions and the MIME types mobile recorders declare.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "wav" | "wave" | "audio/wav" | "audio/x-wav" | "audio/wave" => Ok(Self::Wav),
            "flac" | "audio/flac" | "audio/x-flac" => Ok(Self::Flac),
            "mp3" | "audio/mpeg" | "audio/mp3" => Ok(Self::Mp3),
            "m4a" | "aac" | "mp4" | "audio/aac" | "audio/mp4" | "audio/x-m4a" => Ok(Self::Aac),
            other => Err(Error::UnsupportedAudioFormat {
                format: other.to_string(),
            }),
        }
    }
}

/// Raw uploaded audio plus its declared container format.
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// Encoded bytes as received.
    pub bytes: Vec<u8>,
    /// Declared container format.
    pub format: AudioFormat,
}

impl AudioClip {
    /// Wrap uploaded bytes, rejecting empty payloads.
    pub fn new(bytes: Vec<u8>, format: AudioFormat) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::InvalidInput {
                message: "audio payload is empty".to_string(),
            });
        }
        Ok(Self { bytes, format })
    }
}

/// Decoded clip: mono signed 16-bit PCM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmClip {
    /// PCM samples.
    pub samples: Vec<i16>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl PcmClip {
    /// Quantize normalized float samples to 16-bit PCM.
    pub fn from_normalized(samples: &[f32], sample_rate: u32) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let samples = samples
            .iter()
            .map(|&s| (s.clamp(-1.0, 1.0) * f32::from(i16::MAX)).round() as i16)
            .collect();
        Self {
            samples,
            sample_rate,
        }
    }

    /// Samples scaled back to [-1.0, 1.0] for model input.
    pub fn to_normalized(&self) -> Vec<f32> {
        self.samples
            .iter()
            .map(|&s| f32::from(s) / f32::from(i16::MAX))
            .collect()
    }

    /// Clip duration in seconds.
    #[allow(clippy::cast_precision_loss)]
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_format_from_mime_and_extension() {
        assert_eq!("audio/wav".parse::<AudioFormat>().ok(), Some(AudioFormat::Wav));
        assert_eq!("WAV".parse::<AudioFormat>().ok(), Some(AudioFormat::Wav));
        assert_eq!("audio/mpeg".parse::<AudioFormat>().ok(), Some(AudioFormat::Mp3));
        assert_eq!("m4a".parse::<AudioFormat>().ok(), Some(AudioFormat::Aac));
        assert!("ogg".parse::<AudioFormat>().is_err());
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            AudioFormat::from_path(Path::new("/tmp/recording.flac")).ok(),
            Some(AudioFormat::Flac)
        );
        assert!(AudioFormat::from_path(Path::new("/tmp/recording")).is_err());
    }

    #[test]
    fn test_empty_payload_rejected() {
        let err = AudioClip::new(Vec::new(), AudioFormat::Wav).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
    }

    #[test]
    fn test_quantize_clamps_and_rounds() {
        let pcm = PcmClip::from_normalized(&[0.0, 1.0, -1.0, 2.0, 0.5], 48_000);
        assert_eq!(pcm.samples, vec![0, 32767, -32767, 32767, 16384]);
    }

    #[test]
    fn test_duration() {
        let pcm = PcmClip {
            samples: vec![0; 96_000],
            sample_rate: 48_000,
        };
        assert!((pcm.duration_secs() - 2.0).abs() < f32::EPSILON);
    }
}
