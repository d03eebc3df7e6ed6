//! Audio decoding using symphonia.

use crate::audio::artifact::ClipArtifact;
use crate::audio::{AudioClip, PcmClip, resample};
use crate::constants::TARGET_SAMPLE_RATE;
use crate::error::{Error, Result};
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

/// Mono float audio straight out of the decoder.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Samples in range [-1.0, 1.0].
    pub samples: Vec<f32>,
    /// Native sample rate in Hz.
    pub sample_rate: u32,
}

/// Decode an uploaded clip to 16-bit mono PCM at [`TARGET_SAMPLE_RATE`].
///
/// The clip is staged in `temp_dir` for the decoder and the staged file is
/// removed before this returns, whether decoding succeeded or not.
pub fn decode_clip(clip: &AudioClip, temp_dir: Option<&Path>) -> Result<PcmClip> {
    let artifact = ClipArtifact::stage(&clip.bytes, clip.format, temp_dir)?;
    let decoded = decode_audio_file(artifact.path())?;
    drop(artifact);

    if decoded.samples.is_empty() {
        return Err(Error::EmptyClip);
    }

    let samples = resample(decoded.samples, decoded.sample_rate, TARGET_SAMPLE_RATE)?;
    let pcm = PcmClip::from_normalized(&samples, TARGET_SAMPLE_RATE);
    debug!(
        "Decoded {} clip: {} samples ({:.2}s) from {} Hz",
        clip.format,
        pcm.samples.len(),
        pcm.duration_secs(),
        decoded.sample_rate
    );
    Ok(pcm)
}

/// Decode an audio file to mono f32 samples at its native rate.
///
/// Supports WAV, FLAC, MP3, and AAC formats.
pub fn decode_audio_file(path: &Path) -> Result<DecodedAudio> {
    let open_err = |e: Box<dyn std::error::Error + Send + Sync>| Error::AudioOpen {
        path: path.to_path_buf(),
        source: e,
    };
    let decode_err = |e: Box<dyn std::error::Error + Send + Sync>| Error::AudioDecode {
        path: path.to_path_buf(),
        source: e,
    };

    let file = File::open(path).map_err(|e| open_err(Box::new(e)))?;
    let mss = MediaSourceStream::new(Box::new(file), MediaSourceStreamOptions::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| open_err(Box::new(e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::NoAudioTracks {
            path: path.to_path_buf(),
        })?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| decode_err("missing sample rate".into()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| decode_err(Box::new(e)))?;

    let mut samples = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(decode_err(Box::new(e))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder
            .decode(&packet)
            .map_err(|e| decode_err(Box::new(e)))?;

        let spec = *decoded.spec();
        let channels = spec.channels.count().max(1);
        let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buf.copy_interleaved_ref(decoded);
        mix_to_mono(buf.samples(), channels, &mut samples);
    }

    Ok(DecodedAudio {
        samples,
        sample_rate,
    })
}

/// Average interleaved frames down to one channel.
fn mix_to_mono(interleaved: &[f32], channels: usize, output: &mut Vec<f32>) {
    if channels == 1 {
        output.extend_from_slice(interleaved);
        return;
    }

    #[allow(clippy::cast_precision_loss)]
    let scale = 1.0 / channels as f32;
    output.extend(
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() * scale),
    );
}
